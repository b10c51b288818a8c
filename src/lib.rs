//! SwatchCore: Colour Swatch Annotator for Live Chat Feeds
//!
//! A Rust/WASM implementation of the KittClouds colour indicator: colour tokens
//! in chat messages (`#1a1a1a`, `rgba(0, 0, 0, 0.5)`, `color: red;`) are wrapped
//! in a swatch whose background is the colour itself and whose text is
//! black or white, whichever reads better.
//!
//! # Architecture
//!
//! ## Annotation Core (`annotator`)
//! - `matcher.rs` - ColourMatcher: Hex / functional / CSS-declaration token scanning
//! - `resolver.rs` - ContrastResolver: Token → RGBA → light/dark decision
//! - `palette.rs` - CSS named-colour table
//! - `renderer.rs` - AnnotationRenderer: Swatch fragments and their inverse
//! - `pipeline.rs` - Annotator: One unwrap → match → splice pass over a node
//! - `change.rs` - Fingerprint stamps for skip detection
//! - `watcher.rs` - MutationWatcher: Batch classification, per-node debounce
//! - `bootstrap.rs` - Bootstrapper: Root lookup, initial scan, (re)subscription
//! - `tree.rs` - Host seams (`ContentTree`, `ChangeFeed`, `Scheduler`)
//! - `memory.rs` - In-memory host for tests and headless use
//! - `markup.rs` - Same pipeline over HTML strings
//!
//! ## Browser Binding (`dom`)
//! - `tree.rs` - DomTree: `ContentTree` over `web_sys::Node`
//! - `feed.rs` - DomFeed: `ChangeFeed` over `MutationObserver`
//! - `timers.rs` - DomScheduler: `Scheduler` over `setTimeout`
//! - `indicator.rs` - ColourIndicator: start / stop / onSwitch lifecycle
//!
//! # Usage (WASM)
//! ```javascript,ignore
//! import init, { ColourIndicator, annotateHtml, contrastFor } from 'swatchcore';
//!
//! await init();
//!
//! const indicator = new ColourIndicator();
//! indicator.start();
//!
//! contrastFor('#1a1a1a');              // "white"
//! annotateHtml('<p>color: red;</p>');  // swatch markup
//! ```

pub mod annotator;
pub mod dom;

// Public exports - Annotation core
pub use annotator::*;

// Public exports - Browser binding
pub use dom::ColourIndicator;

use wasm_bindgen::prelude::*;

// When the `wee_alloc` feature is enabled, use `wee_alloc` as the global
// allocator for smaller WASM bundle size.
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get version information
#[wasm_bindgen]
pub fn version() -> String {
    format!("swatchcore v{}", env!("CARGO_PKG_VERSION"))
}
