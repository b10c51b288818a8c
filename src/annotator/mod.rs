pub mod error;
pub mod palette;
pub mod matcher;
pub mod resolver;
pub mod renderer;
pub mod markup;
pub mod config;
pub mod change;
pub mod tree;
pub mod memory;
pub mod pipeline;
pub mod watcher;
pub mod bootstrap;

pub use error::AnnotateError;
pub use matcher::{ColourMatcher, ColourToken, ColourTokens, NotationKind};
pub use resolver::{contrast_for, resolve, resolve_str, Contrast, ResolvedColour};
pub use renderer::{Annotation, Fragment, SplicePlan, MARKER_CLASS, SWATCH_CLASSES, SWATCH_TAG};
pub use markup::{annotate_markup, unwrap_markup, MarkupResult};
pub use config::{AnnotationScope, IndicatorConfig, Locator, DEFAULT_DEBOUNCE_MS};
pub use change::{fingerprint, stamp, ChangeCheck};
pub use tree::{ChangeFeed, ChangeRecord, ContentTree, ObserveOptions, Scheduler, TimerId};
pub use memory::{ManualClock, MemoryFeed, MemoryTree, NodeId};
pub use pipeline::{Annotator, PassOutcome};
pub use watcher::{BatchReport, MutationWatcher, WatchStats};
pub use bootstrap::{Activation, Bootstrapper, WatchHandle};
