//! ColourIndicator: the browser entry point
//!
//! # Usage (WASM)
//! ```javascript,ignore
//! import init, { ColourIndicator } from 'swatchcore';
//!
//! await init();
//!
//! const indicator = new ColourIndicator({ debounce_ms: 500, scope: 'all_text' });
//! indicator.start();      // on plugin start
//! indicator.onSwitch();   // on channel switch
//! indicator.stop();       // on plugin stop
//! console.log(indicator.stats());
//! ```

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use wasm_bindgen::prelude::*;
use web_sys::Node;

use crate::annotator::bootstrap::Bootstrapper;
use crate::annotator::config::IndicatorConfig;
use crate::annotator::error::AnnotateError;
use crate::annotator::tree::{ChangeRecord, TimerId};
use crate::dom::feed::DomFeed;
use crate::dom::log;
use crate::dom::timers::DomScheduler;
use crate::dom::tree::DomTree;

// =============================================================================
// Runtime
// =============================================================================

/// Shared state reached from observer and timer callbacks
struct Runtime {
    bootstrapper: Bootstrapper<DomFeed>,
    tree: DomTree,
    timers: DomScheduler,
}

impl Runtime {
    fn shared(config: &IndicatorConfig, tree: DomTree) -> Rc<RefCell<Runtime>> {
        Rc::new_cyclic(|weak: &Weak<RefCell<Runtime>>| {
            let on_batch = weak.clone();
            let feed = DomFeed::new(Rc::new(move |records: Vec<ChangeRecord<Node>>| {
                with_runtime(&on_batch, |rt| rt.deliver(&records));
            }));
            let on_timer = weak.clone();
            let timers = DomScheduler::new(Rc::new(move |timer: TimerId| {
                with_runtime(&on_timer, |rt| rt.fire(timer));
            }));
            RefCell::new(Runtime {
                bootstrapper: Bootstrapper::new(feed, config),
                tree,
                timers,
            })
        })
    }

    fn deliver(&mut self, records: &[ChangeRecord<Node>]) {
        let report = self.bootstrapper.deliver(&mut self.tree, &mut self.timers, records);
        log::report_errors(&report);
    }

    fn fire(&mut self, timer: TimerId) {
        self.timers.forget(timer);
        let report = self.bootstrapper.fire(&mut self.tree, timer);
        log::report_errors(&report);
    }

    fn activate(&mut self) -> Result<JsValue, AnnotateError> {
        self.timers.cancel_all();
        let activation = self.bootstrapper.activate(&mut self.tree)?;
        log::info(&format!(
            "watching (activation {}, {} existing swatches)",
            activation.handle.0, activation.initial.swatches
        ));
        log::report_errors(&activation.initial);
        serde_wasm_bindgen::to_value(&activation)
            .map_err(|e| AnnotateError::rejected(format!("Serialization error: {}", e)))
    }

    fn deactivate(&mut self) -> bool {
        self.timers.cancel_all();
        let stopped = self.bootstrapper.deactivate();
        if stopped {
            log::info("stopped");
        }
        stopped
    }
}

/// Run `f` on the runtime if it is still alive and not already borrowed
fn with_runtime(weak: &Weak<RefCell<Runtime>>, f: impl FnOnce(&mut Runtime)) {
    let Some(runtime) = weak.upgrade() else {
        return;
    };
    match runtime.try_borrow_mut() {
        Ok(mut rt) => f(&mut *rt),
        Err(_) => log::warn("callback re-entered while busy; skipped"),
    };
}

fn to_js_error(err: AnnotateError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

// =============================================================================
// WASM Bindings
// =============================================================================

#[wasm_bindgen]
pub struct ColourIndicator {
    runtime: Rc<RefCell<Runtime>>,
}

#[wasm_bindgen]
impl ColourIndicator {
    /// Create an indicator over `window.document`. `config` may be omitted.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<ColourIndicator, JsValue> {
        let config = IndicatorConfig::from_js(config).map_err(to_js_error)?;
        let tree = DomTree::from_window().map_err(to_js_error)?;
        Ok(ColourIndicator {
            runtime: Runtime::shared(&config, tree),
        })
    }

    /// Annotate what is on screen and start watching. Throws if the message
    /// list is not rendered yet.
    #[wasm_bindgen(js_name = start)]
    pub fn start(&self) -> Result<JsValue, JsValue> {
        self.runtime.borrow_mut().activate().map_err(to_js_error)
    }

    /// Stop watching; returns false if already stopped
    #[wasm_bindgen(js_name = stop)]
    pub fn stop(&self) -> bool {
        self.runtime.borrow_mut().deactivate()
    }

    /// Re-attach after navigation. A missing root is logged, not thrown.
    #[wasm_bindgen(js_name = onSwitch)]
    pub fn on_switch(&self) -> bool {
        match self.runtime.borrow_mut().activate() {
            Ok(_) => true,
            Err(e) => {
                log::warn(&e.to_string());
                false
            }
        }
    }

    #[wasm_bindgen(js_name = isActive)]
    pub fn is_active(&self) -> bool {
        self.runtime.borrow().bootstrapper.is_active()
    }

    /// Cumulative statistics as a JS object
    #[wasm_bindgen(js_name = stats)]
    pub fn stats(&self) -> Result<JsValue, JsValue> {
        let runtime = self.runtime.borrow();
        serde_wasm_bindgen::to_value(runtime.bootstrapper.watcher().stats())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Number of debounces still waiting
    #[wasm_bindgen(js_name = pendingCount)]
    pub fn pending_count(&self) -> usize {
        self.runtime.borrow().timers.pending()
    }
}

impl Drop for ColourIndicator {
    fn drop(&mut self) {
        if let Ok(mut rt) = self.runtime.try_borrow_mut() {
            rt.deactivate();
        }
    }
}
