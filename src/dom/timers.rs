//! DomScheduler: `Scheduler` over `setTimeout`

use std::collections::HashMap;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::Window;

use crate::annotator::error::AnnotateError;
use crate::annotator::tree::{Scheduler, TimerId};

/// Receives each timer as it fires
pub type TimerSink = Rc<dyn Fn(TimerId)>;

pub struct DomScheduler {
    window: Option<Window>,
    sink: TimerSink,
    /// TimerId → browser timeout handle
    handles: HashMap<TimerId, i32>,
}

impl DomScheduler {
    pub fn new(sink: TimerSink) -> Self {
        Self {
            window: web_sys::window(),
            sink,
            handles: HashMap::new(),
        }
    }

    /// Drop the handle of a timer that has fired
    pub fn forget(&mut self, timer: TimerId) {
        self.handles.remove(&timer);
    }

    pub fn pending(&self) -> usize {
        self.handles.len()
    }

    pub fn cancel_all(&mut self) {
        if let Some(window) = &self.window {
            for (_, handle) in self.handles.drain() {
                window.clear_timeout_with_handle(handle);
            }
        }
        self.handles.clear();
    }
}

impl Scheduler for DomScheduler {
    fn schedule(&mut self, timer: TimerId, delay_ms: u32) -> Result<(), AnnotateError> {
        let window = self
            .window
            .as_ref()
            .ok_or_else(|| AnnotateError::rejected("no window for timers"))?;

        let sink = Rc::clone(&self.sink);
        let callback = Closure::once_into_js(move || sink(timer));
        let delay = i32::try_from(delay_ms).unwrap_or(i32::MAX);
        let handle = window
            .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), delay)
            .map_err(|e| AnnotateError::rejected(format!("setTimeout failed: {:?}", e)))?;

        self.handles.insert(timer, handle);
        Ok(())
    }

    fn cancel(&mut self, timer: TimerId) {
        if let (Some(window), Some(handle)) = (&self.window, self.handles.remove(&timer)) {
            window.clear_timeout_with_handle(handle);
        }
    }
}
