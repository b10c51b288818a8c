//! Console logging for the browser binding

use crate::annotator::watcher::BatchReport;

const PREFIX: &str = "[ColourIndicator]";

pub fn info(message: &str) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::log_1(&format!("{} {}", PREFIX, message).into());
    #[cfg(not(target_arch = "wasm32"))]
    let _ = message;
}

pub fn warn(message: &str) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::warn_1(&format!("{} {}", PREFIX, message).into());
    #[cfg(not(target_arch = "wasm32"))]
    let _ = message;
}

/// Warn once per error carried by a report
pub fn report_errors(report: &BatchReport) {
    for error in &report.errors {
        warn(&error.to_string());
    }
}
