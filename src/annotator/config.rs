//! Configuration types and defaults for the colour indicator

use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;

use crate::annotator::error::AnnotateError;

/// Debounce applied to freshly appended content nodes
pub const DEFAULT_DEBOUNCE_MS: u32 = 500;

// =============================================================================
// Locator
// =============================================================================

/// Class names that identify the parts of the message feed.
///
/// Hosts usually resolve these once at startup (the real class names are
/// hashed per build); the core never hardcodes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Locator {
    /// Scroll container holding the message list
    pub root_class: String,
    /// One message (wrapper) in the list
    pub list_item_class: String,
    /// Element holding the message text
    pub content_class: String,
}

impl Default for Locator {
    fn default() -> Self {
        Self {
            root_class: "scrollerInner".to_string(),
            list_item_class: "messageListItem".to_string(),
            content_class: "messageContent".to_string(),
        }
    }
}

// =============================================================================
// Scope
// =============================================================================

/// Which text inside a content node gets annotated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationScope {
    /// Every text node of the message
    #[default]
    AllText,
    /// Only text inside `code` elements
    CodeOnly,
}

// =============================================================================
// Main Configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    /// Delay before annotating a freshly appended content node. Default: 500
    pub debounce_ms: u32,
    /// Default: all text
    pub scope: AnnotationScope,
    pub locator: Locator,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            scope: AnnotationScope::AllText,
            locator: Locator::default(),
        }
    }
}

impl IndicatorConfig {
    /// Annotate code spans and blocks only
    pub fn code_only() -> Self {
        Self {
            scope: AnnotationScope::CodeOnly,
            ..Self::default()
        }
    }

    pub fn with_locator(mut self, locator: Locator) -> Self {
        self.locator = locator;
        self
    }

    pub fn with_debounce_ms(mut self, debounce_ms: u32) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    /// Parse from a JSON string; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, AnnotateError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| AnnotateError::InvalidConfig(e.to_string()))?;
        config.validate()
    }

    /// Parse from a JS object; `undefined` / `null` give the defaults
    pub fn from_js(value: JsValue) -> Result<Self, AnnotateError> {
        if value.is_undefined() || value.is_null() {
            return Ok(Self::default());
        }
        let config: Self = serde_wasm_bindgen::from_value(value)
            .map_err(|e| AnnotateError::InvalidConfig(e.to_string()))?;
        config.validate()
    }

    fn validate(self) -> Result<Self, AnnotateError> {
        let locator = &self.locator;
        for (field, value) in [
            ("root_class", &locator.root_class),
            ("list_item_class", &locator.list_item_class),
            ("content_class", &locator.content_class),
        ] {
            if value.trim().is_empty() {
                return Err(AnnotateError::InvalidConfig(format!("{} must not be empty", field)));
            }
        }
        Ok(self)
    }
}
