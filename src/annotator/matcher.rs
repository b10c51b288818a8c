//! ColourMatcher - colour token detection via Regex
//!
//! Detects colour tokens in plain text:
//! - Hex: #rgb, #rgba, #rrggbb, #rrggbbaa (word-bounded)
//! - Functional: rgb(...), rgba(...), hsl(...), hsla(...)
//! - CSS property value: the value of a `color: ...;` declaration,
//!   including bare colour names which are never matched elsewhere
//!
//! All alternatives live in one compiled regex so a single left-to-right pass
//! yields non-overlapping tokens, earliest match first.

use regex::{CaptureMatches, Regex};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use wasm_bindgen::prelude::*;

// ==================== TYPE DEFINITIONS ====================

/// Notation a colour token was written in
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotationKind {
    Hex,
    Functional,
    CssPropertyValue,
}

impl NotationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotationKind::Hex => "hex",
            NotationKind::Functional => "functional",
            NotationKind::CssPropertyValue => "css_property_value",
        }
    }
}

/// A matched colour substring. Offsets are byte offsets into the scanned text.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ColourToken {
    pub start: usize,
    pub end: usize,
    pub raw: String,
    pub kind: NotationKind,
}

// ==================== GRAMMAR ====================

const HEX: &str = r"#(?:[0-9a-fA-F]{8}|[0-9a-fA-F]{6}|[0-9a-fA-F]{4}|[0-9a-fA-F]{3})\b";
const FUNCTIONAL: &str = r"\b(?i:rgba?|hsla?)\([^()]*\)";

static GRAMMAR: OnceLock<Regex> = OnceLock::new();

fn grammar() -> &'static Regex {
    GRAMMAR.get_or_init(|| {
        // Group `prop`: value of a colour declaration, without the `color:` prefix
        // Group `hex`: bare hex code
        // Group `func`: bare functional notation
        let pattern = format!(
            r"(?i:\bcolor)\s*:\s*(?P<prop>{HEX}|{FUNCTIONAL}|[a-zA-Z]+)\s*(?:!important\s*)?;|(?P<hex>{HEX})|(?P<func>{FUNCTIONAL})"
        );
        Regex::new(&pattern).expect("colour grammar is a valid regex")
    })
}

/// True when the byte before `pos` rules out a hex token starting there:
/// a word character (`abc#fff`) or an HTML numeric entity (`&#123;`).
fn hex_start_blocked(text: &str, pos: usize) -> bool {
    text[..pos]
        .chars()
        .next_back()
        .map(|c| c.is_alphanumeric() || c == '_' || c == '&')
        .unwrap_or(false)
}

// ==================== TOKEN ITERATOR ====================

/// Lazy, single-pass sequence of colour tokens over one text
pub struct ColourTokens<'r, 't> {
    text: &'t str,
    captures: CaptureMatches<'r, 't>,
}

impl<'r, 't> Iterator for ColourTokens<'r, 't> {
    type Item = ColourToken;

    fn next(&mut self) -> Option<ColourToken> {
        loop {
            let cap = self.captures.next()?;

            let (m, kind) = if let Some(m) = cap.name("prop") {
                (m, NotationKind::CssPropertyValue)
            } else if let Some(m) = cap.name("hex") {
                if hex_start_blocked(self.text, m.start()) {
                    continue;
                }
                (m, NotationKind::Hex)
            } else if let Some(m) = cap.name("func") {
                (m, NotationKind::Functional)
            } else {
                continue;
            };

            return Some(ColourToken {
                start: m.start(),
                end: m.end(),
                raw: m.as_str().to_string(),
                kind,
            });
        }
    }
}

// ==================== MAIN IMPLEMENTATION ====================

/// ColourMatcher - colour token detector
#[wasm_bindgen]
#[derive(Clone, Debug)]
pub struct ColourMatcher {
    re: Regex,
}

impl ColourMatcher {
    /// Lazily iterate the colour tokens of `text`
    pub fn tokens<'r, 't>(&'r self, text: &'t str) -> ColourTokens<'r, 't> {
        ColourTokens {
            text,
            captures: self.re.captures_iter(text),
        }
    }

    /// Collect all tokens of `text`
    pub fn find_all(&self, text: &str) -> Vec<ColourToken> {
        self.tokens(text).collect()
    }
}

#[wasm_bindgen]
impl ColourMatcher {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            re: grammar().clone(),
        }
    }

    /// Scan text for colour tokens
    ///
    /// Returns a JsValue containing an array of ColourToken objects.
    #[wasm_bindgen(js_name = scan)]
    pub fn scan(&self, text: &str) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.find_all(text))
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Number of colour tokens in text
    #[wasm_bindgen(js_name = count)]
    pub fn count(&self, text: &str) -> usize {
        self.tokens(text).count()
    }
}

impl Default for ColourMatcher {
    fn default() -> Self {
        Self::new()
    }
}

// ==================== TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;

    fn raws(text: &str) -> Vec<String> {
        ColourMatcher::new()
            .tokens(text)
            .map(|t| t.raw)
            .collect()
    }

    #[test]
    fn test_hex_lengths() {
        assert_eq!(raws("#abc #abcd #aabbcc #aabbccdd"), vec!["#abc", "#abcd", "#aabbcc", "#aabbccdd"]);
    }

    #[test]
    fn test_hex_invalid_lengths_rejected() {
        // 2, 5, 7 and 9 digits are not colours
        assert!(raws("#ab #abcde #abcdeff #abcdeffff").is_empty());
        assert!(raws("# alone").is_empty());
        assert!(raws("#ggg").is_empty());
    }

    #[test]
    fn test_hex_spans() {
        let tokens = ColourMatcher::new().find_all("the color is #1a1a1a");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].start, 13);
        assert_eq!(tokens[0].end, 20);
        assert_eq!(tokens[0].kind, NotationKind::Hex);
    }

    #[test]
    fn test_hex_word_bounded_start() {
        assert!(raws("abc#fff").is_empty());
        assert_eq!(raws("(#fff)"), vec!["#fff"]);
    }

    #[test]
    fn test_hex_not_html_entity() {
        // &#123; is an entity, not a colour
        assert!(raws("Code: &#123; here").is_empty());
    }

    #[test]
    fn test_functional_notations() {
        let text = "rgb(1, 2, 3) and rgba(0,0,0,0.5) and hsl(120 100% 50%) and HSLA(0, 0%, 0%, 1)";
        assert_eq!(
            raws(text),
            vec!["rgb(1, 2, 3)", "rgba(0,0,0,0.5)", "hsl(120 100% 50%)", "HSLA(0, 0%, 0%, 1)"]
        );
    }

    #[test]
    fn test_functional_requires_close_paren() {
        assert!(raws("rgb(1, 2, 3").is_empty());
    }

    #[test]
    fn test_css_property_value_named() {
        let tokens = ColourMatcher::new().find_all("color: red;");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].raw, "red");
        assert_eq!(tokens[0].kind, NotationKind::CssPropertyValue);
        assert_eq!(tokens[0].start, 7);
    }

    #[test]
    fn test_bare_name_not_matched() {
        assert!(raws("a red car").is_empty());
        // No terminating semicolon means no declaration
        assert!(raws("color: red").is_empty());
    }

    #[test]
    fn test_css_property_value_important() {
        assert_eq!(raws("p { color: blue !important; }"), vec!["blue"]);
    }

    #[test]
    fn test_css_property_value_with_hex_and_functional() {
        let tokens = ColourMatcher::new().find_all("color:#fff; color: rgb(0,0,0);");
        assert_eq!(tokens.len(), 2);
        assert!(tokens.iter().all(|t| t.kind == NotationKind::CssPropertyValue));
        assert_eq!(tokens[0].raw, "#fff");
        assert_eq!(tokens[1].raw, "rgb(0,0,0)");
    }

    #[test]
    fn test_declaration_without_semicolon_falls_back_to_hex() {
        let tokens = ColourMatcher::new().find_all("color: #123456");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, NotationKind::Hex);
    }

    #[test]
    fn test_tokens_in_order() {
        let tokens = ColourMatcher::new().find_all("#000 then rgb(1,1,1) then color: teal;");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![NotationKind::Hex, NotationKind::Functional, NotationKind::CssPropertyValue]
        );
        assert!(tokens.windows(2).all(|w| w[0].end <= w[1].start));
    }

    #[test]
    fn test_count() {
        assert_eq!(ColourMatcher::new().count("#fff #000 nothing"), 2);
        assert_eq!(ColourMatcher::new().count(""), 0);
    }
}
