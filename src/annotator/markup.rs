//! Markup pipeline: annotate an HTML string in place of a live tree.
//!
//! Mirrors what the tree pipeline does to a content node, for hosts that work
//! with `innerHTML`:
//! 1. Unwrap every existing swatch back to its text
//! 2. Split the markup into tags and text segments
//! 3. Scan text segments only (tags and attribute values are never scanned)
//! 4. Splice swatches into the text segments

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use wasm_bindgen::prelude::*;

use crate::annotator::config::AnnotationScope;
use crate::annotator::error::AnnotateError;
use crate::annotator::matcher::ColourMatcher;
use crate::annotator::renderer::{self, Fragment};

static TAG_RE: OnceLock<Regex> = OnceLock::new();
static SWATCH_RE: OnceLock<Regex> = OnceLock::new();

fn tag_re() -> &'static Regex {
    TAG_RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag pattern is a valid regex"))
}

fn swatch_re() -> &'static Regex {
    SWATCH_RE.get_or_init(|| {
        Regex::new(r#"<span\b[^>]*\bclass="[^"]*\bchanged-indicator\b[^"]*"[^>]*>([^<]*)</span>"#)
            .expect("swatch pattern is a valid regex")
    })
}

/// Result of annotating one markup string
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarkupResult {
    pub html: String,
    pub swatches: usize,
    pub errors: Vec<AnnotateError>,
}

/// Remove every swatch, restoring the (still escaped) text it wrapped
pub fn unwrap_markup(html: &str) -> String {
    swatch_re().replace_all(html, "$1").into_owned()
}

/// Annotate the colour tokens in the text of `html`
pub fn annotate_markup(matcher: &ColourMatcher, scope: AnnotationScope, html: &str) -> MarkupResult {
    let clean = unwrap_markup(html);
    let mut result = MarkupResult {
        html: String::with_capacity(clean.len()),
        ..Default::default()
    };
    let mut code_depth = 0usize;
    let mut cursor = 0;

    for tag in tag_re().find_iter(&clean) {
        annotate_segment(matcher, scope, code_depth, &clean[cursor..tag.start()], &mut result);
        code_depth = track_code_depth(code_depth, tag.as_str());
        result.html.push_str(tag.as_str());
        cursor = tag.end();
    }
    annotate_segment(matcher, scope, code_depth, &clean[cursor..], &mut result);

    result
}

fn annotate_segment(
    matcher: &ColourMatcher,
    scope: AnnotationScope,
    code_depth: usize,
    text: &str,
    result: &mut MarkupResult,
) {
    if text.is_empty() {
        return;
    }
    if scope == AnnotationScope::CodeOnly && code_depth == 0 {
        result.html.push_str(text);
        return;
    }

    let plan = renderer::plan(matcher, text);
    for fragment in &plan.fragments {
        match fragment {
            // Segment text is already markup-escaped; copy it through untouched
            Fragment::Text(t) => result.html.push_str(t),
            Fragment::Swatch(a) => result.html.push_str(&a.to_markup()),
        }
    }
    result.swatches += plan.swatches;
    result.errors.extend(plan.errors);
}

fn track_code_depth(depth: usize, tag: &str) -> usize {
    let name: String = tag
        .trim_start_matches('<')
        .trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    if !name.eq_ignore_ascii_case("code") || tag.ends_with("/>") {
        depth
    } else if tag.starts_with("</") {
        depth.saturating_sub(1)
    } else {
        depth + 1
    }
}

// =============================================================================
// WASM Bindings
// =============================================================================

/// Annotate every colour token in an HTML string
#[wasm_bindgen(js_name = annotateHtml)]
pub fn js_annotate_html(html: &str) -> String {
    annotate_markup(&ColourMatcher::new(), AnnotationScope::AllText, html).html
}

/// Strip every swatch from an HTML string
#[wasm_bindgen(js_name = unwrapHtml)]
pub fn js_unwrap_html(html: &str) -> String {
    unwrap_markup(html)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn annotate(html: &str) -> MarkupResult {
        annotate_markup(&ColourMatcher::new(), AnnotationScope::AllText, html)
    }

    #[test]
    fn test_scenario_dark_hex() {
        let result = annotate("the color is #1a1a1a");
        assert_eq!(result.swatches, 1);
        assert!(result.html.contains("background-color:#1a1a1a; color:white;"));
        assert!(result.html.starts_with("the color is <span"));
    }

    #[test]
    fn test_scenario_css_named_value() {
        let result = annotate("color: red;");
        assert_eq!(
            result.html,
            r#"color: <span class="changed-indicator inline" style="background-color:red; color:white;">red</span>;"#
        );
    }

    #[test]
    fn test_attribute_values_not_scanned() {
        let html = r##"<a title="#ffffff" href="x">link</a> #000"##;
        let result = annotate(html);
        assert_eq!(result.swatches, 1);
        assert!(result.html.starts_with(r##"<a title="#ffffff" href="x">link</a> <span"##));
    }

    #[test]
    fn test_token_does_not_cross_tags() {
        // "#ab" + "<b>" + "cdef" is not a colour
        let result = annotate("#ab<b>cdef</b>");
        assert_eq!(result.swatches, 0);
        assert_eq!(result.html, "#ab<b>cdef</b>");
    }

    #[test]
    fn test_idempotent() {
        let once = annotate("a #fff, rgb(0 0 0) and color: teal; <code>#123</code>").html;
        let twice = annotate(&once).html;
        assert_eq!(once, twice);
    }

    #[test]
    fn test_unwrap_restores_original() {
        let original = "x #abcdef y hsl(10, 50%, 50%) z";
        let annotated = annotate(original).html;
        assert_ne!(annotated, original);
        assert_eq!(unwrap_markup(&annotated), original);
    }

    #[test]
    fn test_no_nested_swatches_after_edit() {
        let annotated = annotate("#fff").html;
        let edited = annotated.replace("</span>", "</span> and #000");
        let result = annotate(&edited);
        assert_eq!(result.swatches, 2);
        assert!(!result.html.contains("<span class=\"changed-indicator inline\" style=\"background-color:#fff; color:black;\"><span"));
        assert_eq!(result.html.matches("<span").count(), 2);
    }

    #[test]
    fn test_code_only_scope() {
        let html = "#fff outside <code>#000 inside</code> #111 after";
        let result = annotate_markup(&ColourMatcher::new(), AnnotationScope::CodeOnly, html);
        assert_eq!(result.swatches, 1);
        assert!(result.html.starts_with("#fff outside <code><span"));
        assert!(result.html.ends_with("</code> #111 after"));
    }

    #[test]
    fn test_errors_reported_not_fatal() {
        let result = annotate("color: nope; #fff");
        assert_eq!(result.swatches, 1);
        assert_eq!(result.errors.len(), 1);
    }
}
