//! AnnotationRenderer: swatch fragments and their inverse
//!
//! A swatch wraps the token's ORIGINAL text (never the resolved RGBA), so the
//! host's own colour engine paints the background in whatever notation the
//! author used:
//!
//! ```text
//! <span class="changed-indicator inline" style="background-color:#1a1a1a; color:white;">#1a1a1a</span>
//! ```

use serde::{Deserialize, Serialize};

use crate::annotator::error::AnnotateError;
use crate::annotator::matcher::{ColourMatcher, ColourToken};
use crate::annotator::resolver::{self, Contrast};

/// Idempotence marker class carried by every swatch
pub const MARKER_CLASS: &str = "changed-indicator";

/// Full class attribute of a swatch element
pub const SWATCH_CLASSES: &str = "changed-indicator inline";

/// Tag used for swatch elements
pub const SWATCH_TAG: &str = "span";

// =============================================================================
// Types
// =============================================================================

/// A rendered swatch for one colour token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Original token text, also used verbatim as the background colour
    pub raw: String,
    pub foreground: Contrast,
}

impl Annotation {
    /// Inline style of the swatch
    pub fn style(&self) -> String {
        format!("background-color:{}; color:{};", self.raw, self.foreground.as_css())
    }

    /// Markup fragment for splicing into HTML
    pub fn to_markup(&self) -> String {
        format!(
            r#"<{tag} class="{classes}" style="{style}">{text}</{tag}>"#,
            tag = SWATCH_TAG,
            classes = SWATCH_CLASSES,
            style = escape_html(&self.style()),
            text = escape_html(&self.raw),
        )
    }

    /// Plain text the swatch replaced; exact inverse of `render`
    pub fn unwrap(&self) -> &str {
        &self.raw
    }
}

/// Piece of a spliced text node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Fragment {
    Text(String),
    Swatch(Annotation),
}

/// Fragments for one text plus everything that went wrong on the way
#[derive(Debug, Clone, Default)]
pub struct SplicePlan {
    pub fragments: Vec<Fragment>,
    pub swatches: usize,
    pub errors: Vec<AnnotateError>,
}

// =============================================================================
// Rendering
// =============================================================================

/// Render a token with its contrast decision
pub fn render(token: &ColourToken, decision: Contrast) -> Annotation {
    Annotation {
        raw: token.raw.clone(),
        foreground: decision,
    }
}

/// Run matcher → resolver → renderer over one plain text.
///
/// Unresolvable tokens stay as plain text and are reported in `errors`.
pub fn plan(matcher: &ColourMatcher, text: &str) -> SplicePlan {
    let mut plan = SplicePlan::default();
    let mut cursor = 0;

    for token in matcher.tokens(text) {
        let colour = match resolver::resolve(&token) {
            Ok(colour) => colour,
            Err(e) => {
                plan.errors.push(e);
                continue;
            }
        };
        if token.start > cursor {
            plan.fragments.push(Fragment::Text(text[cursor..token.start].to_string()));
        }
        cursor = token.end;
        plan.fragments.push(Fragment::Swatch(render(&token, colour.contrast())));
        plan.swatches += 1;
    }

    if cursor < text.len() {
        plan.fragments.push(Fragment::Text(text[cursor..].to_string()));
    }
    plan
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn swatch(raw: &str, foreground: Contrast) -> Fragment {
        Fragment::Swatch(Annotation { raw: raw.to_string(), foreground })
    }

    #[test]
    fn test_render_keeps_raw_text() {
        let token = ColourMatcher::new().find_all("hsl(0, 0%, 0%)").remove(0);
        let annotation = render(&token, Contrast::Light);
        assert_eq!(annotation.raw, "hsl(0, 0%, 0%)");
        assert_eq!(annotation.style(), "background-color:hsl(0, 0%, 0%); color:white;");
    }

    #[test]
    fn test_markup_shape() {
        let annotation = Annotation { raw: "#1a1a1a".to_string(), foreground: Contrast::Light };
        assert_eq!(
            annotation.to_markup(),
            r#"<span class="changed-indicator inline" style="background-color:#1a1a1a; color:white;">#1a1a1a</span>"#
        );
    }

    #[test]
    fn test_unwrap_inverts_render() {
        let token = ColourMatcher::new().find_all("rgb(1 2 3 / 50%)").remove(0);
        let annotation = render(&token, Contrast::Dark);
        assert_eq!(annotation.unwrap(), token.raw);
    }

    #[test]
    fn test_plan_splits_text() {
        let plan = plan(&ColourMatcher::new(), "a #000 b #fff");
        assert_eq!(plan.swatches, 2);
        assert_eq!(
            plan.fragments,
            vec![
                Fragment::Text("a ".to_string()),
                swatch("#000", Contrast::Light),
                Fragment::Text(" b ".to_string()),
                swatch("#fff", Contrast::Dark),
            ]
        );
    }

    #[test]
    fn test_plan_without_tokens_is_single_text() {
        let plan = plan(&ColourMatcher::new(), "nothing here");
        assert_eq!(plan.swatches, 0);
        assert_eq!(plan.fragments, vec![Fragment::Text("nothing here".to_string())]);
    }

    #[test]
    fn test_plan_skips_unresolvable_tokens() {
        let plan = plan(&ColourMatcher::new(), "color: notacolour; and #fff");
        assert_eq!(plan.swatches, 1);
        assert_eq!(plan.errors, vec![AnnotateError::unresolvable("notacolour")]);
        assert_eq!(plan.fragments[0], Fragment::Text("color: notacolour; and ".to_string()));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }
}
