//! ContrastResolver: colour normalization + contrast decision
//!
//! Normalizes any supported notation to RGBA directly (no render/read-back):
//! - Hex: #rgb, #rgba, #rrggbb, #rrggbbaa
//! - rgb()/rgba(): comma or space separated, numbers or percentages, `/ alpha`
//! - hsl()/hsla(): hue as number, deg, rad, grad or turn
//! - CSS named colours (see `palette`)
//!
//! The contrast decision uses a perceptual-luminance heuristic, not CIE
//! relative luminance: `(0.299 r + 0.587 g + 0.114 b) * a / 255 < 0.5` picks a
//! light foreground.

use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

use crate::annotator::error::AnnotateError;
use crate::annotator::matcher::ColourToken;
use crate::annotator::palette;

// =============================================================================
// Types
// =============================================================================

/// A colour normalized to RGBA
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedColour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// Alpha in [0, 1]
    pub a: f32,
}

impl ResolvedColour {
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Weighted brightness estimate in [0, 1], scaled by alpha
    pub fn luminance(&self) -> f32 {
        (0.299 * self.r as f32 + 0.587 * self.g as f32 + 0.114 * self.b as f32) * self.a / 255.0
    }

    pub fn contrast(&self) -> Contrast {
        if self.luminance() < LUMINANCE_THRESHOLD {
            Contrast::Light
        } else {
            Contrast::Dark
        }
    }
}

/// Foreground choice for a swatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Contrast {
    Light,
    Dark,
}

impl Contrast {
    /// CSS colour literal written into the swatch style
    pub fn as_css(&self) -> &'static str {
        match self {
            Contrast::Light => "white",
            Contrast::Dark => "black",
        }
    }
}

const LUMINANCE_THRESHOLD: f32 = 0.5;

// =============================================================================
// Resolution
// =============================================================================

/// Resolve a matched token to RGBA
pub fn resolve(token: &ColourToken) -> Result<ResolvedColour, AnnotateError> {
    resolve_str(&token.raw)
}

/// Resolve colour text in any supported notation to RGBA
pub fn resolve_str(raw: &str) -> Result<ResolvedColour, AnnotateError> {
    let text = raw.trim();
    let resolved = if let Some(digits) = text.strip_prefix('#') {
        parse_hex(digits)
    } else if let Some(open) = text.find('(') {
        parse_functional(&text[..open], &text[open + 1..])
    } else {
        palette::lookup(text).map(|([r, g, b], a)| ResolvedColour::rgba(r, g, b, a))
    };
    resolved.ok_or_else(|| AnnotateError::unresolvable(raw))
}

/// Resolve and decide the foreground in one step
pub fn contrast_for(raw: &str) -> Result<Contrast, AnnotateError> {
    resolve_str(raw).map(|c| c.contrast())
}

fn parse_hex(digits: &str) -> Option<ResolvedColour> {
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&digits[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();

    match digits.len() {
        3 => Some(ResolvedColour::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
        4 => Some(ResolvedColour::rgba(
            nibble(0)?,
            nibble(1)?,
            nibble(2)?,
            nibble(3)? as f32 / 255.0,
        )),
        6 => Some(ResolvedColour::rgb(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(ResolvedColour::rgba(
            byte(0)?,
            byte(2)?,
            byte(4)?,
            byte(6)? as f32 / 255.0,
        )),
        _ => None,
    }
}

fn parse_functional(name: &str, rest: &str) -> Option<ResolvedColour> {
    let args = rest.strip_suffix(')')?;
    let (channels, alpha) = split_arguments(args)?;
    let a = match alpha {
        Some(text) => parse_alpha(text)?,
        None => 1.0,
    };

    match name.trim().to_ascii_lowercase().as_str() {
        "rgb" | "rgba" => Some(ResolvedColour::rgba(
            parse_rgb_channel(channels[0])?,
            parse_rgb_channel(channels[1])?,
            parse_rgb_channel(channels[2])?,
            a,
        )),
        "hsl" | "hsla" => {
            let h = parse_hue(channels[0])?;
            let s = parse_fraction(channels[1])?;
            let l = parse_fraction(channels[2])?;
            let [r, g, b] = hsl_to_rgb(h, s, l);
            Some(ResolvedColour::rgba(r, g, b, a))
        }
        _ => None,
    }
}

/// Split `1, 2, 3, 0.5` or `1 2 3 / 0.5` into three channels and an optional alpha
fn split_arguments(args: &str) -> Option<([&str; 3], Option<&str>)> {
    let (parts, alpha): (Vec<&str>, Option<&str>) = if args.contains(',') {
        let mut parts: Vec<&str> = args.split(',').map(str::trim).collect();
        let alpha = if parts.len() == 4 { parts.pop() } else { None };
        (parts, alpha)
    } else {
        let (body, alpha) = match args.split_once('/') {
            Some((body, alpha)) => (body, Some(alpha.trim())),
            None => (args, None),
        };
        (body.split_whitespace().collect(), alpha)
    };

    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    Some(([parts[0], parts[1], parts[2]], alpha))
}

fn parse_number(text: &str) -> Option<f32> {
    text.trim().parse::<f32>().ok().filter(|v| v.is_finite())
}

fn parse_rgb_channel(text: &str) -> Option<u8> {
    let value = match text.strip_suffix('%') {
        Some(pct) => parse_number(pct)? / 100.0 * 255.0,
        None => parse_number(text)?,
    };
    Some(value.clamp(0.0, 255.0).round() as u8)
}

fn parse_alpha(text: &str) -> Option<f32> {
    let value = match text.strip_suffix('%') {
        Some(pct) => parse_number(pct)? / 100.0,
        None => parse_number(text)?,
    };
    Some(value.clamp(0.0, 1.0))
}

/// Saturation / lightness as a fraction in [0, 1]. Bare numbers are read as
/// percentages, as in the modern space-separated syntax.
fn parse_fraction(text: &str) -> Option<f32> {
    let pct = match text.strip_suffix('%') {
        Some(pct) => parse_number(pct)?,
        None => parse_number(text)?,
    };
    Some((pct / 100.0).clamp(0.0, 1.0))
}

/// Hue in degrees
fn parse_hue(text: &str) -> Option<f32> {
    let text = text.trim().to_ascii_lowercase();
    let degrees = if let Some(v) = text.strip_suffix("deg") {
        parse_number(v)?
    } else if let Some(v) = text.strip_suffix("grad") {
        parse_number(v)? * 0.9
    } else if let Some(v) = text.strip_suffix("rad") {
        parse_number(v)?.to_degrees()
    } else if let Some(v) = text.strip_suffix("turn") {
        parse_number(v)? * 360.0
    } else {
        parse_number(&text)?
    };
    // Unit scaling can overflow a finite input
    if !degrees.is_finite() {
        return None;
    }
    Some(degrees.rem_euclid(360.0))
}

/// CSS hsl() to sRGB, channels rounded to bytes
fn hsl_to_rgb(h: f32, s: f32, l: f32) -> [u8; 3] {
    let a = s * l.min(1.0 - l);
    let channel = |n: f32| {
        let k = (n + h / 30.0) % 12.0;
        let v = l - a * (k - 3.0).min(9.0 - k).clamp(-1.0, 1.0);
        (v * 255.0).round().clamp(0.0, 255.0) as u8
    };
    [channel(0.0), channel(8.0), channel(4.0)]
}

// =============================================================================
// WASM Bindings
// =============================================================================

/// Resolve colour text to `{ r, g, b, a }`
#[wasm_bindgen(js_name = resolveColour)]
pub fn js_resolve_colour(text: &str) -> Result<JsValue, JsValue> {
    let colour = resolve_str(text).map_err(|e| JsValue::from_str(&e.to_string()))?;
    serde_wasm_bindgen::to_value(&colour)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Foreground literal ("white" or "black") for colour text
#[wasm_bindgen(js_name = contrastFor)]
pub fn js_contrast_for(text: &str) -> Result<String, JsValue> {
    contrast_for(text)
        .map(|c| c.as_css().to_string())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Reference decision computed by hand from opaque RGB
    fn manual_is_dark(r: u8, g: u8, b: u8) -> bool {
        (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64) / 255.0 < 0.5
    }

    #[test]
    fn test_hex_short_and_long() {
        assert_eq!(resolve_str("#fff").unwrap(), ResolvedColour::rgb(255, 255, 255));
        assert_eq!(resolve_str("#1a1a1a").unwrap(), ResolvedColour::rgb(26, 26, 26));
        assert_eq!(resolve_str("#ABC").unwrap(), ResolvedColour::rgb(0xaa, 0xbb, 0xcc));
    }

    #[test]
    fn test_hex_with_alpha() {
        let c = resolve_str("#ff000080").unwrap();
        assert_eq!((c.r, c.g, c.b), (255, 0, 0));
        assert!((c.a - 128.0 / 255.0).abs() < 1e-6);

        let c = resolve_str("#f008").unwrap();
        assert!((c.a - 136.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_hex_invalid() {
        assert!(resolve_str("#12345").is_err());
        assert!(resolve_str("#zzz").is_err());
    }

    #[test]
    fn test_rgb_comma_and_space_syntax() {
        assert_eq!(resolve_str("rgb(255, 0, 0)").unwrap(), ResolvedColour::rgb(255, 0, 0));
        assert_eq!(resolve_str("rgb(255 0 0)").unwrap(), ResolvedColour::rgb(255, 0, 0));
        assert_eq!(resolve_str("rgb(100%, 0%, 50%)").unwrap(), ResolvedColour::rgb(255, 0, 128));
    }

    #[test]
    fn test_rgba_alpha() {
        let c = resolve_str("rgba(0, 0, 0, 0.5)").unwrap();
        assert_eq!(c.a, 0.5);
        let c = resolve_str("rgb(0 0 0 / 25%)").unwrap();
        assert_eq!(c.a, 0.25);
    }

    #[test]
    fn test_rgb_clamps_out_of_range() {
        assert_eq!(resolve_str("rgb(300, -5, 0)").unwrap(), ResolvedColour::rgb(255, 0, 0));
    }

    #[test]
    fn test_hsl() {
        assert_eq!(resolve_str("hsl(0, 100%, 50%)").unwrap(), ResolvedColour::rgb(255, 0, 0));
        assert_eq!(resolve_str("hsl(120deg 100% 50%)").unwrap(), ResolvedColour::rgb(0, 255, 0));
        assert_eq!(resolve_str("hsl(0.5turn, 100%, 50%)").unwrap(), ResolvedColour::rgb(0, 255, 255));
        assert_eq!(resolve_str("hsl(240, 100%, 25%)").unwrap(), ResolvedColour::rgb(0, 0, 128));
        assert_eq!(resolve_str("hsl(0, 0%, 100%)").unwrap(), ResolvedColour::rgb(255, 255, 255));
    }

    #[test]
    fn test_hsla_alpha() {
        let c = resolve_str("hsla(0, 0%, 0%, 0.3)").unwrap();
        assert_eq!((c.r, c.g, c.b), (0, 0, 0));
        assert!((c.a - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_named() {
        assert_eq!(resolve_str("red").unwrap(), ResolvedColour::rgb(255, 0, 0));
        assert_eq!(resolve_str("White").unwrap(), ResolvedColour::rgb(255, 255, 255));
    }

    #[test]
    fn test_unresolvable() {
        assert_eq!(
            resolve_str("notacolour"),
            Err(AnnotateError::UnresolvableColour { token: "notacolour".to_string() })
        );
        assert!(resolve_str("rgb(1, 2)").is_err());
        assert!(resolve_str("rgb(a, b, c)").is_err());
        assert!(resolve_str("lab(50 0 0)").is_err());
        assert!(resolve_str("rgb(inf, 0, 0)").is_err());
    }

    #[test]
    fn test_hue_overflowing_after_unit_scaling() {
        assert!(resolve_str("hsl(1e38turn, 100%, 50%)").is_err());
        assert!(resolve_str("hsl(3e38deg, 100%, 50%)").is_ok());
    }

    #[test]
    fn test_luminance_scenario_dark_hex() {
        let c = resolve_str("#1a1a1a").unwrap();
        assert!((c.luminance() - 26.0 / 255.0).abs() < 1e-4);
        assert_eq!(c.contrast(), Contrast::Light);
        assert_eq!(c.contrast().as_css(), "white");
    }

    #[test]
    fn test_luminance_scenario_red() {
        let c = resolve_str("red").unwrap();
        assert!((c.luminance() - 0.299).abs() < 1e-4);
        assert_eq!(c.contrast().as_css(), "white");
    }

    #[test]
    fn test_light_colour_gets_dark_foreground() {
        assert_eq!(contrast_for("#ffffff").unwrap(), Contrast::Dark);
        assert_eq!(contrast_for("yellow").unwrap(), Contrast::Dark);
    }

    #[test]
    fn test_alpha_darkens_luminance() {
        // White at zero alpha counts as dark
        assert_eq!(contrast_for("rgba(255, 255, 255, 0)").unwrap(), Contrast::Light);
        assert_eq!(contrast_for("transparent").unwrap(), Contrast::Light);
    }

    #[test]
    fn test_decision_matches_manual_rgb_for_all_notations() {
        let cases: &[(&str, (u8, u8, u8))] = &[
            ("#808080", (128, 128, 128)),
            ("#7f7f7f", (127, 127, 127)),
            ("#0f0", (0, 255, 0)),
            ("#00f", (0, 0, 255)),
            ("#336699ff", (0x33, 0x66, 0x99)),
            ("#369f", (0x33, 0x66, 0x99)),
            ("rgb(200, 100, 50)", (200, 100, 50)),
            ("rgba(10, 200, 30, 1)", (10, 200, 30)),
            ("hsl(60, 100%, 50%)", (255, 255, 0)),
            ("hsla(240, 100%, 50%, 1)", (0, 0, 255)),
            ("orange", (255, 165, 0)),
            ("navy", (0, 0, 128)),
        ];
        for (text, (r, g, b)) in cases {
            let expected = if manual_is_dark(*r, *g, *b) { Contrast::Light } else { Contrast::Dark };
            assert_eq!(contrast_for(text).unwrap(), expected, "decision for {}", text);
        }
    }
}
