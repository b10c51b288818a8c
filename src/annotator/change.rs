//! Content fingerprints for the node-local "already annotated" marker.
//!
//! A content node is stamped after each pass with `<hash of its text>:<swatch
//! count>`. The text of an annotated node equals the text before annotation
//! (a swatch holds its token verbatim), so the hash alone cannot tell whether
//! the host re-rendered the node and dropped its swatches. The count can: a
//! stamp only matches while both the text and the swatches are as written.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Result of comparing a node's text with its stamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeCheck {
    /// True if the text or swatch count differs from the stamp (or there is
    /// no stamp)
    pub has_changed: bool,
    /// Fingerprint of the current text
    pub fingerprint: String,
}

/// Stamp for a node holding `text` and `swatches` swatches
pub fn stamp(text: &str, swatches: usize) -> String {
    format!("{}:{}", fingerprint(text), swatches)
}

/// Hex fingerprint of text
pub fn fingerprint(text: &str) -> String {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    format!("{:x}", hasher.finish())
}

/// Compare a node's text and present swatch count against its stored stamp
pub fn check(stored: Option<&str>, text: &str, swatches: usize) -> ChangeCheck {
    let fingerprint = fingerprint(text);
    let current = format!("{}:{}", fingerprint, swatches);
    let has_changed = stored != Some(current.as_str());
    ChangeCheck {
        has_changed,
        fingerprint,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_stamp_is_changed() {
        assert!(check(None, "Hello world", 0).has_changed);
    }

    #[test]
    fn test_same_text_unchanged() {
        let stored = stamp("Hello #fff", 1);
        assert!(!check(Some(&stored), "Hello #fff", 1).has_changed);
    }

    #[test]
    fn test_different_text_changed() {
        let stored = stamp("Hello world", 0);
        assert!(check(Some(&stored), "Hello universe", 0).has_changed);
    }

    #[test]
    fn test_missing_swatches_changed() {
        // Same text, but the host dropped the swatch
        let stored = stamp("#fff", 1);
        assert!(check(Some(&stored), "#fff", 0).has_changed);
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(fingerprint("The quick brown fox"), fingerprint("The quick brown fox"));
    }

    #[test]
    fn test_whitespace_matters() {
        assert_ne!(fingerprint("Hello world"), fingerprint("Hello  world"));
        assert_ne!(fingerprint(""), fingerprint(" "));
    }
}
