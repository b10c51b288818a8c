//! Error taxonomy for the annotation pipeline.
//!
//! Every variant is recovered locally at token or node granularity; none of
//! them stops a mutation batch. "No colour found" is not an error at all, just
//! an empty token sequence.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnnotateError {
    /// The token looks like a colour but cannot be normalized to RGBA
    UnresolvableColour { token: String },
    /// The target node was detached or replaced before the write landed
    DomWriteRejected { reason: String },
    /// Activation found no message-list root with the configured class
    RootNotFound { class: String },
    /// Configuration could not be parsed
    InvalidConfig(String),
}

impl AnnotateError {
    pub fn unresolvable(token: &str) -> Self {
        AnnotateError::UnresolvableColour {
            token: token.to_string(),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        AnnotateError::DomWriteRejected {
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for AnnotateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnnotateError::UnresolvableColour { token } => {
                write!(f, "Unresolvable colour: {}", token)
            }
            AnnotateError::DomWriteRejected { reason } => write!(f, "DOM write rejected: {}", reason),
            AnnotateError::RootNotFound { class } => {
                write!(f, "Message list root not found (class '{}')", class)
            }
            AnnotateError::InvalidConfig(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for AnnotateError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_token() {
        let err = AnnotateError::unresolvable("notacolour");
        assert_eq!(err.to_string(), "Unresolvable colour: notacolour");
    }

    #[test]
    fn test_display_rejected() {
        let err = AnnotateError::rejected("node detached");
        assert!(err.to_string().contains("node detached"));
    }
}
