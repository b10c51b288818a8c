//! Annotator: one annotation pass over a content node.
//!
//! Pass order:
//! 1. Skip if the node's stamp matches its current text and swatch count
//! 2. Unwrap every existing swatch so matching sees clean text
//! 3. Plan + splice each in-scope text node
//! 4. Stamp the node with the fingerprint of its text and its swatch count

use serde::{Deserialize, Serialize};

use crate::annotator::change;
use crate::annotator::config::AnnotationScope;
use crate::annotator::error::AnnotateError;
use crate::annotator::matcher::ColourMatcher;
use crate::annotator::renderer::{self, MARKER_CLASS};
use crate::annotator::tree::ContentTree;

/// Outcome of one pass over one content node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PassOutcome {
    /// Swatches present after the pass
    pub swatches: usize,
    /// Swatches removed before rescanning
    pub unwrapped: usize,
    /// True if the stamp matched and nothing was written
    pub unchanged: bool,
    /// Tokens that could not be resolved (left as plain text)
    pub errors: Vec<AnnotateError>,
}

#[derive(Debug, Clone, Default)]
pub struct Annotator {
    matcher: ColourMatcher,
    scope: AnnotationScope,
}

impl Annotator {
    pub fn new(scope: AnnotationScope) -> Self {
        Self {
            matcher: ColourMatcher::new(),
            scope,
        }
    }

    pub fn scope(&self) -> AnnotationScope {
        self.scope
    }

    /// Annotate `node` unless its stamp says it is already up to date
    pub fn annotate<T: ContentTree>(&self, tree: &mut T, node: &T::Node) -> Result<PassOutcome, AnnotateError> {
        if !tree.is_connected(node) {
            return Err(AnnotateError::rejected("content node is detached"));
        }
        let present = tree.find_all(node, MARKER_CLASS).len();
        let check = change::check(tree.marker(node).as_deref(), &tree.text_content(node), present);
        if !check.has_changed {
            return Ok(PassOutcome {
                unchanged: true,
                ..Default::default()
            });
        }
        self.annotate_forced(tree, node)
    }

    /// Unwrap and rescan `node` regardless of its stamp
    pub fn annotate_forced<T: ContentTree>(&self, tree: &mut T, node: &T::Node) -> Result<PassOutcome, AnnotateError> {
        if !tree.is_connected(node) {
            return Err(AnnotateError::rejected("content node is detached"));
        }
        let mut outcome = PassOutcome {
            unwrapped: self.unwrap_all(tree, node)?,
            ..Default::default()
        };

        for (text_node, in_code) in tree.text_nodes(node) {
            if self.scope == AnnotationScope::CodeOnly && !in_code {
                continue;
            }
            let Some(text) = tree.text(&text_node) else {
                continue;
            };
            let plan = renderer::plan(&self.matcher, &text);
            outcome.errors.extend(plan.errors);
            if plan.swatches == 0 {
                continue;
            }
            tree.splice(&text_node, &plan.fragments)?;
            outcome.swatches += plan.swatches;
        }

        let stamp = change::stamp(&tree.text_content(node), outcome.swatches);
        tree.set_marker(node, &stamp)?;
        Ok(outcome)
    }

    /// Replace every swatch under `node` with its text
    pub fn unwrap_all<T: ContentTree>(&self, tree: &mut T, node: &T::Node) -> Result<usize, AnnotateError> {
        let swatches = tree.find_all(node, MARKER_CLASS);
        for swatch in &swatches {
            tree.unwrap_swatch(swatch)?;
        }
        Ok(swatches.len())
    }
}
