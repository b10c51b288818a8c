//! Host seams: the observed tree, its change feed, and timers.
//!
//! The core only ever talks to these traits. `MemoryTree` implements them in
//! memory; the `dom` module implements them over `web-sys`.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::annotator::error::AnnotateError;
use crate::annotator::renderer::Fragment;

// =============================================================================
// Change records
// =============================================================================

/// One entry of a change batch
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeRecord<N> {
    /// Children of `target` were inserted and/or removed
    ChildList { target: N, added: Vec<N> },
    /// The data of text node `target` changed
    CharacterData { target: N },
}

impl<N> ChangeRecord<N> {
    pub fn target(&self) -> &N {
        match self {
            ChangeRecord::ChildList { target, .. } => target,
            ChangeRecord::CharacterData { target } => target,
        }
    }
}

/// What a subscription reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserveOptions {
    pub child_list: bool,
    pub subtree: bool,
    pub character_data: bool,
}

impl ObserveOptions {
    /// Child insertion/removal and text changes anywhere under the root
    pub fn content() -> Self {
        Self {
            child_list: true,
            subtree: true,
            character_data: true,
        }
    }

    pub fn accepts_kind<N>(&self, record: &ChangeRecord<N>) -> bool {
        match record {
            ChangeRecord::ChildList { .. } => self.child_list,
            ChangeRecord::CharacterData { .. } => self.character_data,
        }
    }
}

// =============================================================================
// ContentTree
// =============================================================================

/// Read/write access to the observed tree.
///
/// Navigation is re-queried on every call; implementations must not cache
/// structure across callbacks.
pub trait ContentTree {
    type Node: Clone + PartialEq + Debug;

    /// Top of the tree (the document)
    fn document(&self) -> Self::Node;
    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;
    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;
    /// Data of a text node; `None` for elements
    fn text(&self, node: &Self::Node) -> Option<String>;
    /// Lower-case tag name of an element; `None` for text nodes
    fn tag_name(&self, node: &Self::Node) -> Option<String>;
    fn has_class(&self, node: &Self::Node, class: &str) -> bool;
    fn is_connected(&self, node: &Self::Node) -> bool;

    /// Node-local "already annotated" stamp
    fn marker(&self, node: &Self::Node) -> Option<String>;
    fn set_marker(&mut self, node: &Self::Node, value: &str) -> Result<(), AnnotateError>;

    /// Replace a swatch element, together with any text siblings directly
    /// before and after it, by one text node holding their joined text.
    ///
    /// Must only insert/remove children; changing character data would show
    /// up as an edit in the change feed.
    fn unwrap_swatch(&mut self, swatch: &Self::Node) -> Result<(), AnnotateError>;

    /// Replace a text node by the given fragments, in order
    fn splice(&mut self, text_node: &Self::Node, fragments: &[Fragment]) -> Result<(), AnnotateError>;

    /// Concatenated text of all descendant text nodes
    fn text_content(&self, node: &Self::Node) -> String {
        if let Some(text) = self.text(node) {
            return text;
        }
        self.children(node)
            .iter()
            .map(|child| self.text_content(child))
            .collect()
    }

    /// Nearest inclusive ancestor carrying `class`
    fn closest(&self, node: &Self::Node, class: &str) -> Option<Self::Node> {
        let mut current = Some(node.clone());
        while let Some(n) = current {
            if self.has_class(&n, class) {
                return Some(n);
            }
            current = self.parent(&n);
        }
        None
    }

    /// First descendant (document order, excluding `node`) carrying `class`
    fn find_first(&self, node: &Self::Node, class: &str) -> Option<Self::Node> {
        for child in self.children(node) {
            if self.has_class(&child, class) {
                return Some(child);
            }
            if let Some(found) = self.find_first(&child, class) {
                return Some(found);
            }
        }
        None
    }

    /// All descendants carrying `class`, in document order. Matches are not
    /// descended into.
    fn find_all(&self, node: &Self::Node, class: &str) -> Vec<Self::Node> {
        let mut found = Vec::new();
        for child in self.children(node) {
            if self.has_class(&child, class) {
                found.push(child);
            } else {
                found.extend(self.find_all(&child, class));
            }
        }
        found
    }

    /// Descendant text nodes in document order, each paired with whether it
    /// sits inside a `code` element below `node`
    fn text_nodes(&self, node: &Self::Node) -> Vec<(Self::Node, bool)> {
        fn walk<T: ContentTree + ?Sized>(tree: &T, node: &T::Node, in_code: bool, out: &mut Vec<(T::Node, bool)>) {
            for child in tree.children(node) {
                if tree.text(&child).is_some() {
                    out.push((child, in_code));
                } else {
                    let code = in_code || tree.tag_name(&child).as_deref() == Some("code");
                    walk(tree, &child, code, out);
                }
            }
        }
        let mut out = Vec::new();
        walk(self, node, false, &mut out);
        out
    }
}

// =============================================================================
// ChangeFeed / Scheduler
// =============================================================================

/// Subscription-based source of change batches
pub trait ChangeFeed {
    type Node;
    type Subscription;

    fn subscribe(
        &mut self,
        root: &Self::Node,
        options: ObserveOptions,
    ) -> Result<Self::Subscription, AnnotateError>;

    fn unsubscribe(&mut self, subscription: Self::Subscription);
}

/// Identity of one debounce timer
pub type TimerId = u64;

/// Host timers. A scheduled timer must later be delivered back to the watcher
/// (`MutationWatcher::fire`) unless it was cancelled.
pub trait Scheduler {
    fn schedule(&mut self, timer: TimerId, delay_ms: u32) -> Result<(), AnnotateError>;
    fn cancel(&mut self, timer: TimerId);
}
