//! In-memory host: tree, change feed and manual clock.
//!
//! Deterministic stand-ins for the DOM, `MutationObserver` and `setTimeout`.
//! Every structural change is journaled as a `ChangeRecord`, exactly as an
//! observer would see it, so the watcher can be driven end to end (including
//! feeding its own writes back to it).

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::annotator::error::AnnotateError;
use crate::annotator::renderer::{escape_html, Fragment, SWATCH_CLASSES, SWATCH_TAG};
use crate::annotator::tree::{ChangeFeed, ChangeRecord, ContentTree, ObserveOptions, Scheduler, TimerId};

pub type NodeId = usize;

const DOCUMENT: NodeId = 0;

/// Journal sequence, shared by every tree so a feed can mark the moment it
/// subscribed without holding the tree
static JOURNAL_SEQ: AtomicU64 = AtomicU64::new(0);

fn next_seq() -> u64 {
    JOURNAL_SEQ.fetch_add(1, Ordering::SeqCst)
}

// =============================================================================
// MemoryTree
// =============================================================================

#[derive(Debug, Clone)]
enum NodeKind {
    Element {
        tag: String,
        classes: Vec<String>,
        style: Option<String>,
        marker: Option<String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed document tree with a change journal.
///
/// Nodes are never freed: every splice and unwrap allocates fresh nodes and
/// removed ones stay in the arena, so a `NodeId` is never reused for another
/// node. Meant for tests and short-lived headless runs, not as a long-lived
/// host.
#[derive(Debug, Clone)]
pub struct MemoryTree {
    nodes: Vec<NodeData>,
    journal: Vec<(u64, ChangeRecord<NodeId>)>,
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Element {
                    tag: "#document".to_string(),
                    classes: Vec::new(),
                    style: None,
                    marker: None,
                },
                parent: None,
                children: Vec::new(),
            }],
            journal: Vec::new(),
        }
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str, classes: &[&str]) -> NodeId {
        self.push(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
            classes: classes.iter().map(|c| c.to_string()).collect(),
            style: None,
            marker: None,
        })
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    /// Append `child` to `parent`, moving it out of any previous parent
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[parent].children.push(child);
        self.nodes[child].parent = Some(parent);
        self.record(ChangeRecord::ChildList {
            target: parent,
            added: vec![child],
        });
    }

    /// Remove a node from its parent
    pub fn remove(&mut self, node: NodeId) {
        if let Some(parent) = self.detach(node) {
            self.record(ChangeRecord::ChildList {
                target: parent,
                added: Vec::new(),
            });
        }
    }

    /// Overwrite the data of a text node (an in-place edit)
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        if let NodeKind::Text(data) = &mut self.nodes[node].kind {
            *data = text.to_string();
            self.record(ChangeRecord::CharacterData { target: node });
        }
    }

    /// Drain every record journaled since the last call
    pub fn take_records(&mut self) -> Vec<ChangeRecord<NodeId>> {
        self.journal.drain(..).map(|(_, record)| record).collect()
    }

    /// Number of nodes ever allocated, including removed ones
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    fn record(&mut self, record: ChangeRecord<NodeId>) {
        self.journal.push((next_seq(), record));
    }

    /// True if `ancestor` is `node` or one of its ancestors
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.nodes[n].parent;
        }
        false
    }

    pub fn style(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node].kind {
            NodeKind::Element { style, .. } => style.as_deref(),
            NodeKind::Text(_) => None,
        }
    }

    /// Serialized children of `node`, like `innerHTML`
    pub fn inner_markup(&self, node: NodeId) -> String {
        let mut out = String::new();
        for &child in &self.nodes[node].children {
            self.write_markup(child, &mut out);
        }
        out
    }

    fn write_markup(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node].kind {
            NodeKind::Text(text) => out.push_str(&escape_html(text)),
            NodeKind::Element { tag, classes, style, .. } => {
                out.push('<');
                out.push_str(tag);
                if !classes.is_empty() {
                    out.push_str(&format!(r#" class="{}""#, classes.join(" ")));
                }
                if let Some(style) = style {
                    out.push_str(&format!(r#" style="{}""#, escape_html(style)));
                }
                out.push('>');
                for &child in &self.nodes[node].children {
                    self.write_markup(child, out);
                }
                out.push_str(&format!("</{}>", tag));
            }
        }
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        self.nodes.len() - 1
    }

    /// Unlink a node from its parent without journaling; returns the parent
    fn detach(&mut self, node: NodeId) -> Option<NodeId> {
        let parent = self.nodes[node].parent.take()?;
        self.nodes[parent].children.retain(|&c| c != node);
        Some(parent)
    }

    fn is_text(&self, node: NodeId) -> bool {
        matches!(self.nodes[node].kind, NodeKind::Text(_))
    }

    fn attached_parent(&self, node: NodeId) -> Result<(NodeId, usize), AnnotateError> {
        if !self.is_connected(&node) {
            return Err(AnnotateError::rejected(format!("node {} is detached", node)));
        }
        let parent = self.nodes[node]
            .parent
            .ok_or_else(|| AnnotateError::rejected(format!("node {} has no parent", node)))?;
        let index = self.nodes[parent]
            .children
            .iter()
            .position(|&c| c == node)
            .ok_or_else(|| AnnotateError::rejected(format!("node {} not under its parent", node)))?;
        Ok((parent, index))
    }

    /// Swap `parent.children[range]` for `replacement`, journaling one record
    fn replace_children(&mut self, parent: NodeId, range: std::ops::RangeInclusive<usize>, replacement: Vec<NodeId>) {
        let removed: Vec<NodeId> = self.nodes[parent]
            .children
            .splice(range, replacement.iter().copied())
            .collect();
        for node in removed {
            self.nodes[node].parent = None;
        }
        for &node in &replacement {
            self.nodes[node].parent = Some(parent);
        }
        self.record(ChangeRecord::ChildList {
            target: parent,
            added: replacement,
        });
    }
}

impl ContentTree for MemoryTree {
    type Node = NodeId;

    fn document(&self) -> NodeId {
        DOCUMENT
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.nodes.get(*node)?.parent
    }

    fn children(&self, node: &NodeId) -> Vec<NodeId> {
        self.nodes.get(*node).map(|n| n.children.clone()).unwrap_or_default()
    }

    fn text(&self, node: &NodeId) -> Option<String> {
        match &self.nodes.get(*node)?.kind {
            NodeKind::Text(text) => Some(text.clone()),
            NodeKind::Element { .. } => None,
        }
    }

    fn tag_name(&self, node: &NodeId) -> Option<String> {
        match &self.nodes.get(*node)?.kind {
            NodeKind::Element { tag, .. } => Some(tag.clone()),
            NodeKind::Text(_) => None,
        }
    }

    fn has_class(&self, node: &NodeId, class: &str) -> bool {
        match self.nodes.get(*node).map(|n| &n.kind) {
            Some(NodeKind::Element { classes, .. }) => classes.iter().any(|c| c == class),
            _ => false,
        }
    }

    fn is_connected(&self, node: &NodeId) -> bool {
        *node < self.nodes.len() && self.contains(DOCUMENT, *node)
    }

    fn marker(&self, node: &NodeId) -> Option<String> {
        match &self.nodes.get(*node)?.kind {
            NodeKind::Element { marker, .. } => marker.clone(),
            NodeKind::Text(_) => None,
        }
    }

    fn set_marker(&mut self, node: &NodeId, value: &str) -> Result<(), AnnotateError> {
        match self.nodes.get_mut(*node).map(|n| &mut n.kind) {
            Some(NodeKind::Element { marker, .. }) => {
                *marker = Some(value.to_string());
                Ok(())
            }
            _ => Err(AnnotateError::rejected(format!("node {} cannot carry a marker", node))),
        }
    }

    fn unwrap_swatch(&mut self, swatch: &NodeId) -> Result<(), AnnotateError> {
        let (parent, index) = self.attached_parent(*swatch)?;
        let siblings = self.nodes[parent].children.clone();

        let start = if index > 0 && self.is_text(siblings[index - 1]) { index - 1 } else { index };
        let end = if index + 1 < siblings.len() && self.is_text(siblings[index + 1]) { index + 1 } else { index };

        let joined: String = siblings[start..=end].iter().map(|n| self.text_content(n)).collect();
        let replacement = self.create_text(&joined);
        self.replace_children(parent, start..=end, vec![replacement]);
        Ok(())
    }

    fn splice(&mut self, text_node: &NodeId, fragments: &[Fragment]) -> Result<(), AnnotateError> {
        if !self.is_text(*text_node) {
            return Err(AnnotateError::rejected(format!("node {} is not a text node", text_node)));
        }
        let (parent, index) = self.attached_parent(*text_node)?;

        let mut replacement = Vec::with_capacity(fragments.len());
        for fragment in fragments {
            match fragment {
                Fragment::Text(text) => replacement.push(self.create_text(text)),
                Fragment::Swatch(annotation) => {
                    let classes: Vec<&str> = SWATCH_CLASSES.split(' ').collect();
                    let span = self.create_element(SWATCH_TAG, &classes);
                    if let NodeKind::Element { style, .. } = &mut self.nodes[span].kind {
                        *style = Some(annotation.style());
                    }
                    let text = self.create_text(&annotation.raw);
                    self.nodes[span].children.push(text);
                    self.nodes[text].parent = Some(span);
                    replacement.push(span);
                }
            }
        }
        self.replace_children(parent, index..=index, replacement);
        Ok(())
    }
}

// =============================================================================
// MemoryFeed
// =============================================================================

/// Change feed over a `MemoryTree` journal
#[derive(Debug, Default)]
pub struct MemoryFeed {
    /// (subscription id, root, options, first journal sequence it sees)
    active: Option<(u64, NodeId, ObserveOptions, u64)>,
    next_id: u64,
    unsubscribed: usize,
}

impl MemoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the tree journal and keep what the live subscription would see.
    /// Records journaled before the subscription started are dropped.
    pub fn collect(&self, tree: &mut MemoryTree) -> Vec<ChangeRecord<NodeId>> {
        let journal = std::mem::take(&mut tree.journal);
        let Some((_, root, options, since)) = self.active else {
            return Vec::new();
        };
        journal
            .into_iter()
            .filter(|&(seq, _)| seq >= since)
            .map(|(_, record)| record)
            .filter(|r| options.accepts_kind(r))
            .filter(|r| {
                let target = *r.target();
                target == root || (options.subtree && tree.contains(root, target))
            })
            .collect()
    }

    pub fn live_subscriptions(&self) -> usize {
        usize::from(self.active.is_some())
    }

    pub fn observed_root(&self) -> Option<NodeId> {
        self.active.map(|(_, root, _, _)| root)
    }

    pub fn unsubscribe_count(&self) -> usize {
        self.unsubscribed
    }
}

impl ChangeFeed for MemoryFeed {
    type Node = NodeId;
    type Subscription = u64;

    fn subscribe(&mut self, root: &NodeId, options: ObserveOptions) -> Result<u64, AnnotateError> {
        if self.active.is_some() {
            return Err(AnnotateError::rejected("feed already has a live subscription"));
        }
        self.next_id += 1;
        let since = JOURNAL_SEQ.load(Ordering::SeqCst);
        self.active = Some((self.next_id, *root, options, since));
        Ok(self.next_id)
    }

    fn unsubscribe(&mut self, subscription: u64) {
        if matches!(self.active, Some((id, _, _, _)) if id == subscription) {
            self.active = None;
            self.unsubscribed += 1;
        }
    }
}

// =============================================================================
// ManualClock
// =============================================================================

/// Scheduler driven by explicit clock advances
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ManualClock {
    now_ms: u64,
    timers: Vec<(TimerId, u64)>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance time and return the timers that came due, earliest first
    pub fn advance(&mut self, ms: u64) -> Vec<TimerId> {
        self.now_ms += ms;
        let now = self.now_ms;
        let mut due: Vec<(TimerId, u64)> = self.timers.iter().copied().filter(|&(_, at)| at <= now).collect();
        self.timers.retain(|&(_, at)| at > now);
        due.sort_by_key(|&(id, at)| (at, id));
        due.into_iter().map(|(id, _)| id).collect()
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }
}

impl Scheduler for ManualClock {
    fn schedule(&mut self, timer: TimerId, delay_ms: u32) -> Result<(), AnnotateError> {
        self.timers.push((timer, self.now_ms + delay_ms as u64));
        Ok(())
    }

    fn cancel(&mut self, timer: TimerId) {
        self.timers.retain(|&(id, _)| id != timer);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotator::renderer::Annotation;
    use crate::annotator::resolver::Contrast;

    fn paragraph(tree: &mut MemoryTree, text: &str) -> (NodeId, NodeId) {
        let p = tree.create_element("div", &["messageContent"]);
        let t = tree.create_text(text);
        tree.append_child(p, t);
        tree.append_child(tree.document(), p);
        tree.take_records();
        (p, t)
    }

    #[test]
    fn test_connected_only_under_document() {
        let mut tree = MemoryTree::new();
        let (p, t) = paragraph(&mut tree, "hi");
        let loose = tree.create_text("loose");
        assert!(tree.is_connected(&p));
        assert!(tree.is_connected(&t));
        assert!(!tree.is_connected(&loose));
        tree.remove(p);
        assert!(!tree.is_connected(&t));
    }

    #[test]
    fn test_splice_and_markup() {
        let mut tree = MemoryTree::new();
        let (p, t) = paragraph(&mut tree, "a #000 b");
        let fragments = vec![
            Fragment::Text("a ".to_string()),
            Fragment::Swatch(Annotation { raw: "#000".to_string(), foreground: Contrast::Light }),
            Fragment::Text(" b".to_string()),
        ];
        tree.splice(&t, &fragments).unwrap();
        assert_eq!(
            tree.inner_markup(p),
            r#"a <span class="changed-indicator inline" style="background-color:#000; color:white;">#000</span> b"#
        );
        assert_eq!(tree.text_content(&p), "a #000 b");

        let records = tree.take_records();
        assert_eq!(records.len(), 1);
        assert!(matches!(&records[0], ChangeRecord::ChildList { target, added } if *target == p && added.len() == 3));
    }

    #[test]
    fn test_unwrap_merges_neighbours() {
        let mut tree = MemoryTree::new();
        let (p, t) = paragraph(&mut tree, "a #000 b");
        let fragments = vec![
            Fragment::Text("a ".to_string()),
            Fragment::Swatch(Annotation { raw: "#000".to_string(), foreground: Contrast::Light }),
            Fragment::Text(" b".to_string()),
        ];
        tree.splice(&t, &fragments).unwrap();
        let swatch = tree.find_first(&p, "changed-indicator").unwrap();
        tree.unwrap_swatch(&swatch).unwrap();

        assert_eq!(tree.children(&p).len(), 1);
        assert_eq!(tree.inner_markup(p), "a #000 b");
    }

    #[test]
    fn test_splice_detached_rejected() {
        let mut tree = MemoryTree::new();
        let loose = tree.create_text("#fff");
        let err = tree.splice(&loose, &[]).unwrap_err();
        assert!(matches!(err, AnnotateError::DomWriteRejected { .. }));
    }

    #[test]
    fn test_set_text_journals_character_data() {
        let mut tree = MemoryTree::new();
        let (_, t) = paragraph(&mut tree, "old");
        tree.set_text(t, "new");
        assert_eq!(tree.take_records(), vec![ChangeRecord::CharacterData { target: t }]);
    }

    #[test]
    fn test_feed_filters_by_root() {
        let mut tree = MemoryTree::new();
        let root = tree.create_element("div", &["scrollerInner"]);
        tree.append_child(tree.document(), root);
        let outside = tree.create_element("div", &[]);
        tree.append_child(tree.document(), outside);

        let mut feed = MemoryFeed::new();
        assert!(feed.collect(&mut tree).is_empty());

        let sub = feed.subscribe(&root, ObserveOptions::content()).unwrap();
        let inside = tree.create_text("in");
        tree.append_child(root, inside);
        let other = tree.create_text("out");
        tree.append_child(outside, other);

        let records = feed.collect(&mut tree);
        assert_eq!(records.len(), 1);
        assert_eq!(*records[0].target(), root);

        feed.unsubscribe(sub);
        assert_eq!(feed.live_subscriptions(), 0);
    }

    #[test]
    fn test_feed_ignores_writes_before_subscribe() {
        let mut tree = MemoryTree::new();
        let root = tree.create_element("div", &["scrollerInner"]);
        tree.append_child(tree.document(), root);
        let early = tree.create_text("early");
        tree.append_child(root, early);

        let mut feed = MemoryFeed::new();
        feed.subscribe(&root, ObserveOptions::content()).unwrap();
        let late = tree.create_text("late");
        tree.append_child(root, late);

        let records = feed.collect(&mut tree);
        assert_eq!(records, vec![ChangeRecord::ChildList { target: root, added: vec![late] }]);
    }

    #[test]
    fn test_arena_keeps_removed_nodes() {
        let mut tree = MemoryTree::new();
        let (p, _) = paragraph(&mut tree, "#000");
        let before = tree.arena_len();
        tree.remove(p);
        assert_eq!(tree.arena_len(), before);
        assert!(!tree.is_connected(&p));
    }

    #[test]
    fn test_feed_single_subscription() {
        let mut feed = MemoryFeed::new();
        feed.subscribe(&1, ObserveOptions::content()).unwrap();
        assert!(feed.subscribe(&2, ObserveOptions::content()).is_err());
    }

    #[test]
    fn test_manual_clock() {
        let mut clock = ManualClock::new();
        clock.schedule(1, 500).unwrap();
        clock.schedule(2, 100).unwrap();
        clock.schedule(3, 500).unwrap();
        clock.cancel(3);
        assert_eq!(clock.advance(100), vec![2]);
        assert!(clock.advance(399).is_empty());
        assert_eq!(clock.advance(1), vec![1]);
        assert_eq!(clock.pending(), 0);
    }
}
