//! MutationWatcher: classifies change batches and drives annotation passes
//!
//! # State machine
//! `Idle` → (attach) → `Observing` → (detach) → `Idle`
//!
//! # Classification (per record, in delivery order)
//! - Content node appended: debounce, the host may still rewrite it
//!   (link/embed expansion). An earlier timer for the same node is replaced.
//! - Message wrapper appended: annotate its content node now.
//! - Character data edited: annotate the enclosing content node now,
//!   cancelling its pending debounce first (last edit wins).
//! - Anything else, including the watcher's own swatches, is ignored.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::annotator::config::{IndicatorConfig, Locator};
use crate::annotator::error::AnnotateError;
use crate::annotator::pipeline::Annotator;
use crate::annotator::tree::{ChangeRecord, ContentTree, Scheduler, TimerId};

// =============================================================================
// State Machine
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum WatchState<N> {
    /// No root attached; batches are ignored
    Idle,
    /// Attached to a message-list root
    Observing { root: N },
}

/// A content node waiting out its debounce
#[derive(Debug, Clone)]
struct PendingEdit<N> {
    timer: TimerId,
    node: N,
}

// =============================================================================
// Reports
// =============================================================================

/// What one batch (or one timer) did
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Passes that wrote to the tree
    pub annotated: usize,
    /// Passes skipped because the node's stamp was current
    pub unchanged: usize,
    pub swatches: usize,
    pub scheduled: usize,
    pub cancelled: usize,
    pub ignored: usize,
    pub errors: Vec<AnnotateError>,
}

impl BatchReport {
    /// Number of passes that actually rewrote a node
    pub fn passes(&self) -> usize {
        self.annotated
    }
}

/// Cumulative watcher statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatchStats {
    pub batches: u64,
    pub passes: u64,
    pub unchanged_skips: u64,
    pub swatches: u64,
    pub scheduled: u64,
    pub cancelled: u64,
    pub errors: u64,
    /// Duration of the most recent pass
    pub last_pass_us: u64,
}

impl WatchStats {
    fn absorb(&mut self, report: &BatchReport) {
        self.passes += report.annotated as u64;
        self.unchanged_skips += report.unchanged as u64;
        self.swatches += report.swatches as u64;
        self.scheduled += report.scheduled as u64;
        self.cancelled += report.cancelled as u64;
        self.errors += report.errors.len() as u64;
    }
}

// =============================================================================
// MutationWatcher
// =============================================================================

pub struct MutationWatcher<N> {
    annotator: Annotator,
    locator: Locator,
    debounce_ms: u32,
    state: WatchState<N>,
    pending: Vec<PendingEdit<N>>,
    next_timer: TimerId,
    stats: WatchStats,
}

impl<N: Clone + PartialEq + Debug> MutationWatcher<N> {
    pub fn new(config: &IndicatorConfig) -> Self {
        Self {
            annotator: Annotator::new(config.scope),
            locator: config.locator.clone(),
            debounce_ms: config.debounce_ms,
            state: WatchState::Idle,
            pending: Vec::new(),
            next_timer: 0,
            stats: WatchStats::default(),
        }
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn stats(&self) -> &WatchStats {
        &self.stats
    }

    pub fn is_observing(&self) -> bool {
        matches!(self.state, WatchState::Observing { .. })
    }

    /// Current state name (for debugging)
    pub fn state_name(&self) -> &'static str {
        match self.state {
            WatchState::Idle => "idle",
            WatchState::Observing { .. } => "observing",
        }
    }

    pub fn root(&self) -> Option<&N> {
        match &self.state {
            WatchState::Observing { root } => Some(root),
            WatchState::Idle => None,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Start observing `root`
    pub fn attach(&mut self, root: N) {
        self.state = WatchState::Observing { root };
    }

    /// Stop observing. Pending debounces are dropped, so their timers fire
    /// as no-ops. Returns whether the watcher was observing.
    pub fn detach(&mut self) -> bool {
        self.pending.clear();
        std::mem::replace(&mut self.state, WatchState::Idle) != WatchState::Idle
    }

    /// Annotate every content node under `root` once (initial pass)
    pub fn scan_existing<T: ContentTree<Node = N>>(&mut self, tree: &mut T, root: &N) -> BatchReport {
        let mut report = BatchReport::default();
        for node in tree.find_all(root, &self.locator.content_class) {
            self.run_pass(tree, &node, &mut report);
        }
        self.stats.absorb(&report);
        report
    }

    /// Process one batch of change records, in order
    pub fn handle_batch<T, S>(&mut self, tree: &mut T, scheduler: &mut S, records: &[ChangeRecord<N>]) -> BatchReport
    where
        T: ContentTree<Node = N>,
        S: Scheduler,
    {
        let mut report = BatchReport::default();
        if !self.is_observing() {
            report.ignored = records.len();
            return report;
        }

        for record in records {
            match record {
                ChangeRecord::ChildList { added, .. } => {
                    for node in added {
                        self.on_added(tree, scheduler, node, &mut report);
                    }
                }
                ChangeRecord::CharacterData { target } => {
                    self.on_character_data(tree, scheduler, target, &mut report);
                }
            }
        }

        self.stats.batches += 1;
        self.stats.absorb(&report);
        report
    }

    /// Deliver a timer. Unknown or cancelled timers are no-ops.
    pub fn fire<T: ContentTree<Node = N>>(&mut self, tree: &mut T, timer: TimerId) -> BatchReport {
        let mut report = BatchReport::default();
        let Some(index) = self.pending.iter().position(|p| p.timer == timer) else {
            report.ignored += 1;
            return report;
        };
        let pending = self.pending.remove(index);

        if !self.is_observing() || !tree.is_connected(&pending.node) {
            report.ignored += 1;
            return report;
        }
        self.run_pass(tree, &pending.node, &mut report);
        self.stats.absorb(&report);
        report
    }

    fn on_added<T, S>(&mut self, tree: &mut T, scheduler: &mut S, node: &N, report: &mut BatchReport)
    where
        T: ContentTree<Node = N>,
        S: Scheduler,
    {
        let content_class = self.locator.content_class.clone();
        if tree.has_class(node, &content_class) {
            self.schedule(tree, scheduler, node, report);
        } else if tree.has_class(node, &self.locator.list_item_class) {
            match tree.find_first(node, &content_class) {
                Some(content) => {
                    self.cancel_pending(scheduler, &content, report);
                    self.run_pass(tree, &content, report);
                }
                None => report.ignored += 1,
            }
        } else {
            report.ignored += 1;
        }
    }

    fn on_character_data<T, S>(&mut self, tree: &mut T, scheduler: &mut S, target: &N, report: &mut BatchReport)
    where
        T: ContentTree<Node = N>,
        S: Scheduler,
    {
        let content = tree
            .parent(target)
            .and_then(|parent| tree.closest(&parent, &self.locator.content_class));
        match content {
            Some(content) => {
                self.cancel_pending(scheduler, &content, report);
                self.run_pass(tree, &content, report);
            }
            None => report.ignored += 1,
        }
    }

    fn schedule<T, S>(&mut self, tree: &mut T, scheduler: &mut S, node: &N, report: &mut BatchReport)
    where
        T: ContentTree<Node = N>,
        S: Scheduler,
    {
        self.cancel_pending(scheduler, node, report);
        self.next_timer += 1;
        let timer = self.next_timer;

        match scheduler.schedule(timer, self.debounce_ms) {
            Ok(()) => {
                self.pending.push(PendingEdit {
                    timer,
                    node: node.clone(),
                });
                report.scheduled += 1;
            }
            Err(e) => {
                // No timers available: annotate without the debounce
                report.errors.push(e);
                self.run_pass(tree, node, report);
            }
        }
    }

    fn cancel_pending<S: Scheduler>(&mut self, scheduler: &mut S, node: &N, report: &mut BatchReport) {
        if let Some(index) = self.pending.iter().position(|p| &p.node == node) {
            let pending = self.pending.remove(index);
            scheduler.cancel(pending.timer);
            report.cancelled += 1;
        }
    }

    fn run_pass<T: ContentTree<Node = N>>(&mut self, tree: &mut T, node: &N, report: &mut BatchReport) {
        let start = instant::Instant::now();
        match self.annotator.annotate(tree, node) {
            Ok(outcome) if outcome.unchanged => report.unchanged += 1,
            Ok(outcome) => {
                report.annotated += 1;
                report.swatches += outcome.swatches;
                report.errors.extend(outcome.errors);
            }
            Err(e) => report.errors.push(e),
        }
        self.stats.last_pass_us = start.elapsed().as_micros() as u64;
    }
}

// =============================================================================
// Tests
// =============================================================================
