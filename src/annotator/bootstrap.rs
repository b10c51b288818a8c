//! Bootstrapper: wires the watcher to the message-list root
//!
//! # Lifecycle
//! - `activate`: tear down any previous subscription, locate the root, run the
//!   initial pass over existing content, subscribe, attach
//! - `deactivate`: unsubscribe + detach (idempotent)
//!
//! At most one subscription is ever live, so navigating to another channel
//! (re-activation) never leaves two watchers observing.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::annotator::config::IndicatorConfig;
use crate::annotator::error::AnnotateError;
use crate::annotator::tree::{ChangeFeed, ChangeRecord, ContentTree, ObserveOptions, Scheduler, TimerId};
use crate::annotator::watcher::{BatchReport, MutationWatcher};

/// Identity of one activation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchHandle(pub u64);

/// Result of a successful activation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activation {
    pub handle: WatchHandle,
    /// Initial pass over content that was already rendered
    pub initial: BatchReport,
}

pub struct Bootstrapper<F: ChangeFeed> {
    feed: F,
    watcher: MutationWatcher<F::Node>,
    subscription: Option<F::Subscription>,
    activations: u64,
}

impl<F> Bootstrapper<F>
where
    F: ChangeFeed,
    F::Node: Clone + PartialEq + Debug,
{
    pub fn new(feed: F, config: &IndicatorConfig) -> Self {
        Self {
            feed,
            watcher: MutationWatcher::new(config),
            subscription: None,
            activations: 0,
        }
    }

    pub fn watcher(&self) -> &MutationWatcher<F::Node> {
        &self.watcher
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }

    pub fn is_active(&self) -> bool {
        self.subscription.is_some()
    }

    /// Attach to the message-list root found in `tree`
    pub fn activate<T>(&mut self, tree: &mut T) -> Result<Activation, AnnotateError>
    where
        T: ContentTree<Node = F::Node>,
    {
        self.deactivate();

        let root_class = self.watcher.locator().root_class.clone();
        let root = tree
            .find_first(&tree.document(), &root_class)
            .ok_or(AnnotateError::RootNotFound { class: root_class })?;

        let initial = self.watcher.scan_existing(tree, &root);
        let subscription = self.feed.subscribe(&root, ObserveOptions::content())?;
        self.watcher.attach(root);
        self.subscription = Some(subscription);
        self.activations += 1;

        Ok(Activation {
            handle: WatchHandle(self.activations),
            initial,
        })
    }

    /// Stop watching. Safe to call when already stopped; returns whether
    /// anything was torn down.
    pub fn deactivate(&mut self) -> bool {
        let had_subscription = match self.subscription.take() {
            Some(subscription) => {
                self.feed.unsubscribe(subscription);
                true
            }
            None => false,
        };
        let was_observing = self.watcher.detach();
        had_subscription || was_observing
    }

    /// Route a feed batch to the watcher
    pub fn deliver<T, S>(&mut self, tree: &mut T, scheduler: &mut S, records: &[ChangeRecord<F::Node>]) -> BatchReport
    where
        T: ContentTree<Node = F::Node>,
        S: Scheduler,
    {
        self.watcher.handle_batch(tree, scheduler, records)
    }

    /// Route a timer to the watcher
    pub fn fire<T>(&mut self, tree: &mut T, timer: TimerId) -> BatchReport
    where
        T: ContentTree<Node = F::Node>,
    {
        self.watcher.fire(tree, timer)
    }
}

// =============================================================================
// Tests
// =============================================================================
