//! Content Notifications
//!
//! This module defines the observer surface for content operations. The
//! engine dispatches two kinds of hooks:
//!
//! - **Cancellable pre-action hooks** (`creating`, `saving`, `moving`,
//!   `trashing`, `copying`, `publishing`, `unpublishing`, `deleting`,
//!   `sorting`): any observer returning [`Decision::Cancel`] aborts the
//!   operation before a destructive write happens, rolling back the scope.
//! - **Non-cancellable post-action hooks** plus a structural `tree_changed`
//!   signal carrying a change kind per affected node.
//!
//! The bus is an explicit object injected into the service — never global
//! registration — so cancellation and ordering are testable in isolation.
//! Observers run synchronously within the calling operation; cancellation is
//! cooperative only and can be signalled before, never after, the write.

use std::sync::{Arc, RwLock};

use crate::models::ContentNode;

/// Outcome of a cancellable hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Continue,
    Cancel,
}

/// Structural change kinds carried by the `tree_changed` signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeChangeKind {
    RefreshNode,
    RefreshBranch,
    Remove,
}

/// One structural change, per affected node.
#[derive(Debug, Clone)]
pub struct TreeChange {
    pub node_id: i64,
    pub kind: TreeChangeKind,
}

impl TreeChange {
    pub fn new(node_id: i64, kind: TreeChangeKind) -> Self {
        Self { node_id, kind }
    }
}

/// Payload for move/trash notifications: the node in its new position plus
/// the materialized path it had before the operation.
#[derive(Debug, Clone)]
pub struct MoveEventInfo {
    pub node: ContentNode,
    pub original_path: String,
}

/// Observer of content operations.
///
/// Every method has a default no-op implementation; observers override only
/// the hooks they care about. Pre-action hooks return a [`Decision`]; the
/// operation is aborted if any registered observer cancels.
#[allow(unused_variables)]
pub trait ContentObserver: Send + Sync {
    fn creating(&self, node: &ContentNode) -> Decision {
        Decision::Continue
    }

    fn saving(&self, nodes: &[ContentNode]) -> Decision {
        Decision::Continue
    }

    fn moving(&self, moves: &[MoveEventInfo]) -> Decision {
        Decision::Continue
    }

    fn trashing(&self, moves: &[MoveEventInfo]) -> Decision {
        Decision::Continue
    }

    /// `copy` is the unpersisted clone; cancelling skips only that node.
    fn copying(
        &self,
        source: &ContentNode,
        copy: &ContentNode,
        relate_to_original: bool,
    ) -> Decision {
        Decision::Continue
    }

    fn publishing(&self, nodes: &[ContentNode]) -> Decision {
        Decision::Continue
    }

    fn unpublishing(&self, nodes: &[ContentNode]) -> Decision {
        Decision::Continue
    }

    fn deleting(&self, nodes: &[ContentNode]) -> Decision {
        Decision::Continue
    }

    fn sorting(&self, nodes: &[ContentNode]) -> Decision {
        Decision::Continue
    }

    fn saved(&self, nodes: &[ContentNode]) {}

    fn moved(&self, moves: &[MoveEventInfo]) {}

    fn trashed(&self, moves: &[MoveEventInfo]) {}

    fn copied(&self, source: &ContentNode, copy: &ContentNode, relate_to_original: bool) {}

    fn published(&self, nodes: &[ContentNode]) {}

    fn unpublished(&self, nodes: &[ContentNode]) {}

    /// Fired once per removed node after the delete committed. Observers
    /// append any attached binary-asset paths to `media_files`; the service
    /// hands the collected paths to the file-cleanup collaborator.
    fn deleted(&self, node: &ContentNode, media_files: &mut Vec<String>) {}

    fn sorted(&self, nodes: &[ContentNode]) {}

    fn tree_changed(&self, changes: &[TreeChange]) {}
}

/// Aggregating dispatcher over registered observers.
///
/// For cancellable hooks, every observer is consulted and any `Cancel` wins;
/// observers registered earlier run first.
#[derive(Default)]
pub struct EventBus {
    observers: RwLock<Vec<Arc<dyn ContentObserver>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. Registration order is dispatch order.
    pub fn register(&self, observer: Arc<dyn ContentObserver>) {
        self.observers
            .write()
            .expect("observer registry poisoned")
            .push(observer);
    }

    /// Run a cancellable hook across all observers.
    pub fn gate(&self, hook: impl Fn(&dyn ContentObserver) -> Decision) -> Decision {
        let observers = self.observers.read().expect("observer registry poisoned");
        let mut decision = Decision::Continue;
        for observer in observers.iter() {
            if hook(observer.as_ref()) == Decision::Cancel {
                decision = Decision::Cancel;
            }
        }
        decision
    }

    /// Run a non-cancellable hook across all observers.
    pub fn notify(&self, hook: impl Fn(&dyn ContentObserver)) {
        let observers = self.observers.read().expect("observer registry poisoned");
        for observer in observers.iter() {
            hook(observer.as_ref());
        }
    }

    /// Run the per-node deleted hook, collecting flagged binary assets.
    pub fn notify_deleted(&self, node: &ContentNode) -> Vec<String> {
        let observers = self.observers.read().expect("observer registry poisoned");
        let mut media_files = Vec::new();
        for observer in observers.iter() {
            observer.deleted(node, &mut media_files);
        }
        media_files
    }
}
