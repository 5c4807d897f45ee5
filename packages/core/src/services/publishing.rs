//! Publication State Machine
//!
//! Publish/unpublish transitions for [`ContentService`], including the
//! path-dependent eligibility rules, branch publish with partial-failure
//! containment, and the scheduled release/expiry sweep.
//!
//! # State machine
//!
//! `Unpublished → Publishing → Published` and
//! `Published → Unpublishing → Unpublished`. The transient states exist only
//! inside a scope; [`ContentNode::commit_published_state`] collapses them to
//! their committed form before the row is persisted.
//!
//! # Failure channels
//!
//! Ineligibility is a [`PublishResult`] value, never an `Err`: the caller's
//! unrelated work may still commit. Hard repository faults remain errors.
//! Branch publish deliberately commits partial success — a failing
//! descendant excludes its own lineage but never rolls back siblings that
//! already succeeded.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::db::Scope;
use crate::events::{Decision, TreeChange, TreeChangeKind};
use crate::models::{ContentNode, ContentStatus, PublishedState};
use crate::services::collaborators::AuditKind;
use crate::services::content_service::ContentService;
use crate::services::error::ContentServiceError;

/// Outcome codes for publish/unpublish operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishResultType {
    Success,
    SuccessAlready,
    FailedCancelledByEvent,
    FailedNoPublishedValues,
    FailedHasExpired,
    FailedAwaitingRelease,
    FailedIsTrashed,
    FailedPathNotPublished,
    FailedContentInvalid,
}

/// One publish/unpublish outcome for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishResult {
    pub result: PublishResultType,
    pub node_id: i64,
}

impl PublishResult {
    pub fn new(result: PublishResultType, node_id: i64) -> Self {
        Self { result, node_id }
    }

    pub fn succeeded(&self) -> bool {
        matches!(
            self.result,
            PublishResultType::Success | PublishResultType::SuccessAlready
        )
    }
}

impl ContentService {
    // ----------------------------------------------------------- eligibility

    /// Whether every strict ancestor of `node` up to the root is published.
    ///
    /// Nodes directly under the root have no ancestors and pass vacuously.
    pub(crate) async fn ancestors_published(
        &self,
        scope: &Scope,
        node: &ContentNode,
    ) -> Result<bool, ContentServiceError> {
        let ids = node.ancestor_ids();
        if ids.is_empty() {
            return Ok(true);
        }
        let ancestors = scope.repo().get_many(&ids).await?;
        Ok(ancestors.len() == ids.len() && ancestors.iter().all(|a| a.published))
    }

    /// Whether `node` is path-published: it and every strict ancestor up to
    /// the root are published.
    pub async fn is_path_published(&self, id: i64) -> Result<bool, ContentServiceError> {
        let scope = self.begin_read().await?;
        let node = self.require(&scope, id).await?;
        Ok(node.published && self.ancestors_published(&scope, &node).await?)
    }

    /// Evaluate publish eligibility in fixed order: cancellable pre-publish
    /// notification, published-values check, status gate, then (optionally)
    /// the path gate.
    pub(crate) async fn can_publish_locked(
        &self,
        scope: &Scope,
        node: &ContentNode,
        check_path: bool,
        now: DateTime<Utc>,
    ) -> Result<PublishResultType, ContentServiceError> {
        if self
            .events
            .gate(|o| o.publishing(std::slice::from_ref(node)))
            == Decision::Cancel
        {
            tracing::debug!(node_id = node.id, "publish cancelled by observer");
            return Ok(PublishResultType::FailedCancelledByEvent);
        }

        // The node must be mid-transition or already carry a published
        // revision; anything else has nothing to publish.
        if node.published_state != PublishedState::Publishing && node.published_version_id == 0 {
            return Ok(PublishResultType::FailedNoPublishedValues);
        }

        match node.status(now) {
            ContentStatus::Expired => return Ok(PublishResultType::FailedHasExpired),
            ContentStatus::AwaitingRelease => {
                return Ok(PublishResultType::FailedAwaitingRelease)
            }
            ContentStatus::Trashed => return Ok(PublishResultType::FailedIsTrashed),
            ContentStatus::Published | ContentStatus::Unpublished => {}
        }

        if check_path
            && !node.is_root_child()
            && !self.ancestors_published(scope, node).await?
        {
            return Ok(PublishResultType::FailedPathNotPublished);
        }

        Ok(PublishResultType::Success)
    }

    /// Check whether a node could be published right now, without changing
    /// any state. `check_path` additionally requires the parent to be
    /// path-published; root children always pass the path gate.
    pub async fn can_publish(
        &self,
        id: i64,
        check_path: bool,
    ) -> Result<PublishResult, ContentServiceError> {
        let scope = self.begin_read().await?;
        let node = self.require(&scope, id).await?;
        let result = self
            .can_publish_locked(&scope, &node, check_path, Utc::now())
            .await?;
        Ok(PublishResult::new(result, id))
    }

    // --------------------------------------------------------------- publish

    /// Publish a single node.
    ///
    /// An already-published, unchanged node short-circuits to
    /// `SuccessAlready` before any eligibility check runs. On success the
    /// current working revision becomes the published revision at commit.
    pub async fn publish(
        &self,
        id: i64,
        user_id: i64,
    ) -> Result<PublishResult, ContentServiceError> {
        let scope = self.begin_write().await?;
        let mut node = self.require(&scope, id).await?;
        let now = Utc::now();

        if node.is_published_and_unchanged() {
            return Ok(PublishResult::new(PublishResultType::SuccessAlready, id));
        }
        if node.validate().is_err() {
            return Ok(PublishResult::new(
                PublishResultType::FailedContentInvalid,
                id,
            ));
        }

        node.begin_publishing();
        let eligibility = self.can_publish_locked(&scope, &node, true, now).await?;
        if eligibility != PublishResultType::Success {
            // Scope drops here: nothing staged survives.
            return Ok(PublishResult::new(eligibility, id));
        }

        if node.release_date.is_some_and(|d| d <= now) {
            node.release_date = None;
        }
        node.commit_published_state();
        node.writer_id = user_id;
        node.updated_at = now;
        scope.repo().save(&mut node).await?;
        self.audit
            .write(user_id, id, AuditKind::Publish, "Publish content");
        scope.complete().await?;

        self.events
            .notify(|o| o.published(std::slice::from_ref(&node)));
        self.events
            .notify(|o| o.tree_changed(&[TreeChange::new(id, TreeChangeKind::RefreshNode)]));
        Ok(PublishResult::new(PublishResultType::Success, id))
    }

    // ------------------------------------------------------------- unpublish

    /// Unpublish a single node.
    ///
    /// A pending future release date is cleared: a scheduled publish makes no
    /// sense on a node being unpublished.
    pub async fn unpublish(
        &self,
        id: i64,
        user_id: i64,
    ) -> Result<PublishResult, ContentServiceError> {
        let scope = self.begin_write().await?;
        let mut node = self.require(&scope, id).await?;

        if !node.published {
            return Ok(PublishResult::new(PublishResultType::SuccessAlready, id));
        }
        if self
            .events
            .gate(|o| o.unpublishing(std::slice::from_ref(&node)))
            == Decision::Cancel
        {
            tracing::debug!(node_id = id, "unpublish cancelled by observer");
            return Ok(PublishResult::new(
                PublishResultType::FailedCancelledByEvent,
                id,
            ));
        }

        let now = Utc::now();
        if node.release_date.is_some_and(|d| d > now) {
            node.release_date = None;
        }
        node.begin_unpublishing();
        node.commit_published_state();
        node.writer_id = user_id;
        node.updated_at = now;
        scope.repo().save(&mut node).await?;
        self.audit
            .write(user_id, id, AuditKind::Unpublish, "Unpublish content");
        scope.complete().await?;

        self.events
            .notify(|o| o.unpublished(std::slice::from_ref(&node)));
        self.events
            .notify(|o| o.tree_changed(&[TreeChange::new(id, TreeChangeKind::RefreshNode)]));
        Ok(PublishResult::new(PublishResultType::Success, id))
    }

    // -------------------------------------------------------- branch publish

    /// Publish a subtree root together with a policy-selected subset of its
    /// descendants.
    ///
    /// Root failure aborts the whole operation. Per-descendant failure is
    /// contained: the failing node and every descendant in its lineage join
    /// an exclusion set and are skipped without results, while siblings
    /// outside the failed lineage continue. Nodes that already succeeded are
    /// never rolled back — this is explicit partial-failure containment, not
    /// all-or-nothing. With `force = false`, descendants that are not
    /// currently published are skipped (and gate their own subtrees).
    pub async fn save_and_publish_branch(
        &self,
        id: i64,
        force: bool,
        user_id: i64,
    ) -> Result<Vec<PublishResult>, ContentServiceError> {
        let scope = self.begin_write().await?;
        let mut root = self.require(&scope, id).await?;
        let now = Utc::now();

        let mut results = Vec::new();
        let mut published_nodes = Vec::new();

        if root.is_published_and_unchanged() {
            results.push(PublishResult::new(PublishResultType::SuccessAlready, id));
        } else {
            if root.validate().is_err() {
                return Ok(vec![PublishResult::new(
                    PublishResultType::FailedContentInvalid,
                    id,
                )]);
            }
            root.begin_publishing();
            let eligibility = self.can_publish_locked(&scope, &root, true, now).await?;
            if eligibility != PublishResultType::Success {
                tracing::debug!(node_id = id, result = ?eligibility, "branch publish aborted at root");
                return Ok(vec![PublishResult::new(eligibility, id)]);
            }
            if root.release_date.is_some_and(|d| d <= now) {
                root.release_date = None;
            }
            root.commit_published_state();
            root.writer_id = user_id;
            root.updated_at = now;
            scope.repo().save(&mut root).await?;
            results.push(PublishResult::new(PublishResultType::Success, id));
            published_nodes.push(root.clone());
        }

        let mut descendants = scope.repo().get_descendants(&root.path).await?;
        descendants.sort_by_key(|d| d.level);
        let mut excluded: HashSet<i64> = HashSet::new();

        for mut descendant in descendants {
            if descendant
                .ancestor_ids()
                .iter()
                .any(|a| excluded.contains(a))
            {
                excluded.insert(descendant.id);
                continue;
            }
            if !force && !descendant.published {
                // An unpublished descendant gates its whole subtree: nothing
                // below it may end up published above an unpublished parent.
                excluded.insert(descendant.id);
                continue;
            }
            if descendant.is_published_and_unchanged() {
                results.push(PublishResult::new(
                    PublishResultType::SuccessAlready,
                    descendant.id,
                ));
                continue;
            }
            if descendant.validate().is_err() {
                excluded.insert(descendant.id);
                results.push(PublishResult::new(
                    PublishResultType::FailedContentInvalid,
                    descendant.id,
                ));
                continue;
            }

            descendant.begin_publishing();
            // Path already validated by the parent-before-child walk.
            let eligibility = self
                .can_publish_locked(&scope, &descendant, false, now)
                .await?;
            if eligibility != PublishResultType::Success {
                excluded.insert(descendant.id);
                results.push(PublishResult::new(eligibility, descendant.id));
                continue;
            }
            if descendant.release_date.is_some_and(|d| d <= now) {
                descendant.release_date = None;
            }
            descendant.commit_published_state();
            descendant.writer_id = user_id;
            descendant.updated_at = now;
            scope.repo().save(&mut descendant).await?;
            results.push(PublishResult::new(
                PublishResultType::Success,
                descendant.id,
            ));
            published_nodes.push(descendant);
        }

        self.audit
            .write(user_id, id, AuditKind::Publish, "Publish branch");
        scope.complete().await?;

        if !published_nodes.is_empty() {
            self.events.notify(|o| o.published(&published_nodes));
        }
        self.events
            .notify(|o| o.tree_changed(&[TreeChange::new(id, TreeChangeKind::RefreshBranch)]));
        Ok(results)
    }

    // ------------------------------------------------------- scheduled sweep

    /// Run the scheduled publication sweep at `now`.
    ///
    /// Nodes due for release have their release date cleared and a publish
    /// attempted; nodes due for expiry have their expire date cleared and are
    /// unpublished. One result is produced per release candidate. Failures
    /// in either loop are logged and the sweep continues — the two loops
    /// share one failure policy by design.
    pub async fn perform_scheduled_publish(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<PublishResult>, ContentServiceError> {
        let scope = self.begin_write().await?;
        let mut results = Vec::new();
        let mut published_nodes = Vec::new();
        let mut unpublished_nodes = Vec::new();
        let mut changes = Vec::new();

        for mut node in scope.repo().get_for_release(now).await? {
            let prior_state = node.published_state;
            node.release_date = None;
            node.begin_publishing();
            let eligibility = self.can_publish_locked(&scope, &node, true, now).await?;
            if eligibility != PublishResultType::Success {
                tracing::warn!(node_id = node.id, result = ?eligibility, "scheduled publish failed");
                // The schedule is consumed either way; failed candidates
                // keep their prior state but lose the stale release date.
                node.published_state = prior_state;
                scope.repo().save(&mut node).await?;
                results.push(PublishResult::new(eligibility, node.id));
                continue;
            }
            node.commit_published_state();
            node.updated_at = now;
            scope.repo().save(&mut node).await?;
            changes.push(TreeChange::new(node.id, TreeChangeKind::RefreshNode));
            results.push(PublishResult::new(PublishResultType::Success, node.id));
            published_nodes.push(node);
        }

        for mut node in scope.repo().get_for_expiry(now).await? {
            node.expire_date = None;
            if self
                .events
                .gate(|o| o.unpublishing(std::slice::from_ref(&node)))
                == Decision::Cancel
            {
                tracing::warn!(node_id = node.id, "scheduled unpublish cancelled by observer");
                // The schedule is consumed either way, same as the release
                // loop; the node stays published but is not retried.
                scope.repo().save(&mut node).await?;
                continue;
            }
            node.begin_unpublishing();
            node.commit_published_state();
            node.updated_at = now;
            scope.repo().save(&mut node).await?;
            changes.push(TreeChange::new(node.id, TreeChangeKind::RefreshNode));
            unpublished_nodes.push(node);
        }

        scope.complete().await?;

        if !published_nodes.is_empty() {
            self.events.notify(|o| o.published(&published_nodes));
        }
        if !unpublished_nodes.is_empty() {
            self.events.notify(|o| o.unpublished(&unpublished_nodes));
        }
        if !changes.is_empty() {
            self.events.notify(|o| o.tree_changed(&changes));
        }
        Ok(results)
    }
}

#[cfg(test)]
#[path = "publishing_test.rs"]
mod publishing_test;
