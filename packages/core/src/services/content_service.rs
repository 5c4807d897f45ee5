//! Content Service - Tree Mutation Engine
//!
//! This module provides the main business logic layer for the content tree:
//!
//! - Save (identity assignment, path/level computation, versioned writes)
//! - Move and move-to-recycle-bin with full subtree path cascades
//! - Copy (deep clone with fresh identity, optionally recursive)
//! - Cascading delete with file-cleanup side effects
//! - Sibling sorting
//!
//! Publication operations live in [`publishing`](crate::services::publishing)
//! as a second `impl` block on [`ContentService`].
//!
//! # Locking discipline
//!
//! Every tree-shape mutation takes the single `content-tree` write lock for
//! the duration of its scope. Path recomputation for a cascade must see a
//! consistent snapshot of the whole subtree, so per-node locking is not an
//! option: a sibling moved elsewhere in the tree mid-cascade would corrupt
//! path computation. Readers share the lock with other readers.
//!
//! # Failure model
//!
//! Hard validation errors return `Err` and roll back the scope. Observer
//! cancellation is a soft failure: the scope rolls back and the operation
//! reports [`OperationStatus::Cancelled`] instead of an error.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::db::{Scope, ScopeProvider, CONTENT_TREE_LOCK};
use crate::events::{Decision, EventBus, MoveEventInfo, TreeChange, TreeChangeKind};
use crate::models::{path, ContentNode, ParentRef, RECYCLE_BIN_ID, ROOT_ID};
use crate::services::collaborators::{
    AuditKind, AuditWriter, FileCleanup, NoopAuditWriter, NoopFileCleanup,
};
use crate::services::error::ContentServiceError;

/// Outcome of a tree mutation that an observer may cancel.
///
/// Cancellation rolls back the enclosing scope but is not an error: it is a
/// cooperative decline signalled before any destructive write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    Success,
    Cancelled,
}

/// Resolved destination of a relocation, owning any fetched parent node.
pub(crate) enum Destination {
    Root,
    RecycleBin,
    Node(ContentNode),
}

impl Destination {
    pub(crate) fn parent_ref(&self) -> ParentRef<'_> {
        match self {
            Destination::Root => ParentRef::Root,
            Destination::RecycleBin => ParentRef::RecycleBin,
            Destination::Node(n) => ParentRef::Node(n),
        }
    }

    pub(crate) fn id(&self) -> i64 {
        self.parent_ref().id()
    }
}

/// Core service for the versioned content tree.
///
/// Holds the storage scope provider plus the injected collaborators: the
/// notification bus, the audit-trail writer and the file-store cleanup.
///
/// # Examples
///
/// ```no_run
/// use canopy_core::db::MemoryStore;
/// use canopy_core::models::{ContentNode, ROOT_ID};
/// use canopy_core::services::ContentService;
/// use serde_json::json;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let service = ContentService::new(Arc::new(MemoryStore::new()));
///
///     let mut home = ContentNode::new("Home".to_string(), ROOT_ID, json!({}));
///     service.save(&mut home, 1).await?;
///     assert_eq!(home.path, format!("-1,{}", home.id));
///     Ok(())
/// }
/// ```
pub struct ContentService {
    pub(crate) store: Arc<dyn ScopeProvider>,
    pub(crate) events: Arc<EventBus>,
    pub(crate) audit: Arc<dyn AuditWriter>,
    pub(crate) files: Arc<dyn FileCleanup>,
}

impl ContentService {
    /// Create a service with no-op audit and file-cleanup collaborators and
    /// an empty notification bus.
    pub fn new(store: Arc<dyn ScopeProvider>) -> Self {
        Self {
            store,
            events: Arc::new(EventBus::new()),
            audit: Arc::new(NoopAuditWriter),
            files: Arc::new(NoopFileCleanup),
        }
    }

    /// Create a service with explicit collaborators.
    pub fn with_collaborators(
        store: Arc<dyn ScopeProvider>,
        events: Arc<EventBus>,
        audit: Arc<dyn AuditWriter>,
        files: Arc<dyn FileCleanup>,
    ) -> Self {
        Self {
            store,
            events,
            audit,
            files,
        }
    }

    /// The notification bus, for observer registration.
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    // ---------------------------------------------------------------- scopes

    pub(crate) async fn begin_write(&self) -> Result<Scope, ContentServiceError> {
        let mut scope = self.store.begin().await?;
        scope.write_lock(CONTENT_TREE_LOCK).await;
        Ok(scope)
    }

    pub(crate) async fn begin_read(&self) -> Result<Scope, ContentServiceError> {
        let mut scope = self.store.begin().await?;
        scope.read_lock(CONTENT_TREE_LOCK).await;
        Ok(scope)
    }

    pub(crate) async fn require(
        &self,
        scope: &Scope,
        id: i64,
    ) -> Result<ContentNode, ContentServiceError> {
        scope
            .repo()
            .get(id)
            .await?
            .ok_or(ContentServiceError::NodeNotFound { id })
    }

    async fn resolve_destination(
        &self,
        scope: &Scope,
        parent_id: i64,
    ) -> Result<Destination, ContentServiceError> {
        match parent_id {
            ROOT_ID => Ok(Destination::Root),
            RECYCLE_BIN_ID => Ok(Destination::RecycleBin),
            _ => {
                let parent = scope
                    .repo()
                    .get(parent_id)
                    .await?
                    .ok_or(ContentServiceError::InvalidParent { parent_id })?;
                if parent.trashed {
                    return Err(ContentServiceError::InvalidParent { parent_id });
                }
                Ok(Destination::Node(parent))
            }
        }
    }

    async fn next_sort_order(
        &self,
        scope: &Scope,
        parent_id: i64,
    ) -> Result<i32, ContentServiceError> {
        let children = scope.repo().get_children(parent_id).await?;
        Ok(children.iter().map(|c| c.sort_order + 1).max().unwrap_or(0))
    }

    // ----------------------------------------------------------------- reads

    /// Fetch a node by id.
    pub async fn get(&self, id: i64) -> Result<Option<ContentNode>, ContentServiceError> {
        let scope = self.begin_read().await?;
        Ok(scope.repo().get(id).await?)
    }

    /// Fetch several nodes, preserving input order.
    pub async fn get_many(&self, ids: &[i64]) -> Result<Vec<ContentNode>, ContentServiceError> {
        let scope = self.begin_read().await?;
        Ok(scope.repo().get_many(ids).await?)
    }

    /// Direct children of a parent, in sort order.
    pub async fn get_children(
        &self,
        parent_id: i64,
    ) -> Result<Vec<ContentNode>, ContentServiceError> {
        let scope = self.begin_read().await?;
        Ok(scope.repo().get_children(parent_id).await?)
    }

    /// All descendants of a node, parent-before-child.
    pub async fn get_descendants(
        &self,
        id: i64,
    ) -> Result<Vec<ContentNode>, ContentServiceError> {
        let scope = self.begin_read().await?;
        let node = self.require(&scope, id).await?;
        Ok(scope.repo().get_descendants(&node.path).await?)
    }

    /// Number of descendants under a node.
    pub async fn count_descendants(&self, id: i64) -> Result<usize, ContentServiceError> {
        Ok(self.get_descendants(id).await?.len())
    }

    // ------------------------------------------------------------------ save

    /// Persist a node, assigning identity on first save.
    ///
    /// A new node gets its id from the repository, then path/level computed
    /// from its parent, a fresh sibling sort order and a first version row.
    /// A subsequent save creates a new working revision; structural fields
    /// (path, level, parent, sort order, trash flag) are owned by the tree
    /// mutator and re-read from the stored row, never taken from the caller.
    pub async fn save(
        &self,
        node: &mut ContentNode,
        user_id: i64,
    ) -> Result<OperationStatus, ContentServiceError> {
        node.validate()?;
        let scope = self.begin_write().await?;
        let is_new = !node.has_identity();

        if is_new && self.events.gate(|o| o.creating(node)) == Decision::Cancel {
            tracing::debug!(name = %node.name, "create cancelled by observer");
            return Ok(OperationStatus::Cancelled);
        }
        if self.events.gate(|o| o.saving(std::slice::from_ref(node))) == Decision::Cancel {
            tracing::debug!(node_id = node.id, "save cancelled by observer");
            return Ok(OperationStatus::Cancelled);
        }

        let now = Utc::now();
        if is_new {
            let dest = self.resolve_destination(&scope, node.parent_id).await?;
            if matches!(dest, Destination::RecycleBin) {
                return Err(ContentServiceError::invalid_parent(RECYCLE_BIN_ID));
            }
            node.creator_id = user_id;
            node.writer_id = user_id;
            node.sort_order = self.next_sort_order(&scope, node.parent_id).await?;
            node.version_id = 0;
            node.updated_at = now;
            // Two-phase write: the first save assigns the id the path needs.
            scope.repo().save(node).await?;
            let (new_path, new_level) = path::materialize(node.id, &dest.parent_ref());
            node.path = new_path;
            node.level = new_level;
            node.trashed = path::is_trashed_path(&node.path);
            scope.repo().save(node).await?;
            self.audit
                .write(user_id, node.id, AuditKind::New, "New content saved");
        } else {
            let stored = self.require(&scope, node.id).await?;
            if stored.parent_id != node.parent_id {
                return Err(ContentServiceError::invalid_update(
                    "parent changes go through move, not save",
                ));
            }
            node.path = stored.path;
            node.level = stored.level;
            node.sort_order = stored.sort_order;
            node.trashed = stored.trashed;
            node.writer_id = user_id;
            node.updated_at = now;
            node.version_id = 0; // new working revision
            scope.repo().save(node).await?;
            self.audit
                .write(user_id, node.id, AuditKind::Save, "Content saved");
        }

        scope.complete().await?;
        self.events.notify(|o| o.saved(std::slice::from_ref(node)));
        self.events.notify(|o| {
            o.tree_changed(&[TreeChange::new(node.id, TreeChangeKind::RefreshNode)])
        });
        Ok(OperationStatus::Success)
    }

    // ------------------------------------------------------------------ move

    /// Move a node (and its whole subtree) under a new parent.
    ///
    /// The destination must exist and not be trashed; moving to the recycle
    /// bin delegates to [`move_to_recycle_bin`](Self::move_to_recycle_bin).
    /// A node leaving the bin has its trash flag cleared, and a trashed node
    /// still marked published is forced through an unpublish transition:
    /// resurrected content must be explicitly republished.
    pub async fn move_node(
        &self,
        id: i64,
        new_parent_id: i64,
        user_id: i64,
    ) -> Result<OperationStatus, ContentServiceError> {
        if new_parent_id == RECYCLE_BIN_ID {
            return self.move_to_recycle_bin(id, user_id).await;
        }

        let scope = self.begin_write().await?;
        let mut node = self.require(&scope, id).await?;
        let dest = self.resolve_destination(&scope, new_parent_id).await?;

        if let Destination::Node(parent) = &dest {
            if parent.id == node.id || path::path_contains(&parent.path, node.id) {
                return Err(ContentServiceError::hierarchy_violation(format!(
                    "cannot move node {} under its own subtree",
                    node.id
                )));
            }
        }

        let preview = MoveEventInfo {
            node: node.clone(),
            original_path: node.path.clone(),
        };
        if self.events.gate(|o| o.moving(std::slice::from_ref(&preview))) == Decision::Cancel {
            tracing::debug!(node_id = id, "move cancelled by observer");
            return Ok(OperationStatus::Cancelled);
        }

        if node.trashed && node.published {
            node.begin_unpublishing();
            node.commit_published_state();
        }

        let records = self
            .perform_move_locked(&scope, &mut node, &dest, user_id)
            .await?;
        self.audit
            .write(user_id, id, AuditKind::Move, "Move content");
        scope.complete().await?;

        self.events.notify(|o| o.moved(&records));
        self.events
            .notify(|o| o.tree_changed(&[TreeChange::new(id, TreeChangeKind::RefreshBranch)]));
        Ok(OperationStatus::Success)
    }

    /// Soft-delete: relocate a node and its subtree under the recycle bin.
    ///
    /// A published node is unpublished on the way in; every relocated node
    /// ends up with `trashed = true` because its new path passes through the
    /// bin sentinel.
    pub async fn move_to_recycle_bin(
        &self,
        id: i64,
        user_id: i64,
    ) -> Result<OperationStatus, ContentServiceError> {
        let scope = self.begin_write().await?;
        let mut node = self.require(&scope, id).await?;

        let preview = MoveEventInfo {
            node: node.clone(),
            original_path: node.path.clone(),
        };
        if self.events.gate(|o| o.trashing(std::slice::from_ref(&preview))) == Decision::Cancel {
            tracing::debug!(node_id = id, "trash cancelled by observer");
            return Ok(OperationStatus::Cancelled);
        }

        if node.published {
            node.begin_unpublishing();
            node.commit_published_state();
        }

        let records = self
            .perform_move_locked(&scope, &mut node, &Destination::RecycleBin, user_id)
            .await?;
        self.audit
            .write(user_id, id, AuditKind::RecycleBin, "Move content to recycle bin");
        scope.complete().await?;

        self.events.notify(|o| o.trashed(&records));
        self.events
            .notify(|o| o.tree_changed(&[TreeChange::new(id, TreeChangeKind::RefreshBranch)]));
        Ok(OperationStatus::Success)
    }

    /// Apply the path materializer cascade to a node and all descendants.
    ///
    /// The root of the moved subtree is recomputed and persisted first, then
    /// descendants are resolved parent-before-child from a working map seeded
    /// with the root's new path. Descendants are explicitly ordered by level
    /// so the map lookup cannot visit a node before its parent; a miss means
    /// the stored paths are corrupt and fails the operation hard rather than
    /// skipping the node.
    ///
    /// Returns one record per touched node carrying its original path, for
    /// downstream move/trash notification payloads.
    pub(crate) async fn perform_move_locked(
        &self,
        scope: &Scope,
        node: &mut ContentNode,
        dest: &Destination,
        user_id: i64,
    ) -> Result<Vec<MoveEventInfo>, ContentServiceError> {
        let original_path = node.path.clone();
        let now = Utc::now();

        let (new_path, new_level) = path::materialize(node.id, &dest.parent_ref());
        node.parent_id = dest.id();
        node.sort_order = self.next_sort_order(scope, node.parent_id).await?;
        node.path = new_path;
        node.level = new_level;
        node.trashed = path::is_trashed_path(&node.path);
        node.writer_id = user_id;
        node.updated_at = now;
        scope.repo().save(node).await?;

        let mut records = vec![MoveEventInfo {
            node: node.clone(),
            original_path: original_path.clone(),
        }];
        let mut resolved: HashMap<i64, (String, i32)> = HashMap::new();
        resolved.insert(node.id, (node.path.clone(), node.level));

        let mut descendants = scope.repo().get_descendants(&original_path).await?;
        descendants.sort_by_key(|d| d.level);
        for mut descendant in descendants {
            let Some((parent_path, parent_level)) = resolved.get(&descendant.parent_id).cloned()
            else {
                return Err(ContentServiceError::hierarchy_violation(format!(
                    "parent {} of node {} unresolved during path cascade",
                    descendant.parent_id, descendant.id
                )));
            };
            let original = descendant.path.clone();
            let (child_path, child_level) =
                path::materialize_under(descendant.id, &parent_path, parent_level);
            descendant.path = child_path;
            descendant.level = child_level;
            descendant.trashed = path::is_trashed_path(&descendant.path);
            descendant.writer_id = user_id;
            descendant.updated_at = now;
            scope.repo().save(&mut descendant).await?;
            resolved.insert(descendant.id, (descendant.path.clone(), descendant.level));
            records.push(MoveEventInfo {
                node: descendant,
                original_path: original,
            });
        }
        Ok(records)
    }

    // ------------------------------------------------------------------ copy

    /// Deep-copy a node under a new parent, returning the root clone.
    ///
    /// The clone gets a fresh id and key, carries no version history, and is
    /// always unpublished regardless of the source's state. With `recursive`,
    /// descendants are cloned too; a descendant whose original parent was not
    /// cloned (its copy was cancelled) is skipped together with its subtree,
    /// while sibling branches continue. Returns `None` when an observer
    /// cancels the root copy.
    pub async fn copy(
        &self,
        id: i64,
        new_parent_id: i64,
        relate_to_original: bool,
        recursive: bool,
        user_id: i64,
    ) -> Result<Option<ContentNode>, ContentServiceError> {
        let scope = self.begin_write().await?;
        let source = self.require(&scope, id).await?;
        let dest = self.resolve_destination(&scope, new_parent_id).await?;
        if matches!(dest, Destination::RecycleBin) {
            return Err(ContentServiceError::invalid_parent(RECYCLE_BIN_ID));
        }
        if recursive {
            if let Destination::Node(parent) = &dest {
                if parent.id == source.id || path::path_contains(&parent.path, source.id) {
                    return Err(ContentServiceError::hierarchy_violation(format!(
                        "cannot copy node {} into its own subtree",
                        source.id
                    )));
                }
            }
        }

        let mut clone = clone_of(&source, dest.id(), user_id);
        if self
            .events
            .gate(|o| o.copying(&source, &clone, relate_to_original))
            == Decision::Cancel
        {
            tracing::debug!(node_id = id, "copy cancelled by observer");
            return Ok(None);
        }

        clone.sort_order = self.next_sort_order(&scope, dest.id()).await?;
        // Immediate flush: the clone's generated id must be visible to the
        // in-scope reads that place its children.
        scope.repo().save(&mut clone).await?;
        let (clone_path, clone_level) = path::materialize(clone.id, &dest.parent_ref());
        clone.path = clone_path;
        clone.level = clone_level;
        scope.repo().save(&mut clone).await?;

        // source id -> (clone id, clone path, clone level)
        let mut cloned: HashMap<i64, (i64, String, i32)> = HashMap::new();
        cloned.insert(source.id, (clone.id, clone.path.clone(), clone.level));
        let mut copies = vec![(source.clone(), clone.clone())];

        if recursive {
            let mut descendants = scope.repo().get_descendants(&source.path).await?;
            descendants.sort_by_key(|d| d.level);
            for descendant in descendants {
                let Some((copy_parent_id, copy_parent_path, copy_parent_level)) =
                    cloned.get(&descendant.parent_id).cloned()
                else {
                    tracing::debug!(
                        node_id = descendant.id,
                        "skipping descendant copy: parent was not cloned"
                    );
                    continue;
                };
                let mut child = clone_of(&descendant, copy_parent_id, user_id);
                child.sort_order = descendant.sort_order;
                if self
                    .events
                    .gate(|o| o.copying(&descendant, &child, relate_to_original))
                    == Decision::Cancel
                {
                    tracing::debug!(node_id = descendant.id, "descendant copy cancelled");
                    continue;
                }
                scope.repo().save(&mut child).await?;
                let (child_path, child_level) =
                    path::materialize_under(child.id, &copy_parent_path, copy_parent_level);
                child.path = child_path;
                child.level = child_level;
                scope.repo().save(&mut child).await?;
                cloned.insert(descendant.id, (child.id, child.path.clone(), child.level));
                copies.push((descendant, child));
            }
        }

        self.audit
            .write(user_id, clone.id, AuditKind::Copy, "Copy content");
        scope.complete().await?;

        for (src, cp) in &copies {
            self.events.notify(|o| o.copied(src, cp, relate_to_original));
        }
        self.events.notify(|o| {
            o.tree_changed(&[TreeChange::new(clone.id, TreeChangeKind::RefreshBranch)])
        });
        Ok(Some(clone))
    }

    // ---------------------------------------------------------------- delete

    /// Permanently delete a node and all descendants.
    ///
    /// Descendants are removed before ancestors so no node is deleted while
    /// a child still references it. Each removed node's delete notification
    /// may flag attached binary assets, which are handed to the file-cleanup
    /// collaborator after the scope commits. Unlike branch publish, delete is
    /// all-or-nothing: any mid-cascade failure rolls back the whole scope.
    pub async fn delete(
        &self,
        id: i64,
        user_id: i64,
    ) -> Result<OperationStatus, ContentServiceError> {
        let scope = self.begin_write().await?;
        let node = self.require(&scope, id).await?;
        let was_live = !node.trashed && node.published;

        if self
            .events
            .gate(|o| o.deleting(std::slice::from_ref(&node)))
            == Decision::Cancel
        {
            tracing::debug!(node_id = id, "delete cancelled by observer");
            return Ok(OperationStatus::Cancelled);
        }

        let descendants = scope.repo().get_descendants(&node.path).await?;
        let mut removed = Vec::with_capacity(descendants.len() + 1);
        for descendant in descendants.into_iter().rev() {
            scope.repo().delete(descendant.id).await?;
            removed.push(descendant);
        }
        scope.repo().delete(node.id).await?;
        removed.push(node);

        self.audit
            .write(user_id, id, AuditKind::Delete, "Delete content");
        scope.complete().await?;

        if was_live {
            // Removal is not a publish state change, so no save is involved,
            // but observers still learn the branch went unpublished.
            if let Some(root) = removed.last() {
                self.events
                    .notify(|o| o.unpublished(std::slice::from_ref(root)));
            }
        }
        for gone in &removed {
            let media_files = self.events.notify_deleted(gone);
            if !media_files.is_empty() {
                self.files.delete_files(media_files);
            }
        }
        self.events
            .notify(|o| o.tree_changed(&[TreeChange::new(id, TreeChangeKind::Remove)]));
        Ok(OperationStatus::Success)
    }

    // ------------------------------------------------------------------ sort

    /// Reorder siblings to match the given id sequence.
    ///
    /// All nodes must share a parent. Siblings not in the sequence keep
    /// their relative order and are renumbered after the listed ones, so
    /// sort orders stay unique under the parent even for a partial sort.
    /// Only nodes whose sort order actually changes are persisted.
    pub async fn sort(
        &self,
        ids: &[i64],
        user_id: i64,
    ) -> Result<OperationStatus, ContentServiceError> {
        if ids.is_empty() {
            return Ok(OperationStatus::Success);
        }
        let listed: HashSet<i64> = ids.iter().copied().collect();
        if listed.len() != ids.len() {
            return Err(ContentServiceError::invalid_update(
                "duplicate node id in sort sequence",
            ));
        }

        let scope = self.begin_write().await?;
        let nodes = scope.repo().get_many(ids).await?;
        if nodes.len() != ids.len() {
            let found: Vec<i64> = nodes.iter().map(|n| n.id).collect();
            let missing = ids
                .iter()
                .copied()
                .find(|id| !found.contains(id))
                .unwrap_or_default();
            return Err(ContentServiceError::node_not_found(missing));
        }
        if let Some(first) = nodes.first() {
            if nodes.iter().any(|n| n.parent_id != first.parent_id) {
                return Err(ContentServiceError::hierarchy_violation(
                    "sorted nodes must share a parent",
                ));
            }
        }

        if self.events.gate(|o| o.sorting(&nodes)) == Decision::Cancel {
            tracing::debug!("sort cancelled by observer");
            return Ok(OperationStatus::Cancelled);
        }

        let now = Utc::now();
        let parent_id = nodes.first().map(|n| n.parent_id).unwrap_or(ROOT_ID);
        let unlisted: Vec<ContentNode> = scope
            .repo()
            .get_children(parent_id)
            .await?
            .into_iter()
            .filter(|n| !listed.contains(&n.id))
            .collect();
        let mut changed = Vec::new();
        for (index, mut node) in nodes.into_iter().chain(unlisted).enumerate() {
            let order = index as i32;
            if node.sort_order != order {
                node.sort_order = order;
                node.writer_id = user_id;
                node.updated_at = now;
                scope.repo().save(&mut node).await?;
                changed.push(node);
            }
        }

        self.audit
            .write(user_id, parent_id, AuditKind::Sort, "Sort children");
        scope.complete().await?;

        if !changed.is_empty() {
            self.events.notify(|o| o.sorted(&changed));
            let changes: Vec<TreeChange> = changed
                .iter()
                .map(|n| TreeChange::new(n.id, TreeChangeKind::RefreshNode))
                .collect();
            self.events.notify(|o| o.tree_changed(&changes));
        }
        Ok(OperationStatus::Success)
    }

    // -------------------------------------------------------------- versions

    /// Version history for a node, oldest first.
    pub async fn get_versions(
        &self,
        id: i64,
    ) -> Result<Vec<crate::db::VersionRecord>, ContentServiceError> {
        let scope = self.begin_read().await?;
        self.require(&scope, id).await?;
        Ok(scope.repo().get_versions(id).await?)
    }

    /// Prune superseded versions saved before `cutoff`. The current working
    /// revision is never removed. Returns the number of versions pruned.
    pub async fn delete_versions(
        &self,
        id: i64,
        cutoff: chrono::DateTime<Utc>,
        user_id: i64,
    ) -> Result<usize, ContentServiceError> {
        let scope = self.begin_write().await?;
        self.require(&scope, id).await?;
        let removed = scope.repo().delete_versions_before(id, cutoff).await?;
        self.audit
            .write(user_id, id, AuditKind::PruneVersions, "Prune content versions");
        scope.complete().await?;
        tracing::debug!(node_id = id, removed, "pruned content versions");
        Ok(removed)
    }
}

/// Build an unpersisted deep clone of `source` under `parent_id`.
///
/// Identity, version history, audit fields and published status are reset;
/// everything else (name, properties, schedule) carries over.
fn clone_of(source: &ContentNode, parent_id: i64, user_id: i64) -> ContentNode {
    let now = Utc::now();
    let mut clone = ContentNode::new(source.name.clone(), parent_id, source.properties.clone());
    clone.key = Uuid::new_v4();
    clone.release_date = source.release_date;
    clone.expire_date = source.expire_date;
    clone.creator_id = user_id;
    clone.writer_id = user_id;
    clone.created_at = now;
    clone.updated_at = now;
    clone
}

#[cfg(test)]
#[path = "content_service_tree_test.rs"]
mod content_service_tree_test;
