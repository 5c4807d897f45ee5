//! In-Memory Content Store
//!
//! Reference implementation of the repository and transaction contracts,
//! used by the engine's tests and as the embedded default store. Committed
//! state lives behind a shared `RwLock`; each transaction stages writes in an
//! overlay that its own reads observe immediately and other transactions
//! never see until commit.
//!
//! Id and version-id assignment draws from shared monotonic counters, so
//! identities handed out inside a rolled-back scope are simply burned, never
//! reused.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::error::RepositoryError;
use crate::db::locks::LockManager;
use crate::db::repository::{
    ContentRepository, RepositoryTransaction, Scope, ScopeProvider, VersionRecord,
};
use crate::models::{path, ContentNode};

#[derive(Debug, Default)]
struct Committed {
    nodes: HashMap<i64, ContentNode>,
    versions: HashMap<i64, Vec<VersionRecord>>,
}

/// Shared in-memory store. Cheap to clone via `Arc` in the teacher pattern:
/// construct once, hand `Arc<MemoryStore>` to the service.
#[derive(Debug)]
pub struct MemoryStore {
    committed: Arc<RwLock<Committed>>,
    next_id: Arc<AtomicI64>,
    next_version_id: Arc<AtomicI64>,
    locks: Arc<LockManager>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            committed: Arc::new(RwLock::new(Committed::default())),
            next_id: Arc::new(AtomicI64::new(1)),
            next_version_id: Arc::new(AtomicI64::new(1)),
            locks: Arc::new(LockManager::new()),
        }
    }

    /// The lock manager guarding this store's logical resources.
    pub fn lock_manager(&self) -> Arc<LockManager> {
        self.locks.clone()
    }

    /// Committed view of a node, bypassing any open transaction. Test and
    /// diagnostics surface.
    pub fn committed_node(&self, id: i64) -> Option<ContentNode> {
        self.committed
            .read()
            .expect("store lock poisoned")
            .nodes
            .get(&id)
            .cloned()
    }

    /// Number of committed nodes.
    pub fn committed_count(&self) -> usize {
        self.committed.read().expect("store lock poisoned").nodes.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScopeProvider for MemoryStore {
    async fn begin(&self) -> Result<Scope, RepositoryError> {
        let tx = MemoryTransaction {
            committed: self.committed.clone(),
            next_id: self.next_id.clone(),
            next_version_id: self.next_version_id.clone(),
            staged: Mutex::new(Staged::default()),
        };
        Ok(Scope::new(Box::new(tx), self.locks.clone()))
    }
}

#[derive(Debug, Default)]
struct Staged {
    upserts: HashMap<i64, ContentNode>,
    deletes: HashSet<i64>,
    new_versions: Vec<VersionRecord>,
    prunes: Vec<(i64, DateTime<Utc>, i64)>,
}

struct MemoryTransaction {
    committed: Arc<RwLock<Committed>>,
    next_id: Arc<AtomicI64>,
    next_version_id: Arc<AtomicI64>,
    staged: Mutex<Staged>,
}

impl MemoryTransaction {
    /// Merged view of a single node: staged overlay wins, deletes hide.
    fn view_node(&self, id: i64) -> Option<ContentNode> {
        let staged = self.staged.lock().expect("staged lock poisoned");
        if staged.deletes.contains(&id) {
            return None;
        }
        if let Some(node) = staged.upserts.get(&id) {
            return Some(node.clone());
        }
        drop(staged);
        self.committed
            .read()
            .expect("store lock poisoned")
            .nodes
            .get(&id)
            .cloned()
    }

    /// Merged view of all nodes matching `filter`.
    fn view_filtered(&self, filter: impl Fn(&ContentNode) -> bool) -> Vec<ContentNode> {
        let staged = self.staged.lock().expect("staged lock poisoned");
        let committed = self.committed.read().expect("store lock poisoned");
        let mut out: Vec<ContentNode> = Vec::new();
        for (id, node) in &committed.nodes {
            if staged.deletes.contains(id) || staged.upserts.contains_key(id) {
                continue;
            }
            if filter(node) {
                out.push(node.clone());
            }
        }
        for node in staged.upserts.values() {
            if filter(node) {
                out.push(node.clone());
            }
        }
        out
    }

    /// Merged version history for a node, oldest first.
    fn view_versions(&self, id: i64) -> Vec<VersionRecord> {
        let staged = self.staged.lock().expect("staged lock poisoned");
        if staged.deletes.contains(&id) {
            return Vec::new();
        }
        let committed = self.committed.read().expect("store lock poisoned");
        let mut versions: Vec<VersionRecord> = committed
            .versions
            .get(&id)
            .cloned()
            .unwrap_or_default();
        for record in staged.new_versions.iter().filter(|v| v.node.id == id) {
            match versions.iter_mut().find(|v| v.version_id == record.version_id) {
                Some(existing) => *existing = record.clone(),
                None => versions.push(record.clone()),
            }
        }
        for (prune_id, cutoff, current) in &staged.prunes {
            if *prune_id == id {
                versions.retain(|v| v.saved_at >= *cutoff || v.version_id == *current);
            }
        }
        versions.sort_by_key(|v| v.version_id);
        versions
    }
}

#[async_trait]
impl ContentRepository for MemoryTransaction {
    async fn get(&self, id: i64) -> Result<Option<ContentNode>, RepositoryError> {
        Ok(self.view_node(id))
    }

    async fn get_many(&self, ids: &[i64]) -> Result<Vec<ContentNode>, RepositoryError> {
        Ok(ids.iter().filter_map(|&id| self.view_node(id)).collect())
    }

    async fn get_children(&self, parent_id: i64) -> Result<Vec<ContentNode>, RepositoryError> {
        let mut children = self.view_filtered(|n| n.parent_id == parent_id);
        children.sort_by_key(|n| (n.sort_order, n.id));
        Ok(children)
    }

    async fn get_descendants(&self, path: &str) -> Result<Vec<ContentNode>, RepositoryError> {
        let prefix = path::descendant_prefix(path);
        let mut descendants = self.view_filtered(|n| n.path.starts_with(&prefix));
        descendants.sort_by_key(|n| (n.level, n.sort_order, n.id));
        Ok(descendants)
    }

    async fn get_for_release(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ContentNode>, RepositoryError> {
        let mut due = self.view_filtered(|n| n.release_date.is_some_and(|d| d <= now));
        due.sort_by_key(|n| n.id);
        Ok(due)
    }

    async fn get_for_expiry(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ContentNode>, RepositoryError> {
        let mut due =
            self.view_filtered(|n| n.published && n.expire_date.is_some_and(|d| d <= now));
        due.sort_by_key(|n| n.id);
        Ok(due)
    }

    async fn save(&self, node: &mut ContentNode) -> Result<(), RepositoryError> {
        if node.id == 0 {
            node.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        }
        let is_new_version = node.version_id == 0;
        if is_new_version {
            node.version_id = self.next_version_id.fetch_add(1, Ordering::SeqCst);
        }

        let mut staged = self.staged.lock().expect("staged lock poisoned");
        staged.deletes.remove(&node.id);
        staged.upserts.insert(node.id, node.clone());

        let record = VersionRecord {
            version_id: node.version_id,
            saved_at: Utc::now(),
            node: node.clone(),
        };
        match staged
            .new_versions
            .iter_mut()
            .find(|v| v.node.id == node.id && v.version_id == record.version_id)
        {
            Some(existing) => *existing = record,
            None => staged.new_versions.push(record),
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        let mut staged = self.staged.lock().expect("staged lock poisoned");
        staged.upserts.remove(&id);
        staged.new_versions.retain(|v| v.node.id != id);
        staged.deletes.insert(id);
        Ok(())
    }

    async fn get_versions(&self, id: i64) -> Result<Vec<VersionRecord>, RepositoryError> {
        Ok(self.view_versions(id))
    }

    async fn delete_versions_before(
        &self,
        id: i64,
        cutoff: DateTime<Utc>,
    ) -> Result<usize, RepositoryError> {
        let current = self
            .view_node(id)
            .ok_or(RepositoryError::NotFound { id })?
            .version_id;
        let removable = self
            .view_versions(id)
            .iter()
            .filter(|v| v.saved_at < cutoff && v.version_id != current)
            .count();
        let mut staged = self.staged.lock().expect("staged lock poisoned");
        staged.prunes.push((id, cutoff, current));
        Ok(removable)
    }
}

#[async_trait]
impl RepositoryTransaction for MemoryTransaction {
    fn as_repo(&self) -> &dyn ContentRepository {
        self
    }

    async fn commit(&mut self) -> Result<(), RepositoryError> {
        let staged = std::mem::take(&mut *self.staged.lock().expect("staged lock poisoned"));
        let mut committed = self.committed.write().expect("store lock poisoned");

        for id in &staged.deletes {
            committed.nodes.remove(id);
            committed.versions.remove(id);
        }
        for (id, node) in staged.upserts {
            committed.nodes.insert(id, node);
        }
        for record in staged.new_versions {
            let versions = committed.versions.entry(record.node.id).or_default();
            match versions.iter_mut().find(|v| v.version_id == record.version_id) {
                Some(existing) => *existing = record,
                None => versions.push(record),
            }
        }
        for (id, cutoff, current) in staged.prunes {
            if let Some(versions) = committed.versions.get_mut(&id) {
                versions.retain(|v| v.saved_at >= cutoff || v.version_id == current);
            }
        }
        Ok(())
    }

    fn rollback(&mut self) {
        let mut staged = self.staged.lock().expect("staged lock poisoned");
        staged.upserts.clear();
        staged.deletes.clear();
        staged.new_versions.clear();
        staged.prunes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ROOT_ID;
    use chrono::Duration;
    use serde_json::json;

    fn node(name: &str) -> ContentNode {
        let mut n = ContentNode::new(name.to_string(), ROOT_ID, json!({}));
        n.path = String::new();
        n
    }

    #[tokio::test]
    async fn staged_writes_invisible_until_commit() {
        let store = MemoryStore::new();

        let scope = store.begin().await.unwrap();
        let mut n = node("A");
        scope.repo().save(&mut n).await.unwrap();
        let id = n.id;
        assert!(id > 0);

        // In-scope read observes the staged write; committed view does not.
        assert!(scope.repo().get(id).await.unwrap().is_some());
        assert!(store.committed_node(id).is_none());

        scope.complete().await.unwrap();
        assert!(store.committed_node(id).is_some());
    }

    #[tokio::test]
    async fn dropped_scope_rolls_back() {
        let store = MemoryStore::new();
        let id;
        {
            let scope = store.begin().await.unwrap();
            let mut n = node("A");
            scope.repo().save(&mut n).await.unwrap();
            id = n.id;
            // Scope dropped without complete().
        }
        assert!(store.committed_node(id).is_none());
        assert_eq!(store.committed_count(), 0);
    }

    #[tokio::test]
    async fn save_assigns_new_version_only_when_requested() {
        let store = MemoryStore::new();
        let scope = store.begin().await.unwrap();

        let mut n = node("A");
        scope.repo().save(&mut n).await.unwrap();
        let first_version = n.version_id;

        // Persisting again without resetting version_id keeps the revision.
        n.name = "A2".to_string();
        scope.repo().save(&mut n).await.unwrap();
        assert_eq!(n.version_id, first_version);
        assert_eq!(scope.repo().get_versions(n.id).await.unwrap().len(), 1);

        // Resetting version_id forces a new version row.
        n.version_id = 0;
        scope.repo().save(&mut n).await.unwrap();
        assert!(n.version_id > first_version);
        assert_eq!(scope.repo().get_versions(n.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn prune_never_removes_current_version() {
        let store = MemoryStore::new();
        let scope = store.begin().await.unwrap();

        let mut n = node("A");
        scope.repo().save(&mut n).await.unwrap();
        n.version_id = 0;
        scope.repo().save(&mut n).await.unwrap();
        n.version_id = 0;
        scope.repo().save(&mut n).await.unwrap();

        let cutoff = Utc::now() + Duration::hours(1);
        let removed = scope
            .repo()
            .delete_versions_before(n.id, cutoff)
            .await
            .unwrap();
        assert_eq!(removed, 2);

        let remaining = scope.repo().get_versions(n.id).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].version_id, n.version_id);
    }

    #[tokio::test]
    async fn descendants_returned_parent_before_child() {
        let store = MemoryStore::new();
        let scope = store.begin().await.unwrap();

        let mut root = node("root");
        root.path = "-1,0".to_string(); // placeholder, fixed after id assignment
        scope.repo().save(&mut root).await.unwrap();
        root.path = format!("-1,{}", root.id);
        root.level = 1;
        scope.repo().save(&mut root).await.unwrap();

        let mut child = node("child");
        child.parent_id = root.id;
        scope.repo().save(&mut child).await.unwrap();
        child.path = format!("{},{}", root.path, child.id);
        child.level = 2;
        scope.repo().save(&mut child).await.unwrap();

        let mut grandchild = node("grandchild");
        grandchild.parent_id = child.id;
        scope.repo().save(&mut grandchild).await.unwrap();
        grandchild.path = format!("{},{}", child.path, grandchild.id);
        grandchild.level = 3;
        scope.repo().save(&mut grandchild).await.unwrap();

        let descendants = scope.repo().get_descendants(&root.path).await.unwrap();
        assert_eq!(descendants.len(), 2);
        assert_eq!(descendants[0].id, child.id);
        assert_eq!(descendants[1].id, grandchild.id);
    }
}
