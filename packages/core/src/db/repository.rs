//! Repository and Transaction Boundary Contracts
//!
//! Durable storage is an external collaborator: the engine only requires the
//! operations below. [`ContentRepository`] is the read/write surface within a
//! transaction; [`Scope`] is the transaction boundary itself — all repository
//! writes inside a scope either all commit or all roll back, and writes
//! staged in a scope are visible to reads *within the same scope* immediately
//! (the "immediate flush" semantics Copy relies on for generated identities)
//! while external observers see nothing until [`Scope::complete`].
//!
//! Lock acquisition lives on the scope so that guards are released exactly on
//! scope exit, commit and rollback alike.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::error::RepositoryError;
use crate::db::locks::{LockGuard, LockManager};
use crate::models::ContentNode;

/// A persisted revision of a node.
///
/// Version history is append-only and independently prunable; pruning never
/// removes the current working revision.
#[derive(Debug, Clone)]
pub struct VersionRecord {
    pub version_id: i64,
    pub saved_at: DateTime<Utc>,
    pub node: ContentNode,
}

/// Read/write operations available inside a transaction scope.
///
/// Implementations assign identity on first save: a node with `id == 0`
/// receives a fresh id, and a node with `version_id == 0` receives a fresh
/// version id plus a new version row (otherwise the current version row is
/// updated in place).
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Fetch a node by id.
    async fn get(&self, id: i64) -> Result<Option<ContentNode>, RepositoryError>;

    /// Fetch several nodes, preserving the order of `ids`; missing ids are
    /// skipped.
    async fn get_many(&self, ids: &[i64]) -> Result<Vec<ContentNode>, RepositoryError>;

    /// Fetch direct children of a parent, ordered by `sort_order`.
    async fn get_children(&self, parent_id: i64) -> Result<Vec<ContentNode>, RepositoryError>;

    /// Fetch all descendants of the node with the given materialized path,
    /// ordered parent-before-child (ascending level, then sort order).
    async fn get_descendants(&self, path: &str) -> Result<Vec<ContentNode>, RepositoryError>;

    /// Nodes whose `release_date` is due at `now`.
    async fn get_for_release(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ContentNode>, RepositoryError>;

    /// Published nodes whose `expire_date` is due at `now`.
    async fn get_for_expiry(&self, now: DateTime<Utc>)
        -> Result<Vec<ContentNode>, RepositoryError>;

    /// Upsert a node, assigning id and version identity as needed.
    async fn save(&self, node: &mut ContentNode) -> Result<(), RepositoryError>;

    /// Remove a node and its version history.
    async fn delete(&self, id: i64) -> Result<(), RepositoryError>;

    /// Version history for a node, oldest first.
    async fn get_versions(&self, id: i64) -> Result<Vec<VersionRecord>, RepositoryError>;

    /// Prune version rows saved before `cutoff`, never the current one.
    /// Returns the number of rows removed.
    async fn delete_versions_before(
        &self,
        id: i64,
        cutoff: DateTime<Utc>,
    ) -> Result<usize, RepositoryError>;
}

/// A repository transaction: staged reads/writes plus commit/rollback.
#[async_trait]
pub trait RepositoryTransaction: ContentRepository {
    /// Borrow the repository surface of this transaction.
    fn as_repo(&self) -> &dyn ContentRepository;

    /// Apply all staged writes atomically.
    async fn commit(&mut self) -> Result<(), RepositoryError>;

    /// Discard all staged writes. Must be infallible and callable from drop.
    fn rollback(&mut self);
}

/// Opens transaction scopes against a store.
#[async_trait]
pub trait ScopeProvider: Send + Sync {
    async fn begin(&self) -> Result<Scope, RepositoryError>;
}

/// The transaction boundary wrapping every engine operation.
///
/// Dropping a scope that was not completed rolls the transaction back; this
/// is how validation errors and cancelled notifications discard staged
/// writes without explicit unwinding at every early return.
pub struct Scope {
    tx: Box<dyn RepositoryTransaction>,
    locks: Arc<LockManager>,
    guards: Vec<LockGuard>,
    completed: bool,
}

impl Scope {
    pub fn new(tx: Box<dyn RepositoryTransaction>, locks: Arc<LockManager>) -> Self {
        Self {
            tx,
            locks,
            guards: Vec::new(),
            completed: false,
        }
    }

    /// Acquire a shared read lock scoped to this transaction.
    pub async fn read_lock(&mut self, resource: &str) {
        let guard = self.locks.acquire_read(resource).await;
        self.guards.push(guard);
    }

    /// Acquire an exclusive write lock scoped to this transaction.
    pub async fn write_lock(&mut self, resource: &str) {
        let guard = self.locks.acquire_write(resource).await;
        self.guards.push(guard);
    }

    /// The repository surface of this scope's transaction.
    pub fn repo(&self) -> &dyn ContentRepository {
        self.tx.as_repo()
    }

    /// Commit all staged writes and release locks.
    pub async fn complete(mut self) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        self.completed = true;
        Ok(())
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        if !self.completed {
            self.tx.rollback();
        }
        // Lock guards drop with the scope, releasing the tree lock.
    }
}
