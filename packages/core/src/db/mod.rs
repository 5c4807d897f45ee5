//! Storage Layer
//!
//! This module defines the contracts the engine consumes from durable
//! storage, and ships an in-memory reference implementation:
//!
//! - Repository contract: fetch by id/ids/parent, fetch descendants by path
//!   prefix, upsert, delete, version pruning
//! - Transaction boundary ([`Scope`]): staged writes with commit/rollback and
//!   immediate in-scope visibility
//! - Named coarse-grained locking ([`LockManager`]) scoped to a transaction
//!
//! A production deployment substitutes its own [`ScopeProvider`] over a real
//! database; the engine never talks to storage outside a scope.

mod error;
mod locks;
mod memory_store;
mod repository;

pub use error::RepositoryError;
pub use locks::{LockGuard, LockManager, CONTENT_TREE_LOCK};
pub use memory_store::MemoryStore;
pub use repository::{
    ContentRepository, RepositoryTransaction, Scope, ScopeProvider, VersionRecord,
};
