//! Named Read/Write Locks
//!
//! A coarse-grained lock registry guarding logical resources by name. The
//! content tree uses a single resource, [`CONTENT_TREE_LOCK`]: path
//! recomputation for a cascade must see a consistent snapshot of the whole
//! subtree, and per-node locking would not stop a sibling elsewhere in the
//! tree from being moved mid-cascade. One write lock therefore serializes all
//! structural mutations tree-wide; readers share with other readers but block
//! behind a pending or active writer.
//!
//! Guards are held by the enclosing [`Scope`](crate::db::Scope) and released
//! when the scope exits, commit or rollback alike.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

/// The single logical resource guarding all tree-shape operations.
pub const CONTENT_TREE_LOCK: &str = "content-tree";

/// A held lock, read or write. Dropping releases it.
#[derive(Debug)]
pub enum LockGuard {
    Read(OwnedRwLockReadGuard<()>),
    Write(OwnedRwLockWriteGuard<()>),
}

/// Registry of named async read/write locks.
///
/// Locks are created lazily on first acquisition and live for the lifetime
/// of the manager.
#[derive(Debug, Default)]
pub struct LockManager {
    locks: Mutex<HashMap<String, Arc<RwLock<()>>>>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn resource(&self, name: &str) -> Arc<RwLock<()>> {
        let mut locks = self.locks.lock().expect("lock registry poisoned");
        locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    /// Acquire a shared read lock on the named resource.
    pub async fn acquire_read(&self, name: &str) -> LockGuard {
        LockGuard::Read(self.resource(name).read_owned().await)
    }

    /// Acquire an exclusive write lock on the named resource.
    pub async fn acquire_write(&self, name: &str) -> LockGuard {
        LockGuard::Write(self.resource(name).write_owned().await)
    }
}
