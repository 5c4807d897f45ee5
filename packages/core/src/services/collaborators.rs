//! External Collaborators
//!
//! Contracts consumed by the content service but implemented elsewhere: the
//! audit-trail writer and the file-store cleanup invoked when nodes carrying
//! attached binary assets are deleted. No-op implementations are provided for
//! deployments (and tests) that do not care.

use std::sync::Mutex;

/// Kind of audit entry written after a committed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditKind {
    New,
    Save,
    Move,
    Copy,
    Delete,
    Publish,
    Unpublish,
    Sort,
    RecycleBin,
    PruneVersions,
}

/// Audit-trail writer. Entries record who did what to which node.
pub trait AuditWriter: Send + Sync {
    fn write(&self, user_id: i64, node_id: i64, kind: AuditKind, message: &str);
}

/// File-store cleanup for binary assets attached to deleted nodes.
pub trait FileCleanup: Send + Sync {
    fn delete_files(&self, paths: Vec<String>);
}

/// Audit writer that drops every entry.
#[derive(Debug, Default)]
pub struct NoopAuditWriter;

impl AuditWriter for NoopAuditWriter {
    fn write(&self, _user_id: i64, _node_id: i64, _kind: AuditKind, _message: &str) {}
}

/// File cleanup that ignores every request.
#[derive(Debug, Default)]
pub struct NoopFileCleanup;

impl FileCleanup for NoopFileCleanup {
    fn delete_files(&self, _paths: Vec<String>) {}
}

/// Recording file cleanup for tests.
#[derive(Debug, Default)]
pub struct RecordingFileCleanup {
    deleted: Mutex<Vec<String>>,
}

impl RecordingFileCleanup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().expect("cleanup log poisoned").clone()
    }
}

impl FileCleanup for RecordingFileCleanup {
    fn delete_files(&self, mut paths: Vec<String>) {
        self.deleted
            .lock()
            .expect("cleanup log poisoned")
            .append(&mut paths);
    }
}

/// Recording audit writer for tests.
#[derive(Debug, Default)]
pub struct RecordingAuditWriter {
    entries: Mutex<Vec<(i64, i64, AuditKind, String)>>,
}

impl RecordingAuditWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(i64, i64, AuditKind, String)> {
        self.entries.lock().expect("audit log poisoned").clone()
    }
}

impl AuditWriter for RecordingAuditWriter {
    fn write(&self, user_id: i64, node_id: i64, kind: AuditKind, message: &str) {
        self.entries
            .lock()
            .expect("audit log poisoned")
            .push((user_id, node_id, kind, message.to_string()));
    }
}
