//! Repository Layer Error Types

use thiserror::Error;

/// Errors raised by the repository / transaction boundary.
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Node not found by id
    #[error("Node not found: {id}")]
    NotFound { id: i64 },

    /// The scope was already completed or rolled back
    #[error("Scope is no longer active: {context}")]
    ScopeClosed { context: String },

    /// Commit of staged writes failed
    #[error("Commit failed: {context}")]
    CommitFailed { context: String },

    /// Underlying storage failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl RepositoryError {
    pub fn not_found(id: i64) -> Self {
        Self::NotFound { id }
    }

    pub fn scope_closed(context: impl Into<String>) -> Self {
        Self::ScopeClosed {
            context: context.into(),
        }
    }

    pub fn commit_failed(context: impl Into<String>) -> Self {
        Self::CommitFailed {
            context: context.into(),
        }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}
