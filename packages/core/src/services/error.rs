//! Service Layer Error Types
//!
//! Hard errors abort and roll back the enclosing scope. They are deliberately
//! distinct from the two soft failure channels: publish/unpublish
//! ineligibility is a [`PublishResult`](crate::services::PublishResult)
//! value, and observer cancellation surfaces as an operation status — neither
//! is ever raised through this type.

use crate::db::RepositoryError;
use crate::models::ValidationError;
use thiserror::Error;

/// Content service operation errors
#[derive(Error, Debug)]
pub enum ContentServiceError {
    /// Node not found by id
    #[error("Node not found: {id}")]
    NodeNotFound { id: i64 },

    /// Validation failed for a node
    #[error("Node validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),

    /// Repository operation failed
    #[error("Repository operation failed: {0}")]
    Repository(#[from] RepositoryError),

    /// Invalid destination parent (missing or trashed)
    #[error("Invalid parent node: {parent_id}")]
    InvalidParent { parent_id: i64 },

    /// Node hierarchy constraint violation (cycles, unresolved cascade
    /// parents, mixed-parent sorts)
    #[error("Hierarchy constraint violated: {0}")]
    HierarchyViolation(String),

    /// Invalid update operation
    #[error("Invalid update: {0}")]
    InvalidUpdate(String),
}

impl ContentServiceError {
    /// Create a node not found error
    pub fn node_not_found(id: i64) -> Self {
        Self::NodeNotFound { id }
    }

    /// Create an invalid parent error
    pub fn invalid_parent(parent_id: i64) -> Self {
        Self::InvalidParent { parent_id }
    }

    /// Create a hierarchy violation error
    pub fn hierarchy_violation(msg: impl Into<String>) -> Self {
        Self::HierarchyViolation(msg.into())
    }

    /// Create an invalid update error
    pub fn invalid_update(msg: impl Into<String>) -> Self {
        Self::InvalidUpdate(msg.into())
    }
}
