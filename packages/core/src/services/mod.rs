//! Business Services
//!
//! This module contains the core business logic of the engine:
//!
//! - `ContentService` - tree mutation (save, move, copy, delete, sort) and
//!   the publication state machine (publish, unpublish, branch publish,
//!   scheduled sweep)
//! - Collaborator contracts: audit-trail writer and file-store cleanup
//!
//! Services coordinate between the storage layer and the notification bus,
//! enforcing the tree invariants and the tree-wide locking discipline.

pub mod collaborators;
pub mod content_service;
pub mod error;
pub mod publishing;

pub use collaborators::{
    AuditKind, AuditWriter, FileCleanup, NoopAuditWriter, NoopFileCleanup, RecordingAuditWriter,
    RecordingFileCleanup,
};
pub use content_service::{ContentService, OperationStatus};
pub use error::ContentServiceError;
pub use publishing::{PublishResult, PublishResultType};
