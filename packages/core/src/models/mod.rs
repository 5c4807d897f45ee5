//! Data Models
//!
//! Core data structures for the content tree:
//!
//! - [`node`] - the universal `ContentNode` entity and its publication state
//! - [`path`] - materialized-path computation and invariant helpers

pub mod node;
pub mod path;

pub use node::{
    ContentNode, ContentStatus, PublishedState, ValidationError, RECYCLE_BIN_ID, ROOT_ID,
};
pub use path::ParentRef;
