//! Content Node Data Structures
//!
//! This module defines the core `ContentNode` struct and related types for
//! Canopy's versioned content tree.
//!
//! # Architecture
//!
//! - **Universal Node**: a single struct represents every content item
//! - **Pure JSON properties**: all type-specific data lives in the
//!   `properties` field, so new content shapes never require model changes
//! - **Materialized path**: every node carries the comma-joined chain of
//!   ancestor ids (root sentinel first, own id last), enabling prefix-based
//!   descendant queries without recursive joins
//! - **Explicit publication state**: transient in-transaction states
//!   (`Publishing`, `Unpublishing`) are an enum field on the entity, collapsed
//!   to `Published`/`Unpublished` when the enclosing scope commits
//!
//! # Examples
//!
//! ```rust
//! use canopy_core::models::{ContentNode, ROOT_ID};
//! use serde_json::json;
//!
//! // A node destined for the tree root; identity (id, path, level) is
//! // assigned at first save.
//! let node = ContentNode::new("Home".to_string(), ROOT_ID, json!({}));
//! assert!(!node.has_identity());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::path;

/// Sentinel parent id for nodes directly under the tree root.
pub const ROOT_ID: i64 = -1;

/// Sentinel id of the recycle bin container. A node is trashed iff its
/// materialized path passes through this id.
pub const RECYCLE_BIN_ID: i64 = -20;

/// Validation errors for ContentNode operations
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid parent reference: {0}")]
    InvalidParent(i64),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Publication state of a node.
///
/// `Publishing` and `Unpublishing` are transient, in-transaction states: the
/// publication engine sets them while a transition is being validated and
/// collapses them via [`ContentNode::commit_published_state`] before the
/// enclosing scope commits. Committed rows only ever hold `Published` or
/// `Unpublished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PublishedState {
    #[default]
    Unpublished,
    Published,
    Publishing,
    Unpublishing,
}

/// Derived status of a node at a given instant.
///
/// Unlike [`PublishedState`] this folds in trash membership and the
/// release/expire schedule, which is what publish eligibility checks gate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentStatus {
    Published,
    Unpublished,
    Trashed,
    Expired,
    AwaitingRelease,
}

/// Universal content node for the Canopy tree.
///
/// # Fields
///
/// - `id`: integer identity, `0` until first persisted
/// - `key`: globally unique identifier, assigned at creation, never reused
/// - `parent_id`: parent node id, or [`ROOT_ID`] / [`RECYCLE_BIN_ID`]
/// - `path`: materialized path, e.g. `"-1,12,57"`
/// - `level`: depth; root children are level 1
/// - `sort_order`: ordering among siblings, unique per parent
/// - `trashed`: true iff `path` passes through the recycle bin sentinel
/// - `published` / `published_state` / `published_version_id`: committed
///   publish flag, state machine state, and the persisted published revision
/// - `version_id`: current working revision; each content save creates a new
///   version row (history is append-only and independently prunable)
/// - `properties`: JSON object holding all type-specific fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentNode {
    pub id: i64,
    pub key: Uuid,
    pub name: String,
    pub parent_id: i64,
    pub path: String,
    pub level: i32,
    pub sort_order: i32,
    pub trashed: bool,
    pub published: bool,
    pub published_state: PublishedState,
    pub published_version_id: i64,
    pub version_id: i64,
    pub creator_id: i64,
    pub writer_id: i64,
    pub release_date: Option<DateTime<Utc>>,
    pub expire_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub properties: serde_json::Value,
}

impl ContentNode {
    /// Create a new, unpersisted node under the given parent.
    ///
    /// The node has no identity yet: `id`, `path`, `level`, `sort_order` and
    /// `version_id` are assigned when the content service first saves it.
    pub fn new(name: String, parent_id: i64, properties: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            key: Uuid::new_v4(),
            name,
            parent_id,
            path: String::new(),
            level: 0,
            sort_order: 0,
            trashed: false,
            published: false,
            published_state: PublishedState::Unpublished,
            published_version_id: 0,
            version_id: 0,
            creator_id: 0,
            writer_id: 0,
            release_date: None,
            expire_date: None,
            created_at: now,
            updated_at: now,
            properties,
        }
    }

    /// Whether the node has been persisted at least once.
    pub fn has_identity(&self) -> bool {
        self.id != 0
    }

    /// Whether the node sits directly under the tree root.
    pub fn is_root_child(&self) -> bool {
        self.parent_id == ROOT_ID
    }

    /// Ids of all strict ancestors, nearest-root first, sentinels excluded.
    pub fn ancestor_ids(&self) -> Vec<i64> {
        path::ancestor_ids(&self.path)
    }

    /// Derived status at `now`.
    ///
    /// Evaluation order matters: trash membership dominates, then the expire
    /// schedule, then a pending release, then the committed publish flag.
    pub fn status(&self, now: DateTime<Utc>) -> ContentStatus {
        if self.trashed {
            ContentStatus::Trashed
        } else if self.expire_date.is_some_and(|d| d <= now) {
            ContentStatus::Expired
        } else if self.release_date.is_some_and(|d| d > now) {
            ContentStatus::AwaitingRelease
        } else if self.published {
            ContentStatus::Published
        } else {
            ContentStatus::Unpublished
        }
    }

    /// Enter the transient `Publishing` state.
    pub fn begin_publishing(&mut self) {
        self.published_state = PublishedState::Publishing;
    }

    /// Enter the transient `Unpublishing` state.
    pub fn begin_unpublishing(&mut self) {
        self.published_state = PublishedState::Unpublishing;
    }

    /// Collapse a transient publication state to its committed form.
    ///
    /// `Publishing` becomes `Published` with `published = true` and the
    /// current working revision promoted to the published revision;
    /// `Unpublishing` becomes `Unpublished` with `published = false`. The
    /// committed states pass through unchanged.
    pub fn commit_published_state(&mut self) {
        match self.published_state {
            PublishedState::Publishing => {
                self.published = true;
                self.published_version_id = self.version_id;
                self.published_state = PublishedState::Published;
            }
            PublishedState::Unpublishing => {
                self.published = false;
                self.published_state = PublishedState::Unpublished;
            }
            PublishedState::Published | PublishedState::Unpublished => {}
        }
    }

    /// Whether the current working revision is already the published one.
    ///
    /// Used by publish operations to short-circuit to `SuccessAlready`
    /// before running any eligibility check.
    pub fn is_published_and_unchanged(&self) -> bool {
        self.published && self.published_version_id == self.version_id
    }

    /// Validate the minimal model constraints for a save.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name".to_string()));
        }
        if self.parent_id == 0 {
            return Err(ValidationError::InvalidParent(self.parent_id));
        }
        Ok(())
    }
}
