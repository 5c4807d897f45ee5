//! Materialized Path Computation
//!
//! Pure helpers for the materialized-path scheme used across the tree:
//! a node's `path` is the comma-joined sequence of ancestor ids starting at
//! the root sentinel and ending with the node's own id (e.g. `"-1,12,57"`),
//! and `level` is the depth below root (root children are level 1).
//!
//! Trash membership is encoded in the path itself: the recycle bin sentinel
//! appears as the second element (`"-1,-20,87"`), which is why the bin
//! contributes one extra level below root.
//!
//! Invariants maintained by callers through these helpers:
//!
//! - `path(n) == path(parent(n)) + "," + id(n)`
//! - `level(n) == level(parent(n)) + 1`
//! - `trashed(n) == true` iff `path(n)` contains the recycle bin sentinel

use crate::models::node::{ContentNode, RECYCLE_BIN_ID, ROOT_ID};

/// Destination of a relocation (or first save).
///
/// The two sentinels are not real nodes, so they carry fixed path/level
/// contributions instead of being fetched from the repository.
#[derive(Debug, Clone, Copy)]
pub enum ParentRef<'a> {
    Root,
    RecycleBin,
    Node(&'a ContentNode),
}

impl<'a> ParentRef<'a> {
    /// The id a child of this parent stores in `parent_id`.
    pub fn id(&self) -> i64 {
        match self {
            ParentRef::Root => ROOT_ID,
            ParentRef::RecycleBin => RECYCLE_BIN_ID,
            ParentRef::Node(n) => n.id,
        }
    }

    /// The (path, level) this parent contributes to its children.
    fn base(&self) -> (String, i32) {
        match self {
            ParentRef::Root => (ROOT_ID.to_string(), 0),
            // One extra level below root: the bin itself occupies level 1.
            ParentRef::RecycleBin => (format!("{},{}", ROOT_ID, RECYCLE_BIN_ID), 1),
            ParentRef::Node(n) => (n.path.clone(), n.level),
        }
    }
}

/// Compute the materialized path and level for `node_id` placed under
/// `parent`: parent's path plus the node's own id, parent's level plus one.
pub fn materialize(node_id: i64, parent: &ParentRef<'_>) -> (String, i32) {
    let (parent_path, parent_level) = parent.base();
    (format!("{},{}", parent_path, node_id), parent_level + 1)
}

/// Derive a child path/level from an already-resolved parent path/level.
///
/// Used by subtree cascades, where the parent's new path lives in a working
/// map rather than on a fetched node.
pub fn materialize_under(node_id: i64, parent_path: &str, parent_level: i32) -> (String, i32) {
    (format!("{},{}", parent_path, node_id), parent_level + 1)
}

/// Whether a path passes through the recycle bin sentinel.
pub fn is_trashed_path(path: &str) -> bool {
    segments(path).any(|id| id == RECYCLE_BIN_ID)
}

/// Ids of all strict ancestors encoded in `path`, nearest-root first.
/// Sentinel segments (root, recycle bin) and the node's own id are excluded.
pub fn ancestor_ids(path: &str) -> Vec<i64> {
    let ids: Vec<i64> = segments(path)
        .filter(|&id| id != ROOT_ID && id != RECYCLE_BIN_ID)
        .collect();
    match ids.split_last() {
        Some((_own, ancestors)) => ancestors.to_vec(),
        None => Vec::new(),
    }
}

/// Whether `path` contains `id` as a segment. A node whose path contains its
/// own id more than once would be its own ancestor; mutations guard on this.
pub fn path_contains(path: &str, id: i64) -> bool {
    segments(path).any(|seg| seg == id)
}

/// The prefix matching all descendants of a node with this path.
pub fn descendant_prefix(path: &str) -> String {
    format!("{},", path)
}

fn segments(path: &str) -> impl Iterator<Item = i64> + '_ {
    path.split(',').filter_map(|s| s.parse::<i64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn persisted(id: i64, path: &str, level: i32) -> ContentNode {
        let mut n = ContentNode::new(format!("n{}", id), ROOT_ID, json!({}));
        n.id = id;
        n.path = path.to_string();
        n.level = level;
        n
    }

    #[test]
    fn materialize_under_root() {
        let (path, level) = materialize(12, &ParentRef::Root);
        assert_eq!(path, "-1,12");
        assert_eq!(level, 1);
    }

    #[test]
    fn materialize_under_node() {
        let parent = persisted(12, "-1,12", 1);
        let (path, level) = materialize(57, &ParentRef::Node(&parent));
        assert_eq!(path, "-1,12,57");
        assert_eq!(level, 2);
    }

    #[test]
    fn materialize_under_recycle_bin_adds_a_level() {
        let (path, level) = materialize(87, &ParentRef::RecycleBin);
        assert_eq!(path, "-1,-20,87");
        assert_eq!(level, 2);
        assert!(is_trashed_path(&path));
    }

    #[test]
    fn root_child_path_is_not_trashed() {
        assert!(!is_trashed_path("-1,12,57"));
    }

    #[test]
    fn ancestor_ids_excludes_sentinels_and_self() {
        assert_eq!(ancestor_ids("-1,12,57,90"), vec![12, 57]);
        assert_eq!(ancestor_ids("-1,12"), Vec::<i64>::new());
        assert_eq!(ancestor_ids("-1,-20,87"), Vec::<i64>::new());
    }

    #[test]
    fn path_contains_matches_whole_segments_only() {
        assert!(path_contains("-1,12,57", 12));
        // 5 is a substring of 57 but not a segment
        assert!(!path_contains("-1,12,57", 5));
    }
}
