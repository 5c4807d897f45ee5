//! Integration Tests for Tree Mutation
//!
//! Exercises the content service's structural operations against the
//! in-memory store: save identity assignment, move cascades with path/level
//! recomputation, recycle-bin semantics, recursive copy, cascading delete
//! and sibling sorting.

#[cfg(test)]
mod tests {
    use crate::db::MemoryStore;
    use crate::events::{ContentObserver, Decision, MoveEventInfo, TreeChange, TreeChangeKind};
    use crate::models::{ContentNode, PublishedState, RECYCLE_BIN_ID, ROOT_ID};
    use crate::services::{
        ContentService, ContentServiceError, OperationStatus, RecordingFileCleanup,
    };
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    const USER: i64 = 1;

    /// Helper to create test services
    fn create_test_service() -> (Arc<ContentService>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let service = Arc::new(ContentService::new(store.clone()));
        (service, store)
    }

    /// Helper to create and save a node under the given parent
    async fn create(service: &ContentService, name: &str, parent_id: i64) -> ContentNode {
        let mut node = ContentNode::new(name.to_string(), parent_id, json!({}));
        let status = service.save(&mut node, USER).await.unwrap();
        assert_eq!(status, OperationStatus::Success);
        node
    }

    #[tokio::test]
    async fn save_under_root_materializes_path() {
        let (service, store) = create_test_service();

        let a = create(&service, "A", ROOT_ID).await;
        assert!(a.has_identity());
        assert_eq!(a.path, format!("-1,{}", a.id));
        assert_eq!(a.level, 1);
        assert_eq!(a.sort_order, 0);

        let b = create(&service, "B", ROOT_ID).await;
        assert_eq!(b.sort_order, 1);

        let committed = store.committed_node(a.id).unwrap();
        assert_eq!(committed.path, a.path);
    }

    #[tokio::test]
    async fn save_under_missing_parent_fails() {
        let (service, _store) = create_test_service();
        let mut orphan = ContentNode::new("orphan".to_string(), 9999, json!({}));
        let err = service.save(&mut orphan, USER).await.unwrap_err();
        assert!(matches!(
            err,
            ContentServiceError::InvalidParent { parent_id: 9999 }
        ));
    }

    #[tokio::test]
    async fn save_existing_creates_new_version_and_keeps_structure() {
        let (service, _store) = create_test_service();
        let mut a = create(&service, "A", ROOT_ID).await;
        let first_version = a.version_id;
        let path = a.path.clone();

        a.name = "A renamed".to_string();
        service.save(&mut a, USER).await.unwrap();
        assert!(a.version_id > first_version);
        assert_eq!(a.path, path);
        assert_eq!(service.get_versions(a.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn move_recomputes_descendant_paths_and_levels() {
        let (service, store) = create_test_service();

        // p1/x/c and p2/p2a
        let p1 = create(&service, "P1", ROOT_ID).await;
        let x = create(&service, "X", p1.id).await;
        let c = create(&service, "C", x.id).await;
        let p2 = create(&service, "P2", ROOT_ID).await;
        let p2a = create(&service, "P2a", p2.id).await;

        let before = service.count_descendants(x.id).await.unwrap();
        let status = service.move_node(x.id, p2a.id, USER).await.unwrap();
        assert_eq!(status, OperationStatus::Success);

        let x_after = store.committed_node(x.id).unwrap();
        let c_after = store.committed_node(c.id).unwrap();
        assert_eq!(x_after.parent_id, p2a.id);
        assert_eq!(x_after.path, format!("{},{}", p2a.path, x.id));
        assert_eq!(x_after.level, 3);
        assert_eq!(c_after.path, format!("{},{}", x_after.path, c.id));
        assert_eq!(c_after.level, 4);
        assert_eq!(c_after.parent_id, x.id);

        // Move preserves cardinality.
        assert_eq!(service.count_descendants(x.id).await.unwrap(), before);
        // Acyclicity: own id appears exactly once in the path.
        assert_eq!(
            c_after.path.split(',').filter(|s| *s == c.id.to_string()).count(),
            1
        );
    }

    #[tokio::test]
    async fn move_under_own_subtree_is_rejected() {
        let (service, _store) = create_test_service();
        let a = create(&service, "A", ROOT_ID).await;
        let b = create(&service, "B", a.id).await;

        let err = service.move_node(a.id, b.id, USER).await.unwrap_err();
        assert!(matches!(err, ContentServiceError::HierarchyViolation(_)));
    }

    struct CancelMoves;
    impl ContentObserver for CancelMoves {
        fn moving(&self, _moves: &[MoveEventInfo]) -> Decision {
            Decision::Cancel
        }
    }

    #[tokio::test]
    async fn cancelled_move_rolls_back() {
        let (service, store) = create_test_service();
        let a = create(&service, "A", ROOT_ID).await;
        let b = create(&service, "B", ROOT_ID).await;
        service.events().register(Arc::new(CancelMoves));

        let status = service.move_node(b.id, a.id, USER).await.unwrap();
        assert_eq!(status, OperationStatus::Cancelled);

        let b_after = store.committed_node(b.id).unwrap();
        assert_eq!(b_after.parent_id, ROOT_ID);
        assert_eq!(b_after.path, b.path);
    }

    #[tokio::test]
    async fn recycle_bin_trashes_whole_subtree() {
        let (service, store) = create_test_service();
        let a = create(&service, "A", ROOT_ID).await;
        let b = create(&service, "B", a.id).await;

        service.move_to_recycle_bin(a.id, USER).await.unwrap();

        let a_after = store.committed_node(a.id).unwrap();
        let b_after = store.committed_node(b.id).unwrap();
        assert!(a_after.trashed);
        assert!(b_after.trashed);
        assert_eq!(a_after.path, format!("-1,{},{}", RECYCLE_BIN_ID, a.id));
        assert_eq!(a_after.level, 2);
        assert_eq!(b_after.path, format!("{},{}", a_after.path, b.id));
        assert_eq!(b_after.level, 3);
    }

    #[tokio::test]
    async fn restore_from_trash_forces_unpublish() {
        let (service, store) = create_test_service();
        let a = create(&service, "A", ROOT_ID).await;
        let b = create(&service, "B", a.id).await;
        service.publish(a.id, USER).await.unwrap();
        service.publish(b.id, USER).await.unwrap();

        service.move_to_recycle_bin(a.id, USER).await.unwrap();
        // The trashed root was unpublished on the way in; the descendant
        // still carries its published flag.
        assert!(!store.committed_node(a.id).unwrap().published);
        assert!(store.committed_node(b.id).unwrap().published);

        // Resurrecting the still-published descendant must not let it come
        // back published silently.
        service.move_node(b.id, ROOT_ID, USER).await.unwrap();
        let b_after = store.committed_node(b.id).unwrap();
        assert!(!b_after.trashed);
        assert!(!b_after.published);
        assert_eq!(b_after.published_state, PublishedState::Unpublished);
        assert_eq!(b_after.path, format!("-1,{}", b.id));
    }

    #[tokio::test]
    async fn copy_produces_fresh_identity_and_unpublished_clone() {
        let (service, _store) = create_test_service();
        let mut a = ContentNode::new("A".to_string(), ROOT_ID, json!({"body": "hello"}));
        service.save(&mut a, USER).await.unwrap();
        service.publish(a.id, USER).await.unwrap();
        let target = create(&service, "T", ROOT_ID).await;

        let clone = service
            .copy(a.id, target.id, false, false, USER)
            .await
            .unwrap()
            .expect("copy not cancelled");

        assert_ne!(clone.id, a.id);
        assert_ne!(clone.key, a.key);
        assert_eq!(clone.name, a.name);
        assert_eq!(clone.properties, a.properties);
        assert!(!clone.published);
        assert_eq!(clone.published_version_id, 0);
        assert_eq!(clone.parent_id, target.id);
        assert_eq!(clone.level, 2);
        // No version history carried over.
        assert_eq!(service.get_versions(clone.id).await.unwrap().len(), 1);
        // Source untouched.
        let src = service.get(a.id).await.unwrap().unwrap();
        assert!(src.published);
    }

    struct CancelCopyOf(&'static str);
    impl ContentObserver for CancelCopyOf {
        fn copying(
            &self,
            source: &ContentNode,
            _copy: &ContentNode,
            _relate_to_original: bool,
        ) -> Decision {
            if source.name == self.0 {
                Decision::Cancel
            } else {
                Decision::Continue
            }
        }
    }

    #[tokio::test]
    async fn recursive_copy_skips_cancelled_lineage_but_not_siblings() {
        let (service, _store) = create_test_service();
        // a/{b/{b1}, c}
        let a = create(&service, "A", ROOT_ID).await;
        let b = create(&service, "B", a.id).await;
        let _b1 = create(&service, "B1", b.id).await;
        let _c = create(&service, "C", a.id).await;

        service.events().register(Arc::new(CancelCopyOf("B")));

        let clone = service
            .copy(a.id, ROOT_ID, false, true, USER)
            .await
            .unwrap()
            .expect("root copy not cancelled");

        let children = service.get_children(clone.id).await.unwrap();
        let names: Vec<&str> = children.iter().map(|n| n.name.as_str()).collect();
        // B was cancelled, so B and B1 are absent; sibling C survives.
        assert_eq!(names, vec!["C"]);
        assert_eq!(service.count_descendants(clone.id).await.unwrap(), 1);
    }

    struct FlagAssets;
    impl ContentObserver for FlagAssets {
        fn deleted(&self, node: &ContentNode, media_files: &mut Vec<String>) {
            media_files.push(format!("media/{}.bin", node.id));
        }
    }

    struct ChangeLog(Mutex<Vec<TreeChange>>);
    impl ContentObserver for ChangeLog {
        fn tree_changed(&self, changes: &[TreeChange]) {
            self.0.lock().unwrap().extend(changes.iter().cloned());
        }
    }

    #[tokio::test]
    async fn delete_cascades_bottom_up_with_file_cleanup() {
        let store = Arc::new(MemoryStore::new());
        let events = Arc::new(crate::events::EventBus::new());
        let cleanup = Arc::new(RecordingFileCleanup::new());
        let service = ContentService::with_collaborators(
            store.clone(),
            events,
            Arc::new(crate::services::NoopAuditWriter),
            cleanup.clone(),
        );

        let a = create(&service, "A", ROOT_ID).await;
        let b = create(&service, "B", a.id).await;
        let c = create(&service, "C", b.id).await;

        let log = Arc::new(ChangeLog(Mutex::new(Vec::new())));
        service.events().register(Arc::new(FlagAssets));
        service.events().register(log.clone());

        let before = store.committed_count();
        service.delete(a.id, USER).await.unwrap();

        // Exactly N + 1 nodes removed.
        assert_eq!(store.committed_count(), before - 3);
        assert!(store.committed_node(c.id).is_none());

        // Children flagged before ancestors.
        let deleted_files = cleanup.deleted();
        assert_eq!(
            deleted_files,
            vec![
                format!("media/{}.bin", c.id),
                format!("media/{}.bin", b.id),
                format!("media/{}.bin", a.id),
            ]
        );

        // One structural Remove per top-level call.
        let changes = log.0.lock().unwrap();
        let removes: Vec<&TreeChange> = changes
            .iter()
            .filter(|ch| ch.kind == TreeChangeKind::Remove)
            .collect();
        assert_eq!(removes.len(), 1);
        assert_eq!(removes[0].node_id, a.id);
    }

    struct CancelDeletes;
    impl ContentObserver for CancelDeletes {
        fn deleting(&self, _nodes: &[ContentNode]) -> Decision {
            Decision::Cancel
        }
    }

    #[tokio::test]
    async fn cancelled_delete_removes_nothing() {
        let (service, store) = create_test_service();
        let a = create(&service, "A", ROOT_ID).await;
        let _b = create(&service, "B", a.id).await;
        service.events().register(Arc::new(CancelDeletes));

        let status = service.delete(a.id, USER).await.unwrap();
        assert_eq!(status, OperationStatus::Cancelled);
        assert_eq!(store.committed_count(), 2);
    }

    struct UnpublishLog(Mutex<Vec<i64>>);
    impl ContentObserver for UnpublishLog {
        fn unpublished(&self, nodes: &[ContentNode]) {
            self.0.lock().unwrap().extend(nodes.iter().map(|n| n.id));
        }
    }

    #[tokio::test]
    async fn cancelled_delete_emits_no_unpublish_notice() {
        let (service, store) = create_test_service();
        let a = create(&service, "A", ROOT_ID).await;
        service.publish(a.id, USER).await.unwrap();

        let log = Arc::new(UnpublishLog(Mutex::new(Vec::new())));
        service.events().register(log.clone());
        service.events().register(Arc::new(CancelDeletes));

        // The branch is still live after the cancelled delete, so observers
        // must not have been told it went unpublished.
        let status = service.delete(a.id, USER).await.unwrap();
        assert_eq!(status, OperationStatus::Cancelled);
        assert!(log.0.lock().unwrap().is_empty());
        assert!(store.committed_node(a.id).unwrap().published);

        // A committed delete of a live node does emit it.
        let (service2, store2) = create_test_service();
        let b = create(&service2, "B", ROOT_ID).await;
        service2.publish(b.id, USER).await.unwrap();
        let log2 = Arc::new(UnpublishLog(Mutex::new(Vec::new())));
        service2.events().register(log2.clone());

        service2.delete(b.id, USER).await.unwrap();
        assert!(store2.committed_node(b.id).is_none());
        assert_eq!(log2.0.lock().unwrap().as_slice(), &[b.id]);
    }

    #[tokio::test]
    async fn sort_rewrites_sibling_order() {
        let (service, store) = create_test_service();
        let p = create(&service, "P", ROOT_ID).await;
        let a = create(&service, "A", p.id).await;
        let b = create(&service, "B", p.id).await;
        let c = create(&service, "C", p.id).await;

        service.sort(&[c.id, a.id, b.id], USER).await.unwrap();

        let children = service.get_children(p.id).await.unwrap();
        let ids: Vec<i64> = children.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![c.id, a.id, b.id]);

        // Sibling sort orders stay unique.
        let orders: Vec<i32> = children.iter().map(|n| n.sort_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert_eq!(store.committed_node(c.id).unwrap().sort_order, 0);
    }

    #[tokio::test]
    async fn partial_sort_keeps_sibling_orders_unique() {
        let (service, store) = create_test_service();
        let p = create(&service, "P", ROOT_ID).await;
        let a = create(&service, "A", p.id).await;
        let b = create(&service, "B", p.id).await;
        let c = create(&service, "C", p.id).await;

        // Sorting a subset promotes the listed node; unlisted siblings keep
        // their relative order after it.
        service.sort(&[c.id], USER).await.unwrap();

        let children = service.get_children(p.id).await.unwrap();
        let ids: Vec<i64> = children.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![c.id, a.id, b.id]);

        let mut orders: Vec<i32> = children.iter().map(|n| n.sort_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        orders.dedup();
        assert_eq!(orders.len(), 3);
        assert_eq!(store.committed_node(c.id).unwrap().sort_order, 0);
    }

    #[tokio::test]
    async fn sort_rejects_duplicate_ids() {
        let (service, _store) = create_test_service();
        let p = create(&service, "P", ROOT_ID).await;
        let a = create(&service, "A", p.id).await;
        let b = create(&service, "B", p.id).await;

        let err = service.sort(&[a.id, b.id, a.id], USER).await.unwrap_err();
        assert!(matches!(err, ContentServiceError::InvalidUpdate(_)));
    }

    #[tokio::test]
    async fn sort_rejects_mixed_parents() {
        let (service, _store) = create_test_service();
        let a = create(&service, "A", ROOT_ID).await;
        let b = create(&service, "B", a.id).await;

        let err = service.sort(&[a.id, b.id], USER).await.unwrap_err();
        assert!(matches!(err, ContentServiceError::HierarchyViolation(_)));
    }

    #[tokio::test]
    async fn delete_versions_prunes_history_not_current() {
        let (service, _store) = create_test_service();
        let mut a = create(&service, "A", ROOT_ID).await;
        a.name = "A2".to_string();
        service.save(&mut a, USER).await.unwrap();
        a.name = "A3".to_string();
        service.save(&mut a, USER).await.unwrap();
        assert_eq!(service.get_versions(a.id).await.unwrap().len(), 3);

        let cutoff = chrono::Utc::now() + chrono::Duration::hours(1);
        let removed = service.delete_versions(a.id, cutoff, USER).await.unwrap();
        assert_eq!(removed, 2);

        let remaining = service.get_versions(a.id).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].version_id, a.version_id);
    }
}
