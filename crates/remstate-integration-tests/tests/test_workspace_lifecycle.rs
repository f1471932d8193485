//! # Workspace Lifecycle Integration Tests
//!
//! Drives the workspace manager end to end over the in-memory blob store
//! and lock table: creation, enumeration, selection, deletion, and the
//! listing filters that keep stray objects out of the workspace list.

use std::sync::Arc;

use remstate_client::{MemoryObjectStore, ObjectStore, WorkspaceError, WorkspaceManager};
use remstate_core::{BackendConfig, EncryptionDirective, OpContext, WorkspaceName};
use remstate_lock::{LockInfo, MemoryLockTable};

fn manager(key: &str, prefix: Option<&str>) -> (Arc<MemoryObjectStore>, WorkspaceManager) {
    let config = BackendConfig {
        bucket: "tf-state".into(),
        key: key.into(),
        workspace_key_prefix: prefix.map(str::to_string),
        lock_table: Some("tf-locks".into()),
        ..Default::default()
    }
    .validate()
    .unwrap();
    let store = Arc::new(MemoryObjectStore::with_page_size(2));
    let mgr = WorkspaceManager::new(config, store.clone(), Arc::new(MemoryLockTable::new()));
    (store, mgr)
}

fn ws(name: &str) -> WorkspaceName {
    WorkspaceName::new(name).unwrap()
}

fn names(list: Vec<WorkspaceName>) -> Vec<String> {
    list.into_iter().map(|w| w.as_str().to_string()).collect()
}

fn plant(store: &MemoryObjectStore, path: &str) {
    store
        .put_object(path, b"junk", &EncryptionDirective::None)
        .unwrap();
}

// ---------------------------------------------------------------------------
// 1. Create, list, delete with the default prefix
// ---------------------------------------------------------------------------

#[test]
fn create_list_delete_round() {
    let (store, mgr) = manager("test/state", None);
    let ctx = OpContext::background();

    assert!(mgr.create(&ctx, &ws("s1"), LockInfo::new("init")).unwrap());
    assert!(store.contains("env:/s1/test/state"));
    assert_eq!(mgr.resolve_path(&ws("s1")), "env:/s1/test/state");
    assert_eq!(names(mgr.workspaces(&ctx).unwrap()), vec!["default", "s1"]);

    mgr.delete(&ctx, &ws("s1"), false).unwrap();
    assert!(!store.contains("env:/s1/test/state"));
    assert_eq!(names(mgr.workspaces(&ctx).unwrap()), vec!["default"]);
}

// ---------------------------------------------------------------------------
// 2. Stray objects under the prefix are not workspaces
// ---------------------------------------------------------------------------

#[test]
fn junk_objects_are_ignored() {
    let (store, mgr) = manager("test/state", None);
    let ctx = OpContext::background();
    mgr.create(&ctx, &ws("s1"), LockInfo::new("init")).unwrap();

    plant(&store, "env:/error");
    plant(&store, "env:/s2/notTestState");
    plant(&store, "env:/s2/");
    plant(&store, "env:/s3/test/state/extra");
    plant(&store, "env:/ /test/state");
    plant(&store, "unrelated/object");

    assert_eq!(names(mgr.workspaces(&ctx).unwrap()), vec!["default", "s1"]);
}

// ---------------------------------------------------------------------------
// 3. A workspace name that starts with the prefix text
// ---------------------------------------------------------------------------

#[test]
fn prefix_text_inside_workspace_name() {
    let (store, mgr) = manager("test-env.tfstate", Some("env"));
    let ctx = OpContext::background();

    mgr.create(&ctx, &ws("env-1"), LockInfo::new("init")).unwrap();
    assert!(store.contains("env/env-1/test-env.tfstate"));
    // Shares the prefix string but not the segment boundary.
    plant(&store, "env-2/test-env.tfstate");

    assert_eq!(names(mgr.workspaces(&ctx).unwrap()), vec!["default", "env-1"]);
}

// ---------------------------------------------------------------------------
// 4. Multi-segment and empty prefixes
// ---------------------------------------------------------------------------

#[test]
fn multi_segment_prefix() {
    let (store, mgr) = manager("some/paths/tfstate", Some("project/env:"));
    let ctx = OpContext::background();

    mgr.create(&ctx, &ws("ws1"), LockInfo::new("init")).unwrap();
    mgr.create(&ctx, &ws("ws2"), LockInfo::new("init")).unwrap();
    // Same base key under a different prefix belongs to someone else.
    plant(&store, "env:/ws3/some/paths/tfstate");

    assert!(store.contains("project/env:/ws1/some/paths/tfstate"));
    assert_eq!(
        names(mgr.workspaces(&ctx).unwrap()),
        vec!["default", "ws1", "ws2"]
    );
}

#[test]
fn empty_prefix_lists_whole_bucket() {
    let (store, mgr) = manager("some/paths/tfstate", Some(""));
    let ctx = OpContext::background();

    mgr.create(&ctx, &ws("default"), LockInfo::new("init")).unwrap();
    mgr.create(&ctx, &ws("ws1"), LockInfo::new("init")).unwrap();
    plant(&store, "a/b/some/paths/tfstate");

    assert!(store.contains("some/paths/tfstate"));
    assert!(store.contains("ws1/some/paths/tfstate"));
    assert_eq!(names(mgr.workspaces(&ctx).unwrap()), vec!["default", "ws1"]);
}

// ---------------------------------------------------------------------------
// 5. Deletion rules
// ---------------------------------------------------------------------------

#[test]
fn selected_workspace_is_protected() {
    let (_, mgr) = manager("test/state", None);
    let ctx = OpContext::background();
    mgr.create(&ctx, &ws("s1"), LockInfo::new("init")).unwrap();
    mgr.select(&ctx, &ws("s1")).unwrap();

    let err = mgr.delete(&ctx, &ws("s1"), false).unwrap_err();
    assert!(matches!(err, WorkspaceError::InUse { .. }));
    assert_eq!(names(mgr.workspaces(&ctx).unwrap()), vec!["default", "s1"]);

    mgr.delete(&ctx, &ws("s1"), true).unwrap();
    assert_eq!(mgr.selected(), ws("default"));
}

#[test]
fn default_workspace_is_never_deleted() {
    let (_, mgr) = manager("test/state", None);
    let err = mgr
        .delete(&OpContext::background(), &ws("default"), true)
        .unwrap_err();
    assert!(matches!(err, WorkspaceError::DefaultNotDeletable));
}

#[test]
fn invalid_names_never_reach_the_store() {
    assert!(WorkspaceName::new("").is_err());
    assert!(WorkspaceName::new("a/b").is_err());
}
