//! Integration tests for uploads and conflict redirection

mod common;

use ::common::engine::ops::{RedirectReason, UploadOutcome};
use ::common::prelude::*;

#[tokio::test]
async fn test_create_file_and_reject_duplicate() {
    let env = common::setup_test_env().await;
    let owner = env.user("owner");
    let tree = common::sample_tree(&env, &owner).await;

    let outcome = env
        .upload(&owner, tree.f, "new.txt", None, None, "hello")
        .await
        .unwrap();
    let UploadOutcome::Created { node_id, version_id } = outcome else {
        panic!("expected a new file, got {:?}", outcome);
    };
    let node = env.node(node_id).await;
    assert_eq!(node.latest_version, Some(version_id));
    assert_eq!(node.size, 5);

    let result = env.upload(&owner, tree.f, "new.txt", None, None, "again").await;
    assert!(matches!(
        result,
        Err(EngineError::Conflict(ConflictKind::DuplicateName))
    ));
}

#[tokio::test]
async fn test_update_with_current_base_overwrites() {
    let env = common::setup_test_env().await;
    let owner = env.user("owner");
    let tree = common::sample_tree(&env, &owner).await;
    let base = env.node(tree.a).await.latest_version;

    let outcome = env
        .upload(&owner, tree.f, "A", Some(tree.a), base, "alpha two")
        .await
        .unwrap();
    let UploadOutcome::Updated { node_id, version_id } = outcome else {
        panic!("expected an update, got {:?}", outcome);
    };
    assert_eq!(node_id, tree.a);

    let a = env.node(tree.a).await;
    assert_eq!(a.latest_version, Some(version_id));
    assert_eq!(a.size, 9);
    assert_eq!(env.storage.version_count(tree.a), 2);
    // "alpha" was replaced by "alpha two"
    assert_eq!(env.store.usage(&owner).await.unwrap(), 14);
}

#[tokio::test]
async fn test_stale_base_is_redirected_beside_original() {
    let env = common::setup_test_env().await;
    let owner = env.user("owner");
    let tree = common::sample_tree(&env, &owner).await;
    let before = env.node(tree.a).await;

    let stale = Some(uuid::Uuid::new_v4());
    let outcome = env
        .upload(&owner, tree.f, "A", Some(tree.a), stale, "mine")
        .await
        .unwrap();
    let UploadOutcome::Redirected {
        reason,
        node_id,
        name,
        ..
    } = outcome
    else {
        panic!("expected a redirect, got {:?}", outcome);
    };
    assert_eq!(reason, RedirectReason::VersionRace);
    assert!(name.starts_with("A@"));

    let copy = env.node(node_id).await;
    assert_eq!(copy.parent, Some(tree.f));
    assert_eq!(copy.name, name);
    assert_eq!(env.node(tree.a).await, before);
}

#[tokio::test]
async fn test_lost_write_access_redirects_to_own_root() {
    let env = common::setup_test_env().await;
    let owner = env.user("owner");
    let viewer = env.user("viewer");
    let tree = common::sample_tree(&env, &owner).await;
    let viewer_root = env.root(&viewer).await;
    env.share(&owner, tree.f, &[], &[&viewer]).await.unwrap();
    env.settle().await;

    let base = env.node(tree.a).await.latest_version;
    let outcome = env
        .upload(&viewer, tree.f, "A", Some(tree.a), base, "edits")
        .await
        .unwrap();
    let UploadOutcome::Redirected {
        reason, node_id, ..
    } = outcome
    else {
        panic!("expected a redirect, got {:?}", outcome);
    };
    assert_eq!(reason, RedirectReason::LostRights);

    let copy = env.node(node_id).await;
    assert_eq!(copy.parent, Some(viewer_root));
    assert_eq!(copy.owner, viewer);
    assert_eq!(env.storage.version_count(tree.a), 1);
}

#[tokio::test]
async fn test_upload_to_trashed_file_is_redirected() {
    let env = common::setup_test_env().await;
    let owner = env.user("owner");
    let tree = common::sample_tree(&env, &owner).await;
    let base = env.node(tree.a).await.latest_version;

    env.engine
        .trash(env.lifecycle(&owner, tree.a, false).await)
        .await
        .unwrap();

    let outcome = env
        .upload(&owner, tree.f, "A", Some(tree.a), base, "late edit")
        .await
        .unwrap();
    let UploadOutcome::Redirected {
        reason, node_id, ..
    } = outcome
    else {
        panic!("expected a redirect, got {:?}", outcome);
    };
    assert_eq!(reason, RedirectReason::UnsharedOrDeleted);
    assert_eq!(env.node(node_id).await.parent, Some(tree.f));
}

#[tokio::test]
async fn test_upload_after_unshare_lands_in_own_root() {
    let env = common::setup_test_env().await;
    let owner = env.user("owner");
    let editor = env.user("editor");
    let tree = common::sample_tree(&env, &owner).await;
    let editor_root = env.root(&editor).await;
    env.share(&owner, tree.f, &[&editor], &[]).await.unwrap();
    env.settle().await;
    let base = env.node(tree.b).await.latest_version;

    env.unshare(&owner, tree.f, &[&editor]).await.unwrap();
    env.settle().await;

    let outcome = env
        .upload(&editor, tree.g, "B", Some(tree.b), base, "offline edit")
        .await
        .unwrap();
    let UploadOutcome::Redirected {
        reason, node_id, ..
    } = outcome
    else {
        panic!("expected a redirect, got {:?}", outcome);
    };
    assert_eq!(reason, RedirectReason::UnsharedOrDeleted);
    assert_eq!(env.node(node_id).await.parent, Some(editor_root));
}

#[tokio::test]
async fn test_quota_is_enforced_on_upload() {
    let env = common::setup_with_config(EngineConfig {
        min_batch: 1,
        quota_bytes: Some(10),
        ..Default::default()
    })
    .await;
    let owner = env.user("owner");
    let root = env.root(&owner).await;

    env.put(&owner, root, "first", "12345678").await;
    let result = env.upload(&owner, root, "second", None, None, "12345").await;
    assert!(matches!(
        result,
        Err(EngineError::QuotaExceeded { quota: 10, .. })
    ));
    assert_eq!(env.store.usage(&owner).await.unwrap(), 8);
}

#[tokio::test]
async fn test_new_file_inherits_folder_collaborators() {
    let env = common::setup_test_env().await;
    let owner = env.user("owner");
    let editor = env.user("editor");
    let viewer = env.user("viewer");
    let tree = common::sample_tree(&env, &owner).await;
    env.share(&owner, tree.f, &[&editor], &[&viewer]).await.unwrap();
    env.settle().await;

    let file = env.put(&editor, tree.g, "notes.txt", "x").await;
    let node = env.node(file).await;
    assert_eq!(node.owner, editor);
    assert!(node.is_editor(&owner));
    assert!(node.is_viewer(&viewer));
    assert_eq!(
        env.record(file, &viewer).await.unwrap().virtual_parent,
        Some(tree.g)
    );
}

#[tokio::test]
async fn test_create_folder_requires_write_access() {
    let env = common::setup_test_env().await;
    let owner = env.user("owner");
    let viewer = env.user("viewer");
    let tree = common::sample_tree(&env, &owner).await;
    env.share(&owner, tree.f, &[], &[&viewer]).await.unwrap();
    env.settle().await;

    let result = env
        .engine
        .create_folder(::common::engine::ops::CreateFolderRequest {
            parent_id: tree.f,
            name: "sub".to_string(),
            actor: viewer.clone(),
        })
        .await;
    assert!(matches!(result, Err(EngineError::Forbidden { .. })));

    let sub = env.mkdir(&owner, tree.f, "sub").await;
    assert!(env.node(sub).await.is_viewer(&viewer));
}

#[tokio::test]
async fn test_failed_content_write_leaves_no_node() {
    let env = common::setup_test_env().await;
    let owner = env.user("owner");
    let root = env.root(&owner).await;

    env.storage.reject_writes(true);
    let result = env
        .upload(&owner, root, "draft.txt", None, None, "lost")
        .await;
    assert!(matches!(result, Err(EngineError::Storage(_))));
    assert!(env.store.list_children(root, None).await.unwrap().items.is_empty());
    assert_eq!(env.store.usage(&owner).await.unwrap(), 0);

    // the name is still free once storage recovers
    env.storage.reject_writes(false);
    let id = env.put(&owner, root, "draft.txt", "kept").await;
    let file = env.node(id).await;
    assert_eq!(file.size, 4);
    assert!(file.latest_version.is_some());
}
