//! Integration tests for erase, empty trash and retention purges

mod common;

use ::common::prelude::*;
use chrono::Utc;

#[tokio::test]
async fn test_erase_requires_trash_unless_forced() {
    let env = common::setup_test_env().await;
    let owner = env.user("owner");
    let tree = common::sample_tree(&env, &owner).await;

    let result = env
        .engine
        .erase(env.lifecycle(&owner, tree.a, false).await)
        .await;
    assert!(matches!(
        result,
        Err(EngineError::Conflict(ConflictKind::NotTrashed))
    ));
    assert!(env.node(tree.a).await.is_active());

    env.engine
        .erase(env.lifecycle(&owner, tree.a, true).await)
        .await
        .unwrap();
    env.settle().await;
    assert!(!env.exists(tree.a).await);
}

#[tokio::test]
async fn test_erase_removes_subtree_versions_and_usage() {
    let env = common::setup_test_env().await;
    let owner = env.user("owner");
    let viewer = env.user("viewer");
    let tree = common::sample_tree(&env, &owner).await;
    env.share(&owner, tree.f, &[], &[&viewer]).await.unwrap();
    env.settle().await;
    assert_eq!(env.store.usage(&owner).await.unwrap(), 10);
    assert_eq!(env.storage.version_count(tree.b), 1);

    env.engine
        .trash(env.lifecycle(&owner, tree.f, false).await)
        .await
        .unwrap();
    env.settle().await;
    env.engine
        .erase(env.lifecycle(&owner, tree.f, false).await)
        .await
        .unwrap();
    env.settle().await;

    for id in [tree.f, tree.a, tree.g, tree.b] {
        assert!(!env.exists(id).await);
        assert!(env.record(id, &viewer).await.is_none());
    }
    assert_eq!(env.storage.version_count(tree.a), 0);
    assert_eq!(env.storage.version_count(tree.b), 0);
    assert_eq!(env.store.usage(&owner).await.unwrap(), 0);
}

#[tokio::test]
async fn test_empty_trash_erases_every_trash_root() {
    let env = common::setup_test_env().await;
    let owner = env.user("owner");
    let tree = common::sample_tree(&env, &owner).await;

    env.engine
        .trash(env.lifecycle(&owner, tree.a, false).await)
        .await
        .unwrap();
    env.engine
        .trash(env.lifecycle(&owner, tree.g, false).await)
        .await
        .unwrap();
    env.settle().await;

    let response = env.engine.empty_trash(&owner).await.unwrap();
    assert_eq!(response.erased, 2);
    assert_eq!(response.failed, 0);
    env.settle().await;

    for id in [tree.a, tree.g, tree.b] {
        assert!(!env.exists(id).await);
    }
    assert!(env.node(tree.f).await.is_active());

    // nothing left to erase
    let response = env.engine.empty_trash(&owner).await.unwrap();
    assert_eq!(response.erased, 0);
}

#[tokio::test]
async fn test_erase_moves_foreign_nodes_to_their_owner() {
    let env = common::setup_test_env().await;
    let owner = env.user("owner");
    let editor = env.user("editor");
    let tree = common::sample_tree(&env, &owner).await;
    let editor_root = env.root(&editor).await;
    env.share(&owner, tree.f, &[&editor], &[]).await.unwrap();
    env.settle().await;

    let mine = env.put(&editor, tree.g, "mine.txt", "keep me").await;

    env.engine
        .erase(env.lifecycle(&owner, tree.f, true).await)
        .await
        .unwrap();
    env.settle().await;

    assert!(!env.exists(tree.f).await);
    assert!(!env.exists(tree.g).await);

    let node = env.node(mine).await;
    assert_eq!(node.parent, Some(editor_root));
    assert!(node.is_active());
    assert!(!env.can_read(mine, &owner).await);
    assert_eq!(env.storage.version_count(mine), 1);
}

#[tokio::test]
async fn test_erase_leaves_folders_that_still_have_children() {
    let env = common::setup_with_config(EngineConfig {
        min_batch: 1,
        max_depth: 1,
        ..Default::default()
    })
    .await;
    let owner = env.user("owner");
    let tree = common::sample_tree(&env, &owner).await;

    env.engine
        .erase(env.lifecycle(&owner, tree.f, true).await)
        .await
        .unwrap();
    env.settle().await;

    // G sits at the depth cap, so B is never reached
    assert!(!env.exists(tree.a).await);
    assert!(env.exists(tree.b).await);
    assert!(env.node(tree.g).await.erased);
    assert!(env.node(tree.f).await.erased);
}

#[tokio::test]
async fn test_purge_expired_trash() {
    let env = common::setup_with_config(EngineConfig {
        min_batch: 1,
        trash_retention_days: 0,
        ..Default::default()
    })
    .await;
    let owner = env.user("owner");
    let tree = common::sample_tree(&env, &owner).await;

    env.engine
        .trash(env.lifecycle(&owner, tree.g, false).await)
        .await
        .unwrap();
    env.settle().await;

    let purged = env.engine.purge_expired(&owner, Utc::now()).await.unwrap();
    assert_eq!(purged, 1);
    env.settle().await;

    assert!(!env.exists(tree.g).await);
    assert!(!env.exists(tree.b).await);
    assert!(env.exists(tree.a).await);
}

#[tokio::test]
async fn test_purge_keeps_unexpired_trash() {
    let env = common::setup_test_env().await;
    let owner = env.user("owner");
    let tree = common::sample_tree(&env, &owner).await;

    env.engine
        .trash(env.lifecycle(&owner, tree.a, false).await)
        .await
        .unwrap();

    let purged = env.engine.purge_expired(&owner, Utc::now()).await.unwrap();
    assert_eq!(purged, 0);
    assert!(env.node(tree.a).await.is_trashed());
}
