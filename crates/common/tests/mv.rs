//! Integration tests for move and rename

mod common;

use ::common::engine::ops::{MoveRequest, RenameRequest};
use ::common::prelude::*;

fn move_request(node: &Node, new_parent: NodeId, actor: &UserId) -> MoveRequest {
    MoveRequest {
        node_id: node.id,
        is_folder: node.is_folder(),
        new_parent_id: new_parent,
        actor: actor.clone(),
    }
}

fn rename_request(node: NodeId, name: &str, actor: &UserId) -> RenameRequest {
    RenameRequest {
        node_id: node,
        name: name.to_string(),
        actor: actor.clone(),
    }
}

#[tokio::test]
async fn test_move_into_descendant_is_cyclic() {
    let env = common::setup_test_env().await;
    let owner = env.user("owner");
    let viewer = env.user("viewer");
    let tree = common::sample_tree(&env, &owner).await;
    env.share(&owner, tree.f, &[], &[&viewer]).await.unwrap();
    env.settle().await;

    let f = env.node(tree.f).await;
    let records_before = env.store.list_share_records(tree.g).await.unwrap();

    let result = env.engine.mv(move_request(&f, tree.g, &owner)).await;
    assert!(matches!(
        result,
        Err(EngineError::Conflict(ConflictKind::CyclicMove))
    ));

    let result = env.engine.mv(move_request(&f, tree.f, &owner)).await;
    assert!(matches!(
        result,
        Err(EngineError::Conflict(ConflictKind::CyclicMove))
    ));

    env.settle().await;
    assert_eq!(env.node(tree.f).await, f);
    assert_eq!(env.node(tree.g).await.parent, Some(tree.f));
    assert_eq!(
        env.store.list_share_records(tree.g).await.unwrap(),
        records_before
    );
}

#[tokio::test]
async fn test_move_rejects_duplicate_name() {
    let env = common::setup_test_env().await;
    let owner = env.user("owner");
    let tree = common::sample_tree(&env, &owner).await;
    env.put(&owner, tree.g, "A", "other").await;

    let a = env.node(tree.a).await;
    let result = env.engine.mv(move_request(&a, tree.g, &owner)).await;
    assert!(matches!(
        result,
        Err(EngineError::Conflict(ConflictKind::DuplicateName))
    ));
    assert_eq!(env.node(tree.a).await.parent, Some(tree.f));
}

#[tokio::test]
async fn test_move_rediffs_collaborators() {
    let env = common::setup_test_env().await;
    let owner = env.user("owner");
    let old_viewer = env.user("old");
    let new_viewer = env.user("new");
    let root = env.root(&owner).await;

    let from = env.mkdir(&owner, root, "from").await;
    let to = env.mkdir(&owner, root, "to").await;
    let moved = env.mkdir(&owner, from, "moved").await;
    let inner = env.put(&owner, moved, "inner.txt", "x").await;

    env.share(&owner, from, &[], &[&old_viewer]).await.unwrap();
    env.share(&owner, to, &[], &[&new_viewer]).await.unwrap();
    env.settle().await;
    assert!(env.can_read(inner, &old_viewer).await);

    let node = env.node(moved).await;
    env.engine.mv(move_request(&node, to, &owner)).await.unwrap();
    env.settle().await;

    for id in [moved, inner] {
        assert!(!env.can_read(id, &old_viewer).await);
        assert!(env.record(id, &old_viewer).await.is_none());
        assert!(env.can_read(id, &new_viewer).await);
    }
    assert_eq!(
        env.record(moved, &new_viewer).await.unwrap().virtual_parent,
        Some(to)
    );
    assert_eq!(
        env.record(inner, &new_viewer).await.unwrap().virtual_parent,
        Some(moved)
    );
}

#[tokio::test]
async fn test_move_keeps_direct_collaborator() {
    let env = common::setup_test_env().await;
    let owner = env.user("owner");
    let direct = env.user("direct");
    let root = env.root(&owner).await;

    let from = env.mkdir(&owner, root, "from").await;
    let to = env.mkdir(&owner, root, "to").await;
    let file = env.put(&owner, from, "doc.txt", "x").await;

    env.share(&owner, from, &[], &[&direct]).await.unwrap();
    env.share(&owner, file, &[&direct], &[]).await.unwrap();
    env.settle().await;

    let node = env.node(file).await;
    env.engine.mv(move_request(&node, to, &owner)).await.unwrap();
    env.settle().await;

    assert!(env.node(file).await.is_editor(&direct));
    let record = env.record(file, &direct).await.unwrap();
    assert!(record.direct);
    // no longer under `from`, so it surfaces at the top of their view
    assert_eq!(record.virtual_parent, None);
}

#[tokio::test]
async fn test_move_out_of_shared_folder_into_own_root() {
    let env = common::setup_test_env().await;
    let owner = env.user("owner");
    let editor = env.user("editor");
    let owner_root = env.root(&owner).await;
    let editor_root = env.root(&editor).await;

    let shared = env.mkdir(&owner, owner_root, "shared").await;
    env.share(&owner, shared, &[&editor], &[]).await.unwrap();
    env.settle().await;

    // the editor adds a file of their own, then takes it home
    let mine = env.put(&editor, shared, "mine.txt", "x").await;
    assert!(env.node(mine).await.is_editor(&owner));

    let node = env.node(mine).await;
    env.engine
        .mv(move_request(&node, editor_root, &editor))
        .await
        .unwrap();
    env.settle().await;

    let node = env.node(mine).await;
    assert_eq!(node.parent, Some(editor_root));
    assert!(!node.is_editor(&owner));
    assert!(env.record(mine, &owner).await.is_none());
}

#[tokio::test]
async fn test_move_into_own_root_requires_ownership() {
    let env = common::setup_test_env().await;
    let owner = env.user("owner");
    let editor = env.user("editor");
    let tree = common::sample_tree(&env, &owner).await;
    let editor_root = env.root(&editor).await;

    env.share(&owner, tree.f, &[&editor], &[]).await.unwrap();
    env.settle().await;

    let a = env.node(tree.a).await;
    let result = env.engine.mv(move_request(&a, editor_root, &editor)).await;
    assert!(matches!(result, Err(EngineError::Forbidden { .. })));
}

#[tokio::test]
async fn test_viewer_cannot_move() {
    let env = common::setup_test_env().await;
    let owner = env.user("owner");
    let viewer = env.user("viewer");
    let tree = common::sample_tree(&env, &owner).await;
    env.share(&owner, tree.f, &[], &[&viewer]).await.unwrap();
    env.settle().await;

    let b = env.node(tree.b).await;
    let result = env.engine.mv(move_request(&b, tree.f, &viewer)).await;
    assert!(matches!(result, Err(EngineError::Forbidden { .. })));
    assert_eq!(env.node(tree.b).await.parent, Some(tree.g));
}

#[tokio::test]
async fn test_rename() {
    let env = common::setup_test_env().await;
    let owner = env.user("owner");
    let tree = common::sample_tree(&env, &owner).await;

    env.engine
        .rename(rename_request(tree.a, "renamed", &owner))
        .await
        .unwrap();
    assert_eq!(env.node(tree.a).await.name, "renamed");

    // a folder and a file may share a name
    env.engine
        .rename(rename_request(tree.a, "G", &owner))
        .await
        .unwrap();

    let other = env.put(&owner, tree.f, "other", "x").await;
    let result = env.engine.rename(rename_request(other, "G", &owner)).await;
    assert!(matches!(
        result,
        Err(EngineError::Conflict(ConflictKind::DuplicateName))
    ));
}

#[tokio::test]
async fn test_rename_rejects_invalid_names() {
    let env = common::setup_test_env().await;
    let owner = env.user("owner");
    let tree = common::sample_tree(&env, &owner).await;

    for name in ["", "  ", "a/b"] {
        let result = env.engine.rename(rename_request(tree.a, name, &owner)).await;
        assert!(matches!(result, Err(EngineError::InvalidName(_))));
    }
}
