//! Integration tests for unshare and the reconciliation walk

mod common;

use ::common::prelude::*;

#[tokio::test]
async fn test_unshare_revokes_whole_subtree() {
    let env = common::setup_test_env().await;
    let owner = env.user("owner");
    let viewer = env.user("viewer");
    let tree = common::sample_tree(&env, &owner).await;

    env.share(&owner, tree.f, &[], &[&viewer]).await.unwrap();
    env.settle().await;

    let response = env.unshare(&owner, tree.f, &[&viewer]).await.unwrap();
    assert_eq!(response.affected_collaborators, vec![viewer.clone()]);
    env.settle().await;

    for id in [tree.f, tree.a, tree.g, tree.b] {
        assert!(!env.can_read(id, &viewer).await);
        assert!(env.record(id, &viewer).await.is_none());
    }
}

#[tokio::test]
async fn test_unshare_keeps_independent_direct_share() {
    let env = common::setup_test_env().await;
    let owner = env.user("owner");
    let viewer = env.user("viewer");
    let tree = common::sample_tree(&env, &owner).await;

    // G is shared on its own before F is
    env.share(&owner, tree.g, &[], &[&viewer]).await.unwrap();
    env.settle().await;
    env.share(&owner, tree.f, &[], &[&viewer]).await.unwrap();
    env.settle().await;

    env.unshare(&owner, tree.f, &[&viewer]).await.unwrap();
    env.settle().await;

    assert!(!env.can_read(tree.f, &viewer).await);
    assert!(!env.can_read(tree.a, &viewer).await);
    assert!(env.record(tree.f, &viewer).await.is_none());
    assert!(env.record(tree.a, &viewer).await.is_none());

    assert!(env.can_read(tree.g, &viewer).await);
    assert!(env.can_read(tree.b, &viewer).await);
    let g = env.record(tree.g, &viewer).await.unwrap();
    assert!(g.direct);
    assert_eq!(g.virtual_parent, None);
    assert_eq!(
        env.record(tree.b, &viewer).await.unwrap().virtual_parent,
        Some(tree.g)
    );
}

#[tokio::test]
async fn test_direct_share_after_folder_share_surfaces_node() {
    let env = common::setup_test_env().await;
    let owner = env.user("owner");
    let viewer = env.user("viewer");
    let tree = common::sample_tree(&env, &owner).await;

    env.share(&owner, tree.f, &[], &[&viewer]).await.unwrap();
    env.settle().await;
    // upgrades the inherited record on G without touching its parent
    env.share(&owner, tree.g, &[], &[&viewer]).await.unwrap();
    env.settle().await;
    assert!(env.record(tree.g, &viewer).await.unwrap().direct);

    env.unshare(&owner, tree.f, &[&viewer]).await.unwrap();
    env.settle().await;

    let g = env.record(tree.g, &viewer).await.unwrap();
    assert_eq!(g.virtual_parent, None);
    assert!(env.can_read(tree.b, &viewer).await);
    assert!(!env.can_read(tree.a, &viewer).await);
}

#[tokio::test]
async fn test_unshare_leaves_other_collaborators() {
    let env = common::setup_test_env().await;
    let owner = env.user("owner");
    let stays = env.user("stays");
    let goes = env.user("goes");
    let tree = common::sample_tree(&env, &owner).await;

    env.share(&owner, tree.f, &[&stays], &[&goes]).await.unwrap();
    env.settle().await;
    env.unshare(&owner, tree.f, &[&goes]).await.unwrap();
    env.settle().await;

    assert!(env.node(tree.b).await.is_editor(&stays));
    assert!(env.record(tree.b, &stays).await.is_some());
    assert!(!env.can_read(tree.b, &goes).await);
}

#[tokio::test]
async fn test_collaborator_can_leave_but_not_remove_others() {
    let env = common::setup_test_env().await;
    let owner = env.user("owner");
    let first = env.user("first");
    let second = env.user("second");
    let tree = common::sample_tree(&env, &owner).await;

    env.share(&owner, tree.f, &[], &[&first, &second]).await.unwrap();
    env.settle().await;

    let result = env.unshare(&first, tree.f, &[&second]).await;
    assert!(matches!(result, Err(EngineError::Forbidden { .. })));

    env.unshare(&first, tree.f, &[&first]).await.unwrap();
    env.settle().await;
    assert!(!env.can_read(tree.b, &first).await);
    assert!(env.can_read(tree.b, &second).await);
}

#[tokio::test]
async fn test_unshare_owner_is_ignored() {
    let env = common::setup_test_env().await;
    let owner = env.user("owner");
    let tree = common::sample_tree(&env, &owner).await;

    let response = env.unshare(&owner, tree.f, &[&owner]).await.unwrap();
    env.settle().await;

    assert!(response.affected_collaborators.is_empty());
    assert!(env.can_read(tree.b, &owner).await);
}

#[tokio::test]
async fn test_unshare_propagation_stops_at_max_depth() {
    let env = common::setup_with_config(EngineConfig {
        min_batch: 1,
        max_depth: 2,
        ..Default::default()
    })
    .await;
    let owner = env.user("owner");
    let viewer = env.user("viewer");
    let root = env.root(&owner).await;
    let f = env.mkdir(&owner, root, "F").await;
    let g = env.mkdir(&owner, f, "G").await;
    let h = env.mkdir(&owner, g, "H").await;
    env.share(&owner, f, &[], &[&viewer]).await.unwrap();
    env.settle().await;

    // created after the share, so it inherits the viewer from H
    let c = env.put(&owner, h, "C", "deep").await;
    assert!(env.can_read(c, &viewer).await);

    env.unshare(&owner, f, &[&viewer]).await.unwrap();
    env.settle().await;

    assert!(!env.can_read(g, &viewer).await);
    assert!(!env.can_read(h, &viewer).await);
    // past the cap, untouched
    assert!(env.can_read(c, &viewer).await);
    assert!(env.record(c, &viewer).await.is_some());
}
