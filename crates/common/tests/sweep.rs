//! Integration tests for the reconciliation sweep

mod common;

use ::common::prelude::*;

#[tokio::test]
async fn test_sweep_recomputes_usage() {
    let env = common::setup_test_env().await;
    let owner = env.user("owner");
    common::sample_tree(&env, &owner).await;
    env.store.set_usage(&owner, 999).await.unwrap();

    let report = env.engine.sweep(&owner).await.unwrap();
    assert_eq!(report.orphans_erased, 0);
    assert_eq!(report.usage_bytes, 10);
    // root, F, A, G and B
    assert_eq!(report.scanned, 5);
    assert_eq!(env.store.usage(&owner).await.unwrap(), 10);
}

#[tokio::test]
async fn test_sweep_erases_orphans() {
    let env = common::setup_test_env().await;
    let owner = env.user("owner");
    let tree = common::sample_tree(&env, &owner).await;

    let stray = Node::file(owner.clone(), "stray", uuid::Uuid::new_v4());
    env.store.put_node(&stray).await.unwrap();

    let report = env.engine.sweep(&owner).await.unwrap();
    assert_eq!(report.orphans_erased, 1);
    env.settle().await;

    assert!(!env.exists(stray.id).await);
    assert!(env.node(tree.b).await.is_active());
}

#[tokio::test]
async fn test_sweep_finishes_interrupted_erase() {
    let env = common::setup_test_env().await;
    let owner = env.user("owner");
    let tree = common::sample_tree(&env, &owner).await;

    // marked erased, but the cascade never ran
    env.store.set_erased(tree.g).await.unwrap();

    let report = env.engine.sweep(&owner).await.unwrap();
    assert_eq!(report.usage_bytes, 5);
    assert!(!env.exists(tree.g).await);
    assert!(!env.exists(tree.b).await);
    assert_eq!(env.storage.version_count(tree.b), 0);
    assert!(env.exists(tree.a).await);
}

#[tokio::test]
async fn test_requested_sweep_runs_on_the_worker() {
    let env = common::setup_test_env().await;
    let owner = env.user("owner");
    common::sample_tree(&env, &owner).await;
    env.store.set_usage(&owner, 0).await.unwrap();

    env.engine.request_sweep(owner.clone()).unwrap();
    env.settle().await;

    assert_eq!(env.store.usage(&owner).await.unwrap(), 10);
}
