//! Shared fixtures for engine integration tests
#![allow(dead_code)]

use std::sync::Arc;

use bytes::Bytes;
use common::engine::ops::{
    CreateFolderRequest, LifecycleRequest, ShareRequest, ShareResponse, UnshareRequest,
    UnshareResponse, UploadOutcome, UploadRequest,
};
use common::external::{LogNotifier, MemoryObjectStorage, MemoryUserDirectory};
use common::model::AccessType;
use common::prelude::*;
use common::store::MemoryNodeStore;

pub struct TestEnv {
    pub engine: Engine<MemoryNodeStore>,
    pub store: MemoryNodeStore,
    pub storage: MemoryObjectStorage,
    pub directory: MemoryUserDirectory,
    _worker: tokio::task::JoinHandle<()>,
}

/// Engine over a memory store with tiny pages, so every cascade has to
///  stitch listings together.
pub async fn setup_test_env() -> TestEnv {
    setup_with_config(EngineConfig {
        min_batch: 1,
        ..Default::default()
    })
    .await
}

pub async fn setup_with_config(config: EngineConfig) -> TestEnv {
    let store = MemoryNodeStore::with_page_size(2);
    let storage = MemoryObjectStorage::new();
    let directory = MemoryUserDirectory::new();

    let (engine, receiver) = Engine::new(
        store.clone(),
        Arc::new(storage.clone()),
        Arc::new(directory.clone()),
        Arc::new(LogNotifier),
        config,
    );
    let worker = engine.worker(receiver).spawn(None);

    TestEnv {
        engine,
        store,
        storage,
        directory,
        _worker: worker,
    }
}

impl TestEnv {
    pub fn user(&self, name: &str) -> UserId {
        let user = UserId::from(name);
        self.directory.register(&user, &[]);
        user
    }

    /// Wait for every cascade, including ones dispatched by other cascades.
    pub async fn settle(&self) {
        self.engine.dispatcher().wait_idle().await;
    }

    pub async fn root(&self, user: &UserId) -> NodeId {
        self.store.root_folder(user).await.unwrap().id
    }

    pub async fn node(&self, id: NodeId) -> Node {
        self.store.get_node(id).await.unwrap()
    }

    pub async fn exists(&self, id: NodeId) -> bool {
        self.store.get_node(id).await.is_ok()
    }

    pub async fn record(&self, id: NodeId, user: &UserId) -> Option<ShareRecord> {
        self.store.get_share_record(id, user).await.unwrap()
    }

    pub async fn can_read(&self, id: NodeId, user: &UserId) -> bool {
        AccessType::Read.permits(&self.node(id).await, user)
    }

    pub async fn mkdir(&self, actor: &UserId, parent: NodeId, name: &str) -> NodeId {
        self.engine
            .create_folder(CreateFolderRequest {
                parent_id: parent,
                name: name.to_string(),
                actor: actor.clone(),
            })
            .await
            .unwrap()
            .id
    }

    pub async fn upload(
        &self,
        actor: &UserId,
        parent: NodeId,
        name: &str,
        file_id: Option<NodeId>,
        base_change_id: Option<uuid::Uuid>,
        content: &str,
    ) -> Result<UploadOutcome, EngineError> {
        self.engine
            .upload(UploadRequest {
                parent_id: parent,
                name: name.to_string(),
                actor: actor.clone(),
                file_id,
                base_change_id,
                content: Bytes::from(content.to_string()),
            })
            .await
    }

    pub async fn put(&self, actor: &UserId, parent: NodeId, name: &str, content: &str) -> NodeId {
        self.upload(actor, parent, name, None, None, content)
            .await
            .unwrap()
            .node_id()
    }

    pub async fn share(
        &self,
        actor: &UserId,
        id: NodeId,
        editors: &[&UserId],
        viewers: &[&UserId],
    ) -> Result<ShareResponse, EngineError> {
        let is_folder = self.node(id).await.is_folder();
        self.engine
            .share(ShareRequest {
                node_id: id,
                is_folder,
                actor: actor.clone(),
                editors_to_add: editors.iter().map(|u| u.to_string()).collect(),
                viewers_to_add: viewers.iter().map(|u| u.to_string()).collect(),
                custom_permissions: None,
            })
            .await
    }

    pub async fn unshare(
        &self,
        actor: &UserId,
        id: NodeId,
        users: &[&UserId],
    ) -> Result<UnshareResponse, EngineError> {
        let is_folder = self.node(id).await.is_folder();
        self.engine
            .unshare(UnshareRequest {
                node_id: id,
                is_folder,
                actor: actor.clone(),
                collaborators_to_remove: users.iter().map(|u| u.to_string()).collect(),
            })
            .await
    }

    pub async fn lifecycle(&self, actor: &UserId, id: NodeId, force: bool) -> LifecycleRequest {
        LifecycleRequest {
            node_id: id,
            is_folder: self.node(id).await.is_folder(),
            actor: actor.clone(),
            force,
        }
    }
}

/// `root(owner) / F { A, G { B } }`, the tree the sharing examples use.
pub struct SampleTree {
    pub f: NodeId,
    pub a: NodeId,
    pub g: NodeId,
    pub b: NodeId,
}

pub async fn sample_tree(env: &TestEnv, owner: &UserId) -> SampleTree {
    let root = env.root(owner).await;
    let f = env.mkdir(owner, root, "F").await;
    let a = env.put(owner, f, "A", "alpha").await;
    let g = env.mkdir(owner, f, "G").await;
    let b = env.put(owner, g, "B", "bravo").await;
    SampleTree { f, a, g, b }
}
