//! The collaboration and lifecycle engine.
//!
//! [`Engine`] is the entry point: every root operation applies its own
//! mutation and returns, leaving subtree-wide work to a [`CascadeTask`]
//! picked up by a [`CascadeWorker`]. Errors from the root mutation go back
//! to the caller; errors inside a cascade are logged and never surface.
//!
//! The engine is split into the components that own each concern:
//!
//! - [`ShareGraphManager`]: share / unshare and the reconciliation walk
//! - [`MoveReconciler`]: move and rename
//! - [`LifecycleCascadeManager`]: trash / restore / erase
//! - [`ConflictArbiter`]: uploads, folder creation and conflict copies
//! - [`ReconciliationSweep`]: the repair pass

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::cascade::{
    CascadeDispatcher, CascadeReceiver, CascadeRunner, CascadeTask, CascadeWorker,
};
use crate::external::{Notifier, ObjectStorage, UserDirectory};
use crate::model::{AccessType, UserId};
use crate::store::NodeStore;

mod config;
mod conflict;
mod context;
mod error;
mod lifecycle;
mod mv;
pub mod ops;
mod share;
mod sweep;
mod walk;

pub use config::EngineConfig;
pub use conflict::{conflict_name, ConflictArbiter};
pub use context::EngineContext;
pub use error::{ConflictKind, EngineError};
pub use lifecycle::LifecycleCascadeManager;
pub use mv::MoveReconciler;
pub use share::ShareGraphManager;
pub use sweep::ReconciliationSweep;
pub use walk::CascadeReport;

use ops::{
    CreateFolderRequest, EmptyTrashResponse, LifecycleRequest, ListRequest, ListResponse,
    MoveRequest, NodeSummary, RenameRequest, ShareRequest, ShareResponse, SweepReport,
    UnshareRequest, UnshareResponse, UploadOutcome, UploadRequest,
};
use walk::ChildPager;

#[derive(Debug, Clone)]
pub struct Engine<S: NodeStore> {
    ctx: EngineContext<S>,
    shares: ShareGraphManager<S>,
    mover: MoveReconciler<S>,
    lifecycle: LifecycleCascadeManager<S>,
    arbiter: ConflictArbiter<S>,
    sweeper: ReconciliationSweep<S>,
}

impl<S: NodeStore> Engine<S> {
    /// Build an engine and the receiving end of its cascade channel.
    ///
    /// Nothing runs cascades until the receiver is handed to a worker,
    /// see [`Engine::worker`].
    pub fn new(
        store: S,
        storage: Arc<dyn ObjectStorage>,
        directory: Arc<dyn UserDirectory>,
        notifier: Arc<dyn Notifier>,
        config: EngineConfig,
    ) -> (Self, CascadeReceiver) {
        let (dispatcher, receiver) = CascadeDispatcher::new();
        let ctx = EngineContext {
            store,
            storage,
            directory,
            notifier,
            dispatcher,
            config,
        };

        let shares = ShareGraphManager::new(ctx.clone());
        let mover = MoveReconciler::new(ctx.clone(), shares.clone());
        let lifecycle = LifecycleCascadeManager::new(ctx.clone(), shares.clone());
        let arbiter = ConflictArbiter::new(ctx.clone(), shares.clone());
        let sweeper = ReconciliationSweep::new(ctx.clone(), lifecycle.clone());

        (
            Self {
                ctx,
                shares,
                mover,
                lifecycle,
                arbiter,
                sweeper,
            },
            receiver,
        )
    }

    pub fn worker(&self, receiver: CascadeReceiver) -> CascadeWorker<Self> {
        CascadeWorker::new(self.clone(), receiver, self.ctx.config.cascade_concurrency)
    }

    pub fn context(&self) -> &EngineContext<S> {
        &self.ctx
    }

    pub fn store(&self) -> &S {
        &self.ctx.store
    }

    pub fn dispatcher(&self) -> &CascadeDispatcher {
        &self.ctx.dispatcher
    }

    pub fn config(&self) -> &EngineConfig {
        &self.ctx.config
    }

    /* Root operations */

    pub async fn share(&self, request: ShareRequest) -> Result<ShareResponse, EngineError> {
        self.shares.share(request).await
    }

    pub async fn unshare(&self, request: UnshareRequest) -> Result<UnshareResponse, EngineError> {
        self.shares.unshare(request).await
    }

    pub async fn mv(&self, request: MoveRequest) -> Result<(), EngineError> {
        self.mover.mv(request).await
    }

    pub async fn rename(&self, request: RenameRequest) -> Result<(), EngineError> {
        self.mover.rename(request).await
    }

    pub async fn trash(&self, request: LifecycleRequest) -> Result<(), EngineError> {
        self.lifecycle.trash(request).await
    }

    pub async fn restore(&self, request: LifecycleRequest) -> Result<(), EngineError> {
        self.lifecycle.restore(request).await
    }

    pub async fn erase(&self, request: LifecycleRequest) -> Result<(), EngineError> {
        self.lifecycle.erase(request).await
    }

    pub async fn empty_trash(&self, actor: &UserId) -> Result<EmptyTrashResponse, EngineError> {
        self.lifecycle.empty_trash(actor).await
    }

    pub async fn purge_expired(
        &self,
        owner: &UserId,
        now: DateTime<Utc>,
    ) -> Result<usize, EngineError> {
        self.lifecycle.purge_expired(owner, now).await
    }

    pub async fn upload(&self, request: UploadRequest) -> Result<UploadOutcome, EngineError> {
        self.arbiter.upload(request).await
    }

    pub async fn create_folder(
        &self,
        request: CreateFolderRequest,
    ) -> Result<NodeSummary, EngineError> {
        let folder = self.arbiter.create_folder(request).await?;
        Ok(NodeSummary::from(&folder))
    }

    /// Active children of a folder the actor can read.
    pub async fn list_children(&self, request: ListRequest) -> Result<ListResponse, EngineError> {
        let parent = match request.parent_id {
            Some(id) => self.ctx.active_node(id).await?,
            None => self.ctx.store.root_folder(&request.actor).await?,
        };
        if !parent.is_folder() {
            return Err(EngineError::NotFound(parent.id));
        }
        self.ctx.require(&parent, &request.actor, AccessType::Read)?;

        let children = ChildPager::new(&self.ctx.store, parent.id, self.ctx.config.min_batch)
            .collect()
            .await?
            .iter()
            .filter(|n| n.is_active())
            .map(NodeSummary::from)
            .collect();
        Ok(ListResponse {
            parent_id: parent.id,
            children,
        })
    }

    /// Run the reconciliation sweep inline.
    pub async fn sweep(&self, owner: &UserId) -> Result<SweepReport, EngineError> {
        self.sweeper.sweep(owner).await
    }

    /// Queue the reconciliation sweep on the cascade worker.
    pub fn request_sweep(&self, owner: UserId) -> Result<(), EngineError> {
        self.ctx.dispatch(CascadeTask::Sweep { owner })
    }

    /* Cascades */

    pub async fn run_cascade(&self, task: CascadeTask) {
        match task {
            CascadeTask::SharePropagate {
                folder,
                actor,
                editors,
                viewers,
            } => {
                self.shares
                    .propagate_share(folder, &actor, &editors, &viewers)
                    .await;
            }
            CascadeTask::DesharePropagate { folder, removed } => {
                self.shares.propagate_unshare(folder, &removed).await;
            }
            CascadeTask::MoveReconcile {
                node,
                old_parent,
                new_parent,
            } => {
                self.mover.reconcile(node, &old_parent, &new_parent).await;
            }
            CascadeTask::TrashCascade { root, .. } => {
                self.lifecycle.trash_cascade(root).await;
            }
            CascadeTask::RestoreCascade { root, .. } => {
                self.lifecycle.restore_cascade(root).await;
            }
            CascadeTask::EraseCascade { root, .. } => {
                self.lifecycle.erase_cascade(root).await;
            }
            CascadeTask::Sweep { owner } => {
                if let Err(e) = self.sweeper.sweep(&owner).await {
                    tracing::error!(owner = %owner, error = %e, "sweep failed");
                }
            }
        }
    }
}

#[async_trait]
impl<S: NodeStore> CascadeRunner for Engine<S> {
    async fn run(&self, task: CascadeTask) {
        self.run_cascade(task).await
    }
}
