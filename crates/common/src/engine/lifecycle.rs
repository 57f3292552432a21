//! Trash, restore and erase.
//!
//! ```text
//!  Active --trash--> Trashed --erase--> Gone
//!    ^                  |
//!    +-----restore------+
//!  Active --erase(force)--> Gone
//! ```
//!
//! Only the node the user acted on is changed synchronously. A trashed
//! node is re-parented under its owner's root folder and remembers where it
//! came from; its descendants keep their parents and are trashed by the
//! cascade. Erase removes a subtree children-first and never removes a
//! folder that still lists children.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::cascade::{CascadeTask, CollaboratorSnapshot};
use crate::model::{AccessType, Node, NodeId, TrashState, UserId};
use crate::store::{NodeStore, StoreError};

use super::context::EngineContext;
use super::error::{ConflictKind, EngineError};
use super::ops::{EmptyTrashResponse, LifecycleRequest};
use super::share::{Inherited, ShareGraphManager};
use super::walk::{CascadeReport, Walker};

#[derive(Debug, Clone)]
pub struct LifecycleCascadeManager<S: NodeStore> {
    ctx: EngineContext<S>,
    shares: ShareGraphManager<S>,
}

impl<S: NodeStore> LifecycleCascadeManager<S> {
    pub fn new(ctx: EngineContext<S>, shares: ShareGraphManager<S>) -> Self {
        Self { ctx, shares }
    }

    async fn lifecycle_target(&self, request: &LifecycleRequest) -> Result<Node, EngineError> {
        let node = self.ctx.live_node(request.node_id).await?;
        if node.is_folder() != request.is_folder {
            return Err(EngineError::NotFound(node.id));
        }
        if node.is_root() {
            return Err(EngineError::forbidden(AccessType::Manage));
        }
        self.ctx.require_owner(&node, &request.actor)?;
        Ok(node)
    }

    /* Root operations */

    /// Trashing a node that is already trashed succeeds without changing anything.
    pub async fn trash(&self, request: LifecycleRequest) -> Result<(), EngineError> {
        let node = self.lifecycle_target(&request).await?;
        if node.is_trashed() {
            return Ok(());
        }

        let now = Utc::now();
        let state = TrashState {
            trashed_at: now,
            expires_at: now + self.ctx.config.retention(),
            trashed_from: node.parent,
        };
        let root = self.ctx.store.root_folder(&node.owner).await?;

        self.ctx.store.set_deleted(node.id, &state).await?;
        if node.parent != Some(root.id) {
            self.ctx.store.set_parent(node.id, root.id).await?;
        }
        self.ctx.set_records_hidden(node.id, true).await?;

        tracing::info!(
            node_id = %node.id,
            actor = %request.actor,
            expires_at = %state.expires_at,
            "trashed node"
        );

        if node.is_folder() {
            self.ctx.dispatch(CascadeTask::TrashCascade {
                root: node.id,
                actor: request.actor,
            })?;
        }
        Ok(())
    }

    pub async fn restore(&self, request: LifecycleRequest) -> Result<(), EngineError> {
        let node = self.lifecycle_target(&request).await?;
        let Some(trash) = node.trash.clone() else {
            return Err(EngineError::Conflict(ConflictKind::NotTrashed));
        };

        let target = match trash.trashed_from.or(node.parent) {
            Some(parent_id) => match self.ctx.store.get_node(parent_id).await {
                Ok(parent) if !parent.erased => {
                    if parent.is_trashed() {
                        return Err(EngineError::Conflict(ConflictKind::ParentTrashed));
                    }
                    parent.id
                }
                Ok(_) | Err(StoreError::NotFound(_)) => {
                    self.ctx.store.root_folder(&node.owner).await?.id
                }
                Err(e) => return Err(e.into()),
            },
            None => self.ctx.store.root_folder(&node.owner).await?.id,
        };

        self.ctx
            .ensure_name_available(target, &node, &node.name)
            .await?;

        self.ctx.store.set_restored(node.id).await?;
        if node.parent != Some(target) {
            self.ctx.store.set_parent(node.id, target).await?;
        }
        self.ctx.set_records_hidden(node.id, false).await?;

        tracing::info!(node_id = %node.id, parent = %target, "restored node");

        if node.is_folder() {
            self.ctx.dispatch(CascadeTask::RestoreCascade {
                root: node.id,
                actor: request.actor,
            })?;
        }
        Ok(())
    }

    pub async fn erase(&self, request: LifecycleRequest) -> Result<(), EngineError> {
        let node = self.lifecycle_target(&request).await?;
        self.erase_root(node, &request.actor, request.force).await
    }

    /// Erase every trash root the actor owns.
    ///
    /// Each root goes through the same path as a single erase; failures are
    /// logged and counted instead of being returned.
    pub async fn empty_trash(&self, actor: &UserId) -> Result<EmptyTrashResponse, EngineError> {
        let roots = self.trash_roots(actor, |_| true).await?;
        let mut response = EmptyTrashResponse::default();
        for node in roots {
            let id = node.id;
            match self.erase_root(node, actor, false).await {
                Ok(()) => response.erased += 1,
                Err(e) => {
                    tracing::warn!(node_id = %id, error = %e, "failed to erase trash root");
                    response.failed += 1;
                }
            }
        }
        tracing::info!(
            actor = %actor,
            erased = response.erased,
            failed = response.failed,
            "emptied trash"
        );
        Ok(response)
    }

    /// Erase the owner's trash roots whose retention ran out by `now`.
    pub async fn purge_expired(
        &self,
        owner: &UserId,
        now: DateTime<Utc>,
    ) -> Result<usize, EngineError> {
        let expired = self
            .trash_roots(owner, |trash| trash.expires_at <= now)
            .await?;
        let mut purged = 0;
        for node in expired {
            let id = node.id;
            match self.erase_root(node, owner, false).await {
                Ok(()) => purged += 1,
                Err(e) => tracing::warn!(node_id = %id, error = %e, "failed to purge trash root"),
            }
        }
        if purged > 0 {
            tracing::info!(owner = %owner, purged, "purged expired trash");
        }
        Ok(purged)
    }

    async fn trash_roots<F>(&self, owner: &UserId, filter: F) -> Result<Vec<Node>, EngineError>
    where
        F: Fn(&TrashState) -> bool,
    {
        Ok(self
            .ctx
            .owned_nodes(owner)
            .await?
            .into_iter()
            .filter(|n| !n.erased)
            .filter(|n| n.trash.as_ref().is_some_and(|t| t.is_root() && filter(t)))
            .collect())
    }

    pub(crate) async fn erase_root(
        &self,
        node: Node,
        actor: &UserId,
        force: bool,
    ) -> Result<(), EngineError> {
        if !node.is_trashed() && !force {
            return Err(EngineError::Conflict(ConflictKind::NotTrashed));
        }
        self.ctx.store.set_erased(node.id).await?;
        tracing::info!(node_id = %node.id, actor = %actor, force, "erased node");

        self.ctx.dispatch(CascadeTask::EraseCascade {
            root: node.id,
            actor: actor.clone(),
        })
    }

    /* Cascades */

    pub(crate) async fn trash_cascade(&self, root: NodeId) -> CascadeReport {
        let mut walker = Walker::new(&self.ctx, "trash-cascade", root);
        let tree = match self.ctx.live_node(root).await {
            Ok(tree) => tree,
            Err(e) => {
                walker.fail(root, &e);
                return walker.finish();
            }
        };
        let Some(trash) = tree.trash.clone() else {
            tracing::debug!(root = %root, "restored before trash cascade ran");
            return walker.finish();
        };
        let cascaded = TrashState {
            trashed_from: None,
            ..trash
        };
        let removed = tree.collaborator_set();

        walker
            .descend(&tree, 0, Arc::new(Inherited::default()))
            .await;
        while let Some(frame) = walker.pop() {
            let node = frame.node;
            if node.erased {
                continue;
            }
            let id = node.id;

            if node.owner == tree.owner {
                match self.trash_step(&node, &cascaded).await {
                    Ok(()) if node.is_folder() => {
                        walker.descend(&node, frame.depth, frame.state).await
                    }
                    Ok(()) => {}
                    Err(e) => walker.fail(id, &e),
                }
            } else {
                // someone else's node: it stays live, but loses the
                // access it only had through the trashed folder
                match self.shares.reconcile_node(node, &removed, &frame.state).await {
                    Ok(step) if step.node.is_folder() => {
                        let next = step.inherited();
                        walker.descend(&step.node, frame.depth, next).await
                    }
                    Ok(_) => {}
                    Err(e) => walker.fail(id, &e),
                }
            }
        }
        walker.finish()
    }

    async fn trash_step(&self, node: &Node, state: &TrashState) -> Result<(), EngineError> {
        if !node.is_trashed() {
            self.ctx.store.set_deleted(node.id, state).await?;
            self.ctx.set_records_hidden(node.id, true).await?;
        }
        Ok(())
    }

    pub(crate) async fn restore_cascade(&self, root: NodeId) -> CascadeReport {
        let mut walker = Walker::new(&self.ctx, "restore-cascade", root);
        let tree = match self.ctx.live_node(root).await {
            Ok(tree) => tree,
            Err(e) => {
                walker.fail(root, &e);
                return walker.finish();
            }
        };

        walker
            .descend(&tree, 0, Arc::new(CollaboratorSnapshot::of(&tree)))
            .await;
        while let Some(frame) = walker.pop() {
            let mut node = frame.node;
            if node.erased {
                continue;
            }
            let id = node.id;

            if node.owner == tree.owner {
                let cascaded = node.trash.as_ref().is_some_and(|t| !t.is_root());
                if cascaded {
                    if let Err(e) = self.restore_step(id).await {
                        walker.fail(id, &e);
                        continue;
                    }
                }
            } else {
                // someone else's node: hand back what the trash cascade revoked
                let parent = &frame.state;
                if let Err(e) = self
                    .shares
                    .inherit(&mut node, &parent.writers(), &parent.viewers)
                    .await
                {
                    walker.fail(id, &e);
                    continue;
                }
            }

            if node.is_folder() {
                let next = Arc::new(CollaboratorSnapshot::of(&node));
                walker.descend(&node, frame.depth, next).await;
            }
        }
        walker.finish()
    }

    async fn restore_step(&self, id: NodeId) -> Result<(), EngineError> {
        self.ctx.store.set_restored(id).await?;
        self.ctx.set_records_hidden(id, false).await
    }

    /// Post-order removal of a subtree whose root is already marked erased.
    ///
    /// Each folder is visited twice: once to mark it and push its children,
    /// and again once they are all done. Nodes owned by someone else are
    /// moved to their owner's root folder instead of being removed.
    pub(crate) async fn erase_cascade(&self, root: NodeId) -> CascadeReport {
        let mut walker: Walker<'_, S, bool> = Walker::new(&self.ctx, "erase-cascade", root);
        let tree = match self.ctx.store.get_node(root).await {
            Ok(tree) => tree,
            Err(e) => {
                walker.fail(root, &EngineError::from(e));
                return walker.finish();
            }
        };
        let removed = tree.collaborator_set();

        walker.push(tree.clone(), 0, false);
        while let Some(frame) = walker.pop() {
            let node = frame.node;
            let id = node.id;

            let result = if node.owner != tree.owner {
                self.rescue(node, &removed).await
            } else if !node.is_folder() {
                self.erase_file(node).await
            } else if !frame.state {
                if let Err(e) = self.mark_erased(&node).await {
                    walker.fail(id, &e);
                    continue;
                }
                walker.push(node.clone(), frame.depth, true);
                walker.descend(&node, frame.depth, false).await;
                continue;
            } else {
                match self.remove_folder(&node).await {
                    Ok(true) => Ok(()),
                    Ok(false) => {
                        walker.fail(id, &"folder still lists children, left in place");
                        continue;
                    }
                    Err(e) => Err(e),
                }
            };

            if let Err(e) = result {
                walker.fail(id, &e);
            }
        }
        walker.finish()
    }

    async fn mark_erased(&self, node: &Node) -> Result<(), EngineError> {
        if !node.erased {
            self.ctx.store.set_erased(node.id).await?;
        }
        Ok(())
    }

    async fn erase_file(&self, node: Node) -> Result<(), EngineError> {
        self.mark_erased(&node).await?;
        self.ctx.storage.unlink(node.id).await?;
        self.ctx.storage.remove_versions(node.id).await?;
        self.drop_records(node.id).await?;
        self.ctx.store.remove_node(node.id).await?;
        self.ctx.adjust_usage(&node.owner, 0, node.size).await?;
        Ok(())
    }

    /// Returns false when the folder still has children.
    async fn remove_folder(&self, node: &Node) -> Result<bool, EngineError> {
        let page = self.ctx.store.list_children(node.id, None).await?;
        if !page.items.is_empty() || page.next.is_some() {
            return Ok(false);
        }
        self.drop_records(node.id).await?;
        self.ctx.store.remove_node(node.id).await?;
        Ok(true)
    }

    async fn drop_records(&self, node: NodeId) -> Result<(), EngineError> {
        let collaborators: BTreeSet<UserId> = self
            .ctx
            .store
            .list_share_records(node)
            .await?
            .into_iter()
            .map(|r| r.collaborator)
            .collect();
        self.shares.remove_share_records(node, &collaborators).await
    }

    async fn rescue(&self, node: Node, removed: &BTreeSet<UserId>) -> Result<(), EngineError> {
        if node.erased {
            return Ok(());
        }
        let home = self.ctx.store.root_folder(&node.owner).await?;
        let step = self
            .shares
            .reconcile_node(node, removed, &Inherited::default())
            .await?;
        self.ctx.store.set_parent(step.node.id, home.id).await?;
        tracing::info!(
            node_id = %step.node.id,
            owner = %step.node.owner,
            "moved node out of erased folder into its owner's root"
        );

        if step.node.is_folder() && !step.revoked.is_empty() {
            self.ctx.dispatch(CascadeTask::DesharePropagate {
                folder: step.node.id,
                removed: step.revoked,
            })?;
        }
        Ok(())
    }
}
