//! Collaborator-set diffs for share and unshare, and the reconciliation
//! walk that keeps descendants consistent afterwards.
//!
//! # Reconciliation
//!
//! Revoking a set of users from a subtree is a top-down walk. At each
//! descendant `d` a removed user is *kept* if any of these hold:
//!
//! - they own `d`
//! - they hold a direct share record on `d`
//! - they were kept on an ancestor of `d` below the subtree root
//!
//! Everyone else in the removed set loses their role on `d` and their
//! share record. Move, trash and erase all revoke through this same rule;
//! they only differ in which users they pass as removed.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::cascade::CascadeTask;
use crate::model::{AccessType, CollaboratorDiff, Node, NodeId, ShareRecord, UserId};
use crate::store::NodeStore;

use super::context::EngineContext;
use super::error::EngineError;
use super::ops::{ShareRequest, ShareResponse, UnshareRequest, UnshareResponse};
use super::walk::{CascadeReport, Walker};

/// Users kept above a node, and users revoked from its parent.
#[derive(Debug, Clone, Default)]
pub(crate) struct Inherited {
    pub keep: BTreeSet<UserId>,
    pub revoked: BTreeSet<UserId>,
}

/// What one reconciliation step did to a node.
#[derive(Debug)]
pub(crate) struct Revocation {
    pub node: Node,
    pub kept: BTreeSet<UserId>,
    pub revoked: BTreeSet<UserId>,
}

impl Revocation {
    pub fn inherited(&self) -> Arc<Inherited> {
        Arc::new(Inherited {
            keep: self.kept.clone(),
            revoked: self.revoked.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ShareGraphManager<S: NodeStore> {
    ctx: EngineContext<S>,
}

impl<S: NodeStore> ShareGraphManager<S> {
    pub fn new(ctx: EngineContext<S>) -> Self {
        Self { ctx }
    }

    /* Root operations */

    pub async fn share(&self, request: ShareRequest) -> Result<ShareResponse, EngineError> {
        let mut node = self
            .ctx
            .active_node_of_kind(request.node_id, request.is_folder)
            .await?;
        if node.is_root() {
            return Err(EngineError::forbidden(AccessType::Manage));
        }
        self.ctx.require(&node, &request.actor, AccessType::Manage)?;

        if let Some(custom) = &request.custom_permissions {
            if custom.editors_can_share != node.editors_can_share {
                self.ctx.require_owner(&node, &request.actor)?;
                self.ctx
                    .store
                    .set_editors_can_share(node.id, custom.editors_can_share)
                    .await?;
                node.editors_can_share = custom.editors_can_share;
            }
        }

        let (editors, mut unresolved) = self.ctx.resolve_users(&request.editors_to_add).await;
        let (viewers, unresolved_viewers) = self.ctx.resolve_users(&request.viewers_to_add).await;
        unresolved.extend(unresolved_viewers);

        let diff = self.add_collaborators(&mut node, &editors, &viewers).await?;

        let requested: BTreeSet<UserId> = editors.union(&viewers).cloned().collect();
        self.create_share_records(&node, &requested, None, true)
            .await?;

        tracing::info!(
            node_id = %node.id,
            actor = %request.actor,
            added = diff.all().len(),
            unresolved = unresolved.len(),
            "shared node"
        );

        if !diff.is_empty() {
            self.ctx
                .notifier
                .shared(&node, &request.actor, &diff.all())
                .await;
            if node.is_folder() {
                self.ctx.dispatch(CascadeTask::SharePropagate {
                    folder: node.id,
                    actor: request.actor.clone(),
                    editors: diff.editors.clone(),
                    viewers: diff.viewers.clone(),
                })?;
            }
        }

        Ok(ShareResponse {
            affected_collaborators: diff.all().into_iter().collect(),
            unresolved_identifiers: unresolved,
        })
    }

    pub async fn unshare(&self, request: UnshareRequest) -> Result<UnshareResponse, EngineError> {
        let mut node = self
            .ctx
            .active_node_of_kind(request.node_id, request.is_folder)
            .await?;

        let (mut removed, unresolved) = self
            .ctx
            .resolve_users(&request.collaborators_to_remove)
            .await;
        if !unresolved.is_empty() {
            tracing::debug!(node_id = %node.id, ?unresolved, "ignoring unknown collaborators");
        }
        removed.remove(&node.owner);

        let leaving_self =
            removed.len() == 1 && removed.contains(&request.actor);
        if !leaving_self {
            self.ctx.require(&node, &request.actor, AccessType::Manage)?;
        }

        let revoked = node.revoke_collaborators(&removed);
        if !revoked.is_empty() {
            self.ctx
                .store
                .update_collaborators(node.id, &node.editors, &node.viewers)
                .await?;
        }
        self.remove_share_records(node.id, &removed).await?;

        tracing::info!(
            node_id = %node.id,
            actor = %request.actor,
            revoked = revoked.len(),
            "unshared node"
        );

        if node.is_folder() && !removed.is_empty() {
            self.ctx.dispatch(CascadeTask::DesharePropagate {
                folder: node.id,
                removed,
            })?;
        }

        Ok(UnshareResponse {
            affected_collaborators: revoked.into_iter().collect(),
        })
    }

    /* Point-wise primitives */

    /// Merge collaborators into a node and persist the result if anything changed.
    pub async fn add_collaborators(
        &self,
        node: &mut Node,
        editors: &BTreeSet<UserId>,
        viewers: &BTreeSet<UserId>,
    ) -> Result<CollaboratorDiff, EngineError> {
        let diff = node.add_collaborators(editors, viewers);
        if !diff.is_empty() {
            self.ctx
                .store
                .update_collaborators(node.id, &node.editors, &node.viewers)
                .await?;
        }
        Ok(diff)
    }

    /// Make sure each collaborator has a record on `node`.
    ///
    /// Existing records keep their virtual parent. A direct grant upgrades an
    /// inherited record to direct; an inherited grant never downgrades one.
    pub async fn create_share_records(
        &self,
        node: &Node,
        collaborators: &BTreeSet<UserId>,
        virtual_parent: Option<NodeId>,
        direct: bool,
    ) -> Result<(), EngineError> {
        for user in collaborators {
            if *user == node.owner {
                continue;
            }
            match self.ctx.store.get_share_record(node.id, user).await? {
                None => {
                    let mut record = if direct {
                        ShareRecord::direct(node.id, user.clone(), virtual_parent)
                    } else {
                        ShareRecord::inherited(node.id, user.clone(), virtual_parent)
                    };
                    record.hidden = node.is_trashed();
                    self.ctx.store.add_share_record(&record).await?;
                }
                Some(existing) if direct && !existing.direct => {
                    self.ctx
                        .store
                        .add_share_record(&ShareRecord {
                            direct: true,
                            ..existing
                        })
                        .await?;
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    pub async fn remove_share_records(
        &self,
        node: NodeId,
        collaborators: &BTreeSet<UserId>,
    ) -> Result<(), EngineError> {
        for user in collaborators {
            self.ctx.store.remove_share_record(node, user).await?;
        }
        Ok(())
    }

    /// Grant editors and viewers on a node with inherited records under its
    ///  canonical parent.
    pub(crate) async fn inherit(
        &self,
        node: &mut Node,
        editors: &BTreeSet<UserId>,
        viewers: &BTreeSet<UserId>,
    ) -> Result<CollaboratorDiff, EngineError> {
        let diff = self.add_collaborators(node, editors, viewers).await?;
        let granted: BTreeSet<UserId> = editors.union(viewers).cloned().collect();
        self.create_share_records(node, &granted, node.parent, false)
            .await?;
        Ok(diff)
    }

    /// One reconciliation step on a single node. See the module docs.
    pub(crate) async fn reconcile_node(
        &self,
        node: Node,
        removed: &BTreeSet<UserId>,
        inherited: &Inherited,
    ) -> Result<Revocation, EngineError> {
        let records = self.ctx.store.list_share_records(node.id).await?;

        let mut kept: BTreeSet<UserId> = inherited.keep.intersection(removed).cloned().collect();
        for record in &records {
            if record.direct && removed.contains(&record.collaborator) {
                kept.insert(record.collaborator.clone());
            }
        }
        if removed.contains(&node.owner) {
            kept.insert(node.owner.clone());
        }
        let revoked: BTreeSet<UserId> = removed.difference(&kept).cloned().collect();

        let mut node = node;
        if !node.revoke_collaborators(&revoked).is_empty() {
            self.ctx
                .store
                .update_collaborators(node.id, &node.editors, &node.viewers)
                .await?;
        }

        for record in records {
            if revoked.contains(&record.collaborator) {
                self.ctx
                    .store
                    .remove_share_record(node.id, &record.collaborator)
                    .await?;
            } else if record.direct
                && inherited.revoked.contains(&record.collaborator)
                && record.virtual_parent.is_some()
                && record.virtual_parent == node.parent
            {
                // parent is gone from their view; surface the node at the top
                self.ctx
                    .store
                    .add_share_record(&ShareRecord {
                        virtual_parent: None,
                        ..record
                    })
                    .await?;
            }
        }

        Ok(Revocation {
            node,
            kept,
            revoked,
        })
    }

    /* Cascades */

    /// Copy added collaborators onto every descendant the actor can reach.
    pub(crate) async fn propagate_share(
        &self,
        folder: NodeId,
        actor: &UserId,
        editors: &BTreeSet<UserId>,
        viewers: &BTreeSet<UserId>,
    ) -> CascadeReport {
        let mut walker: Walker<'_, S, ()> = Walker::new(&self.ctx, "share-propagate", folder);
        match self.ctx.live_node(folder).await {
            Ok(root) => walker.descend(&root, 0, ()).await,
            Err(e) => walker.fail(folder, &e),
        }

        while let Some(frame) = walker.pop() {
            let mut child = frame.node;
            if child.erased {
                continue;
            }
            match self.share_step(&mut child, actor, editors, viewers).await {
                Ok(true) if child.is_folder() => walker.descend(&child, frame.depth, ()).await,
                Ok(_) => {}
                Err(e) => walker.fail(child.id, &e),
            }
        }
        walker.finish()
    }

    /// Returns whether the child was reachable by the actor.
    async fn share_step(
        &self,
        child: &mut Node,
        actor: &UserId,
        editors: &BTreeSet<UserId>,
        viewers: &BTreeSet<UserId>,
    ) -> Result<bool, EngineError> {
        let reachable = child.owner == *actor
            || self
                .ctx
                .store
                .get_share_record(child.id, actor)
                .await?
                .is_some();
        if !reachable {
            return Ok(false);
        }
        self.inherit(child, editors, viewers).await?;
        Ok(true)
    }

    /// Revoke `removed` from every descendant of `folder` per the
    ///  reconciliation rule.
    pub(crate) async fn propagate_unshare(
        &self,
        folder: NodeId,
        removed: &BTreeSet<UserId>,
    ) -> CascadeReport {
        let start = Arc::new(Inherited {
            keep: BTreeSet::new(),
            revoked: removed.clone(),
        });
        let mut walker = Walker::new(&self.ctx, "deshare-propagate", folder);
        match self.ctx.live_node(folder).await {
            Ok(root) => walker.descend(&root, 0, start).await,
            Err(e) => walker.fail(folder, &e),
        }

        while let Some(frame) = walker.pop() {
            if frame.node.erased {
                continue;
            }
            let id = frame.node.id;
            match self.reconcile_node(frame.node, removed, &frame.state).await {
                Ok(step) if step.node.is_folder() => {
                    let next = step.inherited();
                    walker.descend(&step.node, frame.depth, next).await;
                }
                Ok(_) => {}
                Err(e) => walker.fail(id, &e),
            }
        }
        walker.finish()
    }
}
