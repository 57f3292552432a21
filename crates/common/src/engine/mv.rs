use std::collections::BTreeSet;
use std::sync::Arc;

use crate::cascade::{CascadeTask, CollaboratorSnapshot};
use crate::model::{AccessType, Node, NodeId, ShareRecord, UserId};
use crate::store::NodeStore;

use super::context::{validate_name, EngineContext};
use super::error::{ConflictKind, EngineError};
use super::ops::{MoveRequest, RenameRequest};
use super::share::{Inherited, ShareGraphManager};
use super::walk::{CascadeReport, Walker};

/// Moves and renames.
#[derive(Debug, Clone)]
pub struct MoveReconciler<S: NodeStore> {
    ctx: EngineContext<S>,
    shares: ShareGraphManager<S>,
}

impl<S: NodeStore> MoveReconciler<S> {
    pub fn new(ctx: EngineContext<S>, shares: ShareGraphManager<S>) -> Self {
        Self { ctx, shares }
    }

    pub async fn mv(&self, request: MoveRequest) -> Result<(), EngineError> {
        let node = self
            .ctx
            .active_node_of_kind(request.node_id, request.is_folder)
            .await?;
        let Some(old_parent_id) = node.parent else {
            return Err(EngineError::forbidden(AccessType::Write));
        };

        if request.new_parent_id == node.id {
            return Err(EngineError::Conflict(ConflictKind::CyclicMove));
        }
        let new_parent = self.ctx.active_node(request.new_parent_id).await?;
        if !new_parent.is_folder() {
            return Err(EngineError::NotFound(new_parent.id));
        }
        if self.ctx.is_ancestor(node.id, &new_parent).await? {
            return Err(EngineError::Conflict(ConflictKind::CyclicMove));
        }
        let old_parent = self.ctx.live_node(old_parent_id).await?;
        self.ctx.require(&node, &request.actor, AccessType::Write)?;
        self.ctx.require(&old_parent, &request.actor, AccessType::Write)?;
        self.ctx.require(&new_parent, &request.actor, AccessType::Write)?;
        if new_parent.is_root() && node.owner != request.actor {
            return Err(EngineError::forbidden(AccessType::Manage));
        }
        if new_parent.id == old_parent_id {
            return Ok(());
        }

        self.ctx
            .ensure_name_available(new_parent.id, &node, &node.name)
            .await?;

        self.ctx.store.set_parent(node.id, new_parent.id).await?;
        tracing::info!(
            node_id = %node.id,
            from = %old_parent.id,
            to = %new_parent.id,
            actor = %request.actor,
            "moved node"
        );

        self.ctx.dispatch(CascadeTask::MoveReconcile {
            node: node.id,
            old_parent: CollaboratorSnapshot::of(&old_parent),
            new_parent: CollaboratorSnapshot::of(&new_parent),
        })?;
        Ok(())
    }

    /// Rename in place. Shares the same unlocked name check as create and move,
    ///  so two concurrent renames to one name can both succeed.
    pub async fn rename(&self, request: RenameRequest) -> Result<(), EngineError> {
        validate_name(&request.name)?;
        let node = self.ctx.active_node(request.node_id).await?;
        let Some(parent) = node.parent else {
            return Err(EngineError::forbidden(AccessType::Write));
        };
        self.ctx.require(&node, &request.actor, AccessType::Write)?;
        if node.name == request.name {
            return Ok(());
        }

        self.ctx
            .ensure_name_available(parent, &node, &request.name)
            .await?;
        self.ctx.store.set_name(node.id, &request.name).await?;
        tracing::info!(node_id = %node.id, name = %request.name, "renamed node");
        Ok(())
    }

    /// Re-diff collaborators on a moved node and everything below it.
    ///
    /// Users reachable only through the old parent are revoked through the
    /// shared reconciliation rule; the new parent's collaborators are then
    /// granted.
    pub(crate) async fn reconcile(
        &self,
        node: NodeId,
        old_parent: &CollaboratorSnapshot,
        new_parent: &CollaboratorSnapshot,
    ) -> CascadeReport {
        let removed: BTreeSet<UserId> = old_parent
            .all()
            .difference(&new_parent.all())
            .cloned()
            .collect();
        let editors = new_parent.writers();
        let viewers = new_parent.viewers.clone();

        let mut walker = Walker::new(&self.ctx, "move-reconcile", node);
        match self.ctx.live_node(node).await {
            Ok(root) => walker.push(root, 0, Arc::new(Inherited::default())),
            Err(e) => walker.fail(node, &e),
        }

        while let Some(frame) = walker.pop() {
            if frame.node.erased {
                continue;
            }
            let id = frame.node.id;
            let step = self
                .move_step(frame.node, frame.depth == 0, &removed, &frame.state, &editors, &viewers)
                .await;
            match step {
                Ok((current, next)) if current.is_folder() => {
                    walker.descend(&current, frame.depth, next).await
                }
                Ok(_) => {}
                Err(e) => walker.fail(id, &e),
            }
        }
        walker.finish()
    }

    async fn move_step(
        &self,
        node: Node,
        is_moved_node: bool,
        removed: &BTreeSet<UserId>,
        inherited: &Inherited,
        editors: &BTreeSet<UserId>,
        viewers: &BTreeSet<UserId>,
    ) -> Result<(Node, Arc<Inherited>), EngineError> {
        let revocation = self.shares.reconcile_node(node, removed, inherited).await?;
        let next = revocation.inherited();
        let mut current = revocation.node;
        self.shares.inherit(&mut current, editors, viewers).await?;
        if is_moved_node {
            self.repoint_records(current.id, current.parent).await?;
        }
        Ok((current, next))
    }

    /// Point the moved node's records at its new parent. Direct records
    ///  that hung under the old parent move to the top of the view instead.
    async fn repoint_records(
        &self,
        node: NodeId,
        parent: Option<NodeId>,
    ) -> Result<(), EngineError> {
        for record in self.ctx.store.list_share_records(node).await? {
            let target = if record.direct {
                None
            } else {
                parent
            };
            if record.virtual_parent.is_some() && record.virtual_parent != target {
                self.ctx
                    .store
                    .add_share_record(&ShareRecord {
                        virtual_parent: target,
                        ..record
                    })
                    .await?;
            }
        }
        Ok(())
    }
}
