use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::{Node, NodeId, UserId};

/// A folder's collaborators, captured when a move was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollaboratorSnapshot {
    pub owner: UserId,
    pub editors: BTreeSet<UserId>,
    pub viewers: BTreeSet<UserId>,
}

impl CollaboratorSnapshot {
    pub fn of(node: &Node) -> Self {
        Self {
            owner: node.owner.clone(),
            editors: node.editors.clone(),
            viewers: node.viewers.clone(),
        }
    }

    /// `editors ∪ viewers ∪ {owner}`
    pub fn all(&self) -> BTreeSet<UserId> {
        let mut set: BTreeSet<UserId> = self.editors.union(&self.viewers).cloned().collect();
        set.insert(self.owner.clone());
        set
    }

    /// The folder's owner and editors get write access on things moved in.
    pub fn writers(&self) -> BTreeSet<UserId> {
        let mut set = self.editors.clone();
        set.insert(self.owner.clone());
        set
    }
}

/// Background jobs dispatched after a root operation succeeds
#[derive(Debug, Clone)]
pub enum CascadeTask {
    /// Copy newly added collaborators onto every reachable descendant
    SharePropagate {
        folder: NodeId,
        actor: UserId,
        editors: BTreeSet<UserId>,
        viewers: BTreeSet<UserId>,
    },

    /// Revoke removed collaborators from descendants that have no
    ///  other path of access
    DesharePropagate {
        folder: NodeId,
        removed: BTreeSet<UserId>,
    },

    /// Re-diff collaborators of a moved node and its subtree
    MoveReconcile {
        node: NodeId,
        old_parent: CollaboratorSnapshot,
        new_parent: CollaboratorSnapshot,
    },

    /// Soft-delete the descendants of a trashed folder
    TrashCascade { root: NodeId, actor: UserId },

    /// Undo a trash cascade below a restored folder
    RestoreCascade { root: NodeId, actor: UserId },

    /// Physically remove a subtree, children before parents
    EraseCascade { root: NodeId, actor: UserId },

    /// Full-tree consistency repair for one owner
    Sweep { owner: UserId },
}

impl CascadeTask {
    pub fn kind(&self) -> &'static str {
        match self {
            CascadeTask::SharePropagate { .. } => "share-propagate",
            CascadeTask::DesharePropagate { .. } => "deshare-propagate",
            CascadeTask::MoveReconcile { .. } => "move-reconcile",
            CascadeTask::TrashCascade { .. } => "trash-cascade",
            CascadeTask::RestoreCascade { .. } => "restore-cascade",
            CascadeTask::EraseCascade { .. } => "erase-cascade",
            CascadeTask::Sweep { .. } => "sweep",
        }
    }

    /// Root of the subtree the task works on, if it has one.
    pub fn subtree_root(&self) -> Option<NodeId> {
        match self {
            CascadeTask::SharePropagate { folder, .. }
            | CascadeTask::DesharePropagate { folder, .. } => Some(*folder),
            CascadeTask::MoveReconcile { node, .. } => Some(*node),
            CascadeTask::TrashCascade { root, .. }
            | CascadeTask::RestoreCascade { root, .. }
            | CascadeTask::EraseCascade { root, .. } => Some(*root),
            CascadeTask::Sweep { .. } => None,
        }
    }
}
