use serde::{Deserialize, Serialize};

use super::node::{NodeId, UserId};

/// Where a shared node shows up for one collaborator.
///
/// Keyed by `(node_id, collaborator)`. A record never exists for the
/// node's owner, and never outlives the node it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareRecord {
    pub node_id: NodeId,
    pub collaborator: UserId,
    /// Folder under which the node appears in the collaborator's view.
    ///  `None` places it at the top of their "shared with me" listing.
    pub virtual_parent: Option<NodeId>,
    /// Mirrors the node's trash state for this collaborator.
    pub hidden: bool,
    /// The collaborator was granted access on this node itself rather
    ///  than inheriting it from an ancestor.
    pub direct: bool,
}

impl ShareRecord {
    pub fn direct(node_id: NodeId, collaborator: UserId, virtual_parent: Option<NodeId>) -> Self {
        Self {
            node_id,
            collaborator,
            virtual_parent,
            hidden: false,
            direct: true,
        }
    }

    /// Access that came down from an ancestor; `virtual_parent` is the
    ///  folder it came through, `None` only when that is unknown.
    pub fn inherited(
        node_id: NodeId,
        collaborator: UserId,
        virtual_parent: Option<NodeId>,
    ) -> Self {
        Self {
            node_id,
            collaborator,
            virtual_parent,
            hidden: false,
            direct: false,
        }
    }
}
