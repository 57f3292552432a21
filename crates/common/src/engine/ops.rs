//! Request and response shapes for the engine's root operations.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Node, NodeId, NodeKind, UserId, VersionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomPermissions {
    pub editors_can_share: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareRequest {
    pub node_id: NodeId,
    pub is_folder: bool,
    pub actor: UserId,
    #[serde(default)]
    pub editors_to_add: Vec<String>,
    #[serde(default)]
    pub viewers_to_add: Vec<String>,
    #[serde(default)]
    pub custom_permissions: Option<CustomPermissions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareResponse {
    pub affected_collaborators: Vec<UserId>,
    pub unresolved_identifiers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnshareRequest {
    pub node_id: NodeId,
    pub is_folder: bool,
    pub actor: UserId,
    pub collaborators_to_remove: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnshareResponse {
    pub affected_collaborators: Vec<UserId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveRequest {
    pub node_id: NodeId,
    pub is_folder: bool,
    pub new_parent_id: NodeId,
    pub actor: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameRequest {
    pub node_id: NodeId,
    pub name: String,
    pub actor: UserId,
}

/// Trash, restore and erase all take this shape; only erase reads `force`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleRequest {
    pub node_id: NodeId,
    pub is_folder: bool,
    pub actor: UserId,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyTrashResponse {
    pub erased: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFolderRequest {
    pub parent_id: NodeId,
    pub name: String,
    pub actor: UserId,
}

/// New content for a file.
///
/// Without `file_id` a file called `name` is created under `parent_id`.
/// With it, the file is overwritten if `base_change_id` still matches
/// its latest version.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub parent_id: NodeId,
    pub name: String,
    pub actor: UserId,
    pub file_id: Option<NodeId>,
    pub base_change_id: Option<VersionId>,
    pub content: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectReason {
    /// The caller can still read the file but no longer edit it
    LostRights,
    /// Someone else saved a newer version first
    VersionRace,
    /// The file was trashed, erased or unshared from the caller
    UnsharedOrDeleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UploadOutcome {
    Created {
        node_id: NodeId,
        version_id: VersionId,
    },
    Updated {
        node_id: NodeId,
        version_id: VersionId,
    },
    Redirected {
        reason: RedirectReason,
        node_id: NodeId,
        name: String,
        version_id: VersionId,
    },
}

impl UploadOutcome {
    pub fn node_id(&self) -> NodeId {
        match self {
            UploadOutcome::Created { node_id, .. }
            | UploadOutcome::Updated { node_id, .. }
            | UploadOutcome::Redirected { node_id, .. } => *node_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListRequest {
    /// `None` lists the actor's own root folder
    pub parent_id: Option<NodeId>,
    pub actor: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSummary {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    pub owner: UserId,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub latest_version: Option<VersionId>,
}

impl From<&Node> for NodeSummary {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id,
            kind: node.kind,
            name: node.name.clone(),
            owner: node.owner.clone(),
            size: node.size,
            last_modified: node.last_modified,
            latest_version: node.latest_version,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    pub parent_id: NodeId,
    pub children: Vec<NodeSummary>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub scanned: usize,
    pub orphans_erased: usize,
    pub usage_bytes: u64,
}
