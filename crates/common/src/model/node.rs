use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type NodeId = Uuid;
pub type VersionId = Uuid;

/// Opaque identity of a user.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    File,
    Folder,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::File => "file",
            NodeKind::Folder => "folder",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "file" => Some(NodeKind::File),
            "folder" => Some(NodeKind::Folder),
            _ => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Soft-delete bookkeeping for a trashed node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrashState {
    pub trashed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Canonical parent at the moment the user trashed this node.
    ///  Only set on the node that was trashed directly; nodes
    ///  trashed by a cascade keep their parent and leave this empty.
    pub trashed_from: Option<NodeId>,
}

impl TrashState {
    pub fn is_root(&self) -> bool {
        self.trashed_from.is_some()
    }
}

/// Collaborators newly granted (or promoted) by a merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollaboratorDiff {
    pub editors: BTreeSet<UserId>,
    pub viewers: BTreeSet<UserId>,
}

impl CollaboratorDiff {
    pub fn is_empty(&self) -> bool {
        self.editors.is_empty() && self.viewers.is_empty()
    }

    pub fn all(&self) -> BTreeSet<UserId> {
        self.editors.union(&self.viewers).cloned().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub owner: UserId,
    pub name: String,
    /// Canonical parent in the owner's tree. `None` only for a user's root folder.
    pub parent: Option<NodeId>,
    pub editors: BTreeSet<UserId>,
    pub viewers: BTreeSet<UserId>,
    /// Editors may manage sharing on this node.
    pub editors_can_share: bool,
    pub trash: Option<TrashState>,
    pub erased: bool,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub latest_version: Option<VersionId>,
    pub size: u64,
}

impl Node {
    fn new(kind: NodeKind, owner: UserId, name: String, parent: Option<NodeId>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kind,
            owner,
            name,
            parent,
            editors: BTreeSet::new(),
            viewers: BTreeSet::new(),
            editors_can_share: false,
            trash: None,
            erased: false,
            created_at: now,
            last_modified: now,
            latest_version: None,
            size: 0,
        }
    }

    pub fn root(owner: UserId) -> Self {
        Self::new(NodeKind::Folder, owner, String::new(), None)
    }

    pub fn folder(owner: UserId, name: impl Into<String>, parent: NodeId) -> Self {
        Self::new(NodeKind::Folder, owner, name.into(), Some(parent))
    }

    pub fn file(owner: UserId, name: impl Into<String>, parent: NodeId) -> Self {
        Self::new(NodeKind::File, owner, name.into(), Some(parent))
    }

    /* Getters */

    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_trashed(&self) -> bool {
        self.trash.is_some()
    }

    pub fn is_active(&self) -> bool {
        !self.erased && self.trash.is_none()
    }

    pub fn is_editor(&self, user: &UserId) -> bool {
        self.editors.contains(user)
    }

    pub fn is_viewer(&self, user: &UserId) -> bool {
        self.viewers.contains(user)
    }

    /// Editors and viewers, without the owner.
    pub fn collaborators(&self) -> BTreeSet<UserId> {
        self.editors.union(&self.viewers).cloned().collect()
    }

    /// `editors ∪ viewers ∪ {owner}`
    pub fn collaborator_set(&self) -> BTreeSet<UserId> {
        let mut set = self.collaborators();
        set.insert(self.owner.clone());
        set
    }

    /* Collaborator algebra */

    /// Merge editors and viewers into this node.
    ///
    /// The owner is never added. A user named in both sets, or already an
    /// editor, ends up an editor only. Returns who was newly granted or
    /// promoted; merging the same sets twice returns an empty diff.
    pub fn add_collaborators<'a>(
        &mut self,
        editors: impl IntoIterator<Item = &'a UserId>,
        viewers: impl IntoIterator<Item = &'a UserId>,
    ) -> CollaboratorDiff {
        let mut diff = CollaboratorDiff::default();

        for user in editors {
            if *user == self.owner {
                continue;
            }
            if self.editors.insert(user.clone()) {
                self.viewers.remove(user);
                diff.editors.insert(user.clone());
            }
        }

        for user in viewers {
            if *user == self.owner || self.editors.contains(user) {
                continue;
            }
            if self.viewers.insert(user.clone()) {
                diff.viewers.insert(user.clone());
            }
        }

        diff
    }

    /// Drop the given users from both collaborator sets, returning the ones
    ///  that were actually present.
    pub fn revoke_collaborators<'a>(
        &mut self,
        users: impl IntoIterator<Item = &'a UserId>,
    ) -> BTreeSet<UserId> {
        let mut removed = BTreeSet::new();
        for user in users {
            if self.editors.remove(user) | self.viewers.remove(user) {
                removed.insert(user.clone());
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users(names: &[&str]) -> Vec<UserId> {
        names.iter().map(|n| UserId::from(*n)).collect()
    }

    fn folder() -> Node {
        Node::folder("owner".into(), "docs", Uuid::new_v4())
    }

    #[test]
    fn test_add_collaborators_skips_owner() {
        let mut node = folder();
        let diff = node.add_collaborators(&users(&["owner", "ed"]), &users(&["owner"]));

        assert_eq!(diff.editors, users(&["ed"]).into_iter().collect());
        assert!(diff.viewers.is_empty());
        assert!(!node.collaborators().contains(&UserId::from("owner")));
    }

    #[test]
    fn test_editor_dominates_viewer() {
        let mut node = folder();
        let diff = node.add_collaborators(&users(&["u"]), &users(&["u"]));

        assert!(node.is_editor(&"u".into()));
        assert!(!node.is_viewer(&"u".into()));
        assert_eq!(diff.all().len(), 1);
    }

    #[test]
    fn test_promotion_is_reported() {
        let mut node = folder();
        node.add_collaborators(&users(&[]), &users(&["u"]));
        let diff = node.add_collaborators(&users(&["u"]), &users(&[]));

        assert_eq!(diff.editors.len(), 1);
        assert!(node.viewers.is_empty());
    }

    #[test]
    fn test_existing_editor_not_downgraded() {
        let mut node = folder();
        node.add_collaborators(&users(&["u"]), &users(&[]));
        let diff = node.add_collaborators(&users(&[]), &users(&["u"]));

        assert!(diff.is_empty());
        assert!(node.is_editor(&"u".into()));
    }

    #[test]
    fn test_add_collaborators_idempotent() {
        let mut node = folder();
        node.add_collaborators(&users(&["u"]), &users(&[]));
        let once = node.editors.clone();

        let diff = node.add_collaborators(&users(&["u"]), &users(&[]));
        assert!(diff.is_empty());
        assert_eq!(node.editors, once);
    }

    #[test]
    fn test_revoke_reports_present_only() {
        let mut node = folder();
        node.add_collaborators(&users(&["a"]), &users(&["b"]));
        let removed = node.revoke_collaborators(&users(&["a", "b", "c"]));

        assert_eq!(removed, users(&["a", "b"]).into_iter().collect());
        assert!(node.collaborators().is_empty());
    }

    #[test]
    fn test_collaborator_set_includes_owner() {
        let mut node = folder();
        node.add_collaborators(&users(&[]), &users(&["v"]));
        let set = node.collaborator_set();
        assert!(set.contains(&UserId::from("owner")));
        assert!(set.contains(&UserId::from("v")));
    }
}
