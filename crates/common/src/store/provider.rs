use std::collections::BTreeSet;
use std::fmt::{Debug, Display};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::{Node, NodeId, NodeKind, ShareRecord, TrashState, UserId, VersionId};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError<T> {
    #[error("unhandled node store provider error: {0}")]
    Provider(#[from] T),
    /// The node does not exist (or was physically removed)
    #[error("node not found: {0}")]
    NotFound(NodeId),
}

/// One page of a listing. `next` is an opaque continuation token.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

/// Persistence for nodes, share records and per-owner usage.
///
/// Nothing here is transactional across calls. Every mutation must be
/// idempotent: re-adding an existing share record, re-removing an absent
/// one, or re-setting the same state has to succeed and change nothing.
#[async_trait]
pub trait NodeStore: Send + Sync + Debug + Clone + 'static {
    type Error: Display + Debug + Send + Sync;

    async fn get_node(&self, id: NodeId) -> Result<Node, StoreError<Self::Error>>;

    /// Insert a new node.
    async fn put_node(&self, node: &Node) -> Result<(), StoreError<Self::Error>>;

    /// The owner's root folder, created on first use.
    async fn root_folder(&self, owner: &UserId) -> Result<Node, StoreError<Self::Error>>;

    /// Children of a folder, in a stable order, including trashed and erased ones.
    ///
    /// Pages may come back short; callers keep asking until `next` is `None`.
    async fn list_children(
        &self,
        parent: NodeId,
        page: Option<String>,
    ) -> Result<Page<Node>, StoreError<Self::Error>>;

    /// Every node (root folder included) owned by a user.
    async fn list_owned(
        &self,
        owner: &UserId,
        page: Option<String>,
    ) -> Result<Page<Node>, StoreError<Self::Error>>;

    async fn update_collaborators(
        &self,
        id: NodeId,
        editors: &BTreeSet<UserId>,
        viewers: &BTreeSet<UserId>,
    ) -> Result<(), StoreError<Self::Error>>;

    async fn set_editors_can_share(
        &self,
        id: NodeId,
        allowed: bool,
    ) -> Result<(), StoreError<Self::Error>>;

    /// Insert or replace the record for `(record.node_id, record.collaborator)`.
    async fn add_share_record(&self, record: &ShareRecord) -> Result<(), StoreError<Self::Error>>;

    /// Remove a record. Absent records are not an error.
    async fn remove_share_record(
        &self,
        node: NodeId,
        collaborator: &UserId,
    ) -> Result<(), StoreError<Self::Error>>;

    async fn get_share_record(
        &self,
        node: NodeId,
        collaborator: &UserId,
    ) -> Result<Option<ShareRecord>, StoreError<Self::Error>>;

    async fn list_share_records(
        &self,
        node: NodeId,
    ) -> Result<Vec<ShareRecord>, StoreError<Self::Error>>;

    async fn set_deleted(
        &self,
        id: NodeId,
        trash: &TrashState,
    ) -> Result<(), StoreError<Self::Error>>;

    async fn set_restored(&self, id: NodeId) -> Result<(), StoreError<Self::Error>>;

    async fn set_erased(&self, id: NodeId) -> Result<(), StoreError<Self::Error>>;

    async fn set_parent(&self, id: NodeId, parent: NodeId) -> Result<(), StoreError<Self::Error>>;

    async fn set_name(&self, id: NodeId, name: &str) -> Result<(), StoreError<Self::Error>>;

    async fn set_content(
        &self,
        id: NodeId,
        version: VersionId,
        size: u64,
        modified: DateTime<Utc>,
    ) -> Result<(), StoreError<Self::Error>>;

    /// Physically delete a node and any share records left on it.
    async fn remove_node(&self, id: NodeId) -> Result<(), StoreError<Self::Error>>;

    /// Whether `name` is free among the active same-kind children of `parent`.
    async fn check_name_available(
        &self,
        parent: NodeId,
        name: &str,
        kind: NodeKind,
        excluding: Option<NodeId>,
    ) -> Result<bool, StoreError<Self::Error>>;

    async fn usage(&self, owner: &UserId) -> Result<u64, StoreError<Self::Error>>;

    async fn set_usage(&self, owner: &UserId, bytes: u64) -> Result<(), StoreError<Self::Error>>;

    /// Users that own at least one node.
    async fn list_owners(&self) -> Result<Vec<UserId>, StoreError<Self::Error>>;
}
