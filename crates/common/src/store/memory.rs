use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::provider::{NodeStore, Page, StoreError};
use crate::model::{Node, NodeId, NodeKind, ShareRecord, TrashState, UserId, VersionId};

const DEFAULT_PAGE_SIZE: usize = 100;

/// In-memory node store using HashMaps
#[derive(Debug, Clone)]
pub struct MemoryNodeStore {
    inner: Arc<RwLock<MemoryNodeStoreInner>>,
    page_size: usize,
}

#[derive(Debug, Default)]
struct MemoryNodeStoreInner {
    nodes: HashMap<NodeId, Node>,
    /// Index: parent -> children
    children: HashMap<NodeId, BTreeSet<NodeId>>,
    /// Share records: node -> collaborator -> record
    shares: HashMap<NodeId, HashMap<UserId, ShareRecord>>,
    roots: HashMap<UserId, NodeId>,
    usage: HashMap<UserId, u64>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryNodeStoreError {
    #[error("memory provider error: {0}")]
    Internal(String),
    #[error("invalid page token: {0}")]
    InvalidPageToken(String),
}

type Result<T> = std::result::Result<T, StoreError<MemoryNodeStoreError>>;

impl MemoryNodeStore {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Serve listings in pages of at most `page_size` entries.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemoryNodeStoreInner::default())),
            page_size: page_size.max(1),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryNodeStoreInner>> {
        self.inner.read().map_err(|e| {
            StoreError::Provider(MemoryNodeStoreError::Internal(format!(
                "failed to acquire read lock: {}",
                e
            )))
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryNodeStoreInner>> {
        self.inner.write().map_err(|e| {
            StoreError::Provider(MemoryNodeStoreError::Internal(format!(
                "failed to acquire write lock: {}",
                e
            )))
        })
    }

    fn paginate(&self, mut items: Vec<Node>, page: Option<String>) -> Result<Page<Node>> {
        let offset = match page {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| StoreError::Provider(MemoryNodeStoreError::InvalidPageToken(token)))?,
            None => 0,
        };

        items.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        let end = (offset + self.page_size).min(items.len());
        let next = (end < items.len()).then(|| end.to_string());
        let items = items
            .into_iter()
            .skip(offset)
            .take(end.saturating_sub(offset))
            .collect();

        Ok(Page { items, next })
    }

    fn with_node<F>(&self, id: NodeId, f: F) -> Result<()>
    where
        F: FnOnce(&mut Node),
    {
        let mut inner = self.write()?;
        let node = inner.nodes.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        f(node);
        Ok(())
    }
}

impl Default for MemoryNodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryNodeStoreInner {
    fn link(&mut self, node: NodeId, parent: Option<NodeId>) {
        if let Some(parent) = parent {
            self.children.entry(parent).or_default().insert(node);
        }
    }

    fn unlink(&mut self, node: NodeId, parent: Option<NodeId>) {
        if let Some(parent) = parent {
            if let Some(children) = self.children.get_mut(&parent) {
                children.remove(&node);
            }
        }
    }
}

#[async_trait]
impl NodeStore for MemoryNodeStore {
    type Error = MemoryNodeStoreError;

    async fn get_node(&self, id: NodeId) -> Result<Node> {
        let inner = self.read()?;
        inner.nodes.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    async fn put_node(&self, node: &Node) -> Result<()> {
        let mut inner = self.write()?;
        if inner.nodes.contains_key(&node.id) {
            return Err(StoreError::Provider(MemoryNodeStoreError::Internal(
                format!("node {} already exists", node.id),
            )));
        }
        inner.link(node.id, node.parent);
        if node.is_root() {
            inner.roots.insert(node.owner.clone(), node.id);
        }
        inner.nodes.insert(node.id, node.clone());
        Ok(())
    }

    async fn root_folder(&self, owner: &UserId) -> Result<Node> {
        let mut inner = self.write()?;
        if let Some(id) = inner.roots.get(owner) {
            return inner.nodes.get(id).cloned().ok_or(StoreError::NotFound(*id));
        }

        let root = Node::root(owner.clone());
        inner.roots.insert(owner.clone(), root.id);
        inner.nodes.insert(root.id, root.clone());
        Ok(root)
    }

    async fn list_children(&self, parent: NodeId, page: Option<String>) -> Result<Page<Node>> {
        let items = {
            let inner = self.read()?;
            inner
                .children
                .get(&parent)
                .map(|ids| {
                    ids.iter()
                        .filter_map(|id| inner.nodes.get(id).cloned())
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default()
        };
        self.paginate(items, page)
    }

    async fn list_owned(&self, owner: &UserId, page: Option<String>) -> Result<Page<Node>> {
        let items = {
            let inner = self.read()?;
            inner
                .nodes
                .values()
                .filter(|n| n.owner == *owner)
                .cloned()
                .collect::<Vec<_>>()
        };
        self.paginate(items, page)
    }

    async fn update_collaborators(
        &self,
        id: NodeId,
        editors: &BTreeSet<UserId>,
        viewers: &BTreeSet<UserId>,
    ) -> Result<()> {
        self.with_node(id, |node| {
            node.editors = editors.clone();
            node.viewers = viewers.clone();
        })
    }

    async fn set_editors_can_share(&self, id: NodeId, allowed: bool) -> Result<()> {
        self.with_node(id, |node| node.editors_can_share = allowed)
    }

    async fn add_share_record(&self, record: &ShareRecord) -> Result<()> {
        let mut inner = self.write()?;
        if !inner.nodes.contains_key(&record.node_id) {
            return Err(StoreError::NotFound(record.node_id));
        }
        inner
            .shares
            .entry(record.node_id)
            .or_default()
            .insert(record.collaborator.clone(), record.clone());
        Ok(())
    }

    async fn remove_share_record(&self, node: NodeId, collaborator: &UserId) -> Result<()> {
        let mut inner = self.write()?;
        if let Some(records) = inner.shares.get_mut(&node) {
            records.remove(collaborator);
            if records.is_empty() {
                inner.shares.remove(&node);
            }
        }
        Ok(())
    }

    async fn get_share_record(
        &self,
        node: NodeId,
        collaborator: &UserId,
    ) -> Result<Option<ShareRecord>> {
        let inner = self.read()?;
        Ok(inner
            .shares
            .get(&node)
            .and_then(|records| records.get(collaborator))
            .cloned())
    }

    async fn list_share_records(&self, node: NodeId) -> Result<Vec<ShareRecord>> {
        let inner = self.read()?;
        let mut records: Vec<ShareRecord> = inner
            .shares
            .get(&node)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default();
        records.sort_by(|a, b| a.collaborator.cmp(&b.collaborator));
        Ok(records)
    }

    async fn set_deleted(&self, id: NodeId, trash: &TrashState) -> Result<()> {
        self.with_node(id, |node| node.trash = Some(trash.clone()))
    }

    async fn set_restored(&self, id: NodeId) -> Result<()> {
        self.with_node(id, |node| node.trash = None)
    }

    async fn set_erased(&self, id: NodeId) -> Result<()> {
        self.with_node(id, |node| node.erased = true)
    }

    async fn set_parent(&self, id: NodeId, parent: NodeId) -> Result<()> {
        let mut inner = self.write()?;
        let old = inner
            .nodes
            .get(&id)
            .map(|n| n.parent)
            .ok_or(StoreError::NotFound(id))?;
        inner.unlink(id, old);
        inner.link(id, Some(parent));
        if let Some(node) = inner.nodes.get_mut(&id) {
            node.parent = Some(parent);
        }
        Ok(())
    }

    async fn set_name(&self, id: NodeId, name: &str) -> Result<()> {
        self.with_node(id, |node| {
            node.name = name.to_string();
            node.last_modified = Utc::now();
        })
    }

    async fn set_content(
        &self,
        id: NodeId,
        version: VersionId,
        size: u64,
        modified: DateTime<Utc>,
    ) -> Result<()> {
        self.with_node(id, |node| {
            node.latest_version = Some(version);
            node.size = size;
            node.last_modified = modified;
        })
    }

    async fn remove_node(&self, id: NodeId) -> Result<()> {
        let mut inner = self.write()?;
        let Some(node) = inner.nodes.remove(&id) else {
            return Ok(());
        };
        inner.unlink(id, node.parent);
        inner.children.remove(&id);
        inner.shares.remove(&id);
        if node.is_root() {
            inner.roots.remove(&node.owner);
        }
        Ok(())
    }

    async fn check_name_available(
        &self,
        parent: NodeId,
        name: &str,
        kind: NodeKind,
        excluding: Option<NodeId>,
    ) -> Result<bool> {
        let inner = self.read()?;
        let Some(children) = inner.children.get(&parent) else {
            return Ok(true);
        };
        let taken = children
            .iter()
            .filter(|id| Some(**id) != excluding)
            .filter_map(|id| inner.nodes.get(id))
            .any(|n| n.is_active() && n.kind == kind && n.name == name);
        Ok(!taken)
    }

    async fn usage(&self, owner: &UserId) -> Result<u64> {
        let inner = self.read()?;
        Ok(inner.usage.get(owner).copied().unwrap_or(0))
    }

    async fn set_usage(&self, owner: &UserId, bytes: u64) -> Result<()> {
        let mut inner = self.write()?;
        inner.usage.insert(owner.clone(), bytes);
        Ok(())
    }

    async fn list_owners(&self) -> Result<Vec<UserId>> {
        let inner = self.read()?;
        let owners: BTreeSet<UserId> = inner.nodes.values().map(|n| n.owner.clone()).collect();
        Ok(owners.into_iter().collect())
    }
}
