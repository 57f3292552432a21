use std::collections::BTreeSet;
use std::sync::Arc;

use crate::cascade::{CascadeDispatcher, CascadeTask};
use crate::external::{Notifier, ObjectStorage, UserDirectory};
use crate::model::{AccessType, Node, NodeId, ShareRecord, UserId};
use crate::store::{NodeStore, StoreError};

use super::config::EngineConfig;
use super::error::{ConflictKind, EngineError};

/// Backend handles and settings shared by every engine component.
///
/// Cloning is cheap; components each hold their own copy.
#[derive(Debug, Clone)]
pub struct EngineContext<S: NodeStore> {
    pub store: S,
    pub storage: Arc<dyn ObjectStorage>,
    pub directory: Arc<dyn UserDirectory>,
    pub notifier: Arc<dyn Notifier>,
    pub dispatcher: CascadeDispatcher,
    pub config: EngineConfig,
}

impl<S: NodeStore> EngineContext<S> {
    /// Load a node that has not been erased.
    pub async fn live_node(&self, id: NodeId) -> Result<Node, EngineError> {
        let node = self.store.get_node(id).await?;
        if node.erased {
            return Err(EngineError::NotFound(id));
        }
        Ok(node)
    }

    /// Load a node that is neither trashed nor erased.
    pub async fn active_node(&self, id: NodeId) -> Result<Node, EngineError> {
        let node = self.live_node(id).await?;
        if node.is_trashed() {
            return Err(EngineError::NotFound(id));
        }
        Ok(node)
    }

    /// Like [`Self::active_node`], but a kind mismatch also reads as not found.
    pub async fn active_node_of_kind(
        &self,
        id: NodeId,
        is_folder: bool,
    ) -> Result<Node, EngineError> {
        let node = self.active_node(id).await?;
        if node.is_folder() != is_folder {
            return Err(EngineError::NotFound(id));
        }
        Ok(node)
    }

    pub fn require(
        &self,
        node: &Node,
        actor: &UserId,
        access: AccessType,
    ) -> Result<(), EngineError> {
        if access.permits(node, actor) {
            Ok(())
        } else {
            Err(EngineError::forbidden(access))
        }
    }

    pub fn require_owner(&self, node: &Node, actor: &UserId) -> Result<(), EngineError> {
        if node.owner == *actor {
            Ok(())
        } else {
            Err(EngineError::forbidden(AccessType::Manage))
        }
    }

    pub fn dispatch(&self, task: CascadeTask) -> Result<(), EngineError> {
        Ok(self.dispatcher.dispatch(task)?)
    }

    pub async fn ensure_name_available(
        &self,
        parent: NodeId,
        node: &Node,
        name: &str,
    ) -> Result<(), EngineError> {
        let free = self
            .store
            .check_name_available(parent, name, node.kind, Some(node.id))
            .await?;
        if free {
            Ok(())
        } else {
            Err(EngineError::Conflict(ConflictKind::DuplicateName))
        }
    }

    /// Flip the `hidden` flag on every record of a node.
    pub async fn set_records_hidden(&self, node: NodeId, hidden: bool) -> Result<(), EngineError> {
        for record in self.store.list_share_records(node).await? {
            if record.hidden != hidden {
                self.store
                    .add_share_record(&ShareRecord { hidden, ..record })
                    .await?;
            }
        }
        Ok(())
    }

    /// Move an owner's usage by `added - removed` bytes, saturating at zero.
    ///
    /// Read-then-write; concurrent callers can lose an update, which the
    /// reconciliation sweep corrects.
    pub async fn adjust_usage(
        &self,
        owner: &UserId,
        added: u64,
        removed: u64,
    ) -> Result<u64, EngineError> {
        let current = self.store.usage(owner).await?;
        let next = current.saturating_add(added).saturating_sub(removed);
        if next != current {
            self.store.set_usage(owner, next).await?;
        }
        Ok(next)
    }

    pub async fn check_quota(&self, owner: &UserId, added: u64, removed: u64) -> Result<(), EngineError> {
        let Some(quota) = self.config.quota_bytes else {
            return Ok(());
        };
        let requested = self
            .store
            .usage(owner)
            .await?
            .saturating_add(added)
            .saturating_sub(removed);
        if requested > quota {
            return Err(EngineError::QuotaExceeded {
                owner: owner.to_string(),
                requested,
                quota,
            });
        }
        Ok(())
    }

    /// Whether `ancestor` appears on the parent chain above `node`.
    pub async fn is_ancestor(&self, ancestor: NodeId, node: &Node) -> Result<bool, EngineError> {
        let mut next = node.parent;
        let mut depth = 0;
        while let Some(id) = next {
            if id == ancestor {
                return Ok(true);
            }
            depth += 1;
            if depth > self.config.max_depth {
                tracing::warn!(node = %node.id, "ancestor chain exceeds max depth");
                return Ok(false);
            }
            next = match self.store.get_node(id).await {
                Ok(parent) => parent.parent,
                Err(StoreError::NotFound(_)) => None,
                Err(e) => return Err(e.into()),
            };
        }
        Ok(false)
    }

    /// Every node an owner has, paging through the whole listing.
    pub async fn owned_nodes(&self, owner: &UserId) -> Result<Vec<Node>, EngineError> {
        let mut nodes = Vec::new();
        let mut token = None;
        loop {
            let page = self.store.list_owned(owner, token).await?;
            nodes.extend(page.items);
            match page.next {
                Some(next) => token = Some(next),
                None => return Ok(nodes),
            }
        }
    }

    /// Resolve caller-supplied identifiers, returning the users found and
    ///  the identifiers that matched nobody.
    pub async fn resolve_users(
        &self,
        identifiers: &[String],
    ) -> (BTreeSet<UserId>, Vec<String>) {
        let mut users = BTreeSet::new();
        let mut unresolved = Vec::new();
        for identifier in identifiers {
            match self.directory.resolve(identifier).await {
                Some(user) => {
                    users.insert(user);
                }
                None => unresolved.push(identifier.clone()),
            }
        }
        (users, unresolved)
    }
}

/// Validate a node name for create and rename.
pub(crate) fn validate_name(name: &str) -> Result<(), EngineError> {
    if name.trim().is_empty() || name.contains('/') || name.chars().any(char::is_control) {
        return Err(EngineError::InvalidName(name.to_string()));
    }
    Ok(())
}
