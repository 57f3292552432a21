use std::fmt::Display;

use crate::cascade::DispatchError;
use crate::external::ObjectStorageError;
use crate::model::{AccessType, NodeId};
use crate::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    DuplicateName,
    CyclicMove,
    NotTrashed,
    ParentTrashed,
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictKind::DuplicateName => write!(f, "an active sibling already has that name"),
            ConflictKind::CyclicMove => write!(f, "cannot move a folder into itself"),
            ConflictKind::NotTrashed => write!(f, "node is not in the trash"),
            ConflictKind::ParentTrashed => write!(f, "parent folder is in the trash"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The node is absent, already erased, or not of the requested kind
    #[error("node not found: {0}")]
    NotFound(NodeId),
    #[error("forbidden: {access} access required")]
    Forbidden { access: AccessType },
    #[error("conflict: {0}")]
    Conflict(ConflictKind),
    #[error("quota exceeded for {owner}: {requested} bytes over a {quota} byte quota")]
    QuotaExceeded {
        owner: String,
        requested: u64,
        quota: u64,
    },
    /// Only ever logged; a cascade never hands this back to a caller
    #[error("cascade under {root} failed on {failed} node(s)")]
    PartialCascadeFailure { root: NodeId, failed: usize },
    #[error("invalid name: {0:?}")]
    InvalidName(String),
    #[error("node store error: {0}")]
    Store(String),
    #[error("object storage error: {0}")]
    Storage(String),
    #[error("failed to dispatch cascade: {0}")]
    Dispatch(String),
}

impl<E: Display> From<StoreError<E>> for EngineError {
    fn from(err: StoreError<E>) -> Self {
        match err {
            StoreError::NotFound(id) => EngineError::NotFound(id),
            StoreError::Provider(e) => EngineError::Store(e.to_string()),
        }
    }
}

impl From<ObjectStorageError> for EngineError {
    fn from(err: ObjectStorageError) -> Self {
        EngineError::Storage(err.to_string())
    }
}

impl From<DispatchError> for EngineError {
    fn from(err: DispatchError) -> Self {
        EngineError::Dispatch(err.to_string())
    }
}

impl EngineError {
    pub fn forbidden(access: AccessType) -> Self {
        EngineError::Forbidden { access }
    }
}
