use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use crate::model::{NodeId, VersionId};

#[derive(Debug, thiserror::Error)]
pub enum ObjectStorageError {
    #[error("object storage backend error: {0}")]
    Backend(String),
    #[error("version {1} of file {0} not found")]
    VersionNotFound(NodeId, VersionId),
}

/// Byte-level storage for file versions.
#[async_trait]
pub trait ObjectStorage: Send + Sync + std::fmt::Debug {
    async fn put_version(
        &self,
        file: NodeId,
        version: VersionId,
        data: Bytes,
    ) -> Result<(), ObjectStorageError>;

    async fn get_version(
        &self,
        file: NodeId,
        version: VersionId,
    ) -> Result<Bytes, ObjectStorageError>;

    /// Drop the file's current content. Succeeds if there is nothing to drop.
    async fn unlink(&self, file: NodeId) -> Result<(), ObjectStorageError>;

    /// Drop every stored version of the file. Succeeds if there are none.
    async fn remove_versions(&self, file: NodeId) -> Result<(), ObjectStorageError>;
}

/// Keeps every version in a map; unlink and remove_versions both clear it.
#[derive(Debug, Clone, Default)]
pub struct MemoryObjectStorage {
    versions: Arc<RwLock<HashMap<NodeId, HashMap<VersionId, Bytes>>>>,
    reject_writes: Arc<AtomicBool>,
}

impl MemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `put_version` fail until switched back off.
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    pub fn version_count(&self, file: NodeId) -> usize {
        self.versions.read().get(&file).map(|v| v.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn put_version(
        &self,
        file: NodeId,
        version: VersionId,
        data: Bytes,
    ) -> Result<(), ObjectStorageError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(ObjectStorageError::Backend("writes rejected".to_string()));
        }
        self.versions
            .write()
            .entry(file)
            .or_default()
            .insert(version, data);
        Ok(())
    }

    async fn get_version(
        &self,
        file: NodeId,
        version: VersionId,
    ) -> Result<Bytes, ObjectStorageError> {
        self.versions
            .read()
            .get(&file)
            .and_then(|v| v.get(&version))
            .cloned()
            .ok_or(ObjectStorageError::VersionNotFound(file, version))
    }

    async fn unlink(&self, file: NodeId) -> Result<(), ObjectStorageError> {
        self.versions.write().remove(&file);
        Ok(())
    }

    async fn remove_versions(&self, file: NodeId) -> Result<(), ObjectStorageError> {
        self.versions.write().remove(&file);
        Ok(())
    }
}
