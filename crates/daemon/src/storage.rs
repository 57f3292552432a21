//! File version storage on top of `object_store` (S3/MinIO/local filesystem/memory).
//!
//! Layout:
//! ```text
//! versions/{file}/{version}   one object per saved version
//! current/{file}              id of the version the file currently points at
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use common::external::{ObjectStorage, ObjectStorageError};
use common::model::{NodeId, VersionId};
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;

use crate::state::StorageConfig;

#[derive(Debug, thiserror::Error)]
pub enum StorageSetupError {
    #[error("invalid storage configuration: {0}")]
    InvalidConfig(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Keeps file versions in any `object_store` backend.
#[derive(Debug, Clone)]
pub struct ObjectStoreStorage {
    inner: Arc<dyn ObjectStore>,
}

impl ObjectStoreStorage {
    /// Build the backend described by `config`. Filesystem storage without
    /// an explicit path lands in `default_dir`.
    pub async fn new(
        config: &StorageConfig,
        default_dir: PathBuf,
    ) -> Result<Self, StorageSetupError> {
        let inner: Arc<dyn ObjectStore> = match config {
            StorageConfig::Memory => Arc::new(InMemory::new()),

            StorageConfig::Filesystem { path } => {
                let path = path.clone().unwrap_or(default_dir);
                tokio::fs::create_dir_all(&path).await?;
                Arc::new(
                    LocalFileSystem::new_with_prefix(&path)
                        .map_err(|e| StorageSetupError::InvalidConfig(e.to_string()))?,
                )
            }

            StorageConfig::S3 {
                endpoint,
                access_key,
                secret_key,
                bucket,
                region,
            } => {
                let builder = AmazonS3Builder::new()
                    .with_endpoint(endpoint)
                    .with_access_key_id(access_key)
                    .with_secret_access_key(secret_key)
                    .with_bucket_name(bucket)
                    .with_region(region.as_deref().unwrap_or("us-east-1"))
                    .with_allow_http(endpoint.starts_with("http://"));

                Arc::new(
                    builder
                        .build()
                        .map_err(|e| StorageSetupError::InvalidConfig(e.to_string()))?,
                )
            }
        };

        Ok(Self { inner })
    }

    pub fn memory() -> Self {
        Self {
            inner: Arc::new(InMemory::new()),
        }
    }

    fn versions_prefix(file: NodeId) -> ObjectPath {
        ObjectPath::from(format!("versions/{}", file))
    }

    fn version_path(file: NodeId, version: VersionId) -> ObjectPath {
        ObjectPath::from(format!("versions/{}/{}", file, version))
    }

    fn current_path(file: NodeId) -> ObjectPath {
        ObjectPath::from(format!("current/{}", file))
    }

    /// The version `current/{file}` points at, if any.
    pub async fn current_version(
        &self,
        file: NodeId,
    ) -> Result<Option<VersionId>, ObjectStorageError> {
        let bytes = match self.inner.get(&Self::current_path(file)).await {
            Ok(result) => result.bytes().await.map_err(backend)?,
            Err(object_store::Error::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(backend(e)),
        };
        let raw = String::from_utf8_lossy(&bytes);
        let version = raw
            .trim()
            .parse()
            .map_err(|e| ObjectStorageError::Backend(format!("bad version pointer: {}", e)))?;
        Ok(Some(version))
    }

    /// Round trip to the backend; a missing pointer still counts as reachable.
    pub async fn ping(&self) -> Result<(), ObjectStorageError> {
        self.current_version(NodeId::nil()).await.map(|_| ())
    }

    async fn delete_ignoring_missing(&self, path: &ObjectPath) -> Result<(), ObjectStorageError> {
        match self.inner.delete(path).await {
            Ok(()) => Ok(()),
            Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(backend(e)),
        }
    }
}

fn backend(err: object_store::Error) -> ObjectStorageError {
    ObjectStorageError::Backend(err.to_string())
}

#[async_trait]
impl ObjectStorage for ObjectStoreStorage {
    async fn put_version(
        &self,
        file: NodeId,
        version: VersionId,
        data: Bytes,
    ) -> Result<(), ObjectStorageError> {
        self.inner
            .put(&Self::version_path(file, version), data.into())
            .await
            .map_err(backend)?;
        self.inner
            .put(
                &Self::current_path(file),
                Bytes::from(version.to_string()).into(),
            )
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn get_version(
        &self,
        file: NodeId,
        version: VersionId,
    ) -> Result<Bytes, ObjectStorageError> {
        match self.inner.get(&Self::version_path(file, version)).await {
            Ok(result) => result.bytes().await.map_err(backend),
            Err(object_store::Error::NotFound { .. }) => {
                Err(ObjectStorageError::VersionNotFound(file, version))
            }
            Err(e) => Err(backend(e)),
        }
    }

    async fn unlink(&self, file: NodeId) -> Result<(), ObjectStorageError> {
        self.delete_ignoring_missing(&Self::current_path(file)).await
    }

    async fn remove_versions(&self, file: NodeId) -> Result<(), ObjectStorageError> {
        let prefix = Self::versions_prefix(file);
        let locations: Vec<ObjectPath> = match self
            .inner
            .list(Some(&prefix))
            .map_ok(|meta| meta.location)
            .try_collect::<Vec<_>>()
            .await
        {
            Ok(locations) => locations,
            Err(object_store::Error::NotFound { .. }) => Vec::new(),
            Err(e) => return Err(backend(e)),
        };

        for location in &locations {
            self.delete_ignoring_missing(location).await?;
        }
        self.delete_ignoring_missing(&Self::current_path(file)).await?;

        tracing::debug!(%file, removed = locations.len(), "removed file versions");
        Ok(())
    }
}
