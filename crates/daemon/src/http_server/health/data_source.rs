use std::fmt::Debug;
use std::ops::Deref;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use http::request::Parts;

use crate::database::Database;
use crate::storage::ObjectStoreStorage;
use crate::ServiceState;

#[async_trait]
pub trait DataSource {
    /// Check every backend a request may touch.
    async fn is_ready(&self) -> Result<(), DataSourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    #[error("{dependency} is not available: {reason}")]
    DependencyFailure {
        dependency: &'static str,
        reason: String,
    },
}

impl DataSourceError {
    pub fn dependency(&self) -> &'static str {
        match self {
            DataSourceError::DependencyFailure { dependency, .. } => *dependency,
        }
    }
}

pub type DynDataSource = Arc<dyn DataSource + Send + Sync>;

pub struct StateDataSource(DynDataSource);

impl Debug for StateDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateDataSource").finish()
    }
}

impl StateDataSource {
    #[cfg(test)]
    pub fn new(dds: DynDataSource) -> Self {
        Self(dds)
    }
}

impl Deref for StateDataSource {
    type Target = DynDataSource;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// The node database and the version store behind it.
struct BackendSource {
    database: Database,
    storage: ObjectStoreStorage,
}

#[async_trait]
impl DataSource for BackendSource {
    async fn is_ready(&self) -> Result<(), DataSourceError> {
        self.database
            .ping()
            .await
            .map_err(|e| DataSourceError::DependencyFailure {
                dependency: "sqlite",
                reason: e.to_string(),
            })?;
        self.storage
            .ping()
            .await
            .map_err(|e| DataSourceError::DependencyFailure {
                dependency: "object_store",
                reason: e.to_string(),
            })?;
        Ok(())
    }
}

#[async_trait]
impl FromRequestParts<ServiceState> for StateDataSource {
    type Rejection = ();

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &ServiceState,
    ) -> Result<Self, Self::Rejection> {
        Ok(StateDataSource(Arc::new(BackendSource {
            database: state.database().clone(),
            storage: state.storage().clone(),
        })))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[derive(Clone)]
    pub(crate) enum MockReadiness {
        Ready,
        Down(&'static str),
    }

    #[async_trait]
    impl DataSource for MockReadiness {
        async fn is_ready(&self) -> Result<(), DataSourceError> {
            match self {
                MockReadiness::Ready => Ok(()),
                MockReadiness::Down(dependency) => Err(DataSourceError::DependencyFailure {
                    dependency: *dependency,
                    reason: "connection refused".to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_backend_source_reports_sqlite() {
        let url = url::Url::parse("sqlite::memory:").unwrap();
        let database = Database::connect(&url).await.unwrap();
        let source = BackendSource {
            database: database.clone(),
            storage: ObjectStoreStorage::memory(),
        };
        assert!(source.is_ready().await.is_ok());

        database.close().await;
        let err = source.is_ready().await.unwrap_err();
        assert_eq!(err.dependency(), "sqlite");
    }
}
