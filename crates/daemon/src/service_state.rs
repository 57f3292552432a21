use std::sync::Arc;

use common::external::{LogNotifier, OpenDirectory};
use common::prelude::{CascadeReceiver, Engine};
use url::Url;

use crate::database::{Database, DatabaseSetupError};
use crate::storage::{ObjectStoreStorage, StorageSetupError};
use crate::ServiceConfig;

/// Everything a request handler or background task needs.
#[derive(Debug, Clone)]
pub struct State {
    engine: Engine<Database>,
    database: Database,
    storage: ObjectStoreStorage,
}

impl State {
    /// Connect storage and build the engine.
    ///
    /// Cascades are only executed once the returned receiver is handed to
    /// [`Engine::worker`].
    pub async fn from_config(
        config: &ServiceConfig,
    ) -> Result<(Self, CascadeReceiver), StateSetupError> {
        let database_url = match &config.sqlite_path {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                Url::parse(&format!("sqlite://{}", path.display()))?
            }
            None => Url::parse("sqlite::memory:")?,
        };
        let database = Database::connect(&database_url).await?;
        tracing::debug!(url = %database_url, "database ready");

        let storage = ObjectStoreStorage::new(&config.storage, config.objects_dir.clone()).await?;

        let (engine, receiver) = Engine::new(
            database.clone(),
            Arc::new(storage.clone()),
            Arc::new(OpenDirectory),
            Arc::new(LogNotifier),
            config.engine.clone(),
        );

        Ok((
            Self {
                engine,
                database,
                storage,
            },
            receiver,
        ))
    }

    pub fn engine(&self) -> &Engine<Database> {
        &self.engine
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn storage(&self) -> &ObjectStoreStorage {
        &self.storage
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("failed to setup the database: {0}")]
    DatabaseSetupError(#[from] DatabaseSetupError),
    #[error("invalid database url: {0}")]
    DatabaseUrl(#[from] url::ParseError),
    #[error("failed to setup object storage: {0}")]
    StorageSetupError(#[from] StorageSetupError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
