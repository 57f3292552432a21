use std::{fs, path::PathBuf};

use common::prelude::EngineConfig;
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "canopy";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DB_FILE_NAME: &str = "db.sqlite";
pub const OBJECTS_DIR_NAME: &str = "objects";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Port for the API server
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    /// How often expired trash is purged and owners are swept, in seconds
    #[serde(default = "default_purge_interval_secs")]
    pub purge_interval_secs: u64,
    /// Where file contents live
    #[serde(default)]
    pub storage: StorageConfig,
    /// Cascade and retention tuning
    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_api_port() -> u16 {
    5001
}

fn default_purge_interval_secs() -> u64 {
    60 * 60
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            purge_interval_secs: default_purge_interval_secs(),
            storage: StorageConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

/// Configuration for the object storage backend holding file versions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageConfig {
    /// In-memory storage, lost on restart
    Memory,

    /// Local filesystem storage
    Filesystem {
        /// Path for object storage (defaults to canopy_dir/objects/)
        path: Option<PathBuf>,
    },

    /// S3-compatible object storage
    S3 {
        /// S3 endpoint URL (e.g., "http://localhost:9000" for MinIO)
        endpoint: String,
        /// Access key ID
        access_key: String,
        /// Secret access key
        secret_key: String,
        /// Bucket name
        bucket: String,
        /// Optional region (defaults to "us-east-1")
        region: Option<String>,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Filesystem { path: None }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the canopy directory (~/.canopy)
    pub canopy_dir: PathBuf,
    /// Path to the SQLite database
    pub db_path: PathBuf,
    /// Path to the local object directory
    pub objects_path: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the canopy directory path (custom or default ~/.canopy)
    pub fn canopy_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new canopy state directory
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let canopy_dir = Self::canopy_dir(custom_path)?;

        if canopy_dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&canopy_dir)?;

        let objects_path = canopy_dir.join(OBJECTS_DIR_NAME);
        fs::create_dir_all(&objects_path)?;

        let config = config.unwrap_or_default();
        let config_path = canopy_dir.join(CONFIG_FILE_NAME);
        let config_toml = toml::to_string_pretty(&config)?;
        fs::write(&config_path, config_toml)?;

        // the service runs migrations on first start
        let db_path = canopy_dir.join(DB_FILE_NAME);
        fs::write(&db_path, "")?;

        Ok(Self {
            canopy_dir,
            db_path,
            objects_path,
            config_path,
            config,
        })
    }

    /// Load existing state from the canopy directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let canopy_dir = Self::canopy_dir(custom_path)?;

        if !canopy_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let db_path = canopy_dir.join(DB_FILE_NAME);
        let objects_path = canopy_dir.join(OBJECTS_DIR_NAME);
        let config_path = canopy_dir.join(CONFIG_FILE_NAME);

        if !db_path.exists() {
            return Err(StateError::MissingFile(DB_FILE_NAME.to_string()));
        }
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            canopy_dir,
            db_path,
            objects_path,
            config_path,
            config,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("canopy directory not initialized. Run 'canopy init' first")]
    NotInitialized,

    #[error("canopy directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
