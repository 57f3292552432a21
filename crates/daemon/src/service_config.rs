use std::path::PathBuf;
use std::time::Duration;

use common::prelude::EngineConfig;

use crate::state::StorageConfig;

#[derive(Debug, Clone)]
pub struct Config {
    // storage configuration
    /// Object storage backend for file versions
    pub storage: StorageConfig,
    /// Directory local object storage falls back to when no path is configured
    pub objects_dir: PathBuf,

    // http server configuration
    /// Port for the API HTTP server
    pub api_port: u16,

    // data store configuration
    /// a path to a sqlite database, if not set then an
    ///  in-memory database will be used
    pub sqlite_path: Option<PathBuf>,

    // engine configuration
    pub engine: EngineConfig,
    /// Interval between trash purges and reconciliation sweeps
    pub purge_interval: Duration,

    // logging
    pub log_level: tracing::Level,
    /// Directory for log files (optional, logs to stdout only if not set)
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::Memory,
            objects_dir: std::env::temp_dir().join("canopy-objects"),
            api_port: 5001,
            sqlite_path: None,
            engine: EngineConfig::default(),
            purge_interval: Duration::from_secs(60 * 60),
            log_level: tracing::Level::INFO,
            log_dir: None,
        }
    }
}
