use clap::Args;

use canopy_daemon::state::{AppConfig, AppState, StateError, StorageConfig};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// API server port
    #[arg(long, default_value_t = 5001)]
    pub api_port: u16,

    /// Keep file contents in memory instead of on disk
    #[arg(long)]
    pub memory_storage: bool,

    /// Days a trashed node is kept before it is erased
    #[arg(long)]
    pub trash_retention_days: Option<u32>,

    /// Per-owner byte quota (unlimited if not set)
    #[arg(long)]
    pub quota_bytes: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut config = AppConfig {
            api_port: self.api_port,
            ..Default::default()
        };
        if self.memory_storage {
            config.storage = StorageConfig::Memory;
        }
        if let Some(days) = self.trash_retention_days {
            config.engine.trash_retention_days = days;
        }
        config.engine.quota_bytes = self.quota_bytes;

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;

        let output = format!(
            "Initialized canopy directory at: {}\n\
             - Database: {}\n\
             - Objects: {}\n\
             - Config: {}\n\
             - API port: {}\n\
             - Trash retention: {} days",
            state.canopy_dir.display(),
            state.db_path.display(),
            state.objects_path.display(),
            state.config_path.display(),
            state.config.api_port,
            state.config.engine.trash_retention_days,
        );

        Ok(output)
    }
}
