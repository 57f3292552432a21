use std::path::PathBuf;

use clap::Args;
use common::engine::ops::UploadOutcome;

use canopy_daemon::http_server::api::client::ApiError;
use canopy_daemon::http_server::api::v0::node::UploadRequest;

use crate::cli::op::{Op, OpContext};

#[derive(Args, Debug, Clone)]
pub struct Upload {
    #[command(flatten)]
    pub request: UploadRequest,

    /// Local file to upload
    #[arg(long)]
    pub path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("failed to read {0}: {1}")]
    Read(PathBuf, std::io::Error),
}

#[async_trait::async_trait]
impl Op for Upload {
    type Error = UploadError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let data = tokio::fs::read(&self.path)
            .await
            .map_err(|e| UploadError::Read(self.path.clone(), e))?;

        let mut request = self.request.clone();
        request.set_content(&data);

        let mut client = ctx.client.clone();
        let outcome = client.call(request).await?;

        Ok(match outcome {
            UploadOutcome::Created {
                node_id,
                version_id,
            } => format!("Created {} (version {})", node_id, version_id),
            UploadOutcome::Updated {
                node_id,
                version_id,
            } => format!("Updated {} (version {})", node_id, version_id),
            UploadOutcome::Redirected {
                reason,
                node_id,
                name,
                version_id,
            } => format!(
                "Saved as {:?} ({}, version {}) instead: {:?}",
                name, node_id, version_id, reason
            ),
        })
    }
}
