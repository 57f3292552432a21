use canopy_daemon::http_server::api::client::ApiError;
use canopy_daemon::http_server::api::v0::node::{
    EmptyTrashRequest, EraseRequest, RestoreRequest, SweepRequest, TrashRequest,
};

use crate::cli::op::{Op, OpContext};

#[async_trait::async_trait]
impl Op for TrashRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let ack = client.call(self.clone()).await?;
        Ok(format!("Moved {} to the trash", ack.node_id))
    }
}

#[async_trait::async_trait]
impl Op for RestoreRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let ack = client.call(self.clone()).await?;
        Ok(format!("Restored {}", ack.node_id))
    }
}

#[async_trait::async_trait]
impl Op for EraseRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let ack = client.call(self.clone()).await?;
        Ok(format!("Erased {}", ack.node_id))
    }
}

#[async_trait::async_trait]
impl Op for EmptyTrashRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let response = client.call(self.clone()).await?;
        let mut output = format!("Erased {} trashed node(s)", response.erased);
        if response.failed > 0 {
            output.push_str(&format!(", {} failed", response.failed));
        }
        Ok(output)
    }
}

#[async_trait::async_trait]
impl Op for SweepRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let response = client.call(self.clone()).await?;
        Ok(match response.report {
            Some(report) => format!(
                "Swept {}: {} node(s) scanned, {} orphan(s) erased, {} byte(s) in use",
                response.owner, report.scanned, report.orphans_erased, report.usage_bytes
            ),
            None => format!("Sweep queued for {}", response.owner),
        })
    }
}
