use canopy_daemon::http_server::api::client::ApiError;
use canopy_daemon::http_server::api::v0::node::{LsRequest, MkdirRequest, MvRequest, RenameRequest};
use common::prelude::NodeKind;

use crate::cli::op::{Op, OpContext};

#[async_trait::async_trait]
impl Op for MvRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let response = client.call(self.clone()).await?;
        Ok(format!(
            "Moved {} into {}",
            response.node_id, response.new_parent_id
        ))
    }
}

#[async_trait::async_trait]
impl Op for RenameRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let response = client.call(self.clone()).await?;
        Ok(format!("Renamed {} to {}", response.node_id, response.name))
    }
}

#[async_trait::async_trait]
impl Op for MkdirRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let folder = client.call(self.clone()).await?;
        Ok(format!("Created folder {} ({})", folder.name, folder.id))
    }
}

#[async_trait::async_trait]
impl Op for LsRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let response = client.call(self.clone()).await?;

        if response.children.is_empty() {
            return Ok(format!("{} is empty", response.parent_id));
        }

        let output = response
            .children
            .iter()
            .map(|child| {
                let name = match child.kind {
                    NodeKind::Folder => format!("{}/", child.name),
                    NodeKind::File => child.name.clone(),
                };
                format!("{}  {:>10}  {}  {}", child.id, child.size, child.owner, name)
            })
            .collect::<Vec<_>>()
            .join("\n");
        Ok(output)
    }
}
