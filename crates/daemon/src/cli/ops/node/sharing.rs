use canopy_daemon::http_server::api::client::ApiError;
use canopy_daemon::http_server::api::v0::node::{ShareRequest, UnshareRequest};

use crate::cli::op::{Op, OpContext};

fn join_users<T: std::fmt::Display>(users: &[T]) -> String {
    if users.is_empty() {
        return "nobody".to_string();
    }
    users
        .iter()
        .map(|u| u.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait::async_trait]
impl Op for ShareRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let response = client.call(self.clone()).await?;

        let mut output = format!(
            "Shared {} with {}",
            self.node_id,
            join_users(&response.affected_collaborators)
        );
        if !response.unresolved_identifiers.is_empty() {
            output.push_str(&format!(
                "\nUnknown users: {}",
                join_users(&response.unresolved_identifiers)
            ));
        }
        Ok(output)
    }
}

#[async_trait::async_trait]
impl Op for UnshareRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let response = client.call(self.clone()).await?;
        Ok(format!(
            "Revoked access to {} for {}",
            self.node_id,
            join_users(&response.affected_collaborators)
        ))
    }
}
