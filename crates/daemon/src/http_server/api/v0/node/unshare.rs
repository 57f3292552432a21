use axum::extract::{Json, State};
use axum::response::IntoResponse;
use common::engine::ops::{self, UnshareResponse};
use common::prelude::UserId;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::NodeError;
use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct UnshareRequest {
    /// Node to stop sharing
    #[arg(long)]
    pub node_id: Uuid,

    /// The node is a folder; access is revoked below it too
    #[arg(long)]
    #[serde(default)]
    pub is_folder: bool,

    /// User performing the change
    #[arg(long)]
    pub actor: String,

    /// User id or alias to remove (repeatable)
    #[arg(long = "collaborator", required = true)]
    pub collaborators: Vec<String>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<UnshareRequest>,
) -> Result<impl IntoResponse, NodeError> {
    let response = state
        .engine()
        .unshare(ops::UnshareRequest {
            node_id: req.node_id,
            is_folder: req.is_folder,
            actor: UserId::from(req.actor),
            collaborators_to_remove: req.collaborators,
        })
        .await?;

    tracing::info!(
        node_id = %req.node_id,
        affected = response.affected_collaborators.len(),
        "node unshared"
    );

    Ok((http::StatusCode::OK, Json(response)).into_response())
}

impl ApiRequest for UnshareRequest {
    type Response = UnshareResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client
            .post(endpoint(base_url, "/api/v0/node/unshare"))
            .json(&self)
    }
}
