use axum::extract::{Json, State};
use axum::response::IntoResponse;
use common::engine::ops;
use common::prelude::UserId;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::NodeError;
use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct RenameRequest {
    /// Node to rename
    #[arg(long)]
    pub node_id: Uuid,

    /// New name
    #[arg(long)]
    pub name: String,

    /// User performing the rename
    #[arg(long)]
    pub actor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameResponse {
    pub node_id: Uuid,
    pub name: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<RenameRequest>,
) -> Result<impl IntoResponse, NodeError> {
    state
        .engine()
        .rename(ops::RenameRequest {
            node_id: req.node_id,
            name: req.name.clone(),
            actor: UserId::from(req.actor),
        })
        .await?;

    tracing::info!(node_id = %req.node_id, name = %req.name, "node renamed");

    Ok((
        http::StatusCode::OK,
        Json(RenameResponse {
            node_id: req.node_id,
            name: req.name,
        }),
    )
        .into_response())
}

impl ApiRequest for RenameRequest {
    type Response = RenameResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client
            .post(endpoint(base_url, "/api/v0/node/rename"))
            .json(&self)
    }
}
