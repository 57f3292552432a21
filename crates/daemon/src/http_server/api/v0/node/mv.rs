use axum::extract::{Json, State};
use axum::response::IntoResponse;
use common::engine::ops::MoveRequest;
use common::prelude::UserId;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::NodeError;
use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct MvRequest {
    /// Node to move
    #[arg(long)]
    pub node_id: Uuid,

    /// The node is a folder
    #[arg(long)]
    #[serde(default)]
    pub is_folder: bool,

    /// Folder to move it into
    #[arg(long)]
    pub new_parent_id: Uuid,

    /// User performing the move
    #[arg(long)]
    pub actor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MvResponse {
    pub node_id: Uuid,
    pub new_parent_id: Uuid,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<MvRequest>,
) -> Result<impl IntoResponse, NodeError> {
    state
        .engine()
        .mv(MoveRequest {
            node_id: req.node_id,
            is_folder: req.is_folder,
            new_parent_id: req.new_parent_id,
            actor: UserId::from(req.actor),
        })
        .await?;

    tracing::info!(node_id = %req.node_id, new_parent_id = %req.new_parent_id, "node moved");

    Ok((
        http::StatusCode::OK,
        Json(MvResponse {
            node_id: req.node_id,
            new_parent_id: req.new_parent_id,
        }),
    )
        .into_response())
}

impl ApiRequest for MvRequest {
    type Response = MvResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client
            .post(endpoint(base_url, "/api/v0/node/mv"))
            .json(&self)
    }
}
