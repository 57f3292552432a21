use axum::extract::{Json, State};
use axum::response::IntoResponse;
use common::engine::ops::LifecycleRequest;
use common::prelude::UserId;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{NodeAck, NodeError};
use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct TrashRequest {
    /// Node to move to the trash
    #[arg(long)]
    pub node_id: Uuid,

    /// The node is a folder
    #[arg(long)]
    #[serde(default)]
    pub is_folder: bool,

    /// Owner of the node
    #[arg(long)]
    pub actor: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<TrashRequest>,
) -> Result<impl IntoResponse, NodeError> {
    state
        .engine()
        .trash(LifecycleRequest {
            node_id: req.node_id,
            is_folder: req.is_folder,
            actor: UserId::from(req.actor),
            force: false,
        })
        .await?;

    tracing::info!(node_id = %req.node_id, "node trashed");

    Ok((http::StatusCode::OK, Json(NodeAck { node_id: req.node_id })).into_response())
}

impl ApiRequest for TrashRequest {
    type Response = NodeAck;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client
            .post(endpoint(base_url, "/api/v0/node/trash"))
            .json(&self)
    }
}
