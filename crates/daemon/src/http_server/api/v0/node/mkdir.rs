use axum::extract::{Json, State};
use axum::response::IntoResponse;
use common::engine::ops::{CreateFolderRequest, NodeSummary};
use common::prelude::UserId;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::NodeError;
use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct MkdirRequest {
    /// Folder to create the new folder in
    #[arg(long)]
    pub parent_id: Uuid,

    /// Name of the new folder
    #[arg(long)]
    pub name: String,

    /// User creating the folder
    #[arg(long)]
    pub actor: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<MkdirRequest>,
) -> Result<impl IntoResponse, NodeError> {
    let folder = state
        .engine()
        .create_folder(CreateFolderRequest {
            parent_id: req.parent_id,
            name: req.name,
            actor: UserId::from(req.actor),
        })
        .await?;

    tracing::info!(node_id = %folder.id, parent_id = %req.parent_id, "folder created");

    Ok((http::StatusCode::OK, Json(folder)).into_response())
}

impl ApiRequest for MkdirRequest {
    type Response = NodeSummary;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client
            .post(endpoint(base_url, "/api/v0/node/mkdir"))
            .json(&self)
    }
}
