use axum::extract::{Json, State};
use axum::response::IntoResponse;
use common::engine::ops::{ListRequest, ListResponse};
use common::prelude::UserId;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::NodeError;
use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct LsRequest {
    /// Folder to list (defaults to the actor's root folder)
    #[arg(long)]
    #[serde(default)]
    pub parent_id: Option<Uuid>,

    /// User listing the folder
    #[arg(long)]
    pub actor: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<LsRequest>,
) -> Result<impl IntoResponse, NodeError> {
    let response = state
        .engine()
        .list_children(ListRequest {
            parent_id: req.parent_id,
            actor: UserId::from(req.actor),
        })
        .await?;

    tracing::debug!(
        parent_id = %response.parent_id,
        children = response.children.len(),
        "folder listed"
    );

    Ok((http::StatusCode::OK, Json(response)).into_response())
}

impl ApiRequest for LsRequest {
    type Response = ListResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client
            .post(endpoint(base_url, "/api/v0/node/ls"))
            .json(&self)
    }
}
