use axum::extract::{Json, State};
use axum::response::IntoResponse;
use common::engine::ops::{self, CustomPermissions, ShareResponse};
use common::prelude::UserId;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::NodeError;
use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct ShareRequest {
    /// Node to share
    #[arg(long)]
    pub node_id: Uuid,

    /// The node is a folder; everything below it is shared too
    #[arg(long)]
    #[serde(default)]
    pub is_folder: bool,

    /// User performing the share
    #[arg(long)]
    pub actor: String,

    /// User id or alias to add as an editor (repeatable)
    #[arg(long = "editor")]
    #[serde(default)]
    pub editors: Vec<String>,

    /// User id or alias to add as a viewer (repeatable)
    #[arg(long = "viewer")]
    #[serde(default)]
    pub viewers: Vec<String>,

    /// Allow or forbid editors to manage sharing on this node
    #[arg(long)]
    #[serde(default)]
    pub editors_can_share: Option<bool>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<ShareRequest>,
) -> Result<impl IntoResponse, NodeError> {
    let response = state
        .engine()
        .share(ops::ShareRequest {
            node_id: req.node_id,
            is_folder: req.is_folder,
            actor: UserId::from(req.actor),
            editors_to_add: req.editors,
            viewers_to_add: req.viewers,
            custom_permissions: req
                .editors_can_share
                .map(|editors_can_share| CustomPermissions { editors_can_share }),
        })
        .await?;

    tracing::info!(
        node_id = %req.node_id,
        affected = response.affected_collaborators.len(),
        unresolved = response.unresolved_identifiers.len(),
        "node shared"
    );

    Ok((http::StatusCode::OK, Json(response)).into_response())
}

impl ApiRequest for ShareRequest {
    type Response = ShareResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client
            .post(endpoint(base_url, "/api/v0/node/share"))
            .json(&self)
    }
}
