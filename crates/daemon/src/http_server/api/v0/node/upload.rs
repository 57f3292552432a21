use axum::extract::{Json, State};
use axum::response::IntoResponse;
use base64::Engine as _;
use bytes::Bytes;
use common::engine::ops::{self, UploadOutcome};
use common::prelude::UserId;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::NodeError;
use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct UploadRequest {
    /// Folder the file lives in
    #[arg(long)]
    pub parent_id: Uuid,

    /// File name
    #[arg(long)]
    pub name: String,

    /// User uploading the content
    #[arg(long)]
    pub actor: String,

    /// Existing file to overwrite; omit to create a new file
    #[arg(long)]
    #[serde(default)]
    pub file_id: Option<Uuid>,

    /// Version the new content was edited from
    #[arg(long)]
    #[serde(default)]
    pub base_change_id: Option<Uuid>,

    /// Base64 encoded content
    #[arg(skip)]
    pub content: String,
}

impl UploadRequest {
    pub fn set_content(&mut self, data: &[u8]) {
        self.content = base64::engine::general_purpose::STANDARD.encode(data);
    }
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<UploadRequest>,
) -> Result<impl IntoResponse, NodeError> {
    let content = base64::engine::general_purpose::STANDARD
        .decode(req.content.as_bytes())
        .map_err(|e| NodeError::BadRequest(format!("content is not valid base64: {}", e)))?;
    let size = content.len();

    let outcome = state
        .engine()
        .upload(ops::UploadRequest {
            parent_id: req.parent_id,
            name: req.name,
            actor: UserId::from(req.actor),
            file_id: req.file_id,
            base_change_id: req.base_change_id,
            content: Bytes::from(content),
        })
        .await?;

    match &outcome {
        UploadOutcome::Redirected {
            reason, node_id, ..
        } => tracing::info!(?reason, node_id = %node_id, size, "upload redirected to a copy"),
        _ => tracing::info!(node_id = %outcome.node_id(), size, "upload stored"),
    }

    Ok((http::StatusCode::OK, Json(outcome)).into_response())
}

impl ApiRequest for UploadRequest {
    type Response = UploadOutcome;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client
            .post(endpoint(base_url, "/api/v0/node/upload"))
            .json(&self)
    }
}
