use axum::extract::{Json, State};
use axum::response::IntoResponse;
use common::engine::ops::EmptyTrashResponse;
use common::prelude::UserId;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use super::NodeError;
use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct EmptyTrashRequest {
    /// User whose trash is emptied
    #[arg(long)]
    pub actor: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<EmptyTrashRequest>,
) -> Result<impl IntoResponse, NodeError> {
    let actor = UserId::from(req.actor);
    let response = state.engine().empty_trash(&actor).await?;

    tracing::info!(
        actor = %actor,
        erased = response.erased,
        failed = response.failed,
        "trash emptied"
    );

    Ok((http::StatusCode::OK, Json(response)).into_response())
}

impl ApiRequest for EmptyTrashRequest {
    type Response = EmptyTrashResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client
            .post(endpoint(base_url, "/api/v0/node/empty-trash"))
            .json(&self)
    }
}
