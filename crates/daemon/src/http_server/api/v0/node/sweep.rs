use axum::extract::{Json, State};
use axum::response::IntoResponse;
use common::engine::ops::SweepReport;
use common::prelude::UserId;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use super::NodeError;
use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct SweepRequest {
    /// Owner whose tree is repaired
    #[arg(long)]
    pub owner: String,

    /// Queue the sweep on the cascade worker instead of waiting for it
    #[arg(long)]
    #[serde(default)]
    pub background: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepResponse {
    pub owner: UserId,
    /// `None` when the sweep was queued
    pub report: Option<SweepReport>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<SweepRequest>,
) -> Result<impl IntoResponse, NodeError> {
    let owner = UserId::from(req.owner);

    let report = if req.background {
        state.engine().request_sweep(owner.clone())?;
        tracing::info!(owner = %owner, "sweep queued");
        None
    } else {
        let report = state.engine().sweep(&owner).await?;
        tracing::info!(
            owner = %owner,
            scanned = report.scanned,
            orphans_erased = report.orphans_erased,
            usage_bytes = report.usage_bytes,
            "sweep finished"
        );
        Some(report)
    };

    Ok((http::StatusCode::OK, Json(SweepResponse { owner, report })).into_response())
}

impl ApiRequest for SweepRequest {
    type Response = SweepResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client
            .post(endpoint(base_url, "/api/v0/node/sweep"))
            .json(&self)
    }
}
