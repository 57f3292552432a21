#[allow(clippy::module_inception)]
mod client;
mod error;

pub use client::ApiClient;
pub use error::ApiError;

use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;

pub trait ApiRequest {
    type Response: DeserializeOwned;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder;
}

/// Join an API path onto the daemon's base url.
///
/// Paths are compile-time constants, so a failed join can only come from an
/// unusable base; fall back to the base itself and let the request fail there.
pub(crate) fn endpoint(base_url: &Url, path: &str) -> Url {
    base_url.join(path).unwrap_or_else(|e| {
        tracing::warn!(base = %base_url, path, "failed to build endpoint url: {}", e);
        base_url.clone()
    })
}
