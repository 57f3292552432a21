use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio::time::timeout;

use super::data_source::StateDataSource;

/// SQLite and object storage each get their own call inside this budget.
const READINESS_TIMEOUT: Duration = Duration::from_secs(5);

#[tracing::instrument(skip(source))]
pub async fn handler(source: StateDataSource) -> Response {
    let result = match timeout(READINESS_TIMEOUT, source.is_ready()).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                timeout_secs = READINESS_TIMEOUT.as_secs(),
                "readiness check timed out"
            );
            return unavailable(None, "readiness check timed out".to_string());
        }
    };

    match result {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"status": "ok"}))).into_response(),
        Err(e) => {
            tracing::warn!(dependency = e.dependency(), error = %e, "not ready");
            unavailable(Some(e.dependency()), e.to_string())
        }
    }
}

fn unavailable(dependency: Option<&'static str>, message: String) -> Response {
    let body = serde_json::json!({
        "status": "failure",
        "dependency": dependency,
        "message": message,
    });
    (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::to_bytes;

    use super::*;
    use crate::http_server::health::data_source::tests::MockReadiness;

    async fn body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_ready() {
        let response = handler(StateDataSource::new(Arc::new(MockReadiness::Ready))).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_names_the_failed_dependency() {
        let response = handler(StateDataSource::new(Arc::new(MockReadiness::Down(
            "object_store",
        ))))
        .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = body(response).await;
        assert_eq!(body["status"], "failure");
        assert_eq!(body["dependency"], "object_store");
    }
}
