use axum::response::{IntoResponse, Response};
use axum::Json;
use common::prelude::EngineError;
use http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl NodeError {
    pub fn status(&self) -> StatusCode {
        match self {
            NodeError::BadRequest(_) => StatusCode::BAD_REQUEST,
            NodeError::Engine(e) => match e {
                EngineError::NotFound(_) => StatusCode::NOT_FOUND,
                EngineError::Forbidden { .. } => StatusCode::FORBIDDEN,
                EngineError::Conflict(_) => StatusCode::CONFLICT,
                EngineError::QuotaExceeded { .. } => StatusCode::INSUFFICIENT_STORAGE,
                EngineError::InvalidName(_) => StatusCode::BAD_REQUEST,
                EngineError::PartialCascadeFailure { .. }
                | EngineError::Store(_)
                | EngineError::Storage(_)
                | EngineError::Dispatch(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for NodeError {
    fn into_response(self) -> Response {
        let status = self.status();
        let msg = if status.is_server_error() {
            tracing::error!("node operation failed: {}", self);
            "Unexpected error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(serde_json::json!({ "msg": msg }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::engine::ConflictKind;
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (EngineError::NotFound(Uuid::nil()), StatusCode::NOT_FOUND),
            (
                EngineError::Conflict(ConflictKind::DuplicateName),
                StatusCode::CONFLICT,
            ),
            (
                EngineError::QuotaExceeded {
                    owner: "alice".to_string(),
                    requested: 10,
                    quota: 5,
                },
                StatusCode::INSUFFICIENT_STORAGE,
            ),
            (
                EngineError::InvalidName("a/b".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                EngineError::Store("disk on fire".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(NodeError::from(err).status(), status);
        }
    }

    #[test]
    fn test_internal_errors_are_not_leaked() {
        let response = NodeError::from(EngineError::Store("secret path".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
