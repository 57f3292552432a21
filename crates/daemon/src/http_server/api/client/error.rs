use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("HTTP status {0}: {1}")]
    HttpStatus(StatusCode, String),
}

impl ApiError {
    /// Status code of a rejected request, if the daemon answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::HttpStatus(status, _) => Some(*status),
            ApiError::Reqwest(e) => e.status(),
            ApiError::UrlParse(_) => None,
        }
    }

    /// The daemon's `{"msg": ...}` error message, falling back to the raw body.
    pub fn message(&self) -> String {
        match self {
            ApiError::HttpStatus(_, body) => serde_json::from_str::<serde_json::Value>(body)
                .ok()
                .and_then(|v| v.get("msg").and_then(|m| m.as_str()).map(str::to_string))
                .unwrap_or_else(|| body.clone()),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_prefers_json_msg() {
        let err = ApiError::HttpStatus(
            StatusCode::CONFLICT,
            r#"{"msg":"conflict: node is not in the trash"}"#.to_string(),
        );
        assert_eq!(err.status(), Some(StatusCode::CONFLICT));
        assert_eq!(err.message(), "conflict: node is not in the trash");

        let err = ApiError::HttpStatus(StatusCode::BAD_GATEWAY, "upstream down".to_string());
        assert_eq!(err.message(), "upstream down");
    }
}
