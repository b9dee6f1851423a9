use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Upstream unreachable: {0}")]
    Upstream(String),

    #[error("Upstream answered {0}")]
    Status(u16),

    #[error("Upstream sent invalid JSON: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            ProxyError::Status(status.as_u16())
        } else if err.is_decode() {
            ProxyError::Decode(err.to_string())
        } else {
            ProxyError::Upstream(err.to_string())
        }
    }
}

/// Answers 200 with the `{success: false, error}` envelope.
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        tracing::warn!("{self}");
        let body = json!({ "success": false, "error": self.to_string() });
        (StatusCode::OK, Json(body)).into_response()
    }
}
