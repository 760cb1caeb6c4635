//! Error handling
//!
//! One taxonomy for everything a request can surface: validation failures
//! are the caller's fault, backpressure is a retry signal, and anything
//! internal stays a 500 without leaking detail.

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed input, rejected before queueing. Never retried.
    #[error("{0}")]
    Validation(String),

    /// Input queue full. The caller owns the retry/backoff decision.
    #[error("service busy: input queue at capacity")]
    Backpressure,

    /// Pipeline is shutting down and no longer accepts readings.
    #[error("service unavailable: pipeline is shutting down")]
    Unavailable,

    /// Unexpected state. Logged in full, reported generically.
    #[allow(dead_code)]
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, reason, message) = match &self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation", msg.clone()),
            ApiError::Backpressure => (
                StatusCode::SERVICE_UNAVAILABLE,
                "backpressure",
                self.to_string(),
            ),
            ApiError::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "shutting_down",
                self.to_string(),
            ),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
            "reason": reason,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}
