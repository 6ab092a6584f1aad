//! API Error Handling
//!
//! Unified error types and conversion for API responses. This is the one
//! place where a failed request becomes an HTTP answer.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::service::PollError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    BadRequest(String),
    Forbidden,
    Fatal { message: String, detail: String },
}

impl ApiError {
    /// Wraps an unexpected failure with its full source chain
    pub fn fatal(message: impl Into<String>, err: impl Into<anyhow::Error>) -> Self {
        ApiError::Fatal {
            message: message.into(),
            detail: format!("{:#}", err.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "bad auth").into_response(),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": msg })),
            )
                .into_response(),
            ApiError::Forbidden => StatusCode::FORBIDDEN.into_response(),
            ApiError::Fatal { message, detail } => {
                tracing::error!("Internal error: {}: {}", message, detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": message, "detail": detail })),
                )
                    .into_response()
            }
        }
    }
}

impl From<PollError> for ApiError {
    fn from(err: PollError) -> Self {
        ApiError::fatal("poll failed", err)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
