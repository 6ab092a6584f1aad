//! Health check
//!
//! Liveness only: no store or dispatcher round trip, no auth.

use axum::{http::StatusCode, response::IntoResponse};

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
