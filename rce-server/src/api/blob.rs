//! Delegated-read endpoint

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::api::error::{ApiError, ApiResult};
use crate::state::AppState;

/// GET /blob/{grant}
/// Chunk bytes behind a live grant; 403 for unknown grants and for objects
/// that are not visible yet
pub async fn fetch(State(state): State<AppState>, Path(grant): Path<String>) -> ApiResult<Response> {
    let key = state.grants.resolve(&grant).ok_or(ApiError::Forbidden)?;

    match state.store.get(&key).await {
        Ok(Some(body)) => Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()),
        Ok(None) => {
            tracing::debug!("Object {} not visible yet", key);
            Err(ApiError::Forbidden)
        }
        Err(e) => Err(ApiError::fatal("store read failed", e)),
    }
}
