//! Exec API Handlers
//!
//! Submit a command and poll for its output.

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rce_core::domain::job::JobId;
use rce_core::dto::exec::{ExecEvent, ExecPostRequest, ExecPostResponse, PollQuery, PollResponse};
use rce_core::request_log::RequestLog;

use crate::api::error::{ApiError, ApiResult};
use crate::api::middleware::Principal;
use crate::service::PollOutcome;
use crate::state::AppState;

/// POST /api/exec
/// Accept a command and dispatch it to a runner
pub async fn submit(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Extension(log): Extension<RequestLog>,
    Json(req): Json<ExecPostRequest>,
) -> ApiResult<Json<ExecPostResponse>> {
    if req.argv.is_empty() {
        return Err(ApiError::BadRequest("argv must not be empty".to_string()));
    }

    let uid = JobId::generate();
    tracing::info!(
        "Submitting job {} for {}: {:?} (push: {})",
        uid,
        principal.0,
        req.argv,
        req.push_urls.is_some()
    );
    log.line(format!("submit {} {:?}", uid, req.argv));

    let event = ExecEvent {
        uid: uid.clone(),
        auth_name: Some(principal.0),
        argv: req.argv,
        push_urls: req.push_urls,
    };

    state
        .dispatcher
        .dispatch(event)
        .await
        .map_err(|e| ApiError::fatal("dispatch failed", e))?;

    Ok(Json(ExecPostResponse { uid }))
}

/// GET /api/exec?uid=&cursor=
/// Next chunk URL, terminal status, or 409 when nothing is ready
pub async fn poll(State(state): State<AppState>, Query(query): Query<PollQuery>) -> ApiResult<Response> {
    let job_id = JobId::parse(&query.uid).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    tracing::debug!("Polling job {} at cursor {}", job_id, query.cursor);

    let response = match state.poll.poll(&job_id, query.cursor).await? {
        PollOutcome::More(url) => Json(PollResponse::More { more_url: url }).into_response(),
        PollOutcome::Terminal(status) => Json(PollResponse::Exit {
            exit: status.code(),
        })
        .into_response(),
        PollOutcome::NotReady => StatusCode::CONFLICT.into_response(),
    };

    Ok(response)
}
