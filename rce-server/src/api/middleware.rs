//! Request middleware
//!
//! `log_request` wraps every route: it opens a `RequestLog`, hands it to
//! the handler through request extensions, records the summary line and
//! flushes the log before the response leaves. `require_auth` guards the
//! `/api` routes.

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use rce_core::request_log::RequestLog;
use std::time::Instant;

use crate::api::error::ApiError;
use crate::state::AppState;

/// Name of the header carrying the caller's credential
pub const AUTH_HEADER: &str = "auth";

/// Authenticated caller, available to handlers behind `require_auth`
#[derive(Debug, Clone)]
pub struct Principal(pub String);

pub async fn log_request(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let log = RequestLog::start(state.store.clone(), state.log_flush_every);
    let path = request.uri().path().to_string();
    let started = Instant::now();

    request.extensions_mut().insert(log.clone());
    let response = next.run(request).await;

    log.line(format!(
        "{} {} {}ms {}",
        response.status().as_u16(),
        path,
        started.elapsed().as_millis(),
        Utc::now().to_rfc3339()
    ));
    log.finish().await;

    response
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if request.method() == Method::OPTIONS {
        return Ok(next.run(request).await);
    }

    let token = request
        .headers()
        .get(AUTH_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_default();

    let Some(name) = state.auth.authenticate(&token).await else {
        tracing::warn!("Rejected {} {}: bad auth", request.method(), request.uri().path());
        return Err(ApiError::Unauthorized);
    };

    if let Some(log) = request.extensions().get::<RequestLog>() {
        log.line(format!("auth {}", name));
    }
    request.extensions_mut().insert(Principal(name));

    Ok(next.run(request).await)
}
