//! API Module
//!
//! HTTP API layer for the exec service.
//! Each submodule handles endpoints for a specific concern.

pub mod blob;
pub mod error;
pub mod exec;
pub mod health;
pub mod middleware;
pub mod panic;

use axum::{
    Router,
    http::{HeaderName, Method, header},
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    // Authenticated endpoints
    let api = Router::new()
        .route("/api/exec", post(exec::submit).get(exec::poll))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_auth));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/blob/{grant}", get(blob::fetch))
        .merge(api)
        // Add state and middleware
        .layer(CatchPanicLayer::custom(panic::handle_panic))
        .layer(from_fn_with_state(state.clone(), middleware::log_request))
        .layer(cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::POST,
            Method::GET,
            Method::OPTIONS,
            Method::PUT,
            Method::DELETE,
        ])
        .allow_headers([
            HeaderName::from_static(middleware::AUTH_HEADER),
            header::CONTENT_TYPE,
        ])
}
