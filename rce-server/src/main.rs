use anyhow::Context;
use rce_core::store::{FsLogStore, LogStore};
use rce_runner::JobRunner;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod service;
pub mod state;

#[cfg(test)]
mod e2e;

use config::{DispatchMode, ServerConfig};
use service::{Dispatcher, ProcessDispatcher, ReadGrants, StaticTokens, TaskDispatcher};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rce_server=debug,rce_runner=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    api::panic::install_hook();

    tracing::info!("Starting RCE server...");

    let config = ServerConfig::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    tracing::info!("Using log store at {}", config.store_dir.display());
    let store: Arc<dyn LogStore> = Arc::new(FsLogStore::new(&config.store_dir));

    let runner = JobRunner::new(config.runner.clone(), store.clone());
    let dispatcher: Arc<dyn Dispatcher> = match config.dispatch {
        DispatchMode::Task => Arc::new(TaskDispatcher::new(runner, store.clone())),
        DispatchMode::Process => {
            tracing::info!("Dispatching jobs to {}", config.runner_bin.display());
            Arc::new(ProcessDispatcher::new(&config.runner_bin, runner))
        }
    };

    let state = AppState::new(
        store,
        Arc::new(StaticTokens::new(config.auth_tokens.clone())),
        dispatcher,
        Arc::new(ReadGrants::new(&config.public_url, config.grant_ttl)),
    );

    // Build router with all API endpoints
    let app = api::create_router(state);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Server terminated")?;

    Ok(())
}
