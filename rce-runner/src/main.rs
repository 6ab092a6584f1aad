//! RCE Runner binary
//!
//! Reads one exec event as JSON from stdin and runs it against the
//! filesystem store at `RCE_STORE_DIR`.

use anyhow::{Context, Result};
use rce_core::dto::exec::ExecEvent;
use rce_core::request_log::{DEFAULT_FLUSH_EVERY, RequestLog};
use rce_core::store::FsLogStore;
use rce_runner::{JobRunner, RunnerConfig};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rce_runner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = RunnerConfig::from_env().context("Failed to load runner configuration")?;
    config.validate()?;

    let store_dir = std::env::var("RCE_STORE_DIR").unwrap_or_else(|_| "/tmp/rce-store".to_string());
    let store = Arc::new(FsLogStore::new(&store_dir));

    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("Failed to read exec event from stdin")?;
    let event: ExecEvent = serde_json::from_str(&input).context("Failed to parse exec event")?;

    info!("Running job {} against store {}", event.uid, store_dir);

    let runner = JobRunner::new(config, store.clone());
    let log = RequestLog::start(store, DEFAULT_FLUSH_EVERY);
    let result = runner.run(&event, &log).await;
    log.finish().await;

    match result {
        Ok(status) => {
            info!("Job {} finished: {}", event.uid, status);
            Ok(())
        }
        Err(e) => {
            error!("Job {} failed: {}", event.uid, e);
            Err(e.into())
        }
    }
}
