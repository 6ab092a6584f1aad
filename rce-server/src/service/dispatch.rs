//! Job dispatch
//!
//! A submit only has to hand the event to something that will run it and
//! acknowledge. Where the run happens is a deployment choice:
//! - `TaskDispatcher` runs it on this process's runtime
//! - `ProcessDispatcher` runs it in a fresh `rce-runner` process

use anyhow::Context;
use async_trait::async_trait;
use rce_core::dto::exec::ExecEvent;
use rce_core::request_log::{DEFAULT_FLUSH_EVERY, RequestLog};
use rce_core::store::LogStore;
use rce_runner::JobRunner;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{error, info, warn};

/// Hands exec events to a runner
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Returns once the event is accepted; the run continues afterwards
    async fn dispatch(&self, event: ExecEvent) -> anyhow::Result<()>;
}

/// Runs jobs as supervised tasks on the current runtime
pub struct TaskDispatcher {
    runner: JobRunner,
    store: Arc<dyn LogStore>,
}

impl TaskDispatcher {
    pub fn new(runner: JobRunner, store: Arc<dyn LogStore>) -> Self {
        Self { runner, store }
    }
}

#[async_trait]
impl Dispatcher for TaskDispatcher {
    async fn dispatch(&self, event: ExecEvent) -> anyhow::Result<()> {
        info!("Dispatching job {} to a local task", event.uid);
        tokio::spawn(supervise(self.runner.clone(), self.store.clone(), event));
        Ok(())
    }
}

/// Runs one job in its own task and contains whatever happens to it
///
/// A panicking run still gets an exit record so pollers terminate.
async fn supervise(runner: JobRunner, store: Arc<dyn LogStore>, event: ExecEvent) {
    let log = RequestLog::start(store, DEFAULT_FLUSH_EVERY);

    let run = {
        let runner = runner.clone();
        let event = event.clone();
        let log = log.clone();
        tokio::spawn(async move { runner.run(&event, &log).await })
    };

    match run.await {
        Ok(Ok(status)) => info!("Job {} finished: {}", event.uid, status),
        Ok(Err(e)) => {
            error!("Job {} failed: {}", event.uid, e);
            record_failure(&runner, &event).await;
        }
        Err(join_error) => {
            error!("Job {} runner died: {}", event.uid, join_error);
            log.line(format!("runner died {}: {}", event.uid, join_error));
            record_failure(&runner, &event).await;
        }
    }

    log.finish().await;
}

/// Writes exit 1 for a job whose runner may have ended without one
async fn record_failure(runner: &JobRunner, event: &ExecEvent) {
    if let Err(e) = runner.mark_failed(event).await {
        error!("Could not record failure exit for job {}: {}", event.uid, e);
    }
}

/// Runs each job in a separate runner process fed over stdin
///
/// A runner process that exits unsuccessfully gets a failure exit written
/// on its behalf, unless it already wrote one.
pub struct ProcessDispatcher {
    program: PathBuf,
    fallback: JobRunner,
}

impl ProcessDispatcher {
    /// `fallback` shares the runner processes' store and only writes exit
    /// records for runners that died
    pub fn new(program: impl Into<PathBuf>, fallback: JobRunner) -> Self {
        Self {
            program: program.into(),
            fallback,
        }
    }
}

#[async_trait]
impl Dispatcher for ProcessDispatcher {
    async fn dispatch(&self, event: ExecEvent) -> anyhow::Result<()> {
        let payload = serde_json::to_vec(&event).context("Failed to encode exec event")?;

        let mut child = Command::new(&self.program)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("Failed to start runner {}", self.program.display()))?;

        // a runner that dies before reading is handled with its exit status below
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(&payload).await {
                warn!("Failed to send exec event for job {} to runner: {}", event.uid, e);
            }
        }

        info!(
            "Dispatched job {} to runner process {:?}",
            event.uid,
            child.id()
        );

        let fallback = self.fallback.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => {
                    tracing::debug!("Runner for job {} exited", event.uid);
                    return;
                }
                Ok(status) => warn!("Runner for job {} exited with {}", event.uid, status),
                Err(e) => error!("Failed to wait for runner of job {}: {}", event.uid, e),
            }
            record_failure(&fallback, &event).await;
        });

        Ok(())
    }
}
