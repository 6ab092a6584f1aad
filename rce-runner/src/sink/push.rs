//! Push target sink
//!
//! Delivers output straight to caller-supplied URLs with HTTP PUT:
//! - `log` receives the whole cumulative log on every flush
//! - `size` receives the byte length of the final log push, once, after it
//! - `exit` receives the status code, once
//!
//! Nothing reconciles receipt in this mode, so delivery failures are logged
//! and never fail the run.

use async_trait::async_trait;
use rce_core::domain::job::ExitStatus;
use rce_core::dto::exec::PushTargets;
use rce_core::retry::{RetryPolicy, retry};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use super::OutputSink;
use crate::error::SinkError;

/// Push-mode sink
pub struct PushSink {
    client: Client,
    targets: PushTargets,
    retry: RetryPolicy,
    log: String,
}

impl PushSink {
    pub fn new(client: Client, targets: PushTargets) -> Self {
        Self {
            client,
            targets,
            retry: RetryPolicy::new(3, Duration::from_millis(200), Duration::from_secs(1)),
            log: String::new(),
        }
    }

    /// Cumulative log delivered so far
    pub fn log(&self) -> &str {
        &self.log
    }

    async fn push(&self, what: &str, url: &str, body: Vec<u8>) {
        let result = retry(&self.retry, &format!("push {}", what), || {
            let request = self.client.put(url).body(body.clone());
            async move {
                let response = request.send().await?;
                response.error_for_status().map(|_| ())
            }
        })
        .await;

        match result {
            Ok(()) => debug!("Pushed {} ({} bytes)", what, body.len()),
            Err(e) => warn!("Push delivery of {} failed: {}", what, e),
        }
    }
}

#[async_trait]
impl OutputSink for PushSink {
    async fn write_chunk(&mut self, _cursor: u32, content: &str) -> Result<(), SinkError> {
        if !self.log.is_empty() {
            self.log.push('\n');
        }
        self.log.push_str(content);

        self.push("log", &self.targets.log, self.log.clone().into_bytes())
            .await;
        Ok(())
    }

    async fn write_exit(&mut self, status: ExitStatus) -> Result<(), SinkError> {
        let final_log = self.log.clone().into_bytes();
        let size = final_log.len();

        self.push("log", &self.targets.log, final_log).await;
        self.push("size", &self.targets.size, size.to_string().into_bytes())
            .await;
        self.push("exit", &self.targets.exit, status.to_record())
            .await;
        Ok(())
    }
}
