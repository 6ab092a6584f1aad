//! Poller
//!
//! Drives one job from submit to exit status, delivering chunks to a sink
//! in cursor order. Every call is bounded by the retry policy; a fetch that
//! reports the chunk as not yet visible is retried separately, since that
//! is the store catching up rather than a failure.

use rce_core::domain::job::JobId;
use rce_core::dto::exec::{ExecPostRequest, PushTargets};
use rce_core::retry::{RetryPolicy, retry_if};
use std::time::Duration;
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::transport::{ExecTransport, FetchReply, PollReply};

/// Status returned for push-mode jobs, which are never polled
pub const PUSH_SENTINEL: i32 = -1;

#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Bound and backoff for submit, poll and fetch calls
    pub retry: RetryPolicy,
    /// Pause after a not-ready poll
    pub not_ready_backoff: Duration,
    /// Pause before fetching a not-yet-visible chunk again
    pub not_consistent_backoff: Duration,
    /// Not-yet-visible answers tolerated for one URL before re-polling the
    /// cursor for a fresh one
    pub not_consistent_limit: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::new(7, Duration::from_millis(200), Duration::from_secs(5)),
            not_ready_backoff: Duration::from_millis(500),
            not_consistent_backoff: Duration::from_secs(1),
            not_consistent_limit: 30,
        }
    }
}

pub struct Poller<T> {
    transport: T,
    config: PollerConfig,
}

impl<T: ExecTransport> Poller<T> {
    pub fn new(transport: T, config: PollerConfig) -> Self {
        Self { transport, config }
    }

    /// Runs `argv` remotely and returns its exit status
    ///
    /// With push targets the output goes to those targets instead, and
    /// [`PUSH_SENTINEL`] is returned as soon as the job is accepted.
    pub async fn execute<F>(
        &self,
        argv: Vec<String>,
        push: Option<PushTargets>,
        sink: F,
    ) -> Result<i32>
    where
        F: FnMut(&str),
    {
        let push_mode = push.is_some();
        let uid = self.submit(argv, push).await?;

        if push_mode {
            return Ok(PUSH_SENTINEL);
        }

        self.follow(&uid, sink).await
    }

    /// Submits a job
    pub async fn submit(&self, argv: Vec<String>, push: Option<PushTargets>) -> Result<JobId> {
        let request = ExecPostRequest {
            argv,
            push_urls: push,
        };

        let transport = &self.transport;
        let request = &request;
        let uid = retry_if(
            &self.config.retry,
            "submit",
            || transport.submit(request),
            ClientError::is_retryable,
        )
        .await?;

        debug!("Submitted job {}", uid);
        Ok(uid)
    }

    /// Polls a submitted job to its end, feeding each chunk to `sink`
    pub async fn follow<F>(&self, uid: &JobId, mut sink: F) -> Result<i32>
    where
        F: FnMut(&str),
    {
        let transport = &self.transport;
        let mut cursor = 0;

        loop {
            let reply = retry_if(
                &self.config.retry,
                "poll",
                || transport.poll(uid, cursor),
                ClientError::is_retryable,
            )
            .await?;

            match reply {
                PollReply::More(url) => {
                    if let Some(content) = self.fetch(&url).await? {
                        sink(&content);
                        cursor += 1;
                    }
                }
                PollReply::NotReady => tokio::time::sleep(self.config.not_ready_backoff).await,
                PollReply::Exit(status) => {
                    debug!("Job {} exited with {} after {} chunk(s)", uid, status, cursor);
                    return Ok(status);
                }
            }
        }
    }

    /// Fetches one chunk, waiting out eventual consistency
    ///
    /// `None` means the URL never became readable and the cursor should be
    /// polled again.
    async fn fetch(&self, url: &str) -> Result<Option<String>> {
        let transport = &self.transport;

        for _ in 0..self.config.not_consistent_limit.max(1) {
            let reply = retry_if(
                &self.config.retry,
                "fetch",
                || transport.fetch(url),
                ClientError::is_retryable,
            )
            .await?;

            match reply {
                FetchReply::Content(content) => return Ok(Some(content)),
                FetchReply::NotYetConsistent => {
                    debug!("Chunk at {} not visible yet", url);
                    tokio::time::sleep(self.config.not_consistent_backoff).await;
                }
            }
        }

        Ok(None)
    }
}
