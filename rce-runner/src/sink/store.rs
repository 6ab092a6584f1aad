//! Log store sink

use async_trait::async_trait;
use rce_core::domain::job::{ExitStatus, JobId};
use rce_core::keys::{chunk_key, exit_key};
use rce_core::retry::{RetryPolicy, retry};
use rce_core::store::LogStore;
use std::sync::Arc;
use tracing::debug;

use super::OutputSink;
use crate::error::SinkError;

/// Writes chunks and the exit record to the log store
///
/// Every write is retried under the configured policy; exhaustion is
/// returned to the runner.
pub struct StoreSink {
    store: Arc<dyn LogStore>,
    job_id: JobId,
    retry: RetryPolicy,
}

impl StoreSink {
    pub fn new(store: Arc<dyn LogStore>, job_id: JobId, retry: RetryPolicy) -> Self {
        Self {
            store,
            job_id,
            retry,
        }
    }

    async fn put(&self, key: String, body: Vec<u8>) -> Result<(), SinkError> {
        let result = retry(&self.retry, &format!("put {}", key), || {
            self.store.put(&key, body.clone())
        })
        .await;

        result.map_err(|source| SinkError::Store { key, source })
    }
}

#[async_trait]
impl OutputSink for StoreSink {
    async fn write_chunk(&mut self, cursor: u32, content: &str) -> Result<(), SinkError> {
        let key = chunk_key(&self.job_id, cursor);
        self.put(key, content.as_bytes().to_vec()).await?;
        debug!(
            "Wrote chunk {} ({} bytes) for job {}",
            cursor,
            content.len(),
            self.job_id
        );
        Ok(())
    }

    async fn write_exit(&mut self, status: ExitStatus) -> Result<(), SinkError> {
        self.put(exit_key(&self.job_id), status.to_record()).await?;
        debug!("Wrote exit {} for job {}", status.code(), self.job_id);
        Ok(())
    }
}
