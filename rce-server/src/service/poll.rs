//! Poll Service
//!
//! Answers "what comes after cursor N" for a job without ever skipping a
//! chunk under an eventually consistent store.
//!
//! The runner writes its last chunk before the exit record, but a reader may
//! observe the two in any order. A terminal answer is therefore only given
//! after the chunk at the cursor was missed twice, once before and once
//! after the exit record was seen.

use rce_core::domain::job::{ExitStatus, JobId};
use rce_core::keys::{chunk_key, exit_key};
use rce_core::retry::{RetryPolicy, retry};
use rce_core::store::{LogStore, StoreError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::service::grants::ReadGrants;

/// Result of one poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The chunk at the cursor exists; the URL reads it
    More(String),
    /// The job finished and every chunk before the cursor was delivered
    Terminal(ExitStatus),
    /// Nothing new yet
    NotReady,
}

/// Service error type
#[derive(Debug, Error)]
pub enum PollError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("exit record {key} is not a status: {body:?}")]
    CorruptExitRecord { key: String, body: String },
}

/// Store reads inside one poll are short; the client retries the poll itself
const PROBE_RETRY: RetryPolicy =
    RetryPolicy::new(3, Duration::from_millis(50), Duration::from_millis(200));

pub struct PollHandler {
    store: Arc<dyn LogStore>,
    grants: Arc<ReadGrants>,
}

impl PollHandler {
    pub fn new(store: Arc<dyn LogStore>, grants: Arc<ReadGrants>) -> Self {
        Self { store, grants }
    }

    /// Runs the probe sequence for `cursor`
    pub async fn poll(&self, job_id: &JobId, cursor: u32) -> Result<PollOutcome, PollError> {
        let chunk = chunk_key(job_id, cursor);

        if self.exists(&chunk).await? {
            return Ok(self.more(&chunk));
        }

        let exit = exit_key(job_id);
        if !self.exists(&exit).await? {
            return Ok(PollOutcome::NotReady);
        }

        // exit is visible, the final chunk may still be propagating
        if self.exists(&chunk).await? {
            return Ok(self.more(&chunk));
        }

        let body = {
            let store = &self.store;
            let key = exit.as_str();
            retry(&PROBE_RETRY, "exit record read", || store.get(key)).await?
        };

        let Some(body) = body else {
            tracing::debug!("Exit record {} listed but not readable yet", exit);
            return Ok(PollOutcome::NotReady);
        };

        match ExitStatus::parse_record(&body) {
            Some(status) => {
                tracing::debug!("Job {} terminal at cursor {}: {}", job_id, cursor, status);
                Ok(PollOutcome::Terminal(status))
            }
            None => Err(PollError::CorruptExitRecord {
                key: exit,
                body: String::from_utf8_lossy(&body).to_string(),
            }),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let store = &self.store;
        retry(&PROBE_RETRY, "store probe", || store.exists(key)).await
    }

    fn more(&self, key: &str) -> PollOutcome {
        PollOutcome::More(self.grants.issue(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rce_core::store::MemoryLogStore;
    use std::sync::Mutex;

    fn job() -> JobId {
        JobId::parse("1700000000.poll").unwrap()
    }

    fn handler(store: Arc<dyn LogStore>) -> (PollHandler, Arc<ReadGrants>) {
        let grants = Arc::new(ReadGrants::new("http://rce.test", Duration::from_secs(60)));
        (PollHandler::new(store, grants.clone()), grants)
    }

    fn grant_key(grants: &ReadGrants, outcome: &PollOutcome) -> String {
        match outcome {
            PollOutcome::More(url) => grants.resolve(url.rsplit('/').next().unwrap()).unwrap(),
            other => panic!("expected More, got {:?}", other),
        }
    }

    /// Makes the final chunk and the exit record appear together right
    /// after the first miss on the chunk, before the exit probe.
    struct RaceStore {
        inner: MemoryLogStore,
        pending: Mutex<Option<(String, String)>>,
        probes: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LogStore for RaceStore {
        async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), StoreError> {
            self.inner.put(key, body).await
        }

        async fn exists(&self, key: &str) -> Result<bool, StoreError> {
            self.probes.lock().unwrap().push(key.to_string());
            let seen = self.inner.exists(key).await?;

            let release = self.pending.lock().unwrap().take();
            if let Some((chunk, exit)) = release {
                self.inner.put(&chunk, b"last".to_vec()).await?;
                self.inner.put(&exit, b"0".to_vec()).await?;
            }
            Ok(seen)
        }

        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
            self.inner.get(key).await
        }
    }

    #[tokio::test]
    async fn test_not_ready_before_anything_is_written() {
        let (handler, _) = handler(Arc::new(MemoryLogStore::new()));
        assert_eq!(handler.poll(&job(), 0).await.unwrap(), PollOutcome::NotReady);
    }

    #[tokio::test]
    async fn test_more_points_at_the_cursor_chunk() {
        let store = MemoryLogStore::new();
        store.put(&chunk_key(&job(), 0), b"a".to_vec()).await.unwrap();
        store.put(&chunk_key(&job(), 1), b"b".to_vec()).await.unwrap();

        let (handler, grants) = handler(Arc::new(store));
        let outcome = handler.poll(&job(), 1).await.unwrap();
        assert_eq!(grant_key(&grants, &outcome), chunk_key(&job(), 1));
    }

    #[tokio::test]
    async fn test_terminal_after_last_chunk() {
        let store = MemoryLogStore::new();
        store.put(&chunk_key(&job(), 0), b"hi".to_vec()).await.unwrap();
        store.put(&exit_key(&job()), b"1".to_vec()).await.unwrap();

        let (handler, _) = handler(Arc::new(store));
        assert!(matches!(handler.poll(&job(), 0).await.unwrap(), PollOutcome::More(_)));
        assert_eq!(
            handler.poll(&job(), 1).await.unwrap(),
            PollOutcome::Terminal(ExitStatus::Failure)
        );
    }

    #[tokio::test]
    async fn test_terminal_is_sticky_past_the_last_chunk() {
        let store = MemoryLogStore::new();
        store.put(&exit_key(&job()), b"0".to_vec()).await.unwrap();

        let (handler, _) = handler(Arc::new(store));
        for cursor in [0, 1, 7, 7] {
            assert_eq!(
                handler.poll(&job(), cursor).await.unwrap(),
                PollOutcome::Terminal(ExitStatus::Success)
            );
        }
    }

    #[tokio::test]
    async fn test_final_chunk_wins_over_simultaneous_exit() {
        let store = Arc::new(RaceStore {
            inner: MemoryLogStore::new(),
            pending: Mutex::new(Some((chunk_key(&job(), 3), exit_key(&job())))),
            probes: Mutex::new(Vec::new()),
        });

        let (handler, grants) = handler(store.clone());
        let outcome = handler.poll(&job(), 3).await.unwrap();
        assert_eq!(grant_key(&grants, &outcome), chunk_key(&job(), 3));

        assert_eq!(
            *store.probes.lock().unwrap(),
            vec![chunk_key(&job(), 3), exit_key(&job()), chunk_key(&job(), 3)]
        );

        assert_eq!(
            handler.poll(&job(), 4).await.unwrap(),
            PollOutcome::Terminal(ExitStatus::Success)
        );
    }

    #[tokio::test]
    async fn test_corrupt_exit_record_is_an_error() {
        let store = MemoryLogStore::new();
        store.put(&exit_key(&job()), b"maybe".to_vec()).await.unwrap();

        let (handler, _) = handler(Arc::new(store));
        let err = handler.poll(&job(), 0).await.unwrap_err();
        assert!(matches!(err, PollError::CorruptExitRecord { .. }));
        assert!(err.to_string().contains("is not a status: \"maybe\""));
    }
}
