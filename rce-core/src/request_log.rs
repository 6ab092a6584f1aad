//! Per-request log collaborator
//!
//! A `RequestLog` owns a line buffer and a background task that persists
//! buffered lines to the store every few seconds under
//! `logs/{unix}.{request_id}.{count:03}`. Whoever opens a log calls
//! [`RequestLog::finish`] at the end of the request, which stops the task
//! and flushes what is left. Lines are also emitted through `tracing`.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::keys::request_log_key;
use crate::retry::{RetryPolicy, retry};
use crate::store::LogStore;

/// Default cadence of the background flush
pub const DEFAULT_FLUSH_EVERY: Duration = Duration::from_secs(5);

/// Cloneable handle to one request's log
#[derive(Clone)]
pub struct RequestLog {
    inner: Arc<Inner>,
}

struct Inner {
    id: String,
    lines: Mutex<Vec<String>>,
    count: AtomicU32,
    store: Arc<dyn LogStore>,
    retry: RetryPolicy,
    stop: Arc<Notify>,
    flusher: Mutex<Option<JoinHandle<()>>>,
}

impl RequestLog {
    /// Opens a log and starts its periodic flush task
    pub fn start(store: Arc<dyn LogStore>, flush_every: Duration) -> Self {
        let inner = Arc::new(Inner {
            id: Uuid::new_v4().to_string(),
            lines: Mutex::new(Vec::new()),
            count: AtomicU32::new(0),
            store,
            retry: RetryPolicy::default(),
            stop: Arc::new(Notify::new()),
            flusher: Mutex::new(None),
        });

        let handle = tokio::spawn(flush_loop(
            Arc::downgrade(&inner),
            inner.stop.clone(),
            flush_every,
        ));
        *lock(&inner.flusher) = Some(handle);

        Self { inner }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Records a line
    pub fn line(&self, message: impl Into<String>) {
        let message = message.into();
        info!(request_id = %self.inner.id, "{}", message);
        lock(&self.inner.lines).push(message);
    }

    /// Lines not yet flushed
    pub fn pending(&self) -> usize {
        lock(&self.inner.lines).len()
    }

    /// Stops the periodic task and flushes remaining lines
    pub async fn finish(&self) {
        let handle = lock(&self.inner.flusher).take();
        if let Some(handle) = handle {
            // an in-progress periodic flush completes before the task stops
            self.inner.stop.notify_one();
            let _ = handle.await;
        }
        self.inner.flush().await;
    }
}

impl Inner {
    async fn flush(&self) {
        let lines = std::mem::take(&mut *lock(&self.lines));
        if lines.is_empty() {
            return;
        }

        let mut text = lines.join("\n");
        text.push('\n');

        let count = self.count.fetch_add(1, Ordering::SeqCst);
        let key = request_log_key(chrono::Utc::now().timestamp(), &self.id, count);

        let body = text.into_bytes();
        let result = retry(&self.retry, "request log flush", || {
            self.store.put(&key, body.clone())
        })
        .await;

        match result {
            Ok(()) => debug!("Flushed {} request log line(s) to {}", lines.len(), key),
            Err(e) => error!("Dropping {} request log line(s): {}", lines.len(), e),
        }
    }
}

async fn flush_loop(inner: Weak<Inner>, stop: Arc<Notify>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = stop.notified() => return,
            _ = ticker.tick() => match inner.upgrade() {
                Some(inner) => inner.flush().await,
                None => return,
            },
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryLogStore;

    #[tokio::test]
    async fn test_finish_flushes_remaining_lines() {
        let store = MemoryLogStore::new();
        let log = RequestLog::start(Arc::new(store.clone()), Duration::from_secs(3600));

        log.line("auth: alice");
        log.line("200 /api/exec");
        assert_eq!(log.pending(), 2);

        log.finish().await;

        let keys = store.keys("logs/");
        assert_eq!(keys.len(), 1);
        assert!(keys[0].ends_with(&format!("{}.000", log.id())));
        assert_eq!(
            store.text(&keys[0]).unwrap(),
            "auth: alice\n200 /api/exec\n"
        );
        assert_eq!(log.pending(), 0);
    }

    #[tokio::test]
    async fn test_finish_without_lines_writes_nothing() {
        let store = MemoryLogStore::new();
        let log = RequestLog::start(Arc::new(store.clone()), Duration::from_secs(3600));

        log.finish().await;

        assert!(store.keys("logs/").is_empty());
    }

    #[tokio::test]
    async fn test_periodic_flush_numbers_objects() {
        let store = MemoryLogStore::new();
        let log = RequestLog::start(Arc::new(store.clone()), Duration::from_millis(20));

        log.line("first");
        tokio::time::sleep(Duration::from_millis(80)).await;
        log.line("second");
        log.finish().await;

        let keys = store.keys("logs/");
        assert_eq!(keys.len(), 2);
        assert!(keys[0].ends_with(".000"));
        assert!(keys[1].ends_with(".001"));
    }
}
