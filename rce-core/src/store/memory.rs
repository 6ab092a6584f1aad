//! In-memory log store

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{LogStore, StoreError, validate_key};

/// Process-local store, strongly consistent
///
/// Cloning shares the same objects. `fail_next_puts` makes the next puts
/// fail with `StoreError::Unavailable`, for exercising retry paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryLogStore {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    failing_puts: Arc<AtomicUsize>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the next `count` put calls
    pub fn fail_next_puts(&self, count: usize) {
        self.failing_puts.store(count, Ordering::SeqCst);
    }

    /// Sorted keys under a prefix
    pub fn keys(&self, prefix: &str) -> Vec<String> {
        let objects = self.lock();
        let mut keys: Vec<String> = objects
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// Object contents as text, for assertions
    pub fn text(&self, key: &str) -> Option<String> {
        self.lock()
            .get(key)
            .map(|body| String::from_utf8_lossy(body).to_string())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        // inserts are single calls, poisoning cannot leave a partial write
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn take_failure(&self) -> bool {
        self.failing_puts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), StoreError> {
        validate_key(key)?;
        if self.take_failure() {
            return Err(StoreError::Unavailable(format!("injected failure for {}", key)));
        }
        self.lock().insert(key.to_string(), body);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        validate_key(key)?;
        Ok(self.lock().contains_key(key))
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        validate_key(key)?;
        Ok(self.lock().get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clones_share_objects() {
        let store = MemoryLogStore::new();
        let other = store.clone();

        store.put("jobs/1.a/logs.00000", b"hi".to_vec()).await.unwrap();

        assert!(other.exists("jobs/1.a/logs.00000").await.unwrap());
        assert_eq!(other.text("jobs/1.a/logs.00000"), Some("hi".to_string()));
        assert_eq!(other.keys("jobs/1.a/"), vec!["jobs/1.a/logs.00000"]);
    }

    #[tokio::test]
    async fn test_injected_put_failures() {
        let store = MemoryLogStore::new();
        store.fail_next_puts(2);

        assert!(store.put("a", b"1".to_vec()).await.is_err());
        assert!(store.put("a", b"1".to_vec()).await.is_err());
        assert!(store.put("a", b"1".to_vec()).await.is_ok());
        assert_eq!(store.text("a"), Some("1".to_string()));
    }
}
