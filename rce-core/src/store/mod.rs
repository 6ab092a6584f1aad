//! Log store
//!
//! Durable object store addressed by key. Implementations may be only
//! eventually consistent: a write is not guaranteed to be visible to the
//! next `exists`/`get`. Callers that need ordering (the poll handler)
//! must design around that.

mod fs;
mod memory;

pub use fs::FsLogStore;
pub use memory::MemoryLogStore;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from store operations
///
/// All variants are treated as transient by callers and retried.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid store key: {0:?}")]
    InvalidKey(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Key-addressed object store
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Writes an object; an existing object under the key is replaced
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), StoreError>;

    /// Checks whether an object is visible under the key
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Reads an object, `None` when it is not visible
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
}

/// Rejects keys that could escape a store root
pub(crate) fn validate_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && !key.starts_with('/')
        && key
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..");

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}
