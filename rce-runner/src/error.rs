//! Error types for the runner

use rce_core::store::StoreError;
use thiserror::Error;

/// Errors from an output sink
#[derive(Debug, Error)]
pub enum SinkError {
    /// A store write exhausted its retries
    #[error("store write to {key} failed: {source}")]
    Store {
        key: String,
        #[source]
        source: StoreError,
    },
}

/// Errors that end a run without a clean finalization
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Unrecoverable: the store could not be written
    #[error("fatal: {0}")]
    Fatal(#[from] SinkError),
}

pub type Result<T> = std::result::Result<T, RunnerError>;
