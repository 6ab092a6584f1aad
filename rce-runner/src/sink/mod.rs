//! Output sinks
//!
//! A sink is where a run delivers its chunks and its exit record: the log
//! store in pull mode, caller-supplied push targets in push mode.

mod push;
mod store;

pub use push::PushSink;
pub use store::StoreSink;

use async_trait::async_trait;
use rce_core::domain::job::ExitStatus;

use crate::error::SinkError;

/// Destination for a run's output
///
/// `write_chunk` is called with cursors 0, 1, 2, ... in order and
/// `write_exit` at most once, after the last chunk.
#[async_trait]
pub trait OutputSink: Send {
    async fn write_chunk(&mut self, cursor: u32, content: &str) -> Result<(), SinkError>;

    async fn write_exit(&mut self, status: ExitStatus) -> Result<(), SinkError>;
}
