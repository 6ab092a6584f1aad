//! Service layer
//!
//! Services contain the runner's business logic: capturing the child's
//! output streams, buffering lines, batching them into chunks and driving
//! a run to its exit record.

pub mod aggregator;
pub mod execution;
pub mod log_buffer;
pub mod stream;

// Re-export traits
pub use log_buffer::LineBuffer;

// Re-export implementations
pub use aggregator::Aggregator;
pub use execution::JobRunner;
pub use log_buffer::InMemoryLineBuffer;
pub use stream::StreamRecord;
