//! RCE Runner
//!
//! Executes a single submitted command and publishes its output.
//!
//! Architecture:
//! - Configuration: Deadline, flush cadence and retry settings
//! - Services: Stream readers, line buffer, chunk aggregator, job runner
//! - Sinks: Where output goes (log store, or caller push targets)
//!
//! The runner entry point is [`JobRunner::run`]; it does not care how it was
//! dispatched, so the server can call it on an in-process task and the
//! `rce-runner` binary can call it for an event read from stdin.

pub mod config;
pub mod error;
pub mod service;
pub mod sink;

pub use config::RunnerConfig;
pub use error::{RunnerError, SinkError};
pub use service::JobRunner;
