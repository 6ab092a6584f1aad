//! Core domain types
//!
//! These types are shared between the server (poll handler), the runner
//! (sole writer of a job's chunks and exit record) and the client (poller).

pub mod job;
