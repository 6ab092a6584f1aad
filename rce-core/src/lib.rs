//! RCE Core
//!
//! Core types and abstractions for remote command execution.
//!
//! This crate contains:
//! - Domain types: Job ids and coarse exit status
//! - DTOs: Wire types shared by the server, runner and client
//! - Store: The log store abstraction and the persisted key layout
//! - Retry: Bounded retry with backoff used for every store and network call
//! - Request log: Per-request log buffer persisted to the store

pub mod domain;
pub mod dto;
pub mod keys;
pub mod request_log;
pub mod retry;
pub mod store;
