//! Data Transfer Objects for inter-service communication
//!
//! Field names follow the HTTP API (`push-urls`, `more-url`, ...), so every
//! struct here renames to kebab-case.

pub mod exec;
