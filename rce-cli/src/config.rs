//! Configuration module
//!
//! Handles CLI configuration: where the service lives and how to
//! authenticate against it.

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the RCE service
    pub url: String,
    /// Credential sent in the `auth` header
    pub auth: String,
}
