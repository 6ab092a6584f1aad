//! Caller authentication
//!
//! The API boundary only needs to turn an `auth` header value into a
//! principal name. Token issuance lives elsewhere.

use async_trait::async_trait;
use std::collections::HashMap;

/// Resolves credentials to principal names
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Returns the principal owning `token`, or `None` if it is unknown
    async fn authenticate(&self, token: &str) -> Option<String>;
}

/// Fixed token table loaded at startup
#[derive(Debug, Clone, Default)]
pub struct StaticTokens {
    tokens: HashMap<String, String>,
}

impl StaticTokens {
    /// Builds the table from a token to name map
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }

    /// Adds one principal
    pub fn with(mut self, name: impl Into<String>, token: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), name.into());
        self
    }
}

#[async_trait]
impl Authenticator for StaticTokens {
    async fn authenticate(&self, token: &str) -> Option<String> {
        if token.is_empty() {
            return None;
        }
        self.tokens.get(token).cloned()
    }
}
