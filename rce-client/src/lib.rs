//! RCE HTTP Client
//!
//! Client side of the remote command execution API: submit a command, poll
//! for its chunks in order, and read each chunk through the delegated URL
//! the server hands out.
//!
//! # Example
//!
//! ```no_run
//! use rce_client::{Poller, PollerConfig, RceClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = RceClient::new("http://localhost:8080", "s3cret");
//!     let poller = Poller::new(client, PollerConfig::default());
//!
//!     let status = poller
//!         .execute(vec!["echo".into(), "hi".into()], None, |chunk| println!("{}", chunk))
//!         .await?;
//!
//!     println!("exit status: {}", status);
//!     Ok(())
//! }
//! ```

pub mod error;
mod exec;
pub mod poller;
pub mod transport;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use poller::{PUSH_SENTINEL, Poller, PollerConfig};
pub use transport::{ExecTransport, FetchReply, PollReply};

use reqwest::Client;
use serde::de::DeserializeOwned;

/// Header carrying the caller's credential
pub const AUTH_HEADER: &str = "auth";

/// HTTP client for the RCE API
///
/// Each method is a single attempt; retries belong to the [`Poller`].
#[derive(Debug, Clone)]
pub struct RceClient {
    /// Base URL of the service (e.g., "http://localhost:8080")
    base_url: String,
    /// Credential sent with every API call
    auth: String,
    /// HTTP client instance
    client: Client,
}

impl RceClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the API (e.g., "http://localhost:8080")
    /// * `auth` - The credential for the `auth` header
    pub fn new(base_url: impl Into<String>, auth: impl Into<String>) -> Self {
        Self::with_client(base_url, auth, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, auth: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth: auth.into(),
            client,
        }
    }

    /// Get the base URL of the service
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// This method checks the status code and returns an appropriate error if
    /// the request failed, or deserializes the response body if successful.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let response = self.check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Turns a non-success status into an error
    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized);
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(response)
    }
}
