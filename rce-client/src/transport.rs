//! Transport seam between the poller and the HTTP client

use async_trait::async_trait;
use rce_core::domain::job::JobId;
use rce_core::dto::exec::ExecPostRequest;

use crate::error::Result;

/// Answer to one poll request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollReply {
    /// Read the next chunk from this URL
    More(String),
    /// The job finished with this status
    Exit(i32),
    /// Nothing new yet (409)
    NotReady,
}

/// Answer to one content fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchReply {
    Content(String),
    /// The object is not visible through the URL yet (403, 404 or 416)
    NotYetConsistent,
}

/// The three calls a poller makes, one attempt each
#[async_trait]
pub trait ExecTransport: Send + Sync {
    async fn submit(&self, request: &ExecPostRequest) -> Result<JobId>;

    async fn poll(&self, uid: &JobId, cursor: u32) -> Result<PollReply>;

    async fn fetch(&self, url: &str) -> Result<FetchReply>;
}
