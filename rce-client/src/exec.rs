//! Exec API endpoints

use async_trait::async_trait;
use rce_core::domain::job::JobId;
use rce_core::dto::exec::{ExecPostRequest, ExecPostResponse, PollResponse};
use reqwest::StatusCode;

use crate::error::Result;
use crate::transport::{ExecTransport, FetchReply, PollReply};
use crate::{AUTH_HEADER, RceClient};

#[async_trait]
impl ExecTransport for RceClient {
    /// Submit a command
    ///
    /// # Returns
    /// The id of the new job
    async fn submit(&self, request: &ExecPostRequest) -> Result<JobId> {
        let url = format!("{}/api/exec", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(AUTH_HEADER, &self.auth)
            .json(request)
            .send()
            .await?;

        let body: ExecPostResponse = self.handle_response(response).await?;
        Ok(body.uid)
    }

    /// Ask what follows `cursor`
    async fn poll(&self, uid: &JobId, cursor: u32) -> Result<PollReply> {
        let url = format!("{}/api/exec", self.base_url);
        let cursor = cursor.to_string();
        let response = self
            .client
            .get(&url)
            .header(AUTH_HEADER, &self.auth)
            .query(&[("uid", uid.as_str()), ("cursor", cursor.as_str())])
            .send()
            .await?;

        if response.status() == StatusCode::CONFLICT {
            return Ok(PollReply::NotReady);
        }

        let reply = match self.handle_response(response).await? {
            PollResponse::More { more_url } => PollReply::More(more_url),
            PollResponse::Exit { exit } => PollReply::Exit(exit),
        };
        Ok(reply)
    }

    /// Read a chunk through its delegated URL
    ///
    /// The URL is already authorized, no credential is sent.
    async fn fetch(&self, url: &str) -> Result<FetchReply> {
        let response = self.client.get(url).send().await?;

        match response.status() {
            StatusCode::FORBIDDEN | StatusCode::NOT_FOUND | StatusCode::RANGE_NOT_SATISFIABLE => {
                Ok(FetchReply::NotYetConsistent)
            }
            _ => {
                let response = self.check_status(response).await?;
                Ok(FetchReply::Content(response.text().await?))
            }
        }
    }
}
