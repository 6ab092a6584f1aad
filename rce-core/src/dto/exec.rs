//! Exec DTOs: submit, poll and the async runner event

use serde::{Deserialize, Serialize};

use crate::domain::job::JobId;

/// Caller-supplied write endpoints for push delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushTargets {
    /// Receives the cumulative log, repeatedly
    pub log: String,
    /// Receives the byte size of the final log push, once, last
    pub size: String,
    /// Receives the status code, once
    pub exit: String,
}

/// Request to submit a command
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExecPostRequest {
    pub argv: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_urls: Option<PushTargets>,
}

/// Response to a submit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecPostResponse {
    pub uid: JobId,
}

/// Poll query parameters
///
/// `cursor` is the index of the next chunk the client expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollQuery {
    pub uid: String,
    #[serde(default)]
    pub cursor: u32,
}

/// Successful poll response body
///
/// The "not ready" outcome has no body; it is carried by status 409.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PollResponse {
    More {
        #[serde(rename = "more-url")]
        more_url: String,
    },
    Exit {
        exit: i32,
    },
}

/// Event handed to the dispatcher and consumed by the runner
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExecEvent {
    pub uid: JobId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_name: Option<String>,
    pub argv: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_urls: Option<PushTargets>,
}
