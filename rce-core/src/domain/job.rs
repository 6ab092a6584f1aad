//! Job domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque job identifier
///
/// Generated as `{unix_seconds}.{uuid_v4}` so ids sort roughly by
/// submission time. Ids are also used as store key segments, so parsing
/// only accepts the characters a generated id can contain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JobId(String);

impl JobId {
    /// Allocates a fresh job id
    pub fn generate() -> Self {
        Self(format!(
            "{}.{}",
            chrono::Utc::now().timestamp(),
            Uuid::new_v4()
        ))
    }

    /// Parses a job id received over the wire
    pub fn parse(input: &str) -> Result<Self, InvalidJobId> {
        let valid = !input.is_empty()
            && input.len() <= 128
            && !input.starts_with('.')
            && input
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');

        if valid {
            Ok(Self(input.to_string()))
        } else {
            Err(InvalidJobId(input.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for JobId {
    type Error = InvalidJobId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        JobId::parse(&value)
    }
}

impl From<JobId> for String {
    fn from(id: JobId) -> Self {
        id.0
    }
}

/// Rejected job id
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid job id: {0:?}")]
pub struct InvalidJobId(pub String);

/// Coarse job outcome
///
/// Only success and failure survive the protocol; the child's exact
/// non-zero code, or the signal that killed it, is not recoverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitStatus {
    Success,
    Failure,
}

impl ExitStatus {
    /// Status code as written to the exit record
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Failure => 1,
        }
    }

    /// Maps a process exit status onto the coarse status
    pub fn from_process(status: &std::process::ExitStatus) -> Self {
        if status.success() {
            ExitStatus::Success
        } else {
            ExitStatus::Failure
        }
    }

    /// Parses an exit record body
    pub fn parse_record(body: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(body).ok()?;
        match text.trim().parse::<i32>().ok()? {
            0 => Some(ExitStatus::Success),
            1 => Some(ExitStatus::Failure),
            _ => None,
        }
    }

    /// Exit record body
    pub fn to_record(self) -> Vec<u8> {
        self.code().to_string().into_bytes()
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Success => write!(f, "success"),
            ExitStatus::Failure => write!(f, "failure"),
        }
    }
}
