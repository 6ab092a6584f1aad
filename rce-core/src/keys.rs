//! Persisted key layout
//!
//! Per job: immutable chunk objects `jobs/{id}/logs.{cursor:05}` and one
//! exit marker `jobs/{id}/exit`. Service logs live under `logs/`.

use crate::domain::job::JobId;

/// Key of the chunk at `cursor`
pub fn chunk_key(job_id: &JobId, cursor: u32) -> String {
    format!("jobs/{}/logs.{:05}", job_id, cursor)
}

/// Key of the exit record
pub fn exit_key(job_id: &JobId) -> String {
    format!("jobs/{}/exit", job_id)
}

/// Key of one request-log flush
pub fn request_log_key(unix: i64, request_id: &str, count: u32) -> String {
    format!("logs/{}.{}.{:03}", unix, request_id, count)
}
