//! Delegated-read grants
//!
//! A grant is a random token that lets its holder read exactly one store
//! object until it expires. Poll answers carry grant URLs instead of raw
//! store keys.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

struct Grant {
    key: String,
    expires_at: Instant,
}

/// Issues and resolves time-limited read grants
pub struct ReadGrants {
    base_url: String,
    ttl: Duration,
    grants: Mutex<HashMap<String, Grant>>,
}

impl ReadGrants {
    pub fn new(base_url: impl Into<String>, ttl: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ttl,
            grants: Mutex::new(HashMap::new()),
        }
    }

    /// Issues a grant for `key` and returns its URL
    ///
    /// Expired grants are pruned on every issue.
    pub fn issue(&self, key: &str) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let now = Instant::now();

        let mut grants = self.grants.lock().unwrap_or_else(|e| e.into_inner());
        grants.retain(|_, grant| grant.expires_at > now);
        grants.insert(
            token.clone(),
            Grant {
                key: key.to_string(),
                expires_at: now + self.ttl,
            },
        );

        format!("{}/blob/{}", self.base_url, token)
    }

    /// Returns the key behind a live grant
    pub fn resolve(&self, token: &str) -> Option<String> {
        let grants = self.grants.lock().unwrap_or_else(|e| e.into_inner());
        grants
            .get(token)
            .filter(|grant| grant.expires_at > Instant::now())
            .map(|grant| grant.key.clone())
    }

    /// Number of grants currently held, expired ones included
    pub fn len(&self) -> usize {
        self.grants.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
