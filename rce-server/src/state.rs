//! Shared application state

use rce_core::store::LogStore;
use std::sync::Arc;
use std::time::Duration;

use crate::service::{Authenticator, Dispatcher, PollHandler, ReadGrants};

/// State handed to every handler and middleware
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LogStore>,
    pub auth: Arc<dyn Authenticator>,
    pub dispatcher: Arc<dyn Dispatcher>,
    pub grants: Arc<ReadGrants>,
    pub poll: Arc<PollHandler>,
    /// Cadence of request-log background flushes
    pub log_flush_every: Duration,
}

impl AppState {
    pub fn new(
        store: Arc<dyn LogStore>,
        auth: Arc<dyn Authenticator>,
        dispatcher: Arc<dyn Dispatcher>,
        grants: Arc<ReadGrants>,
    ) -> Self {
        let poll = Arc::new(PollHandler::new(store.clone(), grants.clone()));
        Self {
            store,
            auth,
            dispatcher,
            grants,
            poll,
            log_flush_every: rce_core::request_log::DEFAULT_FLUSH_EVERY,
        }
    }
}
