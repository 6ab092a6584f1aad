//! Runner configuration
//!
//! Defines the execution deadline, flush cadence and store retry settings
//! for job runs.

use rce_core::retry::RetryPolicy;
use std::time::Duration;

/// Runner configuration
///
/// The deadline of a run is `max_execution_time - finalize_margin`: the
/// margin is the time left after a forced kill for the final flush and the
/// exit record.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Hard limit the hosting platform puts on one invocation
    pub max_execution_time: Duration,

    /// Time reserved for finalization before the platform limit
    pub finalize_margin: Duration,

    /// Minimum time between two time-based chunk flushes
    pub flush_interval: Duration,

    /// How long readers may keep draining after the child is killed
    pub kill_grace: Duration,

    /// Retry schedule for chunk and exit record writes
    pub store_retry: RetryPolicy,

    /// Per-request timeout for push target deliveries
    pub push_timeout: Duration,
}

impl RunnerConfig {
    /// Creates a new configuration with defaults
    pub fn new() -> Self {
        Self {
            max_execution_time: Duration::from_secs(900), // 15 minutes
            finalize_margin: Duration::from_secs(60),
            flush_interval: Duration::from_secs(1),
            kill_grace: Duration::from_secs(2),
            store_retry: RetryPolicy::new(5, Duration::from_millis(100), Duration::from_secs(2)),
            push_timeout: Duration::from_secs(30),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - RCE_MAX_EXECUTION_TIME (seconds, default: 900)
    /// - RCE_FINALIZE_MARGIN (seconds, default: 60)
    /// - RCE_FLUSH_INTERVAL (milliseconds, default: 1000)
    /// - RCE_KILL_GRACE (milliseconds, default: 2000)
    /// - RCE_STORE_ATTEMPTS (default: 5)
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::new();

        let max_execution_time = env_parse::<u64>("RCE_MAX_EXECUTION_TIME")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.max_execution_time);

        let finalize_margin = env_parse::<u64>("RCE_FINALIZE_MARGIN")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.finalize_margin);

        let flush_interval = env_parse::<u64>("RCE_FLUSH_INTERVAL")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.flush_interval);

        let kill_grace = env_parse::<u64>("RCE_KILL_GRACE")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.kill_grace);

        let mut store_retry = defaults.store_retry;
        if let Some(attempts) = env_parse::<u32>("RCE_STORE_ATTEMPTS")? {
            store_retry.attempts = attempts;
        }

        Ok(Self {
            max_execution_time,
            finalize_margin,
            flush_interval,
            kill_grace,
            store_retry,
            push_timeout: defaults.push_timeout,
        })
    }

    /// Time a run may take before the child is killed
    pub fn deadline(&self) -> Duration {
        self.max_execution_time.saturating_sub(self.finalize_margin)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.finalize_margin >= self.max_execution_time {
            anyhow::bail!("finalize_margin must be smaller than max_execution_time");
        }

        if self.flush_interval.is_zero() {
            anyhow::bail!("flush_interval must be greater than 0");
        }

        if self.store_retry.attempts == 0 {
            anyhow::bail!("store attempts must be greater than 0");
        }

        Ok(())
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads and parses an optional environment variable
///
/// Unset means `None`; a set but unparsable value is an error.
pub fn env_parse<T: std::str::FromStr>(name: &str) -> anyhow::Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| anyhow::anyhow!("{} has an invalid value: {:?}", name, raw)),
        Err(_) => Ok(None),
    }
}
