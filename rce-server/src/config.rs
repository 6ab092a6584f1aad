//! Server configuration
//!
//! Everything is read from the environment; the runner settings are shared
//! with the standalone runner binary.

use anyhow::{Context, bail};
use rce_runner::config::{RunnerConfig, env_parse};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// How submitted jobs reach a runner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Run on this process's Tokio runtime
    Task,
    /// Spawn the runner binary per job
    Process,
}

impl FromStr for DispatchMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "task" => Ok(DispatchMode::Task),
            "process" => Ok(DispatchMode::Process),
            other => bail!("unknown dispatch mode '{}' (expected task or process)", other),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,

    /// Base of delegated-read URLs handed to clients
    pub public_url: String,

    pub store_dir: PathBuf,

    /// Token to principal name
    pub auth_tokens: HashMap<String, String>,

    pub grant_ttl: Duration,

    pub dispatch: DispatchMode,

    pub runner_bin: PathBuf,

    pub runner: RunnerConfig,
}

impl ServerConfig {
    pub fn new() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            public_url: "http://localhost:8080".to_string(),
            store_dir: PathBuf::from("/tmp/rce-store"),
            auth_tokens: HashMap::new(),
            grant_ttl: Duration::from_secs(60),
            dispatch: DispatchMode::Task,
            runner_bin: PathBuf::from("rce-runner"),
            runner: RunnerConfig::new(),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - RCE_BIND_ADDR (default: 0.0.0.0:8080)
    /// - RCE_PUBLIC_URL (default: http://localhost:8080)
    /// - RCE_STORE_DIR (default: /tmp/rce-store)
    /// - RCE_AUTH_TOKENS (name:token pairs, comma separated)
    /// - RCE_GRANT_TTL (seconds, default: 60)
    /// - RCE_DISPATCH (task or process, default: task)
    /// - RCE_RUNNER_BIN (default: rce-runner)
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::new();

        let auth_tokens = match std::env::var("RCE_AUTH_TOKENS") {
            Ok(raw) => parse_tokens(&raw).context("Invalid RCE_AUTH_TOKENS")?,
            Err(_) => defaults.auth_tokens,
        };

        Ok(Self {
            bind_addr: std::env::var("RCE_BIND_ADDR").unwrap_or(defaults.bind_addr),
            public_url: std::env::var("RCE_PUBLIC_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.public_url),
            store_dir: std::env::var("RCE_STORE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.store_dir),
            auth_tokens,
            grant_ttl: env_parse::<u64>("RCE_GRANT_TTL")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.grant_ttl),
            dispatch: env_parse::<DispatchMode>("RCE_DISPATCH")?.unwrap_or(defaults.dispatch),
            runner_bin: std::env::var("RCE_RUNNER_BIN")
                .map(PathBuf::from)
                .unwrap_or(defaults.runner_bin),
            runner: RunnerConfig::from_env()?,
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.public_url.starts_with("http://") && !self.public_url.starts_with("https://") {
            bail!("public_url must start with http:// or https://");
        }

        if self.grant_ttl.is_zero() {
            bail!("grant_ttl must be greater than 0");
        }

        if self.auth_tokens.is_empty() {
            tracing::warn!("No auth tokens configured, every /api request will be rejected");
        }

        self.runner.validate()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses `name:token,name:token` into a token to name map
fn parse_tokens(raw: &str) -> anyhow::Result<HashMap<String, String>> {
    let mut tokens = HashMap::new();

    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, token) = pair
            .split_once(':')
            .with_context(|| format!("expected name:token, got '{}'", pair))?;

        if name.is_empty() || token.is_empty() {
            bail!("empty name or token in '{}'", pair);
        }

        tokens.insert(token.to_string(), name.to_string());
    }

    Ok(tokens)
}
