//! Client configuration

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;
use std::time::Duration;

/// Default backend origin when `ALGO_API_URL` is not set
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Default status poll period in seconds
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Configuration for the dashboard client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend origin (endpoints are served under `<origin>/api`)
    pub api_url: String,

    /// Period of the status poller
    pub poll_interval: Duration,

    /// Per-request HTTP timeout
    pub request_timeout: Duration,

    /// How long a transient message stays visible
    pub notice_ttl: Duration,

    /// Where the session token is persisted
    pub session_file: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            request_timeout: Duration::from_secs(30),
            notice_ttl: Duration::from_secs(5),
            session_file: default_session_file(),
        }
    }
}

impl ClientConfig {
    /// Build config from environment variables
    ///
    /// Reads:
    /// - `ALGO_API_URL` (optional) - backend origin, defaults to `http://localhost:8000`
    /// - `ALGO_POLL_INTERVAL_SECS` (optional) - poll period, defaults to 5
    /// - `ALGO_REQUEST_TIMEOUT_SECS` (optional) - HTTP timeout, defaults to 30
    /// - `ALGO_NOTICE_TTL_SECS` (optional) - message lifetime, defaults to 5
    /// - `ALGO_SESSION_FILE` (optional) - session storage path
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let api_url = std::env::var("ALGO_API_URL").unwrap_or(defaults.api_url);
        let poll_interval = env_secs("ALGO_POLL_INTERVAL_SECS")?.unwrap_or(defaults.poll_interval);
        let request_timeout =
            env_secs("ALGO_REQUEST_TIMEOUT_SECS")?.unwrap_or(defaults.request_timeout);
        let notice_ttl = env_secs("ALGO_NOTICE_TTL_SECS")?.unwrap_or(defaults.notice_ttl);
        let session_file = std::env::var("ALGO_SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or(defaults.session_file);

        let config = Self {
            api_url,
            poll_interval,
            request_timeout,
            notice_ttl,
            session_file,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the client cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            bail!("poll interval must be greater than zero");
        }
        if self.request_timeout.is_zero() {
            bail!("request timeout must be greater than zero");
        }
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            bail!("API URL must start with http:// or https://, got '{}'", self.api_url);
        }
        Ok(())
    }

    /// Base URL every endpoint path is appended to
    pub fn api_base(&self) -> String {
        format!("{}/api", self.api_url.trim_end_matches('/'))
    }
}

fn env_secs(name: &str) -> Result<Option<Duration>> {
    match std::env::var(name) {
        Ok(raw) => {
            let secs = raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("{} must be a whole number of seconds", name))?;
            Ok(Some(Duration::from_secs(secs)))
        }
        Err(_) => Ok(None),
    }
}

fn default_session_file() -> PathBuf {
    ProjectDirs::from("", "", "algo_dashboard")
        .map(|dirs| dirs.config_dir().join("session.json"))
        .unwrap_or_else(|| PathBuf::from("session.json"))
}
