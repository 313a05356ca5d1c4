//! Client configuration.

use crate::backoff::BackoffPolicy;
use crate::error::{Result, SdkError};
use crate::log::DEFAULT_LOG_CAPACITY;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_WS_URL: &str = "TABLEMIRROR_WS_URL";
pub const ENV_LOG_CAPACITY: &str = "TABLEMIRROR_LOG_CAPACITY";
pub const ENV_BACKOFF_BASE_MS: &str = "TABLEMIRROR_BACKOFF_BASE_MS";
pub const ENV_BACKOFF_CAP_MS: &str = "TABLEMIRROR_BACKOFF_CAP_MS";

/// Configuration for a [`TableClient`](crate::TableClient).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Default room URL, used when `connect` is called without one.
    pub ws_url: Option<String>,
    /// Lines kept in the message log.
    pub log_capacity: usize,
    /// Reconnect delays.
    pub backoff: BackoffPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ws_url: None,
            log_capacity: DEFAULT_LOG_CAPACITY,
            backoff: BackoffPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Defaults overridden by `TABLEMIRROR_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_WS_URL).filter(|u| !u.trim().is_empty()) {
            config.ws_url = Some(url.trim().to_owned());
        }
        if let Some(raw) = lookup(ENV_LOG_CAPACITY) {
            config.log_capacity = parse_var(ENV_LOG_CAPACITY, &raw)?;
        }
        if let Some(raw) = lookup(ENV_BACKOFF_BASE_MS) {
            config.backoff.base = Duration::from_millis(parse_var(ENV_BACKOFF_BASE_MS, &raw)?);
        }
        if let Some(raw) = lookup(ENV_BACKOFF_CAP_MS) {
            config.backoff.cap = Duration::from_millis(parse_var(ENV_BACKOFF_CAP_MS, &raw)?);
        }

        Ok(config)
    }
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        SdkError::Config(format!("{key}: expected a non-negative integer, got {raw:?}"))
    })
}

/// Builder for client configuration.
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    pub fn ws_url(mut self, url: impl Into<String>) -> Self {
        self.config.ws_url = Some(url.into());
        self
    }

    pub fn log_capacity(mut self, capacity: usize) -> Self {
        self.config.log_capacity = capacity;
        self
    }

    pub fn backoff(mut self, policy: BackoffPolicy) -> Self {
        self.config.backoff = policy;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
