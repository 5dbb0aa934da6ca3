// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::schema::cache::DEFAULT_CACHE_CAPACITY;

pub const DEFAULT_BASE_URL: &str = "https://api.replicate.com/v1";
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_500;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("REPLICATE_API_TOKEN is not set")]
    MissingToken,
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

/// Settings for talking to the generative provider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    /// Bearer token sent as `Authorization: Token <value>`
    pub api_token: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
    /// Transport retries for schema lookups only
    pub max_retries: u32,
    pub poll_interval: Duration,
    /// Callback URL registered with predictions when the model subscribes to events
    pub webhook_url: Option<String>,
    /// Shared secret for inbound webhook signatures
    pub webhook_secret: Option<String>,
    pub schema_cache_capacity: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_retries: DEFAULT_MAX_RETRIES,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            webhook_url: None,
            webhook_secret: None,
            schema_cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl ProviderConfig {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: Some(api_token.into()),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_webhook(mut self, url: Option<String>, secret: Option<String>) -> Self {
        self.webhook_url = url;
        self.webhook_secret = secret;
        self
    }

    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let config = Self {
            api_token: non_empty("REPLICATE_API_TOKEN"),
            base_url: non_empty("REPLICATE_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            timeout: Duration::from_millis(parse_or(
                "REPLICATE_TIMEOUT_MS",
                non_empty("REPLICATE_TIMEOUT_MS"),
                DEFAULT_TIMEOUT_MS,
            )?),
            max_retries: parse_or(
                "REPLICATE_MAX_RETRIES",
                non_empty("REPLICATE_MAX_RETRIES"),
                DEFAULT_MAX_RETRIES,
            )?,
            poll_interval: Duration::from_millis(parse_or(
                "REPLICATE_POLL_INTERVAL_MS",
                non_empty("REPLICATE_POLL_INTERVAL_MS"),
                DEFAULT_POLL_INTERVAL_MS,
            )?),
            webhook_url: non_empty("REPLICATE_WEBHOOK_URL"),
            webhook_secret: non_empty("REPLICATE_WEBHOOK_SECRET"),
            schema_cache_capacity: parse_or(
                "SCHEMA_CACHE_CAPACITY",
                non_empty("SCHEMA_CACHE_CAPACITY"),
                DEFAULT_CACHE_CAPACITY,
            )?,
        };

        debug!(
            "Provider config: base_url={}, timeout={:?}, max_retries={}, webhook={}",
            config.base_url,
            config.timeout,
            config.max_retries,
            config.webhook_url.is_some()
        );
        Ok(config)
    }

    /// The token, or `ConfigError::MissingToken`
    pub fn require_token(&self) -> Result<&str, ConfigError> {
        self.api_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingToken)
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse::<T>().map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            value,
        }),
    }
}
