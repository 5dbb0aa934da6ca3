// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error taxonomy for provider adapter operations
//!
//! Every public adapter operation reports failures as an `AdapterError`, except
//! `cancel`, `health_check` and webhook verification, which degrade to `false`.
//! Validation failures carry the per-field errors so callers can render them.

use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::config::ConfigError;
use crate::schema::{SchemaError, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    ConfigurationError,
    InvalidInput,
    ProviderError,
    SchemaFetchError,
    SchemaParseError,
    BatchError,
    Timeout,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ConfigurationError => "configuration_error",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::ProviderError => "provider_error",
            ErrorKind::SchemaFetchError => "schema_fetch_error",
            ErrorKind::SchemaParseError => "schema_parse_error",
            ErrorKind::BatchError => "batch_error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdapterError {
    /// Credential or model configuration missing
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Schema validation failed
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        errors: Vec<ValidationError>,
    },

    /// Upstream call failed or returned a non-success status
    #[error("Provider error: {message}")]
    Provider {
        message: String,
        status: Option<u16>,
    },

    #[error("Schema fetch error: {message}")]
    SchemaFetch {
        message: String,
        status: Option<u16>,
    },

    #[error("Schema parse error: {0}")]
    SchemaParse(String),

    /// A batch submission failed after every input validated
    #[error("Batch submission failed: {message}")]
    Batch {
        message: String,
        status: Option<u16>,
    },

    /// The caller's wait deadline elapsed; the remote job keeps running
    #[error("Prediction {job_id} did not finish within {waited:?}")]
    DeadlineExceeded { job_id: String, waited: Duration },

    #[error("Unexpected error: {0}")]
    Unknown(String),
}

impl AdapterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AdapterError::Configuration(_) => ErrorKind::ConfigurationError,
            AdapterError::InvalidInput { .. } => ErrorKind::InvalidInput,
            AdapterError::Provider { .. } => ErrorKind::ProviderError,
            AdapterError::SchemaFetch { .. } => ErrorKind::SchemaFetchError,
            AdapterError::SchemaParse(_) => ErrorKind::SchemaParseError,
            AdapterError::Batch { .. } => ErrorKind::BatchError,
            AdapterError::DeadlineExceeded { .. } => ErrorKind::Timeout,
            AdapterError::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// HTTP-equivalent status: 400 for caller mistakes, the upstream status otherwise
    pub fn http_status(&self) -> Option<u16> {
        match self {
            AdapterError::Configuration(_) | AdapterError::InvalidInput { .. } => Some(400),
            AdapterError::Provider { status, .. }
            | AdapterError::SchemaFetch { status, .. }
            | AdapterError::Batch { status, .. } => *status,
            _ => None,
        }
    }

    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            AdapterError::InvalidInput { errors, .. } => errors,
            _ => &[],
        }
    }

    pub fn provider(message: impl Into<String>, status: Option<u16>) -> Self {
        AdapterError::Provider {
            message: message.into(),
            status,
        }
    }
}

impl From<SchemaError> for AdapterError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::Parse(message) => AdapterError::SchemaParse(message),
            other => AdapterError::SchemaFetch {
                status: other.status(),
                message: other.to_string(),
            },
        }
    }
}

impl From<ConfigError> for AdapterError {
    fn from(err: ConfigError) -> Self {
        AdapterError::Configuration(err.to_string())
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        AdapterError::Provider {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}
