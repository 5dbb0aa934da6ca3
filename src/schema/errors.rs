// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use thiserror::Error;

/// Failures obtaining or interpreting a provider schema description
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// No API credential is configured for schema lookups
    #[error("Schema fetch failed: no provider API token configured")]
    MissingCredential,

    /// A model-info or version request did not succeed
    #[error("Schema fetch failed for {model}: {message}")]
    Fetch {
        model: String,
        message: String,
        status: Option<u16>,
    },

    /// The OpenAPI document has no `Input` schema object
    #[error("Schema fetch failed for {model}: OpenAPI document has no Input schema")]
    MissingInput { model: String },

    /// The schema exists but could not be interpreted
    #[error("Schema parse failed: {0}")]
    Parse(String),
}

impl SchemaError {
    pub fn status(&self) -> Option<u16> {
        match self {
            SchemaError::Fetch { status, .. } => *status,
            _ => None,
        }
    }
}
