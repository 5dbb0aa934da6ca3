// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{error, warn};

use crate::catalog::CatalogError;
use crate::provider::AdapterError;
use crate::schema::ValidationError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error_type: String,
    pub message: String,
    pub request_id: Option<String>,
    pub details: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    NotFound(String),
    InvalidRequest(String),
    ValidationFailed {
        message: String,
        errors: Vec<ValidationError>,
    },
    Unauthorized(String),
    Configuration(String),
    /// Upstream provider failure; the upstream status is logged and reported in details
    Upstream {
        message: String,
        upstream_status: Option<u16>,
    },
    Timeout(String),
    InternalError(String),
}

impl ApiError {
    pub fn to_response(&self, request_id: Option<String>) -> ErrorResponse {
        let (error_type, message, details) = match self {
            ApiError::NotFound(msg) => ("not_found", msg.clone(), None),
            ApiError::InvalidRequest(msg) => ("invalid_request", msg.clone(), None),
            ApiError::ValidationFailed { message, errors } => {
                let mut details = HashMap::new();
                details.insert(
                    "errors".to_string(),
                    serde_json::to_value(errors).unwrap_or_default(),
                );
                ("validation_error", message.clone(), Some(details))
            }
            ApiError::Unauthorized(msg) => ("unauthorized", msg.clone(), None),
            ApiError::Configuration(msg) => ("configuration_error", msg.clone(), None),
            ApiError::Upstream {
                upstream_status, ..
            } => {
                let details = upstream_status.map(|status| {
                    let mut details = HashMap::new();
                    details.insert(
                        "upstream_status".to_string(),
                        serde_json::Value::Number(status.into()),
                    );
                    details
                });
                (
                    "provider_error",
                    "The generation provider is unavailable, please try again".to_string(),
                    details,
                )
            }
            ApiError::Timeout(msg) => ("timeout", msg.clone(), None),
            ApiError::InternalError(msg) => ("internal_error", msg.clone(), None),
        };

        ErrorResponse {
            error_type: error_type.to_string(),
            message,
            request_id,
            details,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NotFound(_) => 404,
            ApiError::InvalidRequest(_)
            | ApiError::ValidationFailed { .. }
            | ApiError::Configuration(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Upstream {
                upstream_status: Some(404),
                ..
            } => 404,
            ApiError::Upstream { .. } => 502,
            ApiError::Timeout(_) => 504,
            ApiError::InternalError(_) => 500,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::ValidationFailed { message, .. } => {
                write!(f, "Validation failed: {}", message)
            }
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            ApiError::Upstream {
                message,
                upstream_status,
            } => match upstream_status {
                Some(status) => write!(f, "Provider error ({}): {}", status, message),
                None => write!(f, "Provider error: {}", message),
            },
            ApiError::Timeout(msg) => write!(f, "Timed out: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<AdapterError> for ApiError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::Configuration(msg) => ApiError::Configuration(msg),
            AdapterError::InvalidInput { message, errors } => {
                ApiError::ValidationFailed { message, errors }
            }
            AdapterError::Provider { message, status }
            | AdapterError::SchemaFetch { message, status }
            | AdapterError::Batch { message, status } => ApiError::Upstream {
                message,
                upstream_status: status,
            },
            AdapterError::SchemaParse(message) => ApiError::Upstream {
                message,
                upstream_status: None,
            },
            e @ AdapterError::DeadlineExceeded { .. } => ApiError::Timeout(e.to_string()),
            AdapterError::Unknown(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::ModelNotFound(slug) => {
                ApiError::NotFound(format!("Model '{}' not found", slug))
            }
            e @ CatalogError::IncompleteModel { .. } => ApiError::Configuration(e.to_string()),
            CatalogError::Schema(e) => AdapterError::from(e).into(),
            e => ApiError::InternalError(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let request_id = uuid::Uuid::new_v4().to_string();
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!("[{}] {}", request_id, self);
        } else {
            warn!("[{}] {}", request_id, self);
        }
        (status, Json(self.to_response(Some(request_id)))).into_response()
    }
}
