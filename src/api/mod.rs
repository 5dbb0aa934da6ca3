// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod errors;
pub mod http_server;

pub use errors::{ApiError, ErrorResponse};
pub use http_server::{
    create_router, start_server, CancelResponse, CostEstimateResponse, HealthResponse,
    SIGNATURE_HEADER,
};

use std::sync::Arc;
use std::time::Duration;

use crate::catalog::ModelCatalog;
use crate::provider::GenerationProvider;
use crate::schema::SchemaEngine;

/// Shared handles for request handlers
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<ModelCatalog>,
    pub provider: Arc<dyn GenerationProvider>,
    pub schemas: Arc<SchemaEngine>,
    pub poll_interval: Duration,
}
