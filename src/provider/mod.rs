// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Provider adapter: prediction lifecycle, cost estimates and webhook verification

pub mod billing;
pub mod client;
pub mod errors;
pub mod prediction;
pub mod webhook;

pub use billing::estimate_cost;
pub use client::{GenerationProvider, ReplicateAdapter, WaitOptions, PROVIDER_NAME};
pub use errors::{AdapterError, ErrorKind};
pub use prediction::{
    GenerationState, PredictionJob, PredictionMetrics, PredictionStatus, PredictionUrls,
};
pub use webhook::{WebhookMode, WebhookVerifier, SIGNATURE_PREFIX};
