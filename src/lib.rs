// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod provider;
pub mod schema;
pub mod version;

pub use catalog::{MediaType, ModelCatalog, ModelDescriptor};
pub use config::{ProviderConfig, ServerConfig};
pub use provider::{
    AdapterError, ErrorKind, GenerationProvider, PredictionJob, PredictionStatus,
    ReplicateAdapter, WaitOptions,
};
pub use schema::{FieldSchema, FieldSpec, FieldType, PredictionInput, SchemaEngine};
