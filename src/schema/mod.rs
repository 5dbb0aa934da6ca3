// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Schema engine: provider schema → runtime validator and provider-shape transform

pub mod cache;
pub mod errors;
pub mod fetch;
pub mod openapi;
pub mod transform;
pub mod types;
pub mod validator;

pub use cache::{schema_fingerprint, BoundedCache, CacheStats};
pub use errors::SchemaError;
pub use fetch::{SchemaFetcher, LATEST_VERSION};
pub use openapi::derive_field_schema;
pub use transform::transform_input_for_provider;
pub use types::{
    BinaryFile, FieldSchema, FieldSpec, FieldType, FieldValidation, PredictionInput,
    ValidationError, ValidationReport, ValidationResult,
};
pub use validator::CompiledValidator;

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::ProviderConfig;

/// Fetches, caches and applies model input schemas
pub struct SchemaEngine {
    fetcher: Option<SchemaFetcher>,
    schemas: BoundedCache<(String, String), FieldSchema>,
    validators: BoundedCache<String, Arc<CompiledValidator>>,
}

impl SchemaEngine {
    /// An engine that can validate but not fetch
    pub fn offline(cache_capacity: usize) -> Self {
        Self {
            fetcher: None,
            schemas: BoundedCache::new(cache_capacity),
            validators: BoundedCache::new(cache_capacity),
        }
    }

    pub fn with_fetcher(fetcher: SchemaFetcher, cache_capacity: usize) -> Self {
        Self {
            fetcher: Some(fetcher),
            ..Self::offline(cache_capacity)
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Result<Self, SchemaError> {
        Ok(Self::with_fetcher(
            SchemaFetcher::from_config(config)?,
            config.schema_cache_capacity,
        ))
    }

    /// Input schema for `model_id` at `version` (`"latest"` allowed), memoized per pair
    pub async fn fetch_schema(
        &self,
        model_id: &str,
        version: &str,
    ) -> Result<FieldSchema, SchemaError> {
        let key = (model_id.to_string(), version.to_string());
        if let Some(schema) = self.schemas.get(&key) {
            debug!("Schema cache hit for {}@{}", model_id, version);
            return Ok(schema);
        }
        let fetcher = self.fetcher.as_ref().ok_or(SchemaError::MissingCredential)?;
        let schema = fetcher.fetch(model_id, version).await?;
        self.schemas.insert(key, schema.clone());
        Ok(schema)
    }

    /// Validate against `schema`. Never fails: a schema that cannot be compiled
    /// produces a single error on the `schema` field.
    pub fn validate_input(&self, schema: &FieldSchema, input: &PredictionInput) -> ValidationResult {
        match self.validator_for(schema) {
            Ok(validator) => validator.validate(input),
            Err(e) => {
                warn!("Schema could not be compiled: {}", e);
                ValidationResult::failure(vec![ValidationError::new("schema", e.to_string())])
            }
        }
    }

    pub fn transform_input_for_provider(
        &self,
        schema: &FieldSchema,
        input: &PredictionInput,
    ) -> Map<String, Value> {
        transform_input_for_provider(schema, input)
    }

    fn validator_for(&self, schema: &FieldSchema) -> Result<Arc<CompiledValidator>, SchemaError> {
        let fingerprint = schema_fingerprint(schema)?;
        if let Some(validator) = self.validators.get(&fingerprint) {
            return Ok(validator);
        }
        let validator = Arc::new(CompiledValidator::compile(schema)?);
        debug!(
            "Compiled validator {} ({} fields)",
            &fingerprint[..12],
            validator.field_count()
        );
        self.validators.insert(fingerprint, validator.clone());
        Ok(validator)
    }

    /// Drop every memoized schema and validator
    pub fn clear_cache(&self) {
        self.schemas.clear();
        self.validators.clear();
    }

    pub fn schema_cache_stats(&self) -> CacheStats {
        self.schemas.stats()
    }

    pub fn validator_cache_stats(&self) -> CacheStats {
        self.validators.stats()
    }
}
