// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-process model catalog over a persisted store
//!
//! Reads are served from memory; once the TTL window has passed the next read
//! re-loads the store. Stale data is served (with a warning) if that reload fails.
//! Input schemas missing from a record are fetched once through the schema
//! engine and kept across reloads.

pub mod model;
pub mod store;

pub use model::{MediaType, ModelDescriptor, DEFAULT_PROVIDER};
pub use store::{FileModelStore, InMemoryModelStore, ModelStore};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::schema::{SchemaEngine, SchemaError, LATEST_VERSION};

pub const DEFAULT_CATALOG_TTL: Duration = Duration::from_secs(300);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("Model not found: {0}")]
    ModelNotFound(String),
    #[error("Model {slug} is incomplete: {reason}")]
    IncompleteModel { slug: String, reason: String },
    #[error("Model store error: {0}")]
    Store(String),
    #[error("Model catalog parse error: {0}")]
    Parse(String),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

#[derive(Default)]
struct CatalogState {
    models: HashMap<String, ModelDescriptor>,
    loaded_at: Option<Instant>,
}

pub struct ModelCatalog {
    store: Arc<dyn ModelStore>,
    ttl: Duration,
    state: RwLock<CatalogState>,
}

impl ModelCatalog {
    pub fn new(store: Arc<dyn ModelStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            state: RwLock::new(CatalogState::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn is_stale(&self) -> bool {
        match self.state.read().await.loaded_at {
            Some(at) => at.elapsed() >= self.ttl,
            None => true,
        }
    }

    /// Re-read the store. Schemas hydrated earlier survive for records that still lack one.
    pub async fn refresh(&self) -> Result<usize, CatalogError> {
        let loaded = self.store.load_models().await?;
        let mut state = self.state.write().await;
        let mut models = HashMap::with_capacity(loaded.len());
        for mut model in loaded {
            if model.input_schema.is_none() {
                if let Some(previous) = state.models.get(&model.slug) {
                    if previous.provider_model_id == model.provider_model_id
                        && previous.provider_version == model.provider_version
                    {
                        model.input_schema = previous.input_schema.clone();
                    }
                }
            }
            models.insert(model.slug.clone(), model);
        }
        let count = models.len();
        state.models = models;
        state.loaded_at = Some(Instant::now());
        info!("Model catalog refreshed: {} models", count);
        Ok(count)
    }

    async fn ensure_fresh(&self) -> Result<(), CatalogError> {
        if !self.is_stale().await {
            return Ok(());
        }
        match self.refresh().await {
            Ok(_) => Ok(()),
            Err(e) => {
                let state = self.state.read().await;
                if state.loaded_at.is_some() {
                    warn!("Catalog refresh failed, serving stale models: {}", e);
                    Ok(())
                } else {
                    Err(e)
                }
            }
        }
    }

    pub async fn get_model(&self, slug: &str) -> Result<Option<ModelDescriptor>, CatalogError> {
        self.ensure_fresh().await?;
        Ok(self.state.read().await.models.get(slug).cloned())
    }

    /// Models sorted by slug, optionally restricted to one media type
    pub async fn list_models(
        &self,
        media_type: Option<MediaType>,
    ) -> Result<Vec<ModelDescriptor>, CatalogError> {
        self.ensure_fresh().await?;
        let state = self.state.read().await;
        let mut models: Vec<ModelDescriptor> = state
            .models
            .values()
            .filter(|m| media_type.map_or(true, |t| m.media_type == t))
            .cloned()
            .collect();
        models.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(models)
    }

    /// The model with its input schema present, fetching it from the provider if needed
    pub async fn model_with_schema(
        &self,
        slug: &str,
        engine: &SchemaEngine,
    ) -> Result<ModelDescriptor, CatalogError> {
        let mut model = self
            .get_model(slug)
            .await?
            .ok_or_else(|| CatalogError::ModelNotFound(slug.to_string()))?;
        if model.input_schema.is_some() {
            return Ok(model);
        }

        let model_id = model
            .model_id()
            .ok_or_else(|| CatalogError::IncompleteModel {
                slug: slug.to_string(),
                reason: "no provider model id to fetch a schema for".to_string(),
            })?
            .to_string();
        let version = model.pinned_version().unwrap_or(LATEST_VERSION).to_string();
        debug!("Hydrating schema for {} from {}@{}", slug, model_id, version);
        let schema = engine.fetch_schema(&model_id, &version).await?;

        let mut state = self.state.write().await;
        if let Some(entry) = state.models.get_mut(slug) {
            entry.input_schema = Some(schema.clone());
        }
        model.input_schema = Some(schema);
        Ok(model)
    }

    /// Periodically refresh in the background until the handle is shut down
    pub fn spawn_refresh(self: &Arc<Self>, interval: Duration) -> CatalogRefreshHandle {
        let token = CancellationToken::new();
        let child = token.child_token();
        let catalog = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = child.cancelled() => {
                        debug!("Catalog refresh task stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = catalog.refresh().await {
                            warn!("Background catalog refresh failed: {}", e);
                        }
                    }
                }
            }
        });
        CatalogRefreshHandle { token, handle }
    }
}

/// Cancellation handle for `ModelCatalog::spawn_refresh`
pub struct CatalogRefreshHandle {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl CatalogRefreshHandle {
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            warn!("Catalog refresh task ended abnormally: {}", e);
        }
    }
}
