// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Backing stores the catalog reads model records from

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

use super::model::ModelDescriptor;
use super::CatalogError;

#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Every persisted model record
    async fn load_models(&self) -> Result<Vec<ModelDescriptor>, CatalogError>;
}

/// Records held in process memory; catalog management writes go through `upsert`/`remove`
#[derive(Default)]
pub struct InMemoryModelStore {
    models: RwLock<Vec<ModelDescriptor>>,
}

impl InMemoryModelStore {
    pub fn new(models: Vec<ModelDescriptor>) -> Self {
        Self {
            models: RwLock::new(models),
        }
    }

    pub async fn upsert(&self, model: ModelDescriptor) {
        let mut models = self.models.write().await;
        match models.iter_mut().find(|m| m.slug == model.slug) {
            Some(existing) => *existing = model,
            None => models.push(model),
        }
    }

    pub async fn remove(&self, slug: &str) -> bool {
        let mut models = self.models.write().await;
        let before = models.len();
        models.retain(|m| m.slug != slug);
        models.len() != before
    }
}

#[async_trait]
impl ModelStore for InMemoryModelStore {
    async fn load_models(&self) -> Result<Vec<ModelDescriptor>, CatalogError> {
        Ok(self.models.read().await.clone())
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    models: Vec<ModelDescriptor>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonCatalog {
    List(Vec<ModelDescriptor>),
    File(CatalogFile),
}

/// Records read from a `.json` or `.toml` file on every load
pub struct FileModelStore {
    path: PathBuf,
}

impl FileModelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ModelStore for FileModelStore {
    async fn load_models(&self) -> Result<Vec<ModelDescriptor>, CatalogError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| CatalogError::Store(format!("{}: {}", self.path.display(), e)))?;
        let is_toml = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| e.eq_ignore_ascii_case("toml"));

        let models = if is_toml {
            toml::from_str::<CatalogFile>(&raw)
                .map_err(|e| CatalogError::Parse(format!("{}: {}", self.path.display(), e)))?
                .models
        } else {
            match serde_json::from_str::<JsonCatalog>(&raw)
                .map_err(|e| CatalogError::Parse(format!("{}: {}", self.path.display(), e)))?
            {
                JsonCatalog::List(models) => models,
                JsonCatalog::File(file) => file.models,
            }
        };
        debug!("Loaded {} models from {}", models.len(), self.path.display());
        Ok(models)
    }
}
