// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Retrieval of model input schemas from the provider's model/version endpoints

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::errors::SchemaError;
use super::openapi::derive_field_schema;
use super::types::FieldSchema;
use crate::config::ProviderConfig;

pub const LATEST_VERSION: &str = "latest";

#[derive(Debug, Deserialize)]
struct ModelInfo {
    latest_version: Option<VersionRef>,
}

#[derive(Debug, Deserialize)]
struct VersionRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct VersionInfo {
    #[serde(default)]
    openapi_schema: Value,
}

/// Client for `GET /models/{id}` and `GET /models/{id}/versions/{version}`
#[derive(Clone)]
pub struct SchemaFetcher {
    client: Client,
    base_url: String,
    api_token: Option<String>,
    max_retries: u32,
}

impl SchemaFetcher {
    pub fn new(client: Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            max_retries: config.max_retries,
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Result<Self, SchemaError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SchemaError::Fetch {
                model: String::new(),
                message: format!("failed to build HTTP client: {}", e),
                status: None,
            })?;
        Ok(Self::new(client, config))
    }

    /// Resolve `version` (`"latest"` → concrete id) and derive the input schema
    pub async fn fetch(&self, model_id: &str, version: &str) -> Result<FieldSchema, SchemaError> {
        let token = self
            .api_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(SchemaError::MissingCredential)?;

        let version_id = if version == LATEST_VERSION {
            let info: ModelInfo = self
                .get_json(token, model_id, &format!("{}/models/{}", self.base_url, model_id))
                .await?;
            let id = info
                .latest_version
                .map(|v| v.id)
                .ok_or_else(|| SchemaError::Fetch {
                    model: model_id.to_string(),
                    message: "model has no published version".to_string(),
                    status: None,
                })?;
            debug!("Resolved {}@latest to version {}", model_id, id);
            id
        } else {
            version.to_string()
        };

        let url = format!(
            "{}/models/{}/versions/{}",
            self.base_url, model_id, version_id
        );
        let info: VersionInfo = self.get_json(token, model_id, &url).await?;
        let schema = derive_field_schema(&info.openapi_schema, model_id)?;
        info!(
            "Fetched input schema for {}@{} ({} fields)",
            model_id,
            version_id,
            schema.len()
        );
        Ok(schema)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        token: &str,
        model_id: &str,
        url: &str,
    ) -> Result<T, SchemaError> {
        let fetch_error = |message: String, status: Option<u16>| SchemaError::Fetch {
            model: model_id.to_string(),
            message,
            status,
        };

        let mut attempt = 0;
        let response = loop {
            debug!("Schema GET {} (attempt {})", url, attempt + 1);
            match self
                .client
                .get(url)
                .header("Authorization", format!("Token {}", token))
                .send()
                .await
            {
                Ok(resp) => break resp,
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!("Schema request to {} failed, retrying: {}", url, e);
                    tokio::time::sleep(Duration::from_millis(200 * u64::from(attempt))).await;
                }
                Err(e) => return Err(fetch_error(e.to_string(), None)),
            }
        };

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(fetch_error(
                format!("provider returned {}: {}", status, text),
                Some(status.as_u16()),
            ));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| fetch_error(format!("malformed response: {}", e), Some(status.as_u16())))
    }
}
