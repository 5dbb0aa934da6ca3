// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::schema::FieldSchema;

pub const DEFAULT_PROVIDER: &str = "replicate";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    Audio,
    Text,
    Utility,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
            MediaType::Audio => "audio",
            MediaType::Text => "text",
            MediaType::Utility => "utility",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "image" => Ok(MediaType::Image),
            "video" => Ok(MediaType::Video),
            "audio" => Ok(MediaType::Audio),
            "text" => Ok(MediaType::Text),
            "utility" => Ok(MediaType::Utility),
            other => Err(format!("unknown media type '{}'", other)),
        }
    }
}

fn default_provider() -> String {
    DEFAULT_PROVIDER.to_string()
}

/// Provider-neutral record of one generative model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub slug: String,
    #[serde(default = "default_provider")]
    pub provider: String,
    pub media_type: MediaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_model_id: Option<String>,
    /// `None` means the provider's latest version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<FieldSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_per_use: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_latency_ms: Option<u64>,
    /// Provider webhook events to subscribe to, e.g. `["completed"]`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub webhook_events: Vec<String>,
}

impl ModelDescriptor {
    pub fn new(slug: impl Into<String>, media_type: MediaType) -> Self {
        Self {
            slug: slug.into(),
            provider: default_provider(),
            media_type,
            provider_model_id: None,
            provider_version: None,
            input_schema: None,
            cost_per_use: None,
            avg_latency_ms: None,
            webhook_events: Vec::new(),
        }
    }

    pub fn with_provider_model(mut self, model_id: impl Into<String>) -> Self {
        self.provider_model_id = Some(model_id.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.provider_version = Some(version.into());
        self
    }

    pub fn with_schema(mut self, schema: FieldSchema) -> Self {
        self.input_schema = Some(schema);
        self
    }

    pub fn with_cost(mut self, cost_per_use: f64) -> Self {
        self.cost_per_use = Some(cost_per_use);
        self
    }

    pub fn with_webhook_events<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.webhook_events = events.into_iter().map(Into::into).collect();
        self
    }

    /// Explicit, non-empty provider version
    pub fn pinned_version(&self) -> Option<&str> {
        self.provider_version
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    pub fn model_id(&self) -> Option<&str> {
        self.provider_model_id
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}
