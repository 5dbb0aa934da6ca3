// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prediction job records and their decoding from the provider wire format

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use super::errors::AdapterError;

/// Provider job status vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
}

/// Local lifecycle state of a generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationState {
    Pending,
    Running,
    Completed,
    Failed,
    Canceled,
}

impl PredictionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PredictionStatus::Succeeded | PredictionStatus::Failed | PredictionStatus::Canceled
        )
    }

    pub fn generation_state(&self) -> GenerationState {
        match self {
            PredictionStatus::Starting => GenerationState::Pending,
            PredictionStatus::Processing => GenerationState::Running,
            PredictionStatus::Succeeded => GenerationState::Completed,
            PredictionStatus::Failed => GenerationState::Failed,
            PredictionStatus::Canceled => GenerationState::Canceled,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionStatus::Starting => "starting",
            PredictionStatus::Processing => "processing",
            PredictionStatus::Succeeded => "succeeded",
            PredictionStatus::Failed => "failed",
            PredictionStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for PredictionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PredictionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "starting" => Ok(PredictionStatus::Starting),
            "processing" => Ok(PredictionStatus::Processing),
            "succeeded" => Ok(PredictionStatus::Succeeded),
            "failed" => Ok(PredictionStatus::Failed),
            "canceled" => Ok(PredictionStatus::Canceled),
            other => Err(format!("unknown prediction status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predict_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionUrls {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel: Option<String>,
}

/// One invocation of a model, as observed at the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionJob {
    pub id: String,
    pub status: PredictionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub input: Value,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub logs: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<PredictionMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<PredictionUrls>,
}

#[derive(Debug, Deserialize)]
struct WirePrediction {
    id: Option<String>,
    status: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    input: Value,
    #[serde(default)]
    output: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    logs: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    metrics: Option<PredictionMetrics>,
    #[serde(default)]
    urls: Option<PredictionUrls>,
}

impl PredictionJob {
    /// Decode a provider job record. `id` and a known `status` are required.
    pub fn from_wire(value: Value) -> Result<Self, AdapterError> {
        let wire: WirePrediction = serde_json::from_value(value).map_err(|e| {
            AdapterError::provider(format!("malformed prediction record: {}", e), None)
        })?;

        let id = wire
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AdapterError::provider("prediction record has no id", None))?;
        let status = wire
            .status
            .ok_or_else(|| AdapterError::provider(format!("prediction {} has no status", id), None))?
            .parse::<PredictionStatus>()
            .map_err(|e| AdapterError::provider(format!("prediction {}: {}", id, e), None))?;

        let error = match wire.error {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(other) => Some(other.to_string()),
        };

        Ok(Self {
            id,
            status,
            model: wire.model,
            version: wire.version,
            input: wire.input,
            output: wire.output.filter(|o| !o.is_null()),
            error,
            logs: wire.logs,
            created_at: wire.created_at,
            started_at: wire.started_at,
            completed_at: wire.completed_at,
            metrics: wire.metrics,
            urls: wire.urls,
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
