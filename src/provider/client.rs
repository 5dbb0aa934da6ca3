// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Replicate prediction API client

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::billing;
use super::errors::AdapterError;
use super::prediction::PredictionJob;
use super::webhook::WebhookVerifier;
use crate::catalog::ModelDescriptor;
use crate::config::provider::DEFAULT_POLL_INTERVAL_MS;
use crate::config::{ProviderConfig, DEFAULT_BASE_URL};
use crate::schema::{FieldSchema, PredictionInput, SchemaEngine, SchemaFetcher};

pub const PROVIDER_NAME: &str = "replicate";
const HEALTH_PATH: &str = "/account";

/// Polling parameters for `wait_for_completion`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitOptions {
    pub interval: Duration,
    /// `None` waits indefinitely
    pub deadline: Option<Duration>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            deadline: None,
        }
    }
}

impl WaitOptions {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Outbound contract with a generative provider
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Validate, transform and submit one prediction
    async fn run(
        &self,
        model: &ModelDescriptor,
        input: &PredictionInput,
    ) -> Result<PredictionJob, AdapterError>;

    async fn get_status(&self, job_id: &str) -> Result<PredictionJob, AdapterError>;

    /// Poll until the job reaches a terminal status
    async fn wait_for_completion(
        &self,
        job_id: &str,
        options: WaitOptions,
    ) -> Result<PredictionJob, AdapterError>;

    /// Best effort; failures are reported as `false`
    async fn cancel(&self, job_id: &str) -> bool;

    /// Validate every input first, then submit all concurrently. Results keep
    /// input order; `None` slots are skipped.
    async fn run_batch(
        &self,
        model: &ModelDescriptor,
        inputs: &[Option<PredictionInput>],
    ) -> Result<Vec<PredictionJob>, AdapterError>;

    fn estimate_cost(&self, model: &ModelDescriptor, input: &PredictionInput) -> f64 {
        billing::estimate_cost(model, input)
    }

    fn validate_webhook(&self, signature: &str, raw_body: &[u8]) -> bool;

    async fn health_check(&self) -> bool;
}

enum PredictionTarget<'a> {
    Version(&'a str),
    Model(&'a str),
}

pub struct ReplicateAdapter {
    client: Client,
    base_url: String,
    api_token: String,
    webhook_url: Option<String>,
    schemas: Arc<SchemaEngine>,
    webhooks: WebhookVerifier,
}

impl ReplicateAdapter {
    /// Fails with a configuration error when no API token is set
    pub fn new(config: &ProviderConfig) -> Result<Self, AdapterError> {
        let client = Self::build_client(config)?;
        let schemas = Arc::new(SchemaEngine::with_fetcher(
            SchemaFetcher::new(client.clone(), config),
            config.schema_cache_capacity,
        ));
        Self::with_parts(config, client, schemas)
    }

    /// Share an existing schema engine (and its caches)
    pub fn with_schema_engine(
        config: &ProviderConfig,
        schemas: Arc<SchemaEngine>,
    ) -> Result<Self, AdapterError> {
        let client = Self::build_client(config)?;
        Self::with_parts(config, client, schemas)
    }

    fn build_client(config: &ProviderConfig) -> Result<Client, AdapterError> {
        Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("asset-forge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AdapterError::Configuration(format!("failed to build HTTP client: {}", e)))
    }

    fn with_parts(
        config: &ProviderConfig,
        client: Client,
        schemas: Arc<SchemaEngine>,
    ) -> Result<Self, AdapterError> {
        let api_token = config.require_token()?.to_string();
        let base_url = if config.base_url.is_empty() {
            DEFAULT_BASE_URL.to_string()
        } else {
            config.base_url.trim_end_matches('/').to_string()
        };
        info!(
            "Provider adapter configured: provider={}, base_url={}",
            PROVIDER_NAME, base_url
        );

        Ok(Self {
            client,
            base_url,
            api_token,
            webhook_url: config.webhook_url.clone(),
            schemas,
            webhooks: WebhookVerifier::new(config.webhook_secret.as_deref()),
        })
    }

    pub fn schema_engine(&self) -> &Arc<SchemaEngine> {
        &self.schemas
    }

    pub fn webhook_verifier(&self) -> &WebhookVerifier {
        &self.webhooks
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("Provider {} {}", method, url);
        self.client
            .request(method, url)
            .header("Authorization", format!("Token {}", self.api_token))
    }

    fn schema_of<'a>(&self, model: &'a ModelDescriptor) -> Result<&'a FieldSchema, AdapterError> {
        if !model.provider.eq_ignore_ascii_case(PROVIDER_NAME) {
            return Err(AdapterError::Configuration(format!(
                "model {} uses provider '{}', not {}",
                model.slug, model.provider, PROVIDER_NAME
            )));
        }
        model.input_schema.as_ref().ok_or_else(|| {
            AdapterError::Configuration(format!("model {} has no input schema loaded", model.slug))
        })
    }

    fn target_of<'a>(&self, model: &'a ModelDescriptor) -> Result<PredictionTarget<'a>, AdapterError> {
        if let Some(version) = model.pinned_version() {
            Ok(PredictionTarget::Version(version))
        } else if let Some(model_id) = model.model_id() {
            Ok(PredictionTarget::Model(model_id))
        } else {
            Err(AdapterError::Configuration(format!(
                "model {} has neither a provider version nor a provider model id",
                model.slug
            )))
        }
    }

    fn validate(
        &self,
        schema: &FieldSchema,
        input: &PredictionInput,
    ) -> Result<PredictionInput, AdapterError> {
        let result = self.schemas.validate_input(schema, input);
        if !result.valid {
            return Err(AdapterError::InvalidInput {
                message: result.error_summary(),
                errors: result.errors,
            });
        }
        result
            .sanitized_input
            .ok_or_else(|| AdapterError::Unknown("validation produced no sanitized input".into()))
    }

    async fn submit(
        &self,
        model: &ModelDescriptor,
        schema: &FieldSchema,
        sanitized: &PredictionInput,
    ) -> Result<PredictionJob, AdapterError> {
        let payload = self.schemas.transform_input_for_provider(schema, sanitized);
        let mut body = json!({ "input": payload });
        match self.target_of(model)? {
            PredictionTarget::Version(version) => body["version"] = json!(version),
            PredictionTarget::Model(model_id) => body["model"] = json!(model_id),
        }
        if !model.webhook_events.is_empty() {
            if let Some(url) = &self.webhook_url {
                body["webhook"] = json!(url);
                body["webhook_events_filter"] = json!(model.webhook_events);
            }
        }

        let response = self
            .request(Method::POST, "/predictions")
            .json(&body)
            .send()
            .await?;
        let job = decode_job(response).await?;
        info!(
            "Created prediction {} for model {} (status={})",
            job.id, model.slug, job.status
        );
        Ok(job)
    }
}

async fn decode_job(response: Response) -> Result<PredictionJob, AdapterError> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(AdapterError::provider(
            format!("provider returned {}: {}", status, text),
            Some(status.as_u16()),
        ));
    }
    let value: Value = response.json().await.map_err(|e| {
        AdapterError::provider(format!("malformed response: {}", e), Some(status.as_u16()))
    })?;
    PredictionJob::from_wire(value)
}

#[async_trait]
impl GenerationProvider for ReplicateAdapter {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn run(
        &self,
        model: &ModelDescriptor,
        input: &PredictionInput,
    ) -> Result<PredictionJob, AdapterError> {
        let schema = self.schema_of(model)?;
        let sanitized = self.validate(schema, input)?;
        self.submit(model, schema, &sanitized).await
    }

    async fn get_status(&self, job_id: &str) -> Result<PredictionJob, AdapterError> {
        let response = self
            .request(Method::GET, &format!("/predictions/{}", job_id))
            .send()
            .await?;
        decode_job(response).await
    }

    async fn wait_for_completion(
        &self,
        job_id: &str,
        options: WaitOptions,
    ) -> Result<PredictionJob, AdapterError> {
        let poll = async {
            let mut job = self.get_status(job_id).await?;
            while !job.is_terminal() {
                tokio::time::sleep(options.interval).await;
                job = self.get_status(job_id).await?;
                debug!("Prediction {} is {}", job_id, job.status);
            }
            Ok::<PredictionJob, AdapterError>(job)
        };

        match options.deadline {
            None => poll.await,
            Some(deadline) => match tokio::time::timeout(deadline, poll).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        "Stopped waiting for prediction {} after {:?}; job left running",
                        job_id, deadline
                    );
                    Err(AdapterError::DeadlineExceeded {
                        job_id: job_id.to_string(),
                        waited: deadline,
                    })
                }
            },
        }
    }

    async fn cancel(&self, job_id: &str) -> bool {
        let result = self
            .request(Method::POST, &format!("/predictions/{}/cancel", job_id))
            .send()
            .await;
        match result {
            Ok(resp) if resp.status().is_success() => {
                info!("Canceled prediction {}", job_id);
                true
            }
            Ok(resp) => {
                warn!("Cancel of prediction {} returned {}", job_id, resp.status());
                false
            }
            Err(e) => {
                warn!("Cancel of prediction {} failed: {}", job_id, e);
                false
            }
        }
    }

    async fn run_batch(
        &self,
        model: &ModelDescriptor,
        inputs: &[Option<PredictionInput>],
    ) -> Result<Vec<PredictionJob>, AdapterError> {
        let schema = self.schema_of(model)?;

        let mut prepared = Vec::with_capacity(inputs.len());
        for (index, slot) in inputs.iter().enumerate() {
            let Some(input) = slot else { continue };
            match self.validate(schema, input) {
                Ok(sanitized) => prepared.push(sanitized),
                Err(AdapterError::InvalidInput { message, errors }) => {
                    return Err(AdapterError::InvalidInput {
                        message: format!("input[{}]: {}", index, message),
                        errors,
                    })
                }
                Err(e) => return Err(e),
            }
        }
        self.target_of(model)?;

        info!(
            "Submitting batch of {} predictions for model {}",
            prepared.len(),
            model.slug
        );
        let results = futures::future::join_all(
            prepared
                .iter()
                .map(|sanitized| self.submit(model, schema, sanitized)),
        )
        .await;

        let mut jobs = Vec::with_capacity(results.len());
        let mut first_error: Option<AdapterError> = None;
        for result in results {
            match result {
                Ok(job) => jobs.push(job),
                Err(e) if first_error.is_none() => first_error = Some(e),
                Err(_) => {}
            }
        }
        match first_error {
            None => Ok(jobs),
            Some(e) => {
                if !jobs.is_empty() {
                    warn!(
                        "Batch for {} partially submitted; running jobs: {}",
                        model.slug,
                        jobs.iter().map(|j| j.id.as_str()).collect::<Vec<_>>().join(", ")
                    );
                }
                Err(AdapterError::Batch {
                    status: e.http_status(),
                    message: e.to_string(),
                })
            }
        }
    }

    fn validate_webhook(&self, signature: &str, raw_body: &[u8]) -> bool {
        self.webhooks.verify(signature, raw_body)
    }

    async fn health_check(&self) -> bool {
        // Smallest authenticated resource the provider exposes
        match self.request(Method::GET, HEALTH_PATH).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!("Provider health check failed: {}", e);
                false
            }
        }
    }
}
