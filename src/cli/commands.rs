// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::catalog::{FileModelStore, ModelCatalog, ModelDescriptor, DEFAULT_CATALOG_TTL};
use crate::config::ProviderConfig;
use crate::provider::{
    estimate_cost, GenerationProvider, ReplicateAdapter, WaitOptions, WebhookMode,
    WebhookVerifier,
};
use crate::schema::{PredictionInput, SchemaEngine, ValidationReport, LATEST_VERSION};

/// Arguments for the schema command
#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Provider model id, e.g. `stability-ai/sdxl`
    pub model: String,

    /// Model version id
    #[arg(long, default_value = LATEST_VERSION)]
    pub version: String,
}

/// Arguments for commands that take a catalog slug and an input document
#[derive(Args, Debug)]
pub struct InputArgs {
    /// Catalog model slug
    pub slug: String,

    /// Input as inline JSON, or `@path` to read it from a file
    pub input: String,
}

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub target: InputArgs,

    /// Poll until the prediction finishes
    #[arg(long)]
    pub wait: bool,

    /// Give up waiting after this many seconds (the prediction keeps running)
    #[arg(long, requires = "wait")]
    pub timeout_secs: Option<u64>,
}

/// Arguments for commands that address one prediction
#[derive(Args, Debug)]
pub struct JobArgs {
    /// Prediction id
    pub id: String,
}

/// Arguments for verify-webhook
#[derive(Args, Debug)]
pub struct VerifyWebhookArgs {
    /// Value of the signature header, `sha256=<hex>`
    pub signature: String,

    /// File holding the raw request body
    pub body_file: PathBuf,

    /// Shared secret (defaults to REPLICATE_WEBHOOK_SECRET)
    #[arg(long, env = "REPLICATE_WEBHOOK_SECRET", hide_env_values = true)]
    pub secret: Option<String>,
}

/// Parse an inline JSON object or read one from `@path`
pub fn parse_input(raw: &str) -> Result<PredictionInput> {
    let text = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read input file {}", path))?,
        None => raw.to_string(),
    };
    let value: Value = serde_json::from_str(&text).context("input is not valid JSON")?;
    if !value.is_object() {
        bail!("input must be a JSON object");
    }
    Ok(PredictionInput::from_json(value))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_catalog(models_file: Option<PathBuf>) -> Result<ModelCatalog> {
    let path = models_file.ok_or_else(|| {
        anyhow!("A model catalog is required. Use --models-file or set ASSET_FORGE_MODELS_FILE")
    })?;
    Ok(ModelCatalog::new(
        Arc::new(FileModelStore::new(path)),
        DEFAULT_CATALOG_TTL,
    ))
}

async fn resolve_model(
    models_file: Option<PathBuf>,
    slug: &str,
    schemas: Option<&SchemaEngine>,
) -> Result<ModelDescriptor> {
    let catalog = load_catalog(models_file)?;
    let model = match schemas {
        Some(engine) => catalog.model_with_schema(slug, engine).await?,
        None => catalog
            .get_model(slug)
            .await?
            .ok_or_else(|| anyhow!("Model '{}' not found in catalog", slug))?,
    };
    Ok(model)
}

fn adapter() -> Result<ReplicateAdapter> {
    dotenv::dotenv().ok();
    let config = ProviderConfig::from_env()?;
    Ok(ReplicateAdapter::new(&config)?)
}

pub async fn show_schema(args: SchemaArgs) -> Result<()> {
    dotenv::dotenv().ok();
    let config = ProviderConfig::from_env()?;
    let engine = SchemaEngine::from_config(&config)?;
    let schema = engine.fetch_schema(&args.model, &args.version).await?;
    info!("{} fields in {}@{}", schema.len(), args.model, args.version);
    print_json(&schema)
}

pub async fn validate(models_file: Option<PathBuf>, args: InputArgs) -> Result<()> {
    let input = parse_input(&args.input)?;
    let adapter = adapter()?;
    let engine = adapter.schema_engine();
    let model = resolve_model(models_file, &args.slug, Some(&**engine)).await?;
    let schema = model.input_schema.unwrap_or_default();

    let result = engine.validate_input(&schema, &input);
    print_json(&ValidationReport::from(&result))?;
    if !result.valid {
        bail!("input is invalid: {}", result.error_summary());
    }
    Ok(())
}

pub async fn estimate(models_file: Option<PathBuf>, args: InputArgs) -> Result<()> {
    let input = parse_input(&args.input)?;
    let model = resolve_model(models_file, &args.slug, None).await?;
    let cost = estimate_cost(&model, &input);
    println!("{}: {:.5}", model.slug, cost);
    Ok(())
}

pub async fn run(models_file: Option<PathBuf>, args: RunArgs) -> Result<()> {
    let input = parse_input(&args.target.input)?;
    let adapter = adapter()?;
    let engine = adapter.schema_engine();
    let model = resolve_model(models_file, &args.target.slug, Some(&**engine)).await?;

    let job = adapter.run(&model, &input).await?;
    println!("Submitted prediction {} ({})", job.id, job.status);
    if !args.wait {
        return print_json(&job);
    }

    let mut options = WaitOptions::default();
    if let Some(secs) = args.timeout_secs {
        options = options.with_deadline(Duration::from_secs(secs));
    }
    let finished = adapter.wait_for_completion(&job.id, options).await?;
    print_json(&finished)
}

pub async fn status(args: JobArgs) -> Result<()> {
    let job = adapter()?.get_status(&args.id).await?;
    print_json(&job)
}

pub async fn cancel(args: JobArgs) -> Result<()> {
    if adapter()?.cancel(&args.id).await {
        println!("Canceled prediction {}", args.id);
        Ok(())
    } else {
        bail!("prediction {} could not be canceled", args.id)
    }
}

pub async fn verify_webhook(args: VerifyWebhookArgs) -> Result<()> {
    let body = read_body(&args.body_file)?;
    let verifier = WebhookVerifier::new(args.secret.as_deref());
    if verifier.mode() == WebhookMode::Bypass {
        println!("⚠️  No secret configured: signature not checked");
    }
    if verifier.verify(&args.signature, &body) {
        println!("Signature valid");
        Ok(())
    } else {
        bail!("signature does not match body")
    }
}

fn read_body(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}
