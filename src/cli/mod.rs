// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Asset Forge CLI
#[derive(Parser, Debug)]
#[command(name = "asset-forge-cli")]
#[command(version = crate::version::VERSION_NUMBER)]
#[command(about = "CLI tools for schemas, predictions and webhooks on Replicate", long_about = None)]
pub struct Cli {
    /// JSON or TOML model catalog used to resolve slugs
    #[arg(long, global = true, env = "ASSET_FORGE_MODELS_FILE")]
    pub models_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch and print the derived input schema of a provider model
    Schema(commands::SchemaArgs),

    /// Validate an input against a catalog model's schema
    Validate(commands::InputArgs),

    /// Estimate the cost of an input for a catalog model
    Estimate(commands::InputArgs),

    /// Submit a prediction for a catalog model
    Run(commands::RunArgs),

    /// Show the current state of a prediction
    Status(commands::JobArgs),

    /// Cancel a prediction
    Cancel(commands::JobArgs),

    /// Check a webhook signature against a saved request body
    VerifyWebhook(commands::VerifyWebhookArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let models_file = cli.models_file;
    match cli.command {
        Commands::Schema(args) => commands::show_schema(args).await,
        Commands::Validate(args) => commands::validate(models_file, args).await,
        Commands::Estimate(args) => commands::estimate(models_file, args).await,
        Commands::Run(args) => commands::run(models_file, args).await,
        Commands::Status(args) => commands::status(args).await,
        Commands::Cancel(args) => commands::cancel(args).await,
        Commands::VerifyWebhook(args) => commands::verify_webhook(args).await,
    }
}
