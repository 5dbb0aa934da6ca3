// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use asset_forge::{
    api::{start_server, AppState},
    catalog::{FileModelStore, InMemoryModelStore, ModelCatalog, ModelStore},
    config::{ProviderConfig, ServerConfig},
    provider::{GenerationProvider, ReplicateAdapter},
};
use clap::Parser;
use std::{env, sync::Arc};
use tokio::signal;
use tracing::{info, warn};

/// Asset Forge HTTP API
#[derive(Parser, Debug)]
#[command(name = "asset-forge")]
#[command(version = asset_forge::version::VERSION_NUMBER)]
#[command(about = "Schema-validated generation API over Replicate", long_about = None)]
struct Args {
    #[command(flatten)]
    server: ServerConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    info!(
        "Starting asset-forge {} (built {})",
        asset_forge::version::VERSION,
        asset_forge::version::BUILD_DATE
    );

    let provider_config = ProviderConfig::from_env()?;
    let adapter = ReplicateAdapter::new(&provider_config)?;
    let schemas = adapter.schema_engine().clone();

    let store: Arc<dyn ModelStore> = match &args.server.models_file {
        Some(path) => {
            info!("Loading model catalog from {}", path.display());
            Arc::new(FileModelStore::new(path))
        }
        None => {
            warn!("No models file configured; the catalog starts empty");
            Arc::new(InMemoryModelStore::default())
        }
    };
    let catalog = Arc::new(ModelCatalog::new(store, args.server.catalog_ttl()));
    let count = catalog.refresh().await?;
    info!("Catalog ready with {} models", count);
    let refresh = catalog.spawn_refresh(args.server.catalog_ttl());

    let provider: Arc<dyn GenerationProvider> = Arc::new(adapter);
    if !provider.health_check().await {
        warn!("Provider is not reachable at startup; continuing");
    }

    let state = AppState {
        catalog,
        provider,
        schemas,
        poll_interval: provider_config.poll_interval,
    };

    let bind = args.server.bind;
    tokio::select! {
        result = start_server(state, bind) => {
            if let Err(e) = result {
                warn!("API server stopped: {}", e);
            }
        }
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    refresh.shutdown().await;
    info!("asset-forge stopped");
    Ok(())
}
