// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use clap::Args;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// HTTP server settings, from flags or environment
#[derive(Args, Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP API listens on
    #[arg(long, env = "ASSET_FORGE_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// JSON or TOML file holding the model catalog
    #[arg(long, env = "ASSET_FORGE_MODELS_FILE")]
    pub models_file: Option<PathBuf>,

    /// Seconds before the catalog re-reads its store
    #[arg(long, env = "CATALOG_TTL_SECS", default_value_t = 300)]
    pub catalog_ttl_secs: u64,
}

impl ServerConfig {
    pub fn catalog_ttl(&self) -> Duration {
        Duration::from_secs(self.catalog_ttl_secs)
    }
}
