// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod provider;
pub mod server;

pub use provider::{ConfigError, ProviderConfig, DEFAULT_BASE_URL};
pub use server::ServerConfig;
