// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for asset-forge

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-replicate-adapter-2025-11-03";

/// Semantic version number
pub const VERSION_NUMBER: &str = "0.1.0";

/// Build date
pub const BUILD_DATE: &str = "2025-11-03";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "openapi-schema-derivation",
    "schema-validation",
    "form-value-coercion",
    "prediction-lifecycle",
    "wait-deadline",
    "batch-predictions",
    "cost-estimates",
    "webhook-verification",
    "catalog-ttl-refresh",
];

/// Get formatted version string
pub fn get_version_string() -> String {
    format!("asset-forge {} ({})", VERSION_NUMBER, BUILD_DATE)
}
