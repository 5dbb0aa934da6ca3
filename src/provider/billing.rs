// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Local cost estimate for a prediction request

use serde_json::Value;

use crate::catalog::{MediaType, ModelDescriptor};
use crate::schema::PredictionInput;

/// Frame count a video model's base rate is quoted for
pub const VIDEO_BASELINE_FRAMES: f64 = 24.0;

/// Token count a text model's base rate is quoted for
pub const TEXT_BASELINE_TOKENS: f64 = 1000.0;

const COST_DECIMALS: i32 = 5;

/// Estimate the cost of running `model` on `input`.
///
/// Formula by media type, with `base = cost_per_use`:
/// - text: `base * max_tokens / 1000`
/// - image: `base * num_outputs`
/// - video: `base * num_frames / 24`
///
/// Other media types, or a missing scaling parameter, give the unscaled base.
/// The result is rounded to 5 decimal places. A non-finite intermediate falls
/// back to the unscaled base (0 when the model has no price).
pub fn estimate_cost(model: &ModelDescriptor, input: &PredictionInput) -> f64 {
    let base = model
        .cost_per_use
        .filter(|c| c.is_finite())
        .unwrap_or(0.0);

    let factor = match model.media_type {
        MediaType::Text => scaling_param(input, "max_tokens").map(|t| t / TEXT_BASELINE_TOKENS),
        MediaType::Image => scaling_param(input, "num_outputs"),
        MediaType::Video => scaling_param(input, "num_frames").map(|f| f / VIDEO_BASELINE_FRAMES),
        MediaType::Audio | MediaType::Utility => None,
    };

    let cost = factor.map_or(base, |f| base * f);
    if !cost.is_finite() {
        return base;
    }
    round_to(cost, COST_DECIMALS)
}

fn scaling_param(input: &PredictionInput, name: &str) -> Option<f64> {
    let n = match input.get(name)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (n.is_finite() && n >= 0.0).then_some(n)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
