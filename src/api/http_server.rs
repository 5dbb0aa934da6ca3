// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::{ApiError, AppState};
use crate::catalog::{MediaType, ModelDescriptor};
use crate::provider::{PredictionJob, WaitOptions};
use crate::schema::{FieldSchema, PredictionInput, ValidationReport};

pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

#[derive(Debug, Deserialize)]
pub struct PredictionBody {
    #[serde(default)]
    pub input: Value,
}

#[derive(Debug, Deserialize)]
pub struct BatchBody {
    pub inputs: Vec<Option<Value>>,
}

#[derive(Debug, Deserialize)]
pub struct ModelsQuery {
    pub media_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WaitQuery {
    pub timeout_ms: Option<u64>,
    pub interval_ms: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub provider_reachable: bool,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CostEstimateResponse {
    pub slug: String,
    pub cost: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CancelResponse {
    pub id: String,
    pub canceled: bool,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/models", get(list_models_handler))
        .route("/v1/models/:slug/schema", get(schema_handler))
        .route("/v1/models/:slug/validate", post(validate_handler))
        .route("/v1/models/:slug/estimate", post(estimate_handler))
        .route("/v1/models/:slug/predictions", post(create_prediction_handler))
        .route(
            "/v1/models/:slug/predictions/batch",
            post(create_batch_handler),
        )
        .route("/v1/predictions/:id", get(get_prediction_handler))
        .route("/v1/predictions/:id/wait", post(wait_prediction_handler))
        .route("/v1/predictions/:id/cancel", post(cancel_prediction_handler))
        .route("/v1/webhooks/provider", post(webhook_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub async fn start_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("API server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let provider_reachable = state.provider.health_check().await;
    Json(HealthResponse {
        status: if provider_reachable { "ok" } else { "degraded" }.to_string(),
        provider_reachable,
        version: crate::version::VERSION.to_string(),
    })
}

async fn list_models_handler(
    State(state): State<AppState>,
    Query(query): Query<ModelsQuery>,
) -> Result<Json<Vec<ModelDescriptor>>, ApiError> {
    let media_type = query
        .media_type
        .as_deref()
        .map(str::parse::<MediaType>)
        .transpose()
        .map_err(ApiError::InvalidRequest)?;
    Ok(Json(state.catalog.list_models(media_type).await?))
}

async fn schema_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<FieldSchema>, ApiError> {
    let model = state.catalog.model_with_schema(&slug, &state.schemas).await?;
    Ok(Json(model.input_schema.unwrap_or_default()))
}

async fn validate_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(body): Json<PredictionBody>,
) -> Result<Json<ValidationReport>, ApiError> {
    let model = state.catalog.model_with_schema(&slug, &state.schemas).await?;
    let schema = model.input_schema.unwrap_or_default();
    let result = state
        .schemas
        .validate_input(&schema, &PredictionInput::from_json(body.input));
    Ok(Json(ValidationReport::from(&result)))
}

async fn estimate_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(body): Json<PredictionBody>,
) -> Result<Json<CostEstimateResponse>, ApiError> {
    let model = state
        .catalog
        .get_model(&slug)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Model '{}' not found", slug)))?;
    let cost = state
        .provider
        .estimate_cost(&model, &PredictionInput::from_json(body.input));
    Ok(Json(CostEstimateResponse { slug, cost }))
}

async fn create_prediction_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(body): Json<PredictionBody>,
) -> Result<(StatusCode, Json<PredictionJob>), ApiError> {
    let model = state.catalog.model_with_schema(&slug, &state.schemas).await?;
    let job = state
        .provider
        .run(&model, &PredictionInput::from_json(body.input))
        .await?;
    Ok((StatusCode::CREATED, Json(job)))
}

async fn create_batch_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(body): Json<BatchBody>,
) -> Result<(StatusCode, Json<Vec<PredictionJob>>), ApiError> {
    let model = state.catalog.model_with_schema(&slug, &state.schemas).await?;
    let inputs: Vec<Option<PredictionInput>> = body
        .inputs
        .into_iter()
        .map(|slot| slot.filter(|v| !v.is_null()).map(PredictionInput::from_json))
        .collect();
    let jobs = state.provider.run_batch(&model, &inputs).await?;
    Ok((StatusCode::CREATED, Json(jobs)))
}

async fn get_prediction_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PredictionJob>, ApiError> {
    Ok(Json(state.provider.get_status(&id).await?))
}

async fn wait_prediction_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<WaitQuery>,
) -> Result<Json<PredictionJob>, ApiError> {
    let mut options = WaitOptions::default().with_interval(
        query
            .interval_ms
            .map(Duration::from_millis)
            .unwrap_or(state.poll_interval),
    );
    if let Some(timeout_ms) = query.timeout_ms {
        options = options.with_deadline(Duration::from_millis(timeout_ms));
    }
    Ok(Json(state.provider.wait_for_completion(&id, options).await?))
}

async fn cancel_prediction_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<CancelResponse> {
    let canceled = state.provider.cancel(&id).await;
    Json(CancelResponse { id, canceled })
}

async fn webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !state.provider.validate_webhook(signature, &body) {
        return Err(ApiError::Unauthorized(
            "webhook signature verification failed".to_string(),
        ));
    }

    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::InvalidRequest(format!("webhook body is not JSON: {}", e)))?;
    let job = PredictionJob::from_wire(payload)
        .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
    info!(
        "Webhook: prediction {} is {} ({:?})",
        job.id,
        job.status,
        job.status.generation_state()
    );
    Ok(StatusCode::NO_CONTENT)
}
