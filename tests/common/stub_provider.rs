// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-process stand-in for the Replicate HTTP API, bound to an ephemeral port
#![allow(dead_code)]

use asset_forge::config::ProviderConfig;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const TEST_TOKEN: &str = "r8_test_token";
pub const LATEST_VERSION_ID: &str = "5c7d5dc6dd8bf75c1acaa8565735e7986bc5b66206b55cca93cb72c9bf15ccaa";

/// Knobs controlling the stub's behavior
#[derive(Debug, Clone)]
pub struct StubOptions {
    /// Number of status polls before a job reports `succeeded`
    pub complete_after_polls: usize,
    /// Status returned by `POST /predictions` for every call at or after this index
    pub fail_creates_from: Option<usize>,
    pub fail_status: u16,
    /// OpenAPI document served for every model version
    pub openapi: Value,
}

impl Default for StubOptions {
    fn default() -> Self {
        Self {
            complete_after_polls: 2,
            fail_creates_from: None,
            fail_status: 500,
            openapi: sdxl_openapi(),
        }
    }
}

#[derive(Default)]
pub struct StubState {
    pub options: Mutex<Option<StubOptions>>,
    pub create_calls: AtomicUsize,
    pub model_info_calls: AtomicUsize,
    pub version_calls: AtomicUsize,
    pub cancel_calls: AtomicUsize,
    pub account_calls: AtomicUsize,
    pub create_bodies: Mutex<Vec<Value>>,
    pub jobs: Mutex<HashMap<String, Value>>,
    pub polls: Mutex<HashMap<String, usize>>,
}

impl StubState {
    fn options(&self) -> StubOptions {
        self.options.lock().unwrap().clone().unwrap_or_default()
    }

    pub fn creates(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn schema_requests(&self) -> usize {
        self.model_info_calls.load(Ordering::SeqCst) + self.version_calls.load(Ordering::SeqCst)
    }

    pub fn last_create_body(&self) -> Option<Value> {
        self.create_bodies.lock().unwrap().last().cloned()
    }
}

pub struct StubProvider {
    pub addr: SocketAddr,
    pub state: Arc<StubState>,
}

impl StubProvider {
    pub async fn start() -> Self {
        Self::start_with(StubOptions::default()).await
    }

    pub async fn start_with(options: StubOptions) -> Self {
        let state = Arc::new(StubState::default());
        *state.options.lock().unwrap() = Some(options);

        let app = Router::new()
            .route("/account", get(account))
            .route("/models/:owner/:name", get(model_info))
            .route("/models/:owner/:name/versions/:version", get(version_info))
            .route("/predictions", post(create_prediction))
            .route("/predictions/:id", get(get_prediction))
            .route("/predictions/:id/cancel", post(cancel_prediction))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Provider config pointed at this stub, with fast polling and no retries
    pub fn config(&self) -> ProviderConfig {
        let mut config = ProviderConfig::new(TEST_TOKEN).with_base_url(self.base_url());
        config.max_retries = 0;
        config.poll_interval = Duration::from_millis(10);
        config.timeout = Duration::from_secs(5);
        config
    }
}

/// A model input schema shaped like a Stable Diffusion XL version
pub fn sdxl_openapi() -> Value {
    json!({
        "openapi": "3.0.2",
        "components": {
            "schemas": {
                "Input": {
                    "type": "object",
                    "title": "Input",
                    "required": ["prompt"],
                    "properties": {
                        "prompt": {"type": "string", "title": "Prompt", "x-order": 0},
                        "width": {"type": "integer", "default": 1024, "minimum": 128, "maximum": 2048, "x-order": 1},
                        "num_outputs": {"type": "integer", "default": 1, "minimum": 1, "maximum": 4, "x-order": 2},
                        "guidance_scale": {"type": "number", "default": 7.5, "minimum": 1, "maximum": 50},
                        "apply_watermark": {"type": "boolean", "default": true},
                        "image": {"type": "string", "format": "uri", "description": "Input image for img2img"},
                        "scheduler": {
                            "allOf": [{"$ref": "#/components/schemas/scheduler"}],
                            "default": "K_EULER"
                        }
                    }
                },
                "scheduler": {
                    "title": "scheduler",
                    "type": "string",
                    "enum": ["DDIM", "K_EULER", "DPMSolverMultistep"]
                },
                "Output": {"type": "array", "items": {"type": "string", "format": "uri"}}
            }
        }
    })
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v == format!("Token {}", TEST_TOKEN))
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Invalid token."})),
    )
        .into_response()
}

async fn account(State(state): State<Arc<StubState>>, headers: HeaderMap) -> Response {
    state.account_calls.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({"type": "user", "username": "asset-forge", "name": "Asset Forge"})).into_response()
}

async fn model_info(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Path((owner, name)): Path<(String, String)>,
) -> Response {
    state.model_info_calls.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return unauthorized();
    }
    if owner == "missing" {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response();
    }
    Json(json!({
        "owner": owner,
        "name": name,
        "latest_version": {"id": LATEST_VERSION_ID}
    }))
    .into_response()
}

async fn version_info(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Path((_owner, _name, version)): Path<(String, String, String)>,
) -> Response {
    state.version_calls.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return unauthorized();
    }
    if version == "no-input" {
        return Json(json!({
            "id": version,
            "openapi_schema": {"components": {"schemas": {"Output": {"type": "string"}}}}
        }))
        .into_response();
    }
    Json(json!({"id": version, "openapi_schema": state.options().openapi})).into_response()
}

async fn create_prediction(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let index = state.create_calls.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return unauthorized();
    }
    state.create_bodies.lock().unwrap().push(body.clone());

    let options = state.options();
    if options.fail_creates_from.map_or(false, |from| index >= from) {
        let status =
            StatusCode::from_u16(options.fail_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, Json(json!({"detail": "upstream failure"}))).into_response();
    }

    let id = format!("pred-{}", index);
    let job = json!({
        "id": id,
        "status": "starting",
        "model": body.get("model").cloned().unwrap_or(Value::Null),
        "version": body.get("version").cloned().unwrap_or(Value::Null),
        "input": body.get("input").cloned().unwrap_or_else(|| json!({})),
        "output": null,
        "error": null,
        "logs": "",
        "created_at": "2024-05-01T10:00:00.000Z",
        "urls": {
            "get": format!("https://api.replicate.com/v1/predictions/{}", id),
            "cancel": format!("https://api.replicate.com/v1/predictions/{}/cancel", id)
        }
    });
    state.jobs.lock().unwrap().insert(id, job.clone());
    (StatusCode::CREATED, Json(job)).into_response()
}

async fn get_prediction(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let complete_after = state.options().complete_after_polls;
    let polls = {
        let mut polls = state.polls.lock().unwrap();
        let count = polls.entry(id.clone()).or_insert(0);
        *count += 1;
        *count
    };

    let mut jobs = state.jobs.lock().unwrap();
    let Some(job) = jobs.get_mut(&id) else {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response();
    };
    if job["status"] == "starting" || job["status"] == "processing" {
        if polls >= complete_after {
            job["status"] = json!("succeeded");
            job["output"] = json!([format!("https://replicate.delivery/{}/out-0.png", id)]);
            job["started_at"] = json!("2024-05-01T10:00:01.000Z");
            job["completed_at"] = json!("2024-05-01T10:00:04.000Z");
            job["metrics"] = json!({"predict_time": 3.0});
        } else {
            job["status"] = json!("processing");
        }
    }
    Json(job.clone()).into_response()
}

async fn cancel_prediction(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    state.cancel_calls.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut jobs = state.jobs.lock().unwrap();
    let Some(job) = jobs.get_mut(&id) else {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response();
    };
    if !(job["status"] == "succeeded" || job["status"] == "failed") {
        job["status"] = json!("canceled");
    }
    Json(job.clone()).into_response()
}
