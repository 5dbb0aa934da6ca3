// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Adapter construction and prediction submission

use asset_forge::catalog::{MediaType, ModelDescriptor};
use asset_forge::config::ProviderConfig;
use asset_forge::provider::{ErrorKind, GenerationProvider, ReplicateAdapter};
use asset_forge::schema::{derive_field_schema, BinaryFile, PredictionInput};
use serde_json::json;
use std::sync::atomic::Ordering;

use crate::stub_provider::{sdxl_openapi, StubProvider, LATEST_VERSION_ID};

fn sdxl() -> ModelDescriptor {
    ModelDescriptor::new("sdxl", MediaType::Image)
        .with_provider_model("stability-ai/sdxl")
        .with_version(LATEST_VERSION_ID)
        .with_schema(derive_field_schema(&sdxl_openapi(), "stability-ai/sdxl").unwrap())
        .with_cost(0.0055)
}

#[test]
fn test_adapter_requires_token() {
    let err = match ReplicateAdapter::new(&ProviderConfig::default()) {
        Ok(_) => panic!("adapter built without a token"),
        Err(e) => e,
    };
    assert_eq!(err.kind(), ErrorKind::ConfigurationError);
    assert_eq!(err.http_status(), Some(400));
}

#[test]
fn test_adapter_name() {
    let adapter = ReplicateAdapter::new(&ProviderConfig::new("r8_x")).unwrap();
    assert_eq!(adapter.name(), "replicate");
}

#[tokio::test]
async fn test_run_submits_transformed_input_by_version() {
    let stub = StubProvider::start().await;
    let adapter = ReplicateAdapter::new(&stub.config()).unwrap();

    let input = PredictionInput::new()
        .with_value("prompt", "an astronaut riding a horse")
        .with_value("num_outputs", "2")
        .with_value("apply_watermark", "false");
    let job = adapter.run(&sdxl(), &input).await.unwrap();
    assert_eq!(job.id, "pred-0");
    assert!(!job.is_terminal());

    let body = stub.state.last_create_body().unwrap();
    assert_eq!(body["version"], LATEST_VERSION_ID);
    assert!(body.get("model").is_none());
    assert_eq!(body["input"]["num_outputs"], json!(2));
    assert_eq!(body["input"]["apply_watermark"], json!(false));
    assert_eq!(body["input"]["width"], json!(1024));
    assert_eq!(body["input"]["scheduler"], json!("K_EULER"));
    assert!(body.get("webhook").is_none());
}

#[tokio::test]
async fn test_run_without_version_targets_model() {
    let stub = StubProvider::start().await;
    let adapter = ReplicateAdapter::new(&stub.config()).unwrap();
    let mut model = sdxl();
    model.provider_version = None;

    adapter
        .run(&model, &PredictionInput::new().with_value("prompt", "x"))
        .await
        .unwrap();
    let body = stub.state.last_create_body().unwrap();
    assert_eq!(body["model"], "stability-ai/sdxl");
    assert!(body.get("version").is_none());
}

#[tokio::test]
async fn test_run_encodes_binary_files() {
    let stub = StubProvider::start().await;
    let adapter = ReplicateAdapter::new(&stub.config()).unwrap();

    let input = PredictionInput::new()
        .with_value("prompt", "x")
        .with_file("image", BinaryFile::new(&b"png"[..], "image/png"));
    adapter.run(&sdxl(), &input).await.unwrap();
    let body = stub.state.last_create_body().unwrap();
    assert_eq!(body["input"]["image"], "data:image/png;base64,cG5n");
}

#[tokio::test]
async fn test_invalid_input_is_never_submitted() {
    let stub = StubProvider::start().await;
    let adapter = ReplicateAdapter::new(&stub.config()).unwrap();

    let err = adapter
        .run(&sdxl(), &PredictionInput::new().with_value("width", 64))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    let fields: Vec<&str> = err
        .validation_errors()
        .iter()
        .map(|e| e.field.as_str())
        .collect();
    assert!(fields.contains(&"prompt"));
    assert!(fields.contains(&"width"));
    assert_eq!(stub.state.creates(), 0);
}

#[tokio::test]
async fn test_model_without_schema_is_a_configuration_error() {
    let stub = StubProvider::start().await;
    let adapter = ReplicateAdapter::new(&stub.config()).unwrap();
    let mut model = sdxl();
    model.input_schema = None;

    let err = adapter
        .run(&model, &PredictionInput::new().with_value("prompt", "x"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConfigurationError);
    assert_eq!(stub.state.creates(), 0);
}

#[tokio::test]
async fn test_model_for_other_provider_is_rejected() {
    let stub = StubProvider::start().await;
    let adapter = ReplicateAdapter::new(&stub.config()).unwrap();
    let mut model = sdxl();
    model.provider = "fal".to_string();

    let err = adapter
        .run(&model, &PredictionInput::new().with_value("prompt", "x"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConfigurationError);
}

#[tokio::test]
async fn test_model_without_target_is_a_configuration_error() {
    let stub = StubProvider::start().await;
    let adapter = ReplicateAdapter::new(&stub.config()).unwrap();
    let mut model = sdxl();
    model.provider_version = Some("  ".to_string());
    model.provider_model_id = None;

    let err = adapter
        .run(&model, &PredictionInput::new().with_value("prompt", "x"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConfigurationError);
    assert_eq!(stub.state.creates(), 0);
}

#[tokio::test]
async fn test_webhook_attached_when_model_subscribes() {
    let stub = StubProvider::start().await;
    let config = stub.config().with_webhook(
        Some("https://forge.example.com/v1/webhooks/provider".to_string()),
        Some("whsec_test".to_string()),
    );
    let adapter = ReplicateAdapter::new(&config).unwrap();
    let model = sdxl().with_webhook_events(["completed"]);

    adapter
        .run(&model, &PredictionInput::new().with_value("prompt", "x"))
        .await
        .unwrap();
    let body = stub.state.last_create_body().unwrap();
    assert_eq!(body["webhook"], "https://forge.example.com/v1/webhooks/provider");
    assert_eq!(body["webhook_events_filter"], json!(["completed"]));
}

#[tokio::test]
async fn test_provider_rejection_keeps_status() {
    let stub = StubProvider::start().await;
    let mut config = stub.config();
    config.api_token = Some("wrong".to_string());
    let adapter = ReplicateAdapter::new(&config).unwrap();

    let err = adapter
        .run(&sdxl(), &PredictionInput::new().with_value("prompt", "x"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProviderError);
    assert_eq!(err.http_status(), Some(401));
}

#[tokio::test]
async fn test_health_check() {
    let stub = StubProvider::start().await;
    let adapter = ReplicateAdapter::new(&stub.config()).unwrap();
    assert!(adapter.health_check().await);
    assert_eq!(stub.state.account_calls.load(Ordering::SeqCst), 1);
    assert_eq!(stub.state.schema_requests(), 0);

    let unreachable = ProviderConfig::new("r8_x").with_base_url("http://127.0.0.1:9");
    let adapter = ReplicateAdapter::new(&unreachable).unwrap();
    assert!(!adapter.health_check().await);
}
