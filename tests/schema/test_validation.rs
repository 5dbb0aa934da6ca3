// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Input validation against field schemas

use asset_forge::schema::{
    BinaryFile, FieldSchema, FieldSpec, FieldType, PredictionInput, SchemaEngine,
    ValidationReport,
};
use serde_json::json;

fn image_schema() -> FieldSchema {
    let mut schema = FieldSchema::new();
    schema.insert(
        "prompt".to_string(),
        FieldSpec::new(FieldType::String).required(),
    );
    schema.insert(
        "width".to_string(),
        FieldSpec::new(FieldType::Integer)
            .with_default(1024)
            .with_range(Some(128.0), Some(2048.0)),
    );
    schema.insert(
        "guidance_scale".to_string(),
        FieldSpec::new(FieldType::Number).with_range(Some(1.0), Some(50.0)),
    );
    schema.insert(
        "scheduler".to_string(),
        FieldSpec::new(FieldType::Enum).with_options(["DDIM", "K_EULER"]),
    );
    schema.insert(
        "image".to_string(),
        FieldSpec::new(FieldType::File).with_accept("image/*"),
    );
    schema
}

fn engine() -> SchemaEngine {
    SchemaEngine::offline(16)
}

#[test]
fn test_valid_input_is_sanitized_with_defaults() {
    let input = PredictionInput::new().with_value("prompt", "a lighthouse at dusk");
    let result = engine().validate_input(&image_schema(), &input);
    assert!(result.valid, "{}", result.error_summary());
    assert!(result.errors.is_empty());
    let sanitized = result.sanitized_input.unwrap();
    assert_eq!(sanitized.get("width"), Some(&json!(1024)));
    assert_eq!(sanitized.get("prompt"), Some(&json!("a lighthouse at dusk")));
}

#[test]
fn test_missing_required_field() {
    let result = engine().validate_input(&image_schema(), &PredictionInput::new());
    assert!(!result.valid);
    assert!(result.sanitized_input.is_none());
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].field, "prompt");
    assert_eq!(result.errors[0].message, "Required");
}

#[test]
fn test_optional_overrides_required() {
    let mut schema = FieldSchema::new();
    schema.insert(
        "prompt".to_string(),
        FieldSpec::new(FieldType::String).required().optional(),
    );
    let result = engine().validate_input(&schema, &PredictionInput::new());
    assert!(result.valid);
}

#[test]
fn test_numeric_bounds_are_inclusive() {
    let schema = image_schema();
    let engine = engine();

    let at_min = PredictionInput::new()
        .with_value("prompt", "x")
        .with_value("width", 128);
    assert!(engine.validate_input(&schema, &at_min).valid);

    let at_max = PredictionInput::new()
        .with_value("prompt", "x")
        .with_value("width", 2048);
    assert!(engine.validate_input(&schema, &at_max).valid);

    let below = PredictionInput::new()
        .with_value("prompt", "x")
        .with_value("width", 127);
    let result = engine.validate_input(&schema, &below);
    assert!(!result.valid);
    assert_eq!(result.errors[0].field, "width");
    assert_eq!(
        result.errors[0].message,
        "Number must be greater than or equal to 128"
    );

    let above = PredictionInput::new()
        .with_value("prompt", "x")
        .with_value("guidance_scale", 50.5);
    let result = engine.validate_input(&schema, &above);
    assert_eq!(
        result.errors[0].message,
        "Number must be less than or equal to 50"
    );
}

#[test]
fn test_type_mismatch_message() {
    let input = PredictionInput::new()
        .with_value("prompt", 42)
        .with_value("width", "wide");
    let result = engine().validate_input(&image_schema(), &input);
    assert!(!result.valid);
    let messages: Vec<String> = result.errors.iter().map(|e| e.to_string()).collect();
    assert!(messages.contains(&"prompt: Expected string, received number".to_string()));
    assert!(messages.contains(&"width: Expected integer, received string".to_string()));
}

#[test]
fn test_form_strings_are_coerced() {
    let mut schema = image_schema();
    schema.insert(
        "apply_watermark".to_string(),
        FieldSpec::new(FieldType::Boolean),
    );
    let input = PredictionInput::new()
        .with_value("prompt", "x")
        .with_value("width", "512")
        .with_value("guidance_scale", "7.5")
        .with_value("apply_watermark", "false");
    let result = engine().validate_input(&schema, &input);
    assert!(result.valid, "{}", result.error_summary());
    let sanitized = result.sanitized_input.unwrap();
    assert_eq!(sanitized.get("width"), Some(&json!(512)));
    assert_eq!(sanitized.get("guidance_scale"), Some(&json!(7.5)));
    assert_eq!(sanitized.get("apply_watermark"), Some(&json!(false)));
}

#[test]
fn test_enum_rejects_unlisted_value() {
    let input = PredictionInput::new()
        .with_value("prompt", "x")
        .with_value("scheduler", "Euler a");
    let result = engine().validate_input(&image_schema(), &input);
    assert!(!result.valid);
    assert_eq!(result.errors[0].field, "scheduler");
    assert!(result.errors[0].message.starts_with("Invalid enum value"));
    assert_eq!(result.errors[0].value, Some(json!("Euler a")));
}

#[test]
fn test_numeric_enum_accepts_form_string() {
    let mut schema = FieldSchema::new();
    schema.insert(
        "fps".to_string(),
        FieldSpec::new(FieldType::Enum).with_options([json!(24), json!(30)]),
    );
    let input = PredictionInput::new().with_value("fps", "30");
    let result = engine().validate_input(&schema, &input);
    assert!(result.valid);
    assert_eq!(result.sanitized_input.unwrap().get("fps"), Some(&json!(30)));
}

#[test]
fn test_file_field_accepts_url_and_binary() {
    let schema = image_schema();
    let engine = engine();

    let by_url = PredictionInput::new()
        .with_value("prompt", "x")
        .with_value("image", "https://example.com/cat.png");
    assert!(engine.validate_input(&schema, &by_url).valid);

    let by_bytes = PredictionInput::new()
        .with_value("prompt", "x")
        .with_file("image", BinaryFile::new(vec![0x89, 0x50, 0x4e, 0x47], "image/png"));
    let result = engine.validate_input(&schema, &by_bytes);
    assert!(result.valid);
    assert!(result.sanitized_input.unwrap().files.contains_key("image"));

    let by_path = PredictionInput::new()
        .with_value("prompt", "x")
        .with_value("image", "cat.png");
    assert!(!engine.validate_input(&schema, &by_path).valid);
}

#[test]
fn test_binary_on_non_file_field_is_rejected() {
    let input = PredictionInput::new()
        .with_file("prompt", BinaryFile::new(vec![1, 2, 3], "application/octet-stream"));
    let result = engine().validate_input(&image_schema(), &input);
    assert!(!result.valid);
    assert_eq!(result.errors[0].field, "prompt");
}

#[test]
fn test_undeclared_fields_pass_through() {
    let input = PredictionInput::new()
        .with_value("prompt", "x")
        .with_value("seed", 1234);
    let result = engine().validate_input(&image_schema(), &input);
    assert!(result.valid);
    assert_eq!(result.sanitized_input.unwrap().get("seed"), Some(&json!(1234)));
}

#[test]
fn test_pattern_validation() {
    let mut schema = FieldSchema::new();
    schema.insert(
        "seed_phrase".to_string(),
        FieldSpec::new(FieldType::String).with_pattern("^[a-z]+$"),
    );
    let engine = engine();
    let ok = PredictionInput::new().with_value("seed_phrase", "lowercase");
    assert!(engine.validate_input(&schema, &ok).valid);
    let bad = PredictionInput::new().with_value("seed_phrase", "Mixed Case");
    let result = engine.validate_input(&schema, &bad);
    assert!(result.errors[0].message.starts_with("Does not match pattern"));
}

#[test]
fn test_broken_schema_reports_single_schema_error() {
    let mut schema = FieldSchema::new();
    schema.insert(
        "steps".to_string(),
        FieldSpec::new(FieldType::Integer).with_range(Some(10.0), Some(1.0)),
    );
    let result = engine().validate_input(&schema, &PredictionInput::new());
    assert!(!result.valid);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].field, "schema");
}

#[test]
fn test_validator_is_reused_for_equal_schemas() {
    let engine = engine();
    let input = PredictionInput::new().with_value("prompt", "x");
    engine.validate_input(&image_schema(), &input);
    engine.validate_input(&image_schema(), &input);
    let stats = engine.validator_cache_stats();
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}

#[test]
fn test_report_serializes_files_as_metadata() {
    let input = PredictionInput::new()
        .with_value("prompt", "x")
        .with_file("image", BinaryFile::new(vec![0u8; 8], "image/png"));
    let result = engine().validate_input(&image_schema(), &input);
    let report = serde_json::to_value(ValidationReport::from(&result)).unwrap();
    assert_eq!(report["valid"], true);
    assert_eq!(report["sanitizedInput"]["image"]["content_type"], "image/png");
    assert_eq!(report["sanitizedInput"]["image"]["size"], 8);
}

#[test]
fn test_enum_without_options_accepts_any_string() {
    let mut schema = FieldSchema::new();
    schema.insert("style".to_string(), FieldSpec::new(FieldType::Enum));
    let engine = engine();

    let result = engine.validate_input(
        &schema,
        &PredictionInput::new().with_value("style", "anything"),
    );
    assert!(result.valid, "{}", result.error_summary());
    assert_eq!(
        result.sanitized_input.unwrap().get("style"),
        Some(&json!("anything"))
    );

    let result = engine.validate_input(&schema, &PredictionInput::new().with_value("style", 3));
    assert!(!result.valid);
    assert_eq!(result.errors[0].field, "style");
}

#[test]
fn test_numeric_enum_accepts_integral_float() {
    let mut schema = FieldSchema::new();
    schema.insert(
        "fps".to_string(),
        FieldSpec::new(FieldType::Enum).with_options([24, 30]),
    );
    let engine = engine();

    for value in [json!(24.0), json!(24), json!("24")] {
        let input = PredictionInput::new().with_value("fps", value.clone());
        let result = engine.validate_input(&schema, &input);
        assert!(result.valid, "{} rejected: {}", value, result.error_summary());
        assert_eq!(result.sanitized_input.unwrap().get("fps"), Some(&json!(24)));
    }

    let result = engine.validate_input(&schema, &PredictionInput::new().with_value("fps", 24.5));
    assert!(!result.valid);
    assert!(result.errors[0].message.starts_with("Invalid enum value"));
}

#[test]
fn test_array_field_accepts_only_arrays() {
    let mut schema = FieldSchema::new();
    schema.insert("tags".to_string(), FieldSpec::new(FieldType::Array));
    let engine = engine();

    let result = engine.validate_input(
        &schema,
        &PredictionInput::new().with_value("tags", json!([1, "a"])),
    );
    assert!(result.valid, "{}", result.error_summary());
    assert_eq!(
        result.sanitized_input.unwrap().get("tags"),
        Some(&json!([1, "a"]))
    );

    let result = engine.validate_input(&schema, &PredictionInput::new().with_value("tags", "x"));
    assert!(!result.valid);
    assert_eq!(result.errors[0].field, "tags");
    assert_eq!(result.errors[0].message, "Expected array, received string");
}

#[test]
fn test_well_typed_values_pass_through_unchanged() {
    let cases = [
        (FieldSpec::new(FieldType::String), json!("a red fox")),
        (FieldSpec::new(FieldType::Number), json!(2.5)),
        (FieldSpec::new(FieldType::Integer), json!(42)),
        (FieldSpec::new(FieldType::Boolean), json!(false)),
        (
            FieldSpec::new(FieldType::Enum).with_options(["DDIM", "K_EULER"]),
            json!("DDIM"),
        ),
        (
            FieldSpec::new(FieldType::File),
            json!("https://example.com/cat.png"),
        ),
        (FieldSpec::new(FieldType::Array), json!(["a", 2, {"b": true}])),
    ];

    let engine = engine();
    for (spec, value) in cases {
        let field_type = spec.field_type;
        let mut schema = FieldSchema::new();
        schema.insert("field".to_string(), spec);
        let result = engine.validate_input(
            &schema,
            &PredictionInput::new().with_value("field", value.clone()),
        );
        assert!(result.valid, "{}: {}", field_type, result.error_summary());
        assert_eq!(
            result.sanitized_input.unwrap().get("field"),
            Some(&value),
            "{} value changed",
            field_type
        );
    }
}
