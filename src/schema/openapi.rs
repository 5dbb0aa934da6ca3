// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Derivation of a `FieldSchema` from a provider's OpenAPI input schema
//!
//! The provider describes each model version with an OpenAPI document whose
//! `components.schemas.Input` object lists the prediction input fields.
//! Type inference per property:
//!
//! - `enum` present → `enum` (options copied in order)
//! - `format` of `uri` / `data-url` → `file`, with `accept` guessed from the field name
//! - otherwise the declared primitive type; unknown types fall back to `string`
//!
//! Enum properties are frequently declared as `allOf: [{"$ref": ...}]` pointing at a
//! sibling component; the reference is merged in before inference.

use serde_json::{Map, Value};
use std::collections::HashSet;

use super::errors::SchemaError;
use super::types::{FieldSchema, FieldSpec, FieldType, FieldValidation};

const COMPONENT_REF_PREFIX: &str = "#/components/schemas/";

/// Parse the `Input` schema of an OpenAPI document.
///
/// `model` is only used for error context.
pub fn derive_field_schema(openapi: &Value, model: &str) -> Result<FieldSchema, SchemaError> {
    let components = openapi.pointer("/components/schemas");
    let input = components
        .and_then(|c| c.get("Input"))
        .filter(|v| v.is_object())
        .ok_or_else(|| SchemaError::MissingInput {
            model: model.to_string(),
        })?;

    let required: HashSet<&str> = input
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let properties = match input.get("properties") {
        None | Some(Value::Null) => return Ok(FieldSchema::new()),
        Some(Value::Object(props)) => props,
        Some(_) => {
            return Err(SchemaError::Parse(format!(
                "Input.properties of {} is not an object",
                model
            )))
        }
    };

    let mut schema = FieldSchema::new();
    for (name, property) in properties {
        let property = property.as_object().ok_or_else(|| {
            SchemaError::Parse(format!("property '{}' of {} is not an object", name, model))
        })?;
        let resolved = resolve_refs(property, components);
        schema.insert(
            name.clone(),
            derive_field(name, &resolved, required.contains(name.as_str())),
        );
    }
    Ok(schema)
}

/// Merge `$ref` / `allOf` component references into the property.
/// Keys declared on the property itself take precedence.
fn resolve_refs(property: &Map<String, Value>, components: Option<&Value>) -> Map<String, Value> {
    let mut refs: Vec<&str> = Vec::new();
    if let Some(r) = property.get("$ref").and_then(Value::as_str) {
        refs.push(r);
    }
    if let Some(all_of) = property.get("allOf").and_then(Value::as_array) {
        refs.extend(
            all_of
                .iter()
                .filter_map(|item| item.get("$ref").and_then(Value::as_str)),
        );
    }
    if refs.is_empty() {
        return property.clone();
    }

    let mut merged = Map::new();
    for reference in refs {
        let target = reference
            .strip_prefix(COMPONENT_REF_PREFIX)
            .and_then(|name| components.and_then(|c| c.get(name)))
            .and_then(Value::as_object);
        if let Some(target) = target {
            for (k, v) in target {
                merged.insert(k.clone(), v.clone());
            }
        }
    }
    for (k, v) in property {
        if k != "allOf" && k != "$ref" {
            merged.insert(k.clone(), v.clone());
        }
    }
    merged
}

fn derive_field(name: &str, property: &Map<String, Value>, required: bool) -> FieldSpec {
    let enum_options = property.get("enum").and_then(Value::as_array);
    let format = property.get("format").and_then(Value::as_str);

    let field_type = if enum_options.is_some() {
        FieldType::Enum
    } else if matches!(format, Some("uri") | Some("data-url")) {
        FieldType::File
    } else {
        match property.get("type").and_then(Value::as_str) {
            Some("number") => FieldType::Number,
            Some("integer") => FieldType::Integer,
            Some("boolean") => FieldType::Boolean,
            Some("array") => FieldType::Array,
            _ => FieldType::String,
        }
    };

    let mut spec = FieldSpec::new(field_type);
    spec.required = required;
    spec.options = enum_options.cloned().unwrap_or_default();
    spec.min = property.get("minimum").and_then(Value::as_f64);
    spec.max = property.get("maximum").and_then(Value::as_f64);
    spec.default = property.get("default").filter(|v| !v.is_null()).cloned();
    spec.description = property
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string);
    spec.order = property.get("x-order").and_then(Value::as_i64);
    spec.validation = property
        .get("pattern")
        .and_then(Value::as_str)
        .map(|p| FieldValidation {
            pattern: Some(p.to_string()),
        });
    if field_type == FieldType::File {
        spec.accept = guess_accept(name);
    }
    spec
}

fn guess_accept(name: &str) -> Option<String> {
    let lower = name.to_ascii_lowercase();
    ["audio", "image", "video"]
        .iter()
        .find(|kind| lower.contains(*kind))
        .map(|kind| format!("{}/*", kind))
}
