// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Final coercion pass applied to an input just before it is sent to the provider

use base64::Engine as _;
use serde_json::{Map, Number, Value};

use super::types::{BinaryFile, FieldSchema, FieldType, PredictionInput};

/// Normalize string-encoded primitives and encode binary files as data URLs.
///
/// Runs unconditionally, independent of validation: HTML forms deliver every
/// value as a string. Fields absent from the schema pass through unchanged.
/// Applying it to its own output yields the same output.
pub fn transform_input_for_provider(
    schema: &FieldSchema,
    input: &PredictionInput,
) -> Map<String, Value> {
    let mut out = Map::with_capacity(input.values.len() + input.files.len());

    for (name, value) in &input.values {
        let coerced = match schema.get(name) {
            Some(spec) => coerce_value(spec.field_type, value),
            None => value.clone(),
        };
        out.insert(name.clone(), coerced);
    }
    for (name, file) in &input.files {
        out.insert(name.clone(), Value::String(to_data_url(file)));
    }
    out
}

fn coerce_value(field_type: FieldType, value: &Value) -> Value {
    match (field_type, value) {
        (FieldType::Integer, Value::String(s)) => match parse_leading_int(s) {
            Some(i) => Value::from(i),
            None => value.clone(),
        },
        (FieldType::Number, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| value.clone()),
        (FieldType::Boolean, Value::String(s)) => Value::Bool(s.eq_ignore_ascii_case("true")),
        _ => value.clone(),
    }
}

/// Integer prefix of a string, e.g. "42px" → 42
fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let digits_end = s
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    s[..digits_end].parse::<i64>().ok()
}

/// `data:<content-type>;base64,<payload>`
pub fn to_data_url(file: &BinaryFile) -> String {
    format!(
        "data:{};base64,{}",
        file.content_type,
        base64::engine::general_purpose::STANDARD.encode(&file.data)
    )
}
