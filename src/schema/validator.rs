// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Structural validators compiled from a `FieldSchema`

use regex::Regex;
use serde_json::{Number, Value};
use url::Url;

use super::errors::SchemaError;
use super::types::{
    FieldSchema, FieldSpec, FieldType, PredictionInput, ValidationError, ValidationResult,
};

struct CompiledField {
    name: String,
    spec: FieldSpec,
    pattern: Option<Regex>,
}

/// A validator built once per distinct schema and reused across calls
pub struct CompiledValidator {
    fields: Vec<CompiledField>,
}

impl CompiledValidator {
    pub fn compile(schema: &FieldSchema) -> Result<Self, SchemaError> {
        let mut fields = Vec::with_capacity(schema.len());
        for (name, spec) in schema {
            let pattern = match (spec.field_type, spec.pattern()) {
                (FieldType::String, Some(p)) => Some(Regex::new(p).map_err(|e| {
                    SchemaError::Parse(format!("invalid pattern for field '{}': {}", name, e))
                })?),
                _ => None,
            };
            if let (Some(min), Some(max)) = (spec.min, spec.max) {
                if min > max {
                    return Err(SchemaError::Parse(format!(
                        "field '{}' has min {} greater than max {}",
                        name, min, max
                    )));
                }
            }
            fields.push(CompiledField {
                name: name.clone(),
                spec: spec.clone(),
                pattern,
            });
        }
        Ok(Self { fields })
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Validate `input`, producing a sanitized copy on success.
    ///
    /// Fields the schema does not declare are carried through unchanged.
    pub fn validate(&self, input: &PredictionInput) -> ValidationResult {
        let mut sanitized = input.clone();
        let mut errors = Vec::new();

        for field in &self.fields {
            let name = field.name.as_str();

            if let Some(file) = input.files.get(name) {
                if field.spec.field_type != FieldType::File {
                    sanitized.files.remove(name);
                    errors.push(ValidationError::new(
                        name,
                        format!(
                            "Expected {}, received binary content ({})",
                            field.spec.field_type, file.content_type
                        ),
                    ));
                } else {
                    sanitized.values.remove(name);
                }
                continue;
            }

            sanitized.values.remove(name);
            match input.values.get(name).filter(|v| !v.is_null()) {
                None => {
                    if let Some(default) = &field.spec.default {
                        sanitized.values.insert(name.to_string(), default.clone());
                    } else if field.spec.is_mandatory() {
                        errors.push(ValidationError::new(name, "Required"));
                    }
                }
                Some(value) => match field.coerce(value) {
                    Ok(coerced) => {
                        sanitized.values.insert(name.to_string(), coerced);
                    }
                    Err(message) => {
                        errors.push(ValidationError::new(name, message).with_value(value.clone()));
                    }
                },
            }
        }

        if errors.is_empty() {
            ValidationResult::success(sanitized)
        } else {
            ValidationResult::failure(errors)
        }
    }
}

impl CompiledField {
    fn coerce(&self, value: &Value) -> Result<Value, String> {
        match self.spec.field_type {
            FieldType::String => {
                let s = value
                    .as_str()
                    .ok_or_else(|| expected("string", value))?;
                if let Some(re) = &self.pattern {
                    if !re.is_match(s) {
                        return Err(format!("Does not match pattern {}", re.as_str()));
                    }
                }
                Ok(value.clone())
            }
            FieldType::Number => {
                let (n, out) = match value {
                    Value::Number(n) => (n.as_f64().unwrap_or(f64::NAN), value.clone()),
                    Value::String(s) => {
                        let parsed = s
                            .trim()
                            .parse::<f64>()
                            .map_err(|_| expected("number", value))?;
                        let out = Number::from_f64(parsed)
                            .map(Value::Number)
                            .ok_or_else(|| expected("number", value))?;
                        (parsed, out)
                    }
                    _ => return Err(expected("number", value)),
                };
                if !n.is_finite() {
                    return Err(expected("number", value));
                }
                self.check_bounds(n)?;
                Ok(out)
            }
            FieldType::Integer => {
                let n = match value {
                    Value::Number(n) => match n.as_i64() {
                        Some(i) => i,
                        None => match n.as_f64() {
                            Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => f as i64,
                            _ => return Err(expected("integer", value)),
                        },
                    },
                    Value::String(s) => s
                        .trim()
                        .parse::<i64>()
                        .map_err(|_| expected("integer", value))?,
                    _ => return Err(expected("integer", value)),
                };
                self.check_bounds(n as f64)?;
                Ok(Value::from(n))
            }
            FieldType::Boolean => match value {
                Value::Bool(_) => Ok(value.clone()),
                Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
                Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
                _ => Err(expected("boolean", value)),
            },
            FieldType::Enum => {
                if self.spec.options.is_empty() {
                    return value
                        .as_str()
                        .map(|_| value.clone())
                        .ok_or_else(|| expected("string", value));
                }
                if let Some(option) = self.spec.options.iter().find(|o| enum_matches(o, value)) {
                    return Ok(option.clone());
                }
                Err(format!(
                    "Invalid enum value. Expected {}, received {}",
                    self.spec
                        .options
                        .iter()
                        .map(display_value)
                        .collect::<Vec<_>>()
                        .join(" | "),
                    display_value(value)
                ))
            }
            FieldType::File => match value {
                Value::String(s) if is_file_reference(s) => Ok(value.clone()),
                _ => Err("Expected a URL, a data URL or binary file content".to_string()),
            },
            FieldType::Array => {
                if value.is_array() {
                    Ok(value.clone())
                } else {
                    Err(expected("array", value))
                }
            }
        }
    }

    fn check_bounds(&self, n: f64) -> Result<(), String> {
        if let Some(min) = self.spec.min {
            if n < min {
                return Err(format!("Number must be greater than or equal to {}", min));
            }
        }
        if let Some(max) = self.spec.max {
            if n > max {
                return Err(format!("Number must be less than or equal to {}", max));
            }
        }
        Ok(())
    }
}

/// An absolute URL or a `data:` URL
pub fn is_file_reference(s: &str) -> bool {
    if s.starts_with("data:") {
        return true;
    }
    match Url::parse(s) {
        Ok(url) => !url.cannot_be_a_base() || url.scheme() == "blob",
        Err(_) => false,
    }
}

/// Numeric options compare by value, so `24` accepts `24.0` and the form string `"24"`
fn enum_matches(option: &Value, value: &Value) -> bool {
    if option == value {
        return true;
    }
    let Some(expected) = option.as_f64() else {
        return !option.is_string()
            && value.as_str().map_or(false, |s| option.to_string() == s);
    };
    match value {
        Value::Number(n) => n.as_f64() == Some(expected),
        Value::String(s) => s.trim().parse::<f64>().ok() == Some(expected),
        _ => false,
    }
}

fn expected(type_name: &str, value: &Value) -> String {
    format!("Expected {}, received {}", type_name, json_type_name(value))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s),
        other => other.to_string(),
    }
}
