// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Provider-neutral description of a model's input parameters

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Field name → spec. Ordered by name so the serialized form is canonical.
pub type FieldSchema = BTreeMap<String, FieldSpec>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    Enum,
    File,
    Array,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Enum => "enum",
            FieldType::File => "file",
            FieldType::Array => "array",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldValidation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    /// Escape hatch: an optional field is never reported missing, even when `required` is set
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// MIME pattern hint for file fields, e.g. "image/*"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<FieldValidation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Display order reported by the provider (`x-order`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl FieldSpec {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            optional: false,
            default: None,
            options: Vec::new(),
            min: None,
            max: None,
            accept: None,
            validation: None,
            description: None,
            order: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_options<I, V>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.validation = Some(FieldValidation {
            pattern: Some(pattern.into()),
        });
        self
    }

    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    pub fn pattern(&self) -> Option<&str> {
        self.validation.as_ref().and_then(|v| v.pattern.as_deref())
    }

    /// Whether omitting this field is an error
    pub fn is_mandatory(&self) -> bool {
        self.required && !self.optional
    }
}

/// In-memory binary content supplied for a `file` field
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryFile {
    pub data: Bytes,
    pub content_type: String,
}

impl BinaryFile {
    pub fn new(data: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            content_type: content_type.into(),
        }
    }
}

/// Caller-supplied input for a prediction: JSON values plus named binary files
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionInput {
    pub values: Map<String, Value>,
    pub files: BTreeMap<String, BinaryFile>,
}

impl PredictionInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object. Non-object values yield an empty input.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(values) => Self {
                values,
                files: BTreeMap::new(),
            },
            _ => Self::default(),
        }
    }

    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn with_file(mut self, name: impl Into<String>, file: BinaryFile) -> Self {
        self.files.insert(name.into(), file);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
            || self.values.get(name).map_or(false, |v| !v.is_null())
    }
}

impl From<Map<String, Value>> for PredictionInput {
    fn from(values: Map<String, Value>) -> Self {
        Self {
            values,
            files: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    /// Present only when `valid`
    pub sanitized_input: Option<PredictionInput>,
}

impl ValidationResult {
    pub fn success(sanitized: PredictionInput) -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            sanitized_input: Some(sanitized),
        }
    }

    pub fn failure(errors: Vec<ValidationError>) -> Self {
        Self {
            valid: false,
            errors,
            sanitized_input: None,
        }
    }

    /// Field messages joined for an error summary
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Wire shape of a validation result; binary files are reported by content type only
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    #[serde(rename = "sanitizedInput", skip_serializing_if = "Option::is_none")]
    pub sanitized_input: Option<Map<String, Value>>,
}

impl From<&ValidationResult> for ValidationReport {
    fn from(result: &ValidationResult) -> Self {
        let sanitized_input = result.sanitized_input.as_ref().map(|input| {
            let mut values = input.values.clone();
            for (name, file) in &input.files {
                values.insert(
                    name.clone(),
                    serde_json::json!({
                        "content_type": file.content_type,
                        "size": file.data.len(),
                    }),
                );
            }
            values
        });
        Self {
            valid: result.valid,
            errors: result.errors.clone(),
            sanitized_input,
        }
    }
}
