//! Schema validation — the boundary between untrusted JSON (model output,
//! third-party API bodies) and typed data.
//!
//! A payload is accepted only after it deserializes into the target type AND
//! passes that type's `validator` rules. Failures come back as a single
//! `SchemaError` whose message lists every violation as `path: message`.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SchemaError {
    #[error("no JSON object found in model output")]
    NoJsonObject,

    #[error("malformed JSON: {0}")]
    Malformed(String),

    #[error("schema violation: {0}")]
    Invalid(String),
}

/// Validates a raw JSON value against `T`'s shape and rules.
pub fn validate<T>(raw: &Value) -> Result<T, SchemaError>
where
    T: DeserializeOwned + Validate,
{
    let data: T =
        serde_json::from_value(raw.clone()).map_err(|e| SchemaError::Invalid(format!("$: {e}")))?;
    data.validate()
        .map_err(|errors| SchemaError::Invalid(flatten_errors(&errors)))?;
    Ok(data)
}

/// Extracts the first JSON object from model output and validates it as `T`.
pub fn parse_model_output<T>(text: &str) -> Result<T, SchemaError>
where
    T: DeserializeOwned + Validate,
{
    let span = extract_json_object(text).ok_or(SchemaError::NoJsonObject)?;
    let raw: Value =
        serde_json::from_str(span).map_err(|e| SchemaError::Malformed(e.to_string()))?;
    validate(&raw)
}

/// Returns the first balanced `{...}` span in `text`.
///
/// Braces inside JSON strings (including escaped quotes) are ignored, so
/// prose or code fences around the object do not matter.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Flattens nested validator errors into `path: message, path: message`.
/// Output is sorted so the same payload always yields the same message.
pub fn flatten_errors(errors: &ValidationErrors) -> String {
    let mut lines = Vec::new();
    collect_errors(errors, "", &mut lines);
    lines.sort();
    lines.join(", ")
}

fn collect_errors(errors: &ValidationErrors, prefix: &str, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("failed '{}' check", error.code));
                    out.push(format!("{path}: {message}"));
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_errors(nested, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_errors(nested, &format!("{path}[{index}]"), out);
                }
            }
        }
    }
}
