//! Casting raw change values into the type of their target field.

use serde_json::{Number, Value};

use crate::error::CastError;
use crate::schema::FieldType;

use super::formula::split_top_level;

/// Cast a raw change value into `field_type`.
///
/// Pure; the caller decides what to do with a failure.
pub fn cast(key: &str, raw: &Value, field_type: &FieldType) -> Result<Value, CastError> {
    match field_type {
        FieldType::Array(element) | FieldType::Set(element) => cast_array(key, raw, element),
        other => cast_scalar(key, raw, other),
    }
}

fn cast_scalar(key: &str, raw: &Value, field_type: &FieldType) -> Result<Value, CastError> {
    let fail = || CastError::new(key, raw.clone());
    match field_type {
        FieldType::Formula => Ok(Value::String(text_of(raw).trim().to_string())),
        FieldType::Boolean => {
            if raw.as_str() == Some("false") {
                return Ok(Value::Bool(false));
            }
            let parsed = match raw {
                Value::String(s) => parse_or_string(s),
                other => other.clone(),
            };
            Ok(Value::Bool(is_truthy(&parsed)))
        }
        FieldType::Number => {
            let n = match raw {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            n.and_then(number_value).ok_or_else(fail)
        }
        FieldType::String => match raw {
            Value::String(_) => Ok(raw.clone()),
            Value::Number(_) | Value::Bool(_) => Ok(Value::String(raw.to_string())),
            Value::Null => Ok(Value::String(String::new())),
            _ => Err(fail()),
        },
        FieldType::Object => {
            let parsed = match raw {
                Value::String(s) => parse_or_string(s),
                other => other.clone(),
            };
            if parsed.is_object() {
                Ok(parsed)
            } else {
                Err(fail())
            }
        }
        FieldType::Untyped | FieldType::Array(_) | FieldType::Set(_) => Ok(match raw {
            Value::String(s) => parse_or_string(s),
            other => other.clone(),
        }),
    }
}

fn cast_array(key: &str, raw: &Value, element: &FieldType) -> Result<Value, CastError> {
    let elements: Vec<Value> = match raw {
        Value::Array(items) => items.clone(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.starts_with('[') {
                match serde_json::from_str::<Value>(trimmed) {
                    Ok(Value::Array(items)) => items,
                    _ => return Err(CastError::new(key, raw.clone())),
                }
            } else {
                split_top_level(trimmed, ',')
                    .into_iter()
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(|part| Value::String(part.to_string()))
                    .collect()
            }
        }
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    };

    elements
        .iter()
        .map(|element_raw| cast_scalar(key, element_raw, element))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
        .map_err(|_| CastError::new(key, raw.clone()))
}

/// Parse a string as JSON, falling back to the string itself.
pub fn parse_or_string(s: &str) -> Value {
    serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.to_string()))
}

/// Truthiness in the host's sense: `false`, `0`, `""` and `null` are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Coerce a value for a boolean character flag. Only the literal `"false"`
/// and empty values leave the flag off; strings are never parsed, so `"0"`
/// turns it on.
pub fn cast_flag_boolean(raw: &Value) -> Value {
    Value::Bool(match raw {
        Value::String(s) => s != "false" && !s.is_empty(),
        other => is_truthy(other),
    })
}

/// Store integral results as integers so `10 + 2` stays `12`, not `12.0`.
pub fn number_value(n: f64) -> Option<Value> {
    if !n.is_finite() {
        return None;
    }
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return Some(Value::Number(Number::from(n as i64)));
    }
    Number::from_f64(n).map(Value::Number)
}

fn text_of(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
