//! Tolerant field deserializers for log records
//!
//! Fixture files are hand-edited and produced by several generations of
//! scripts, so sub-fields are not always the expected type. Each helper here
//! deserializes into a `serde_json::Value` first and degrades to the field's
//! absent value on a type mismatch.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::types::{AxisVector, Click, LogRecord};

/// Boolean flag; anything other than a JSON boolean reads as `false`
pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_bool().unwrap_or(false))
}

/// Non-negative finite number of seconds
pub fn seconds<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_f64().filter(|v| v.is_finite() && *v >= 0.0))
}

/// Optional string; numbers are accepted and rendered as text
pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_to_string(&value))
}

/// List of identifiers; non-array values read as an empty list.
///
/// Every element is kept so the list length matches the input: objects with
/// a string `id` contribute that id, other non-scalars their JSON text.
pub fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items.iter().map(identifier).collect(),
        _ => Vec::new(),
    })
}

fn identifier(value: &Value) -> String {
    scalar_to_string(value)
        .or_else(|| value.get("id").and_then(|id| id.as_str()).map(str::to_string))
        .unwrap_or_else(|| value.to_string())
}

/// Click list; malformed clicks are dropped
pub fn clicks<'de, D>(deserializer: D) -> Result<Vec<Click>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value::<Click>(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// Axis mapping; anything other than a JSON object reads as absent
pub fn axis_vector<'de, D>(deserializer: D) -> Result<Option<AxisVector>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Object(_) => serde_json::from_value(value).ok(),
        _ => None,
    })
}

/// Integer axis score; integral floats are accepted, anything else is absent
pub fn axis_score<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(integral(&value).and_then(|v| i32::try_from(v).ok()))
}

fn integral(value: &Value) -> Option<i64> {
    if let Some(v) = value.as_i64() {
        return Some(v);
    }
    let v = value.as_f64()?;
    if v.is_finite() && v.fract() == 0.0 && v.abs() <= i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a JSON array of log records.
///
/// Returns the parsed records and the number of entries that were not JSON
/// objects and therefore could not be read as a record at all.
pub fn log_records(value: &Value) -> (Vec<LogRecord>, usize) {
    let Some(items) = value.as_array() else {
        return (Vec::new(), 0);
    };

    let mut records = Vec::with_capacity(items.len());
    let mut dropped = 0;
    for item in items {
        match item {
            Value::Object(_) => match serde_json::from_value::<LogRecord>(item.clone()) {
                Ok(record) => records.push(record),
                Err(_) => dropped += 1,
            },
            _ => dropped += 1,
        }
    }
    (records, dropped)
}
