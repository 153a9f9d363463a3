//! JSON text parsing.
//!
//! Supported inputs:
//! - A JSON array: `[{"a":1}, {"a":2}]`
//! - A single JSON object: `{"a":1}`
//! - Newline-delimited JSON (NDJSON): `{"a":1}\n{"a":2}\n`
//!
//! Non-object items are wrapped as `{"value": item}`.

use std::path::Path;

use crate::error::{TransformError, TransformResult};
use crate::types::{Record, Value};

/// Parses JSON (or NDJSON) text into records.
///
/// Blank text is [`TransformError::NoData`]; text that is neither a JSON document nor valid
/// NDJSON is [`TransformError::InvalidJson`]. An empty array yields an empty list; the caller
/// decides whether that is an error.
pub fn records_from_json_str(input: &str) -> TransformResult<Vec<Record>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(TransformError::NoData);
    }

    // First try parsing as a single JSON value (array or object).
    let document_error = match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(v) => return records_from_json_value(v),
        Err(e) => e,
    };

    // Fall back to NDJSON, but only when there is more than one line to split.
    if !trimmed.contains('\n') {
        return Err(TransformError::InvalidJson(document_error.to_string()));
    }
    let mut records = Vec::new();
    for (i, line) in trimmed.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let v = serde_json::from_str::<serde_json::Value>(line).map_err(|e| {
            TransformError::InvalidJson(format!("invalid ndjson at line {}: {}", i + 1, e))
        })?;
        records.extend(records_from_json_value(v)?);
    }
    Ok(records)
}

/// Reads a `.json` or `.ndjson` file into records.
pub fn records_from_json_path(path: impl AsRef<Path>) -> TransformResult<Vec<Record>> {
    let path = path.as_ref();
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json") || e.eq_ignore_ascii_case("ndjson"));
    if !is_json {
        return Err(TransformError::invalid_input(format!(
            "'{}' is not a .json or .ndjson file",
            path.display()
        )));
    }
    records_from_json_str(&std::fs::read_to_string(path)?)
}

/// Converts an already-parsed JSON document into records.
pub fn records_from_json_value(value: serde_json::Value) -> TransformResult<Vec<Record>> {
    match value {
        serde_json::Value::Null => Err(TransformError::NoData),
        serde_json::Value::Array(items) => Ok(items.into_iter().map(record_from_json).collect()),
        other => Ok(vec![record_from_json(other)]),
    }
}

fn record_from_json(v: serde_json::Value) -> Record {
    match Value::from(v) {
        Value::Map(r) => r,
        other => Record::from([("value", other)]),
    }
}

/// Renders records back to a JSON array string.
pub fn records_to_json_string(records: &[Record]) -> String {
    serde_json::Value::Array(
        records
            .iter()
            .map(|r| serde_json::Value::from(Value::Map(r.clone())))
            .collect(),
    )
    .to_string()
}
