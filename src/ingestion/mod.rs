//! Record-set parsing.
//!
//! Every transformation accepts its input through [`parse_records`], which normalizes the
//! shapes a host may hand over into a flat, ordered `Vec<Record>`:
//!
//! - a single [`Record`] or a list of records
//! - a [`Value`] / `serde_json::Value` (mapping, list, or scalar)
//! - JSON text (a document, or newline-delimited JSON as a fallback)
//! - a [`Container`] (the host's wrapper exposing a `data` payload), or a list of them
//!
//! Scalars are wrapped as `{"value": scalar}` so downstream code only ever sees mappings.
//! "Nothing supplied" ([`TransformError::NoData`]) is distinct from "supplied but empty"
//! ([`TransformError::EmptyData`]).
//!
//! Format-specific helpers live in [`json`] and [`csv`].

pub mod csv;
pub mod json;

use crate::error::{TransformError, TransformResult};
use crate::types::{Record, Value};

/// Wrapper object carrying a record payload in its `data` field.
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub data: Value,
}

impl Container {
    pub fn new(data: impl Into<Value>) -> Self {
        Self { data: data.into() }
    }
}

/// Any input shape accepted by [`parse_records`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordInput {
    Record(Record),
    Records(Vec<Record>),
    Value(Value),
    Text(String),
    Container(Container),
    Containers(Vec<Container>),
}

impl From<Record> for RecordInput {
    fn from(v: Record) -> Self {
        RecordInput::Record(v)
    }
}

impl From<Vec<Record>> for RecordInput {
    fn from(v: Vec<Record>) -> Self {
        RecordInput::Records(v)
    }
}

impl From<&[Record]> for RecordInput {
    fn from(v: &[Record]) -> Self {
        RecordInput::Records(v.to_vec())
    }
}

impl From<Value> for RecordInput {
    fn from(v: Value) -> Self {
        RecordInput::Value(v)
    }
}

impl From<serde_json::Value> for RecordInput {
    fn from(v: serde_json::Value) -> Self {
        RecordInput::Value(Value::from(v))
    }
}

impl From<String> for RecordInput {
    fn from(v: String) -> Self {
        RecordInput::Text(v)
    }
}

impl From<&str> for RecordInput {
    fn from(v: &str) -> Self {
        RecordInput::Text(v.to_string())
    }
}

impl From<Container> for RecordInput {
    fn from(v: Container) -> Self {
        RecordInput::Container(v)
    }
}

impl From<Vec<Container>> for RecordInput {
    fn from(v: Vec<Container>) -> Self {
        RecordInput::Containers(v)
    }
}

/// Normalizes `input` into a non-empty, ordered list of records.
pub fn parse_records(input: impl Into<RecordInput>) -> TransformResult<Vec<Record>> {
    let records = match input.into() {
        RecordInput::Record(r) => vec![r],
        RecordInput::Records(rs) => rs,
        RecordInput::Value(v) => records_from_value(v)?,
        RecordInput::Text(text) => json::records_from_json_str(&text)?,
        RecordInput::Container(c) => records_from_value(c.data)?,
        RecordInput::Containers(cs) => {
            let mut out = Vec::with_capacity(cs.len());
            for c in cs {
                match c.data {
                    Value::Null => continue,
                    Value::List(items) => out.extend(items.into_iter().map(into_record)),
                    other => out.push(into_record(other)),
                }
            }
            out
        }
    };

    if records.is_empty() {
        return Err(TransformError::EmptyData);
    }
    Ok(records)
}

/// Converts a single value into a record list without the emptiness check.
pub(crate) fn records_from_value(value: Value) -> TransformResult<Vec<Record>> {
    match value {
        Value::Null => Err(TransformError::NoData),
        Value::List(items) => Ok(items.into_iter().map(into_record).collect()),
        Value::Utf8(text) => json::records_from_json_str(&text),
        other => Ok(vec![into_record(other)]),
    }
}

fn into_record(value: Value) -> Record {
    match value {
        Value::Map(r) => r,
        other => Record::from([("value", other)]),
    }
}
