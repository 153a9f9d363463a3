//! Core data model: dynamically typed [`Value`]s held in ordered [`Record`]s.
//!
//! Records are schema-less. Every transform dispatches on the [`Value`] variant instead of
//! relying on a declared column type; [`DataType`] names the variant when a report or a
//! coercion needs it.

use std::cmp::Ordering;
use std::fmt;

use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// Logical type of a non-null [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    Utf8,
    /// Ordered list of values.
    List,
    /// Nested record.
    Map,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Int64 => "int64",
            DataType::Float64 => "float64",
            DataType::Bool => "bool",
            DataType::Utf8 => "utf8",
            DataType::List => "list",
            DataType::Map => "map",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single dynamically typed value inside a [`Record`].
///
/// Equality treats `Int64` and `Float64` as numbers (`Int64(30) == Float64(30.0)`); every other
/// variant only equals itself.
#[derive(Debug, Clone)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// Boolean.
    Bool(bool),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// UTF-8 string.
    Utf8(String),
    /// Ordered list.
    List(Vec<Value>),
    /// Nested record.
    Map(Record),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Type of the value, or `None` for [`Value::Null`].
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(DataType::Bool),
            Value::Int64(_) => Some(DataType::Int64),
            Value::Float64(_) => Some(DataType::Float64),
            Value::Utf8(_) => Some(DataType::Utf8),
            Value::List(_) => Some(DataType::List),
            Value::Map(_) => Some(DataType::Map),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Utf8(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Map(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Numeric view of `Int64`/`Float64` values. Strings and booleans are not numbers here.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int64(n) => Some(*n as f64),
            Value::Float64(f) => Some(*f),
            _ => None,
        }
    }

    /// Like [`Value::as_f64`] but also parses numeric strings (`" 3.5 "`, `"1e3"`).
    pub fn coerce_f64(&self) -> Option<f64> {
        match self {
            Value::Utf8(s) => s.trim().parse::<f64>().ok(),
            other => other.as_f64(),
        }
    }

    pub fn is_nan(&self) -> bool {
        matches!(self, Value::Float64(f) if f.is_nan())
    }

    /// Truthiness: null, `false`, zero, empty strings/lists/maps are false.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int64(n) => *n != 0,
            Value::Float64(f) => *f != 0.0,
            Value::Utf8(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(r) => !r.is_empty(),
        }
    }

    /// Casts the value to `target`, returning `None` when the cast is not possible.
    ///
    /// Integer casts truncate through a float (`"3.9"` becomes `3`); boolean casts from strings
    /// use [`is_truthy_token`]; list/map casts from strings parse the string as JSON.
    pub fn coerce_to(&self, target: DataType) -> Option<Value> {
        match target {
            DataType::Int64 => match self {
                Value::Int64(n) => Some(Value::Int64(*n)),
                Value::Bool(b) => Some(Value::Int64(i64::from(*b))),
                other => other
                    .coerce_f64()
                    .filter(|f| f.is_finite())
                    .map(|f| Value::Int64(f.trunc() as i64)),
            },
            DataType::Float64 => match self {
                Value::Bool(b) => Some(Value::Float64(if *b { 1.0 } else { 0.0 })),
                other => other.coerce_f64().map(Value::Float64),
            },
            DataType::Utf8 => Some(Value::Utf8(self.to_string())),
            DataType::Bool => match self {
                Value::Utf8(s) => Some(Value::Bool(is_truthy_token(s))),
                other => Some(Value::Bool(other.truthy())),
            },
            DataType::List => match self {
                Value::List(_) => Some(self.clone()),
                Value::Utf8(s) => match serde_json::from_str::<serde_json::Value>(s) {
                    Ok(serde_json::Value::Array(items)) => {
                        Some(Value::List(items.into_iter().map(Value::from).collect()))
                    }
                    _ => None,
                },
                _ => None,
            },
            DataType::Map => match self {
                Value::Map(_) => Some(self.clone()),
                Value::Utf8(s) => match serde_json::from_str::<serde_json::Value>(s) {
                    Ok(v @ serde_json::Value::Object(_)) => Some(Value::from(v)),
                    _ => None,
                },
                _ => None,
            },
        }
    }

    /// Ordering for numbers (compared as `f64`) and strings (lexicographic).
    pub fn partial_compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Utf8(a), Value::Utf8(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (a, b) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        }
    }

    /// Serializes to JSON with object keys sorted at every depth.
    ///
    /// Two values that are equal regardless of key order produce identical text.
    pub fn to_canonical_json(&self) -> String {
        canonical(self).to_string()
    }
}

fn canonical(value: &Value) -> serde_json::Value {
    match value {
        Value::List(items) => serde_json::Value::Array(items.iter().map(canonical).collect()),
        Value::Map(record) => {
            let mut entries: Vec<(&String, &Value)> =
                record.entries.iter().map(|(k, v)| (k, v)).collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            serde_json::Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonical(v)))
                    .collect(),
            )
        }
        other => serde_json::Value::from(other.clone()),
    }
}

/// Boolean tokens accepted when a string is cast to bool: `true`, `1`, `yes`, `y`, `on`
/// (case-insensitive, surrounding whitespace ignored). Anything else is false.
pub fn is_truthy_token(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "y" | "on"
    )
}

/// Formats a float so integral values keep a trailing `.0` (`30.0`, not `30`).
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        "nan".to_string()
    } else if f.is_infinite() {
        let s = if f > 0.0 { "inf" } else { "-inf" };
        s.to_string()
    } else if f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Float64(a), Value::Float64(b)) => a == b,
            (Value::Int64(i), Value::Float64(f)) | (Value::Float64(f), Value::Int64(i)) => {
                (*i as f64) == *f
            }
            (Value::Utf8(a), Value::Utf8(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            _ => false,
        }
    }
}

/// Strings render bare, floats keep a `.0`, containers render as JSON.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int64(n) => write!(f, "{n}"),
            Value::Float64(x) => f.write_str(&format_float(*x)),
            Value::Utf8(s) => f.write_str(s),
            Value::List(_) | Value::Map(_) => {
                write!(f, "{}", serde_json::Value::from(self.clone()))
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int64(i64::from(v))
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        i64::try_from(v).map_or(Value::Float64(v as f64), Value::Int64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Utf8(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Utf8(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Map(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int64(i),
                None => n.as_f64().map_or(Value::Null, Value::Float64),
            },
            serde_json::Value::String(s) => Value::Utf8(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Non-finite floats become JSON `null`.
impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int64(n) => serde_json::Value::from(n),
            Value::Float64(f) => serde_json::Number::from_f64(f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::Utf8(s) => serde_json::Value::String(s),
            Value::List(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            Value::Map(record) => serde_json::Value::Object(
                record
                    .entries
                    .into_iter()
                    .map(|(k, v)| (k, v.into()))
                    .collect(),
            ),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int64(n) => serializer.serialize_i64(*n),
            Value::Float64(f) if f.is_finite() => serializer.serialize_f64(*f),
            Value::Float64(_) => serializer.serialize_unit(),
            Value::Utf8(s) => serializer.serialize_str(s),
            Value::List(items) => items.serialize(serializer),
            Value::Map(record) => record.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

/// An ordered field-name to [`Value`] mapping.
///
/// Insertion order is preserved (re-inserting an existing key keeps its position). Equality
/// ignores key order.
#[derive(Debug, Clone, Default)]
pub struct Record {
    entries: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            entries: Vec::with_capacity(n),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the position of a field by name, if present.
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index_of(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Inserts or replaces a field, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.index_of(&key) {
            Some(idx) => Some(std::mem::replace(&mut self.entries[idx].1, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Removes a field, keeping the order of the remaining ones.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let idx = self.index_of(key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Resolves a dot path (`user.address.city`). Numeric segments index into lists.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        if let Some(v) = self.get(path) {
            return Some(v);
        }
        let mut segments = path.split('.');
        let mut current = self.get(segments.next()?)?;
        for segment in segments {
            current = match current {
                Value::Map(r) => r.get(segment)?,
                Value::List(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|o| o == v))
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for Record {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;
        Ok(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
    }
}

/// Field names across a record set in first-seen order.
pub fn field_names(records: &[Record]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !names.iter().any(|n| n == key) {
                names.push(key.to_string());
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::{DataType, Record, Value, field_names, format_float, is_truthy_token};

    #[test]
    fn numbers_compare_across_int_and_float() {
        assert_eq!(Value::Int64(30), Value::Float64(30.0));
        assert_ne!(Value::Int64(30), Value::Utf8("30".to_string()));
        assert_ne!(Value::Float64(f64::NAN), Value::Float64(f64::NAN));
    }

    #[test]
    fn record_equality_ignores_key_order() {
        let a = Record::from([("x", 1), ("y", 2)]);
        let b = Record::from([("y", 2), ("x", 1)]);
        assert_eq!(a, b);
        assert_eq!(a.keys().collect::<Vec<_>>(), vec!["x", "y"]);
    }

    #[test]
    fn insert_existing_key_keeps_position() {
        let mut r = Record::from([("a", 1), ("b", 2)]);
        assert_eq!(r.insert("a", 10), Some(Value::Int64(1)));
        assert_eq!(r.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(r.remove("a"), Some(Value::Int64(10)));
        assert_eq!(r.keys().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn get_path_walks_nested_maps_and_lists() {
        let v = Value::from(serde_json::json!({"user": {"tags": ["a", "b"], "name": "Ada"}}));
        let r = v.as_record().unwrap();
        assert_eq!(r.get_path("user.name"), Some(&Value::from("Ada")));
        assert_eq!(r.get_path("user.tags.1"), Some(&Value::from("b")));
        assert_eq!(r.get_path("user.missing"), None);
    }

    #[test]
    fn coerce_to_follows_cast_rules() {
        assert_eq!(Value::from("3.9").coerce_to(DataType::Int64), Some(Value::Int64(3)));
        assert_eq!(Value::Float64(30.0).coerce_to(DataType::Utf8), Some(Value::from("30.0")));
        assert_eq!(Value::from("On").coerce_to(DataType::Bool), Some(Value::Bool(true)));
        assert_eq!(Value::from("abc").coerce_to(DataType::Float64), None);
        assert_eq!(
            Value::from("[1, 2]").coerce_to(DataType::List),
            Some(Value::List(vec![Value::Int64(1), Value::Int64(2)]))
        );
    }

    #[test]
    fn canonical_json_sorts_keys_recursively() {
        let a = Value::from(serde_json::json!({"b": 1, "a": {"d": 2, "c": 3}}));
        let b = Value::from(serde_json::json!({"a": {"c": 3, "d": 2}, "b": 1}));
        assert_eq!(a.to_canonical_json(), b.to_canonical_json());
        assert_eq!(a.to_canonical_json(), r#"{"a":{"c":3,"d":2},"b":1}"#);
    }

    #[test]
    fn display_and_tokens() {
        assert_eq!(format_float(20.0), "20.0");
        assert_eq!(format_float(2.5), "2.5");
        assert_eq!(Value::Null.to_string(), "null");
        assert!(is_truthy_token(" YES "));
        assert!(!is_truthy_token("nope"));
    }

    #[test]
    fn field_names_are_first_seen_order() {
        let records = vec![Record::from([("b", 1), ("a", 2)]), Record::from([("c", 3), ("a", 4)])];
        assert_eq!(field_names(&records), vec!["b", "a", "c"]);
    }
}
