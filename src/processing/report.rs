//! Shared report scaffolding.
//!
//! Every transformation returns a [`Report`] next to its records. A report wraps a
//! family-specific, `Serialize`-able data struct and the text rendering produced from it at
//! construction time; neither changes afterwards.

use std::fmt;
use std::ops::Deref;

use serde::Serialize;

use crate::types::Value;

/// Renders a report body as human-readable text.
pub trait RenderText {
    fn render_text(&self) -> String;
}

/// Structured report data plus its pre-rendered text form.
#[derive(Debug, Clone)]
pub struct Report<T> {
    data: T,
    text: String,
}

impl<T: Serialize + RenderText> Report<T> {
    pub fn new(data: T) -> Self {
        let text = data.render_text();
        Self { data, text }
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    /// Multi-line text rendering (`=== ... REPORT ===`, `SUMMARY:`, ...).
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Machine-readable nested-mapping form.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.data).unwrap_or(serde_json::Value::Null)
    }

    /// Same as [`Report::to_json`] but as a crate [`Value`].
    pub fn to_value(&self) -> Value {
        Value::from(self.to_json())
    }
}

impl<T> Deref for Report<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

impl<T> fmt::Display for Report<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl<T: Serialize> Serialize for Report<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.data.serialize(serializer)
    }
}

/// Insertion-ordered `field -> T` map that serializes as a JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMap<T> {
    entries: Vec<(String, T)>,
}

impl<T> Default for FieldMap<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> FieldMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: T) {
        let key = key.into();
        match self.get_mut(&key) {
            Some(slot) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Returns the entry for `key`, inserting `make()` first if absent.
    pub fn entry_or_insert_with(&mut self, key: &str, make: impl FnOnce() -> T) -> &mut T {
        let idx = match self.entries.iter().position(|(k, _)| k == key) {
            Some(idx) => idx,
            None => {
                self.entries.push((key.to_string(), make()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx].1
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<T: Serialize> Serialize for FieldMap<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<T> FromIterator<(String, T)> for FieldMap<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        let mut map = FieldMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// A per-record failure collected instead of aborting the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordError {
    pub record_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

impl RecordError {
    pub fn new(record_index: usize, field: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            record_index,
            field: field.map(str::to_string),
            message: message.into(),
        }
    }
}

/// Line-oriented builder for report text.
#[derive(Debug, Default)]
pub struct TextReport {
    lines: Vec<String>,
}

impl TextReport {
    /// Starts a report with the `=== {TITLE} REPORT ===` header.
    pub fn new(title: &str) -> Self {
        Self {
            lines: vec![format!("=== {} REPORT ===", title.to_uppercase())],
        }
    }

    pub fn line(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push(line.into());
        self
    }

    /// A blank line followed by `NAME:`.
    pub fn section(&mut self, name: &str) -> &mut Self {
        self.lines.push(String::new());
        self.lines.push(format!("{name}:"));
        self
    }

    /// An indented `label: value` line. `depth` counts two-space indents.
    pub fn item(&mut self, depth: usize, label: &str, value: impl fmt::Display) -> &mut Self {
        self.lines
            .push(format!("{}{label}: {value}", "  ".repeat(depth)));
        self
    }

    pub fn finish(self) -> String {
        self.lines.join("\n")
    }
}

/// `part / whole * 100`, or `0.0` when `whole` is zero.
pub fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// `part / whole`, or `0.0` when `whole` is zero.
pub fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Current local time as RFC 3339.
pub fn timestamp() -> String {
    chrono::Local::now().to_rfc3339()
}

/// Formats a percentage with two decimals (`"66.67%"`).
pub fn fmt_pct(value: f64) -> String {
    format!("{value:.2}%")
}

#[cfg(test)]
mod tests {
    use super::{Report, RenderText, TextReport, percent};
    use serde::Serialize;

    #[derive(Serialize)]
    struct Demo {
        total: usize,
    }

    impl RenderText for Demo {
        fn render_text(&self) -> String {
            let mut t = TextReport::new("demo");
            t.section("SUMMARY").item(1, "Total", self.total);
            t.finish()
        }
    }

    #[test]
    fn report_renders_once_and_serializes_data() {
        let report = Report::new(Demo { total: 3 });
        assert_eq!(report.text(), "=== DEMO REPORT ===\n\nSUMMARY:\n  Total: 3");
        assert_eq!(report.to_json(), serde_json::json!({"total": 3}));
        assert_eq!(report.total, 3);
    }

    #[test]
    fn percent_handles_zero_denominator() {
        assert_eq!(percent(1, 0), 0.0);
        assert_eq!(percent(1, 4), 25.0);
    }
}
