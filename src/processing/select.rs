//! Field selection, flattening and renaming.
//!
//! The selected field list is resolved once over the whole record set (after optional
//! flattening), then every record is projected onto it. Renames are applied last.

use std::collections::BTreeMap;

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::Operation;
use super::report::{RecordError, RenderText, Report, TextReport, fmt_pct, percent, timestamp};
use crate::config::strategy_enum;
use crate::error::{TransformError, TransformResult};
use crate::ingestion::{RecordInput, parse_records};
use crate::types::{Record, Value, field_names};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    Include,
    Exclude,
    RegexInclude,
    RegexExclude,
    Conditional,
}

strategy_enum!(SelectionMode, "selection", {
    Include => "include",
    Exclude => "exclude",
    RegexInclude => "regex_include",
    RegexExclude => "regex_exclude",
    Conditional => "conditional",
});

/// Predominant value kind of a field, by majority over the first 100 non-null values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Integer,
    Float,
    Boolean,
    Other,
}

impl FieldKind {
    fn of(value: &Value) -> Self {
        match value {
            Value::Bool(_) => FieldKind::Boolean,
            Value::Int64(_) => FieldKind::Integer,
            Value::Float64(_) => FieldKind::Float,
            Value::Utf8(_) => FieldKind::String,
            _ => FieldKind::Other,
        }
    }
}

/// Predicates a field must satisfy in `conditional` mode. Unset predicates always pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConditions {
    pub has_data: Option<bool>,
    pub min_non_null_ratio: Option<f64>,
    #[serde(rename = "type")]
    pub kind: Option<FieldKind>,
    /// Minimum average length of the stringified non-null values.
    pub min_length: Option<f64>,
    /// Minimum number of distinct non-null values.
    pub unique_values: Option<usize>,
    pub max_unique_values: Option<usize>,
    pub min_unique_ratio: Option<f64>,
    pub max_unique_ratio: Option<f64>,
}

impl FieldConditions {
    fn is_empty(&self) -> bool {
        *self == FieldConditions::default()
    }

    fn accepts(&self, field: &str, records: &[Record]) -> bool {
        let present: Vec<&Value> = records.iter().filter_map(|r| r.get(field)).collect();
        let non_null: Vec<&Value> = present
            .iter()
            .copied()
            .filter(|v| !v.is_null() && v.as_str() != Some(""))
            .collect();
        let mut distinct: Vec<String> = non_null.iter().map(|v| v.to_string()).collect();
        distinct.sort();
        distinct.dedup();

        if let Some(expected) = self.has_data {
            if non_null.is_empty() == expected {
                return false;
            }
        }
        if let Some(min) = self.min_non_null_ratio {
            if !present.is_empty() && (non_null.len() as f64 / present.len() as f64) < min {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if !non_null.is_empty() && majority_kind(&non_null) != kind {
                return false;
            }
        }
        if let Some(min) = self.min_length {
            if !non_null.is_empty() {
                let total: usize = non_null.iter().map(|v| v.to_string().chars().count()).sum();
                if (total as f64 / non_null.len() as f64) < min {
                    return false;
                }
            }
        }
        if self.unique_values.is_some_and(|min| distinct.len() < min) {
            return false;
        }
        if self.max_unique_values.is_some_and(|max| distinct.len() > max) {
            return false;
        }
        if !non_null.is_empty() {
            let unique_ratio = distinct.len() as f64 / non_null.len() as f64;
            if self.min_unique_ratio.is_some_and(|min| unique_ratio < min)
                || self.max_unique_ratio.is_some_and(|max| unique_ratio > max)
            {
                return false;
            }
        }
        true
    }
}

fn majority_kind(values: &[&Value]) -> FieldKind {
    const ORDER: [FieldKind; 5] = [
        FieldKind::String,
        FieldKind::Integer,
        FieldKind::Float,
        FieldKind::Boolean,
        FieldKind::Other,
    ];
    let mut counts = [0usize; 5];
    for value in values.iter().take(100) {
        let kind = FieldKind::of(value);
        if let Some(pos) = ORDER.iter().position(|k| *k == kind) {
            counts[pos] += 1;
        }
    }
    let mut best = 0;
    for (i, n) in counts.iter().enumerate() {
        if *n > counts[best] {
            best = i;
        }
    }
    ORDER[best]
}

/// Configuration for [`select_fields`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectOptions {
    pub selection_mode: SelectionMode,
    /// Empty means "all fields".
    pub include_fields: Vec<String>,
    pub exclude_fields: Vec<String>,
    /// Searched (not full-matched) against field names.
    pub regex_pattern: Option<String>,
    pub field_conditions: FieldConditions,
    pub enable_renaming: bool,
    pub field_mapping: BTreeMap<String, String>,
    /// When false, `field_order` decides the output order; unlisted fields follow.
    pub preserve_order: bool,
    pub field_order: Vec<String>,
    pub case_sensitive: bool,
    pub strict_mode: bool,
    /// Attach `_field_selection_metadata` to every output record.
    pub include_metadata: bool,
    pub flatten_nested: bool,
    pub flatten_separator: String,
}

impl Default for SelectOptions {
    fn default() -> Self {
        Self {
            selection_mode: SelectionMode::Include,
            include_fields: Vec::new(),
            exclude_fields: Vec::new(),
            regex_pattern: None,
            field_conditions: FieldConditions::default(),
            enable_renaming: false,
            field_mapping: BTreeMap::new(),
            preserve_order: true,
            field_order: Vec::new(),
            case_sensitive: true,
            strict_mode: false,
            include_metadata: false,
            flatten_nested: false,
            flatten_separator: "_".to_string(),
        }
    }
}

impl SelectOptions {
    pub fn include<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            include_fields: fields.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn exclude<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            selection_mode: SelectionMode::Exclude,
            exclude_fields: fields.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Enables renaming with `old -> new` pairs.
    pub fn rename<I, K, V>(mut self, mapping: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.enable_renaming = true;
        self.field_mapping = mapping
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    fn renames(&self) -> BTreeMap<String, String> {
        if self.enable_renaming {
            self.field_mapping.clone()
        } else {
            BTreeMap::new()
        }
    }

    fn same_name(&self, a: &str, b: &str) -> bool {
        if self.case_sensitive {
            a == b
        } else {
            a.to_lowercase() == b.to_lowercase()
        }
    }

    fn resolve_fields(&self, original: &[String], records: &[Record]) -> TransformResult<Vec<String>> {
        let selected = match self.selection_mode {
            SelectionMode::Include => {
                if self.include_fields.is_empty() {
                    original.to_vec()
                } else {
                    self.include_fields
                        .iter()
                        .filter_map(|wanted| original.iter().find(|f| self.same_name(f, wanted)))
                        .fold(Vec::new(), |mut acc, f| {
                            if !acc.contains(f) {
                                acc.push(f.clone());
                            }
                            acc
                        })
                }
            }
            SelectionMode::Exclude => original
                .iter()
                .filter(|f| !self.exclude_fields.iter().any(|x| self.same_name(f, x)))
                .cloned()
                .collect(),
            SelectionMode::RegexInclude | SelectionMode::RegexExclude => {
                let Some(pattern) = self.regex_pattern.as_deref().filter(|p| !p.is_empty()) else {
                    return Ok(original.to_vec());
                };
                let re = RegexBuilder::new(pattern)
                    .case_insensitive(!self.case_sensitive)
                    .build()
                    .map_err(|e| TransformError::invalid_regex(pattern, e))?;
                let include = self.selection_mode == SelectionMode::RegexInclude;
                original
                    .iter()
                    .filter(|f| re.is_match(f) == include)
                    .cloned()
                    .collect()
            }
            SelectionMode::Conditional => {
                if self.field_conditions.is_empty() {
                    original.to_vec()
                } else {
                    original
                        .iter()
                        .filter(|f| self.field_conditions.accepts(f, records))
                        .cloned()
                        .collect()
                }
            }
        };

        if self.preserve_order || self.field_order.is_empty() {
            return Ok(selected);
        }
        let mut ordered: Vec<String> = self
            .field_order
            .iter()
            .filter(|f| selected.contains(f))
            .cloned()
            .collect();
        for field in selected {
            if !ordered.contains(&field) {
                ordered.push(field);
            }
        }
        Ok(ordered)
    }
}

/// Recursively flattens nested mappings, joining keys with `separator`.
pub fn flatten_record(record: &Record, separator: &str) -> Record {
    let mut out = Record::with_capacity(record.len());
    flatten_into(&mut out, "", record, separator);
    out
}

fn flatten_into(out: &mut Record, prefix: &str, record: &Record, separator: &str) {
    for (key, value) in record.iter() {
        let name = if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}{separator}{key}")
        };
        match value {
            Value::Map(inner) => flatten_into(out, &name, inner, separator),
            other => {
                out.insert(name, other.clone());
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectSummary {
    pub total_records: usize,
    pub processed_records: usize,
    pub original_field_count: usize,
    pub selected_field_count: usize,
    pub processing_timestamp: String,
    pub selection_mode: SelectionMode,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectFieldAnalysis {
    pub original_fields: Vec<String>,
    pub selected_fields: Vec<String>,
    pub excluded_fields: Vec<String>,
    pub renamed_fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingDetails {
    pub field_reduction_rate: f64,
    pub selection_efficiency: f64,
    pub field_mapping_applied: bool,
    pub error_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectReport {
    pub summary: SelectSummary,
    pub field_analysis: SelectFieldAnalysis,
    pub processing_details: ProcessingDetails,
    pub errors: Vec<RecordError>,
}

#[derive(Debug, Clone)]
pub struct SelectOutcome {
    pub records: Vec<Record>,
    pub report: Report<SelectReport>,
}

/// Projects every record of `input` onto the selected fields.
pub fn select_fields(
    input: impl Into<RecordInput>,
    options: &SelectOptions,
) -> TransformResult<SelectOutcome> {
    select_records(parse_records(input)?, options)
}

/// Field selection as an [`Operation`].
#[derive(Debug, Clone, Default)]
pub struct FieldSelector {
    options: SelectOptions,
}

impl FieldSelector {
    pub fn new(options: SelectOptions) -> Self {
        Self { options }
    }
}

impl Operation for FieldSelector {
    type Outcome = SelectOutcome;
    const NAME: &'static str = "field selection";

    fn apply(&self, records: Vec<Record>) -> TransformResult<SelectOutcome> {
        select_records(records, &self.options)
    }
}

fn select_records(records: Vec<Record>, options: &SelectOptions) -> TransformResult<SelectOutcome> {
    if records.is_empty() {
        return Err(TransformError::EmptyData);
    }
    let records: Vec<Record> = if options.flatten_nested {
        records
            .iter()
            .map(|r| flatten_record(r, &options.flatten_separator))
            .collect()
    } else {
        records
    };

    let original = field_names(&records);
    let selected = options.resolve_fields(&original, &records)?;
    let excluded: Vec<String> = original
        .iter()
        .filter(|f| !selected.contains(f))
        .cloned()
        .collect();
    let renames = options.renames();
    debug!(
        mode = %options.selection_mode,
        original = original.len(),
        selected = selected.len(),
        "field selection resolved"
    );

    let mut out = Vec::with_capacity(records.len());
    let mut errors = Vec::new();
    let mut processed = 0;
    for (idx, record) in records.iter().enumerate() {
        match project(record, &selected, &renames) {
            Ok(projected) => {
                out.push(projected);
                processed += 1;
            }
            Err(message) => {
                if options.strict_mode {
                    return Err(TransformError::RecordFailed {
                        index: idx,
                        message,
                    });
                }
                warn!(record = idx, %message, "field selection kept original record");
                errors.push(RecordError::new(idx, None, message));
                out.push(record.clone());
            }
        }
    }

    let total = records.len();
    let summary = SelectSummary {
        total_records: total,
        processed_records: processed,
        original_field_count: original.len(),
        selected_field_count: selected.len(),
        processing_timestamp: timestamp(),
        selection_mode: options.selection_mode,
    };
    let processing_details = ProcessingDetails {
        field_reduction_rate: percent(original.len() - selected.len(), original.len()),
        selection_efficiency: percent(processed, total),
        field_mapping_applied: !renames.is_empty(),
        error_rate: percent(errors.len(), total),
    };
    let field_analysis = SelectFieldAnalysis {
        original_fields: original,
        selected_fields: selected,
        excluded_fields: excluded,
        renamed_fields: renames,
    };

    if options.include_metadata {
        let metadata = metadata(&summary, &field_analysis);
        for record in &mut out {
            record.insert("_field_selection_metadata", metadata.clone());
        }
    }

    info!(records = total, processed, errors = errors.len(), "field selection finished");
    Ok(SelectOutcome {
        records: out,
        report: Report::new(SelectReport {
            summary,
            field_analysis,
            processing_details,
            errors,
        }),
    })
}

/// Fails when two output fields would end up with the same name after renaming.
fn project(
    record: &Record,
    selected: &[String],
    renames: &BTreeMap<String, String>,
) -> Result<Record, String> {
    let mut out = Record::with_capacity(selected.len());
    for field in selected {
        let Some(value) = record.get(field) else {
            continue;
        };
        let target = renames.get(field).unwrap_or(field);
        if out.insert(target.clone(), value.clone()).is_some() {
            return Err(format!("rename of '{field}' collides with output field '{target}'"));
        }
    }
    Ok(out)
}

fn metadata(summary: &SelectSummary, analysis: &SelectFieldAnalysis) -> Value {
    let mut meta = Record::new();
    meta.insert("selection_timestamp", summary.processing_timestamp.clone());
    meta.insert("selection_mode", summary.selection_mode.as_str());
    meta.insert("original_field_count", summary.original_field_count);
    meta.insert("selected_field_count", summary.selected_field_count);
    meta.insert(
        "excluded_fields",
        analysis
            .excluded_fields
            .iter()
            .map(|f| Value::from(f.as_str()))
            .collect::<Vec<_>>(),
    );
    meta.insert(
        "renamed_fields",
        analysis
            .renamed_fields
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
            .collect::<Record>(),
    );
    Value::Map(meta)
}

impl RenderText for SelectReport {
    fn render_text(&self) -> String {
        let s = &self.summary;
        let removed = s.original_field_count - s.selected_field_count;
        let mut t = TextReport::new("field selection");
        t.line(format!("Processing Timestamp: {}", s.processing_timestamp))
            .line(format!("Selection Mode: {}", s.selection_mode));

        t.section("SUMMARY")
            .item(1, "Total Records", s.total_records)
            .item(1, "Processed Records", s.processed_records)
            .item(1, "Original Fields", s.original_field_count)
            .item(1, "Selected Fields", s.selected_field_count)
            .item(1, "Fields Removed", removed);
        if s.original_field_count > 0 {
            t.item(
                1,
                "Field Reduction Rate",
                fmt_pct(percent(removed, s.original_field_count)),
            );
        }

        let fa = &self.field_analysis;
        if !fa.selected_fields.is_empty() {
            let mut fields = fa.selected_fields.clone();
            fields.sort();
            t.section("SELECTED FIELDS");
            for field in fields {
                match fa.renamed_fields.get(&field) {
                    Some(new_name) => t.line(format!("  {field} → {new_name}")),
                    None => t.line(format!("  {field}")),
                };
            }
        }
        if !fa.excluded_fields.is_empty() {
            let mut fields = fa.excluded_fields.clone();
            fields.sort();
            t.section("EXCLUDED FIELDS");
            for field in fields {
                t.line(format!("  {field}"));
            }
        }
        if !self.errors.is_empty() {
            t.section("ERRORS");
            for e in &self.errors {
                t.line(format!("  Record {}: {}", e.record_index, e.message));
            }
        }

        let d = &self.processing_details;
        t.section("PROCESSING DETAILS")
            .item(1, "Selection Efficiency", fmt_pct(d.selection_efficiency))
            .item(1, "Field Mapping Applied", d.field_mapping_applied);
        if d.error_rate > 0.0 {
            t.item(1, "Error Rate", fmt_pct(d.error_rate));
        }
        t.finish()
    }
}
