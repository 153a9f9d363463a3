//! Value mapping.
//!
//! Each targeted field value goes through the selected mode:
//!
//! - `simple`: literal lookup of the stringified value
//! - `conditional`: ordered `{condition, value}` rules, first truthy condition wins
//! - `calculated`: `field -> expression` table
//! - `lookup_table`: join against inline records on `lookup_field`
//! - `regex_pattern`: first matching pattern wins
//!
//! Conditions and calculations use the crate's [expression language](crate::expr), evaluated
//! against the record plus a `value` variable holding the current field value. Expressions are
//! parsed up front, so a syntax error fails the whole call; a runtime evaluation error only skips
//! that rule.

use std::collections::BTreeMap;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::Operation;
use super::replace::expand_backrefs;
use super::report::{FieldMap, RecordError, RenderText, Report, TextReport, fmt_pct, percent, ratio, timestamp};
use crate::config::strategy_enum;
use crate::error::{TransformError, TransformResult};
use crate::expr::Expression;
use crate::ingestion::{RecordInput, parse_records};
use crate::types::{Record, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingMode {
    Simple,
    Conditional,
    Calculated,
    LookupTable,
    RegexPattern,
}

strategy_enum!(MappingMode, "mapping", {
    Simple => "simple",
    Conditional => "conditional",
    Calculated => "calculated",
    LookupTable => "lookup_table",
    RegexPattern => "regex_pattern",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalMapping {
    pub condition: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupTable {
    pub lookup_field: String,
    pub lookup_data: Vec<Record>,
    /// Field of the matched lookup record to return; the whole record when absent.
    #[serde(default = "default_result_field")]
    pub result_field: String,
}

fn default_result_field() -> String {
    "name".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegexMapping {
    pub pattern: String,
    #[serde(default)]
    pub replacement: String,
    /// Substitute into the value using group references instead of returning `replacement`.
    #[serde(default)]
    pub groups: bool,
}

/// Configuration for [`map_values`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingOptions {
    pub mapping_mode: MappingMode,
    /// Empty means every field of each record.
    pub target_fields: Vec<String>,
    /// `from -> to`, compared against the stringified value.
    pub value_mappings: Record,
    pub conditional_mappings: Vec<ConditionalMapping>,
    pub calculation_rules: BTreeMap<String, String>,
    pub lookup_table: Option<LookupTable>,
    pub regex_mappings: Vec<RegexMapping>,
    pub case_sensitive: bool,
    pub create_new_fields: bool,
    pub new_field_suffix: String,
    /// Used when nothing matched. `null` and `""` disable it.
    pub default_value: Option<Value>,
    /// With `create_new_fields`, keep the source field and write the result next to it.
    pub preserve_original: bool,
    pub strict_mode: bool,
    pub include_mapping_stats: bool,
}

impl Default for MappingOptions {
    fn default() -> Self {
        Self {
            mapping_mode: MappingMode::Simple,
            target_fields: Vec::new(),
            value_mappings: Record::new(),
            conditional_mappings: Vec::new(),
            calculation_rules: BTreeMap::new(),
            lookup_table: None,
            regex_mappings: Vec::new(),
            case_sensitive: true,
            create_new_fields: false,
            new_field_suffix: "_mapped".to_string(),
            default_value: None,
            preserve_original: true,
            strict_mode: false,
            include_mapping_stats: true,
        }
    }
}

impl MappingOptions {
    /// Simple mode over `pairs`.
    pub fn simple<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            value_mappings: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            ..Self::default()
        }
    }

    pub fn targets<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    fn fallback(&self) -> Option<&Value> {
        self.default_value
            .as_ref()
            .filter(|v| !v.is_null() && v.as_str() != Some(""))
    }

    fn text_eq(&self, a: &str, b: &str) -> bool {
        if self.case_sensitive {
            a == b
        } else {
            a.to_lowercase() == b.to_lowercase()
        }
    }
}

enum Rules {
    Simple,
    Conditional(Vec<(Expression, Value)>),
    Calculated(BTreeMap<String, Expression>),
    Lookup,
    Regex(Vec<(Result<Regex, String>, String, bool)>),
}

struct Mapper<'a> {
    options: &'a MappingOptions,
    rules: Rules,
}

impl<'a> Mapper<'a> {
    fn new(options: &'a MappingOptions) -> TransformResult<Self> {
        let rules = match options.mapping_mode {
            MappingMode::Simple => Rules::Simple,
            MappingMode::Conditional => Rules::Conditional(
                options
                    .conditional_mappings
                    .iter()
                    .map(|m| Ok((Expression::parse(&m.condition)?, m.value.clone())))
                    .collect::<TransformResult<_>>()?,
            ),
            MappingMode::Calculated => Rules::Calculated(
                options
                    .calculation_rules
                    .iter()
                    .map(|(field, src)| Ok((field.clone(), Expression::parse(src)?)))
                    .collect::<TransformResult<_>>()?,
            ),
            MappingMode::LookupTable => Rules::Lookup,
            MappingMode::RegexPattern => Rules::Regex(
                options
                    .regex_mappings
                    .iter()
                    .map(|m| {
                        let re = RegexBuilder::new(&m.pattern)
                            .case_insensitive(!options.case_sensitive)
                            .build()
                            .map_err(|e| TransformError::invalid_regex(&m.pattern, e).to_string());
                        (re, expand_backrefs(&m.replacement), m.groups)
                    })
                    .collect(),
            ),
        };
        Ok(Self { options, rules })
    }

    /// Returns the mapped value, or `None` when nothing applied.
    fn map(&self, value: &Value, field: &str, record: &Record) -> Result<Option<Value>, String> {
        let mapped = match &self.rules {
            Rules::Simple => {
                let text = value.to_string();
                self.options
                    .value_mappings
                    .iter()
                    .find(|(from, _)| self.options.text_eq(&text, from))
                    .map(|(_, to)| to.clone())
            }
            Rules::Conditional(rules) => {
                let context = context(record, value);
                rules.iter().find_map(|(condition, result)| {
                    match condition.evaluate_bool(&context) {
                        Ok(true) => Some(result.clone()),
                        Ok(false) => None,
                        Err(err) => {
                            debug!(condition = condition.source(), %err, "mapping condition skipped");
                            None
                        }
                    }
                })
            }
            Rules::Calculated(rules) => {
                let Some(expression) = rules.get(field) else {
                    return Ok(None);
                };
                match expression.evaluate(&context(record, value)) {
                    Ok(result) => return Ok(Some(result)),
                    Err(err) => {
                        debug!(field, expression = expression.source(), %err, "calculation failed");
                        None
                    }
                }
            }
            Rules::Lookup => {
                let Some(table) = &self.options.lookup_table else {
                    return Ok(None);
                };
                let text = value.to_string();
                table
                    .lookup_data
                    .iter()
                    .filter_map(|row| row.get(&table.lookup_field).filter(|v| !v.is_null()).map(|v| (row, v)))
                    .find(|(_, key)| self.options.text_eq(&text, &key.to_string()))
                    .map(|(row, _)| {
                        row.get(&table.result_field)
                            .cloned()
                            .unwrap_or_else(|| Value::Map(row.clone()))
                    })
            }
            Rules::Regex(rules) => {
                let text = value.to_string();
                let mut found = None;
                for (re, replacement, groups) in rules {
                    let re = re.as_ref().map_err(Clone::clone)?;
                    if re.is_match(&text) {
                        found = Some(if *groups {
                            Value::Utf8(re.replace_all(&text, replacement.as_str()).into_owned())
                        } else {
                            Value::Utf8(replacement.clone())
                        });
                        break;
                    }
                }
                found
            }
        };
        Ok(mapped.or_else(|| self.options.fallback().cloned()))
    }
}

fn context(record: &Record, value: &Value) -> Record {
    let mut ctx = record.clone();
    ctx.insert("value", value.clone());
    ctx
}

/// One value rewritten in a record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedMapping {
    pub field: String,
    pub original_value: Value,
    pub mapped_value: Value,
    pub output_field: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordMappings {
    pub record_index: usize,
    pub mappings: Vec<AppliedMapping>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldMappingStats {
    pub total_values: usize,
    pub mapped_values: usize,
    /// Distinct `"original → mapped"` pairs in first-seen order.
    pub unique_mappings: Vec<String>,
    pub unmapped_values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingSummary {
    pub total_records: usize,
    pub processed_records: usize,
    pub total_mappings: usize,
    pub processing_timestamp: String,
    pub mapping_mode: MappingMode,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MostActiveField {
    pub field_name: String,
    pub mapped_values: usize,
    pub total_values: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingStatistics {
    pub mapping_rate: f64,
    pub most_active_field: Option<MostActiveField>,
    pub mapping_coverage: FieldMap<f64>,
    pub effectiveness_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingReport {
    pub summary: MappingSummary,
    pub field_statistics: FieldMap<FieldMappingStats>,
    pub mapping_details: Vec<RecordMappings>,
    pub unmapped_values: FieldMap<Vec<String>>,
    pub errors: Vec<RecordError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<MappingStatistics>,
}

#[derive(Debug, Clone)]
pub struct MappingOutcome {
    pub records: Vec<Record>,
    pub report: Report<MappingReport>,
}

/// Maps field values of `input` according to `options`.
pub fn map_values(
    input: impl Into<RecordInput>,
    options: &MappingOptions,
) -> TransformResult<MappingOutcome> {
    map_records(parse_records(input)?, options)
}

/// Value mapping as an [`Operation`].
#[derive(Debug, Clone, Default)]
pub struct ValueMapper {
    options: MappingOptions,
}

impl ValueMapper {
    pub fn new(options: MappingOptions) -> Self {
        Self { options }
    }
}

impl Operation for ValueMapper {
    type Outcome = MappingOutcome;
    const NAME: &'static str = "value mapping";

    fn apply(&self, records: Vec<Record>) -> TransformResult<MappingOutcome> {
        map_records(records, &self.options)
    }
}

fn push_unique(list: &mut Vec<String>, item: String) {
    if !list.contains(&item) {
        list.push(item);
    }
}

fn map_records(records: Vec<Record>, options: &MappingOptions) -> TransformResult<MappingOutcome> {
    if records.is_empty() {
        return Err(TransformError::EmptyData);
    }
    let mapper = Mapper::new(options)?;
    debug!(records = records.len(), mode = %options.mapping_mode, "value mapping started");

    let mut out = Vec::with_capacity(records.len());
    let mut field_statistics: FieldMap<FieldMappingStats> = FieldMap::new();
    let mut mapping_details = Vec::new();
    let mut errors = Vec::new();
    let mut total_mappings = 0;

    for (idx, record) in records.iter().enumerate() {
        let mut processed = record.clone();
        let mut applied = Vec::new();
        let fields: Vec<String> = if options.target_fields.is_empty() {
            record.keys().map(str::to_string).collect()
        } else {
            options.target_fields.clone()
        };

        for field in &fields {
            let Some(original) = record.get(field) else {
                continue;
            };
            let stats = field_statistics.entry_or_insert_with(field, FieldMappingStats::default);
            stats.total_values += 1;

            match mapper.map(original, field, record) {
                Ok(Some(mapped)) => {
                    let output_field = if options.create_new_fields && options.preserve_original {
                        format!("{field}{}", options.new_field_suffix)
                    } else {
                        field.clone()
                    };
                    processed.insert(output_field.as_str(), mapped.clone());
                    stats.mapped_values += 1;
                    if !original.is_null() && !mapped.is_null() {
                        push_unique(&mut stats.unique_mappings, format!("{original} → {mapped}"));
                    }
                    applied.push(AppliedMapping {
                        field: field.clone(),
                        original_value: original.clone(),
                        mapped_value: mapped,
                        output_field,
                    });
                }
                Ok(None) => {
                    if !original.is_null() {
                        push_unique(&mut stats.unmapped_values, original.to_string());
                    }
                }
                Err(message) => {
                    if options.strict_mode {
                        return Err(TransformError::RecordFailed {
                            index: idx,
                            message: format!("field '{field}': {message}"),
                        });
                    }
                    warn!(record = idx, field = field.as_str(), %message, "value mapping failed");
                    errors.push(RecordError::new(idx, Some(field.as_str()), message));
                }
            }
        }

        total_mappings += applied.len();
        if !applied.is_empty() {
            mapping_details.push(RecordMappings {
                record_index: idx,
                mappings: applied,
            });
        }
        out.push(processed);
    }

    let unmapped_values = field_statistics
        .iter()
        .filter(|(_, s)| !s.unmapped_values.is_empty())
        .map(|(field, s)| (field.to_string(), s.unmapped_values.clone()))
        .collect();

    let total = records.len();
    let summary = MappingSummary {
        total_records: total,
        processed_records: total,
        total_mappings,
        processing_timestamp: timestamp(),
        mapping_mode: options.mapping_mode,
    };
    let statistics = options
        .include_mapping_stats
        .then(|| statistics(&summary, &field_statistics));

    info!(records = total, mappings = total_mappings, errors = errors.len(), "value mapping finished");
    Ok(MappingOutcome {
        records: out,
        report: Report::new(MappingReport {
            summary,
            field_statistics,
            mapping_details,
            unmapped_values,
            errors,
            statistics,
        }),
    })
}

fn statistics(summary: &MappingSummary, fields: &FieldMap<FieldMappingStats>) -> MappingStatistics {
    let mut most_active: Option<(&str, &FieldMappingStats)> = None;
    for (field, stats) in fields.iter() {
        if most_active.is_none_or(|(_, best)| stats.mapped_values > best.mapped_values) {
            most_active = Some((field, stats));
        }
    }
    let mapping_coverage: FieldMap<f64> = fields
        .iter()
        .filter(|(_, s)| s.total_values > 0)
        .map(|(field, s)| (field.to_string(), percent(s.mapped_values, s.total_values)))
        .collect();
    let effectiveness_score = if fields.is_empty() {
        0.0
    } else {
        mapping_coverage.iter().map(|(_, c)| *c).sum::<f64>() / fields.len() as f64
    };

    MappingStatistics {
        mapping_rate: percent(summary.total_mappings, summary.total_records),
        most_active_field: most_active.map(|(field, s)| MostActiveField {
            field_name: field.to_string(),
            mapped_values: s.mapped_values,
            total_values: s.total_values,
        }),
        mapping_coverage,
        effectiveness_score,
    }
}

impl RenderText for MappingReport {
    fn render_text(&self) -> String {
        let s = &self.summary;
        let mut t = TextReport::new("value mapping");
        t.line(format!("Processing Timestamp: {}", s.processing_timestamp))
            .line(format!("Mapping Mode: {}", s.mapping_mode));

        t.section("SUMMARY")
            .item(1, "Total Records", s.total_records)
            .item(1, "Processed Records", s.processed_records)
            .item(1, "Total Mappings", s.total_mappings);
        if s.processed_records > 0 {
            t.item(
                1,
                "Average Mappings per Record",
                format!("{:.2}", ratio(s.total_mappings, s.processed_records)),
            );
        }

        if !self.field_statistics.is_empty() {
            t.section("FIELD STATISTICS");
            for (field, stats) in self.field_statistics.iter() {
                t.line(format!("  {field}:"))
                    .item(2, "Values Mapped", format!("{}/{}", stats.mapped_values, stats.total_values))
                    .item(2, "Mapping Rate", fmt_pct(percent(stats.mapped_values, stats.total_values)));
                if !stats.unique_mappings.is_empty() {
                    t.item(2, "Unique Mappings", stats.unique_mappings.len());
                    for mapping in stats.unique_mappings.iter().take(5) {
                        t.line(format!("      {mapping}"));
                    }
                    if stats.unique_mappings.len() > 5 {
                        t.line(format!("      ... and {} more", stats.unique_mappings.len() - 5));
                    }
                }
            }
        }

        if !self.unmapped_values.is_empty() {
            t.section("UNMAPPED VALUES");
            for (field, values) in self.unmapped_values.iter() {
                let shown: Vec<&str> = values.iter().take(10).map(String::as_str).collect();
                t.line(format!("  {field}: {}", shown.join(", ")));
                if values.len() > 10 {
                    t.line(format!("    ... and {} more", values.len() - 10));
                }
            }
        }

        if !self.errors.is_empty() {
            t.section("ERRORS");
            for e in &self.errors {
                t.line(format!("  Record {}: {}", e.record_index, e.message));
            }
        }

        if let Some(stats) = &self.statistics {
            t.section("STATISTICS")
                .item(1, "Overall Mapping Rate", fmt_pct(stats.mapping_rate))
                .item(1, "Effectiveness Score", fmt_pct(stats.effectiveness_score));
            if let Some(active) = &stats.most_active_field {
                t.item(
                    1,
                    "Most Active Field",
                    format!("{} ({} mappings)", active.field_name, active.mapped_values),
                );
            }
        }
        t.finish()
    }
}
