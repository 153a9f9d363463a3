//! Null filling.
//!
//! Two passes over the record set:
//!
//! 1. statistics: per field, count values and nulls, collect the non-null values and remember
//!    the type of the first one; compute mean/median/mode where possible
//! 2. fill: for every null value present in a record, resolve the field's strategy (per-field
//!    override or the default) and compute a replacement
//!
//! Only fields present in a record are considered; a key absent from one record is not added.
//!
//! | strategy | replacement |
//! |---|---|
//! | `constant` | configured value, cast to the field's observed type |
//! | `mean` / `median` | over numeric (or numeric-string) values; floats for numeric fields |
//! | `mode` | most frequent non-null value, first seen wins ties |
//! | `forward_fill` / `backward_fill` | nearest non-null value before / after in record order |
//! | `interpolate` | linear by record distance between the nearest numeric neighbours; one side only uses that side |
//! | `remove` | the record is dropped from the output |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::nulls::NullPolicy;
use super::report::{FieldMap, RecordError, RenderText, Report, TextReport, fmt_pct, percent, timestamp};
use super::stats::{ReduceOp, mode, numeric_values, reduce};
use super::Operation;
use crate::config::strategy_enum;
use crate::error::{TransformError, TransformResult};
use crate::ingestion::{RecordInput, parse_records};
use crate::types::{DataType, Record, Value, format_float};

/// How a null value is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillStrategy {
    Constant,
    Mean,
    Median,
    Mode,
    ForwardFill,
    BackwardFill,
    Interpolate,
    Remove,
}

strategy_enum!(FillStrategy, "fill", {
    Constant => "constant",
    Mean => "mean",
    Median => "median",
    Mode => "mode",
    ForwardFill => "forward_fill",
    BackwardFill => "backward_fill",
    Interpolate => "interpolate",
    Remove => "remove",
});

/// Per-field strategy override: `{"strategy": "constant", "value": 0}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldStrategy {
    pub strategy: FillStrategy,
    /// Constant used by the `constant` strategy; falls back to `default_fill_value`.
    #[serde(default)]
    pub value: Option<Value>,
}

/// Configuration for [`fill_nulls`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NullFillOptions {
    pub default_strategy: FillStrategy,
    pub default_fill_value: Value,
    pub field_strategies: BTreeMap<String, FieldStrategy>,
    #[serde(flatten)]
    pub nulls: NullPolicy,
    /// Abort on the first null that cannot be filled instead of recording the failure.
    pub strict_mode: bool,
    pub include_statistics: bool,
    pub validate_after_fill: bool,
}

impl Default for NullFillOptions {
    fn default() -> Self {
        Self {
            default_strategy: FillStrategy::Constant,
            default_fill_value: Value::Utf8(String::new()),
            field_strategies: BTreeMap::new(),
            nulls: NullPolicy::default(),
            strict_mode: false,
            include_statistics: true,
            validate_after_fill: true,
        }
    }
}

impl NullFillOptions {
    pub fn with_strategy(strategy: FillStrategy) -> Self {
        Self {
            default_strategy: strategy,
            ..Self::default()
        }
    }

    /// Adds a per-field override.
    pub fn field_strategy(
        mut self,
        field: impl Into<String>,
        strategy: FillStrategy,
        value: Option<Value>,
    ) -> Self {
        self.field_strategies
            .insert(field.into(), FieldStrategy { strategy, value });
        self
    }

    fn strategy_for(&self, field: &str) -> (FillStrategy, Option<&Value>) {
        match self.field_strategies.get(field) {
            Some(fs) => (fs.strategy, fs.value.as_ref()),
            None => (self.default_strategy, None),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FillSummary {
    pub total_records: usize,
    pub processed_records: usize,
    pub total_nulls_found: usize,
    pub total_nulls_filled: usize,
    pub records_removed: usize,
    pub processing_timestamp: String,
    pub default_strategy: FillStrategy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldAnalysis {
    pub total_count: usize,
    pub null_count: usize,
    pub null_percentage: f64,
    pub data_type: Option<DataType>,
    pub fill_strategy: FillStrategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<Value>,
}

/// One attempted fill.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FillOperation {
    pub record_index: usize,
    pub field: String,
    pub original_value: Value,
    pub fill_value: Value,
    pub strategy: FillStrategy,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Null fields of one input record, with their original (null-like) values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NullLocation {
    pub record_index: usize,
    pub null_fields: Record,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldValidation {
    pub total_checked: usize,
    pub remaining_nulls: usize,
}

/// Re-scan of the filled records with the same null policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FillValidation {
    pub remaining_nulls: usize,
    pub validation_passed: bool,
    pub field_validation: FieldMap<FieldValidation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyUsage {
    pub count: usize,
    pub success_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FillStatistics {
    pub fill_success_rate: f64,
    pub strategy_usage: FieldMap<StrategyUsage>,
    pub field_fill_rates: FieldMap<f64>,
    pub data_quality_improvement: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FillReport {
    pub summary: FillSummary,
    pub field_analysis: FieldMap<FieldAnalysis>,
    pub fill_operations: Vec<FillOperation>,
    pub errors: Vec<RecordError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<FillValidation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<FillStatistics>,
}

/// Everything one fill run produces.
#[derive(Debug, Clone)]
pub struct FillOutcome {
    /// Filled records (records hit by `remove` are absent).
    pub records: Vec<Record>,
    pub report: Report<FillReport>,
    /// Where the nulls were before filling.
    pub original_nulls: Vec<NullLocation>,
}

/// Fills null values in `input` according to `options`.
pub fn fill_nulls(
    input: impl Into<RecordInput>,
    options: &NullFillOptions,
) -> TransformResult<FillOutcome> {
    fill_records(parse_records(input)?, options)
}

/// Null filling as an [`Operation`].
#[derive(Debug, Clone, Default)]
pub struct NullFiller {
    options: NullFillOptions,
}

impl NullFiller {
    pub fn new(options: NullFillOptions) -> Self {
        Self { options }
    }
}

impl Operation for NullFiller {
    type Outcome = FillOutcome;
    const NAME: &'static str = "null fill";

    fn apply(&self, records: Vec<Record>) -> TransformResult<FillOutcome> {
        fill_records(records, &self.options)
    }
}

struct FieldStats {
    total_count: usize,
    null_count: usize,
    non_null: Vec<Value>,
    data_type: Option<DataType>,
}

fn fill_records(records: Vec<Record>, options: &NullFillOptions) -> TransformResult<FillOutcome> {
    if records.is_empty() {
        return Err(TransformError::EmptyData);
    }
    let policy = &options.nulls;
    debug!(
        records = records.len(),
        strategy = %options.default_strategy,
        "null fill started"
    );

    // Pass 1: statistics.
    let mut stats: FieldMap<FieldStats> = FieldMap::new();
    let mut original_nulls = Vec::new();
    let mut total_nulls_found = 0;
    for (idx, record) in records.iter().enumerate() {
        let mut null_fields = Record::new();
        for (field, value) in record.iter() {
            let entry = stats.entry_or_insert_with(field, || FieldStats {
                total_count: 0,
                null_count: 0,
                non_null: Vec::new(),
                data_type: None,
            });
            entry.total_count += 1;
            if policy.is_null_value(value) {
                entry.null_count += 1;
                total_nulls_found += 1;
                null_fields.insert(field, value.clone());
            } else {
                if entry.data_type.is_none() {
                    entry.data_type = value.data_type();
                }
                entry.non_null.push(value.clone());
            }
        }
        if !null_fields.is_empty() {
            original_nulls.push(NullLocation {
                record_index: idx,
                null_fields,
            });
        }
    }

    let mut field_analysis = FieldMap::new();
    for (field, s) in stats.iter() {
        let numeric = numeric_values(&s.non_null);
        field_analysis.insert(
            field,
            FieldAnalysis {
                total_count: s.total_count,
                null_count: s.null_count,
                null_percentage: percent(s.null_count, s.total_count),
                data_type: s.data_type,
                fill_strategy: options.strategy_for(field).0,
                mean: reduce(&numeric, ReduceOp::Mean),
                median: reduce(&numeric, ReduceOp::Median),
                mode: mode(&s.non_null),
            },
        );
    }

    // Pass 2: fill.
    let mut filled = Vec::with_capacity(records.len());
    let mut operations = Vec::new();
    let mut errors = Vec::new();
    let mut total_nulls_filled = 0;
    let mut records_removed = 0;
    for (idx, record) in records.iter().enumerate() {
        let mut out = record.clone();
        let mut remove = false;
        for (field, value) in record.iter() {
            if !policy.is_null_value(value) {
                continue;
            }
            let (strategy, configured) = options.strategy_for(field);
            if strategy == FillStrategy::Remove {
                remove = true;
                operations.push(FillOperation {
                    record_index: idx,
                    field: field.to_string(),
                    original_value: value.clone(),
                    fill_value: Value::Null,
                    strategy,
                    success: true,
                    error: None,
                });
                continue;
            }

            let Some(field_stats) = stats.get(field) else {
                continue;
            };
            let replacement = compute_fill(
                strategy,
                configured.unwrap_or(&options.default_fill_value),
                field,
                field_stats,
                &records,
                idx,
                policy,
            );
            match replacement {
                Some(fill_value) => {
                    out.insert(field, fill_value.clone());
                    total_nulls_filled += 1;
                    operations.push(FillOperation {
                        record_index: idx,
                        field: field.to_string(),
                        original_value: value.clone(),
                        fill_value,
                        strategy,
                        success: true,
                        error: None,
                    });
                }
                None => {
                    let message = format!("could not determine fill value using '{strategy}'");
                    if options.strict_mode {
                        return Err(TransformError::RecordFailed {
                            index: idx,
                            message: format!("field '{field}': {message}"),
                        });
                    }
                    warn!(record = idx, field, %strategy, "null left unfilled");
                    errors.push(RecordError::new(idx, Some(field), message.clone()));
                    operations.push(FillOperation {
                        record_index: idx,
                        field: field.to_string(),
                        original_value: value.clone(),
                        fill_value: Value::Null,
                        strategy,
                        success: false,
                        error: Some(message),
                    });
                }
            }
        }
        if remove {
            records_removed += 1;
        } else {
            filled.push(out);
        }
    }

    let validation = options
        .validate_after_fill
        .then(|| validate_filled(&filled, policy));

    let summary = FillSummary {
        total_records: records.len(),
        processed_records: records.len(),
        total_nulls_found,
        total_nulls_filled,
        records_removed,
        processing_timestamp: timestamp(),
        default_strategy: options.default_strategy,
    };
    let statistics = options
        .include_statistics
        .then(|| fill_statistics(&summary, &field_analysis, &operations));

    info!(
        found = total_nulls_found,
        filled = total_nulls_filled,
        removed = records_removed,
        "null fill finished"
    );

    Ok(FillOutcome {
        records: filled,
        report: Report::new(FillReport {
            summary,
            field_analysis,
            fill_operations: operations,
            errors,
            validation,
            statistics,
        }),
        original_nulls,
    })
}

fn compute_fill(
    strategy: FillStrategy,
    constant: &Value,
    field: &str,
    stats: &FieldStats,
    records: &[Record],
    idx: usize,
    policy: &NullPolicy,
) -> Option<Value> {
    match strategy {
        FillStrategy::Constant => Some(cast_to_field_type(constant, stats.data_type)),
        FillStrategy::Mean | FillStrategy::Median => {
            let op = if strategy == FillStrategy::Mean {
                ReduceOp::Mean
            } else {
                ReduceOp::Median
            };
            let numeric = numeric_values(&stats.non_null);
            reduce(&numeric, op).map(|v| numeric_fill(v, stats.data_type))
        }
        FillStrategy::Mode => mode(&stats.non_null),
        FillStrategy::ForwardFill => records[..idx]
            .iter()
            .rev()
            .find_map(|r| non_null(r, field, policy)),
        FillStrategy::BackwardFill => records[idx + 1..]
            .iter()
            .find_map(|r| non_null(r, field, policy)),
        FillStrategy::Interpolate => interpolate(records, idx, field, policy).map(Value::Float64),
        FillStrategy::Remove => None,
    }
}

fn non_null(record: &Record, field: &str, policy: &NullPolicy) -> Option<Value> {
    record
        .get(field)
        .filter(|v| !policy.is_null_value(v))
        .cloned()
}

fn numeric_neighbour<'a>(
    mut candidates: impl Iterator<Item = (usize, &'a Record)>,
    field: &str,
    policy: &NullPolicy,
) -> Option<(usize, f64)> {
    candidates.find_map(|(i, r)| {
        let v = non_null(r, field, policy)?;
        v.coerce_f64().map(|f| (i, f))
    })
}

fn interpolate(records: &[Record], idx: usize, field: &str, policy: &NullPolicy) -> Option<f64> {
    let prev = numeric_neighbour(records[..idx].iter().enumerate().rev(), field, policy);
    let next = numeric_neighbour(
        records.iter().enumerate().skip(idx + 1),
        field,
        policy,
    );
    match (prev, next) {
        (Some((pi, pv)), Some((ni, nv))) => {
            let ratio = (idx - pi) as f64 / (ni - pi) as f64;
            Some(pv + ratio * (nv - pv))
        }
        (Some((_, v)), None) | (None, Some((_, v))) => Some(v),
        (None, None) => None,
    }
}

/// Casts a constant to the observed field type; an impossible cast keeps the constant as is.
///
/// Strings become booleans only for `true`, `1`, `yes` and `on`.
fn cast_to_field_type(value: &Value, data_type: Option<DataType>) -> Value {
    match data_type {
        Some(DataType::Bool) if matches!(value, Value::Utf8(_)) => {
            let token = value.to_string().trim().to_ascii_lowercase();
            Value::Bool(matches!(token.as_str(), "true" | "1" | "yes" | "on"))
        }
        Some(t @ (DataType::Int64 | DataType::Float64 | DataType::Utf8 | DataType::Bool)) => {
            if value.is_null() {
                return Value::Null;
            }
            value.coerce_to(t).unwrap_or_else(|| value.clone())
        }
        _ => value.clone(),
    }
}

/// Mean/median results stay floats for numeric fields so `30.5` is never truncated.
fn numeric_fill(v: f64, data_type: Option<DataType>) -> Value {
    match data_type {
        Some(DataType::Utf8) => Value::Utf8(format_float(v)),
        Some(DataType::Bool) => Value::Bool(v != 0.0),
        _ => Value::Float64(v),
    }
}

fn validate_filled(records: &[Record], policy: &NullPolicy) -> FillValidation {
    let mut field_validation: FieldMap<FieldValidation> = FieldMap::new();
    let mut remaining_nulls = 0;
    for record in records {
        for (field, value) in record.iter() {
            let entry = field_validation.entry_or_insert_with(field, || FieldValidation {
                total_checked: 0,
                remaining_nulls: 0,
            });
            entry.total_checked += 1;
            if policy.is_null_value(value) {
                entry.remaining_nulls += 1;
                remaining_nulls += 1;
            }
        }
    }
    FillValidation {
        remaining_nulls,
        validation_passed: remaining_nulls == 0,
        field_validation,
    }
}

fn fill_statistics(
    summary: &FillSummary,
    analysis: &FieldMap<FieldAnalysis>,
    operations: &[FillOperation],
) -> FillStatistics {
    let mut strategy_usage: FieldMap<StrategyUsage> = FieldMap::new();
    for op in operations {
        let usage = strategy_usage.entry_or_insert_with(op.strategy.as_str(), || StrategyUsage {
            count: 0,
            success_count: 0,
        });
        usage.count += 1;
        if op.success {
            usage.success_count += 1;
        }
    }

    let field_fill_rates = analysis
        .iter()
        .filter(|(_, a)| a.null_count > 0)
        .map(|(field, a)| {
            let filled = operations
                .iter()
                .filter(|op| op.field == field && op.success && op.strategy != FillStrategy::Remove)
                .count();
            (field.to_string(), percent(filled, a.null_count))
        })
        .collect();

    let rate = percent(summary.total_nulls_filled, summary.total_nulls_found);
    FillStatistics {
        fill_success_rate: rate,
        strategy_usage,
        field_fill_rates,
        data_quality_improvement: rate,
    }
}

impl RenderText for FillReport {
    fn render_text(&self) -> String {
        let s = &self.summary;
        let mut t = TextReport::new("null fill");
        t.line(format!("Processing Timestamp: {}", s.processing_timestamp))
            .line(format!("Default Strategy: {}", s.default_strategy));

        t.section("SUMMARY")
            .item(1, "Total Records", s.total_records)
            .item(1, "Processed Records", s.processed_records)
            .item(1, "Total Nulls Found", s.total_nulls_found)
            .item(1, "Total Nulls Filled", s.total_nulls_filled);
        if s.records_removed > 0 {
            t.item(1, "Records Removed", s.records_removed);
        }
        if s.total_nulls_found > 0 {
            t.item(
                1,
                "Fill Success Rate",
                fmt_pct(percent(s.total_nulls_filled, s.total_nulls_found)),
            );
        }

        t.section("FIELD ANALYSIS");
        for (field, a) in self.field_analysis.iter().filter(|(_, a)| a.null_count > 0) {
            t.line(format!("  {field}:"))
                .item(2, "Null Count", a.null_count)
                .item(2, "Null Percentage", fmt_pct(a.null_percentage))
                .item(2, "Fill Strategy", a.fill_strategy)
                .item(
                    2,
                    "Data Type",
                    a.data_type.map_or("unknown", DataType::as_str),
                );
        }

        if !self.errors.is_empty() {
            t.section("ERRORS");
            for e in &self.errors {
                t.line(format!(
                    "  Record {}, Field {}: {}",
                    e.record_index,
                    e.field.as_deref().unwrap_or("-"),
                    e.message
                ));
            }
        }

        if let Some(v) = &self.validation {
            t.section("VALIDATION")
                .item(1, "Remaining Nulls", v.remaining_nulls)
                .item(1, "Validation Passed", v.validation_passed);
        }

        if let Some(stats) = &self.statistics {
            t.section("STATISTICS")
                .item(1, "Overall Fill Success Rate", fmt_pct(stats.fill_success_rate))
                .item(1, "Data Quality Improvement", fmt_pct(stats.data_quality_improvement));
            if !stats.strategy_usage.is_empty() {
                t.line("  Strategy Usage:");
                for (strategy, usage) in stats.strategy_usage.iter() {
                    t.line(format!(
                        "    {strategy}: {} uses ({:.1}% success)",
                        usage.count,
                        percent(usage.success_count, usage.count)
                    ));
                }
            }
        }
        t.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{FillStrategy, NullFillOptions, fill_nulls};
    use crate::error::TransformError;
    use crate::processing::nulls::NullPolicy;
    use crate::types::Value;
    use serde_json::json;

    fn ages(records: &[crate::types::Record]) -> Vec<Value> {
        records
            .iter()
            .map(|r| r.get("age").cloned().unwrap_or(Value::Null))
            .collect()
    }

    #[test]
    fn mean_fills_both_nulls() {
        let input = json!([{"id":1,"age":null},{"id":2,"age":30},{"id":3,"age":null}]);
        let out = fill_nulls(input, &NullFillOptions::with_strategy(FillStrategy::Mean)).unwrap();
        assert_eq!(
            ages(&out.records),
            vec![Value::Float64(30.0), Value::Int64(30), Value::Float64(30.0)]
        );
        assert!(matches!(out.records[0].get("age"), Some(Value::Float64(_))));
        assert_eq!(out.report.summary.total_nulls_found, 2);
        assert_eq!(out.report.summary.total_nulls_filled, 2);
        assert_eq!(out.original_nulls.len(), 2);
        assert_eq!(out.original_nulls[1].record_index, 2);
    }

    #[test]
    fn interpolation_uses_record_distance() {
        let input = json!([{"v":10},{"v":null},{"v":30}]);
        let opts = NullFillOptions::with_strategy(FillStrategy::Interpolate);
        let out = fill_nulls(input, &opts).unwrap();
        assert_eq!(out.records[1].get("v"), Some(&Value::Float64(20.0)));

        let input = json!([{"v":null},{"v":null},{"v":30}]);
        let out = fill_nulls(input, &opts).unwrap();
        assert_eq!(ages_of(&out.records, "v"), vec![Value::Int64(30); 3]);

        let input = json!([{"v":0},{"v":null},{"v":null},{"v":null},{"v":8}]);
        let out = fill_nulls(input, &opts).unwrap();
        assert_eq!(out.records[1].get("v"), Some(&Value::Float64(2.0)));
        assert_eq!(out.records[3].get("v"), Some(&Value::Float64(6.0)));
    }

    fn ages_of(records: &[crate::types::Record], field: &str) -> Vec<Value> {
        records
            .iter()
            .map(|r| r.get(field).cloned().unwrap_or(Value::Null))
            .collect()
    }

    #[test]
    fn forward_and_backward_fill_skip_nulls() {
        let input = json!([{"c":"a"},{"c":null},{"c":""},{"c":"d"}]);
        let out = fill_nulls(input.clone(), &NullFillOptions::with_strategy(FillStrategy::ForwardFill)).unwrap();
        assert_eq!(ages_of(&out.records, "c"), vec!["a", "a", "a", "d"].into_iter().map(Value::from).collect::<Vec<_>>());

        let out = fill_nulls(input, &NullFillOptions::with_strategy(FillStrategy::BackwardFill)).unwrap();
        assert_eq!(ages_of(&out.records, "c"), vec!["a", "d", "d", "d"].into_iter().map(Value::from).collect::<Vec<_>>());
    }

    #[test]
    fn forward_fill_without_predecessor_is_recorded_as_error() {
        let input = json!([{"c":null},{"c":"b"}]);
        let out = fill_nulls(input, &NullFillOptions::with_strategy(FillStrategy::ForwardFill)).unwrap();
        assert_eq!(out.records[0].get("c"), Some(&Value::Null));
        assert_eq!(out.report.errors.len(), 1);
        assert_eq!(out.report.summary.total_nulls_filled, 0);
        let validation = out.report.validation.as_ref().unwrap();
        assert!(!validation.validation_passed);
        assert_eq!(validation.remaining_nulls, 1);
    }

    #[test]
    fn strict_mode_aborts_on_unfillable_null() {
        let mut opts = NullFillOptions::with_strategy(FillStrategy::Mean);
        opts.strict_mode = true;
        let err = fill_nulls(json!([{"name":"x"},{"name":null}]), &opts).unwrap_err();
        assert!(matches!(err, TransformError::RecordFailed { index: 1, .. }));
    }

    #[test]
    fn constant_is_cast_to_field_type() {
        let opts = NullFillOptions {
            default_fill_value: Value::from("7.9"),
            ..NullFillOptions::default()
        };
        let out = fill_nulls(json!([{"n":1},{"n":null}]), &opts).unwrap();
        assert_eq!(out.records[1].get("n"), Some(&Value::Int64(7)));

        let opts = NullFillOptions::default().field_strategy(
            "flag",
            FillStrategy::Constant,
            Some(Value::from("yes")),
        );
        let out = fill_nulls(json!([{"flag":false},{"flag":null}]), &opts).unwrap();
        assert_eq!(out.records[1].get("flag"), Some(&Value::Bool(true)));

        for (token, expected) in [("y", false), (" ON ", true), ("1", true), ("no", false)] {
            let opts = NullFillOptions::default().field_strategy(
                "flag",
                FillStrategy::Constant,
                Some(Value::from(token)),
            );
            let out = fill_nulls(json!([{"flag":true},{"flag":null}]), &opts).unwrap();
            assert_eq!(out.records[1].get("flag"), Some(&Value::Bool(expected)), "token {token:?}");
        }
    }

    #[test]
    fn mode_and_median() {
        let input = json!([{"c":"x"},{"c":"y"},{"c":"y"},{"c":null}]);
        let out = fill_nulls(input, &NullFillOptions::with_strategy(FillStrategy::Mode)).unwrap();
        assert_eq!(out.records[3].get("c"), Some(&Value::from("y")));

        let input = json!([{"v":1},{"v":5},{"v":2},{"v":10},{"v":null}]);
        let out = fill_nulls(input, &NullFillOptions::with_strategy(FillStrategy::Median)).unwrap();
        assert_eq!(out.records[4].get("v"), Some(&Value::Float64(3.5)));
    }

    #[test]
    fn remove_drops_records_with_nulls() {
        let input = json!([{"a":1},{"a":null},{"a":3}]);
        let out = fill_nulls(input, &NullFillOptions::with_strategy(FillStrategy::Remove)).unwrap();
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.report.summary.records_removed, 1);
        assert_eq!(out.report.summary.total_nulls_filled, 0);
    }

    #[test]
    fn no_nulls_is_a_no_op() {
        let input = json!([{"a":1,"b":"x"},{"a":2,"b":"y"}]);
        let out = fill_nulls(input.clone(), &NullFillOptions::with_strategy(FillStrategy::Remove)).unwrap();
        assert_eq!(out.records, crate::ingestion::parse_records(input).unwrap());
        assert_eq!(out.report.summary.total_nulls_found, 0);
        assert_eq!(out.report.summary.total_nulls_filled, 0);
        assert!(out.original_nulls.is_empty());
    }

    #[test]
    fn custom_nulls_and_whitespace_policy() {
        let opts = NullFillOptions {
            default_fill_value: Value::from("?"),
            nulls: NullPolicy::blank_strings().with_custom_nulls([Value::from("N/A")]),
            ..NullFillOptions::default()
        };
        let out = fill_nulls(json!([{"c":"N/A"},{"c":"  "},{"c":"ok"}]), &opts).unwrap();
        assert_eq!(out.report.summary.total_nulls_found, 2);
        assert_eq!(out.records[0].get("c"), Some(&Value::from("?")));
    }

    #[test]
    fn report_text_has_sections() {
        let out = fill_nulls(json!([{"a":null},{"a":2}]), &NullFillOptions::with_strategy(FillStrategy::Mean)).unwrap();
        let text = out.report.text();
        assert!(text.starts_with("=== NULL FILL REPORT ==="));
        assert!(text.contains("SUMMARY:"));
        assert!(text.contains("Total Nulls Filled: 1"));
        assert!(text.contains("Fill Success Rate: 100.00%"));
        assert!(text.contains("mean: 1 uses (100.0% success)"));
        let json = out.report.to_json();
        assert_eq!(json["summary"]["total_nulls_found"], 1);
        assert_eq!(json["summary"]["default_strategy"], "mean");
    }
}
