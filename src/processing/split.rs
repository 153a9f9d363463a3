//! Partitioning a record set into named splits.
//!
//! Ratio-based modes produce `train`/`validation`/`test`; the others name splits after
//! conditions, field values or chunk numbers. Empty splits are never emitted. Shuffling is
//! seeded, so the same options always yield the same partition.

use std::collections::HashMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::Operation;
use super::report::{FieldMap, RenderText, Report, TextReport, fmt_pct, percent, timestamp};
use crate::config::strategy_enum;
use crate::error::{TransformError, TransformResult};
use crate::expr::Expression;
use crate::ingestion::{RecordInput, parse_records};
use crate::types::{Record, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitMode {
    Random,
    Ratio,
    Sequential,
    Condition,
    FieldValue,
    ChunkSize,
}

strategy_enum!(SplitMode, "split", {
    Random => "random",
    Ratio => "ratio",
    Sequential => "sequential",
    Condition => "condition",
    FieldValue => "field_value",
    ChunkSize => "chunk_size",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    SeparateOutputs,
    CombinedWithLabels,
    IndexedChunks,
}

strategy_enum!(OutputFormat, "output format", {
    SeparateOutputs => "separate_outputs",
    CombinedWithLabels => "combined_with_labels",
    IndexedChunks => "indexed_chunks",
});

/// A named condition for [`SplitMode::Condition`]. Unnamed conditions become `split_{n}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitCondition {
    #[serde(default)]
    pub name: Option<String>,
    pub condition: String,
}

/// Configuration for [`split_data`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitOptions {
    pub split_mode: SplitMode,
    pub random_seed: u64,
    pub train_ratio: f64,
    pub validation_ratio: f64,
    pub test_ratio: f64,
    pub sequence_position: usize,
    pub split_conditions: Vec<SplitCondition>,
    pub split_field: String,
    pub chunk_size: usize,
    pub shuffle_before_split: bool,
    pub stratify_split: bool,
    pub stratify_field: String,
    pub include_indices: bool,
    pub include_split_info: bool,
    pub output_format: OutputFormat,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            split_mode: SplitMode::Ratio,
            random_seed: 42,
            train_ratio: 0.7,
            validation_ratio: 0.15,
            test_ratio: 0.15,
            sequence_position: 100,
            split_conditions: Vec::new(),
            split_field: String::new(),
            chunk_size: 100,
            shuffle_before_split: true,
            stratify_split: false,
            stratify_field: String::new(),
            include_indices: false,
            include_split_info: true,
            output_format: OutputFormat::SeparateOutputs,
        }
    }
}

impl SplitOptions {
    /// Unshuffled ratio split.
    pub fn ratios(train: f64, validation: f64, test: f64) -> Self {
        Self {
            train_ratio: train,
            validation_ratio: validation,
            test_ratio: test,
            shuffle_before_split: false,
            ..Self::default()
        }
    }

    pub fn with_mode(mode: SplitMode) -> Self {
        Self {
            split_mode: mode,
            shuffle_before_split: false,
            ..Self::default()
        }
    }

    fn shuffles(&self) -> bool {
        self.shuffle_before_split || self.split_mode == SplitMode::Random
    }

    fn stratify_field(&self) -> Option<&str> {
        Some(self.stratify_field.as_str()).filter(|f| self.stratify_split && !f.is_empty())
    }
}

/// One named partition, in the order records were assigned to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Split {
    pub name: String,
    pub records: Vec<Record>,
    pub original_indices: Vec<usize>,
}

impl Split {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

type Indexed = (usize, Record);

fn into_split(name: impl Into<String>, items: Vec<Indexed>) -> Split {
    let (original_indices, records) = items.into_iter().unzip();
    Split {
        name: name.into(),
        records,
        original_indices,
    }
}

/// Appends a split unless it is empty.
fn push_split(splits: &mut Vec<Split>, name: &str, items: Vec<Indexed>) {
    if !items.is_empty() {
        splits.push(into_split(name, items));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitSummary {
    pub total_records: usize,
    pub split_mode: SplitMode,
    pub processing_timestamp: String,
    pub shuffle_applied: bool,
    pub stratification_applied: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitShare {
    pub size: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitStatistics {
    pub split_count: usize,
    pub split_distribution: FieldMap<SplitShare>,
    /// Share of input records that landed in some split, in percent.
    pub coverage: f64,
    /// 100 for perfectly even splits, lower as sizes diverge.
    pub balance_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitConfiguration {
    pub split_mode: SplitMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub train_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<u64>,
    pub shuffle_before_split: bool,
    pub stratify_split: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stratify_field: Option<String>,
}

impl SplitConfiguration {
    fn from_options(options: &SplitOptions) -> Self {
        let ratios = matches!(options.split_mode, SplitMode::Ratio | SplitMode::Random);
        Self {
            split_mode: options.split_mode,
            train_ratio: ratios.then_some(options.train_ratio),
            validation_ratio: ratios.then_some(options.validation_ratio),
            test_ratio: ratios.then_some(options.test_ratio),
            random_seed: options.shuffles().then_some(options.random_seed),
            shuffle_before_split: options.shuffle_before_split,
            stratify_split: options.stratify_split,
            stratify_field: options.stratify_field().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitReport {
    pub summary: SplitSummary,
    pub statistics: SplitStatistics,
    pub configuration: SplitConfiguration,
}

#[derive(Debug, Clone)]
pub struct SplitOutcome {
    pub splits: Vec<Split>,
    /// The splits rendered in the configured [`OutputFormat`].
    pub output: Vec<Record>,
    pub report: Report<SplitReport>,
}

impl SplitOutcome {
    pub fn split(&self, name: &str) -> Option<&Split> {
        self.splits.iter().find(|s| s.name == name)
    }

    fn records_of(&self, name: &str) -> &[Record] {
        self.split(name)
            .map(|s| s.records.as_slice())
            .unwrap_or_default()
    }

    pub fn train(&self) -> &[Record] {
        self.records_of("train")
    }

    pub fn validation(&self) -> &[Record] {
        self.records_of("validation")
    }

    pub fn test(&self) -> &[Record] {
        self.records_of("test")
    }

    pub fn names(&self) -> Vec<&str> {
        self.splits.iter().map(|s| s.name.as_str()).collect()
    }
}

/// Splits `input` according to `options`.
pub fn split_data(
    input: impl Into<RecordInput>,
    options: &SplitOptions,
) -> TransformResult<SplitOutcome> {
    split_records(parse_records(input)?, options)
}

/// Splitting as an [`Operation`].
#[derive(Debug, Clone, Default)]
pub struct DataSplitter {
    options: SplitOptions,
}

impl DataSplitter {
    pub fn new(options: SplitOptions) -> Self {
        Self { options }
    }
}

impl Operation for DataSplitter {
    type Outcome = SplitOutcome;
    const NAME: &'static str = "data split";

    fn apply(&self, records: Vec<Record>) -> TransformResult<SplitOutcome> {
        split_records(records, &self.options)
    }
}

fn split_records(records: Vec<Record>, options: &SplitOptions) -> TransformResult<SplitOutcome> {
    if records.is_empty() {
        return Err(TransformError::EmptyData);
    }
    let total = records.len();
    debug!(records = total, mode = %options.split_mode, "split started");

    let mut items: Vec<Indexed> = records.into_iter().enumerate().collect();
    if options.shuffles() {
        let mut rng = StdRng::seed_from_u64(options.random_seed);
        items.shuffle(&mut rng);
    }

    let splits = match options.split_mode {
        SplitMode::Ratio | SplitMode::Random => split_by_ratio(items, options)?,
        SplitMode::Sequential => split_sequentially(items, options.sequence_position),
        SplitMode::Condition => split_by_condition(items, &options.split_conditions)?,
        SplitMode::FieldValue => split_by_field_value(items, &options.split_field),
        SplitMode::ChunkSize => split_by_chunk_size(items, options.chunk_size),
    };

    let output = format_output(&splits, options);
    let statistics = split_statistics(&splits, total);
    let summary = SplitSummary {
        total_records: total,
        split_mode: options.split_mode,
        processing_timestamp: timestamp(),
        shuffle_applied: options.shuffles(),
        stratification_applied: options.stratify_field().is_some(),
    };

    info!(
        records = total,
        splits = splits.len(),
        "split finished"
    );
    Ok(SplitOutcome {
        splits,
        output,
        report: Report::new(SplitReport {
            summary,
            statistics,
            configuration: SplitConfiguration::from_options(options),
        }),
    })
}

/// Integer split sizes for `n` records: train and validation are floored, test takes the rest.
fn ratio_sizes(n: usize, options: &SplitOptions) -> TransformResult<(usize, usize, usize)> {
    let ratios = [options.train_ratio, options.validation_ratio, options.test_ratio];
    if ratios.iter().any(|r| !r.is_finite() || *r < 0.0) {
        return Err(TransformError::invalid_config("split ratios must be non-negative numbers"));
    }
    let sum: f64 = ratios.iter().sum();
    if sum <= 0.0 {
        return Err(TransformError::invalid_config("total ratio must be greater than 0"));
    }
    let train = ((n as f64 * (options.train_ratio / sum)) as usize).min(n);
    let validation = ((n as f64 * (options.validation_ratio / sum)) as usize).min(n - train);
    Ok((train, validation, n - train - validation))
}

fn split_by_ratio(mut items: Vec<Indexed>, options: &SplitOptions) -> TransformResult<Vec<Split>> {
    let (train, validation, _) = ratio_sizes(items.len(), options)?;
    if let Some(field) = options.stratify_field() {
        return Ok(stratified(items, field, train, validation));
    }
    let mut rest = items.split_off(train);
    let test = rest.split_off(validation);
    let mut splits = Vec::new();
    push_split(&mut splits, "train", items);
    push_split(&mut splits, "validation", rest);
    push_split(&mut splits, "test", test);
    Ok(splits)
}

/// Applies the global ratio sizes to each stratum independently.
/// Records without `field` form their own stratum.
fn stratified(items: Vec<Indexed>, field: &str, train_size: usize, validation_size: usize) -> Vec<Split> {
    let n = items.len();
    let mut order: Vec<Option<String>> = Vec::new();
    let mut groups: HashMap<Option<String>, Vec<Indexed>> = HashMap::new();
    for item in items {
        let key = item.1.get(field).map(Value::to_string);
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(item);
    }

    let (mut train, mut validation, mut test) = (Vec::new(), Vec::new(), Vec::new());
    for key in order {
        let Some(mut group) = groups.remove(&key) else {
            continue;
        };
        let size = group.len();
        let group_train = size * train_size / n;
        let group_validation = (size * validation_size / n).min(size - group_train);
        let mut rest = group.split_off(group_train);
        let group_test = rest.split_off(group_validation);
        train.extend(group);
        validation.extend(rest);
        test.extend(group_test);
    }
    let mut splits = Vec::new();
    push_split(&mut splits, "train", train);
    push_split(&mut splits, "validation", validation);
    push_split(&mut splits, "test", test);
    splits
}

fn split_sequentially(mut items: Vec<Indexed>, position: usize) -> Vec<Split> {
    let position = position.min(items.len());
    let test = items.split_off(position);
    let mut splits = Vec::new();
    push_split(&mut splits, "train", items);
    push_split(&mut splits, "test", test);
    splits
}

fn split_by_condition(items: Vec<Indexed>, conditions: &[SplitCondition]) -> TransformResult<Vec<Split>> {
    if conditions.is_empty() {
        return Ok(vec![into_split("all", items)]);
    }
    let compiled = conditions
        .iter()
        .map(|c| Ok((c.name.as_deref(), Expression::parse(&c.condition)?)))
        .collect::<TransformResult<Vec<_>>>()?;

    let mut splits = Vec::new();
    let mut remaining = items;
    for (name, condition) in &compiled {
        let (matching, rest): (Vec<Indexed>, Vec<Indexed>) =
            remaining.into_iter().partition(|(idx, record)| {
                condition.evaluate_bool(record).unwrap_or_else(|err| {
                    debug!(record = idx, condition = condition.source(), %err, "split condition skipped");
                    false
                })
            });
        remaining = rest;
        let name = match name {
            Some(name) => name.to_string(),
            None => format!("split_{}", splits.len()),
        };
        push_split(&mut splits, &name, matching);
    }
    push_split(&mut splits, "other", remaining);
    Ok(splits)
}

/// Replaces everything but word characters and `-` with `_`.
fn sanitize_split_name(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

fn split_by_field_value(items: Vec<Indexed>, field: &str) -> Vec<Split> {
    if field.is_empty() {
        return vec![into_split("all", items)];
    }
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<Indexed>> = HashMap::new();
    for item in items {
        let name = match item.1.get(field) {
            Some(value) => sanitize_split_name(&value.to_string()),
            None => "missing".to_string(),
        };
        if !groups.contains_key(&name) {
            order.push(name.clone());
        }
        groups.entry(name).or_default().push(item);
    }
    order
        .into_iter()
        .filter_map(|name| {
            let group = groups.remove(&name)?;
            Some(into_split(name, group))
        })
        .collect()
}

fn split_by_chunk_size(items: Vec<Indexed>, chunk_size: usize) -> Vec<Split> {
    let chunk_size = chunk_size.max(1);
    let mut splits = Vec::new();
    let mut iter = items.into_iter().peekable();
    while iter.peek().is_some() {
        let chunk: Vec<Indexed> = iter.by_ref().take(chunk_size).collect();
        let name = format!("chunk_{:03}", splits.len());
        splits.push(into_split(name, chunk));
    }
    splits
}

fn format_output(splits: &[Split], options: &SplitOptions) -> Vec<Record> {
    let as_list = |records: &[Record]| Value::List(records.iter().cloned().map(Value::Map).collect());
    match options.output_format {
        OutputFormat::SeparateOutputs => splits
            .iter()
            .flat_map(|split| {
                split
                    .records
                    .iter()
                    .zip(&split.original_indices)
                    .enumerate()
                    .map(move |(position, (record, original))| {
                        let mut out = record.clone();
                        if options.include_split_info {
                            out.insert("_split", split.name.as_str());
                        }
                        if options.include_indices {
                            out.insert("_original_index", *original);
                            out.insert("_split_index", position);
                        }
                        out
                    })
            })
            .collect(),
        OutputFormat::CombinedWithLabels => splits
            .iter()
            .map(|split| {
                Record::from([
                    ("split_name", Value::from(split.name.as_str())),
                    ("split_size", Value::from(split.len())),
                    ("data", as_list(&split.records)),
                ])
            })
            .collect(),
        OutputFormat::IndexedChunks => splits
            .iter()
            .enumerate()
            .map(|(i, split)| {
                Record::from([
                    ("chunk_index", Value::from(i)),
                    ("chunk_name", Value::from(split.name.as_str())),
                    ("chunk_size", Value::from(split.len())),
                    ("records", as_list(&split.records)),
                ])
            })
            .collect(),
    }
}

fn split_statistics(splits: &[Split], total: usize) -> SplitStatistics {
    let split_distribution: FieldMap<SplitShare> = splits
        .iter()
        .map(|s| {
            (
                s.name.clone(),
                SplitShare {
                    size: s.len(),
                    percentage: percent(s.len(), total),
                },
            )
        })
        .collect();
    let assigned: usize = splits.iter().map(Split::len).sum();

    let balance_score = if splits.len() > 1 {
        let sizes: Vec<f64> = splits.iter().map(|s| s.len() as f64).collect();
        let avg = sizes.iter().sum::<f64>() / sizes.len() as f64;
        let variance = sizes.iter().map(|s| (s - avg).powi(2)).sum::<f64>() / sizes.len() as f64;
        let largest = sizes.iter().copied().fold(f64::MIN, f64::max);
        let max_variance = (largest - avg).powi(2);
        if max_variance > 0.0 {
            (1.0 - variance / max_variance) * 100.0
        } else {
            100.0
        }
    } else {
        100.0
    };

    SplitStatistics {
        split_count: splits.len(),
        split_distribution,
        coverage: percent(assigned, total),
        balance_score,
    }
}

impl RenderText for SplitReport {
    fn render_text(&self) -> String {
        let s = &self.summary;
        let mut t = TextReport::new("data split");
        t.line(format!("Processing Timestamp: {}", s.processing_timestamp))
            .line(format!("Split Mode: {}", s.split_mode))
            .line(format!("Total Records: {}", s.total_records));

        let stats = &self.statistics;
        if !stats.split_distribution.is_empty() {
            t.section("SPLIT DISTRIBUTION");
            for (name, share) in stats.split_distribution.iter() {
                t.line(format!("  {name}: {} records ({:.1}%)", share.size, share.percentage));
            }
        }

        t.section("STATISTICS")
            .item(1, "Number of Splits", stats.split_count)
            .item(1, "Coverage", fmt_pct(stats.coverage))
            .item(1, "Balance Score", fmt_pct(stats.balance_score));

        let c = &self.configuration;
        t.section("CONFIGURATION").item(1, "split_mode", c.split_mode);
        for (label, ratio) in [
            ("train_ratio", c.train_ratio),
            ("validation_ratio", c.validation_ratio),
            ("test_ratio", c.test_ratio),
        ] {
            if let Some(ratio) = ratio {
                t.item(1, label, ratio);
            }
        }
        if let Some(seed) = c.random_seed {
            t.item(1, "random_seed", seed);
        }
        if let Some(field) = &c.stratify_field {
            t.item(1, "stratify_field", field);
        }
        if s.shuffle_applied {
            t.line("  Data Shuffled: Yes");
        }
        if s.stratification_applied {
            t.line("  Stratification Applied: Yes");
        }
        t.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{OutputFormat, SplitCondition, SplitMode, SplitOptions, split_data};
    use crate::error::TransformError;
    use crate::types::Value;
    use serde_json::json;

    fn numbered(n: i64) -> serde_json::Value {
        serde_json::Value::Array((0..n).map(|i| json!({"i": i})).collect())
    }

    fn ids(records: &[crate::types::Record]) -> Vec<i64> {
        records
            .iter()
            .map(|r| match r.get("i") {
                Some(Value::Int64(n)) => *n,
                _ => -1,
            })
            .collect()
    }

    #[test]
    fn ratio_split_keeps_input_order_without_shuffle() {
        let out = split_data(numbered(8), &SplitOptions::ratios(0.5, 0.25, 0.25)).unwrap();
        assert_eq!(out.names(), vec!["train", "validation", "test"]);
        assert_eq!(ids(out.train()), vec![0, 1, 2, 3]);
        assert_eq!(ids(out.validation()), vec![4, 5]);
        assert_eq!(ids(out.test()), vec![6, 7]);
        assert!((out.report.statistics.balance_score - 50.0).abs() < 1e-9);
        assert_eq!(out.report.statistics.coverage, 100.0);
    }

    #[test]
    fn ratios_are_normalized_and_test_takes_the_remainder() {
        let out = split_data(numbered(10), &SplitOptions::ratios(1.0, 1.0, 1.0)).unwrap();
        let sizes: Vec<usize> = out.splits.iter().map(|s| s.len()).collect();
        assert_eq!(sizes, vec![3, 3, 4]);

        let err = split_data(numbered(3), &SplitOptions::ratios(0.0, 0.0, 0.0)).unwrap_err();
        assert!(matches!(err, TransformError::InvalidConfig { .. }));
    }

    #[test]
    fn seeded_shuffle_is_deterministic() {
        let opts = SplitOptions::with_mode(SplitMode::Random);
        let a = split_data(numbered(20), &opts).unwrap();
        let b = split_data(numbered(20), &opts).unwrap();
        assert_eq!(ids(a.train()), ids(b.train()));
        assert_eq!(a.output, b.output);

        let mut all: Vec<i64> = a.splits.iter().flat_map(|s| ids(&s.records)).collect();
        all.sort_unstable();
        assert_eq!(all, (0..20).collect::<Vec<_>>());
        assert!(a.report.summary.shuffle_applied);
    }

    #[test]
    fn sequential_split_at_position() {
        let opts = SplitOptions {
            sequence_position: 3,
            ..SplitOptions::with_mode(SplitMode::Sequential)
        };
        let out = split_data(numbered(5), &opts).unwrap();
        assert_eq!(ids(out.train()), vec![0, 1, 2]);
        assert_eq!(ids(out.test()), vec![3, 4]);
    }

    #[test]
    fn conditions_take_records_in_order() {
        let opts = SplitOptions {
            split_conditions: vec![
                SplitCondition { name: Some("high".into()), condition: "score >= 80".into() },
                SplitCondition { name: None, condition: "score >= 60".into() },
            ],
            ..SplitOptions::with_mode(SplitMode::Condition)
        };
        let input = json!([{"score":90},{"score":70},{"score":40},{"score":85},{"name":"x"}]);
        let out = split_data(input, &opts).unwrap();
        assert_eq!(out.names(), vec!["high", "split_1", "other"]);
        assert_eq!(out.split("high").unwrap().original_indices, vec![0, 3]);
        assert_eq!(out.split("other").unwrap().original_indices, vec![2, 4]);
    }

    #[test]
    fn field_values_become_sanitized_names() {
        let opts = SplitOptions {
            split_field: "city".into(),
            ..SplitOptions::with_mode(SplitMode::FieldValue)
        };
        let out = split_data(json!([{"city":"New York"},{"city":"Oslo"},{},{"city":"New York"}]), &opts).unwrap();
        assert_eq!(out.names(), vec!["New_York", "Oslo", "missing"]);
        assert_eq!(out.split("New_York").unwrap().len(), 2);
    }

    #[test]
    fn chunks_are_numbered() {
        let opts = SplitOptions {
            chunk_size: 2,
            output_format: OutputFormat::IndexedChunks,
            ..SplitOptions::with_mode(SplitMode::ChunkSize)
        };
        let out = split_data(numbered(5), &opts).unwrap();
        assert_eq!(out.names(), vec!["chunk_000", "chunk_001", "chunk_002"]);
        assert_eq!(out.output.len(), 3);
        assert_eq!(out.output[2].get("chunk_size"), Some(&Value::Int64(1)));
    }

    #[test]
    fn stratification_preserves_class_shares() {
        let mut rows = Vec::new();
        for i in 0..8 {
            let label = if i % 2 == 0 { "a" } else { "b" };
            rows.push(json!({"i": i, "label": label}));
        }
        let opts = SplitOptions {
            stratify_split: true,
            stratify_field: "label".into(),
            ..SplitOptions::ratios(0.5, 0.0, 0.5)
        };
        let out = split_data(serde_json::Value::Array(rows), &opts).unwrap();
        assert_eq!(ids(out.train()), vec![0, 2, 1, 3]);
        assert_eq!(ids(out.test()), vec![4, 6, 5, 7]);
        assert!(out.report.summary.stratification_applied);
    }

    #[test]
    fn separate_outputs_annotate_records() {
        let opts = SplitOptions {
            include_indices: true,
            ..SplitOptions::ratios(0.5, 0.0, 0.5)
        };
        let out = split_data(numbered(2), &opts).unwrap();
        assert_eq!(out.output[1].get("_split"), Some(&Value::from("test")));
        assert_eq!(out.output[1].get("_original_index"), Some(&Value::Int64(1)));
        assert_eq!(out.output[1].get("_split_index"), Some(&Value::Int64(0)));

        let text = out.report.text();
        assert!(text.starts_with("=== DATA SPLIT REPORT ==="));
        assert!(text.contains("  train: 1 records (50.0%)"));
    }
}
