//! Duplicate detection.
//!
//! Every input record ends up in exactly one [`DuplicateGroup`], either as the group's original
//! (first occurrence of its key) or as one of its duplicates. The keep policy then picks one
//! survivor per group.
//!
//! Hash-based strategies digest the canonical (sorted-key) JSON of the normalized record or of a
//! field subset with SHA-256. Fuzzy matching compares every remaining pair, so it is O(n²) in the
//! number of records; keep it to sets of a few thousand records.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::Operation;
use super::report::{FieldMap, RenderText, Report, TextReport, fmt_pct, percent, ratio, timestamp};
use crate::config::strategy_enum;
use crate::error::{TransformError, TransformResult};
use crate::ingestion::{RecordInput, parse_records};
use crate::types::{Record, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupStrategy {
    /// Whole normalized record.
    FullRecord,
    /// Configured `key_fields` only.
    KeyFields,
    /// Configured `hash_fields` only.
    CustomHash,
    /// Pairwise similarity over `fuzzy_config.fields`.
    FuzzyMatch,
}

strategy_enum!(DedupStrategy, "dedup", {
    FullRecord => "full_record",
    KeyFields => "key_fields",
    CustomHash => "custom_hash",
    FuzzyMatch => "fuzzy_match",
});

/// Which member of a duplicate group survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepStrategy {
    First,
    Last,
    MostComplete,
    CustomPriority,
}

strategy_enum!(KeepStrategy, "keep", {
    First => "first",
    Last => "last",
    MostComplete => "most_complete",
    CustomPriority => "custom_priority",
});

/// Per-field string similarity used by fuzzy matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilarityMetric {
    /// Share of positions holding the same character, over the longer string's length.
    Positional,
    /// Jaro-Winkler similarity.
    JaroWinkler,
}

strategy_enum!(SimilarityMetric, "similarity", {
    Positional => "positional",
    JaroWinkler => "jaro_winkler",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzyConfig {
    pub similarity_threshold: f64,
    pub fields: Vec<String>,
    pub metric: SimilarityMetric,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.8,
            fields: Vec::new(),
            metric: SimilarityMetric::Positional,
        }
    }
}

/// Configuration for [`deduplicate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupOptions {
    pub dedup_strategy: DedupStrategy,
    pub key_fields: Vec<String>,
    pub hash_fields: Vec<String>,
    pub fuzzy_config: FuzzyConfig,
    pub keep_strategy: KeepStrategy,
    pub priority_fields: Vec<String>,
    pub case_sensitive: bool,
    /// Trim surrounding whitespace from strings before comparing.
    pub ignore_whitespace: bool,
    /// Add field analysis and statistics to the report.
    pub include_duplicate_info: bool,
    /// Keep survivors in group order (first occurrence). When false they follow their own
    /// input positions.
    pub preserve_order: bool,
}

impl Default for DedupOptions {
    fn default() -> Self {
        Self {
            dedup_strategy: DedupStrategy::FullRecord,
            key_fields: Vec::new(),
            hash_fields: Vec::new(),
            fuzzy_config: FuzzyConfig::default(),
            keep_strategy: KeepStrategy::First,
            priority_fields: Vec::new(),
            case_sensitive: true,
            ignore_whitespace: false,
            include_duplicate_info: true,
            preserve_order: true,
        }
    }
}

impl DedupOptions {
    pub fn key_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dedup_strategy: DedupStrategy::KeyFields,
            key_fields: fields.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn fuzzy<I, S>(fields: I, similarity_threshold: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dedup_strategy: DedupStrategy::FuzzyMatch,
            fuzzy_config: FuzzyConfig {
                similarity_threshold,
                fields: fields.into_iter().map(Into::into).collect(),
                ..FuzzyConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn keep(mut self, keep_strategy: KeepStrategy) -> Self {
        self.keep_strategy = keep_strategy;
        self
    }

    fn normalize(&self, value: &Value) -> Value {
        match value {
            Value::Utf8(s) => {
                let s = if self.ignore_whitespace { s.trim() } else { s };
                if self.case_sensitive {
                    Value::Utf8(s.to_string())
                } else {
                    Value::Utf8(s.to_lowercase())
                }
            }
            other => other.clone(),
        }
    }

    fn normalize_text(&self, value: &Value) -> String {
        let text = value.to_string();
        let text = if self.ignore_whitespace { text.trim().to_string() } else { text };
        if self.case_sensitive { text } else { text.to_lowercase() }
    }
}

/// A group member with its input position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMember {
    pub index: usize,
    pub record: Record,
    /// Similarity to the group original (fuzzy matching only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
}

/// The first occurrence of a key plus every later record sharing it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateGroup {
    /// Hex SHA-256 digest of the group key; `fuzzy:{index}` for fuzzy groups.
    pub key: String,
    /// Normalized key values (`key_fields` strategy only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_values: Option<Record>,
    pub original: GroupMember,
    pub duplicates: Vec<GroupMember>,
    pub total_count: usize,
}

impl DuplicateGroup {
    fn new(key: String, index: usize, record: Record) -> Self {
        Self {
            key,
            key_values: None,
            original: GroupMember {
                index,
                record,
                similarity: None,
            },
            duplicates: Vec::new(),
            total_count: 1,
        }
    }

    fn push(&mut self, index: usize, record: Record, similarity: Option<f64>) {
        self.duplicates.push(GroupMember {
            index,
            record,
            similarity,
        });
        self.total_count += 1;
    }

    pub fn has_duplicates(&self) -> bool {
        !self.duplicates.is_empty()
    }

    /// Original first, then duplicates in discovery order.
    pub fn members(&self) -> impl Iterator<Item = &GroupMember> {
        std::iter::once(&self.original).chain(self.duplicates.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DedupSummary {
    pub total_records: usize,
    pub unique_records: usize,
    pub duplicate_records: usize,
    pub duplicate_groups: usize,
    pub processing_timestamp: String,
    pub strategy: DedupStrategy,
    pub keep_strategy: KeepStrategy,
}

/// Report view of one group with duplicates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupListing {
    pub key: String,
    pub original_index: usize,
    pub duplicate_indices: Vec<usize>,
    pub total_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_similarity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DedupFieldAnalysis {
    pub total_records: usize,
    pub unique_values: usize,
    pub uniqueness_ratio: f64,
    /// Records beyond the first in groups where this field holds one value throughout.
    pub duplicate_contribution: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DedupStatistics {
    pub deduplication_rate: f64,
    pub average_group_size: f64,
    pub largest_group_size: usize,
    pub total_duplicate_groups: usize,
    pub efficiency_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DedupReport {
    pub summary: DedupSummary,
    pub duplicate_groups: Vec<GroupListing>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_analysis: Option<FieldMap<DedupFieldAnalysis>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<DedupStatistics>,
}

#[derive(Debug, Clone)]
pub struct DedupOutcome {
    /// One survivor per group.
    pub records: Vec<Record>,
    /// Every group, including keys seen only once.
    pub groups: Vec<DuplicateGroup>,
    pub report: Report<DedupReport>,
}

impl DedupOutcome {
    /// Groups that have at least one duplicate.
    pub fn duplicate_groups(&self) -> impl Iterator<Item = &DuplicateGroup> {
        self.groups.iter().filter(|g| g.has_duplicates())
    }

    /// Records recognised as duplicates of an earlier record.
    pub fn duplicate_records(&self) -> impl Iterator<Item = &Record> {
        self.groups
            .iter()
            .flat_map(|g| g.duplicates.iter().map(|d| &d.record))
    }
}

/// Removes duplicate records from `input`.
pub fn deduplicate(
    input: impl Into<RecordInput>,
    options: &DedupOptions,
) -> TransformResult<DedupOutcome> {
    dedup_records(parse_records(input)?, options)
}

/// Deduplication as an [`Operation`].
#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    options: DedupOptions,
}

impl Deduplicator {
    pub fn new(options: DedupOptions) -> Self {
        Self { options }
    }
}

impl Operation for Deduplicator {
    type Outcome = DedupOutcome;
    const NAME: &'static str = "deduplication";

    fn apply(&self, records: Vec<Record>) -> TransformResult<DedupOutcome> {
        dedup_records(records, &self.options)
    }
}

fn dedup_records(records: Vec<Record>, options: &DedupOptions) -> TransformResult<DedupOutcome> {
    if records.is_empty() {
        return Err(TransformError::EmptyData);
    }
    debug!(
        records = records.len(),
        strategy = %options.dedup_strategy,
        keep = %options.keep_strategy,
        "deduplication started"
    );

    let groups = match options.dedup_strategy {
        DedupStrategy::FullRecord => group_by_hash(&records, None, options),
        DedupStrategy::KeyFields => {
            let fields = required_fields(&options.key_fields, "key_fields", "key_fields")?;
            let mut groups = group_by_hash(&records, Some(fields), options);
            for group in &mut groups {
                group.key_values = Some(key_record(&group.original.record, fields, options));
            }
            groups
        }
        DedupStrategy::CustomHash => {
            let fields = required_fields(&options.hash_fields, "custom_hash", "hash_fields")?;
            group_by_hash(&records, Some(fields), options)
        }
        DedupStrategy::FuzzyMatch => {
            let fields = required_fields(&options.fuzzy_config.fields, "fuzzy_match", "fuzzy_config.fields")?;
            group_fuzzy(&records, fields, options)
        }
    };

    let mut survivors: Vec<(usize, Record)> = groups
        .iter()
        .map(|g| {
            let member = keep_member(g, options);
            (member.index, member.record.clone())
        })
        .collect();
    if !options.preserve_order {
        survivors.sort_by_key(|(idx, _)| *idx);
    }
    let unique: Vec<Record> = survivors.into_iter().map(|(_, r)| r).collect();

    let report = build_report(&records, &groups, unique.len(), options);
    info!(
        total = records.len(),
        unique = unique.len(),
        groups = report.summary.duplicate_groups,
        "deduplication finished"
    );

    Ok(DedupOutcome {
        records: unique,
        groups,
        report: Report::new(report),
    })
}

fn required_fields<'a>(
    fields: &'a [String],
    strategy: &str,
    field: &'static str,
) -> TransformResult<&'a [String]> {
    if fields.is_empty() {
        return Err(TransformError::MissingFieldConfig {
            strategy: strategy.to_string(),
            field,
        });
    }
    Ok(fields)
}

fn key_record(record: &Record, fields: &[String], options: &DedupOptions) -> Record {
    record
        .iter()
        .filter(|(k, _)| fields.iter().any(|f| f == k))
        .map(|(k, v)| (k.to_string(), options.normalize(v)))
        .collect()
}

fn digest(record: &Record, fields: Option<&[String]>, options: &DedupOptions) -> String {
    let normalized = match fields {
        Some(fields) => key_record(record, fields, options),
        None => record
            .iter()
            .map(|(k, v)| (k.to_string(), options.normalize(v)))
            .collect(),
    };
    let canonical = Value::Map(normalized).to_canonical_json();
    hex::encode(Sha256::digest(canonical.as_bytes()))
}

fn group_by_hash(
    records: &[Record],
    fields: Option<&[String]>,
    options: &DedupOptions,
) -> Vec<DuplicateGroup> {
    let keys: Vec<String> = records
        .par_iter()
        .map(|r| digest(r, fields, options))
        .collect();

    let mut groups: Vec<DuplicateGroup> = Vec::new();
    let mut positions: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    for (idx, (key, record)) in keys.into_iter().zip(records).enumerate() {
        match positions.get(&key) {
            Some(&pos) => groups[pos].push(idx, record.clone(), None),
            None => {
                positions.insert(key.clone(), groups.len());
                groups.push(DuplicateGroup::new(key, idx, record.clone()));
            }
        }
    }
    groups
}

fn group_fuzzy(records: &[Record], fields: &[String], options: &DedupOptions) -> Vec<DuplicateGroup> {
    let threshold = options.fuzzy_config.similarity_threshold;
    let mut assigned = vec![false; records.len()];
    let mut groups = Vec::new();

    for i in 0..records.len() {
        if assigned[i] {
            continue;
        }
        assigned[i] = true;
        let mut group = DuplicateGroup::new(format!("fuzzy:{i}"), i, records[i].clone());

        let taken = &assigned;
        let matches: Vec<(usize, f64)> = (i + 1..records.len())
            .into_par_iter()
            .filter(|&j| !taken[j])
            .filter_map(|j| {
                let score = record_similarity(&records[i], &records[j], fields, options);
                (score >= threshold).then_some((j, score))
            })
            .collect();

        for (j, score) in matches {
            assigned[j] = true;
            group.push(j, records[j].clone(), Some(score));
        }
        groups.push(group);
    }
    groups
}

/// Mean per-field similarity; a field missing from either record scores 0.
pub fn record_similarity(a: &Record, b: &Record, fields: &[String], options: &DedupOptions) -> f64 {
    if fields.is_empty() {
        return 0.0;
    }
    let total: f64 = fields
        .iter()
        .map(|field| match (a.get(field), b.get(field)) {
            (Some(x), Some(y)) => {
                let x = options.normalize_text(x);
                let y = options.normalize_text(y);
                match options.fuzzy_config.metric {
                    SimilarityMetric::Positional => positional_similarity(&x, &y),
                    SimilarityMetric::JaroWinkler => {
                        rapidfuzz::distance::jaro_winkler::similarity(x.chars(), y.chars())
                    }
                }
            }
            _ => 0.0,
        })
        .sum();
    total / fields.len() as f64
}

/// Characters equal at the same position, divided by the longer string's length.
pub fn positional_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let a_len = a.chars().count();
    let b_len = b.chars().count();
    let (longer, shorter, longer_len) = if a_len > b_len { (a, b, a_len) } else { (b, a, b_len) };
    let matches = shorter
        .chars()
        .zip(longer.chars())
        .filter(|(x, y)| x == y)
        .count();
    matches as f64 / longer_len as f64
}

fn keep_member<'a>(group: &'a DuplicateGroup, options: &DedupOptions) -> &'a GroupMember {
    if !group.has_duplicates() {
        return &group.original;
    }
    match options.keep_strategy {
        KeepStrategy::First => &group.original,
        KeepStrategy::Last => group.duplicates.last().unwrap_or(&group.original),
        KeepStrategy::MostComplete => first_max_by(group, |a, b| {
            completeness(&a.record).cmp(&completeness(&b.record))
        }),
        KeepStrategy::CustomPriority => {
            if options.priority_fields.is_empty() {
                return &group.original;
            }
            first_max_by(group, |a, b| {
                let pa = priority_score(&a.record, &options.priority_fields);
                let pb = priority_score(&b.record, &options.priority_fields);
                pa.partial_cmp(&pb).unwrap_or(std::cmp::Ordering::Equal)
            })
        }
    }
}

/// Greatest member; ties go to the earliest.
fn first_max_by<'a>(
    group: &'a DuplicateGroup,
    cmp: impl Fn(&GroupMember, &GroupMember) -> std::cmp::Ordering,
) -> &'a GroupMember {
    let mut best = &group.original;
    for member in &group.duplicates {
        if cmp(member, best).is_gt() {
            best = member;
        }
    }
    best
}

fn completeness(record: &Record) -> usize {
    record
        .values()
        .filter(|v| !v.is_null() && v.as_str() != Some(""))
        .count()
}

/// Numbers count as themselves, numeric strings are parsed, other strings score their length.
fn priority_score(record: &Record, fields: &[String]) -> Vec<f64> {
    fields
        .iter()
        .map(|field| match record.get(field) {
            Some(Value::Int64(n)) => *n as f64,
            Some(Value::Float64(f)) => *f,
            Some(Value::Utf8(s)) => s
                .trim()
                .parse::<f64>()
                .unwrap_or(s.chars().count() as f64),
            _ => 0.0,
        })
        .collect()
}

fn build_report(
    records: &[Record],
    groups: &[DuplicateGroup],
    unique: usize,
    options: &DedupOptions,
) -> DedupReport {
    let total = records.len();
    let listings: Vec<GroupListing> = groups
        .iter()
        .filter(|g| g.has_duplicates())
        .map(|g| GroupListing {
            key: g.key.clone(),
            original_index: g.original.index,
            duplicate_indices: g.duplicates.iter().map(|d| d.index).collect(),
            total_count: g.total_count,
            min_similarity: g
                .duplicates
                .iter()
                .filter_map(|d| d.similarity)
                .reduce(f64::min),
        })
        .collect();

    let summary = DedupSummary {
        total_records: total,
        unique_records: unique,
        duplicate_records: total - unique,
        duplicate_groups: listings.len(),
        processing_timestamp: timestamp(),
        strategy: options.dedup_strategy,
        keep_strategy: options.keep_strategy,
    };

    let (field_analysis, statistics) = if options.include_duplicate_info {
        let sizes: Vec<usize> = listings.iter().map(|l| l.total_count).collect();
        let rate = percent(summary.duplicate_records, total);
        let statistics = DedupStatistics {
            deduplication_rate: rate,
            average_group_size: ratio(sizes.iter().sum(), sizes.len()),
            largest_group_size: sizes.iter().copied().max().unwrap_or(0),
            total_duplicate_groups: sizes.len(),
            efficiency_score: rate,
        };
        (Some(analyze_fields(records, groups)), Some(statistics))
    } else {
        (None, None)
    };

    DedupReport {
        summary,
        duplicate_groups: listings,
        field_analysis,
        statistics,
    }
}

fn analyze_fields(records: &[Record], groups: &[DuplicateGroup]) -> FieldMap<DedupFieldAnalysis> {
    let mut seen: FieldMap<(usize, std::collections::HashSet<String>)> = FieldMap::new();
    for record in records {
        for (field, value) in record.iter() {
            let (count, values) = seen.entry_or_insert_with(field, Default::default);
            *count += 1;
            values.insert(value.to_string());
        }
    }

    seen.iter()
        .map(|(field, (count, values))| {
            let duplicate_contribution = groups
                .iter()
                .filter(|g| g.has_duplicates())
                .filter(|g| {
                    let mut rendered = g
                        .members()
                        .filter_map(|m| m.record.get(field))
                        .map(Value::to_string);
                    match rendered.next() {
                        Some(first) => rendered.all(|v| v == first),
                        None => false,
                    }
                })
                .map(|g| g.total_count - 1)
                .sum();
            (
                field.to_string(),
                DedupFieldAnalysis {
                    total_records: *count,
                    unique_values: values.len(),
                    uniqueness_ratio: ratio(values.len(), *count),
                    duplicate_contribution,
                },
            )
        })
        .collect()
}

impl RenderText for DedupReport {
    fn render_text(&self) -> String {
        let s = &self.summary;
        let mut t = TextReport::new("deduplication");
        t.line(format!("Processing Timestamp: {}", s.processing_timestamp))
            .line(format!("Strategy: {}", s.strategy))
            .line(format!("Keep Strategy: {}", s.keep_strategy));

        t.section("SUMMARY")
            .item(1, "Total Records", s.total_records)
            .item(1, "Unique Records", s.unique_records)
            .item(1, "Duplicate Records", s.duplicate_records)
            .item(
                1,
                "Deduplication Rate",
                fmt_pct(percent(s.duplicate_records, s.total_records)),
            );

        if !self.duplicate_groups.is_empty() {
            let sizes: Vec<usize> = self.duplicate_groups.iter().map(|g| g.total_count).collect();
            t.section("DUPLICATE GROUPS")
                .item(1, "Total Groups", sizes.len())
                .item(1, "Largest Group Size", sizes.iter().copied().max().unwrap_or(0))
                .item(
                    1,
                    "Average Group Size",
                    format!("{:.1}", ratio(sizes.iter().sum(), sizes.len())),
                );
        }

        if let Some(stats) = &self.statistics {
            t.section("STATISTICS")
                .item(1, "Efficiency Score", fmt_pct(stats.efficiency_score));
        }

        if let Some(analysis) = &self.field_analysis {
            let contributing: Vec<_> = analysis
                .iter()
                .filter(|(_, a)| a.duplicate_contribution > 0)
                .collect();
            if !contributing.is_empty() {
                t.section("FIELD ANALYSIS");
                for (field, a) in contributing {
                    t.line(format!("  {field}:"))
                        .item(2, "Uniqueness Ratio", format!("{:.3}", a.uniqueness_ratio))
                        .item(2, "Duplicate Contribution", a.duplicate_contribution);
                }
            }
        }
        t.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        DedupOptions, DedupStrategy, KeepStrategy, SimilarityMetric, deduplicate,
        positional_similarity,
    };
    use crate::error::TransformError;
    use crate::types::Value;
    use serde_json::json;

    #[test]
    fn full_record_groups_identical_records() {
        let out = deduplicate(json!([{"a":1},{"a":1},{"a":2}]), &DedupOptions::default()).unwrap();
        assert_eq!(out.records.len(), 2);
        let dups: Vec<_> = out.duplicate_groups().collect();
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].total_count, 2);
        assert_eq!(dups[0].original.record.get("a"), Some(&Value::Int64(1)));
        assert_eq!(out.groups.len(), 2);
        assert_eq!(out.report.summary.duplicate_records, 1);
    }

    #[test]
    fn key_order_does_not_matter() {
        let out = deduplicate(json!([{"a":1,"b":2},{"b":2,"a":1}]), &DedupOptions::default()).unwrap();
        assert_eq!(out.records.len(), 1);
    }

    #[test]
    fn case_and_whitespace_normalization() {
        let input = json!([{"name":"Ann "},{"name":"ann"}]);
        let out = deduplicate(input.clone(), &DedupOptions::default()).unwrap();
        assert_eq!(out.records.len(), 2);

        let opts = DedupOptions {
            case_sensitive: false,
            ignore_whitespace: true,
            ..DedupOptions::default()
        };
        let out = deduplicate(input, &opts).unwrap();
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].get("name"), Some(&Value::from("Ann ")));
    }

    #[test]
    fn key_fields_require_configuration() {
        let opts = DedupOptions {
            dedup_strategy: DedupStrategy::KeyFields,
            ..DedupOptions::default()
        };
        let err = deduplicate(json!([{"a":1}]), &opts).unwrap_err();
        assert!(matches!(err, TransformError::MissingFieldConfig { field: "key_fields", .. }));

        let opts = DedupOptions {
            dedup_strategy: DedupStrategy::FuzzyMatch,
            ..DedupOptions::default()
        };
        assert!(deduplicate(json!([{"a":1}]), &opts).is_err());
    }

    #[test]
    fn keep_policies_pick_the_survivor() {
        let input = json!([
            {"id":1,"email":"","score":"3"},
            {"id":1,"email":"a@x.io","score":"10"},
            {"id":1,"email":null,"score":"7"},
            {"id":2,"email":"b@x.io","score":"1"}
        ]);
        let base = DedupOptions::key_fields(["id"]);

        let out = deduplicate(input.clone(), &base.clone().keep(KeepStrategy::Last)).unwrap();
        assert_eq!(out.records[0].get("score"), Some(&Value::from("7")));
        assert_eq!(out.records.len(), 2);

        let out = deduplicate(input.clone(), &base.clone().keep(KeepStrategy::MostComplete)).unwrap();
        assert_eq!(out.records[0].get("email"), Some(&Value::from("a@x.io")));

        let mut opts = base.keep(KeepStrategy::CustomPriority);
        opts.priority_fields = vec!["score".into()];
        let out = deduplicate(input, &opts).unwrap();
        assert_eq!(out.records[0].get("score"), Some(&Value::from("10")));
        let key_values = out.groups[0].key_values.as_ref().unwrap();
        assert_eq!(key_values.get("id"), Some(&Value::Int64(1)));
    }

    #[test]
    fn fuzzy_match_uses_positional_overlap() {
        assert_eq!(positional_similarity("abcd", "abcx"), 0.75);
        assert_eq!(positional_similarity("", "a"), 0.0);
        assert_eq!(positional_similarity("ab", "abcd"), 0.5);

        let input = json!([{"name":"Jonathan"},{"name":"Jonathon"},{"name":"Maria"}]);
        let out = deduplicate(input.clone(), &DedupOptions::fuzzy(["name"], 0.8)).unwrap();
        assert_eq!(out.records.len(), 2);
        let group = out.duplicate_groups().next().unwrap();
        assert_eq!(group.duplicates[0].index, 1);
        assert_eq!(group.duplicates[0].similarity, Some(0.875));

        let mut opts = DedupOptions::fuzzy(["name"], 0.9);
        opts.fuzzy_config.metric = SimilarityMetric::JaroWinkler;
        let out = deduplicate(input, &opts).unwrap();
        assert_eq!(out.records.len(), 2);
    }

    #[test]
    fn preserve_order_false_orders_survivors_by_position() {
        let input = json!([{"k":"a","n":1},{"k":"b","n":2},{"k":"a","n":3}]);
        let opts = DedupOptions {
            preserve_order: false,
            ..DedupOptions::key_fields(["k"]).keep(KeepStrategy::Last)
        };
        let out = deduplicate(input, &opts).unwrap();
        let ns: Vec<_> = out.records.iter().map(|r| r.get("n").cloned()).collect();
        assert_eq!(ns, vec![Some(Value::Int64(2)), Some(Value::Int64(3))]);
    }

    #[test]
    fn report_lists_groups_and_field_contribution() {
        let out = deduplicate(json!([{"a":1,"b":"x"},{"a":1,"b":"x"},{"a":2,"b":"y"}]), &DedupOptions::default()).unwrap();
        let text = out.report.text();
        assert!(text.starts_with("=== DEDUPLICATION REPORT ==="));
        assert!(text.contains("Deduplication Rate: 33.33%"));
        assert!(text.contains("Total Groups: 1"));
        let analysis = out.report.field_analysis.as_ref().unwrap();
        assert_eq!(analysis.get("a").unwrap().duplicate_contribution, 1);
        assert_eq!(out.duplicate_records().count(), 1);
    }
}
