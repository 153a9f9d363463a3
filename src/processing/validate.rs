//! Record validation.
//!
//! Every record is checked for null fields, type mismatches against a schema, numeric range
//! violations and custom pattern/length rules. Duplicate detection runs over the whole set
//! afterwards and only contributes report entries.
//!
//! The mode decides what happens to failing records: `strict` aborts on the first one,
//! `tolerant` keeps them out of the clean set, `report_only` passes every record through.
//! With `auto_clean`, tolerant runs try to salvage failing records by dropping null fields and
//! casting mismatched numbers/strings.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, info, warn};

use super::Operation;
use super::nulls::NullPolicy;
use super::report::{FieldMap, RenderText, Report, TextReport, fmt_pct, percent, timestamp};
use crate::config::strategy_enum;
use crate::error::{TransformError, TransformResult};
use crate::ingestion::{RecordInput, parse_records};
use crate::types::{DataType, Record, Value, field_names, format_float};

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";
const URL_PATTERN: &str = r"^https?://[^\s/$.?#].[^\s]*$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Strict,
    Tolerant,
    ReportOnly,
}

strategy_enum!(ValidationMode, "validation", {
    Strict => "strict",
    Tolerant => "tolerant",
    ReportOnly => "report_only",
});

/// Expected type of a schema field. Names outside the known set always pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedType {
    String,
    Integer,
    Float,
    Boolean,
    Email,
    Url,
    Date,
    Unknown(String),
}

impl ExpectedType {
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "string" => Self::String,
            "integer" => Self::Integer,
            "float" => Self::Float,
            "boolean" => Self::Boolean,
            "email" => Self::Email,
            "url" => Self::Url,
            "date" => Self::Date,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Email => "email",
            Self::Url => "url",
            Self::Date => "date",
            Self::Unknown(name) => name,
        }
    }
}

impl Serialize for ExpectedType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ExpectedType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::parse(&String::deserialize(deserializer)?))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeRule {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

/// Pattern and length constraints on one field. The pattern only has to match at the start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomRule {
    pub field: Option<String>,
    pub pattern: Option<String>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

/// Configuration for [`validate_data`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidateOptions {
    pub validation_mode: ValidationMode,
    pub check_null_values: bool,
    pub check_duplicates: bool,
    pub check_data_types: bool,
    pub type_schema: BTreeMap<String, ExpectedType>,
    pub check_ranges: bool,
    pub range_schema: BTreeMap<String, RangeRule>,
    pub use_custom_rules: bool,
    pub custom_rules: BTreeMap<String, CustomRule>,
    pub include_statistics: bool,
    pub auto_clean: bool,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            validation_mode: ValidationMode::Tolerant,
            check_null_values: true,
            check_duplicates: true,
            check_data_types: true,
            type_schema: BTreeMap::new(),
            check_ranges: false,
            range_schema: BTreeMap::new(),
            use_custom_rules: false,
            custom_rules: BTreeMap::new(),
            include_statistics: true,
            auto_clean: false,
        }
    }
}

impl ValidateOptions {
    pub fn with_mode(mode: ValidationMode) -> Self {
        Self {
            validation_mode: mode,
            ..Self::default()
        }
    }

    pub fn expect_type(mut self, field: impl Into<String>, expected: ExpectedType) -> Self {
        self.type_schema.insert(field.into(), expected);
        self
    }

    pub fn range(mut self, field: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        self.check_ranges = true;
        self.range_schema.insert(field.into(), RangeRule { min, max });
        self
    }

    pub fn rule(mut self, name: impl Into<String>, rule: CustomRule) -> Self {
        self.use_custom_rules = true;
        self.custom_rules.insert(name.into(), rule);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    NullValue,
    DataType,
    RangeViolation,
    RangeError,
    CustomRule,
    Duplicate,
}

impl IssueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NullValue => "null_value",
            Self::DataType => "data_type",
            Self::RangeViolation => "range_violation",
            Self::RangeError => "range_error",
            Self::CustomRule => "custom_rule",
            Self::Duplicate => "duplicate",
        }
    }
}

/// One failed check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub record_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_type: Option<ExpectedType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<usize>,
    pub message: String,
}

impl ValidationIssue {
    fn new(kind: IssueKind, record_index: usize, field: Option<&str>, message: String) -> Self {
        Self {
            kind,
            record_index,
            field: field.map(str::to_string),
            expected_type: None,
            value: None,
            constraint: None,
            rule_name: None,
            duplicate_of: None,
            message,
        }
    }
}

/// A record that failed at least one per-record check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    pub record_index: usize,
    pub record: Record,
    pub errors: Vec<ValidationIssue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationSummary {
    pub total_records: usize,
    pub valid_records: usize,
    pub invalid_records: usize,
    pub validation_timestamp: String,
    pub validation_mode: ValidationMode,
    pub validation_passed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldQuality {
    pub total_count: usize,
    pub null_count: usize,
    pub unique_count: usize,
    pub data_types: FieldMap<usize>,
    pub null_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityStatistics {
    pub record_count: usize,
    pub field_analysis: FieldMap<FieldQuality>,
    /// Mean field completeness, in percent.
    pub data_quality_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub summary: ValidationSummary,
    pub checks_performed: Vec<String>,
    pub errors: Vec<ValidationIssue>,
    /// Issue counts keyed by issue type, in first-seen order.
    pub error_counts: FieldMap<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<QualityStatistics>,
}

#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub clean_records: Vec<Record>,
    pub error_records: Vec<ErrorRecord>,
    pub report: Report<ValidationReport>,
}

/// Validates `input` according to `options`.
pub fn validate_data(
    input: impl Into<RecordInput>,
    options: &ValidateOptions,
) -> TransformResult<ValidationOutcome> {
    validate_records(parse_records(input)?, options)
}

/// Validation as an [`Operation`].
#[derive(Debug, Clone, Default)]
pub struct DataValidator {
    options: ValidateOptions,
}

impl DataValidator {
    pub fn new(options: ValidateOptions) -> Self {
        Self { options }
    }
}

impl Operation for DataValidator {
    type Outcome = ValidationOutcome;
    const NAME: &'static str = "data validation";

    fn apply(&self, records: Vec<Record>) -> TransformResult<ValidationOutcome> {
        validate_records(records, &self.options)
    }
}

struct Checker<'a> {
    options: &'a ValidateOptions,
    nulls: NullPolicy,
    email: Regex,
    url: Regex,
    rules: Vec<(&'a str, &'a CustomRule, Option<Regex>)>,
}

impl<'a> Checker<'a> {
    fn new(options: &'a ValidateOptions) -> TransformResult<Self> {
        let compile =
            |pattern: &str| Regex::new(pattern).map_err(|e| TransformError::invalid_regex(pattern, e));
        let rules = if options.use_custom_rules {
            options
                .custom_rules
                .iter()
                .map(|(name, rule)| {
                    let pattern = match &rule.pattern {
                        Some(p) => Some(
                            Regex::new(&format!("^(?:{p})"))
                                .map_err(|e| TransformError::invalid_regex(p, e))?,
                        ),
                        None => None,
                    };
                    Ok((name.as_str(), rule, pattern))
                })
                .collect::<TransformResult<_>>()?
        } else {
            Vec::new()
        };
        Ok(Self {
            options,
            nulls: NullPolicy::blank_strings(),
            email: compile(EMAIL_PATTERN)?,
            url: compile(URL_PATTERN)?,
            rules,
        })
    }

    fn check(&self, idx: usize, record: &Record) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if self.options.check_null_values {
            self.check_nulls(idx, record, &mut issues);
        }
        if self.options.check_data_types {
            self.check_types(idx, record, &mut issues);
        }
        if self.options.check_ranges {
            check_ranges(&self.options.range_schema, idx, record, &mut issues);
        }
        self.check_rules(idx, record, &mut issues);
        issues
    }

    fn check_nulls(&self, idx: usize, record: &Record, issues: &mut Vec<ValidationIssue>) {
        for (field, value) in record.iter() {
            if self.nulls.is_null_value(value) {
                issues.push(ValidationIssue::new(
                    IssueKind::NullValue,
                    idx,
                    Some(field),
                    format!("Null or empty value found in field '{field}'"),
                ));
            }
        }
    }

    fn check_types(&self, idx: usize, record: &Record, issues: &mut Vec<ValidationIssue>) {
        for (field, expected) in &self.options.type_schema {
            let Some(value) = record.get(field).filter(|v| !v.is_null()) else {
                continue;
            };
            if self.type_matches(value, expected) {
                continue;
            }
            let actual = value.data_type().map_or("null", DataType::as_str);
            let mut issue = ValidationIssue::new(
                IssueKind::DataType,
                idx,
                Some(field),
                format!("Field '{field}' expected {}, got {actual}", expected.as_str()),
            );
            issue.expected_type = Some(expected.clone());
            issue.value = Some(value.clone());
            issues.push(issue);
        }
    }

    fn type_matches(&self, value: &Value, expected: &ExpectedType) -> bool {
        match expected {
            ExpectedType::String => matches!(value, Value::Utf8(_)),
            ExpectedType::Integer => match value {
                Value::Int64(_) => true,
                Value::Utf8(s) => !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()),
                _ => false,
            },
            ExpectedType::Float => value.coerce_f64().is_some(),
            ExpectedType::Boolean => matches!(value, Value::Bool(_)),
            ExpectedType::Email => value.as_str().is_some_and(|s| self.email.is_match(s)),
            ExpectedType::Url => value.as_str().is_some_and(|s| self.url.is_match(s)),
            ExpectedType::Date => value.as_str().is_some_and(is_iso_date),
            ExpectedType::Unknown(_) => true,
        }
    }

    fn check_rules(&self, idx: usize, record: &Record, issues: &mut Vec<ValidationIssue>) {
        for (name, rule, pattern) in &self.rules {
            let Some(field) = rule.field.as_deref() else {
                continue;
            };
            let Some(value) = record.get(field).filter(|v| !v.is_null()) else {
                continue;
            };
            let text = value.to_string();
            let rule_issue = |message: String, constraint: Option<String>| {
                let mut issue = ValidationIssue::new(IssueKind::CustomRule, idx, Some(field), message);
                issue.rule_name = Some(name.to_string());
                issue.value = Some(value.clone());
                issue.constraint = constraint;
                issue
            };

            if let Some(re) = pattern
                && !re.is_match(&text)
            {
                issues.push(rule_issue(
                    format!("Field '{field}' value '{text}' does not match pattern for rule '{name}'"),
                    None,
                ));
            }
            let length = text.chars().count();
            if let Some(min) = rule.min_length
                && length < min
            {
                issues.push(rule_issue(
                    format!("Field '{field}' length {length} is below minimum {min}"),
                    Some(format!("min_length: {min}")),
                ));
            }
            if let Some(max) = rule.max_length
                && length > max
            {
                issues.push(rule_issue(
                    format!("Field '{field}' length {length} exceeds maximum {max}"),
                    Some(format!("max_length: {max}")),
                ));
            }
        }
    }
}

/// ISO 8601 dates and date-times, with or without an offset.
fn is_iso_date(s: &str) -> bool {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s).is_ok()
        || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
        || ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
            .iter()
            .any(|fmt| NaiveDateTime::parse_from_str(s, fmt).is_ok())
}

fn check_ranges(
    schema: &BTreeMap<String, RangeRule>,
    idx: usize,
    record: &Record,
    issues: &mut Vec<ValidationIssue>,
) {
    for (field, range) in schema {
        let Some(value) = record.get(field).filter(|v| !v.is_null()) else {
            continue;
        };
        let Some(number) = value.coerce_f64() else {
            let mut issue = ValidationIssue::new(
                IssueKind::RangeError,
                idx,
                Some(field),
                format!("Field '{field}' value '{value}' is not numeric for range validation"),
            );
            issue.value = Some(value.clone());
            issues.push(issue);
            continue;
        };
        let shown = format_float(number);
        let mut violation = |bound: &str, limit: f64, message: String| {
            let mut issue = ValidationIssue::new(IssueKind::RangeViolation, idx, Some(field), message);
            issue.value = Some(Value::Float64(number));
            issue.constraint = Some(format!("{bound}: {}", format_float(limit)));
            issues.push(issue);
        };
        if let Some(min) = range.min
            && number < min
        {
            violation("min", min, format!("Field '{field}' value {shown} is below minimum {}", format_float(min)));
        }
        if let Some(max) = range.max
            && number > max
        {
            violation("max", max, format!("Field '{field}' value {shown} exceeds maximum {}", format_float(max)));
        }
    }
}

fn check_duplicates(records: &[Record]) -> Vec<ValidationIssue> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut issues = Vec::new();
    for (idx, record) in records.iter().enumerate() {
        let key = Value::Map(record.clone()).to_canonical_json();
        match seen.get(&key) {
            Some(&first) => {
                let mut issue = ValidationIssue::new(
                    IssueKind::Duplicate,
                    idx,
                    None,
                    format!("Record {idx} is a duplicate of record {first}"),
                );
                issue.duplicate_of = Some(first);
                issues.push(issue);
            }
            None => {
                seen.insert(key, idx);
            }
        }
    }
    issues
}

/// Drops null fields and casts numeric/string mismatches. `None` when something else failed.
fn salvage(error_record: &ErrorRecord) -> Option<Record> {
    let mut record = error_record.record.clone();
    for issue in &error_record.errors {
        let field = issue.field.as_deref()?;
        match issue.kind {
            IssueKind::NullValue => {
                record.remove(field);
            }
            IssueKind::DataType => {
                let target = match issue.expected_type.as_ref()? {
                    ExpectedType::Integer => DataType::Int64,
                    ExpectedType::Float => DataType::Float64,
                    ExpectedType::String => DataType::Utf8,
                    _ => return None,
                };
                let cast = record.get(field)?.coerce_to(target)?;
                record.insert(field, cast);
            }
            _ => return None,
        }
    }
    Some(record)
}

fn validate_records(
    records: Vec<Record>,
    options: &ValidateOptions,
) -> TransformResult<ValidationOutcome> {
    if records.is_empty() {
        return Err(TransformError::EmptyData);
    }
    let checker = Checker::new(options)?;
    debug!(records = records.len(), mode = %options.validation_mode, "validation started");

    let mut valid = Vec::new();
    let mut error_records = Vec::new();
    let mut errors = Vec::new();

    for (idx, record) in records.iter().enumerate() {
        let issues = checker.check(idx, record);
        if issues.is_empty() {
            valid.push(record.clone());
            continue;
        }
        if options.validation_mode == ValidationMode::Strict {
            return Err(TransformError::RecordFailed {
                index: idx,
                message: issues[0].message.clone(),
            });
        }
        warn!(record = idx, issues = issues.len(), "record failed validation");
        errors.extend(issues.iter().cloned());
        error_records.push(ErrorRecord {
            record_index: idx,
            record: record.clone(),
            errors: issues,
        });
    }

    let mut checks_performed = Vec::new();
    for (enabled, name) in [
        (options.check_null_values, "null_value_check"),
        (options.check_data_types, "data_type_check"),
        (options.check_ranges, "range_check"),
        (options.use_custom_rules, "custom_rules_check"),
        (options.check_duplicates, "duplicate_check"),
    ] {
        if enabled {
            checks_performed.push(name.to_string());
        }
    }
    if options.check_duplicates {
        errors.extend(check_duplicates(&records));
    }

    let mut error_counts: FieldMap<usize> = FieldMap::new();
    for issue in &errors {
        *error_counts.entry_or_insert_with(issue.kind.as_str(), || 0) += 1;
    }

    let total = records.len();
    let summary = ValidationSummary {
        total_records: total,
        valid_records: valid.len(),
        invalid_records: error_records.len(),
        validation_timestamp: timestamp(),
        validation_mode: options.validation_mode,
        validation_passed: errors.is_empty(),
    };
    let statistics = options.include_statistics.then(|| quality_statistics(&records));

    let clean_records = match options.validation_mode {
        ValidationMode::ReportOnly => records,
        _ if options.auto_clean => {
            let mut clean = valid;
            clean.extend(error_records.iter().filter_map(salvage));
            clean
        }
        _ => valid,
    };

    info!(
        records = total,
        valid = summary.valid_records,
        invalid = summary.invalid_records,
        clean = clean_records.len(),
        "validation finished"
    );
    Ok(ValidationOutcome {
        clean_records,
        error_records,
        report: Report::new(ValidationReport {
            summary,
            checks_performed,
            errors,
            error_counts,
            statistics,
        }),
    })
}

fn quality_statistics(records: &[Record]) -> QualityStatistics {
    let fields = field_names(records);
    let mut field_analysis = FieldMap::new();
    for field in &fields {
        let mut null_count = 0;
        let mut data_types: FieldMap<usize> = FieldMap::new();
        let mut unique = HashSet::new();
        for record in records {
            match record.get(field) {
                None | Some(Value::Null) => null_count += 1,
                Some(Value::Utf8(s)) if s.is_empty() => null_count += 1,
                Some(value) => {
                    let name = value.data_type().map_or("null", DataType::as_str);
                    *data_types.entry_or_insert_with(name, || 0) += 1;
                    unique.insert(value.to_string());
                }
            }
        }
        field_analysis.insert(
            field.as_str(),
            FieldQuality {
                total_count: records.len(),
                null_count,
                unique_count: unique.len(),
                data_types,
                null_percentage: percent(null_count, records.len()),
            },
        );
    }
    let data_quality_score = if fields.is_empty() {
        0.0
    } else {
        field_analysis
            .iter()
            .map(|(_, q): (&str, &FieldQuality)| 100.0 - q.null_percentage)
            .sum::<f64>()
            / fields.len() as f64
    };
    QualityStatistics {
        record_count: records.len(),
        field_analysis,
        data_quality_score,
    }
}

impl RenderText for ValidationReport {
    fn render_text(&self) -> String {
        let s = &self.summary;
        let mut t = TextReport::new("data validation");
        t.line(format!("Validation Timestamp: {}", s.validation_timestamp))
            .line(format!("Validation Mode: {}", s.validation_mode));

        t.section("SUMMARY")
            .item(1, "Total Records", s.total_records)
            .item(1, "Valid Records", s.valid_records)
            .item(1, "Invalid Records", s.invalid_records)
            .item(1, "Success Rate", fmt_pct(percent(s.valid_records, s.total_records)));

        t.line(String::new())
            .line(format!("CHECKS PERFORMED: {}", self.checks_performed.join(", ")));

        if !self.error_counts.is_empty() {
            t.section("VALIDATION ERRORS");
            for (kind, count) in self.error_counts.iter() {
                t.line(format!("  {kind}: {count} occurrences"));
            }
        }

        if let Some(stats) = &self.statistics {
            t.section("DATA QUALITY STATISTICS")
                .item(1, "Overall Quality Score", fmt_pct(stats.data_quality_score))
                .line("  Field Completeness:");
            for (field, q) in stats.field_analysis.iter() {
                t.line(format!("    {field}: {:.1}% complete", 100.0 - q.null_percentage));
            }
        }
        t.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CustomRule, ExpectedType, IssueKind, ValidateOptions, ValidationMode, validate_data,
    };
    use crate::config::options_from_json;
    use crate::error::TransformError;
    use crate::types::Value;
    use serde_json::json;

    fn people() -> serde_json::Value {
        json!([
            {"id": 1, "name": "Ana", "email": "ana@example.com", "age": 34},
            {"id": "2", "name": " ", "email": "bob@example", "age": 150},
            {"id": 3, "name": "Cy", "email": "cy@example.org", "age": "old"},
            {"id": 1, "name": "Ana", "email": "ana@example.com", "age": 34},
        ])
    }

    fn schema() -> ValidateOptions {
        ValidateOptions::default()
            .expect_type("id", ExpectedType::Integer)
            .expect_type("email", ExpectedType::Email)
            .range("age", Some(0.0), Some(120.0))
    }

    #[test]
    fn tolerant_mode_separates_failing_records() {
        let out = validate_data(people(), &schema()).unwrap();
        assert_eq!(out.report.summary.valid_records, 2);
        assert_eq!(out.report.summary.invalid_records, 2);
        assert!(!out.report.summary.validation_passed);
        assert_eq!(out.clean_records.len(), 2);

        let second = &out.error_records[0];
        assert_eq!(second.record_index, 1);
        let kinds: Vec<IssueKind> = second.errors.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![IssueKind::NullValue, IssueKind::DataType, IssueKind::RangeViolation]);
        assert_eq!(second.errors[2].message, "Field 'age' value 150.0 exceeds maximum 120.0");

        assert_eq!(out.error_records[1].errors[0].kind, IssueKind::RangeError);
        assert_eq!(out.report.error_counts.get("duplicate"), Some(&1));
    }

    #[test]
    fn strict_mode_aborts_on_first_failure() {
        let opts = ValidateOptions {
            validation_mode: ValidationMode::Strict,
            ..schema()
        };
        match validate_data(people(), &opts) {
            Err(TransformError::RecordFailed { index, message }) => {
                assert_eq!(index, 1);
                assert_eq!(message, "Null or empty value found in field 'name'");
            }
            other => panic!("expected strict failure, got {other:?}"),
        }
    }

    #[test]
    fn report_only_keeps_every_record() {
        let opts = ValidateOptions {
            validation_mode: ValidationMode::ReportOnly,
            ..schema()
        };
        let out = validate_data(people(), &opts).unwrap();
        assert_eq!(out.clean_records.len(), 4);
        assert_eq!(out.error_records.len(), 2);
    }

    #[test]
    fn auto_clean_salvages_casts_and_nulls() {
        let opts = ValidateOptions {
            auto_clean: true,
            check_duplicates: false,
            ..ValidateOptions::default().expect_type("qty", ExpectedType::Float)
        };
        let out = validate_data(
            json!([{"qty": "2.5", "note": ""}, {"qty": "many"}, {"qty": 1}]),
            &opts,
        )
        .unwrap();
        // "2.5" is a valid float string, so only the empty note fails on record 0.
        assert_eq!(out.error_records.len(), 2);
        assert_eq!(out.clean_records.len(), 2);
        assert!(out.clean_records[1].get("note").is_none());
    }

    #[test]
    fn custom_rules_match_from_the_start() {
        let opts = ValidateOptions {
            check_null_values: false,
            ..ValidateOptions::default().rule(
                "code_format",
                CustomRule {
                    field: Some("code".into()),
                    pattern: Some(r"[A-Z]{2}\d".into()),
                    min_length: Some(3),
                    max_length: Some(4),
                },
            )
        };
        let out = validate_data(json!([{"code":"AB1"},{"code":"xAB1"},{"code":"AB12345"}]), &opts).unwrap();
        assert_eq!(out.error_records.len(), 2);
        assert_eq!(out.error_records[0].errors[0].rule_name.as_deref(), Some("code_format"));
        assert_eq!(out.error_records[1].errors[0].constraint.as_deref(), Some("max_length: 4"));
    }

    #[test]
    fn invalid_rule_pattern_fails_up_front() {
        let opts = ValidateOptions::default().rule(
            "broken",
            CustomRule { field: Some("a".into()), pattern: Some("(".into()), ..CustomRule::default() },
        );
        assert!(matches!(validate_data(json!([{"a":1}]), &opts), Err(TransformError::InvalidRegex { .. })));
    }

    #[test]
    fn types_and_dates() {
        let opts = ValidateOptions::default()
            .expect_type("when", ExpectedType::Date)
            .expect_type("site", ExpectedType::Url)
            .expect_type("flag", ExpectedType::Boolean)
            .expect_type("x", ExpectedType::parse("decimal"));
        let out = validate_data(
            json!([
                {"when":"2024-01-15T10:30:00Z","site":"https://example.com/a","flag":true,"x":"?"},
                {"when":"15/01/2024","site":"ftp://x","flag":"yes","x":"?"}
            ]),
            &opts,
        )
        .unwrap();
        assert_eq!(out.clean_records.len(), 1);
        assert_eq!(out.error_records[0].errors.len(), 3);
    }

    #[test]
    fn statistics_and_text() {
        let out = validate_data(json!([{"a":1,"b":""},{"a":1,"b":"x"}]), &ValidateOptions::default()).unwrap();
        let stats = out.report.statistics.as_ref().unwrap();
        assert_eq!(stats.field_analysis.get("b").unwrap().null_count, 1);
        assert_eq!(stats.data_quality_score, 75.0);
        let text = out.report.text();
        assert!(text.starts_with("=== DATA VALIDATION REPORT ==="));
        assert!(text.contains("CHECKS PERFORMED: null_value_check, data_type_check, duplicate_check"));
        assert!(text.contains("    b: 50.0% complete"));
    }

    #[test]
    fn options_from_json_schema() {
        let opts: ValidateOptions = options_from_json(
            r#"{"validation_mode":"report_only","type_schema":{"age":"integer","x":"weird"}}"#,
        )
        .unwrap();
        assert_eq!(opts.validation_mode, ValidationMode::ReportOnly);
        assert_eq!(opts.type_schema.get("x"), Some(&ExpectedType::Unknown("weird".into())));
        assert_eq!(Value::from("x").as_str(), Some("x"));
    }
}
