//! String replacement over record fields.
//!
//! Patterns are compiled once per run. A pattern that fails to compile is reported as an error
//! on every field it would have been applied to (or aborts the run in strict mode).

use regex::{NoExpand, Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::Operation;
use super::report::{FieldMap, RecordError, RenderText, Report, TextReport, fmt_pct, percent, ratio, timestamp};
use crate::config::strategy_enum;
use crate::error::{TransformError, TransformResult};
use crate::ingestion::{RecordInput, parse_records};
use crate::types::{Record, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplacementMode {
    Simple,
    Regex,
    Bulk,
    Template,
}

strategy_enum!(ReplacementMode, "replacement", {
    Simple => "simple",
    Regex => "regex",
    Bulk => "bulk",
    Template => "template",
});

/// One row of a bulk replacement table.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkEntry {
    pub find: String,
    pub replace: String,
    pub regex: bool,
}

/// Ordered `find -> replace` table.
///
/// In JSON each value is either the replacement string or `{"replace": "...", "regex": true}`;
/// values of any other shape are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkTable(pub Vec<BulkEntry>);

impl BulkTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn literal(mut self, find: impl Into<String>, replace: impl Into<String>) -> Self {
        self.0.push(BulkEntry {
            find: find.into(),
            replace: replace.into(),
            regex: false,
        });
        self
    }

    pub fn regex(mut self, find: impl Into<String>, replace: impl Into<String>) -> Self {
        self.0.push(BulkEntry {
            find: find.into(),
            replace: replace.into(),
            regex: true,
        });
        self
    }
}

impl Serialize for BulkTable {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let record: Record = self
            .0
            .iter()
            .map(|e| {
                let value = if e.regex {
                    Value::Map(Record::from([
                        ("replace", Value::from(e.replace.as_str())),
                        ("regex", Value::Bool(true)),
                    ]))
                } else {
                    Value::from(e.replace.as_str())
                };
                (e.find.clone(), value)
            })
            .collect();
        record.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BulkTable {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let record = Record::deserialize(deserializer)?;
        let entries = record
            .into_iter()
            .filter_map(|(find, value)| match value {
                Value::Utf8(replace) => Some(BulkEntry {
                    find,
                    replace,
                    regex: false,
                }),
                Value::Map(config) => Some(BulkEntry {
                    find,
                    replace: config
                        .get("replace")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    regex: config.get("regex").is_some_and(Value::truthy),
                }),
                _ => None,
            })
            .collect();
        Ok(BulkTable(entries))
    }
}

/// Configuration for [`replace_strings`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplaceOptions {
    pub replacement_mode: ReplacementMode,
    pub find_text: String,
    pub replace_text: String,
    pub regex_pattern: String,
    /// Supports `\1`, `\g<name>`, `$1` and `${name}` group references.
    pub regex_replacement: String,
    pub bulk_replacements: BulkTable,
    /// `{field}` placeholders; only the placeholder naming the current field is substituted.
    pub template_pattern: String,
    /// Empty means every field.
    pub target_fields: Vec<String>,
    pub case_sensitive: bool,
    pub whole_word_only: bool,
    /// Per-field cap for simple, regex and bulk-regex replacements; 0 means unlimited.
    pub max_replacements: usize,
    /// Copy each targeted string field to `{field}_backup` before replacing.
    pub create_backup_fields: bool,
    pub include_replacement_stats: bool,
    pub skip_non_string_fields: bool,
    pub strict_mode: bool,
}

impl Default for ReplaceOptions {
    fn default() -> Self {
        Self {
            replacement_mode: ReplacementMode::Simple,
            find_text: String::new(),
            replace_text: String::new(),
            regex_pattern: String::new(),
            regex_replacement: String::new(),
            bulk_replacements: BulkTable::default(),
            template_pattern: String::new(),
            target_fields: Vec::new(),
            case_sensitive: true,
            whole_word_only: false,
            max_replacements: 0,
            create_backup_fields: false,
            include_replacement_stats: true,
            skip_non_string_fields: true,
            strict_mode: false,
        }
    }
}

impl ReplaceOptions {
    pub fn simple(find: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            find_text: find.into(),
            replace_text: replace.into(),
            ..Self::default()
        }
    }

    pub fn regex(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            replacement_mode: ReplacementMode::Regex,
            regex_pattern: pattern.into(),
            regex_replacement: replacement.into(),
            ..Self::default()
        }
    }

    pub fn bulk(table: BulkTable) -> Self {
        Self {
            replacement_mode: ReplacementMode::Bulk,
            bulk_replacements: table,
            ..Self::default()
        }
    }
}

/// Rewrites `\1` and `\g<name>` group references to the `${1}` / `${name}` form.
pub(crate) fn expand_backrefs(replacement: &str) -> String {
    let mut out = String::with_capacity(replacement.len());
    let mut rest = replacement;
    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];
        let digits = tail.chars().take_while(char::is_ascii_digit).count();
        if digits > 0 {
            out.push_str(&format!("${{{}}}", &tail[..digits]));
            rest = &tail[digits..];
        } else if let Some(name) = tail
            .strip_prefix("g<")
            .and_then(|t| t.find('>').map(|end| &t[..end]))
        {
            out.push_str(&format!("${{{name}}}"));
            rest = &tail[name.len() + 3..];
        } else if let Some(after) = tail.strip_prefix('\\') {
            out.push('\\');
            rest = after;
        } else {
            out.push('\\');
            rest = tail;
        }
    }
    out.push_str(rest);
    out
}

fn build_regex(pattern: &str, case_sensitive: bool) -> Result<Regex, String> {
    RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|e| TransformError::invalid_regex(pattern, e).to_string())
}

/// One substitution performed in a field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplacementDetail {
    pub field: String,
    /// Byte offset of the match in the text it was found in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    pub original: String,
    pub replacement: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

enum Compiled {
    Simple(Option<Regex>),
    Regex(Result<Regex, String>, String),
    Bulk(Vec<(BulkEntry, Result<Regex, String>)>),
    Template(Regex),
}

struct Replacer<'a> {
    options: &'a ReplaceOptions,
    compiled: Compiled,
}

impl<'a> Replacer<'a> {
    fn new(options: &'a ReplaceOptions) -> TransformResult<Self> {
        let compiled = match options.replacement_mode {
            ReplacementMode::Simple => {
                if options.find_text.is_empty() {
                    Compiled::Simple(None)
                } else {
                    let mut pattern = regex::escape(&options.find_text);
                    if options.whole_word_only {
                        pattern = format!(r"\b{pattern}\b");
                    }
                    let re = RegexBuilder::new(&pattern)
                        .case_insensitive(!options.case_sensitive)
                        .build()
                        .map_err(|e| TransformError::invalid_regex(&pattern, e))?;
                    Compiled::Simple(Some(re))
                }
            }
            ReplacementMode::Regex => Compiled::Regex(
                build_regex(&options.regex_pattern, options.case_sensitive),
                expand_backrefs(&options.regex_replacement),
            ),
            ReplacementMode::Bulk => Compiled::Bulk(
                options
                    .bulk_replacements
                    .0
                    .iter()
                    .filter(|e| !e.find.is_empty())
                    .map(|e| {
                        let pattern = if e.regex {
                            e.find.clone()
                        } else {
                            regex::escape(&e.find)
                        };
                        let entry = BulkEntry {
                            replace: if e.regex {
                                expand_backrefs(&e.replace)
                            } else {
                                e.replace.clone()
                            },
                            ..e.clone()
                        };
                        (entry, build_regex(&pattern, options.case_sensitive))
                    })
                    .collect(),
            ),
            ReplacementMode::Template => Compiled::Template(
                Regex::new(r"\{(\w+)\}").map_err(|e| TransformError::invalid_regex(r"\{(\w+)\}", e))?,
            ),
        };
        Ok(Self { options, compiled })
    }

    fn limit(&self) -> usize {
        self.options.max_replacements
    }

    fn apply(&self, text: &str, field: &str) -> Result<(String, Vec<ReplacementDetail>), String> {
        let detail = |position: Option<usize>, original: &str, replacement: &str, kind, pattern: Option<&str>| {
            ReplacementDetail {
                field: field.to_string(),
                position,
                original: original.to_string(),
                replacement: replacement.to_string(),
                kind,
                pattern: pattern.map(str::to_string),
            }
        };

        match &self.compiled {
            Compiled::Simple(None) => Ok((text.to_string(), Vec::new())),
            Compiled::Simple(Some(re)) => {
                let kind = if self.options.whole_word_only && self.options.case_sensitive {
                    "simple_word_boundary"
                } else {
                    "simple"
                };
                let replacement = &self.options.replace_text;
                let details = capped(re.find_iter(text), self.limit())
                    .map(|m| detail(Some(m.start()), m.as_str(), replacement, kind, None))
                    .collect();
                let new_text = re.replacen(text, self.limit(), NoExpand(replacement)).into_owned();
                Ok((new_text, details))
            }
            Compiled::Regex(re, replacement) => {
                if self.options.regex_pattern.is_empty() {
                    return Ok((text.to_string(), Vec::new()));
                }
                let re = re.as_ref().map_err(Clone::clone)?;
                let pattern = self.options.regex_pattern.as_str();
                let details = capped(re.find_iter(text), self.limit())
                    .map(|m| detail(Some(m.start()), m.as_str(), replacement, "regex", Some(pattern)))
                    .collect();
                let new_text = re.replacen(text, self.limit(), replacement.as_str()).into_owned();
                Ok((new_text, details))
            }
            Compiled::Bulk(entries) => {
                let mut current = text.to_string();
                let mut details = Vec::new();
                for (entry, re) in entries {
                    let re = re.as_ref().map_err(Clone::clone)?;
                    if entry.regex {
                        let found: Vec<ReplacementDetail> = capped(re.find_iter(&current), self.limit())
                            .map(|m| {
                                detail(Some(m.start()), m.as_str(), &entry.replace, "bulk_regex", Some(entry.find.as_str()))
                            })
                            .collect();
                        let next = re
                            .replacen(&current, self.limit(), entry.replace.as_str())
                            .into_owned();
                        if next != current {
                            details.extend(found);
                            current = next;
                        }
                    } else {
                        let count = re.find_iter(&current).count();
                        let next = re
                            .replace_all(&current, NoExpand(&entry.replace))
                            .into_owned();
                        if next != current {
                            details.extend(
                                (0..count).map(|_| detail(None, &entry.find, &entry.replace, "bulk_simple", None)),
                            );
                            current = next;
                        }
                    }
                }
                Ok((current, details))
            }
            Compiled::Template(variable) => {
                let template = &self.options.template_pattern;
                if template.is_empty() {
                    return Ok((text.to_string(), Vec::new()));
                }
                let mut rendered = template.clone();
                let mut details = Vec::new();
                for caps in variable.captures_iter(template) {
                    if &caps[1] == field {
                        let placeholder = format!("{{{field}}}");
                        if rendered.contains(&placeholder) {
                            rendered = rendered.replace(&placeholder, text);
                            details.push(detail(None, &placeholder, text, "template", None));
                        }
                    }
                }
                if rendered == *template {
                    Ok((text.to_string(), Vec::new()))
                } else {
                    Ok((rendered, details))
                }
            }
        }
    }
}

fn capped<I: Iterator>(iter: I, limit: usize) -> impl Iterator<Item = I::Item> {
    iter.take(if limit == 0 { usize::MAX } else { limit })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplaceSummary {
    pub total_records: usize,
    pub processed_records: usize,
    pub total_replacements: usize,
    pub processing_timestamp: String,
    pub replacement_mode: ReplacementMode,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldReplacementStats {
    pub total_records: usize,
    pub records_modified: usize,
    pub total_replacements: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordReplacements {
    pub record_index: usize,
    pub replacements: Vec<ReplacementDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MostActiveField {
    pub field_name: String,
    pub total_replacements: usize,
    pub records_modified: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeEffectiveness {
    pub mode_used: ReplacementMode,
    pub total_operations: usize,
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplaceStatistics {
    pub replacement_rate: f64,
    pub average_replacements_per_record: f64,
    pub most_active_field: Option<MostActiveField>,
    pub replacement_efficiency: f64,
    pub mode_effectiveness: ModeEffectiveness,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplaceReport {
    pub summary: ReplaceSummary,
    pub field_statistics: FieldMap<FieldReplacementStats>,
    pub replacement_details: Vec<RecordReplacements>,
    pub errors: Vec<RecordError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<ReplaceStatistics>,
}

#[derive(Debug, Clone)]
pub struct ReplaceOutcome {
    pub records: Vec<Record>,
    pub report: Report<ReplaceReport>,
}

/// Applies the configured replacement to the string fields of `input`.
pub fn replace_strings(
    input: impl Into<RecordInput>,
    options: &ReplaceOptions,
) -> TransformResult<ReplaceOutcome> {
    replace_records(parse_records(input)?, options)
}

/// String replacement as an [`Operation`].
#[derive(Debug, Clone, Default)]
pub struct StringReplacer {
    options: ReplaceOptions,
}

impl StringReplacer {
    pub fn new(options: ReplaceOptions) -> Self {
        Self { options }
    }
}

impl Operation for StringReplacer {
    type Outcome = ReplaceOutcome;
    const NAME: &'static str = "string replacement";

    fn apply(&self, records: Vec<Record>) -> TransformResult<ReplaceOutcome> {
        replace_records(records, &self.options)
    }
}

fn replace_records(records: Vec<Record>, options: &ReplaceOptions) -> TransformResult<ReplaceOutcome> {
    if records.is_empty() {
        return Err(TransformError::EmptyData);
    }
    let replacer = Replacer::new(options)?;
    debug!(records = records.len(), mode = %options.replacement_mode, "string replacement started");

    let targeted = |field: &str| options.target_fields.is_empty() || options.target_fields.iter().any(|f| f == field);

    let mut out = Vec::with_capacity(records.len());
    let mut field_statistics: FieldMap<FieldReplacementStats> = FieldMap::new();
    let mut replacement_details = Vec::new();
    let mut errors = Vec::new();
    let mut total_replacements = 0;

    for (idx, record) in records.iter().enumerate() {
        let mut processed = record.clone();
        if options.create_backup_fields {
            for (field, value) in record.iter() {
                if let Value::Utf8(s) = value {
                    if targeted(field) {
                        processed.insert(format!("{field}_backup"), s.as_str());
                    }
                }
            }
        }

        let fields: Vec<String> = if options.target_fields.is_empty() {
            record.keys().map(str::to_string).collect()
        } else {
            options.target_fields.clone()
        };

        let mut record_details = Vec::new();
        for field in &fields {
            let Some(value) = record.get(field) else {
                continue;
            };
            let text = match value {
                Value::Utf8(s) => s.clone(),
                _ if options.skip_non_string_fields => continue,
                other => other.to_string(),
            };

            let stats = field_statistics.entry_or_insert_with(field, FieldReplacementStats::default);
            stats.total_records += 1;
            match replacer.apply(&text, field) {
                Ok((new_text, details)) => {
                    if new_text != text {
                        processed.insert(field.as_str(), new_text);
                    }
                    if !details.is_empty() {
                        stats.records_modified += 1;
                        stats.total_replacements += details.len();
                    }
                    total_replacements += details.len();
                    record_details.extend(details);
                }
                Err(message) => {
                    if options.strict_mode {
                        return Err(TransformError::RecordFailed {
                            index: idx,
                            message: format!("field '{field}': {message}"),
                        });
                    }
                    warn!(record = idx, field = field.as_str(), %message, "replacement failed");
                    errors.push(RecordError::new(idx, Some(field.as_str()), message));
                }
            }
        }

        if !record_details.is_empty() {
            replacement_details.push(RecordReplacements {
                record_index: idx,
                replacements: record_details,
            });
        }
        out.push(processed);
    }

    let total = records.len();
    let summary = ReplaceSummary {
        total_records: total,
        processed_records: total,
        total_replacements,
        processing_timestamp: timestamp(),
        replacement_mode: options.replacement_mode,
    };
    let statistics = options.include_replacement_stats.then(|| {
        statistics(&summary, &field_statistics, replacement_details.len(), &errors)
    });

    info!(records = total, replacements = total_replacements, errors = errors.len(), "string replacement finished");
    Ok(ReplaceOutcome {
        records: out,
        report: Report::new(ReplaceReport {
            summary,
            field_statistics,
            replacement_details,
            errors,
            statistics,
        }),
    })
}

fn statistics(
    summary: &ReplaceSummary,
    fields: &FieldMap<FieldReplacementStats>,
    records_with_replacements: usize,
    errors: &[RecordError],
) -> ReplaceStatistics {
    let mut most_active: Option<(&str, &FieldReplacementStats)> = None;
    for (field, stats) in fields.iter() {
        if most_active.is_none_or(|(_, best)| stats.total_replacements > best.total_replacements) {
            most_active = Some((field, stats));
        }
    }
    let mut failed: Vec<usize> = errors.iter().map(|e| e.record_index).collect();
    failed.dedup();

    ReplaceStatistics {
        replacement_rate: percent(summary.processed_records, summary.total_records),
        average_replacements_per_record: ratio(summary.total_replacements, summary.processed_records),
        most_active_field: most_active.map(|(field, stats)| MostActiveField {
            field_name: field.to_string(),
            total_replacements: stats.total_replacements,
            records_modified: stats.records_modified,
        }),
        replacement_efficiency: percent(records_with_replacements, summary.processed_records),
        mode_effectiveness: ModeEffectiveness {
            mode_used: summary.replacement_mode,
            total_operations: summary.total_replacements,
            success_rate: percent(summary.processed_records - failed.len(), summary.total_records),
        },
    }
}

impl RenderText for ReplaceReport {
    fn render_text(&self) -> String {
        let s = &self.summary;
        let mut t = TextReport::new("string replacement");
        t.line(format!("Processing Timestamp: {}", s.processing_timestamp))
            .line(format!("Replacement Mode: {}", s.replacement_mode));

        t.section("SUMMARY")
            .item(1, "Total Records", s.total_records)
            .item(1, "Processed Records", s.processed_records)
            .item(1, "Total Replacements", s.total_replacements);
        if s.processed_records > 0 {
            t.item(
                1,
                "Average Replacements per Record",
                format!("{:.2}", ratio(s.total_replacements, s.processed_records)),
            );
        }

        if !self.field_statistics.is_empty() {
            t.section("FIELD STATISTICS");
            for (field, stats) in self.field_statistics.iter() {
                t.line(format!("  {field}:"))
                    .item(2, "Records Modified", format!("{}/{}", stats.records_modified, stats.total_records))
                    .item(2, "Total Replacements", stats.total_replacements)
                    .item(
                        2,
                        "Modification Rate",
                        fmt_pct(percent(stats.records_modified, stats.total_records)),
                    );
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
                .item(1, "Replacement Rate", fmt_pct(stats.replacement_rate))
                .item(1, "Replacement Efficiency", fmt_pct(stats.replacement_efficiency));
            if let Some(active) = &stats.most_active_field {
                t.item(
                    1,
                    "Most Active Field",
                    format!("{} ({} replacements)", active.field_name, active.total_replacements),
                );
            }
        }
        t.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{BulkTable, ReplaceOptions, ReplacementMode, expand_backrefs, replace_strings};
    use crate::config::options_from_json;
    use crate::error::TransformError;
    use crate::types::Value;
    use serde_json::json;

    fn field(out: &super::ReplaceOutcome, idx: usize, name: &str) -> Value {
        out.records[idx].get(name).cloned().unwrap_or(Value::Null)
    }

    #[test]
    fn simple_replacement_with_cap_and_word_boundary() {
        let input = json!([{"t":"cat catalog cat"}]);
        let out = replace_strings(input.clone(), &ReplaceOptions::simple("cat", "dog")).unwrap();
        assert_eq!(field(&out, 0, "t"), Value::from("dog dogalog dog"));
        assert_eq!(out.report.summary.total_replacements, 3);

        let opts = ReplaceOptions {
            whole_word_only: true,
            ..ReplaceOptions::simple("cat", "dog")
        };
        let out = replace_strings(input.clone(), &opts).unwrap();
        assert_eq!(field(&out, 0, "t"), Value::from("dog catalog dog"));

        let opts = ReplaceOptions {
            max_replacements: 1,
            ..ReplaceOptions::simple("cat", "dog")
        };
        let out = replace_strings(input, &opts).unwrap();
        assert_eq!(field(&out, 0, "t"), Value::from("dog catalog cat"));
        assert_eq!(out.report.summary.total_replacements, 1);
    }

    #[test]
    fn case_insensitive_simple_treats_find_text_literally() {
        let opts = ReplaceOptions {
            case_sensitive: false,
            ..ReplaceOptions::simple("A.B", "$x")
        };
        let out = replace_strings(json!([{"t":"a.b aXb"}]), &opts).unwrap();
        assert_eq!(field(&out, 0, "t"), Value::from("$x aXb"));
    }

    #[test]
    fn regex_replacement_supports_both_group_syntaxes() {
        assert_eq!(expand_backrefs(r"\2-\1"), "${2}-${1}");
        assert_eq!(expand_backrefs(r"\g<year>!"), "${year}!");
        assert_eq!(expand_backrefs(r"a\\b"), r"a\b");

        let input = json!([{"d":"2024-05-17"},{"d":17}]);
        let out = replace_strings(input.clone(), &ReplaceOptions::regex(r"(\d+)-(\d+)-(\d+)", r"\3/\2/$1")).unwrap();
        assert_eq!(field(&out, 0, "d"), Value::from("17/05/2024"));
        assert_eq!(field(&out, 1, "d"), Value::Int64(17));

        let opts = ReplaceOptions {
            skip_non_string_fields: false,
            ..ReplaceOptions::regex(r"^1", "x")
        };
        let out = replace_strings(input, &opts).unwrap();
        assert_eq!(field(&out, 1, "d"), Value::from("x7"));
    }

    #[test]
    fn invalid_regex_is_a_field_error_unless_strict() {
        let input = json!([{"a":"x","b":"y"}]);
        let out = replace_strings(input.clone(), &ReplaceOptions::regex("(", "z")).unwrap();
        assert_eq!(out.report.errors.len(), 2);
        assert_eq!(field(&out, 0, "a"), Value::from("x"));

        let opts = ReplaceOptions {
            strict_mode: true,
            ..ReplaceOptions::regex("(", "z")
        };
        assert!(matches!(
            replace_strings(input, &opts),
            Err(TransformError::RecordFailed { index: 0, .. })
        ));
    }

    #[test]
    fn bulk_entries_apply_in_table_order() {
        let table = BulkTable::new().literal("a", "b").literal("b", "c").regex(r"(\d)", "<$1>");
        let out = replace_strings(json!([{"t":"ab1"}]), &ReplaceOptions::bulk(table)).unwrap();
        assert_eq!(field(&out, 0, "t"), Value::from("cc<1>"));
        assert_eq!(out.report.summary.total_replacements, 4);

        let opts: ReplaceOptions = options_from_json(
            r#"{"replacement_mode":"bulk","bulk_replacements":{"x":"y","\\s+":{"replace":" ","regex":true},"skip":5}}"#,
        )
        .unwrap();
        assert_eq!(opts.bulk_replacements.0.len(), 2);
        let out = replace_strings(json!([{"t":"x   x"}]), &opts).unwrap();
        assert_eq!(field(&out, 0, "t"), Value::from("y y"));
    }

    #[test]
    fn template_substitutes_only_the_current_field() {
        let opts = ReplaceOptions {
            replacement_mode: ReplacementMode::Template,
            template_pattern: "Hello {name} from {city}".into(),
            ..ReplaceOptions::default()
        };
        let out = replace_strings(json!([{"name":"Ann","city":"Oslo"}]), &opts).unwrap();
        assert_eq!(field(&out, 0, "name"), Value::from("Hello Ann from {city}"));
        assert_eq!(field(&out, 0, "city"), Value::from("Hello {name} from Oslo"));
    }

    #[test]
    fn backups_targets_and_report() {
        let opts = ReplaceOptions {
            target_fields: vec!["a".into()],
            create_backup_fields: true,
            ..ReplaceOptions::simple("x", "y")
        };
        let out = replace_strings(json!([{"a":"xx","b":"xx"},{"a":"z"}]), &opts).unwrap();
        assert_eq!(field(&out, 0, "a"), Value::from("yy"));
        assert_eq!(field(&out, 0, "b"), Value::from("xx"));
        assert_eq!(field(&out, 0, "a_backup"), Value::from("xx"));
        assert_eq!(out.records[0].get("b_backup"), None);

        let stats = out.report.statistics.as_ref().unwrap();
        assert_eq!(stats.replacement_efficiency, 50.0);
        assert_eq!(stats.most_active_field.as_ref().unwrap().field_name, "a");
        let text = out.report.text();
        assert!(text.starts_with("=== STRING REPLACEMENT REPORT ==="));
        assert!(text.contains("Records Modified: 1/2"));
    }
}
