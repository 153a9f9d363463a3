use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::operators::{Comparison, Operator};
use super::rules::{Condition, Logic, Rule, RuleSet};
use crate::config::strategy_enum;
use crate::error::{TransformError, TransformResult};
use crate::ingestion::{RecordInput, parse_records};
use crate::processing::Operation;
use crate::processing::report::{FieldMap, RenderText, Report, TextReport, timestamp};
use crate::types::{Record, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionStrategy {
    FirstMatch,
    AllMatches,
    PriorityBased,
    ScoreBased,
}

strategy_enum!(SelectionStrategy, "route selection", {
    FirstMatch => "first_match",
    AllMatches => "all_matches",
    PriorityBased => "priority_based",
    ScoreBased => "score_based",
});

/// Configuration for a [`Router`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterOptions {
    pub evaluation_strategy: SelectionStrategy,
    /// Cap on routes returned by the multi-match strategies. `0` disables the cap.
    pub max_matches: usize,
    pub default_route: String,
    pub fail_on_no_match: bool,
    pub null_safe_comparison: bool,
    pub strict_typing: bool,
    pub case_sensitive: bool,
    pub include_metadata: bool,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            evaluation_strategy: SelectionStrategy::FirstMatch,
            max_matches: 10,
            default_route: "default".to_string(),
            fail_on_no_match: false,
            null_safe_comparison: true,
            strict_typing: false,
            case_sensitive: true,
            include_metadata: false,
        }
    }
}

impl RouterOptions {
    pub fn with_strategy(strategy: SelectionStrategy) -> Self {
        Self {
            evaluation_strategy: strategy,
            ..Self::default()
        }
    }
}

/// Outcome of one rule against one record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleResult {
    pub rule_name: String,
    pub matched: bool,
    pub conditions_matched: usize,
    pub conditions_total: usize,
    pub priority: f64,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteMetadata {
    pub rule_name: Option<String>,
    pub strategy: SelectionStrategy,
    pub evaluated_at: String,
}

/// A selected route, or the default route when `route_matched` is false.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub route_name: String,
    pub route_matched: bool,
    pub original_data: Record,
    pub conditions_matched: usize,
    pub conditions_total: usize,
    pub priority: f64,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RouteMetadata>,
}

impl Route {
    pub fn to_record(&self) -> Record {
        let mut record = Record::from([
            ("route_name", Value::from(self.route_name.as_str())),
            ("route_matched", Value::Bool(self.route_matched)),
            ("original_data", Value::Map(self.original_data.clone())),
            ("conditions_matched", Value::from(self.conditions_matched)),
            ("conditions_total", Value::from(self.conditions_total)),
            ("priority", Value::Float64(self.priority)),
            ("score", Value::Float64(self.score)),
        ]);
        if let Some(meta) = &self.metadata {
            let rule_name = meta.rule_name.as_deref().map_or(Value::Null, Value::from);
            record.insert(
                "metadata",
                Record::from([
                    ("rule_name", rule_name),
                    ("strategy", Value::from(meta.strategy.as_str())),
                    ("evaluated_at", Value::from(meta.evaluated_at.as_str())),
                ]),
            );
        }
        record
    }
}

/// How conditions compare values. Shared by the router and single-condition partitioning.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Evaluator {
    pub comparison: Comparison,
    pub null_safe: bool,
    pub strict_typing: bool,
}

impl Evaluator {
    pub fn holds(&self, condition: &Condition, pattern: Option<&Regex>, record: &Record) -> bool {
        let null = Value::Null;
        let actual = record.get_path(&condition.field).unwrap_or(&null);
        let op = condition.operator;

        if self.null_safe {
            if op.is_unary() {
                return self.comparison.apply(op, actual, &condition.value, None);
            }
            if actual.is_null() {
                return false;
            }
        }

        let coerced;
        let actual = match op.coercion_target(&condition.value) {
            Some(target) if self.strict_typing && !actual.is_null() => match actual.coerce_to(target) {
                Some(value) => {
                    coerced = value;
                    &coerced
                }
                None => return false,
            },
            _ => actual,
        };
        self.comparison.apply(op, actual, &condition.value, pattern)
    }
}

/// Compiles the pattern of a `regex` condition.
pub(crate) fn compile_pattern(condition: &Condition, case_sensitive: bool) -> TransformResult<Option<Regex>> {
    if condition.operator != Operator::Regex {
        return Ok(None);
    }
    let pattern = condition.value.as_str().unwrap_or_default();
    RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .build()
        .map(Some)
        .map_err(|e| TransformError::invalid_rule(format!("invalid regex '{pattern}' on '{}': {e}", condition.field)))
}

struct CompiledRule {
    rule: Rule,
    patterns: Vec<Option<Regex>>,
}

/// Evaluates a [`RuleSet`] against records and selects routes.
pub struct Router {
    rules: Vec<CompiledRule>,
    options: RouterOptions,
    evaluator: Evaluator,
}

impl Router {
    pub fn new(rules: RuleSet, options: RouterOptions) -> TransformResult<Self> {
        let rules = rules
            .rules()
            .iter()
            .map(|rule| {
                let patterns = rule
                    .conditions
                    .iter()
                    .map(|c| compile_pattern(c, options.case_sensitive))
                    .collect::<TransformResult<Vec<_>>>()?;
                Ok(CompiledRule {
                    rule: rule.clone(),
                    patterns,
                })
            })
            .collect::<TransformResult<Vec<_>>>()?;
        let evaluator = Evaluator {
            comparison: Comparison {
                case_sensitive: options.case_sensitive,
            },
            null_safe: options.null_safe_comparison,
            strict_typing: options.strict_typing,
        };
        Ok(Self {
            rules,
            options,
            evaluator,
        })
    }

    /// Parses rule-set JSON and builds a router from it.
    pub fn from_json(rules: &str, options: RouterOptions) -> TransformResult<Self> {
        Self::new(RuleSet::from_json(rules)?, options)
    }

    pub fn options(&self) -> &RouterOptions {
        &self.options
    }

    /// Evaluates every rule in declaration order.
    pub fn evaluate(&self, record: &Record) -> Vec<RuleResult> {
        self.rules
            .iter()
            .map(|compiled| {
                let rule = &compiled.rule;
                let conditions_matched = rule
                    .conditions
                    .iter()
                    .zip(&compiled.patterns)
                    .filter(|(c, p)| self.evaluator.holds(c, p.as_ref(), record))
                    .count();
                let conditions_total = rule.conditions.len();
                let matched = match rule.logic {
                    Logic::And => conditions_matched == conditions_total,
                    Logic::Or => conditions_matched > 0,
                };
                RuleResult {
                    rule_name: rule.name.clone(),
                    matched,
                    conditions_matched,
                    conditions_total,
                    priority: rule.priority,
                    score: rule.score,
                }
            })
            .collect()
    }

    /// Routes one record: the selected matches, or a single default route.
    ///
    /// Fails with [`TransformError::NoRouteMatched`] when nothing matched and
    /// `fail_on_no_match` is set.
    pub fn route_record(&self, record: &Record) -> TransformResult<Vec<Route>> {
        let results = self.evaluate(record);
        let mut matches: Vec<&RuleResult> = results.iter().filter(|r| r.matched).collect();
        let strategy = self.options.evaluation_strategy;
        match strategy {
            SelectionStrategy::FirstMatch => matches.truncate(1),
            SelectionStrategy::AllMatches => {}
            SelectionStrategy::PriorityBased => matches.sort_by(|a, b| b.priority.total_cmp(&a.priority)),
            SelectionStrategy::ScoreBased => matches.sort_by(|a, b| b.score.total_cmp(&a.score)),
        }
        if self.options.max_matches > 0 {
            matches.truncate(self.options.max_matches);
        }
        debug!(rules = results.len(), matched = matches.len(), %strategy, "record routed");

        let metadata = |rule_name: Option<&str>| {
            self.options.include_metadata.then(|| RouteMetadata {
                rule_name: rule_name.map(str::to_string),
                strategy,
                evaluated_at: timestamp(),
            })
        };

        if matches.is_empty() {
            if self.options.fail_on_no_match {
                return Err(TransformError::NoRouteMatched);
            }
            return Ok(vec![Route {
                route_name: self.options.default_route.clone(),
                route_matched: false,
                original_data: record.clone(),
                conditions_matched: 0,
                conditions_total: 0,
                priority: 0.0,
                score: 0.0,
                metadata: metadata(None),
            }]);
        }

        Ok(matches
            .into_iter()
            .map(|r| Route {
                route_name: r.rule_name.clone(),
                route_matched: true,
                original_data: record.clone(),
                conditions_matched: r.conditions_matched,
                conditions_total: r.conditions_total,
                priority: r.priority,
                score: r.score,
                metadata: metadata(Some(&r.rule_name)),
            })
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingSummary {
    pub total_records: usize,
    pub matched_records: usize,
    pub default_routes: usize,
    pub routes_emitted: usize,
    pub evaluation_strategy: SelectionStrategy,
    pub processing_timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingReport {
    pub summary: RoutingSummary,
    /// Emitted routes per route name, in first-seen order.
    pub route_counts: FieldMap<usize>,
}

#[derive(Debug, Clone)]
pub struct RoutingOutcome {
    /// Routes per input record, in input order.
    pub routes: Vec<Vec<Route>>,
    pub report: Report<RoutingReport>,
}

impl RoutingOutcome {
    /// Every route as a record, flattened in input order.
    pub fn records(&self) -> Vec<Record> {
        self.routes.iter().flatten().map(Route::to_record).collect()
    }
}

impl Operation for Router {
    type Outcome = RoutingOutcome;
    const NAME: &'static str = "conditional routing";

    fn apply(&self, records: Vec<Record>) -> TransformResult<RoutingOutcome> {
        if records.is_empty() {
            return Err(TransformError::EmptyData);
        }
        let routes = records
            .iter()
            .map(|record| self.route_record(record))
            .collect::<TransformResult<Vec<_>>>()?;

        let mut route_counts: FieldMap<usize> = FieldMap::new();
        let mut matched_records = 0;
        for record_routes in &routes {
            if record_routes.iter().any(|r| r.route_matched) {
                matched_records += 1;
            }
            for route in record_routes {
                *route_counts.entry_or_insert_with(&route.route_name, || 0) += 1;
            }
        }
        let summary = RoutingSummary {
            total_records: records.len(),
            matched_records,
            default_routes: records.len() - matched_records,
            routes_emitted: routes.iter().map(Vec::len).sum(),
            evaluation_strategy: self.options.evaluation_strategy,
            processing_timestamp: timestamp(),
        };
        info!(
            records = summary.total_records,
            matched = matched_records,
            routes = summary.routes_emitted,
            "routing finished"
        );
        Ok(RoutingOutcome {
            routes,
            report: Report::new(RoutingReport {
                summary,
                route_counts,
            }),
        })
    }
}

/// Routes every record of `input` through the rule-set JSON `rules`.
pub fn route_records(
    input: impl Into<RecordInput>,
    rules: &str,
    options: RouterOptions,
) -> TransformResult<RoutingOutcome> {
    let router = Router::from_json(rules, options)?;
    router.apply(parse_records(input)?)
}

impl RenderText for RoutingReport {
    fn render_text(&self) -> String {
        let s = &self.summary;
        let mut t = TextReport::new("conditional routing");
        t.line(format!("Processing Timestamp: {}", s.processing_timestamp))
            .line(format!("Evaluation Strategy: {}", s.evaluation_strategy));
        t.section("SUMMARY")
            .item(1, "Total Records", s.total_records)
            .item(1, "Matched Records", s.matched_records)
            .item(1, "Default Routes", s.default_routes)
            .item(1, "Routes Emitted", s.routes_emitted);
        if !self.route_counts.is_empty() {
            t.section("ROUTES");
            for (name, count) in self.route_counts.iter() {
                t.line(format!("  {name}: {count}"));
            }
        }
        t.finish()
    }
}
