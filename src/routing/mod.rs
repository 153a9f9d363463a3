//! Rule-based conditional routing.
//!
//! A [`RuleSet`] is validated in full when it is built; a [`Router`] then evaluates every rule
//! against each record and selects routes according to its [`SelectionStrategy`]. Records that
//! match nothing get a single default route unless `fail_on_no_match` is set.
//!
//! ```rust
//! use rust_record_transforms::routing::{Router, RouterOptions};
//! use serde_json::json;
//!
//! let rules = r#"[{"name": "big", "conditions": [{"field": "x", "operator": ">", "value": 10}]}]"#;
//! let router = Router::from_json(rules, RouterOptions::default()).unwrap();
//!
//! let record = rust_record_transforms::ingestion::parse_records(json!({"x": 15})).unwrap().remove(0);
//! let routes = router.route_record(&record).unwrap();
//! assert!(routes[0].route_matched);
//! assert_eq!(routes[0].route_name, "big");
//! ```
//!
//! Two smaller helpers live here as well: [`partition_records`] splits a record set on one
//! condition, and [`match_category`] maps a classifier's free-text answer onto a category list.

pub mod operators;
mod router;
pub mod rules;

use tracing::{debug, warn};

use crate::error::TransformResult;
use crate::ingestion::{RecordInput, parse_records};
use crate::types::Record;

pub use operators::{Comparison, Operator};
pub use router::{
    Route, RouteMetadata, Router, RouterOptions, RoutingOutcome, RoutingReport, RoutingSummary, RuleResult,
    SelectionStrategy, route_records,
};
pub use rules::{Condition, Logic, Rule, RuleSet};

use router::{Evaluator, compile_pattern};

/// Records split by one condition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    pub matched: Vec<Record>,
    pub unmatched: Vec<Record>,
    /// Records without the condition's field. They belong to neither side.
    pub skipped: Vec<Record>,
}

/// Splits `input` into records that satisfy `condition` and records that do not.
///
/// Comparisons are null-safe and strictly typed: the record's value is cast to the type of the
/// condition value before comparing, so `"15"` and `15` compare equal.
pub fn partition_records(input: impl Into<RecordInput>, condition: &Condition) -> TransformResult<Partition> {
    condition.validate("partition")?;
    let pattern = compile_pattern(condition, true)?;
    let evaluator = Evaluator {
        comparison: Comparison { case_sensitive: true },
        null_safe: true,
        strict_typing: true,
    };

    let mut partition = Partition::default();
    for (index, record) in parse_records(input)?.into_iter().enumerate() {
        if record.get_path(&condition.field).is_none() {
            warn!(index, field = %condition.field, "record has no such field, skipping");
            partition.skipped.push(record);
        } else if evaluator.holds(condition, pattern.as_ref(), &record) {
            partition.matched.push(record);
        } else {
            partition.unmatched.push(record);
        }
    }
    debug!(
        matched = partition.matched.len(),
        unmatched = partition.unmatched.len(),
        skipped = partition.skipped.len(),
        "records partitioned"
    );
    Ok(partition)
}

/// Finds the category named by a classifier `response`.
///
/// Surrounding whitespace and quotes are ignored and matching is case-insensitive. An exact
/// match wins; otherwise the first category contained in the response is taken.
pub fn match_category<S: AsRef<str>>(response: &str, categories: &[S]) -> Option<usize> {
    let answer = response
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_lowercase();
    if answer.is_empty() {
        return None;
    }
    let names: Vec<String> = categories
        .iter()
        .map(|c| c.as_ref().trim().to_lowercase())
        .collect();
    names
        .iter()
        .position(|name| !name.is_empty() && *name == answer)
        .or_else(|| {
            names
                .iter()
                .position(|name| !name.is_empty() && answer.contains(name.as_str()))
        })
}
