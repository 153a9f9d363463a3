//! `rust-record-transforms` is a library of record-set transformations for flow hosts: it cleans,
//! reshapes, routes and iterates over schema-less records.
//!
//! Records are ordered mappings of dynamically typed [`types::Value`]s. Every operation accepts
//! its input through [`ingestion::parse_records`], so a host may pass JSON text, NDJSON, a
//! `serde_json::Value`, a single [`types::Record`] or a list of them.
//!
//! ## What is in here
//!
//! **Record transformations** ([`processing`]), each returning the transformed records plus a
//! structured [`processing::Report`] with a pre-rendered text form:
//!
//! - [`processing::fill`]: null imputation (constants, statistics, forward/backward fill,
//!   interpolation, record removal)
//! - [`processing::dedup`]: duplicate detection over full records, key fields, subsets, or
//!   fuzzy string similarity
//! - [`processing::select`]: field selection by name, pattern or type, with renaming and
//!   nested-field flattening
//! - [`processing::mapping`]: value mapping (lookup tables, conditions, calculated expressions,
//!   regex rewrites)
//! - [`processing::replace`]: string replacement
//! - [`processing::validate`]: record validation and cleaning
//! - [`processing::split`]: partitioning into named splits
//!
//! **Routing** ([`routing`]): a validated rule set of `field operator value` conditions
//! evaluated per record, with first-match, all-matches, priority and score selection.
//!
//! **Loops** ([`execution`]): for-each, range and condition-gated loops with batching, error
//! policy, result aggregation and run statistics.
//!
//! ## Quick example
//!
//! ```rust
//! use rust_record_transforms::processing::fill::{fill_nulls, FillStrategy, NullFillOptions};
//! use rust_record_transforms::types::Value;
//!
//! let input = r#"[{"id":1,"age":null},{"id":2,"age":30},{"id":3,"age":null}]"#;
//! let out = fill_nulls(input, &NullFillOptions::with_strategy(FillStrategy::Mean)).unwrap();
//!
//! let ages: Vec<_> = out.records.iter().map(|r| r.get("age").cloned()).collect();
//! assert_eq!(ages, vec![Some(Value::Float64(30.0)), Some(Value::Int64(30)), Some(Value::Float64(30.0))]);
//! assert_eq!(out.report.summary.total_nulls_filled, 2);
//! println!("{}", out.report.text());
//! ```
//!
//! ## Modules
//!
//! - [`types`]: `Value`, `Record`, `DataType`
//! - [`ingestion`]: record-set parsing (JSON, NDJSON, CSV, host containers)
//! - [`processing`]: the transformation families and their shared report scaffolding
//! - [`routing`]: conditional routing
//! - [`execution`]: the loop engine and its observer hooks
//! - [`expr`]: the small expression language used by mappings, splits and loop conditions
//! - [`config`]: loading options from JSON
//! - [`error`]: [`TransformError`]

pub mod config;
pub mod error;
pub mod execution;
pub mod expr;
pub mod ingestion;
pub mod processing;
pub mod routing;
pub mod types;

pub use error::{TransformError, TransformResult};
