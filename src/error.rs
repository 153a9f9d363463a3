use thiserror::Error;

use crate::expr::ExprError;

/// Convenience result type for every transformation in this crate.
pub type TransformResult<T> = Result<T, TransformError>;

/// Error type returned by parsing, transformation, routing and loop operations.
///
/// Configuration problems (unknown strategies, invalid rules, missing field lists) are raised
/// eagerly before any record is touched. Per-record problems only surface here when the caller
/// asked for strict mode; otherwise they are collected into the operation report.
#[derive(Debug, Error)]
pub enum TransformError {
    /// No input was supplied at all (`null`, blank text).
    #[error("no data provided")]
    NoData,

    /// Input parsed fine but contained zero records.
    #[error("empty data")]
    EmptyData,

    /// Text input could not be parsed as JSON or NDJSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// Input has a shape the parser does not accept.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Options failed to deserialize or violate a constraint (e.g. `step <= 0`).
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A strategy/mode name is not recognized.
    #[error("unknown {kind} strategy '{name}'")]
    UnknownStrategy { kind: &'static str, name: String },

    /// A strategy was selected without the field list it requires.
    #[error("{field} must be specified for the '{strategy}' strategy")]
    MissingFieldConfig { strategy: String, field: &'static str },

    /// A routing rule set failed validation.
    #[error("invalid rule: {message}")]
    InvalidRule { message: String },

    /// A regular expression did not compile.
    #[error("invalid regex '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },

    /// A secondary accessor was called before the primary operation ran.
    #[error("{operation} has not been run yet")]
    NotYetRun { operation: &'static str },

    /// A record failed while `strict_mode` was enabled.
    #[error("record {index} failed: {message}")]
    RecordFailed { index: usize, message: String },

    /// A loop iteration failed while `break_on_error` was enabled.
    #[error("iteration {index} failed: {message}")]
    IterationFailed { index: usize, message: String },

    /// No routing rule matched and `fail_on_no_match` is set.
    #[error("no routing rule matched the record")]
    NoRouteMatched,

    /// Expression failed to parse or evaluate.
    #[error("expression error: {0}")]
    Expression(#[from] ExprError),

    /// CSV decoding error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Reading an input file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransformError {
    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_rule(message: impl Into<String>) -> Self {
        Self::InvalidRule {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_regex(pattern: &str, err: regex::Error) -> Self {
        Self::InvalidRegex {
            pattern: pattern.to_string(),
            message: err.to_string(),
        }
    }
}
