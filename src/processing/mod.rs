//! Record-set transformations.
//!
//! Each family is a pure function from parsed records plus options to an outcome struct that
//! carries every output of the run (transformed records, report, side lists):
//!
//! - [`fill`]: null imputation
//! - [`dedup`]: duplicate detection and keep policies
//! - [`select`]: field selection, flattening and renaming
//! - [`mapping`]: value mapping
//! - [`replace`]: string replacement
//! - [`validate`]: record validation and cleaning
//! - [`split`]: partitioning into named splits
//!
//! Hosts that need the "run once, read outputs later" shape wrap an engine in a [`Component`],
//! whose accessors fail with [`TransformError::NotYetRun`] until the first successful run.
//!
//! ## Example: fill then dedup
//!
//! ```rust
//! use rust_record_transforms::processing::dedup::{deduplicate, DedupOptions};
//! use rust_record_transforms::processing::fill::{fill_nulls, FillStrategy, NullFillOptions};
//! use serde_json::json;
//!
//! let input = json!([
//!     {"id": 1, "city": "Oslo"},
//!     {"id": 1, "city": null},
//!     {"id": 2, "city": "Rome"},
//! ]);
//! let filled = fill_nulls(input, &NullFillOptions::with_strategy(FillStrategy::ForwardFill)).unwrap();
//! assert_eq!(filled.report.summary.total_nulls_filled, 1);
//!
//! let deduped = deduplicate(filled.records, &DedupOptions::default()).unwrap();
//! assert_eq!(deduped.records.len(), 2);
//! ```

pub mod dedup;
pub mod fill;
pub mod mapping;
pub mod nulls;
pub mod replace;
pub mod report;
pub mod select;
pub mod split;
pub mod stats;
pub mod validate;

use crate::error::{TransformError, TransformResult};
use crate::ingestion::{RecordInput, parse_records};
use crate::types::Record;

pub use nulls::{NullPolicy, is_null};
pub use report::{FieldMap, RecordError, RenderText, Report};

/// A configured transformation over a parsed record set.
pub trait Operation {
    /// Everything one run produces.
    type Outcome;

    /// Name used in "not yet run" errors.
    const NAME: &'static str;

    fn apply(&self, records: Vec<Record>) -> TransformResult<Self::Outcome>;

    /// Parses `input` and applies the operation.
    fn run(&self, input: impl Into<RecordInput>) -> TransformResult<Self::Outcome>
    where
        Self: Sized,
    {
        self.apply(parse_records(input)?)
    }
}

/// Holds an [`Operation`] and the outcome of its latest successful run.
pub struct Component<O: Operation> {
    operation: O,
    outcome: Option<O::Outcome>,
}

impl<O: Operation> Component<O> {
    pub fn new(operation: O) -> Self {
        Self {
            operation,
            outcome: None,
        }
    }

    pub fn operation(&self) -> &O {
        &self.operation
    }

    /// Runs the operation, replacing any previous outcome. A failed run clears it.
    pub fn run(&mut self, input: impl Into<RecordInput>) -> TransformResult<&O::Outcome> {
        self.outcome = None;
        let outcome = self.operation.run(input)?;
        Ok(self.outcome.insert(outcome))
    }

    /// Outcome of the latest run.
    pub fn outcome(&self) -> TransformResult<&O::Outcome> {
        self.outcome
            .as_ref()
            .ok_or(TransformError::NotYetRun { operation: O::NAME })
    }

    /// Takes the outcome out, leaving the component in the not-yet-run state.
    pub fn take_outcome(&mut self) -> TransformResult<O::Outcome> {
        self.outcome
            .take()
            .ok_or(TransformError::NotYetRun { operation: O::NAME })
    }
}
