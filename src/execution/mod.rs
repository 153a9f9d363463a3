//! Loop orchestration over for-each, range and condition-gated sources.
//!
//! The [`LoopEngine`] owns source construction, iteration limits, batching, error policy and
//! result aggregation. What happens to each item is supplied by the caller as a closure;
//! [`LoopEngine::execute_default`] uses a built-in processor that only annotates items.
//!
//! Every call to [`LoopEngine::execute`] starts from fresh state and returns it in a
//! [`LoopRun`]; nothing from a previous run leaks into the next one. Live counters for the run
//! in progress are available through [`LoopEngine::metrics`], and an [`LoopObserver`] can be
//! attached for events.
//!
//! ```rust
//! use rust_record_transforms::execution::{LoopEngine, LoopOptions};
//!
//! let engine = LoopEngine::new(LoopOptions {
//!     max_iterations: 5,
//!     ..LoopOptions::range(0, 1000, 1)
//! })
//! .unwrap();
//! let run = engine.execute_default(rust_record_transforms::types::Value::Null).unwrap();
//! assert_eq!(run.stats().total_iterations, 5);
//! ```

mod observer;

use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use tracing::{debug, info};

use crate::config::strategy_enum;
use crate::error::{TransformError, TransformResult};
use crate::expr::Expression;
use crate::processing::report::{RenderText, Report, TextReport, fmt_pct, percent, ratio, timestamp};
use crate::processing::stats::{ReduceOp, reduce};
use crate::types::{Record, Value};

pub use observer::{LoopEvent, LoopMetrics, LoopMetricsSnapshot, LoopObserver, TracingLoopObserver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopType {
    ForEach,
    While,
    Range,
    Until,
    Infinite,
}

strategy_enum!(LoopType, "loop type", {
    ForEach => "for_each",
    While => "while",
    Range => "range",
    Until => "until",
    Infinite => "infinite",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    AllResults,
    LastResult,
    Aggregated,
    Streaming,
}

strategy_enum!(OutputMode, "output mode", {
    AllResults => "all_results",
    LastResult => "last_result",
    Aggregated => "aggregated",
    Streaming => "streaming",
});

/// Configuration for a [`LoopEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopOptions {
    pub loop_type: LoopType,
    /// JSON text `{"condition": "<expression>"}`, consulted by `while` and `until` loops.
    pub loop_condition: Option<String>,
    pub range_start: i64,
    pub range_end: i64,
    pub range_step: i64,
    pub max_iterations: usize,
    /// Seconds to sleep after each item, or after each batch when batching.
    pub delay_between_iterations: f64,
    pub break_on_error: bool,
    pub collect_results: bool,
    pub output_mode: OutputMode,
    pub include_index: bool,
    pub parallel_execution: bool,
    pub batch_size: usize,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            loop_type: LoopType::ForEach,
            loop_condition: None,
            range_start: 0,
            range_end: 10,
            range_step: 1,
            max_iterations: 100,
            delay_between_iterations: 0.0,
            break_on_error: true,
            collect_results: true,
            output_mode: OutputMode::AllResults,
            include_index: false,
            parallel_execution: false,
            batch_size: 1,
        }
    }
}

impl LoopOptions {
    pub fn range(start: i64, end: i64, step: i64) -> Self {
        Self {
            loop_type: LoopType::Range,
            range_start: start,
            range_end: end,
            range_step: step,
            ..Self::default()
        }
    }

    /// A `while` or `until` loop gated by `condition`.
    pub fn conditional(loop_type: LoopType, condition: &str) -> Self {
        Self {
            loop_type,
            loop_condition: Some(serde_json::json!({ "condition": condition }).to_string()),
            ..Self::default()
        }
    }

    pub fn batched(mut self, batch_size: usize) -> Self {
        self.parallel_execution = true;
        self.batch_size = batch_size;
        self
    }

    /// Checks the options and returns the inter-iteration delay.
    fn validate(&self) -> TransformResult<Duration> {
        if self.loop_type == LoopType::Range {
            if self.range_start >= self.range_end {
                return Err(TransformError::invalid_config("range_start must be less than range_end"));
            }
            if self.range_step <= 0 {
                return Err(TransformError::invalid_config("range_step must be positive"));
            }
        }
        if self.max_iterations == 0 {
            return Err(TransformError::invalid_config("max_iterations must be positive"));
        }
        if self.batch_size == 0 {
            return Err(TransformError::invalid_config("batch_size must be positive"));
        }
        Duration::try_from_secs_f64(self.delay_between_iterations).map_err(|e| {
            TransformError::invalid_config(format!(
                "delay_between_iterations {} is not a usable delay: {e}",
                self.delay_between_iterations
            ))
        })
    }
}

fn parse_condition(text: Option<&str>) -> TransformResult<Option<Expression>> {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    let json: Json = serde_json::from_str(text)
        .map_err(|e| TransformError::invalid_config(format!("loop_condition is not valid JSON: {e}")))?;
    let Json::Object(obj) = json else {
        return Err(TransformError::invalid_config("loop_condition must be a JSON object"));
    };
    match obj.get("condition") {
        None | Some(Json::Null) => Ok(None),
        Some(Json::String(source)) => Expression::parse(source)
            .map(Some)
            .map_err(|e| TransformError::invalid_config(format!("loop condition '{source}': {e}"))),
        Some(_) => Err(TransformError::invalid_config("loop_condition 'condition' must be a string")),
    }
}

/// Variables visible to a loop condition.
fn condition_context(item: &Value, index: usize) -> Record {
    let mut context = Record::from([
        ("item", item.clone()),
        ("index", Value::from(index)),
        ("current_item", item.clone()),
        ("current_index", Value::from(index)),
        ("iteration", Value::from(index)),
    ]);
    if let Value::Map(fields) = item {
        for (key, value) in fields.iter() {
            context.insert(key, value.clone());
        }
    }
    context
}

/// One failed iteration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationError {
    pub index: usize,
    pub item: String,
    pub error: String,
    pub timestamp: String,
}

/// The options a run was executed with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoopConfig {
    pub loop_type: LoopType,
    pub max_iterations: usize,
    pub delay_between_iterations: f64,
    pub break_on_error: bool,
    pub collect_results: bool,
    pub output_mode: OutputMode,
    pub parallel_execution: bool,
    pub batch_size: usize,
}

impl From<&LoopOptions> for LoopConfig {
    fn from(o: &LoopOptions) -> Self {
        Self {
            loop_type: o.loop_type,
            max_iterations: o.max_iterations,
            delay_between_iterations: o.delay_between_iterations,
            break_on_error: o.break_on_error,
            collect_results: o.collect_results,
            output_mode: o.output_mode,
            parallel_execution: o.parallel_execution,
            batch_size: o.batch_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoopStats {
    pub total_iterations: usize,
    pub successful_iterations: usize,
    pub failed_iterations: usize,
    /// Successful over total iterations, in `0.0..=1.0`.
    pub success_rate: f64,
    pub start_time: String,
    pub end_time: String,
    pub duration_seconds: f64,
    pub iterations_per_second: f64,
    pub errors: Vec<IterationError>,
    #[serde(flatten)]
    pub config: LoopConfig,
}

/// The last item handed to the processor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentItem {
    pub item: Value,
    pub index: usize,
}

/// Results shaped by [`OutputMode`].
#[derive(Debug)]
pub enum LoopOutput {
    All(Vec<Value>),
    Last(Value),
    Aggregated(Record),
    /// Single pass over the collected results.
    Streaming(std::vec::IntoIter<Value>),
    /// No iteration produced a result.
    NoResults,
}

impl LoopOutput {
    pub fn into_value(self) -> Value {
        match self {
            LoopOutput::All(items) => Value::List(items),
            LoopOutput::Last(item) => item,
            LoopOutput::Aggregated(record) => Value::Map(record),
            LoopOutput::Streaming(items) => Value::List(items.collect()),
            LoopOutput::NoResults => Value::Map(Record::from([
                ("message", Value::from("No results")),
                ("count", Value::Int64(0)),
            ])),
        }
    }
}

#[derive(Debug)]
pub struct LoopRun {
    pub output: LoopOutput,
    pub report: Report<LoopStats>,
    pub current: Option<CurrentItem>,
}

impl LoopRun {
    pub fn stats(&self) -> &LoopStats {
        self.report.data()
    }
}

/// Runs loops configured by [`LoopOptions`].
pub struct LoopEngine {
    options: LoopOptions,
    condition: Option<Expression>,
    delay: Duration,
    observer: Option<Arc<dyn LoopObserver>>,
    metrics: Arc<LoopMetrics>,
}

impl LoopEngine {
    /// Validates `options` and parses the loop condition.
    pub fn new(options: LoopOptions) -> TransformResult<Self> {
        let delay = options.validate()?;
        let condition = parse_condition(options.loop_condition.as_deref())?;
        Ok(Self {
            options,
            condition,
            delay,
            observer: None,
            metrics: Arc::new(LoopMetrics::new()),
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn LoopObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn options(&self) -> &LoopOptions {
        &self.options
    }

    /// Live counters of the current or latest run.
    pub fn metrics(&self) -> Arc<LoopMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Runs the loop, handing every item and its index to `process`.
    ///
    /// A failing item aborts the run with [`TransformError::IterationFailed`] when
    /// `break_on_error` is set; otherwise it is logged in the stats and produces no result.
    pub fn execute<F, E>(&self, input: impl Into<Value>, mut process: F) -> TransformResult<LoopRun>
    where
        F: FnMut(&Value, usize) -> Result<Value, E>,
        E: fmt::Display,
    {
        let o = &self.options;
        let started = Instant::now();
        let start_time = timestamp();
        self.metrics.begin_run();
        self.emit(LoopEvent::RunStarted {
            loop_type: o.loop_type,
            max_iterations: o.max_iterations,
        });
        debug!(loop_type = %o.loop_type, max_iterations = o.max_iterations, "loop started");

        let batch_size = if o.parallel_execution { o.batch_size } else { 1 };
        let mut source = self.source(input.into()).peekable();
        let mut results = Vec::new();
        let mut errors = Vec::new();
        let mut successful = 0;
        let mut current = None;
        let mut index = 0;

        while index < o.max_iterations {
            let Some(first) = source.next() else { break };
            if !self.should_continue(&first, index) {
                self.emit(LoopEvent::ConditionStopped { index });
                break;
            }

            let size = batch_size.min(o.max_iterations - index);
            let mut batch = Vec::with_capacity(size);
            batch.push(first);
            batch.extend(source.by_ref().take(size - 1));
            self.metrics.on_batch(batch.len());
            if batch_size > 1 {
                self.emit(LoopEvent::BatchStarted {
                    start_index: index,
                    size: batch.len(),
                });
            }

            for item in batch {
                match process(&item, index) {
                    Ok(result) => {
                        successful += 1;
                        self.metrics.on_success();
                        self.emit(LoopEvent::IterationSucceeded { index });
                        if !o.collect_results {
                            results.clear();
                        }
                        results.push(result);
                    }
                    Err(e) => {
                        let error = e.to_string();
                        self.metrics.on_failure();
                        self.emit(LoopEvent::IterationFailed {
                            index,
                            error: error.clone(),
                        });
                        if o.break_on_error {
                            let elapsed = started.elapsed();
                            self.metrics.end_run(elapsed);
                            self.emit(LoopEvent::RunAborted { index, elapsed });
                            return Err(TransformError::IterationFailed { index, message: error });
                        }
                        errors.push(IterationError {
                            index,
                            item: item.to_string(),
                            error,
                            timestamp: timestamp(),
                        });
                    }
                }
                current = Some(CurrentItem { item, index });
                index += 1;
            }

            if !self.delay.is_zero() {
                std::thread::sleep(self.delay);
            }
        }
        if index >= o.max_iterations && source.peek().is_some() {
            self.emit(LoopEvent::MaxIterationsReached {
                max_iterations: o.max_iterations,
            });
        }

        let elapsed = started.elapsed();
        self.metrics.end_run(elapsed);
        let duration_seconds = elapsed.as_secs_f64();
        let stats = LoopStats {
            total_iterations: index,
            successful_iterations: successful,
            failed_iterations: errors.len(),
            success_rate: ratio(successful, index),
            start_time,
            end_time: timestamp(),
            duration_seconds,
            iterations_per_second: if duration_seconds > 0.0 {
                index as f64 / duration_seconds
            } else {
                0.0
            },
            errors,
            config: LoopConfig::from(o),
        };
        let output = self.shape(results, &stats);

        info!(
            iterations = stats.total_iterations,
            succeeded = stats.successful_iterations,
            failed = stats.failed_iterations,
            duration_seconds,
            "loop finished"
        );
        self.emit(LoopEvent::RunFinished {
            elapsed,
            metrics: self.metrics.snapshot(),
        });

        Ok(LoopRun {
            output,
            report: Report::new(stats),
            current,
        })
    }

    /// Runs the loop with the built-in processor.
    ///
    /// Mapping items gain `loop_index` and `processed_at` (and `index` with `include_index`);
    /// other items are wrapped as `{original_value, loop_index, processed_at}`.
    pub fn execute_default(&self, input: impl Into<Value>) -> TransformResult<LoopRun> {
        let include_index = self.options.include_index;
        self.execute(input, |item, index| {
            Ok::<_, Infallible>(annotate(item, index, include_index))
        })
    }

    fn source(&self, input: Value) -> Box<dyn Iterator<Item = Value>> {
        let o = &self.options;
        match o.loop_type {
            LoopType::ForEach => match input {
                Value::List(items) => Box::new(items.into_iter()),
                other => Box::new(std::iter::once(other)),
            },
            LoopType::Range => {
                let step = usize::try_from(o.range_step).unwrap_or(usize::MAX);
                Box::new((o.range_start..o.range_end).step_by(step).map(Value::Int64))
            }
            LoopType::While | LoopType::Until | LoopType::Infinite => {
                Box::new(std::iter::repeat(input).take(o.max_iterations))
            }
        }
    }

    /// Applies the `while`/`until` gate. Evaluation errors count as a false condition.
    fn should_continue(&self, item: &Value, index: usize) -> bool {
        let Some(condition) = &self.condition else {
            return true;
        };
        let holds = || match condition.evaluate_bool(&condition_context(item, index)) {
            Ok(holds) => holds,
            Err(e) => {
                debug!(index, condition = condition.source(), error = %e, "loop condition failed to evaluate");
                false
            }
        };
        match self.options.loop_type {
            LoopType::While => holds(),
            LoopType::Until => !holds(),
            LoopType::ForEach | LoopType::Range | LoopType::Infinite => true,
        }
    }

    fn shape(&self, mut results: Vec<Value>, stats: &LoopStats) -> LoopOutput {
        if results.is_empty() {
            return LoopOutput::NoResults;
        }
        match self.options.output_mode {
            OutputMode::AllResults => LoopOutput::All(results),
            OutputMode::LastResult => results.pop().map_or(LoopOutput::NoResults, LoopOutput::Last),
            OutputMode::Aggregated => LoopOutput::Aggregated(aggregate(&results, stats)),
            OutputMode::Streaming => LoopOutput::Streaming(results.into_iter()),
        }
    }

    fn emit(&self, event: LoopEvent) {
        if let Some(obs) = &self.observer {
            obs.on_event(&event);
        }
    }
}

fn annotate(item: &Value, index: usize, include_index: bool) -> Value {
    let mut record = match item {
        Value::Map(fields) => fields.clone(),
        other => Record::from([("original_value", other.clone())]),
    };
    record.insert("loop_index", index);
    record.insert("processed_at", timestamp());
    if include_index {
        record.insert("index", index);
    }
    Value::Map(record)
}

/// Summary record for [`OutputMode::Aggregated`].
///
/// Numeric statistics cover numeric results and the `value` field of mapping results.
fn aggregate(results: &[Value], stats: &LoopStats) -> Record {
    let numbers: Vec<f64> = results
        .iter()
        .filter_map(|result| match result {
            Value::Int64(_) | Value::Float64(_) => result.as_f64(),
            Value::Map(fields) => fields.get("value").and_then(Value::coerce_f64),
            _ => None,
        })
        .collect();

    let mut out = Record::from([
        ("total_items", Value::from(results.len())),
        ("first_item", results.first().cloned().unwrap_or(Value::Null)),
        ("last_item", results.last().cloned().unwrap_or(Value::Null)),
        ("successful_count", Value::from(stats.successful_iterations)),
        ("failed_count", Value::from(stats.failed_iterations)),
        ("aggregated_at", Value::from(timestamp())),
        ("count", Value::from(numbers.len())),
    ]);
    for (key, op) in [
        ("sum", ReduceOp::Sum),
        ("average", ReduceOp::Mean),
        ("min", ReduceOp::Min),
        ("max", ReduceOp::Max),
    ] {
        if let Some(n) = reduce(&numbers, op) {
            out.insert(key, n);
        }
    }
    out
}

impl RenderText for LoopStats {
    fn render_text(&self) -> String {
        let mut t = TextReport::new("loop execution");
        t.line(format!("Loop Type: {}", self.config.loop_type))
            .line(format!("Started: {}", self.start_time))
            .line(format!("Finished: {}", self.end_time));
        t.section("SUMMARY")
            .item(1, "Total Iterations", self.total_iterations)
            .item(1, "Successful", self.successful_iterations)
            .item(1, "Failed", self.failed_iterations)
            .item(
                1,
                "Success Rate",
                fmt_pct(percent(self.successful_iterations, self.total_iterations)),
            )
            .item(1, "Duration (s)", format!("{:.3}", self.duration_seconds));
        if !self.errors.is_empty() {
            t.section("ERRORS");
            for e in &self.errors {
                t.line(format!("  [{}] {}: {}", e.index, e.item, e.error));
            }
        }
        t.finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::{LoopEngine, LoopEvent, LoopObserver, LoopOptions, LoopOutput, LoopType, OutputMode};
    use crate::error::TransformError;
    use crate::types::{Record, Value};
    use serde_json::json;

    fn identity(item: &Value, _index: usize) -> Result<Value, String> {
        Ok(item.clone())
    }

    fn values(output: LoopOutput) -> Vec<Value> {
        match output.into_value() {
            Value::List(items) => items,
            other => panic!("expected a list, got {other:?}"),
        }
    }

    #[derive(Default)]
    struct CountingObserver {
        batches: AtomicUsize,
        max_reached: AtomicUsize,
        finished: AtomicUsize,
    }

    impl LoopObserver for CountingObserver {
        fn on_event(&self, event: &LoopEvent) {
            match event {
                LoopEvent::BatchStarted { .. } => {
                    self.batches.fetch_add(1, Ordering::SeqCst);
                }
                LoopEvent::MaxIterationsReached { .. } => {
                    self.max_reached.fetch_add(1, Ordering::SeqCst);
                }
                LoopEvent::RunFinished { .. } => {
                    self.finished.fetch_add(1, Ordering::SeqCst);
                }
                _ => {}
            }
        }
    }

    #[test]
    fn range_is_capped_by_max_iterations() {
        let observer = Arc::new(CountingObserver::default());
        let engine = LoopEngine::new(LoopOptions {
            max_iterations: 5,
            ..LoopOptions::range(0, 1000, 1)
        })
        .unwrap()
        .with_observer(observer.clone());

        let run = engine.execute(Value::Null, identity).unwrap();
        assert_eq!(run.stats().total_iterations, 5);
        assert_eq!(
            values(run.output),
            (0..5).map(Value::Int64).collect::<Vec<_>>()
        );
        assert_eq!(observer.max_reached.load(Ordering::SeqCst), 1);
        assert_eq!(observer.finished.load(Ordering::SeqCst), 1);
        assert_eq!(engine.metrics().snapshot().iterations, 5);
    }

    #[test]
    fn range_honors_step() {
        let engine = LoopEngine::new(LoopOptions::range(2, 10, 3)).unwrap();
        let run = engine.execute(Value::Null, identity).unwrap();
        assert_eq!(values(run.output), vec![Value::Int64(2), Value::Int64(5), Value::Int64(8)]);
    }

    #[test]
    fn for_each_wraps_scalars() {
        let engine = LoopEngine::new(LoopOptions::default()).unwrap();
        let run = engine.execute(Value::from("solo"), identity).unwrap();
        assert_eq!(values(run.output), vec![Value::from("solo")]);
        assert_eq!(run.current.unwrap().index, 0);
    }

    #[test]
    fn while_and_until_conditions() {
        let engine = LoopEngine::new(LoopOptions::conditional(LoopType::While, "index < 3")).unwrap();
        let run = engine.execute(json!({"n": 1}), identity).unwrap();
        assert_eq!(run.stats().total_iterations, 3);

        let engine = LoopEngine::new(LoopOptions::conditional(LoopType::Until, "iteration >= 2 or n > 5")).unwrap();
        assert_eq!(engine.execute(json!({"n": 1}), identity).unwrap().stats().total_iterations, 2);
        assert_eq!(engine.execute(json!({"n": 9}), identity).unwrap().stats().total_iterations, 0);

        let infinite = LoopEngine::new(LoopOptions {
            loop_type: LoopType::Infinite,
            max_iterations: 7,
            ..LoopOptions::default()
        })
        .unwrap();
        assert_eq!(infinite.execute(Value::Null, identity).unwrap().stats().total_iterations, 7);
    }

    #[test]
    fn errors_are_recorded_or_abort() {
        let odd_fails = |item: &Value, _: usize| match item {
            Value::Int64(n) if n % 2 == 1 => Err(format!("{n} is odd")),
            other => Ok(other.clone()),
        };

        let tolerant = LoopEngine::new(LoopOptions {
            break_on_error: false,
            ..LoopOptions::range(0, 5, 1)
        })
        .unwrap();
        let run = tolerant.execute(Value::Null, odd_fails).unwrap();
        let stats = run.stats();
        assert_eq!(stats.successful_iterations, 3);
        assert_eq!(stats.failed_iterations, 2);
        assert_eq!(stats.errors[0].index, 1);
        assert_eq!(stats.errors[0].error, "1 is odd");
        assert!((stats.success_rate - 0.6).abs() < 1e-9);
        assert_eq!(values(run.output).len(), 3);

        let strict = LoopEngine::new(LoopOptions::range(0, 5, 1)).unwrap();
        match strict.execute(Value::Null, odd_fails) {
            Err(TransformError::IterationFailed { index, message }) => {
                assert_eq!(index, 1);
                assert_eq!(message, "1 is odd");
            }
            other => panic!("expected IterationFailed, got {other:?}"),
        }
    }

    #[test]
    fn batches_never_exceed_max_iterations() {
        let observer = Arc::new(CountingObserver::default());
        let engine = LoopEngine::new(LoopOptions {
            max_iterations: 10,
            ..LoopOptions::range(0, 100, 1).batched(4)
        })
        .unwrap()
        .with_observer(observer.clone());

        let mut seen = Vec::new();
        let run = engine
            .execute(Value::Null, |item, index| {
                seen.push(index);
                identity(item, index)
            })
            .unwrap();
        assert_eq!(run.stats().total_iterations, 10);
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        assert_eq!(observer.batches.load(Ordering::SeqCst), 3);
        assert_eq!(engine.metrics().snapshot().batches, 3);
    }

    #[test]
    fn aggregated_output() {
        let engine = LoopEngine::new(LoopOptions {
            output_mode: OutputMode::Aggregated,
            ..LoopOptions::default()
        })
        .unwrap();
        let input = json!([{"value": 1}, {"value": "2.5"}, {"value": "x"}, 4]);
        let run = engine.execute(input, identity).unwrap();
        let Value::Map(agg) = run.output.into_value() else {
            panic!("expected a mapping");
        };
        assert_eq!(agg.get("total_items"), Some(&Value::Int64(4)));
        assert_eq!(agg.get("count"), Some(&Value::Int64(3)));
        assert_eq!(agg.get("sum"), Some(&Value::Float64(7.5)));
        assert_eq!(agg.get("min"), Some(&Value::Float64(1.0)));
        assert_eq!(agg.get("max"), Some(&Value::Float64(4.0)));
        assert_eq!(agg.get("last_item"), Some(&Value::Int64(4)));
    }

    #[test]
    fn output_modes_and_collection() {
        let last = LoopEngine::new(LoopOptions {
            output_mode: OutputMode::LastResult,
            ..LoopOptions::range(0, 3, 1)
        })
        .unwrap();
        assert!(matches!(last.execute(Value::Null, identity).unwrap().output, LoopOutput::Last(Value::Int64(2))));

        let uncollected = LoopEngine::new(LoopOptions {
            collect_results: false,
            ..LoopOptions::range(0, 3, 1)
        })
        .unwrap();
        assert_eq!(values(uncollected.execute(Value::Null, identity).unwrap().output), vec![Value::Int64(2)]);

        let streaming = LoopEngine::new(LoopOptions {
            output_mode: OutputMode::Streaming,
            ..LoopOptions::range(0, 3, 1)
        })
        .unwrap();
        let LoopOutput::Streaming(mut items) = streaming.execute(Value::Null, identity).unwrap().output else {
            panic!("expected streaming output");
        };
        assert_eq!(items.next(), Some(Value::Int64(0)));
        assert_eq!(items.count(), 2);

        let failing = LoopEngine::new(LoopOptions {
            break_on_error: false,
            ..LoopOptions::default()
        })
        .unwrap();
        let run = failing.execute(json!([1]), |_, _| Err("nope")).unwrap();
        let Value::Map(empty) = run.output.into_value() else {
            panic!("expected a mapping");
        };
        assert_eq!(empty.get("message"), Some(&Value::from("No results")));
    }

    #[test]
    fn default_processor_annotates_items() {
        let engine = LoopEngine::new(LoopOptions {
            include_index: true,
            ..LoopOptions::default()
        })
        .unwrap();
        let run = engine.execute_default(json!([{"id": 7}, "plain"])).unwrap();
        let items = values(run.output);
        let first = items[0].as_record().unwrap();
        assert_eq!(first.get("id"), Some(&Value::Int64(7)));
        assert_eq!(first.get("loop_index"), Some(&Value::Int64(0)));
        assert!(first.contains_key("processed_at"));
        let second: &Record = items[1].as_record().unwrap();
        assert_eq!(second.get("original_value"), Some(&Value::from("plain")));
        assert_eq!(second.get("index"), Some(&Value::Int64(1)));
        assert!(run.report.text().starts_with("=== LOOP EXECUTION REPORT ==="));
    }

    #[test]
    fn invalid_configuration_fails_eagerly() {
        let invalid = |options: LoopOptions| {
            matches!(LoopEngine::new(options), Err(TransformError::InvalidConfig { .. }))
        };
        assert!(invalid(LoopOptions::range(5, 5, 1)));
        assert!(invalid(LoopOptions::range(0, 5, 0)));
        assert!(invalid(LoopOptions {
            max_iterations: 0,
            ..LoopOptions::default()
        }));
        assert!(invalid(LoopOptions {
            batch_size: 0,
            ..LoopOptions::default()
        }));
        assert!(invalid(LoopOptions {
            loop_condition: Some("{not json".into()),
            ..LoopOptions::default()
        }));
        assert!(invalid(LoopOptions::conditional(LoopType::While, "index <")));
        for delay in [-1.0, f64::NAN, f64::INFINITY, 1e20] {
            assert!(invalid(LoopOptions {
                delay_between_iterations: delay,
                ..LoopOptions::default()
            }));
        }
    }
}
