use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::LoopType;

/// Events emitted by the [`super::LoopEngine`] while it runs.
#[derive(Debug, Clone)]
pub enum LoopEvent {
    RunStarted { loop_type: LoopType, max_iterations: usize },
    BatchStarted { start_index: usize, size: usize },
    IterationSucceeded { index: usize },
    IterationFailed { index: usize, error: String },
    /// A `while`/`until` condition ended the loop before `index` was processed.
    ConditionStopped { index: usize },
    MaxIterationsReached { max_iterations: usize },
    RunFinished { elapsed: Duration, metrics: LoopMetricsSnapshot },
    RunAborted { index: usize, elapsed: Duration },
}

/// Observer hook for loop events.
pub trait LoopObserver: Send + Sync {
    fn on_event(&self, event: &LoopEvent);
}

/// Forwards loop events to `tracing`.
#[derive(Debug, Default)]
pub struct TracingLoopObserver;

impl LoopObserver for TracingLoopObserver {
    fn on_event(&self, event: &LoopEvent) {
        match event {
            LoopEvent::RunStarted {
                loop_type,
                max_iterations,
            } => info!(%loop_type, max_iterations, "loop started"),
            LoopEvent::BatchStarted { start_index, size } => debug!(start_index, size, "batch started"),
            LoopEvent::IterationSucceeded { index } => debug!(index, "iteration succeeded"),
            LoopEvent::IterationFailed { index, error } => warn!(index, %error, "iteration failed"),
            LoopEvent::ConditionStopped { index } => debug!(index, "loop condition stopped the loop"),
            LoopEvent::MaxIterationsReached { max_iterations } => {
                warn!(max_iterations, "maximum iterations reached")
            }
            LoopEvent::RunFinished { elapsed, metrics } => info!(?elapsed, %metrics, "loop finished"),
            LoopEvent::RunAborted { index, elapsed } => warn!(index, ?elapsed, "loop aborted"),
        }
    }
}

/// Live counters for the latest loop run.
///
/// The engine resets them when a run starts; callers can snapshot them at any time, including
/// from another thread while a run is in progress.
#[derive(Debug, Default)]
pub struct LoopMetrics {
    run_id: AtomicU64,
    elapsed_ns: AtomicU64,
    iterations: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    batches: AtomicU64,
}

impl LoopMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn begin_run(&self) {
        self.run_id.fetch_add(1, Ordering::SeqCst);
        self.elapsed_ns.store(0, Ordering::SeqCst);
        self.iterations.store(0, Ordering::SeqCst);
        self.succeeded.store(0, Ordering::SeqCst);
        self.failed.store(0, Ordering::SeqCst);
        self.batches.store(0, Ordering::SeqCst);
    }

    pub(crate) fn end_run(&self, elapsed: Duration) {
        self.elapsed_ns
            .store(elapsed.as_nanos().min(u64::MAX as u128) as u64, Ordering::SeqCst);
    }

    pub(crate) fn on_batch(&self, size: usize) {
        self.batches.fetch_add(1, Ordering::SeqCst);
        self.iterations.fetch_add(size as u64, Ordering::SeqCst);
    }

    pub(crate) fn on_success(&self) {
        self.succeeded.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn on_failure(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> LoopMetricsSnapshot {
        let elapsed_ns = self.elapsed_ns.load(Ordering::SeqCst);
        LoopMetricsSnapshot {
            run_id: self.run_id.load(Ordering::SeqCst),
            elapsed: (elapsed_ns > 0).then(|| Duration::from_nanos(elapsed_ns)),
            iterations: self.iterations.load(Ordering::SeqCst),
            succeeded: self.succeeded.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            batches: self.batches.load(Ordering::SeqCst),
        }
    }
}

/// Immutable snapshot of [`LoopMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopMetricsSnapshot {
    pub run_id: u64,
    pub elapsed: Option<Duration>,
    pub iterations: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub batches: u64,
}

impl fmt::Display for LoopMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run_id={}, iterations={}, succeeded={}, failed={}, batches={}, elapsed={:?}",
            self.run_id, self.iterations, self.succeeded, self.failed, self.batches, self.elapsed
        )
    }
}
