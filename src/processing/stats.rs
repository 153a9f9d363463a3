//! Numeric reductions over collected values.
//!
//! Used for mean/median/mode fills and for aggregating loop results.

use crate::types::Value;

/// Built-in reductions over a list of numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    /// Number of values.
    Count,
    /// Sum of values.
    Sum,
    /// Arithmetic mean.
    Mean,
    /// Middle value (mean of the two middle values for even counts).
    Median,
    /// Minimum value.
    Min,
    /// Maximum value.
    Max,
}

/// Numbers among `values`: ints, floats and numeric strings. Everything else is skipped.
pub fn numeric_values<'a>(values: impl IntoIterator<Item = &'a Value>) -> Vec<f64> {
    values.into_iter().filter_map(Value::coerce_f64).collect()
}

/// Reduces `values` with `op`.
///
/// - `Count` always returns `Some`.
/// - Every other op returns `None` for an empty slice.
pub fn reduce(values: &[f64], op: ReduceOp) -> Option<f64> {
    if op == ReduceOp::Count {
        return Some(values.len() as f64);
    }
    if values.is_empty() {
        return None;
    }

    match op {
        ReduceOp::Count => Some(values.len() as f64),
        ReduceOp::Sum => Some(values.iter().sum()),
        ReduceOp::Mean => Some(values.iter().sum::<f64>() / values.len() as f64),
        ReduceOp::Median => {
            let mut sorted = values.to_vec();
            sorted.sort_by(f64::total_cmp);
            let mid = sorted.len() / 2;
            if sorted.len() % 2 == 0 {
                Some((sorted[mid - 1] + sorted[mid]) / 2.0)
            } else {
                Some(sorted[mid])
            }
        }
        ReduceOp::Min => values.iter().copied().reduce(f64::min),
        ReduceOp::Max => values.iter().copied().reduce(f64::max),
    }
}

/// Most frequent value; ties go to the value seen first.
pub fn mode(values: &[Value]) -> Option<Value> {
    let mut counts: Vec<(&Value, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(seen, _)| *seen == value) {
            Some((_, n)) => *n += 1,
            None => counts.push((value, 1)),
        }
    }

    let mut best: Option<(&Value, usize)> = None;
    for (value, n) in counts {
        if best.is_none_or(|(_, top)| n > top) {
            best = Some((value, n));
        }
    }
    best.map(|(v, _)| v.clone())
}
