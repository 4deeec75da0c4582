//! Period-over-period lift: percentage change of every measure and metric
//! from a baseline period to a comparison period.

use adlift_core::types::{LiftRow, MetricValue, MetricsRow};

/// `(comparison - baseline) / baseline * 100` per named value. Undefined when
/// the baseline is zero or either side is undefined.
pub fn compute_lift(baseline: &MetricsRow, comparison: &MetricsRow) -> LiftRow {
    let entries = baseline
        .named_values()
        .into_iter()
        .zip(comparison.named_values())
        .map(|((name, base), (_, other))| (name, percent_change(base, other)))
        .collect();

    LiftRow {
        baseline: baseline.period.clone(),
        comparison: comparison.period.clone(),
        entries,
    }
}

/// Lift for every ordered pair `(rows[i], rows[j])` with `i < j`, the earlier
/// row serving as baseline.
pub fn lift_matrix(rows: &[MetricsRow]) -> Vec<LiftRow> {
    let mut lifts = Vec::new();
    for (i, baseline) in rows.iter().enumerate() {
        for comparison in &rows[i + 1..] {
            lifts.push(compute_lift(baseline, comparison));
        }
    }
    lifts
}

fn percent_change(baseline: MetricValue, comparison: MetricValue) -> MetricValue {
    match (baseline.value(), comparison.value()) {
        (Some(base), Some(other)) => MetricValue::ratio(other - base, base, 100.0),
        _ => MetricValue::Undefined,
    }
}
