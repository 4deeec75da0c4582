//! Date-by-date metrics table, one row per calendar date with data.

use adlift_core::types::{MetricsRow, PeriodDefinition};

use crate::aggregate::DailyAggregates;
use crate::metrics::calculate;
use crate::period::breakdown;

/// One metrics row per date present in any dataset, ascending. Each row is a
/// one-day period named after its ISO date.
pub fn daily_metrics(aggregates: &DailyAggregates) -> Vec<MetricsRow> {
    aggregates
        .dates()
        .into_iter()
        .map(|date| calculate(&breakdown(&PeriodDefinition::single_day(date), aggregates)))
        .collect()
}
