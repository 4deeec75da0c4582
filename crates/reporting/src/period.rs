//! Period bucketing: sums daily aggregates into caller-defined windows.

use std::collections::HashSet;
use std::ops::AddAssign;

use adlift_core::types::{
    AdMeasures, DailyAggregate, DatasetKind, PeriodDefinition, PeriodSummary, SalesMeasures,
};
use adlift_core::{AdliftError, AdliftResult};
use serde::Serialize;

use crate::aggregate::DailyAggregates;

/// The four per-kind summaries of one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodBreakdown {
    pub period: PeriodDefinition,
    /// Distinct dates in the period with data in any dataset.
    pub active_days: usize,
    pub transactions: PeriodSummary<SalesMeasures>,
    pub sponsored_products: PeriodSummary<AdMeasures>,
    pub sponsored_brands: PeriodSummary<AdMeasures>,
    pub sponsored_display: PeriodSummary<AdMeasures>,
}

impl PeriodBreakdown {
    pub fn campaigns(&self) -> [&PeriodSummary<AdMeasures>; 3] {
        [
            &self.sponsored_products,
            &self.sponsored_brands,
            &self.sponsored_display,
        ]
    }

    /// Campaign measures summed over SP, SB and SD.
    pub fn combined_ads(&self) -> AdMeasures {
        let mut total = AdMeasures::default();
        for summary in self.campaigns() {
            total += summary.measures;
        }
        total
    }

    /// True when no dataset had a single date inside the period.
    pub fn is_empty(&self) -> bool {
        self.active_days == 0
    }
}

/// Reject empty period lists, inverted ranges and repeated names.
///
/// Names are compared trimmed and case-insensitively.
pub fn validate_periods(periods: &[PeriodDefinition]) -> AdliftResult<()> {
    if periods.is_empty() {
        return Err(AdliftError::NoPeriods);
    }
    let mut seen = HashSet::new();
    for period in periods {
        if period.start_date > period.end_date {
            return Err(AdliftError::InvalidPeriod {
                name: period.name.clone(),
                start: period.start_date,
                end: period.end_date,
            });
        }
        if !seen.insert(period.name.trim().to_lowercase()) {
            return Err(AdliftError::DuplicatePeriod(period.name.clone()));
        }
    }
    Ok(())
}

/// Sum the aggregates of one kind that fall inside `period`. A period with no
/// matching dates yields zeroed measures.
pub fn summarize<M>(period: &PeriodDefinition, kind: DatasetKind, aggregates: &[DailyAggregate<M>]) -> PeriodSummary<M>
where
    M: Default + AddAssign + Copy,
{
    let mut measures = M::default();
    let mut active_days = 0;
    for aggregate in aggregates.iter().filter(|a| period.contains(a.date)) {
        measures += aggregate.measures;
        active_days += 1;
    }
    PeriodSummary {
        period: period.name.clone(),
        kind,
        active_days,
        measures,
    }
}

/// Summaries of every dataset for a single period.
pub fn breakdown(period: &PeriodDefinition, aggregates: &DailyAggregates) -> PeriodBreakdown {
    PeriodBreakdown {
        period: period.clone(),
        active_days: aggregates
            .dates()
            .into_iter()
            .filter(|d| period.contains(*d))
            .count(),
        transactions: summarize(period, DatasetKind::Transactions, &aggregates.transactions),
        sponsored_products: summarize(
            period,
            DatasetKind::SponsoredProducts,
            &aggregates.sponsored_products,
        ),
        sponsored_brands: summarize(
            period,
            DatasetKind::SponsoredBrands,
            &aggregates.sponsored_brands,
        ),
        sponsored_display: summarize(
            period,
            DatasetKind::SponsoredDisplay,
            &aggregates.sponsored_display,
        ),
    }
}

/// Validate `periods` and produce one breakdown per period, in caller order.
pub fn merge_periods(aggregates: &DailyAggregates, periods: &[PeriodDefinition]) -> AdliftResult<Vec<PeriodBreakdown>> {
    validate_periods(periods)?;
    Ok(periods.iter().map(|p| breakdown(p, aggregates)).collect())
}
