//! Runs the whole chain (normalize, clean, aggregate, merge, calculate) over
//! a set of raw tables. Nothing is cached between runs.

use adlift_core::types::{
    DataSummary, DatasetDiagnostics, DatasetKind, Diagnostics, MetricsRow, PeriodDefinition,
    RawTable,
};
use adlift_core::{AdliftResult, CleaningConfig, MissingColumn};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregate::{aggregate_daily, DailyAggregates};
use crate::clean::{clean_campaigns, Cleaned, TransactionCleaner};
use crate::daily::daily_metrics;
use crate::metrics::calculate;
use crate::normalize::{normalize_campaigns, normalize_transactions};
use crate::period::{merge_periods, validate_periods};

/// Daily aggregates of every dataset plus what was lost getting there.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PreparedData {
    pub aggregates: DailyAggregates,
    pub summary: DataSummary,
    pub diagnostics: Diagnostics,
}

/// One metrics row per requested period, in caller order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub summary: DataSummary,
    pub rows: Vec<MetricsRow>,
    pub diagnostics: Diagnostics,
}

/// One metrics row per calendar date with data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyReport {
    pub summary: DataSummary,
    pub rows: Vec<MetricsRow>,
    pub diagnostics: Diagnostics,
}

pub struct AnalysisPipeline {
    cleaning: CleaningConfig,
}

impl AnalysisPipeline {
    pub fn new(cleaning: &CleaningConfig) -> Self {
        Self {
            cleaning: cleaning.clone(),
        }
    }

    /// Normalize, clean and aggregate every dataset kind.
    ///
    /// Tables sharing a kind are concatenated. A table missing a required
    /// column is skipped and recorded; a kind with no usable table is
    /// reported absent and contributes zeros downstream.
    pub fn prepare(&self, tables: &[RawTable]) -> PreparedData {
        let mut prepared = PreparedData::default();

        for kind in DatasetKind::ALL {
            let of_kind: Vec<&RawTable> = tables.iter().filter(|t| t.kind == kind).collect();
            if of_kind.is_empty() {
                warn!(kind = kind.as_str(), "No table supplied, dataset treated as absent");
                prepared.diagnostics.absent_datasets.push(kind);
                continue;
            }

            let diagnostics = if kind.is_campaign() {
                let Some(records) = collect_records(&of_kind, normalize_campaigns, &mut prepared.diagnostics) else {
                    prepared.diagnostics.absent_datasets.push(kind);
                    continue;
                };
                let Cleaned { rows, diagnostics } = clean_campaigns(&records);
                prepared
                    .aggregates
                    .set_campaign(kind, aggregate_daily(kind, &rows));
                diagnostics
            } else {
                let Some(records) = collect_records(&of_kind, normalize_transactions, &mut prepared.diagnostics) else {
                    prepared.diagnostics.absent_datasets.push(kind);
                    continue;
                };
                let Cleaned { rows, diagnostics } = TransactionCleaner::new(&self.cleaning).clean(&records);
                prepared.aggregates.transactions = aggregate_daily(kind, &rows);
                diagnostics
            };

            record_dataset(kind, diagnostics, &mut prepared.diagnostics);
        }

        prepared.summary = prepared.aggregates.summary();
        let summary = &prepared.summary;
        info!(
            days = summary.days,
            first_date = ?summary.first_date,
            last_date = ?summary.last_date,
            orders = summary.sales.orders,
            net_revenue = summary.sales.net_revenue,
            ad_spend = summary.ads.spend,
            "Data summary"
        );
        prepared
    }

    /// Metrics for each period. Periods are validated before any table is
    /// touched.
    pub fn run(&self, tables: &[RawTable], periods: &[PeriodDefinition]) -> AdliftResult<AnalysisReport> {
        validate_periods(periods)?;
        let PreparedData {
            aggregates,
            summary,
            mut diagnostics,
        } = self.prepare(tables);

        let breakdowns = merge_periods(&aggregates, periods)?;
        let mut rows = Vec::with_capacity(breakdowns.len());
        for breakdown in &breakdowns {
            if breakdown.is_empty() {
                warn!(
                    period = %breakdown.period.name,
                    start = %breakdown.period.start_date,
                    end = %breakdown.period.end_date,
                    "Period matches no date in any dataset"
                );
                diagnostics.empty_periods.push(breakdown.period.name.clone());
            }
            rows.push(calculate(breakdown));
        }
        metrics::counter!("adlift.periods_computed").increment(rows.len() as u64);

        info!(
            periods = rows.len(),
            empty_periods = diagnostics.empty_periods.len(),
            dropped_rows = diagnostics.dropped_rows(),
            "Analysis complete"
        );
        Ok(AnalysisReport {
            summary,
            rows,
            diagnostics,
        })
    }

    /// The date-by-date table over every date present in any dataset.
    pub fn daily(&self, tables: &[RawTable]) -> DailyReport {
        let PreparedData {
            aggregates,
            summary,
            diagnostics,
        } = self.prepare(tables);
        let rows = daily_metrics(&aggregates);
        info!(days = rows.len(), "Daily table complete");
        DailyReport {
            summary,
            rows,
            diagnostics,
        }
    }
}

/// Normalize every table of one kind. `None` when no table resolved.
fn collect_records<T>(
    tables: &[&RawTable],
    normalize: fn(&RawTable) -> Result<Vec<T>, MissingColumn>,
    diagnostics: &mut Diagnostics,
) -> Option<Vec<T>> {
    let mut records = Vec::new();
    let mut resolved = false;
    for table in tables {
        match normalize(table) {
            Ok(mut batch) => {
                resolved = true;
                records.append(&mut batch);
            }
            Err(missing) => {
                warn!(
                    kind = missing.kind.as_str(),
                    field = missing.field,
                    "{missing}"
                );
                diagnostics.missing_columns.push(missing);
            }
        }
    }
    resolved.then_some(records)
}

fn record_dataset(kind: DatasetKind, cleaned: DatasetDiagnostics, diagnostics: &mut Diagnostics) {
    let label = kind.as_str();
    metrics::counter!("adlift.rows_ingested", "kind" => label).increment(cleaned.rows_read as u64);
    metrics::counter!("adlift.rows_dropped", "kind" => label).increment(cleaned.dropped() as u64);

    debug!(
        kind = label,
        rows_read = cleaned.rows_read,
        rows_kept = cleaned.rows_kept,
        malformed_dates = cleaned.malformed_dates,
        non_amazon_channel = cleaned.non_amazon_channel,
        excluded_status = cleaned.excluded_status,
        unparseable_numbers = cleaned.unparseable_numbers,
        "Dataset cleaned"
    );
    if cleaned.malformed_dates > 0 {
        warn!(kind = label, rows = cleaned.malformed_dates, "Dropped rows with unparseable dates");
    }
    if cleaned.unparseable_numbers > 0 {
        warn!(kind = label, cells = cleaned.unparseable_numbers, "Unparseable numeric cells counted as zero");
    }
    if cleaned.rows_kept == 0 && cleaned.malformed_dates > 0 {
        warn!(kind = label, "No row of the dataset has a usable date");
        diagnostics.undated_datasets.push(kind);
    }

    diagnostics.datasets.entry(kind).or_default().absorb(&cleaned);
}
