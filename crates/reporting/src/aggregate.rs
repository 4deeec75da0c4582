//! Per-date aggregation of cleaned rows.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::AddAssign;

use adlift_core::types::{
    AdMeasures, CampaignRow, DailyAggregate, DataSummary, DatasetKind, SalesMeasures,
    TransactionRow,
};
use chrono::NaiveDate;
use serde::Serialize;

/// A cleaned row that can be summed by calendar date.
pub trait DatedRow {
    type Measures: Default + AddAssign + Copy;

    fn date(&self) -> NaiveDate;
    fn measures(&self) -> Self::Measures;
}

impl DatedRow for TransactionRow {
    type Measures = SalesMeasures;

    fn date(&self) -> NaiveDate {
        self.date
    }

    fn measures(&self) -> SalesMeasures {
        SalesMeasures {
            orders: 1.0,
            units: self.units,
            gross_revenue: self.gross_revenue,
            promotion_discount: self.promotion_discount,
            net_revenue: self.net_revenue,
        }
    }
}

impl DatedRow for CampaignRow {
    type Measures = AdMeasures;

    fn date(&self) -> NaiveDate {
        self.date
    }

    fn measures(&self) -> AdMeasures {
        AdMeasures {
            impressions: self.impressions,
            clicks: self.clicks,
            spend: self.spend,
            sales: self.sales,
            orders: self.orders,
        }
    }
}

/// Sum `rows` by date. Output is ascending by date; dates without rows are
/// absent.
pub fn aggregate_daily<R: DatedRow>(kind: DatasetKind, rows: &[R]) -> Vec<DailyAggregate<R::Measures>> {
    let mut by_date: BTreeMap<NaiveDate, R::Measures> = BTreeMap::new();
    for row in rows {
        *by_date.entry(row.date()).or_default() += row.measures();
    }
    by_date
        .into_iter()
        .map(|(date, measures)| DailyAggregate {
            kind,
            date,
            measures,
        })
        .collect()
}

/// Daily aggregates for all four datasets of one analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DailyAggregates {
    pub transactions: Vec<DailyAggregate<SalesMeasures>>,
    pub sponsored_products: Vec<DailyAggregate<AdMeasures>>,
    pub sponsored_brands: Vec<DailyAggregate<AdMeasures>>,
    pub sponsored_display: Vec<DailyAggregate<AdMeasures>>,
}

impl DailyAggregates {
    /// Aggregates for a campaign kind. Empty for `Transactions`.
    pub fn campaign(&self, kind: DatasetKind) -> &[DailyAggregate<AdMeasures>] {
        match kind {
            DatasetKind::SponsoredProducts => &self.sponsored_products,
            DatasetKind::SponsoredBrands => &self.sponsored_brands,
            DatasetKind::SponsoredDisplay => &self.sponsored_display,
            DatasetKind::Transactions => &[],
        }
    }

    pub fn set_campaign(&mut self, kind: DatasetKind, aggregates: Vec<DailyAggregate<AdMeasures>>) {
        match kind {
            DatasetKind::SponsoredProducts => self.sponsored_products = aggregates,
            DatasetKind::SponsoredBrands => self.sponsored_brands = aggregates,
            DatasetKind::SponsoredDisplay => self.sponsored_display = aggregates,
            DatasetKind::Transactions => {}
        }
    }

    /// Every date present in any dataset, ascending.
    pub fn dates(&self) -> BTreeSet<NaiveDate> {
        let mut dates: BTreeSet<NaiveDate> = self.transactions.iter().map(|a| a.date).collect();
        for kind in DatasetKind::CAMPAIGNS {
            dates.extend(self.campaign(kind).iter().map(|a| a.date));
        }
        dates
    }

    /// Totals and date span over everything loaded.
    pub fn summary(&self) -> DataSummary {
        let dates = self.dates();
        let mut summary = DataSummary {
            days: dates.len(),
            first_date: dates.first().copied(),
            last_date: dates.last().copied(),
            ..Default::default()
        };
        for aggregate in &self.transactions {
            summary.sales += aggregate.measures;
        }
        for kind in DatasetKind::CAMPAIGNS {
            for aggregate in self.campaign(kind) {
                summary.ads += aggregate.measures;
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
    }

    fn ad_row(d: u32, clicks: f64, spend: f64) -> CampaignRow {
        CampaignRow {
            date: date(d),
            impressions: clicks * 50.0,
            clicks,
            spend,
            sales: spend * 4.0,
            orders: 1.0,
        }
    }

    #[test]
    fn test_groups_by_date_ascending() {
        let rows = vec![ad_row(12, 2.0, 1.5), ad_row(10, 3.0, 2.0), ad_row(12, 5.0, 0.5)];
        let daily = aggregate_daily(DatasetKind::SponsoredProducts, &rows);

        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].date, date(10));
        assert_eq!(daily[1].date, date(12));
        assert_eq!(daily[1].measures.clicks, 7.0);
        assert_eq!(daily[1].measures.spend, 2.0);
        assert_eq!(daily[1].measures.orders, 2.0);
        assert_eq!(daily[1].kind, DatasetKind::SponsoredProducts);
    }

    #[test]
    fn test_no_zero_filled_dates() {
        let rows = vec![ad_row(1, 1.0, 1.0), ad_row(5, 1.0, 1.0)];
        let daily = aggregate_daily(DatasetKind::SponsoredBrands, &rows);
        assert_eq!(daily.len(), 2);
    }

    #[test]
    fn test_transactions_count_orders() {
        let rows = vec![
            TransactionRow {
                date: date(10),
                gross_revenue: 100.0,
                promotion_discount: 10.0,
                net_revenue: 90.0,
                units: 2.0,
            },
            TransactionRow {
                date: date(10),
                gross_revenue: 20.0,
                promotion_discount: 0.0,
                net_revenue: 20.0,
                units: 1.0,
            },
        ];
        let daily = aggregate_daily(DatasetKind::Transactions, &rows);
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].measures.orders, 2.0);
        assert_eq!(daily[0].measures.units, 3.0);
        assert_eq!(daily[0].measures.net_revenue, 110.0);
    }

    #[test]
    fn test_dates_union() {
        let mut aggregates = DailyAggregates::default();
        aggregates.set_campaign(
            DatasetKind::SponsoredDisplay,
            aggregate_daily(DatasetKind::SponsoredDisplay, &[ad_row(3, 1.0, 1.0)]),
        );
        aggregates.sponsored_products =
            aggregate_daily(DatasetKind::SponsoredProducts, &[ad_row(1, 1.0, 1.0), ad_row(3, 1.0, 1.0)]);
        let dates: Vec<_> = aggregates.dates().into_iter().collect();
        assert_eq!(dates, vec![date(1), date(3)]);
        assert!(aggregates.campaign(DatasetKind::Transactions).is_empty());
    }

    #[test]
    fn test_summary_spans_all_datasets() {
        let aggregates = DailyAggregates {
            transactions: aggregate_daily(
                DatasetKind::Transactions,
                &[TransactionRow {
                    date: date(9),
                    gross_revenue: 100.0,
                    promotion_discount: 10.0,
                    net_revenue: 90.0,
                    units: 2.0,
                }],
            ),
            sponsored_products: aggregate_daily(DatasetKind::SponsoredProducts, &[ad_row(11, 20.0, 10.0)]),
            ..Default::default()
        };

        let summary = aggregates.summary();
        assert_eq!(summary.days, 2);
        assert_eq!(summary.first_date, Some(date(9)));
        assert_eq!(summary.last_date, Some(date(11)));
        assert_eq!(summary.sales.orders, 1.0);
        assert_eq!(summary.sales.net_revenue, 90.0);
        assert_eq!(summary.ads.spend, 10.0);
        assert_eq!(summary.ads.sales, 40.0);
        assert_eq!(summary.ads.clicks, 20.0);
    }

    #[test]
    fn test_summary_of_nothing() {
        let summary = DailyAggregates::default().summary();
        assert_eq!(summary.days, 0);
        assert_eq!(summary.first_date, None);
        assert_eq!(summary.last_date, None);
    }
}
