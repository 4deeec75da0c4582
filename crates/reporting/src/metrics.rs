//! Ratio metrics over period sums.
//!
//! ```text
//! CTR   = clicks / impressions * 100
//! CVR   = orders / clicks * 100
//! CPA   = spend / orders
//! CPC   = spend / clicks
//! ROAS  = sales / spend
//! ACOS  = spend / sales * 100
//! TACOS = spend / (ad sales + net revenue) * 100
//! ```
//!
//! A zero denominator yields [`MetricValue::Undefined`].

use adlift_core::types::{AdMeasures, AdRatios, ChannelMetrics, MetricValue, MetricsRow};

use crate::period::PeriodBreakdown;

pub fn ad_ratios(m: &AdMeasures) -> AdRatios {
    AdRatios {
        ctr: MetricValue::ratio(m.clicks, m.impressions, 100.0),
        cvr: MetricValue::ratio(m.orders, m.clicks, 100.0),
        cpa: MetricValue::ratio(m.spend, m.orders, 1.0),
        cpc: MetricValue::ratio(m.spend, m.clicks, 1.0),
        roas: MetricValue::ratio(m.sales, m.spend, 1.0),
        acos: MetricValue::ratio(m.spend, m.sales, 100.0),
    }
}

pub fn channel_metrics(measures: AdMeasures) -> ChannelMetrics {
    ChannelMetrics {
        ratios: ad_ratios(&measures),
        measures,
    }
}

/// One output row from the four summaries of a period.
pub fn calculate(breakdown: &PeriodBreakdown) -> MetricsRow {
    let combined = breakdown.combined_ads();
    let sales = breakdown.transactions.measures;
    let total_sales = combined.sales + sales.net_revenue;

    MetricsRow {
        period: breakdown.period.name.clone(),
        start_date: breakdown.period.start_date,
        end_date: breakdown.period.end_date,
        active_days: breakdown.active_days,
        sales,
        sponsored_products: channel_metrics(breakdown.sponsored_products.measures),
        sponsored_brands: channel_metrics(breakdown.sponsored_brands.measures),
        sponsored_display: channel_metrics(breakdown.sponsored_display.measures),
        combined: channel_metrics(combined),
        total_sales,
        tacos: MetricValue::ratio(combined.spend, total_sales, 100.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(value: MetricValue, expected: f64) {
        match value {
            MetricValue::Value(v) => assert!((v - expected).abs() < 1e-9, "{v} != {expected}"),
            MetricValue::Undefined => panic!("expected {expected}, got undefined"),
        }
    }

    #[test]
    fn test_ratio_formulas() {
        let ratios = ad_ratios(&AdMeasures {
            impressions: 1000.0,
            clicks: 20.0,
            spend: 10.0,
            sales: 50.0,
            orders: 2.0,
        });
        assert_close(ratios.ctr, 2.0);
        assert_close(ratios.cvr, 10.0);
        assert_close(ratios.cpa, 5.0);
        assert_close(ratios.cpc, 0.5);
        assert_close(ratios.roas, 5.0);
        assert_close(ratios.acos, 20.0);
    }

    #[test]
    fn test_cpa_undefined_without_orders() {
        let ratios = ad_ratios(&AdMeasures {
            impressions: 500.0,
            clicks: 10.0,
            spend: 50.0,
            sales: 0.0,
            orders: 0.0,
        });
        assert_eq!(ratios.cpa, MetricValue::Undefined);
        assert_eq!(ratios.acos, MetricValue::Undefined);
        assert_close(ratios.cvr, 0.0);
        assert_close(ratios.roas, 0.0);
    }

    #[test]
    fn test_zero_spend_roas_is_undefined_not_zero() {
        let ratios = ad_ratios(&AdMeasures {
            sales: 25.0,
            ..Default::default()
        });
        assert!(ratios.roas.is_undefined());
        assert_close(ratios.acos, 0.0);
    }

    #[test]
    fn test_all_zero_measures_all_undefined() {
        let ratios = ad_ratios(&AdMeasures::default());
        for value in [ratios.ctr, ratios.cvr, ratios.cpa, ratios.cpc, ratios.roas, ratios.acos] {
            assert!(value.is_undefined());
        }
    }
}
