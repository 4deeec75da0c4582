//! Sales and advertising analysis: column normalization, cleaning, daily
//! aggregation, period bucketing, ratio metrics and export.

pub mod aggregate;
pub mod clean;
pub mod daily;
pub mod export;
pub mod lift;
pub mod metrics;
pub mod normalize;
pub mod period;
pub mod pipeline;

pub use aggregate::{aggregate_daily, DailyAggregates};
pub use daily::daily_metrics;
pub use lift::{compute_lift, lift_matrix};
pub use metrics::calculate;
pub use period::{merge_periods, PeriodBreakdown};
pub use pipeline::{AnalysisPipeline, AnalysisReport, DailyReport, PreparedData};
