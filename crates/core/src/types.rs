use std::collections::BTreeMap;
use std::fmt;
use std::ops::AddAssign;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::MissingColumn;

// ─── Inputs ─────────────────────────────────────────────────────────────────

/// The four spreadsheet exports an analysis is built from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Transactions,
    #[serde(rename = "sp")]
    SponsoredProducts,
    #[serde(rename = "sb")]
    SponsoredBrands,
    #[serde(rename = "sd")]
    SponsoredDisplay,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 4] = [
        DatasetKind::Transactions,
        DatasetKind::SponsoredProducts,
        DatasetKind::SponsoredBrands,
        DatasetKind::SponsoredDisplay,
    ];

    pub const CAMPAIGNS: [DatasetKind; 3] = [
        DatasetKind::SponsoredProducts,
        DatasetKind::SponsoredBrands,
        DatasetKind::SponsoredDisplay,
    ];

    /// Short label used for column prefixes, metric labels and CLI flags.
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKind::Transactions => "transactions",
            DatasetKind::SponsoredProducts => "sp",
            DatasetKind::SponsoredBrands => "sb",
            DatasetKind::SponsoredDisplay => "sd",
        }
    }

    pub fn is_campaign(&self) -> bool {
        !matches!(self, DatasetKind::Transactions)
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DatasetKind::Transactions => "Transactions",
            DatasetKind::SponsoredProducts => "Sponsored Products",
            DatasetKind::SponsoredBrands => "Sponsored Brands",
            DatasetKind::SponsoredDisplay => "Sponsored Display",
        };
        f.write_str(name)
    }
}

/// An untyped spreadsheet cell. Native date cells arrive as Excel serials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    /// Text form of the cell, trimmed. Numbers are rendered without a
    /// trailing `.0` so that codes like `1` survive a round trip.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) if s.trim().is_empty() => None,
            Cell::Text(s) => Some(s.trim().to_string()),
            Cell::Number(n) if n.fract() == 0.0 => Some(format!("{}", *n as i64)),
            Cell::Number(n) => Some(n.to_string()),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        if value.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value.to_string())
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

/// One uploaded spreadsheet, tagged with the dataset it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub kind: DatasetKind,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(kind: DatasetKind, headers: Vec<String>) -> Self {
        Self {
            kind,
            headers,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A caller-supplied inclusive date window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodDefinition {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl PeriodDefinition {
    pub fn new(name: impl Into<String>, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            name: name.into(),
            start_date,
            end_date,
        }
    }

    /// A one-day period named after its ISO date.
    pub fn single_day(date: NaiveDate) -> Self {
        Self::new(date.format("%Y-%m-%d").to_string(), date, date)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }
}

// ─── Canonical rows and measures ────────────────────────────────────────────

/// A cleaned transaction line. Each line counts as one order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRow {
    pub date: NaiveDate,
    pub gross_revenue: f64,
    pub promotion_discount: f64,
    pub net_revenue: f64,
    pub units: f64,
}

/// A cleaned advertising report line (SP, SB or SD).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignRow {
    pub date: NaiveDate,
    pub impressions: f64,
    pub clicks: f64,
    pub spend: f64,
    pub sales: f64,
    pub orders: f64,
}

/// Summed transaction measures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesMeasures {
    pub orders: f64,
    pub units: f64,
    pub gross_revenue: f64,
    pub promotion_discount: f64,
    pub net_revenue: f64,
}

impl AddAssign for SalesMeasures {
    fn add_assign(&mut self, rhs: Self) {
        self.orders += rhs.orders;
        self.units += rhs.units;
        self.gross_revenue += rhs.gross_revenue;
        self.promotion_discount += rhs.promotion_discount;
        self.net_revenue += rhs.net_revenue;
    }
}

/// Summed advertising measures for one campaign kind or for all of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AdMeasures {
    pub impressions: f64,
    pub clicks: f64,
    pub spend: f64,
    pub sales: f64,
    pub orders: f64,
}

impl AddAssign for AdMeasures {
    fn add_assign(&mut self, rhs: Self) {
        self.impressions += rhs.impressions;
        self.clicks += rhs.clicks;
        self.spend += rhs.spend;
        self.sales += rhs.sales;
        self.orders += rhs.orders;
    }
}

/// Sum of one dataset's measures for a single calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate<M> {
    pub kind: DatasetKind,
    pub date: NaiveDate,
    pub measures: M,
}

/// Sum of one dataset's daily aggregates over a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary<M> {
    pub period: String,
    pub kind: DatasetKind,
    /// Dates inside the period that had at least one row.
    pub active_days: usize,
    pub measures: M,
}

/// Totals over every date with data, before any period is chosen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSummary {
    /// Distinct dates with data in any dataset.
    pub days: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub sales: SalesMeasures,
    /// SP, SB and SD combined.
    pub ads: AdMeasures,
}

// ─── Metrics ────────────────────────────────────────────────────────────────

/// A ratio metric. `Undefined` marks a zero denominator and is never
/// collapsed into a number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum MetricValue {
    Value(f64),
    Undefined,
}

impl MetricValue {
    /// `numerator / denominator * scale`, undefined when the denominator is zero.
    pub fn ratio(numerator: f64, denominator: f64, scale: f64) -> Self {
        if denominator == 0.0 {
            MetricValue::Undefined
        } else {
            MetricValue::Value(numerator / denominator * scale)
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            MetricValue::Value(v) => Some(*v),
            MetricValue::Undefined => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, MetricValue::Undefined)
    }

    /// Render with `precision` decimals, or `undefined_label`.
    pub fn render(&self, precision: usize, undefined_label: &str) -> String {
        match self {
            MetricValue::Value(v) => format!("{:.*}", precision, v),
            MetricValue::Undefined => undefined_label.to_string(),
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Value(v) => write!(f, "{v}"),
            MetricValue::Undefined => f.write_str("undefined"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdRatios {
    pub ctr: MetricValue,
    pub cvr: MetricValue,
    pub cpa: MetricValue,
    pub cpc: MetricValue,
    pub roas: MetricValue,
    pub acos: MetricValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelMetrics {
    pub measures: AdMeasures,
    pub ratios: AdRatios,
}

/// Final per-period output row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRow {
    pub period: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub active_days: usize,
    pub sales: SalesMeasures,
    pub sponsored_products: ChannelMetrics,
    pub sponsored_brands: ChannelMetrics,
    pub sponsored_display: ChannelMetrics,
    pub combined: ChannelMetrics,
    /// Ad-attributed sales plus net revenue.
    pub total_sales: f64,
    pub tacos: MetricValue,
}

impl MetricsRow {
    pub fn channel(&self, kind: DatasetKind) -> Option<&ChannelMetrics> {
        match kind {
            DatasetKind::SponsoredProducts => Some(&self.sponsored_products),
            DatasetKind::SponsoredBrands => Some(&self.sponsored_brands),
            DatasetKind::SponsoredDisplay => Some(&self.sponsored_display),
            DatasetKind::Transactions => None,
        }
    }

    /// Names of every value returned by [`MetricsRow::named_values`], in order.
    pub fn column_names() -> Vec<String> {
        let mut names: Vec<String> = SALES_COLUMNS.iter().map(|c| c.to_string()).collect();
        for prefix in CHANNEL_PREFIXES {
            names.extend(CHANNEL_COLUMNS.iter().map(|c| format!("{prefix}_{c}")));
        }
        names.push("total_sales".to_string());
        names.push("tacos".to_string());
        names
    }

    /// Every measure and metric as a named value, in export column order.
    pub fn named_values(&self) -> Vec<(String, MetricValue)> {
        Self::column_names().into_iter().zip(self.values()).collect()
    }

    fn values(&self) -> Vec<MetricValue> {
        let s = &self.sales;
        let mut values: Vec<MetricValue> = [
            s.orders,
            s.units,
            s.gross_revenue,
            s.promotion_discount,
            s.net_revenue,
        ]
        .into_iter()
        .map(MetricValue::Value)
        .collect();

        for channel in [
            &self.sponsored_products,
            &self.sponsored_brands,
            &self.sponsored_display,
            &self.combined,
        ] {
            let m = &channel.measures;
            let r = &channel.ratios;
            values.extend([
                MetricValue::Value(m.impressions),
                MetricValue::Value(m.clicks),
                MetricValue::Value(m.spend),
                MetricValue::Value(m.sales),
                MetricValue::Value(m.orders),
                r.ctr,
                r.cvr,
                r.cpa,
                r.cpc,
                r.roas,
                r.acos,
            ]);
        }

        values.push(MetricValue::Value(self.total_sales));
        values.push(self.tacos);
        values
    }
}

const SALES_COLUMNS: [&str; 5] = [
    "orders",
    "units",
    "gross_revenue",
    "promotion_discount",
    "net_revenue",
];

// Column order must match the push order in `MetricsRow::values`.
const CHANNEL_PREFIXES: [&str; 4] = ["sp", "sb", "sd", "ads"];
const CHANNEL_COLUMNS: [&str; 11] = [
    "impressions",
    "clicks",
    "spend",
    "sales",
    "orders",
    "ctr",
    "cvr",
    "cpa",
    "cpc",
    "roas",
    "acos",
];

/// Percentage change of every named value from one period to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiftRow {
    pub baseline: String,
    pub comparison: String,
    pub entries: Vec<(String, MetricValue)>,
}

impl LiftRow {
    pub fn get(&self, name: &str) -> Option<MetricValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }
}

// ─── Diagnostics ────────────────────────────────────────────────────────────

/// Row-level bookkeeping for one dataset kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetDiagnostics {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub malformed_dates: usize,
    pub non_amazon_channel: usize,
    pub excluded_status: usize,
    pub unparseable_numbers: usize,
}

impl DatasetDiagnostics {
    pub fn dropped(&self) -> usize {
        self.malformed_dates + self.non_amazon_channel + self.excluded_status
    }

    pub fn absorb(&mut self, other: &DatasetDiagnostics) {
        self.rows_read += other.rows_read;
        self.rows_kept += other.rows_kept;
        self.malformed_dates += other.malformed_dates;
        self.non_amazon_channel += other.non_amazon_channel;
        self.excluded_status += other.excluded_status;
        self.unparseable_numbers += other.unparseable_numbers;
    }
}

/// Everything that went less than perfectly during one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub missing_columns: Vec<MissingColumn>,
    /// Kinds with no usable table (not supplied, or missing a required column).
    pub absent_datasets: Vec<DatasetKind>,
    /// Kinds that had rows but not a single parseable date.
    pub undated_datasets: Vec<DatasetKind>,
    /// Periods that matched no date in any dataset.
    pub empty_periods: Vec<String>,
    pub datasets: BTreeMap<DatasetKind, DatasetDiagnostics>,
}

impl Diagnostics {
    pub fn dataset(&self, kind: DatasetKind) -> Option<&DatasetDiagnostics> {
        self.datasets.get(&kind)
    }

    pub fn dropped_rows(&self) -> usize {
        self.datasets.values().map(DatasetDiagnostics::dropped).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.missing_columns.is_empty()
            && self.absent_datasets.is_empty()
            && self.undated_datasets.is_empty()
            && self.empty_periods.is_empty()
            && self.dropped_rows() == 0
            && self.datasets.values().all(|d| d.unparseable_numbers == 0)
    }
}
