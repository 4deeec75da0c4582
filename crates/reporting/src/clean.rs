//! Row cleaning: channel and status filters, date truncation, numeric
//! coercion and net revenue derivation.

use adlift_core::types::{CampaignRow, Cell, DatasetDiagnostics, TransactionRow};
use adlift_core::CleaningConfig;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};

use crate::normalize::{CampaignRecord, TransactionRecord};

/// Cleaned rows plus the bookkeeping of what was dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Cleaned<R> {
    pub rows: Vec<R>,
    pub diagnostics: DatasetDiagnostics,
}

/// What to do with a transaction line, decided from its channel column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelVerdict {
    /// The table has no sales-channel column: every row counts as Amazon.
    KeepUnfiltered,
    Amazon,
    NotAmazon,
}

pub struct TransactionCleaner<'a> {
    config: &'a CleaningConfig,
}

impl<'a> TransactionCleaner<'a> {
    pub fn new(config: &'a CleaningConfig) -> Self {
        Self { config }
    }

    pub fn clean(&self, records: &[TransactionRecord]) -> Cleaned<TransactionRow> {
        let mut diagnostics = DatasetDiagnostics {
            rows_read: records.len(),
            ..Default::default()
        };
        let mut rows = Vec::with_capacity(records.len());

        for record in records {
            if self.channel_verdict(record.sales_channel.as_ref()) == ChannelVerdict::NotAmazon {
                diagnostics.non_amazon_channel += 1;
                continue;
            }
            if !self.status_accepted(record.order_status.as_ref()) {
                diagnostics.excluded_status += 1;
                continue;
            }
            let Some(date) = parse_date(&record.purchase_date) else {
                diagnostics.malformed_dates += 1;
                continue;
            };

            let gross_revenue = amount(&record.item_price, &mut diagnostics);
            let promotion_discount = record
                .item_promotion_discount
                .as_ref()
                .map_or(0.0, |cell| amount(cell, &mut diagnostics));
            let units = record
                .quantity
                .as_ref()
                .map_or(0.0, |cell| amount(cell, &mut diagnostics));

            rows.push(TransactionRow {
                date,
                gross_revenue,
                promotion_discount,
                net_revenue: gross_revenue - promotion_discount,
                units,
            });
        }

        diagnostics.rows_kept = rows.len();
        Cleaned { rows, diagnostics }
    }

    pub fn channel_verdict(&self, channel: Option<&Cell>) -> ChannelVerdict {
        let Some(cell) = channel else {
            return ChannelVerdict::KeepUnfiltered;
        };
        match cell.as_text() {
            Some(name) if self.is_amazon_channel(&name) => ChannelVerdict::Amazon,
            _ => ChannelVerdict::NotAmazon,
        }
    }

    /// `Amazon`, `Amazon.com`, `amazon.co.uk` match prefix `amazon`;
    /// `Non-Amazon` and `AmazonFresh` do not.
    pub fn is_amazon_channel(&self, channel: &str) -> bool {
        let channel = channel.trim().to_lowercase();
        let prefix = self.config.amazon_channel_prefix.trim().to_lowercase();
        channel == prefix
            || channel
                .strip_prefix(&prefix)
                .is_some_and(|rest| rest.starts_with('.'))
    }

    fn status_accepted(&self, status: Option<&Cell>) -> bool {
        let accepted = &self.config.accepted_order_statuses;
        if accepted.is_empty() {
            return true;
        }
        // No status column: nothing to filter on.
        let Some(cell) = status else {
            return true;
        };
        cell.as_text()
            .is_some_and(|s| accepted.iter().any(|a| a.eq_ignore_ascii_case(&s)))
    }
}

pub fn clean_campaigns(records: &[CampaignRecord]) -> Cleaned<CampaignRow> {
    let mut diagnostics = DatasetDiagnostics {
        rows_read: records.len(),
        ..Default::default()
    };
    let mut rows = Vec::with_capacity(records.len());

    for record in records {
        let Some(date) = parse_date(&record.date) else {
            diagnostics.malformed_dates += 1;
            continue;
        };
        rows.push(CampaignRow {
            date,
            impressions: amount(&record.impressions, &mut diagnostics),
            clicks: amount(&record.clicks, &mut diagnostics),
            spend: amount(&record.spend, &mut diagnostics),
            sales: amount(&record.sales, &mut diagnostics),
            orders: amount(&record.orders, &mut diagnostics),
        });
    }

    diagnostics.rows_kept = rows.len();
    Cleaned { rows, diagnostics }
}

// ─── Cell parsing ───────────────────────────────────────────────────────────

/// Numeric content of a cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Blank,
    Parsed(f64),
    Unparseable,
}

/// Accepts plain numbers and report-formatted text such as `$1,234.50`,
/// `12.5%` or accounting negatives `(3.00)`.
pub fn parse_number(cell: &Cell) -> Numeric {
    let text = match cell {
        Cell::Empty => return Numeric::Blank,
        Cell::Number(n) if n.is_finite() => return Numeric::Parsed(*n),
        Cell::Number(_) => return Numeric::Unparseable,
        Cell::Text(text) => text.trim(),
    };

    let (negative, body) = match text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, text),
    };
    let cleaned: String = body
        .chars()
        .filter(|c| !matches!(c, '$' | '£' | '€' | ',' | '%') && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '-') {
        return Numeric::Blank;
    }
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => Numeric::Parsed(if negative { -v } else { v }),
        _ => Numeric::Unparseable,
    }
}

fn amount(cell: &Cell, diagnostics: &mut DatasetDiagnostics) -> f64 {
    match parse_number(cell) {
        Numeric::Parsed(v) => v,
        Numeric::Blank => 0.0,
        Numeric::Unparseable => {
            diagnostics.unparseable_numbers += 1;
            0.0
        }
    }
}

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S %z",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%b %d, %Y", "%B %d, %Y", "%d %b %Y"];

// Excel's day zero; serial 60 is the phantom 1900-02-29, ignored here.
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);
const EXCEL_MAX_SERIAL: f64 = 2_958_465.0;

/// Truncate a timestamp cell to its calendar date, in the timestamp's own
/// offset. Numbers are read as Excel serial dates.
pub fn parse_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Empty => None,
        Cell::Number(serial) => excel_serial_to_date(*serial),
        Cell::Text(text) => parse_date_text(text.trim()),
    }
}

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    if let Some(dt) = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(text, fmt).ok())
    {
        return Some(dt.date_naive());
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
    {
        return Some(dt.date());
    }
    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
    {
        return Some(date);
    }
    if looks_like_serial(text) {
        return text.parse::<f64>().ok().and_then(excel_serial_to_date);
    }
    // "2024-07-10 08:15:00 PDT" and similar: keep the leading ISO date as-is.
    let (head, rest) = (text.get(..10)?, text.get(10..)?);
    if !(rest.starts_with(char::is_whitespace) || rest.starts_with('T')) {
        return None;
    }
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Serial text has a decimal point or more than four digits; a bare "2024"
/// is a year, not day 2024 of the Excel calendar.
fn looks_like_serial(text: &str) -> bool {
    let digits = text.chars().filter(char::is_ascii_digit).count();
    text.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits > 0
        && (text.contains('.') || digits > 4)
}

fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=EXCEL_MAX_SERIAL).contains(&serial) {
        return None;
    }
    let (y, m, d) = EXCEL_EPOCH;
    NaiveDate::from_ymd_opt(y, m, d)?.checked_add_signed(Duration::days(serial.floor() as i64))
}

// ─── Tests ──────────────────────────────────────────────────────────────────
