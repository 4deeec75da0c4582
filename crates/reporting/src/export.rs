//! CSV, JSON and plain-text renderings of metrics and lift rows.

use adlift_core::types::{DataSummary, LiftRow, MetricValue, MetricsRow};
use adlift_core::{AdliftError, AdliftResult, ExportConfig};
use serde::Serialize;

/// One row per period: `period`, `start_date`, `end_date`, then every
/// measure and metric. Undefined metrics are written as the configured label.
pub fn to_csv(rows: &[MetricsRow], config: &ExportConfig) -> AdliftResult<String> {
    let mut header = vec![
        "period".to_string(),
        "start_date".to_string(),
        "end_date".to_string(),
    ];
    header.extend(MetricsRow::column_names());

    let records = rows.iter().map(|row| {
        let mut record = vec![
            row.period.clone(),
            row.start_date.to_string(),
            row.end_date.to_string(),
        ];
        record.extend(render_values(row.named_values(), config));
        record
    });
    write_csv(header, records, config)
}

/// One row per compared pair: `baseline`, `comparison`, then every lift
/// percentage.
pub fn lift_to_csv(lifts: &[LiftRow], config: &ExportConfig) -> AdliftResult<String> {
    let mut header = vec!["baseline".to_string(), "comparison".to_string()];
    header.extend(MetricsRow::column_names());

    let records = lifts.iter().map(|lift| {
        let mut record = vec![lift.baseline.clone(), lift.comparison.clone()];
        record.extend(render_values(lift.entries.iter().cloned(), config));
        record
    });
    write_csv(header, records, config)
}

#[derive(Serialize)]
struct ReportDocument<'a> {
    summary: &'a DataSummary,
    rows: &'a [MetricsRow],
    #[serde(skip_serializing_if = "Option::is_none")]
    lifts: Option<&'a [LiftRow]>,
}

/// `{"summary": {...}, "rows": [...], "lifts": [...]}` in one document;
/// `lifts` is omitted when `None`.
pub fn report_to_json(summary: &DataSummary, rows: &[MetricsRow], lifts: Option<&[LiftRow]>) -> AdliftResult<String> {
    Ok(serde_json::to_string_pretty(&ReportDocument {
        summary,
        rows,
        lifts,
    })?)
}

/// Terminal block describing everything loaded, before any period applies.
pub fn render_summary(summary: &DataSummary, config: &ExportConfig) -> String {
    let date = |d: Option<chrono::NaiveDate>| d.map_or_else(|| "-".to_string(), |d| d.to_string());
    let amount = |v: f64| format!("{:.*}", config.precision, v);
    let lines = [
        ("days_of_data", summary.days.to_string()),
        ("first_date", date(summary.first_date)),
        ("last_date", date(summary.last_date)),
        ("orders", amount(summary.sales.orders)),
        ("units", amount(summary.sales.units)),
        ("net_revenue", amount(summary.sales.net_revenue)),
        ("ads_spend", amount(summary.ads.spend)),
        ("ads_sales", amount(summary.ads.sales)),
        ("ads_orders", amount(summary.ads.orders)),
    ];

    let label_width = lines.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
    let width = lines.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
    let mut out = String::from("data summary\n");
    for (label, value) in &lines {
        push_line(&mut out, label, &[value], label_width, &[width]);
    }
    out
}

/// Terminal table with periods as columns and one line per named value.
pub fn render_table(rows: &[MetricsRow], config: &ExportConfig) -> String {
    let names = MetricsRow::column_names();
    let columns: Vec<Vec<String>> = rows
        .iter()
        .map(|row| render_values(row.named_values(), config).collect())
        .collect();

    let label_width = names
        .iter()
        .map(String::len)
        .chain(std::iter::once("metric".len()))
        .max()
        .unwrap_or(0);
    let widths: Vec<usize> = rows
        .iter()
        .zip(&columns)
        .map(|(row, values)| {
            values
                .iter()
                .map(String::len)
                .chain([row.period.len(), row.start_date.to_string().len()])
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    let periods: Vec<&str> = rows.iter().map(|r| r.period.as_str()).collect();
    push_line(&mut out, "metric", &periods, label_width, &widths);
    let starts: Vec<String> = rows.iter().map(|r| r.start_date.to_string()).collect();
    let ends: Vec<String> = rows.iter().map(|r| r.end_date.to_string()).collect();
    push_line(&mut out, "start_date", &starts, label_width, &widths);
    push_line(&mut out, "end_date", &ends, label_width, &widths);
    for (i, name) in names.iter().enumerate() {
        let cells: Vec<&str> = columns.iter().map(|c| c[i].as_str()).collect();
        push_line(&mut out, name, &cells, label_width, &widths);
    }
    out
}

/// Terminal table of lifts with one column per compared pair.
pub fn render_lift_table(lifts: &[LiftRow], config: &ExportConfig) -> String {
    let names = MetricsRow::column_names();
    let titles: Vec<String> = lifts
        .iter()
        .map(|l| format!("{} vs {}", l.comparison, l.baseline))
        .collect();
    let columns: Vec<Vec<String>> = lifts
        .iter()
        .map(|l| render_values(l.entries.iter().cloned(), config).collect())
        .collect();

    let label_width = names.iter().map(String::len).max().unwrap_or(0).max("lift %".len());
    let widths: Vec<usize> = titles
        .iter()
        .zip(&columns)
        .map(|(title, values)| values.iter().map(String::len).chain([title.len()]).max().unwrap_or(0))
        .collect();

    let mut out = String::new();
    push_line(&mut out, "lift %", &titles, label_width, &widths);
    for (i, name) in names.iter().enumerate() {
        let cells: Vec<&str> = columns.iter().map(|c| c[i].as_str()).collect();
        push_line(&mut out, name, &cells, label_width, &widths);
    }
    out
}

fn push_line<S: AsRef<str>>(out: &mut String, label: &str, cells: &[S], label_width: usize, widths: &[usize]) {
    out.push_str(&format!("{label:<label_width$}"));
    for (cell, width) in cells.iter().zip(widths) {
        out.push_str(&format!("  {:>width$}", cell.as_ref(), width = *width));
    }
    out.push('\n');
}

fn render_values<'a>(
    values: impl IntoIterator<Item = (String, MetricValue)> + 'a,
    config: &'a ExportConfig,
) -> impl Iterator<Item = String> + 'a {
    values
        .into_iter()
        .map(move |(_, value)| value.render(config.precision, &config.undefined_label))
}

fn write_csv(
    header: Vec<String>,
    records: impl Iterator<Item = Vec<String>>,
    config: &ExportConfig,
) -> AdliftResult<String> {
    let delimiter = u8::try_from(config.delimiter)
        .map_err(|_| AdliftError::Export(format!("delimiter {:?} is not a single byte", config.delimiter)))?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer
        .write_record(&header)
        .map_err(|e| AdliftError::Export(e.to_string()))?;
    for record in records {
        writer
            .write_record(&record)
            .map_err(|e| AdliftError::Export(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AdliftError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| AdliftError::Export(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use adlift_core::types::{AdMeasures, DatasetKind, PeriodDefinition, PeriodSummary, SalesMeasures};
    use chrono::NaiveDate;

    use crate::lift::compute_lift;
    use crate::metrics::calculate;
    use crate::period::PeriodBreakdown;

    fn row(name: &str, spend: f64) -> MetricsRow {
        let date = NaiveDate::from_ymd_opt(2024, 7, 10).unwrap();
        let summary = |kind, measures| PeriodSummary {
            period: name.to_string(),
            kind,
            active_days: 1,
            measures,
        };
        calculate(&PeriodBreakdown {
            period: PeriodDefinition::new(name, date, date),
            active_days: 1,
            transactions: PeriodSummary {
                period: name.to_string(),
                kind: DatasetKind::Transactions,
                active_days: 1,
                measures: SalesMeasures {
                    orders: 1.0,
                    units: 1.0,
                    gross_revenue: 100.0,
                    promotion_discount: 10.0,
                    net_revenue: 90.0,
                },
            },
            sponsored_products: summary(
                DatasetKind::SponsoredProducts,
                AdMeasures {
                    impressions: 1000.0,
                    clicks: 20.0,
                    spend,
                    sales: 50.0,
                    orders: 2.0,
                },
            ),
            sponsored_brands: summary(DatasetKind::SponsoredBrands, AdMeasures::default()),
            sponsored_display: summary(DatasetKind::SponsoredDisplay, AdMeasures::default()),
        })
    }

    #[test]
    fn test_csv_header_and_labels() {
        let csv = to_csv(&[row("lead-in", 10.0)], &ExportConfig::default()).unwrap();
        let mut lines = csv.lines();
        let header: Vec<&str> = lines.next().unwrap().split(',').collect();
        let values: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(&header[..3], &["period", "start_date", "end_date"]);
        assert_eq!(header.len(), values.len());

        let field = |name: &str| values[header.iter().position(|h| *h == name).unwrap()];
        assert_eq!(field("period"), "lead-in");
        assert_eq!(field("net_revenue"), "90.00");
        assert_eq!(field("sp_ctr"), "2.00");
        assert_eq!(field("sb_ctr"), "N/A");
        assert_eq!(field("tacos"), "7.14");
    }

    #[test]
    fn test_csv_custom_delimiter_and_label() {
        let config = ExportConfig {
            undefined_label: "undefined".to_string(),
            precision: 1,
            delimiter: ';',
        };
        let csv = to_csv(&[row("event", 10.0)], &config).unwrap();
        assert!(csv.starts_with("period;start_date;end_date;orders"));
        assert!(csv.contains(";undefined;"));
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        let config = ExportConfig {
            delimiter: '→',
            ..Default::default()
        };
        assert!(matches!(to_csv(&[], &config), Err(AdliftError::Export(_))));
    }

    #[test]
    fn test_json_keeps_undefined_tag() {
        let json = report_to_json(&DataSummary::default(), &[row("lead-in", 10.0)], None).unwrap();
        assert!(json.contains(r#""status": "undefined""#));
        let document: serde_json::Value = serde_json::from_str(&json).unwrap();
        let parsed: Vec<MetricsRow> = serde_json::from_value(document["rows"].clone()).unwrap();
        assert_eq!(parsed[0].period, "lead-in");
        assert!(parsed[0].sponsored_brands.ratios.ctr.is_undefined());
        assert_eq!(parsed[0].sponsored_products.ratios.cpa, MetricValue::Value(5.0));
    }

    fn summary() -> DataSummary {
        DataSummary {
            days: 2,
            first_date: NaiveDate::from_ymd_opt(2024, 7, 9),
            last_date: NaiveDate::from_ymd_opt(2024, 7, 11),
            sales: SalesMeasures {
                orders: 1.0,
                net_revenue: 90.0,
                ..Default::default()
            },
            ads: AdMeasures {
                spend: 10.0,
                sales: 50.0,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_summary_block() {
        let text = render_summary(&summary(), &ExportConfig::default());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "data summary");
        assert!(lines[1].starts_with("days_of_data") && lines[1].ends_with('2'));
        assert!(text.lines().any(|l| l.starts_with("first_date") && l.ends_with("2024-07-09")));
        assert!(text.lines().any(|l| l.starts_with("net_revenue") && l.ends_with("90.00")));
        assert!(text.lines().any(|l| l.starts_with("ads_spend") && l.ends_with("10.00")));

        let empty = render_summary(&DataSummary::default(), &ExportConfig::default());
        assert!(empty.lines().any(|l| l.starts_with("last_date") && l.ends_with('-')));
    }

    #[test]
    fn test_report_json_document() {
        let rows = vec![row("lead-in", 10.0), row("event", 20.0)];
        let lifts = crate::lift::lift_matrix(&rows);
        let json: serde_json::Value =
            serde_json::from_str(&report_to_json(&summary(), &rows, Some(&lifts)).unwrap()).unwrap();
        assert_eq!(json["summary"]["days"], 2);
        assert_eq!(json["summary"]["first_date"], "2024-07-09");
        assert_eq!(json["rows"].as_array().unwrap().len(), 2);
        assert_eq!(json["lifts"][0]["comparison"], "event");

        let json: serde_json::Value =
            serde_json::from_str(&report_to_json(&summary(), &rows, None).unwrap()).unwrap();
        assert!(json.get("lifts").is_none());
    }

    #[test]
    fn test_lift_csv() {
        let lift = compute_lift(&row("lead-in", 10.0), &row("event", 20.0));
        let csv = lift_to_csv(&[lift], &ExportConfig::default()).unwrap();
        let mut lines = csv.lines();
        let header: Vec<&str> = lines.next().unwrap().split(',').collect();
        let values: Vec<&str> = lines.next().unwrap().split(',').collect();
        let field = |name: &str| values[header.iter().position(|h| *h == name).unwrap()];
        assert_eq!(field("baseline"), "lead-in");
        assert_eq!(field("sp_spend"), "100.00");
        assert_eq!(field("sp_clicks"), "0.00");
        assert_eq!(field("sb_spend"), "N/A");
    }

    #[test]
    fn test_table_has_a_line_per_value() {
        let text = render_table(&[row("lead-in", 10.0), row("lead-out", 5.0)], &ExportConfig::default());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), MetricsRow::column_names().len() + 3);
        assert!(lines[0].starts_with("metric"));
        assert!(lines[0].contains("lead-in") && lines[0].contains("lead-out"));
        assert!(text.lines().any(|l| l.starts_with("sb_roas") && l.contains("N/A")));
    }

    #[test]
    fn test_lift_table_titles() {
        let lift = compute_lift(&row("lead-in", 10.0), &row("event", 20.0));
        let text = render_lift_table(&[lift], &ExportConfig::default());
        let first = text.lines().next().unwrap();
        assert!(first.starts_with("lift %"));
        assert!(first.ends_with("event vs lead-in"));
        assert!(text.lines().any(|l| l.starts_with("sp_spend") && l.ends_with("100.00")));
    }
}
