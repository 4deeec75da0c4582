//! Ad Lift: sales and advertising performance across named date windows.
//!
//! Loads the transaction log and the SP, SB and SD campaign reports, then
//! prints per-period metrics as a table, CSV or JSON.

use std::fs;
use std::path::{Path, PathBuf};

use adlift_core::types::{DataSummary, DatasetKind, MetricsRow, PeriodDefinition, RawTable};
use adlift_core::AppConfig;
use adlift_ingest::load_table;
use adlift_reporting::export::{
    lift_to_csv, render_lift_table, render_summary, render_table, report_to_json, to_csv,
};
use adlift_reporting::{lift_matrix, AnalysisPipeline};
use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "adlift")]
#[command(about = "Sales and advertising lift across lead-in, event and lead-out periods")]
#[command(version)]
struct Cli {
    /// Order/transaction export (csv, tsv, txt, xlsx, xls, xlsb, ods)
    #[arg(long)]
    transactions: Option<PathBuf>,

    /// Sponsored Products report
    #[arg(long)]
    sp: Option<PathBuf>,

    /// Sponsored Brands report
    #[arg(long)]
    sb: Option<PathBuf>,

    /// Sponsored Display report
    #[arg(long)]
    sd: Option<PathBuf>,

    /// Lead-in window, START..END (inclusive, YYYY-MM-DD)
    #[arg(long, value_parser = parse_range)]
    lead_in: Option<(NaiveDate, NaiveDate)>,

    /// Lead-out window, START..END
    #[arg(long, value_parser = parse_range)]
    lead_out: Option<(NaiveDate, NaiveDate)>,

    /// Extra named window, NAME=START..END (repeatable)
    #[arg(long = "period", value_parser = parse_named_period)]
    periods: Vec<PeriodDefinition>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Table)]
    format: Format,

    /// Write to this file instead of stdout. With `--format csv --lift` the
    /// lift table goes to a sibling `<stem>-lift.csv`
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Date-by-date table instead of periods; cannot be combined with
    /// period flags
    #[arg(long, default_value_t = false)]
    daily: bool,

    /// Append period-over-period lift
    #[arg(long, default_value_t = false)]
    lift: bool,

    /// Configuration file (TOML); `adlift.toml` in the working directory is
    /// picked up when present. Without `cleaning.accepted_order_statuses`
    /// only `Shipped` orders are kept
    #[arg(long, env = "ADLIFT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Csv,
    Json,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adlift=info".into()),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    validate_flags(&cli)?;

    let config = AppConfig::load(cli.config.as_deref())
        .with_context(|| "failed to load configuration")?;

    let tables = load_tables(&cli)?;
    let pipeline = AnalysisPipeline::new(&config.cleaning);

    let (summary, rows, diagnostics) = if cli.daily {
        let report = pipeline.daily(&tables);
        (report.summary, report.rows, report.diagnostics)
    } else {
        let periods = collect_periods(&cli)?;
        let report = pipeline.run(&tables, &periods)?;
        (report.summary, report.rows, report.diagnostics)
    };

    if !diagnostics.is_clean() {
        warn!(
            missing_columns = diagnostics.missing_columns.len(),
            absent_datasets = ?diagnostics.absent_datasets,
            undated_datasets = ?diagnostics.undated_datasets,
            empty_periods = ?diagnostics.empty_periods,
            dropped_rows = diagnostics.dropped_rows(),
            "Input was not fully usable"
        );
    }

    let rendered = render(&cli, &config, &summary, &rows)?;
    match &cli.output {
        Some(path) => {
            write_file(path, &rendered.report)?;
            info!(path = %path.display(), rows = rows.len(), "Report written");
            if let Some(lift_csv) = &rendered.lift_csv {
                let lift_path = lift_csv_path(path);
                write_file(&lift_path, lift_csv)?;
                info!(path = %lift_path.display(), "Lift table written");
            }
        }
        None => print!("{}", rendered.report),
    }
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> anyhow::Result<()> {
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

/// Reject flag combinations that would be silently ignored or would mix two
/// documents in one output.
fn validate_flags(cli: &Cli) -> anyhow::Result<()> {
    if cli.daily && (cli.lead_in.is_some() || cli.lead_out.is_some() || !cli.periods.is_empty()) {
        bail!("--daily cannot be combined with --lead-in, --lead-out or --period");
    }
    if cli.format == Format::Csv && cli.lift && cli.output.is_none() {
        bail!("--format csv --lift needs --output; the lift table is written next to it");
    }
    Ok(())
}

/// `report.csv` becomes `report-lift.csv` in the same directory.
fn lift_csv_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    output.with_file_name(format!("{stem}-lift.csv"))
}

fn load_tables(cli: &Cli) -> anyhow::Result<Vec<RawTable>> {
    let inputs = [
        (DatasetKind::Transactions, &cli.transactions),
        (DatasetKind::SponsoredProducts, &cli.sp),
        (DatasetKind::SponsoredBrands, &cli.sb),
        (DatasetKind::SponsoredDisplay, &cli.sd),
    ];
    let mut tables = Vec::new();
    for (kind, path) in inputs {
        if let Some(path) = path {
            let table = load_table(path, kind)
                .with_context(|| format!("failed to load {kind} from {}", path.display()))?;
            tables.push(table);
        }
    }
    if tables.is_empty() {
        bail!("no input files given (use --transactions, --sp, --sb or --sd)");
    }
    Ok(tables)
}

/// Lead-in first, extra windows in the order given, lead-out last.
fn collect_periods(cli: &Cli) -> anyhow::Result<Vec<PeriodDefinition>> {
    let mut periods = Vec::new();
    if let Some((start, end)) = cli.lead_in {
        periods.push(PeriodDefinition::new("lead-in", start, end));
    }
    periods.extend(cli.periods.iter().cloned());
    if let Some((start, end)) = cli.lead_out {
        periods.push(PeriodDefinition::new("lead-out", start, end));
    }
    if periods.is_empty() {
        bail!("at least one period is required (--lead-in, --lead-out or --period)");
    }
    Ok(periods)
}

/// The main document plus, for CSV with lift, the separate lift document.
#[derive(Debug)]
struct Rendered {
    report: String,
    lift_csv: Option<String>,
}

fn render(cli: &Cli, config: &AppConfig, summary: &DataSummary, rows: &[MetricsRow]) -> anyhow::Result<Rendered> {
    let lifts = if cli.lift { lift_matrix(rows) } else { Vec::new() };
    let export = &config.export;

    let rendered = match cli.format {
        Format::Table => {
            let mut report = render_summary(summary, export);
            report.push('\n');
            report.push_str(&render_table(rows, export));
            if cli.lift {
                report.push('\n');
                report.push_str(&render_lift_table(&lifts, export));
            }
            Rendered { report, lift_csv: None }
        }
        // The summary is logged rather than mixed into the CSV document.
        Format::Csv => Rendered {
            report: to_csv(rows, export)?,
            lift_csv: if cli.lift { Some(lift_to_csv(&lifts, export)?) } else { None },
        },
        Format::Json => {
            let mut report = report_to_json(summary, rows, cli.lift.then_some(lifts.as_slice()))?;
            report.push('\n');
            Rendered { report, lift_csv: None }
        }
    };
    Ok(rendered)
}

fn parse_date(text: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{text}': {e} (expected YYYY-MM-DD)"))
}

/// `START..END`, or a single date for a one-day window.
fn parse_range(text: &str) -> Result<(NaiveDate, NaiveDate), String> {
    match text.split_once("..") {
        Some((start, end)) => Ok((parse_date(start)?, parse_date(end)?)),
        None => {
            let day = parse_date(text)?;
            Ok((day, day))
        }
    }
}

fn parse_named_period(text: &str) -> Result<PeriodDefinition, String> {
    let Some((name, range)) = text.split_once('=') else {
        return Err(format!("expected NAME=START..END, got '{text}'"));
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("period name is empty in '{text}'"));
    }
    let (start, end) = parse_range(range)?;
    Ok(PeriodDefinition::new(name, start, end))
}
