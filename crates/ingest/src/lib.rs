//! Spreadsheet loading: delimited text through `csv`, workbooks through
//! `calamine`. Every format ends up as a [`RawTable`] of untyped cells.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use adlift_core::types::{Cell, DatasetKind, RawTable};
use adlift_core::{AdliftError, AdliftResult};
use calamine::{open_workbook_auto, Data, Reader};
use tracing::{debug, info, warn};

const UTF8_BOM: char = '\u{feff}';

/// Load one export file, choosing the reader from the file extension.
pub fn load_table(path: &Path, kind: DatasetKind) -> AdliftResult<RawTable> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let table = match extension.as_str() {
        "csv" => read_delimited(File::open(path)?, b',', kind)?,
        "tsv" | "txt" => read_delimited(File::open(path)?, b'\t', kind)?,
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => read_workbook(path, kind)?,
        _ => {
            return Err(AdliftError::UnsupportedFormat(format!(
                "{} (expected csv, tsv, txt, xlsx, xlsm, xls, xlsb or ods)",
                path.display()
            )))
        }
    };

    info!(
        path = %path.display(),
        kind = kind.as_str(),
        columns = table.headers.len(),
        rows = table.len(),
        "Table loaded"
    );
    if table.is_empty() {
        warn!(path = %path.display(), kind = kind.as_str(), "Table has no data rows");
    }
    Ok(table)
}

/// Parse delimited text. Every field is kept as text; typing happens later.
pub fn read_delimited<R: Read>(reader: R, delimiter: u8, kind: DatasetKind) -> AdliftResult<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(true)
        .quoting(delimiter != b'\t')
        .from_reader(reader);

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| AdliftError::Ingest(format!("record {}: {e}", line + 1)))?;
        rows.push(record.iter().map(Cell::from).collect());
    }
    Ok(build_table(kind, rows))
}

fn read_workbook(path: &Path, kind: DatasetKind) -> AdliftResult<RawTable> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| AdliftError::Ingest(format!("{}: {e}", path.display())))?;
    let sheet_names = workbook.sheet_names().to_vec();
    let Some(sheet) = sheet_names.first() else {
        return Err(AdliftError::Ingest(format!("{}: workbook has no sheets", path.display())));
    };
    debug!(sheet = %sheet, sheets = sheet_names.len(), "Reading first worksheet");

    let range = workbook
        .worksheet_range(sheet)
        .map_err(|e| AdliftError::Ingest(format!("{}: sheet '{sheet}': {e}", path.display())))?;
    let rows = range
        .rows()
        .map(|row| row.iter().map(workbook_cell).collect())
        .collect();
    Ok(build_table(kind, rows))
}

/// Native date cells become Excel serial numbers so that date parsing has a
/// single numeric path.
fn workbook_cell(data: &Data) -> Cell {
    match data {
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::from(s.as_str()),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::Error(_) | Data::Empty => Cell::Empty,
    }
}

/// First non-empty row is the header. Blank rows are skipped; data rows are
/// padded or truncated to the header width.
fn build_table(kind: DatasetKind, rows: Vec<Vec<Cell>>) -> RawTable {
    let mut rows = rows
        .into_iter()
        .filter(|row| row.iter().any(|cell| !cell.is_empty()));

    let Some(header_row) = rows.next() else {
        return RawTable::new(kind, Vec::new());
    };
    let headers: Vec<String> = header_row
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let text = cell.as_text().unwrap_or_default();
            if i == 0 {
                text.trim_start_matches(UTF8_BOM).trim().to_string()
            } else {
                text
            }
        })
        .collect();

    let width = headers.len();
    let mut table = RawTable::new(kind, headers);
    for mut row in rows {
        row.resize(width, Cell::Empty);
        table.push_row(row);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_with_bom_and_blank_lines() {
        let input = "\u{feff}purchase-date,item-price,sales-channel\n\
                     2024-07-10,100,Amazon.com\n\
                     ,,\n\
                     2024-07-11,\"1,250.00\",Amazon.com\n";
        let table = read_delimited(input.as_bytes(), b',', DatasetKind::Transactions).unwrap();

        assert_eq!(table.kind, DatasetKind::Transactions);
        assert_eq!(table.headers, vec!["purchase-date", "item-price", "sales-channel"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[1][1], Cell::Text("1,250.00".to_string()));
    }

    #[test]
    fn test_rows_padded_and_truncated_to_header() {
        let input = "Date,Impressions,Clicks\n2024-07-10,100\n2024-07-11,1,2,3\n";
        let table = read_delimited(input.as_bytes(), b',', DatasetKind::SponsoredProducts).unwrap();
        assert_eq!(table.rows[0], vec![Cell::from("2024-07-10"), Cell::from("100"), Cell::Empty]);
        assert_eq!(table.rows[1].len(), 3);
    }

    #[test]
    fn test_tab_separated_keeps_quotes() {
        let input = "date\tcampaign\n2024-07-10\t\"Prime\" Day\n";
        let table = read_delimited(input.as_bytes(), b'\t', DatasetKind::SponsoredBrands).unwrap();
        assert_eq!(table.rows[0][1], Cell::from("\"Prime\" Day"));
    }

    #[test]
    fn test_leading_blank_rows_skipped() {
        let input = ",,\n\nDate,Spend\n2024-07-10,3\n";
        let table = read_delimited(input.as_bytes(), b',', DatasetKind::SponsoredDisplay).unwrap();
        assert_eq!(table.headers, vec!["Date", "Spend"]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_empty_input() {
        let table = read_delimited("".as_bytes(), b',', DatasetKind::Transactions).unwrap();
        assert!(table.headers.is_empty());
        assert!(table.is_empty());
    }

    #[test]
    fn test_load_csv_file() {
        let path = std::env::temp_dir().join(format!("adlift-ingest-{}.csv", std::process::id()));
        std::fs::write(&path, "Date,Spend\n2024-07-10,3.5\n2024-07-11,4\n").unwrap();
        let loaded = load_table(&path, DatasetKind::SponsoredProducts);
        std::fs::remove_file(&path).unwrap();

        let table = loaded.unwrap();
        assert_eq!(table.kind, DatasetKind::SponsoredProducts);
        assert_eq!(table.headers, vec!["Date", "Spend"]);
        assert_eq!(table.rows[0], vec![Cell::from("2024-07-10"), Cell::from("3.5")]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join("adlift-ingest-does-not-exist.csv");
        assert!(matches!(
            load_table(&path, DatasetKind::Transactions),
            Err(AdliftError::Io(_))
        ));
    }

    #[test]
    fn test_load_workbook_native_dates_as_serials() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/sp_report.xlsx");
        let table = load_table(&path, DatasetKind::SponsoredProducts).unwrap();

        assert_eq!(
            table.headers,
            vec!["Date", "Impressions", "Clicks", "Spend", "Sales", "Orders"]
        );
        assert_eq!(table.len(), 1);
        // 45483 is 2024-07-10.
        assert_eq!(table.rows[0][0], Cell::Number(45483.0));
        assert_eq!(table.rows[0][1], Cell::Number(1000.0));
        assert_eq!(table.rows[0][3], Cell::Number(10.5));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = load_table(Path::new("report.pdf"), DatasetKind::Transactions).unwrap_err();
        assert!(matches!(err, AdliftError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_workbook_cells() {
        assert_eq!(workbook_cell(&Data::Int(3)), Cell::Number(3.0));
        assert_eq!(workbook_cell(&Data::String("  ".to_string())), Cell::Empty);
        assert_eq!(workbook_cell(&Data::Bool(true)), Cell::Text("true".to_string()));
        assert_eq!(workbook_cell(&Data::Empty), Cell::Empty);
    }
}
