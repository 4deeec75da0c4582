//! Column reconciliation: maps the header names found in Amazon exports to
//! the canonical fields each dataset kind needs.
//!
//! Every canonical field has a priority-ordered synonym list. The first
//! synonym present in the table wins; later synonyms never override it.

use std::collections::BTreeMap;

use adlift_core::types::{Cell, DatasetKind, RawTable};
use adlift_core::MissingColumn;
use serde::Serialize;

// ─── Canonical schema ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Date,
    ItemPrice,
    ItemPromotionDiscount,
    SalesChannel,
    OrderStatus,
    Quantity,
    Impressions,
    Clicks,
    Spend,
    Sales,
    Orders,
}

impl CanonicalField {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Date => "date",
            CanonicalField::ItemPrice => "item_price",
            CanonicalField::ItemPromotionDiscount => "item_promotion_discount",
            CanonicalField::SalesChannel => "sales_channel",
            CanonicalField::OrderStatus => "order_status",
            CanonicalField::Quantity => "quantity",
            CanonicalField::Impressions => "impressions",
            CanonicalField::Clicks => "clicks",
            CanonicalField::Spend => "spend",
            CanonicalField::Sales => "sales",
            CanonicalField::Orders => "orders",
        }
    }
}

/// Accepted source names for one canonical field, highest priority first.
/// Synonyms are stored already in [`normalize_header`] form.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: CanonicalField,
    pub synonyms: &'static [&'static str],
    pub required: bool,
}

const TRANSACTION_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        field: CanonicalField::Date,
        synonyms: &["purchase date", "date", "order date", "purchased at"],
        required: true,
    },
    FieldSpec {
        field: CanonicalField::ItemPrice,
        synonyms: &["item price", "price", "item total"],
        required: true,
    },
    FieldSpec {
        field: CanonicalField::ItemPromotionDiscount,
        synonyms: &["item promotion discount", "promotion discount", "discount"],
        required: false,
    },
    FieldSpec {
        field: CanonicalField::SalesChannel,
        synonyms: &["sales channel", "channel", "marketplace"],
        required: false,
    },
    FieldSpec {
        field: CanonicalField::OrderStatus,
        synonyms: &["order status", "status"],
        required: false,
    },
    FieldSpec {
        field: CanonicalField::Quantity,
        synonyms: &["quantity", "quantity purchased", "units"],
        required: false,
    },
];

const CAMPAIGN_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        field: CanonicalField::Date,
        synonyms: &["date", "day", "start date", "report date"],
        required: true,
    },
    FieldSpec {
        field: CanonicalField::Impressions,
        synonyms: &["impressions", "impr"],
        required: true,
    },
    FieldSpec {
        field: CanonicalField::Clicks,
        synonyms: &["clicks"],
        required: true,
    },
    FieldSpec {
        field: CanonicalField::Spend,
        synonyms: &["spend", "cost", "total spend"],
        required: true,
    },
    FieldSpec {
        field: CanonicalField::Sales,
        synonyms: &[
            "sales",
            "7 day total sales",
            "14 day total sales",
            "total sales",
        ],
        required: true,
    },
    FieldSpec {
        field: CanonicalField::Orders,
        synonyms: &[
            "orders",
            "7 day total orders",
            "14 day total orders",
            "total orders",
        ],
        required: true,
    },
];

/// The synonym table for a dataset kind.
pub fn field_specs(kind: DatasetKind) -> &'static [FieldSpec] {
    match kind {
        DatasetKind::Transactions => TRANSACTION_FIELDS,
        DatasetKind::SponsoredProducts
        | DatasetKind::SponsoredBrands
        | DatasetKind::SponsoredDisplay => CAMPAIGN_FIELDS,
    }
}

/// Lowercase and collapse every run of non-alphanumeric characters into a
/// single space: `"7 Day Total Orders (#)"` → `"7 day total orders"`,
/// `"purchase-date"` → `"purchase date"`.
pub fn normalize_header(header: &str) -> String {
    let mut out = String::with_capacity(header.len());
    let mut pending_space = false;
    for ch in header.chars() {
        if ch.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_space = true;
        }
    }
    out
}

// ─── Column resolution ──────────────────────────────────────────────────────

/// Canonical field → column index, for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub kind: DatasetKind,
    columns: BTreeMap<CanonicalField, usize>,
}

impl ColumnMapping {
    pub fn index(&self, field: CanonicalField) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    fn cell(&self, row: &[Cell], field: CanonicalField) -> Option<Cell> {
        self.index(field)
            .map(|idx| row.get(idx).cloned().unwrap_or(Cell::Empty))
    }
}

/// Resolve every canonical field of `table.kind` against the table headers.
///
/// Fails with the first required field (in schema order) that no header
/// matches.
pub fn resolve_columns(table: &RawTable) -> Result<ColumnMapping, MissingColumn> {
    let headers: Vec<String> = table.headers.iter().map(|h| normalize_header(h)).collect();
    let mut columns = BTreeMap::new();

    for spec in field_specs(table.kind) {
        let found = spec
            .synonyms
            .iter()
            .find_map(|synonym| headers.iter().position(|h| h == synonym));

        match found {
            Some(idx) => {
                columns.insert(spec.field, idx);
            }
            None if spec.required => {
                return Err(MissingColumn {
                    kind: table.kind,
                    field: spec.field.as_str(),
                    candidates: spec.synonyms.to_vec(),
                });
            }
            None => {}
        }
    }

    Ok(ColumnMapping {
        kind: table.kind,
        columns,
    })
}

// ─── Normalized records ─────────────────────────────────────────────────────

/// A transaction line in canonical field order, cells still untyped.
///
/// Optional fields are `None` when the table has no such column and
/// `Some(Cell::Empty)` when the column exists but the cell is blank.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub purchase_date: Cell,
    pub item_price: Cell,
    pub item_promotion_discount: Option<Cell>,
    pub sales_channel: Option<Cell>,
    pub order_status: Option<Cell>,
    pub quantity: Option<Cell>,
}

/// An advertising report line in canonical field order, cells still untyped.
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignRecord {
    pub date: Cell,
    pub impressions: Cell,
    pub clicks: Cell,
    pub spend: Cell,
    pub sales: Cell,
    pub orders: Cell,
}

pub fn normalize_transactions(table: &RawTable) -> Result<Vec<TransactionRecord>, MissingColumn> {
    let mapping = resolve_columns(table)?;
    let required = |row: &[Cell], field| mapping.cell(row, field).unwrap_or(Cell::Empty);

    Ok(table
        .rows
        .iter()
        .map(|row| TransactionRecord {
            purchase_date: required(row, CanonicalField::Date),
            item_price: required(row, CanonicalField::ItemPrice),
            item_promotion_discount: mapping.cell(row, CanonicalField::ItemPromotionDiscount),
            sales_channel: mapping.cell(row, CanonicalField::SalesChannel),
            order_status: mapping.cell(row, CanonicalField::OrderStatus),
            quantity: mapping.cell(row, CanonicalField::Quantity),
        })
        .collect())
}

pub fn normalize_campaigns(table: &RawTable) -> Result<Vec<CampaignRecord>, MissingColumn> {
    let mapping = resolve_columns(table)?;
    let cell = |row: &[Cell], field| mapping.cell(row, field).unwrap_or(Cell::Empty);

    Ok(table
        .rows
        .iter()
        .map(|row| CampaignRecord {
            date: cell(row, CanonicalField::Date),
            impressions: cell(row, CanonicalField::Impressions),
            clicks: cell(row, CanonicalField::Clicks),
            spend: cell(row, CanonicalField::Spend),
            sales: cell(row, CanonicalField::Sales),
            orders: cell(row, CanonicalField::Orders),
        })
        .collect())
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn table(kind: DatasetKind, headers: &[&str], rows: Vec<Vec<Cell>>) -> RawTable {
        let mut t = RawTable::new(kind, headers.iter().map(|h| h.to_string()).collect());
        for row in rows {
            t.push_row(row);
        }
        t
    }

    #[test]
    fn test_normalize_header_separators() {
        assert_eq!(normalize_header("purchase-date"), "purchase date");
        assert_eq!(normalize_header("Purchase_Date"), "purchase date");
        assert_eq!(normalize_header("  7 Day Total Orders (#)"), "7 day total orders");
        assert_eq!(normalize_header("7 Day Total Sales "), "7 day total sales");
        assert_eq!(normalize_header("Spend ($)"), "spend");
    }

    #[test]
    fn test_orders_beats_seven_day_orders() {
        let t = table(
            DatasetKind::SponsoredProducts,
            &["Date", "Impressions", "Clicks", "Spend", "7 Day Total Orders (#)", "Orders", "Sales"],
            vec![],
        );
        let mapping = resolve_columns(&t).unwrap();
        assert_eq!(mapping.index(CanonicalField::Orders), Some(5));
    }

    #[test]
    fn test_fourteen_day_columns_used_when_alone() {
        let t = table(
            DatasetKind::SponsoredBrands,
            &["Date", "Impressions", "Clicks", "Cost", "14 Day Total Orders (#)", "14 Day Total Sales "],
            vec![],
        );
        let mapping = resolve_columns(&t).unwrap();
        assert_eq!(mapping.index(CanonicalField::Spend), Some(3));
        assert_eq!(mapping.index(CanonicalField::Orders), Some(4));
        assert_eq!(mapping.index(CanonicalField::Sales), Some(5));
    }

    #[test]
    fn test_missing_required_column_is_reported() {
        let t = table(
            DatasetKind::SponsoredDisplay,
            &["Date", "Impressions", "Clicks", "Spend", "Sales"],
            vec![],
        );
        let err = resolve_columns(&t).unwrap_err();
        assert_eq!(err.kind, DatasetKind::SponsoredDisplay);
        assert_eq!(err.field, "orders");
        assert_eq!(err.candidates[0], "orders");
    }

    #[test]
    fn test_optional_transaction_columns() {
        let t = table(
            DatasetKind::Transactions,
            &["purchase-date", "item-price"],
            vec![vec![Cell::from("2024-07-10"), Cell::Number(100.0)]],
        );
        let records = normalize_transactions(&t).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].item_price, Cell::Number(100.0));
        assert!(records[0].sales_channel.is_none());
        assert!(records[0].item_promotion_discount.is_none());
    }

    #[test]
    fn test_short_rows_read_as_empty() {
        let t = table(
            DatasetKind::Transactions,
            &["purchase-date", "item-price", "sales-channel"],
            vec![vec![Cell::from("2024-07-10"), Cell::Number(5.0)]],
        );
        let records = normalize_transactions(&t).unwrap();
        assert_eq!(records[0].sales_channel, Some(Cell::Empty));
    }

    #[test]
    fn test_transaction_date_prefers_purchase_date() {
        let t = table(
            DatasetKind::Transactions,
            &["date", "item-price", "purchase-date"],
            vec![],
        );
        let mapping = resolve_columns(&t).unwrap();
        assert_eq!(mapping.index(CanonicalField::Date), Some(2));
    }
}
