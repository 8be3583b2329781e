use std::collections::{BTreeMap, BTreeSet};

use chrono::Datelike;

use crate::diagnostics::{Diagnostics, Warning};
use crate::fmt::money;
use crate::models::{CategorySlot, MonthValue, Row, RowKind, RowSet, SLOT_COUNT};
use crate::months::MonthCatalog;
use crate::settings::SheetNames;
use crate::workbook::{cell_at, Cell, Sheet, Workbook};

pub const COL_MONTH: &str = "Mes";
pub const COL_DATE: &str = "Data";
pub const COL_AMOUNT: &str = "Valor";
pub const COL_CATEGORY: &str = "Categoria";
pub const COL_KIND: &str = "Tipo";

// ---------------------------------------------------------------------------
// Table kinds and their declared schemas
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableKind {
    Revenue,
    Expense,
    BillingSummary,
    TicketSummary,
    CancellationSummary,
    ChurnSummary,
    CancellationDetail,
}

/// What a table must contain to be usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// Line items: `Valor` plus a month source (`Mes` or `Data`).
    Rows(RowKind),
    /// One value per month: `Mes` plus the named value column.
    Summary(&'static str),
}

impl TableKind {
    pub const ALL: [TableKind; 7] = [
        TableKind::Revenue,
        TableKind::Expense,
        TableKind::BillingSummary,
        TableKind::TicketSummary,
        TableKind::CancellationSummary,
        TableKind::ChurnSummary,
        TableKind::CancellationDetail,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Revenue => "revenue",
            Self::Expense => "expenses",
            Self::BillingSummary => "monthly billing",
            Self::TicketSummary => "ticket summary",
            Self::CancellationSummary => "cancellation summary",
            Self::ChurnSummary => "churn summary",
            Self::CancellationDetail => "cancellation detail",
        }
    }

    pub fn sheet<'a>(&self, names: &'a SheetNames) -> &'a str {
        match self {
            Self::Revenue => &names.revenue,
            Self::Expense => &names.expense,
            Self::BillingSummary => &names.billing,
            Self::TicketSummary => &names.ticket,
            Self::CancellationSummary => &names.cancellations,
            Self::ChurnSummary => &names.churn,
            Self::CancellationDetail => &names.cancellation_detail,
        }
    }

    pub fn schema(&self) -> Schema {
        match self {
            Self::Revenue => Schema::Rows(RowKind::Revenue),
            Self::Expense => Schema::Rows(RowKind::Expense),
            Self::CancellationDetail => Schema::Rows(RowKind::CancellationDetail),
            Self::BillingSummary => Schema::Summary("Faturamento"),
            Self::TicketSummary => Schema::Summary("TicketMedio"),
            Self::CancellationSummary => Schema::Summary("Cancelamentos"),
            Self::ChurnSummary => Schema::Summary("ChurnRate"),
        }
    }
}

pub fn slot_category_column(i: usize) -> String {
    format!("{COL_CATEGORY} {i}")
}

pub fn slot_amount_column(i: usize) -> String {
    format!("{COL_AMOUNT} {i}")
}

// ---------------------------------------------------------------------------
// Capability check, done once per table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct RowColumns {
    month: usize,
    month_is_date: bool,
    amount: usize,
    category: Option<usize>,
    /// (category column, amount column) for each slot present in the sheet.
    slots: [Option<(usize, Option<usize>)>; SLOT_COUNT],
}

impl RowColumns {
    fn detect(sheet: &Sheet) -> std::result::Result<Self, String> {
        let amount = sheet
            .column(COL_AMOUNT)
            .ok_or_else(|| COL_AMOUNT.to_string())?;
        let (month, month_is_date) = match (sheet.column(COL_MONTH), sheet.column(COL_DATE)) {
            (Some(idx), _) => (idx, false),
            (None, Some(idx)) => (idx, true),
            (None, None) => return Err(format!("{COL_MONTH}/{COL_DATE}")),
        };
        let mut slots = [None; SLOT_COUNT];
        for (i, slot) in slots.iter_mut().enumerate() {
            if let Some(cat) = sheet.column(&slot_category_column(i + 1)) {
                *slot = Some((cat, sheet.column(&slot_amount_column(i + 1))));
            }
        }
        Ok(Self {
            month,
            month_is_date,
            amount,
            category: sheet.column(COL_CATEGORY),
            slots,
        })
    }

    fn has_slots(&self) -> bool {
        self.slots.iter().any(Option::is_some)
    }

    fn month_token(&self, row: &[Cell]) -> String {
        let cell = cell_at(row, self.month);
        if self.month_is_date {
            if let Some(date) = cell.as_date() {
                return date.month().to_string();
            }
        }
        cell.as_text()
    }
}

// ---------------------------------------------------------------------------
// Ingestion
// ---------------------------------------------------------------------------

/// Source tables converted to rows and month series for one run.
#[derive(Debug, Clone, Default)]
pub struct Ingested {
    /// Revenue and expense rows.
    pub records: RowSet,
    pub cancellation_detail: Option<RowSet>,
    pub series: BTreeMap<TableKind, Vec<MonthValue>>,
    pub loaded: BTreeSet<TableKind>,
    /// Why each unusable table was skipped.
    pub unavailable: BTreeMap<TableKind, Warning>,
    /// The revenue table carries `Categoria N` slot columns.
    pub revenue_slots: bool,
}

impl Ingested {
    pub fn is_loaded(&self, table: TableKind) -> bool {
        self.loaded.contains(&table)
    }

    pub fn skip_reason(&self, table: TableKind) -> String {
        self.unavailable
            .get(&table)
            .map(|w| w.to_string())
            .unwrap_or_else(|| format!("{} data unavailable", table.name()))
    }
}

pub fn ingest(
    workbook: &Workbook,
    sheets: &SheetNames,
    catalog: &MonthCatalog,
    diag: &mut Diagnostics,
) -> Ingested {
    let mut out = Ingested::default();

    for table in TableKind::ALL {
        let sheet_name = table.sheet(sheets);
        let Some(sheet) = workbook.sheet(sheet_name) else {
            let warning = Warning::MissingSheet {
                table: table.name(),
                sheet: sheet_name.to_string(),
            };
            diag.push(warning.clone());
            out.unavailable.insert(table, warning);
            continue;
        };

        match table.schema() {
            Schema::Rows(kind) => {
                let cols = match RowColumns::detect(sheet) {
                    Ok(cols) => cols,
                    Err(column) => {
                        skip_missing_column(&mut out, diag, table, sheet, &column);
                        continue;
                    }
                };
                let rows = read_rows(sheet, &cols, kind, catalog, diag);
                tracing::debug!(sheet = %sheet.name, rows = rows.len(), "ingested rows");
                match kind {
                    RowKind::CancellationDetail => out.cancellation_detail = Some(rows),
                    _ => {
                        if kind == RowKind::Revenue {
                            out.revenue_slots = cols.has_slots();
                        }
                        out.records = std::mem::take(&mut out.records).merge(rows);
                    }
                }
            }
            Schema::Summary(value_col) => match read_series(sheet, value_col, catalog, diag) {
                Ok(series) => {
                    tracing::debug!(sheet = %sheet.name, points = series.len(), "ingested series");
                    out.series.insert(table, series);
                }
                Err(column) => {
                    skip_missing_column(&mut out, diag, table, sheet, &column);
                    continue;
                }
            },
        }
        out.loaded.insert(table);
    }

    out
}

fn skip_missing_column(
    out: &mut Ingested,
    diag: &mut Diagnostics,
    table: TableKind,
    sheet: &Sheet,
    column: &str,
) {
    let warning = Warning::MissingColumn {
        sheet: sheet.name.clone(),
        column: column.to_string(),
    };
    diag.push(warning.clone());
    out.unavailable.insert(table, warning);
}

fn is_blank(row: &[Cell]) -> bool {
    row.iter().all(Cell::is_empty)
}

fn read_rows(
    sheet: &Sheet,
    cols: &RowColumns,
    kind: RowKind,
    catalog: &MonthCatalog,
    diag: &mut Diagnostics,
) -> RowSet {
    let month_header = sheet
        .column(COL_MONTH)
        .map(|i| sheet.headers[i].clone())
        .unwrap_or_else(|| COL_MONTH.to_string());
    let amount_header = sheet.headers[cols.amount].clone();

    let mut columns: Vec<String> = sheet
        .headers
        .iter()
        .filter(|h| !h.trim().is_empty())
        .cloned()
        .collect();
    for synthetic in [month_header.as_str(), COL_KIND] {
        if sheet.column(synthetic).is_none() {
            columns.push(synthetic.to_string());
        }
    }

    let mut rows = Vec::new();
    for cells in sheet.rows.iter().filter(|r| !is_blank(r)) {
        let raw_month = cols.month_token(cells);
        let month = catalog.normalize(&raw_month);
        if month.is_none() {
            diag.unmapped_month(&raw_month);
        }

        let mut amount = cell_at(cells, cols.amount).as_amount();
        if kind == RowKind::Expense {
            amount = amount.abs();
        }

        let mut row = Row::new(kind, raw_month.clone(), month, amount);
        row.category = cols
            .category
            .map(|i| cell_at(cells, i).as_text())
            .filter(|s| !s.is_empty());
        for (slot, spec) in row.slots.iter_mut().zip(cols.slots.iter()) {
            if let Some((cat, amt)) = spec {
                let label = cell_at(cells, *cat).as_text();
                *slot = CategorySlot {
                    label: (!label.is_empty()).then_some(label),
                    amount: amt.map(|i| cell_at(cells, i).as_amount()).unwrap_or(0.0),
                };
            }
        }

        for (i, header) in sheet.headers.iter().enumerate() {
            if !header.trim().is_empty() {
                row.fields.insert(header.clone(), cell_at(cells, i).as_text());
            }
        }
        row.fields.insert(amount_header.clone(), money(amount));
        row.fields.insert(
            month_header.clone(),
            month.map(|m| m.display().to_string()).unwrap_or(raw_month),
        );
        row.fields
            .entry(COL_KIND.to_string())
            .or_insert_with(|| kind.label().to_string());

        rows.push(row);
    }

    RowSet::new(columns, rows)
}

fn read_series(
    sheet: &Sheet,
    value_col: &str,
    catalog: &MonthCatalog,
    diag: &mut Diagnostics,
) -> std::result::Result<Vec<MonthValue>, String> {
    let month_idx = sheet.column(COL_MONTH).ok_or_else(|| COL_MONTH.to_string())?;
    let value_idx = sheet.column(value_col).ok_or_else(|| value_col.to_string())?;

    let mut series = Vec::new();
    for cells in sheet.rows.iter().filter(|r| !is_blank(r)) {
        let raw = cell_at(cells, month_idx).as_text();
        match catalog.normalize(&raw) {
            Some(month) => series.push(MonthValue {
                month,
                value: cell_at(cells, value_idx).as_amount(),
            }),
            None => diag.unmapped_month(&raw),
        }
    }
    Ok(series)
}
