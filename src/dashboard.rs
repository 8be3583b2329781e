use std::collections::BTreeSet;
use std::path::Path;

use crate::diagnostics::{Diagnostics, Warning};
use crate::error::Result;
use crate::ingest::{ingest, Ingested, TableKind};
use crate::matcher::{ticket_metrics, BillingCategories};
use crate::models::{AggregateRow, MonthValue, RowKind, TicketMetric};
use crate::months::{MonthCatalog, MonthLabel};
use crate::pipeline::{
    aggregate, available_months, filter_rows, kind_totals, kinds_present, profitability,
    raw_rows, select_series, series_covers, ResolvedSelection, Selection,
};
use crate::projection::{project, Projection, CANCELLATION_COLUMNS, RECORD_COLUMNS};
use crate::settings::{Settings, SheetNames};
use crate::workbook::Workbook;

/// Outcome of one dashboard section.
#[derive(Debug, Clone, PartialEq)]
pub enum Section<T> {
    Ready(T),
    /// The selection matched nothing for this section.
    NoData,
    /// The section's table is missing or unusable.
    Skipped(String),
}

impl<T> Section<T> {
    #[cfg(test)]
    pub fn ready(&self) -> Option<&T> {
        match self {
            Section::Ready(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ticket {
    /// Averaged from the billing slots of revenue rows.
    Derived(Vec<TicketMetric>),
    /// Read from the ticket summary sheet.
    Summary(Vec<MonthValue>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RevenueVsExpense {
    pub rows: Vec<AggregateRow>,
    pub totals: Vec<(RowKind, f64)>,
}

/// Everything one run produces, keyed by the selected months.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub months: Vec<MonthLabel>,
    pub billing: Section<Vec<MonthValue>>,
    pub ticket: Section<Ticket>,
    pub revenue_vs_expense: Section<RevenueVsExpense>,
    pub profit: Section<Vec<MonthValue>>,
    pub churn: Section<Vec<MonthValue>>,
    pub cancellations: Section<Vec<MonthValue>>,
    pub detail: Section<Projection>,
    pub cancellation_detail: Section<Projection>,
    pub warnings: Vec<Warning>,
}

/// Per-run configuration derived from [`Settings`].
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub catalog: MonthCatalog,
    pub billing: BillingCategories,
    pub sheets: SheetNames,
}

impl RunConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            catalog: MonthCatalog::new(&settings.ordering())?,
            billing: BillingCategories::new(&settings.billing_categories),
            sheets: settings.sheets.clone(),
        })
    }
}

/// Months present in any ingested table, in catalog order.
fn months_in_data(data: &Ingested) -> Vec<MonthLabel> {
    let mut months: BTreeSet<MonthLabel> = available_months(&data.records).into_iter().collect();
    if let Some(detail) = &data.cancellation_detail {
        months.extend(available_months(detail));
    }
    for series in data.series.values() {
        months.extend(series.iter().map(|p| p.month));
    }
    months.into_iter().collect()
}

fn series_section(data: &Ingested, table: TableKind, months: &[MonthLabel]) -> Section<Vec<MonthValue>> {
    match data.series.get(&table) {
        None => Section::Skipped(data.skip_reason(table)),
        Some(series) if !series_covers(series, months) => Section::NoData,
        Some(series) => Section::Ready(select_series(series, months)),
    }
}

/// Run the whole pipeline once over read-only source tables.
pub fn build(workbook: &Workbook, config: &RunConfig, selection: &Selection) -> Result<Dashboard> {
    let mut diag = Diagnostics::new();
    let data = ingest(workbook, &config.sheets, &config.catalog, &mut diag);

    let resolved = selection.resolve(&config.catalog, &months_in_data(&data))?;
    let months = resolved.months.clone();
    let filtered = filter_rows(&data.records, &resolved);
    tracing::debug!(
        months = months.len(),
        rows = filtered.len(),
        "applied selection"
    );

    let records_loaded = data.is_loaded(TableKind::Revenue) || data.is_loaded(TableKind::Expense);
    let records_skip = || {
        format!(
            "{}; {}",
            data.skip_reason(TableKind::Revenue),
            data.skip_reason(TableKind::Expense)
        )
    };

    let revenue_vs_expense = if !records_loaded {
        Section::Skipped(records_skip())
    } else if filtered.is_empty() {
        Section::NoData
    } else {
        let rows = aggregate(&filtered, &months, &kinds_present(&data.records));
        let totals = kind_totals(&rows);
        Section::Ready(RevenueVsExpense { rows, totals })
    };

    let profit = match &revenue_vs_expense {
        Section::Ready(rve) => Section::Ready(profitability(&rve.rows)),
        Section::NoData => Section::NoData,
        Section::Skipped(reason) => Section::Skipped(reason.clone()),
    };

    let detail_rows = raw_rows(&data.records, &resolved);
    let detail = if !records_loaded {
        Section::Skipped(records_skip())
    } else if detail_rows.is_empty() {
        Section::NoData
    } else {
        Section::Ready(project(&detail_rows, RECORD_COLUMNS))
    };

    let ticket = if data.revenue_slots {
        let revenue = filtered.of_kind(RowKind::Revenue);
        if revenue.is_empty() {
            Section::NoData
        } else {
            Section::Ready(Ticket::Derived(ticket_metrics(
                &revenue.rows,
                &config.billing,
                &months,
            )))
        }
    } else {
        match series_section(&data, TableKind::TicketSummary, &months) {
            Section::Ready(series) => Section::Ready(Ticket::Summary(series)),
            Section::NoData => Section::NoData,
            Section::Skipped(reason) => Section::Skipped(reason),
        }
    };

    let cancellation_detail = match &data.cancellation_detail {
        None => Section::Skipped(data.skip_reason(TableKind::CancellationDetail)),
        Some(rows) => {
            let selected = raw_rows(rows, &resolved_months_only(&resolved));
            if selected.is_empty() {
                Section::NoData
            } else {
                Section::Ready(project(&selected, CANCELLATION_COLUMNS))
            }
        }
    };

    if records_loaded && filtered.is_empty() {
        diag.push(Warning::EmptySelection);
    }

    Ok(Dashboard {
        billing: series_section(&data, TableKind::BillingSummary, &months),
        churn: series_section(&data, TableKind::ChurnSummary, &months),
        cancellations: series_section(&data, TableKind::CancellationSummary, &months),
        months,
        ticket,
        revenue_vs_expense,
        profit,
        detail,
        cancellation_detail,
        warnings: diag.finish(),
    })
}

/// Cancellation detail rows carry no top-level category, so only the month
/// part of a selection applies to them.
fn resolved_months_only(resolved: &ResolvedSelection) -> ResolvedSelection {
    ResolvedSelection {
        categories: None,
        ..resolved.clone()
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Source tables cached for the lifetime of an interactive session. Each
/// [`Session::run`] recomputes everything from the cache; the file is only
/// read again on [`Session::reload`].
#[derive(Debug)]
pub struct Session {
    workbook: Workbook,
    config: RunConfig,
}

impl Session {
    pub fn open(path: &Path, config: RunConfig) -> Result<Self> {
        Ok(Self::from_workbook(Workbook::open(path)?, config))
    }

    pub fn from_workbook(workbook: Workbook, config: RunConfig) -> Self {
        Self { workbook, config }
    }

    /// Re-read the source. On failure the previous tables stay cached.
    pub fn reload(&mut self) -> Result<()> {
        self.workbook = Workbook::open(self.workbook.path())?;
        Ok(())
    }

    pub fn run(&self, selection: &Selection) -> Result<Dashboard> {
        build(&self.workbook, &self.config, selection)
    }

    /// Months that can be offered in a month picker.
    pub fn available_months(&self) -> Vec<MonthLabel> {
        let mut diag = Diagnostics::new();
        let data = ingest(&self.workbook, &self.config.sheets, &self.config.catalog, &mut diag);
        months_in_data(&data)
    }

    pub fn available_categories(&self) -> Vec<String> {
        let mut diag = Diagnostics::new();
        let data = ingest(&self.workbook, &self.config.sheets, &self.config.catalog, &mut diag);
        crate::pipeline::available_categories(&data.records)
    }

    pub fn path(&self) -> &Path {
        self.workbook.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::{Cell, Sheet};

    fn sheet(name: &str, headers: &[&str], rows: &[&[&str]]) -> Sheet {
        Sheet {
            name: name.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| {
                    r.iter()
                        .map(|c| if c.is_empty() { Cell::Empty } else { Cell::Text(c.to_string()) })
                        .collect()
                })
                .collect(),
        }
    }

    fn workbook() -> Workbook {
        Workbook::from_sheets(
            "memory",
            vec![
                sheet(
                    "Receitas Combinadas",
                    &["Mes", "Valor", "Categoria", "Categoria 1", "Valor 1", "Categoria 2", "Valor 2"],
                    &[
                        &["abril", "600", "Assinatura", "MENSALIDADE TC", "50", "OUTRO", "30"],
                        &["abril", "400", "Assinatura", "", "", "", ""],
                        &["maio", "1500", "Consultoria", "MENSALIDADE TC", "60", "", ""],
                        &["setembro", "900", "Assinatura", "MENSALIDADE TC", "70", "", ""],
                    ],
                ),
                sheet(
                    "Despesas Combinadas",
                    &["Mes", "Valor", "Fornecedor"],
                    &[&["abril", "-250", "AWS"], &["junho", "100", "Google"]],
                ),
                sheet("Faturamento Mensal", &["Mes", "Faturamento"], &[&["abril", "1000"], &["maio", "1500"]]),
                sheet("Churn Rate Resumo", &["Mes", "ChurnRate"], &[&["abril", "2,5"]]),
                sheet("Cancelamentos Resumo", &["Mes", "Cancelamentos"], &[&["junho", "3"]]),
                sheet(
                    "Cancelamentos Detalhe",
                    &["Mes", "Cliente", "Motivo", "Valor"],
                    &[&["junho", "ACME", "Preço", "99"]],
                ),
            ],
        )
    }

    fn config() -> RunConfig {
        RunConfig::from_settings(&Settings {
            month_window: Some(
                ["Abril", "Maio", "Junho", "Julho", "Agosto"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            ),
            ..Settings::default()
        })
        .unwrap()
    }

    #[test]
    fn test_full_run() {
        let dash = build(&workbook(), &config(), &Selection::default()).unwrap();
        let names: Vec<_> = dash.months.iter().map(|m| m.display()).collect();
        assert_eq!(names, vec!["Abril", "Maio", "Junho"]);

        let rve = dash.revenue_vs_expense.ready().unwrap();
        assert_eq!(rve.rows.len(), 6);
        assert_eq!(rve.totals, vec![(RowKind::Revenue, 2500.0), (RowKind::Expense, 350.0)]);

        let profit = dash.profit.ready().unwrap();
        assert_eq!(profit.iter().map(|p| p.value).collect::<Vec<_>>(), vec![750.0, 1500.0, -100.0]);

        match dash.ticket.ready().unwrap() {
            Ticket::Derived(metrics) => {
                assert_eq!(metrics[0].average, 25.0);
                assert_eq!(metrics[1].average, 60.0);
                assert_eq!(metrics[2].rows, 0);
            }
            other => panic!("expected derived ticket, got {other:?}"),
        }

        assert_eq!(dash.billing.ready().unwrap()[2].value, 0.0);
        assert_eq!(dash.cancellations.ready().unwrap()[2].value, 3.0);
        assert_eq!(dash.cancellation_detail.ready().unwrap().rows.len(), 1);
        // The unrecognised "setembro" row is listed with its raw token.
        let detail = dash.detail.ready().unwrap();
        assert_eq!(detail.rows.len(), 6);
        assert_eq!(detail.headers[0], "Mês");
        assert!(detail.rows.iter().any(|r| r[0] == "setembro"));

        let unmapped: Vec<_> = dash
            .warnings
            .iter()
            .filter(|w| matches!(w, Warning::UnmappedMonths { .. }))
            .collect();
        assert_eq!(unmapped.len(), 1);
        assert!(dash
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::MissingSheet { sheet, .. } if sheet == "Ticket Medio Mensal Resumo")));
    }

    #[test]
    fn test_selection_restricts_every_section() {
        let dash = build(&workbook(), &config(), &Selection::months(["Maio"])).unwrap();
        assert_eq!(dash.months.len(), 1);
        assert_eq!(dash.revenue_vs_expense.ready().unwrap().rows.len(), 2);
        assert_eq!(dash.churn, Section::NoData);
        assert_eq!(dash.cancellation_detail, Section::NoData);
        assert_eq!(dash.billing.ready().unwrap()[0].value, 1500.0);
    }

    #[test]
    fn test_empty_selection_reports_no_data() {
        let dash = build(&workbook(), &config(), &Selection::months(["Agosto"])).unwrap();
        assert_eq!(dash.revenue_vs_expense, Section::NoData);
        assert_eq!(dash.profit, Section::NoData);
        assert_eq!(dash.detail, Section::NoData);
        assert_eq!(dash.ticket, Section::NoData);
        assert!(dash.warnings.contains(&Warning::EmptySelection));
    }

    #[test]
    fn test_unticking_every_month_reports_no_data() {
        let sel = Selection {
            months: Some(vec![]),
            ..Selection::default()
        };
        let dash = build(&workbook(), &config(), &sel).unwrap();
        assert!(dash.months.is_empty());
        assert_eq!(dash.revenue_vs_expense, Section::NoData);
        assert_eq!(dash.detail, Section::NoData);
        assert_eq!(dash.billing, Section::NoData);
        assert_eq!(dash.cancellation_detail, Section::NoData);
        assert!(dash.warnings.contains(&Warning::EmptySelection));

        let sel = Selection {
            categories: Some(vec![]),
            ..Selection::default()
        };
        let dash = build(&workbook(), &config(), &sel).unwrap();
        assert_eq!(dash.revenue_vs_expense, Section::NoData);
        assert_eq!(dash.detail, Section::NoData);
    }

    #[test]
    fn test_month_filter_hides_unmapped_detail_rows() {
        let dash = build(&workbook(), &config(), &Selection::months(["Abril"])).unwrap();
        let detail = dash.detail.ready().unwrap();
        assert_eq!(detail.rows.len(), 3);
        assert!(detail.rows.iter().all(|r| r[0] == "Abril"));
    }

    #[test]
    fn test_missing_tables_skip_sections() {
        let wb = Workbook::from_sheets(
            "memory",
            vec![sheet("Ticket Medio Mensal Resumo", &["Mes", "TicketMedio"], &[&["abril", "42"]])],
        );
        let dash = build(&wb, &config(), &Selection::default()).unwrap();
        assert!(matches!(dash.revenue_vs_expense, Section::Skipped(_)));
        assert!(matches!(dash.detail, Section::Skipped(_)));
        assert!(matches!(dash.churn, Section::Skipped(_)));
        match dash.ticket.ready().unwrap() {
            Ticket::Summary(series) => assert_eq!(series[0].value, 42.0),
            other => panic!("expected summary ticket, got {other:?}"),
        }
    }

    #[test]
    fn test_runs_are_repeatable() {
        let session = Session::from_workbook(workbook(), config());
        let sel = Selection::months(["Abril", "Junho"]);
        assert_eq!(session.run(&sel).unwrap(), session.run(&sel).unwrap());
        assert_eq!(session.available_categories(), vec!["Assinatura", "Consultoria"]);
        assert_eq!(session.available_months().len(), 3);
    }

    #[test]
    fn test_session_reload_reads_file_again() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("Receitas Combinadas.csv");
        std::fs::write(&csv, "Mes,Valor\nabril,10\n").unwrap();
        let mut session = Session::open(dir.path(), config()).unwrap();
        let total = |s: &Session| s.run(&Selection::default()).unwrap().revenue_vs_expense.ready().unwrap().totals[0].1;
        assert_eq!(total(&session), 10.0);

        std::fs::write(&csv, "Mes,Valor\nabril,10\nmaio,5\n").unwrap();
        assert_eq!(total(&session), 10.0);
        session.reload().unwrap();
        assert_eq!(total(&session), 15.0);
    }
}
