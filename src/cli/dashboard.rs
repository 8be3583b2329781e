use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::cli::{Context, FilterArgs};
use crate::dashboard::{Dashboard, RevenueVsExpense, Section, Ticket};
use crate::diagnostics::Warning;
use crate::error::Result;
use crate::fmt::{money, number, percent};
use crate::models::MonthValue;
use crate::projection::Projection;

pub fn run(ctx: &Context, filters: &FilterArgs) -> Result<()> {
    let session = ctx.session()?;
    let dash = session.run(&filters.selection())?;
    print_warnings(&dash.warnings);
    println!("{}", format_dashboard(&dash));
    Ok(())
}

pub fn print_warnings(warnings: &[Warning]) {
    for w in warnings {
        eprintln!("{} {w}", "Warning:".yellow().bold());
    }
}

// ---------------------------------------------------------------------------
// Pure formatting functions (dashboard → String)
// ---------------------------------------------------------------------------

fn section<T>(title: &str, section: &Section<T>, render: impl Fn(&T) -> String) -> String {
    let title = title.bold();
    match section {
        Section::Ready(value) => format!("{title}\n{}", render(value)),
        Section::NoData => format!("{title}\n  {}", "No data for the selected filters.".dimmed()),
        Section::Skipped(reason) => format!("{title}\n  {} {reason}", "Skipped:".yellow()),
    }
}

fn right(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

fn series_table(series: &[MonthValue], header: &str, fmt: impl Fn(f64) -> String) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Month", header]);
    for point in series {
        table.add_row(vec![Cell::new(point.month.display()), right(fmt(point.value))]);
    }
    table.to_string()
}

pub fn format_ticket(ticket: &Ticket) -> String {
    let mut table = Table::new();
    match ticket {
        Ticket::Derived(metrics) => {
            table.set_header(vec!["Month", "Average ticket", "Rows"]);
            for m in metrics {
                table.add_row(vec![
                    Cell::new(m.month.display()),
                    right(money(m.average)),
                    right(m.rows.to_string()),
                ]);
            }
        }
        Ticket::Summary(series) => {
            table.set_header(vec!["Month", "Average ticket"]);
            for p in series {
                table.add_row(vec![Cell::new(p.month.display()), right(money(p.value))]);
            }
        }
    }
    table.to_string()
}

pub fn format_revenue_vs_expense(data: &RevenueVsExpense) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Month", "Type", "Total"]);
    for row in &data.rows {
        table.add_row(vec![
            Cell::new(row.month.display()),
            Cell::new(row.kind.label()),
            right(money(row.total)),
        ]);
    }
    for (kind, total) in &data.totals {
        table.add_row(vec![
            Cell::new("Total".bold()),
            Cell::new(kind.label().bold()),
            right(money(*total)),
        ]);
    }
    table.to_string()
}

pub fn format_profit(series: &[MonthValue]) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Month", "Net"]);
    for p in series {
        let net = if p.value >= 0.0 {
            money(p.value).green()
        } else {
            money(p.value).red()
        };
        table.add_row(vec![
            Cell::new(p.month.display()),
            Cell::new(net).set_alignment(CellAlignment::Right),
        ]);
    }
    table.to_string()
}

pub fn format_projection(projection: &Projection) -> String {
    let mut table = Table::new();
    table.set_header(projection.headers.clone());
    for row in &projection.rows {
        table.add_row(row.clone());
    }
    table.to_string()
}

pub fn format_dashboard(dash: &Dashboard) -> String {
    let months = if dash.months.is_empty() {
        "(none)".to_string()
    } else {
        dash.months
            .iter()
            .map(|m| m.display())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let parts = [
        format!("{} {months}", "Months:".bold()),
        section("Gross Billing", &dash.billing, |s| series_table(s, "Billing", money)),
        section("Average Ticket", &dash.ticket, format_ticket),
        section("Revenue vs Expenses", &dash.revenue_vs_expense, format_revenue_vs_expense),
        section("Monthly Profitability", &dash.profit, |s| format_profit(s)),
        section("Churn Rate", &dash.churn, |s| series_table(s, "Churn", percent)),
        section("Cancellations", &dash.cancellations, |s| {
            series_table(s, "Cancellations", |v| number(v, 0))
        }),
        section("Detail", &dash.detail, format_projection),
        section("Cancellation Detail", &dash.cancellation_detail, format_projection),
    ];
    parts.join("\n\n")
}
