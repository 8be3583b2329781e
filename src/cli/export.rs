use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::cli::dashboard::print_warnings;
use crate::cli::{Context, FilterArgs};
use crate::dashboard::{Dashboard, Section, Ticket};
use crate::error::Result;

pub fn run(ctx: &Context, dir: &str, filters: &FilterArgs) -> Result<()> {
    let session = ctx.session()?;
    let dash = session.run(&filters.selection())?;
    print_warnings(&dash.warnings);

    let dir = PathBuf::from(dir);
    std::fs::create_dir_all(&dir)?;
    for (name, written) in write_all(&dash, &dir)? {
        if written {
            println!("Wrote {}", dir.join(name).display());
        } else {
            println!("{} {name}: nothing to export", "Skipping".yellow());
        }
    }
    Ok(())
}

/// Write one CSV per exportable section. Returns (file name, written) pairs.
pub fn write_all(dash: &Dashboard, dir: &Path) -> Result<Vec<(&'static str, bool)>> {
    let mut results = Vec::new();

    let aggregate = match &dash.revenue_vs_expense {
        Section::Ready(data) => {
            let rows = data
                .rows
                .iter()
                .map(|r| vec![r.month.display().to_string(), r.kind.label().to_string(), amount(r.total)])
                .collect();
            write_csv(&dir.join("aggregate.csv"), &["Mes", "Tipo", "Total"], rows)?;
            true
        }
        _ => false,
    };
    results.push(("aggregate.csv", aggregate));

    let profit = match &dash.profit {
        Section::Ready(series) => {
            let rows = series
                .iter()
                .map(|p| vec![p.month.display().to_string(), amount(p.value)])
                .collect();
            write_csv(&dir.join("profit.csv"), &["Mes", "Lucro"], rows)?;
            true
        }
        _ => false,
    };
    results.push(("profit.csv", profit));

    let ticket = match &dash.ticket {
        Section::Ready(Ticket::Derived(metrics)) => {
            let rows = metrics
                .iter()
                .map(|m| vec![m.month.display().to_string(), amount(m.average), m.rows.to_string()])
                .collect();
            write_csv(&dir.join("ticket.csv"), &["Mes", "TicketMedio", "Linhas"], rows)?;
            true
        }
        Section::Ready(Ticket::Summary(series)) => {
            let rows = series
                .iter()
                .map(|p| vec![p.month.display().to_string(), amount(p.value)])
                .collect();
            write_csv(&dir.join("ticket.csv"), &["Mes", "TicketMedio"], rows)?;
            true
        }
        _ => false,
    };
    results.push(("ticket.csv", ticket));

    let detail = match &dash.detail {
        Section::Ready(projection) => {
            let headers: Vec<&str> = projection.headers.iter().map(String::as_str).collect();
            write_csv(&dir.join("detail.csv"), &headers, projection.rows.clone())?;
            true
        }
        _ => false,
    };
    results.push(("detail.csv", detail));

    Ok(results)
}

fn amount(v: f64) -> String {
    format!("{v:.2}")
}

fn write_csv(path: &Path, headers: &[&str], rows: Vec<Vec<String>>) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(headers)?;
    for row in rows {
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}
