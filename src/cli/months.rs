use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::Context;
use crate::error::Result;

/// Print the active ordering and which months occur in the source.
pub fn run(ctx: &Context) -> Result<()> {
    let config = ctx.run_config()?;
    let session = ctx.session()?;
    let present = session.available_months();

    let mut table = Table::new();
    table.set_header(vec!["#", "Month", "Token", "In data"]);
    for label in config.catalog.labels() {
        let in_data = if present.contains(label) {
            "yes".green()
        } else {
            "no".dimmed()
        };
        table.add_row(vec![
            Cell::new(label.position() + 1),
            Cell::new(label.display()),
            Cell::new(label.token()),
            Cell::new(in_data),
        ]);
    }
    println!("Source: {}\n{table}", session.path().display());
    Ok(())
}
