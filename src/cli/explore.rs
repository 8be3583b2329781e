use colored::Colorize;
use dialoguer::{Input, MultiSelect, Select};

use crate::cli::dashboard::{format_dashboard, print_warnings};
use crate::cli::Context;
use crate::dashboard::Session;
use crate::error::{PainelError, Result};
use crate::pipeline::Selection;

const ACTIONS: &[&str] = &[
    "Choose months",
    "Choose categories",
    "Search month names",
    "Clear filters",
    "Reload source",
    "Quit",
];

fn prompt_err(e: dialoguer::Error) -> PainelError {
    PainelError::Other(format!("prompt failed: {e}"))
}

/// Interactive loop: every filter change re-runs the whole pipeline against
/// the cached source tables.
pub fn run(ctx: &Context) -> Result<()> {
    let mut session = ctx.session()?;
    let mut selection = Selection::default();

    loop {
        let dash = session.run(&selection)?;
        print_warnings(&dash.warnings);
        println!("{}\n", format_dashboard(&dash));

        let action = Select::new()
            .with_prompt("Next")
            .items(ACTIONS)
            .default(0)
            .interact()
            .map_err(prompt_err)?;

        match action {
            0 => selection = choose_months(&session, selection)?,
            1 => selection = choose_categories(&session, selection)?,
            2 => {
                let text: String = Input::new()
                    .with_prompt("Month name contains (empty clears)")
                    .allow_empty(true)
                    .interact_text()
                    .map_err(prompt_err)?;
                selection.search = (!text.trim().is_empty()).then(|| text.trim().to_string());
            }
            3 => selection = Selection::default(),
            4 => match session.reload() {
                Ok(()) => println!("{}", format!("Reloaded {}", session.path().display()).green()),
                Err(e) => println!("{} {e}", "Reload failed, keeping previous data:".red()),
            },
            _ => return Ok(()),
        }
    }
}

fn choose_months(session: &Session, mut selection: Selection) -> Result<Selection> {
    let months = session.available_months();
    if months.is_empty() {
        println!("{}", "No months with data.".yellow());
        return Ok(selection);
    }
    let items: Vec<&str> = months.iter().map(|m| m.display()).collect();
    let defaults: Vec<bool> = match &selection.months {
        Some(chosen) => items.iter().map(|i| chosen.iter().any(|c| c == i)).collect(),
        None => vec![true; items.len()],
    };
    let picked = MultiSelect::new()
        .with_prompt("Months (space toggles, enter confirms)")
        .items(&items)
        .defaults(&defaults)
        .interact()
        .map_err(prompt_err)?;

    selection.months = if picked.len() == items.len() {
        None
    } else {
        Some(picked.into_iter().map(|i| items[i].to_string()).collect())
    };
    Ok(selection)
}

fn choose_categories(session: &Session, mut selection: Selection) -> Result<Selection> {
    let categories = session.available_categories();
    if categories.is_empty() {
        println!("{}", "The source has no category column.".yellow());
        return Ok(selection);
    }
    let defaults: Vec<bool> = match &selection.categories {
        Some(chosen) => categories.iter().map(|c| chosen.contains(c)).collect(),
        None => vec![true; categories.len()],
    };
    let picked = MultiSelect::new()
        .with_prompt("Categories")
        .items(&categories)
        .defaults(&defaults)
        .interact()
        .map_err(prompt_err)?;

    selection.categories = if picked.len() == categories.len() {
        None
    } else {
        Some(picked.into_iter().map(|i| categories[i].clone()).collect())
    };
    Ok(selection)
}
