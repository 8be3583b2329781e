mod cli;
mod dashboard;
mod diagnostics;
mod error;
mod fmt;
mod ingest;
mod matcher;
mod models;
mod months;
mod pipeline;
mod projection;
mod settings;
mod workbook;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;

fn init_tracing(verbose: bool) {
    let default = if verbose { "painel=debug" } else { "painel=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = cli::dispatch(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
