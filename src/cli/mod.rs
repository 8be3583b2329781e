pub mod dashboard;
pub mod explore;
pub mod export;
pub mod init;
pub mod months;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::dashboard::{RunConfig, Session};
use crate::error::Result;
use crate::pipeline::Selection;
use crate::settings::{
    load_settings, load_settings_from, settings_path, shellexpand_path, Settings,
};

#[derive(Parser)]
#[command(
    name = "painel",
    version,
    about = "Monthly revenue, expense, churn and ticket dashboard for spreadsheet exports."
)]
pub struct Cli {
    /// Workbook (.xlsx, .xls, .ods) or a directory of per-sheet CSV files
    #[arg(long, global = true)]
    pub file: Option<String>,
    /// Settings file (default: ~/.config/painel/settings.json)
    #[arg(long, global = true)]
    pub config: Option<String>,
    /// Operating window in display order, e.g. Abril,Maio,Junho
    #[arg(long, global = true, value_delimiter = ',')]
    pub window: Option<Vec<String>>,
    /// Log pipeline details to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Month to include (repeatable; default: every month with data)
    #[arg(long = "month", short = 'm')]
    pub months: Vec<String>,
    /// Top-level category to include (repeatable; default: all)
    #[arg(long = "category", short = 'c')]
    pub categories: Vec<String>,
    /// Keep only months whose name contains this text
    #[arg(long)]
    pub search: Option<String>,
}

impl FilterArgs {
    pub fn selection(&self) -> Selection {
        Selection {
            months: (!self.months.is_empty()).then(|| self.months.clone()),
            categories: (!self.categories.is_empty()).then(|| self.categories.clone()),
            search: self.search.clone(),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print every dashboard section for the selected months.
    Dashboard {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// List the canonical months of the active ordering.
    Months,
    /// Write the dashboard data as CSV files.
    Export {
        /// Output directory
        #[arg(long)]
        dir: String,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Pick filters interactively and re-render on every change.
    Explore,
    /// Save settings (source file, month window, billing categories).
    Init {
        /// Category label counted as recurring billing (repeatable)
        #[arg(long = "billing-category")]
        billing_categories: Vec<String>,
    },
}

/// Settings for this invocation, with command-line overrides applied.
pub struct Context {
    pub settings: Settings,
    pub settings_path: PathBuf,
}

impl Context {
    pub fn load(cli: &Cli) -> Result<Self> {
        let (settings, settings_path) = match &cli.config {
            Some(path) => {
                let path = shellexpand_path(path);
                (load_settings_from(&path)?, path)
            }
            None => (load_settings(), settings_path()),
        };
        let mut ctx = Self {
            settings,
            settings_path,
        };
        ctx.apply_overrides(cli);
        Ok(ctx)
    }

    fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(file) = &cli.file {
            self.settings.workbook = file.clone();
        }
        if let Some(window) = &cli.window {
            self.settings.month_window = Some(window.iter().map(|s| s.trim().to_string()).collect());
        }
    }

    pub fn source(&self) -> PathBuf {
        shellexpand_path(&self.settings.workbook)
    }

    pub fn run_config(&self) -> Result<RunConfig> {
        RunConfig::from_settings(&self.settings)
    }

    pub fn session(&self) -> Result<Session> {
        Session::open(&self.source(), self.run_config()?)
    }
}

pub fn dispatch(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Init { billing_categories } => {
            // `init` writes the settings file, so a missing --config target is fine.
            let ctx = match &cli.config {
                Some(path) if !shellexpand_path(path).exists() => {
                    let mut ctx = Context {
                        settings: Settings::default(),
                        settings_path: shellexpand_path(path),
                    };
                    ctx.apply_overrides(&cli);
                    ctx
                }
                _ => Context::load(&cli)?,
            };
            init::run(ctx, billing_categories)
        }
        Commands::Dashboard { filters } => dashboard::run(&Context::load(&cli)?, filters),
        Commands::Months => months::run(&Context::load(&cli)?),
        Commands::Export { dir, filters } => export::run(&Context::load(&cli)?, dir, filters),
        Commands::Explore => explore::run(&Context::load(&cli)?),
    }
}
