use std::collections::BTreeMap;
use std::fmt;

/// Recoverable conditions met during one run. None of them stop the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    MissingSheet { table: &'static str, sheet: String },
    MissingColumn { sheet: String, column: String },
    UnmappedMonths { tokens: Vec<String>, rows: usize },
    EmptySelection,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::MissingSheet { table, sheet } => {
                write!(f, "sheet '{sheet}' ({table}) not found; section skipped")
            }
            Warning::MissingColumn { sheet, column } => {
                write!(f, "sheet '{sheet}' has no '{column}' column; section skipped")
            }
            Warning::UnmappedMonths { tokens, rows } => {
                let noun = if *rows == 1 { "row" } else { "rows" };
                write!(
                    f,
                    "{rows} {noun} with unrecognised month ({}) left out of monthly views",
                    tokens.join(", ")
                )
            }
            Warning::EmptySelection => write!(f, "the selected filters match no rows"),
        }
    }
}

/// Collects warnings for a single run and reports each one once.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
    unmapped: BTreeMap<String, usize>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: Warning) {
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }

    /// Record a row whose raw month token has no canonical mapping. Tokens are
    /// folded into a single warning when the run finishes.
    pub fn unmapped_month(&mut self, token: &str) {
        let token = if token.trim().is_empty() {
            "(blank)".to_string()
        } else {
            token.trim().to_string()
        };
        *self.unmapped.entry(token).or_default() += 1;
    }

    pub fn finish(mut self) -> Vec<Warning> {
        if !self.unmapped.is_empty() {
            let rows = self.unmapped.values().sum();
            let tokens = std::mem::take(&mut self.unmapped).into_keys().collect();
            self.warnings.push(Warning::UnmappedMonths { tokens, rows });
        }
        for warning in &self.warnings {
            tracing::debug!(%warning, "diagnostic");
        }
        self.warnings
    }
}
