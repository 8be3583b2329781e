use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PainelError, Result};
use crate::months::MonthOrdering;

/// Sheet (or CSV file stem) name for each table kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetNames {
    pub revenue: String,
    pub expense: String,
    pub billing: String,
    pub ticket: String,
    pub cancellations: String,
    pub churn: String,
    pub cancellation_detail: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            revenue: "Receitas Combinadas".to_string(),
            expense: "Despesas Combinadas".to_string(),
            billing: "Faturamento Mensal".to_string(),
            ticket: "Ticket Medio Mensal Resumo".to_string(),
            cancellations: "Cancelamentos Resumo".to_string(),
            churn: "Churn Rate Resumo".to_string(),
            cancellation_detail: "Cancelamentos Detalhe".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_workbook")]
    pub workbook: String,
    /// Operating window in display order; absent means Janeiro..Dezembro.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month_window: Option<Vec<String>>,
    #[serde(default = "default_billing_categories")]
    pub billing_categories: Vec<String>,
    #[serde(default)]
    pub sheets: SheetNames,
}

fn default_workbook() -> String {
    "todos_resultados_seatec.xlsx".to_string()
}

fn default_billing_categories() -> Vec<String> {
    vec!["MENSALIDADE TC".to_string()]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            workbook: default_workbook(),
            month_window: None,
            billing_categories: default_billing_categories(),
            sheets: SheetNames::default(),
        }
    }
}

impl Settings {
    pub fn ordering(&self) -> MonthOrdering {
        MonthOrdering::from_window(self.month_window.as_deref())
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("painel")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

/// Settings from the default location, or defaults when none are saved.
pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

/// Settings from an explicit file. Unlike [`load_settings`], a missing or
/// malformed file is an error.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| PainelError::Config(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&content)
        .map_err(|e| PainelError::Config(format!("{}: {e}", path.display())))
}

pub fn save_settings_to(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest.trim_start_matches('/'));
        }
    }
    PathBuf::from(path)
}
