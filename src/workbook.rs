use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{PainelError, Result};
use crate::months::fold;

// ---------------------------------------------------------------------------
// Cells and sheets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Display form used by detail tables and raw month tokens.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => format!("{n}"),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    pub fn as_amount(&self) -> f64 {
        match self {
            Cell::Number(n) if n.is_finite() => *n,
            Cell::Text(s) => parse_amount(s),
            _ => 0.0,
        }
    }

    /// Interpret the cell as a date: native dates, Excel serials and text.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(d) => Some(*d),
            Cell::Number(n) => excel_serial_to_date(*n),
            Cell::Text(s) => parse_date(s),
            Cell::Empty => None,
        }
    }
}

/// One named table: a header row and the data rows beneath it.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    /// Index of a header, compared case- and accent-insensitively.
    pub fn column(&self, name: &str) -> Option<usize> {
        let key = fold(name);
        self.headers.iter().position(|h| fold(h) == key)
    }
}

/// Cell at `idx`, treating short rows as padded with empties.
pub fn cell_at(row: &[Cell], idx: usize) -> &Cell {
    const EMPTY: &Cell = &Cell::Empty;
    row.get(idx).unwrap_or(EMPTY)
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Parse a currency amount written either Brazilian style (`R$ 1.234,56`) or
/// US style (`$1,234.56`). Parenthesised values are negative, a trailing
/// `%` is dropped and anything unparseable counts as zero.
pub fn parse_amount(raw: &str) -> f64 {
    let s: String = raw
        .replace("R$", "")
        .replace(['$', '"', '%'], "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let (negative, s) = match s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        Some(inner) => (true, inner.to_string()),
        None => (false, s),
    };

    let normalized = match (s.rfind(','), s.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => s.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => s.replace(',', ""),
        (Some(_), None) if s.matches(',').count() > 1 => s.replace(',', ""),
        (Some(_), None) => s.replace(',', "."),
        (None, Some(_)) if s.matches('.').count() > 1 => s.replace('.', ""),
        _ => s,
    };

    let value = normalized
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0);
    if negative {
        -value.abs()
    } else {
        value
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    for fmt in ["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(d);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    None
}

pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..2_958_466.0).contains(&serial) {
        return None;
    }
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(chrono::Duration::days(serial as i64))
}

// ---------------------------------------------------------------------------
// Workbook
// ---------------------------------------------------------------------------

/// Every sheet of a tabular source, read once and kept read-only.
#[derive(Debug, Clone)]
pub struct Workbook {
    path: PathBuf,
    sheets: Vec<Sheet>,
}

impl Workbook {
    /// Open a spreadsheet file (`.xlsx`, `.xlsm`, `.xls`, `.ods`), a single
    /// `.csv` file, or a directory holding one `<sheet name>.csv` per sheet.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PainelError::MissingSource(path.display().to_string()));
        }
        let sheets = if path.is_dir() {
            read_csv_dir(path)?
        } else if has_extension(path, "csv") {
            vec![read_csv_sheet(path)?]
        } else {
            read_spreadsheet(path)?
        };
        tracing::debug!(path = %path.display(), sheets = sheets.len(), "loaded source");
        Ok(Self {
            path: path.to_path_buf(),
            sheets,
        })
    }

    #[cfg(test)]
    pub fn from_sheets(path: impl Into<PathBuf>, sheets: Vec<Sheet>) -> Self {
        Self {
            path: path.into(),
            sheets,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        let key = fold(name);
        self.sheets.iter().find(|s| fold(&s.name) == key)
    }

    #[cfg(test)]
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .map_or(false, |e| e.eq_ignore_ascii_case(ext))
}

fn read_csv_dir(dir: &Path) -> Result<Vec<Sheet>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && has_extension(p, "csv"))
        .collect();
    paths.sort();
    paths.iter().map(|p| read_csv_sheet(p)).collect()
}

fn read_csv_sheet(path: &Path) -> Result<Sheet> {
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file = std::fs::File::open(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));

    let headers = rdr
        .headers()?
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
        .collect();
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.trim().is_empty() {
                        Cell::Empty
                    } else {
                        Cell::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }
    Ok(Sheet {
        name,
        headers,
        rows,
    })
}

#[cfg(feature = "xlsx")]
fn read_spreadsheet(path: &Path) -> Result<Vec<Sheet>> {
    use calamine::Reader;

    let mut workbook = calamine::open_workbook_auto(path)
        .map_err(|e| PainelError::Workbook(format!("Failed to open {}: {e}", path.display())))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names().to_vec() {
        let range = match workbook.worksheet_range(&name) {
            Ok(range) => range,
            Err(e) => {
                tracing::warn!(sheet = %name, error = %e, "skipping unreadable sheet");
                continue;
            }
        };
        let mut rows = range.rows();
        let headers = rows
            .next()
            .map(|r| r.iter().map(|c| cell_from_data(c).as_text()).collect())
            .unwrap_or_default();
        let rows = rows
            .map(|r| r.iter().map(cell_from_data).collect())
            .collect();
        sheets.push(Sheet {
            name,
            headers,
            rows,
        });
    }
    Ok(sheets)
}

#[cfg(not(feature = "xlsx"))]
fn read_spreadsheet(path: &Path) -> Result<Vec<Sheet>> {
    Err(PainelError::Workbook(format!(
        "{} is a spreadsheet; reading it requires the 'xlsx' feature",
        path.display()
    )))
}

#[cfg(feature = "xlsx")]
fn cell_from_data(data: &calamine::Data) -> Cell {
    use calamine::Data;
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) if s.trim().is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64())
            .map(Cell::Date)
            .unwrap_or(Cell::Empty),
        Data::DateTimeIso(s) => parse_date(s)
            .map(Cell::Date)
            .unwrap_or_else(|| Cell::Text(s.clone())),
        Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}
