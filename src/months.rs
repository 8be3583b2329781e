use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{PainelError, Result};

/// Portuguese calendar: (display name, three-letter abbreviation).
const CALENDAR: [(&str, &str); 12] = [
    ("Janeiro", "jan"),
    ("Fevereiro", "fev"),
    ("Março", "mar"),
    ("Abril", "abr"),
    ("Maio", "mai"),
    ("Junho", "jun"),
    ("Julho", "jul"),
    ("Agosto", "ago"),
    ("Setembro", "set"),
    ("Outubro", "out"),
    ("Novembro", "nov"),
    ("Dezembro", "dez"),
];

/// A canonical month inside the active ordering.
///
/// Equality and ordering only consider the position in the ordering, so two
/// labels from the same catalog compare the way the dashboard sorts them.
#[derive(Debug, Clone, Copy)]
pub struct MonthLabel {
    position: usize,
    number: u32,
    name: &'static str,
}

impl MonthLabel {
    /// Lowercase form, e.g. `"março"`.
    pub fn token(&self) -> String {
        self.name.to_lowercase()
    }

    /// Capitalised display form, e.g. `"Março"`.
    pub fn display(&self) -> &'static str {
        self.name
    }

    /// Calendar month number, 1-12.
    #[cfg(test)]
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

impl PartialEq for MonthLabel {
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position && self.number == other.number
    }
}

impl Eq for MonthLabel {}

impl std::hash::Hash for MonthLabel {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.position.hash(state);
        self.number.hash(state);
    }
}

impl PartialOrd for MonthLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MonthLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.position
            .cmp(&other.position)
            .then(self.number.cmp(&other.number))
    }
}

impl fmt::Display for MonthLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonthOrdering {
    /// Janeiro through Dezembro.
    Chronological,
    /// A project-defined operating window, in the given order.
    Window(Vec<String>),
}

impl MonthOrdering {
    pub fn from_window(window: Option<&[String]>) -> Self {
        match window {
            Some(labels) if !labels.is_empty() => Self::Window(labels.to_vec()),
            _ => Self::Chronological,
        }
    }
}

/// Maps raw month tokens onto the canonical labels of one ordering.
#[derive(Debug, Clone)]
pub struct MonthCatalog {
    labels: Vec<MonthLabel>,
    aliases: HashMap<String, usize>,
    by_number: HashMap<u32, usize>,
}

impl MonthCatalog {
    pub fn new(ordering: &MonthOrdering) -> Result<Self> {
        let numbers: Vec<u32> = match ordering {
            MonthOrdering::Chronological => (1..=12).collect(),
            MonthOrdering::Window(labels) => {
                if labels.is_empty() {
                    return Err(PainelError::Config("month window is empty".into()));
                }
                let mut numbers = Vec::with_capacity(labels.len());
                for label in labels {
                    let n = calendar_number(label)
                        .ok_or_else(|| PainelError::UnknownMonth(label.clone()))?;
                    if numbers.contains(&n) {
                        return Err(PainelError::Config(format!(
                            "month window lists {label} twice"
                        )));
                    }
                    numbers.push(n);
                }
                numbers
            }
        };
        Self::build(&numbers)
    }

    #[cfg(test)]
    pub fn chronological() -> Self {
        let numbers: Vec<u32> = (1..=12).collect();
        // The built-in calendar has no colliding aliases.
        match Self::build(&numbers) {
            Ok(catalog) => catalog,
            Err(e) => unreachable!("built-in calendar is ambiguous: {e}"),
        }
    }

    #[cfg(test)]
    pub fn window<S: AsRef<str>>(labels: &[S]) -> Result<Self> {
        let labels = labels.iter().map(|s| s.as_ref().to_string()).collect();
        Self::new(&MonthOrdering::Window(labels))
    }

    fn build(numbers: &[u32]) -> Result<Self> {
        let mut labels = Vec::with_capacity(numbers.len());
        let mut aliases: HashMap<String, usize> = HashMap::new();
        let mut by_number = HashMap::new();

        for (position, &number) in numbers.iter().enumerate() {
            let (name, abbrev) = CALENDAR[(number - 1) as usize];
            labels.push(MonthLabel {
                position,
                number,
                name,
            });
            by_number.insert(number, position);
            for alias in [
                fold(name),
                abbrev.to_string(),
                number.to_string(),
                format!("{number:02}"),
            ] {
                match aliases.get(&alias) {
                    Some(&existing) if existing != position => {
                        return Err(PainelError::Config(format!(
                            "month alias '{alias}' maps to both {} and {name}",
                            labels[existing].name
                        )));
                    }
                    _ => {
                        aliases.insert(alias, position);
                    }
                }
            }
        }

        Ok(Self {
            labels,
            aliases,
            by_number,
        })
    }

    /// Canonical labels in the active ordering.
    pub fn labels(&self) -> &[MonthLabel] {
        &self.labels
    }

    /// Resolve a raw token (name, abbreviation, number or date) to its label.
    /// Returns `None` when the token is not a month of this ordering.
    pub fn normalize(&self, raw: &str) -> Option<MonthLabel> {
        let key = fold(raw);
        if key.is_empty() {
            return None;
        }
        if let Some(&pos) = self.aliases.get(&key) {
            return Some(self.labels[pos]);
        }
        let number = numeric_month(&key).or_else(|| date_month(&key))?;
        self.by_number.get(&number).map(|&pos| self.labels[pos])
    }
}

/// Month number of a calendar name or abbreviation, regardless of any window.
fn calendar_number(raw: &str) -> Option<u32> {
    let key = fold(raw);
    CALENDAR
        .iter()
        .position(|(name, abbrev)| fold(name) == key || *abbrev == key)
        .map(|i| i as u32 + 1)
        .or_else(|| numeric_month(&key))
}

/// Lowercase, trim and strip Portuguese diacritics.
pub fn fold(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// `"4"`, `"04"` or `"4.0"` (numbers that went through a float cell).
fn numeric_month(key: &str) -> Option<u32> {
    let value: f64 = key.parse().ok()?;
    if value.fract() != 0.0 || !(1.0..=12.0).contains(&value) {
        return None;
    }
    Some(value as u32)
}

fn date_month(key: &str) -> Option<u32> {
    static ISO: OnceLock<Regex> = OnceLock::new();
    static BR: OnceLock<Regex> = OnceLock::new();
    let iso = ISO.get_or_init(|| {
        Regex::new(r"^\d{4}-(\d{1,2})(?:-\d{1,2})?(?:[ t].*)?$").expect("valid regex")
    });
    let br = BR.get_or_init(|| Regex::new(r"^\d{1,2}/(\d{1,2})/\d{4}$").expect("valid regex"));

    let caps = iso.captures(key).or_else(|| br.captures(key))?;
    let n: u32 = caps.get(1)?.as_str().parse().ok()?;
    (1..=12).contains(&n).then_some(n)
}
