use std::collections::BTreeMap;

use crate::months::{fold, MonthLabel};

/// Number of parallel (category, amount) slot pairs on a billing row.
pub const SLOT_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RowKind {
    Revenue,
    Expense,
    CancellationDetail,
}

impl RowKind {
    /// Label shown in the `Tipo` column and in aggregate output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Revenue => "Receita",
            Self::Expense => "Despesa",
            Self::CancellationDetail => "Cancelamento",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategorySlot {
    pub label: Option<String>,
    pub amount: f64,
}

/// One ingested line. `month` is `None` when the raw token had no mapping in
/// the active ordering; such rows stay in raw views only.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub kind: RowKind,
    pub raw_month: String,
    pub month: Option<MonthLabel>,
    /// Expenses are stored as a positive magnitude.
    pub amount: f64,
    pub category: Option<String>,
    pub slots: [CategorySlot; SLOT_COUNT],
    /// Display values keyed by source header, for detail tables.
    pub fields: BTreeMap<String, String>,
}

impl Row {
    pub fn new(kind: RowKind, raw_month: impl Into<String>, month: Option<MonthLabel>, amount: f64) -> Self {
        Self {
            kind,
            raw_month: raw_month.into(),
            month,
            amount,
            category: None,
            slots: Default::default(),
            fields: BTreeMap::new(),
        }
    }
}

/// A set of rows plus the columns that were present in their source tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl RowSet {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Actual header name for a column, matched case- and accent-insensitively.
    pub fn column(&self, name: &str) -> Option<&str> {
        let key = fold(name);
        self.columns
            .iter()
            .find(|c| fold(c) == key)
            .map(String::as_str)
    }

    /// Concatenate two row sets; columns are unioned keeping first-seen order.
    pub fn merge(mut self, other: RowSet) -> RowSet {
        for col in other.columns {
            if self.column(&col).is_none() {
                self.columns.push(col);
            }
        }
        self.rows.extend(other.rows);
        self
    }

    /// New row set holding clones of the rows accepted by `keep`.
    pub fn retain_cloned(&self, keep: impl Fn(&Row) -> bool) -> RowSet {
        RowSet {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    pub fn of_kind(&self, kind: RowKind) -> RowSet {
        self.retain_cloned(|r| r.kind == kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateRow {
    pub month: MonthLabel,
    pub kind: RowKind,
    pub total: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TicketMetric {
    pub month: MonthLabel,
    pub average: f64,
    /// Rows averaged, including those that matched no billing slot.
    pub rows: usize,
}

/// A single value per month, as read from a summary sheet or derived.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthValue {
    pub month: MonthLabel,
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_unions_columns() {
        let a = RowSet::new(
            vec!["Data".into(), "Valor".into()],
            vec![Row::new(RowKind::Revenue, "4", None, 1.0)],
        );
        let b = RowSet::new(
            vec!["valor".into(), "Fornecedor".into()],
            vec![Row::new(RowKind::Expense, "4", None, 2.0)],
        );
        let merged = a.merge(b);
        assert_eq!(merged.columns, vec!["Data", "Valor", "Fornecedor"]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.of_kind(RowKind::Expense).len(), 1);
    }

    #[test]
    fn test_column_lookup_ignores_accents() {
        let set = RowSet::new(vec!["Descrição".into()], vec![]);
        assert_eq!(set.column("descricao"), Some("Descrição"));
        assert_eq!(set.column("Cliente"), None);
    }
}
