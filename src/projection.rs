use crate::models::RowSet;

/// Detail listing of revenue and expense rows: (source column, display label).
pub const RECORD_COLUMNS: &[(&str, &str)] = &[
    ("Data", "Data"),
    ("Mes", "Mês"),
    ("Tipo", "Tipo"),
    ("Categoria", "Categoria"),
    ("Descricao", "Descrição"),
    ("Cliente", "Cliente"),
    ("Fornecedor", "Fornecedor"),
    ("Valor", "Valor"),
];

pub const CANCELLATION_COLUMNS: &[(&str, &str)] = &[
    ("Data", "Data"),
    ("Mes", "Mês"),
    ("Cliente", "Cliente"),
    ("Plano", "Plano"),
    ("Motivo", "Motivo"),
    ("Valor", "Valor"),
];

/// A display-ready table: relabelled headers and string cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Projection {
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Keep only the listed columns that exist in `rows`, renamed to their
/// labels. Absent columns are skipped.
pub fn project(rows: &RowSet, columns: &[(&str, &str)]) -> Projection {
    let present: Vec<(&str, &str)> = columns
        .iter()
        .filter_map(|(source, label)| rows.column(source).map(|actual| (actual, *label)))
        .collect();

    Projection {
        headers: present.iter().map(|(_, label)| label.to_string()).collect(),
        rows: rows
            .rows
            .iter()
            .map(|row| {
                present
                    .iter()
                    .map(|(actual, _)| row.fields.get(*actual).cloned().unwrap_or_default())
                    .collect()
            })
            .collect(),
    }
}
