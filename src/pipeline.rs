use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::error::{PainelError, Result};
use crate::models::{AggregateRow, MonthValue, Row, RowKind, RowSet};
use crate::months::{fold, MonthCatalog, MonthLabel};

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// User-chosen filters. `None` means "everything available".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub months: Option<Vec<String>>,
    pub categories: Option<Vec<String>>,
    /// Case-insensitive substring matched against month labels.
    pub search: Option<String>,
}

/// A selection resolved against one catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSelection {
    pub months: Vec<MonthLabel>,
    /// Folded category labels; `None` leaves the dimension unfiltered.
    pub categories: Option<HashSet<String>>,
    /// No month filter or search was given, so raw views keep rows whose
    /// month token has no canonical label.
    pub include_unmapped: bool,
}

impl Selection {
    #[cfg(test)]
    pub fn months<I, S>(months: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            months: Some(months.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Resolve month names through `catalog`. Without explicit months the
    /// `available` months are used; an explicit empty list selects nothing.
    /// The result is sorted by the catalog's ordering.
    pub fn resolve(&self, catalog: &MonthCatalog, available: &[MonthLabel]) -> Result<ResolvedSelection> {
        let mut months: BTreeSet<MonthLabel> = match &self.months {
            Some(names) => names
                .iter()
                .map(|name| {
                    catalog
                        .normalize(name)
                        .ok_or_else(|| PainelError::UnknownMonth(name.clone()))
                })
                .collect::<Result<_>>()?,
            None => available.iter().copied().collect(),
        };

        let search = self.search.as_deref().map(fold).filter(|s| !s.is_empty());
        if let Some(needle) = &search {
            months.retain(|m| fold(m.display()).contains(needle));
        }

        let categories = self
            .categories
            .as_ref()
            .map(|c| c.iter().map(|s| fold(s)).collect());

        Ok(ResolvedSelection {
            months: months.into_iter().collect(),
            categories,
            include_unmapped: self.months.is_none() && search.is_none(),
        })
    }
}

/// Canonical months present in the rows, in catalog order.
pub fn available_months(rows: &RowSet) -> Vec<MonthLabel> {
    rows.rows
        .iter()
        .filter_map(|r| r.month)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Distinct top-level categories, sorted.
pub fn available_categories(rows: &RowSet) -> Vec<String> {
    rows.rows
        .iter()
        .filter_map(|r| r.category.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Kinds that occur anywhere in the rows, in declaration order.
pub fn kinds_present(rows: &RowSet) -> Vec<RowKind> {
    rows.rows
        .iter()
        .map(|r| r.kind)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

// ---------------------------------------------------------------------------
// Filter & aggregate
// ---------------------------------------------------------------------------

fn category_selected(row: &Row, selection: &ResolvedSelection) -> bool {
    match &selection.categories {
        None => true,
        Some(cats) => row
            .category
            .as_deref()
            .map_or(false, |c| cats.contains(&fold(c))),
    }
}

/// Rows whose canonical month is selected and, when a category filter is
/// active, whose category is selected. Rows without a canonical month never
/// pass. The input is left untouched.
pub fn filter_rows(rows: &RowSet, selection: &ResolvedSelection) -> RowSet {
    let months: HashSet<MonthLabel> = selection.months.iter().copied().collect();
    rows.retain_cloned(|row| {
        row.month.map_or(false, |m| months.contains(&m)) && category_selected(row, selection)
    })
}

/// Like [`filter_rows`], but rows with an unrecognised month token also pass
/// while the selection leaves months unrestricted. Used for detail listings.
pub fn raw_rows(rows: &RowSet, selection: &ResolvedSelection) -> RowSet {
    let months: HashSet<MonthLabel> = selection.months.iter().copied().collect();
    rows.retain_cloned(|row| {
        let month_ok = match row.month {
            Some(m) => months.contains(&m),
            None => selection.include_unmapped,
        };
        month_ok && category_selected(row, selection)
    })
}

/// Sum amounts by (month, kind). Every month in `months` gets one row per
/// kind in `kinds`, zero when nothing matched, ordered by month then kind.
pub fn aggregate(rows: &RowSet, months: &[MonthLabel], kinds: &[RowKind]) -> Vec<AggregateRow> {
    let mut totals: BTreeMap<(MonthLabel, RowKind), f64> = months
        .iter()
        .flat_map(|m| kinds.iter().map(move |k| ((*m, *k), 0.0)))
        .collect();
    for row in &rows.rows {
        let Some(month) = row.month else { continue };
        if let Some(total) = totals.get_mut(&(month, row.kind)) {
            *total += row.amount;
        }
    }
    totals
        .into_iter()
        .map(|((month, kind), total)| AggregateRow { month, kind, total })
        .collect()
}

/// Grand total per kind across all months of an aggregate.
pub fn kind_totals(aggregate: &[AggregateRow]) -> Vec<(RowKind, f64)> {
    let mut totals: BTreeMap<RowKind, f64> = BTreeMap::new();
    for row in aggregate {
        *totals.entry(row.kind).or_default() += row.total;
    }
    totals.into_iter().collect()
}

/// Revenue minus expenses for each month of an aggregate.
pub fn profitability(aggregate: &[AggregateRow]) -> Vec<MonthValue> {
    let mut net: BTreeMap<MonthLabel, f64> = BTreeMap::new();
    for row in aggregate {
        let entry = net.entry(row.month).or_default();
        match row.kind {
            RowKind::Revenue => *entry += row.total,
            RowKind::Expense => *entry -= row.total,
            RowKind::CancellationDetail => {}
        }
    }
    net.into_iter()
        .map(|(month, value)| MonthValue { month, value })
        .collect()
}

/// Restrict a month series to `months`, summing duplicate months and filling
/// absent ones with zero, in catalog order.
pub fn select_series(series: &[MonthValue], months: &[MonthLabel]) -> Vec<MonthValue> {
    let mut values: BTreeMap<MonthLabel, f64> = months.iter().map(|m| (*m, 0.0)).collect();
    for point in series {
        if let Some(v) = values.get_mut(&point.month) {
            *v += point.value;
        }
    }
    values
        .into_iter()
        .map(|(month, value)| MonthValue { month, value })
        .collect()
}

/// True when any point of the series falls inside `months`.
pub fn series_covers(series: &[MonthValue], months: &[MonthLabel]) -> bool {
    series.iter().any(|p| months.contains(&p.month))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> MonthCatalog {
        MonthCatalog::window(&["Abril", "Maio", "Junho", "Julho", "Agosto"]).unwrap()
    }

    fn row(cat: &MonthCatalog, kind: RowKind, month: &str, amount: f64) -> Row {
        Row::new(kind, month, cat.normalize(month), amount)
    }

    fn sample(cat: &MonthCatalog) -> RowSet {
        RowSet::new(
            vec!["Mes".into(), "Valor".into()],
            vec![
                row(cat, RowKind::Revenue, "abril", 600.0),
                row(cat, RowKind::Revenue, "abril", 400.0),
                row(cat, RowKind::Revenue, "maio", 1500.0),
                row(cat, RowKind::Revenue, "junho", 700.0),
                row(cat, RowKind::Revenue, "agosto", 200.0),
            ],
        )
    }

    #[test]
    fn test_selected_months_example() {
        let cat = window();
        let rows = sample(&cat);
        let sel = Selection::months(["Abril", "Maio"])
            .resolve(&cat, &available_months(&rows))
            .unwrap();
        let filtered = filter_rows(&rows, &sel);
        let agg = aggregate(&filtered, &sel.months, &kinds_present(&rows));

        let got: Vec<(&str, &str, f64)> = agg
            .iter()
            .map(|a| (a.month.display(), a.kind.label(), a.total))
            .collect();
        assert_eq!(got, vec![("Abril", "Receita", 1000.0), ("Maio", "Receita", 1500.0)]);
    }

    #[test]
    fn test_zero_months_included() {
        let cat = window();
        let rows = sample(&cat);
        let sel = Selection::default().resolve(&cat, cat.labels()).unwrap();
        let agg = aggregate(&filter_rows(&rows, &sel), &sel.months, &[RowKind::Revenue]);
        assert_eq!(agg.len(), 5);
        assert_eq!(agg[3].month.display(), "Julho");
        assert_eq!(agg[3].total, 0.0);
    }

    #[test]
    fn test_output_follows_window_order_not_input_order() {
        let cat = MonthCatalog::window(&["Agosto", "Abril"]).unwrap();
        let rows = RowSet::new(
            vec![],
            vec![
                row(&cat, RowKind::Revenue, "abril", 1.0),
                row(&cat, RowKind::Revenue, "agosto", 2.0),
            ],
        );
        let sel = Selection::default().resolve(&cat, &available_months(&rows)).unwrap();
        let names: Vec<_> = sel.months.iter().map(|m| m.display()).collect();
        assert_eq!(names, vec!["Agosto", "Abril"]);
        let agg = aggregate(&rows, &sel.months, &[RowKind::Revenue]);
        assert_eq!(agg[0].total, 2.0);
    }

    #[test]
    fn test_aggregation_preserves_mass() {
        let cat = MonthCatalog::chronological();
        let rows = RowSet::new(
            vec![],
            vec![
                row(&cat, RowKind::Revenue, "jan", 10.5),
                row(&cat, RowKind::Expense, "jan", 3.0),
                row(&cat, RowKind::Revenue, "mar", 4.25),
                row(&cat, RowKind::Expense, "dez", 8.0),
                row(&cat, RowKind::Expense, "dez", 1.0),
            ],
        );
        let sel = Selection::default().resolve(&cat, &available_months(&rows)).unwrap();
        let agg = aggregate(&filter_rows(&rows, &sel), &sel.months, &kinds_present(&rows));
        for kind in [RowKind::Revenue, RowKind::Expense] {
            let agg_sum: f64 = agg.iter().filter(|a| a.kind == kind).map(|a| a.total).sum();
            let row_sum: f64 = rows.rows.iter().filter(|r| r.kind == kind).map(|r| r.amount).sum();
            assert_eq!(agg_sum, row_sum);
        }
        assert_eq!(kind_totals(&agg), vec![(RowKind::Revenue, 14.75), (RowKind::Expense, 12.0)]);
    }

    #[test]
    fn test_filter_and_aggregate_idempotent() {
        let cat = window();
        let rows = sample(&cat);
        let before = rows.clone();
        let sel = Selection::months(["Maio", "Abril"]).resolve(&cat, &[]).unwrap();
        let first = aggregate(&filter_rows(&rows, &sel), &sel.months, &[RowKind::Revenue]);
        let second = aggregate(&filter_rows(&rows, &sel), &sel.months, &[RowKind::Revenue]);
        assert_eq!(first, second);
        assert_eq!(rows, before);
    }

    #[test]
    fn test_unmapped_rows_never_pass_filter() {
        let cat = window();
        let mut rows = sample(&cat);
        rows.rows.push(row(&cat, RowKind::Revenue, "setembro", 999.0));
        let sel = Selection::default().resolve(&cat, cat.labels()).unwrap();
        let filtered = filter_rows(&rows, &sel);
        assert_eq!(filtered.len(), 5);
        assert!(filtered.rows.iter().all(|r| r.month.is_some()));
    }

    #[test]
    fn test_category_filter() {
        let cat = MonthCatalog::chronological();
        let mut a = row(&cat, RowKind::Revenue, "abril", 10.0);
        a.category = Some("Assinatura".into());
        let mut b = row(&cat, RowKind::Revenue, "abril", 20.0);
        b.category = Some("Consultoria".into());
        let c = row(&cat, RowKind::Revenue, "abril", 40.0);
        let rows = RowSet::new(vec![], vec![a, b, c]);

        assert_eq!(available_categories(&rows), vec!["Assinatura", "Consultoria"]);
        let sel = Selection {
            categories: Some(vec!["assinatura".into()]),
            ..Selection::default()
        }
        .resolve(&cat, &available_months(&rows))
        .unwrap();
        let filtered = filter_rows(&rows, &sel);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.rows[0].amount, 10.0);
    }

    #[test]
    fn test_search_filters_month_labels() {
        let cat = MonthCatalog::chronological();
        let sel = Selection {
            search: Some("BRO".into()),
            ..Selection::default()
        }
        .resolve(&cat, cat.labels())
        .unwrap();
        let names: Vec<_> = sel.months.iter().map(|m| m.display()).collect();
        assert_eq!(names, vec!["Setembro", "Outubro", "Novembro", "Dezembro"]);

        let sel = Selection {
            search: Some("marc".into()),
            ..Selection::default()
        }
        .resolve(&cat, cat.labels())
        .unwrap();
        assert_eq!(sel.months.len(), 1);
    }

    #[test]
    fn test_unknown_selected_month_is_error() {
        let cat = window();
        let err = Selection::months(["Dezembro"]).resolve(&cat, &[]).unwrap_err();
        assert!(matches!(err, PainelError::UnknownMonth(m) if m == "Dezembro"));
    }

    #[test]
    fn test_profitability_and_series() {
        let cat = window();
        let abril = cat.normalize("abril").unwrap();
        let maio = cat.normalize("maio").unwrap();
        let agg = vec![
            AggregateRow { month: abril, kind: RowKind::Revenue, total: 1000.0 },
            AggregateRow { month: abril, kind: RowKind::Expense, total: 300.0 },
            AggregateRow { month: maio, kind: RowKind::Revenue, total: 0.0 },
            AggregateRow { month: maio, kind: RowKind::Expense, total: 50.0 },
        ];
        let profit = profitability(&agg);
        assert_eq!(profit, vec![
            MonthValue { month: abril, value: 700.0 },
            MonthValue { month: maio, value: -50.0 },
        ]);

        let series = vec![
            MonthValue { month: maio, value: 2.0 },
            MonthValue { month: maio, value: 1.0 },
            MonthValue { month: abril, value: 5.0 },
        ];
        let selected = select_series(&series, &[abril, maio]);
        assert_eq!(selected[0], MonthValue { month: abril, value: 5.0 });
        assert_eq!(selected[1], MonthValue { month: maio, value: 3.0 });
        assert!(series_covers(&series, &[maio]));
        assert!(!series_covers(&series, &[cat.normalize("junho").unwrap()]));
    }

    #[test]
    fn test_explicit_empty_selection_selects_nothing() {
        let cat = window();
        let rows = sample(&cat);
        let available = available_months(&rows);

        let none = Selection {
            months: Some(vec![]),
            ..Selection::default()
        }
        .resolve(&cat, &available)
        .unwrap();
        assert!(none.months.is_empty());
        assert!(filter_rows(&rows, &none).is_empty());

        let no_categories = Selection {
            categories: Some(vec![]),
            ..Selection::default()
        }
        .resolve(&cat, &available)
        .unwrap();
        assert_eq!(no_categories.months.len(), 4);
        assert!(filter_rows(&rows, &no_categories).is_empty());
    }

    #[test]
    fn test_raw_rows_keep_unmapped_only_without_month_filter() {
        let cat = window();
        let mut rows = sample(&cat);
        rows.rows.push(row(&cat, RowKind::Revenue, "setembro", 20.0));
        let available = available_months(&rows);

        let all = Selection::default().resolve(&cat, &available).unwrap();
        assert!(all.include_unmapped);
        assert_eq!(filter_rows(&rows, &all).len(), 5);
        let raw = raw_rows(&rows, &all);
        assert_eq!(raw.len(), 6);
        assert!(raw.rows.iter().any(|r| r.raw_month == "setembro" && r.month.is_none()));

        let abril = Selection::months(["Abril"]).resolve(&cat, &available).unwrap();
        assert!(!abril.include_unmapped);
        assert_eq!(raw_rows(&rows, &abril).len(), 2);

        let searched = Selection {
            search: Some("a".into()),
            ..Selection::default()
        }
        .resolve(&cat, &available)
        .unwrap();
        assert!(raw_rows(&rows, &searched).rows.iter().all(|r| r.month.is_some()));
    }
}
