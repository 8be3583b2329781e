use std::collections::{BTreeMap, HashSet};

use crate::models::{Row, TicketMetric};
use crate::months::{fold, MonthLabel};

/// Category labels counted as recurring billing. Matching ignores case,
/// accents and surrounding whitespace.
#[derive(Debug, Clone, Default)]
pub struct BillingCategories {
    labels: HashSet<String>,
}

impl BillingCategories {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            labels: labels
                .into_iter()
                .map(|s| fold(s.as_ref()))
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains(&fold(label))
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Sum of every slot amount whose label is a billing category. All matching
/// slots count, not only the first; a row matching nothing totals zero.
pub fn row_ticket_total(row: &Row, billing: &BillingCategories) -> f64 {
    row.slots
        .iter()
        .filter(|slot| {
            slot.label
                .as_deref()
                .map_or(false, |label| billing.contains(label))
        })
        .map(|slot| slot.amount)
        .sum()
}

/// Average per-row ticket total for each month in `months`.
///
/// Every row of a month takes part in its average, including rows whose
/// total is zero. Months without rows report an average of zero over zero
/// rows. Rows without a canonical month are ignored.
pub fn ticket_metrics<'a>(
    rows: impl IntoIterator<Item = &'a Row>,
    billing: &BillingCategories,
    months: &[MonthLabel],
) -> Vec<TicketMetric> {
    let mut sums: BTreeMap<MonthLabel, (f64, usize)> =
        months.iter().map(|m| (*m, (0.0, 0))).collect();
    for row in rows {
        let Some(month) = row.month else { continue };
        if let Some((sum, count)) = sums.get_mut(&month) {
            *sum += row_ticket_total(row, billing);
            *count += 1;
        }
    }
    sums.into_iter()
        .map(|(month, (sum, count))| TicketMetric {
            month,
            average: if count == 0 { 0.0 } else { sum / count as f64 },
            rows: count,
        })
        .collect()
}
