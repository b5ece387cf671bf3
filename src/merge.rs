use std::collections::HashSet;

use crate::models::{Row, Table};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub table: Table,
    /// Rows dropped because they were identical to an earlier row.
    pub duplicates_collapsed: usize,
}

/// Puts corrected rows back into `original`.
///
/// Rows whose label is in `selected` are removed, `corrected` rows are
/// appended, identical rows (label and every cell) are collapsed to their
/// first occurrence and the result is sorted by label. The sort is stable, so
/// rows sharing a label keep their relative order.
pub fn merge(original: &Table, selected: &[String], corrected: Vec<Row>) -> MergeOutcome {
    let selected: HashSet<&str> = selected.iter().map(String::as_str).collect();
    let kept = original
        .rows
        .iter()
        .filter(|r| r.label.as_symbol().map_or(true, |s| !selected.contains(s)))
        .cloned();

    let mut seen: HashSet<Row> = HashSet::new();
    let mut rows = Vec::with_capacity(original.rows.len());
    let mut duplicates_collapsed = 0;
    for row in kept.chain(corrected) {
        if seen.contains(&row) {
            duplicates_collapsed += 1;
            continue;
        }
        seen.insert(row.clone());
        rows.push(row);
    }
    rows.sort_by(|a, b| a.label.cmp(&b.label));

    MergeOutcome { table: original.derive(rows), duplicates_collapsed }
}
