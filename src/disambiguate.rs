//! Ordinal suffixes for repeated date tokens.
//!
//! Two different genes can collapse onto one date token (`MARCH1` and `MARC1`
//! both become `1-Mar`). Rows sharing a token are told apart by their position
//! in the table: the first gets `_1st`, the next `_2nd`, and so on.

use std::collections::{HashMap, HashSet};

use crate::models::{Label, Row};
use crate::normalize::{canonical_token, ordinal};

/// Tokens that legitimately stand for two genes and need a human decision.
pub const AMBIGUOUS_TOKENS: [&str; 2] = ["Mar-01", "Mar-02"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuffixedRow {
    /// Index of the row in the slice given to [`disambiguate`].
    pub source: usize,
    /// Label as it appeared in the uploaded table.
    pub raw: String,
    /// Canonical `Mon-DD` token.
    pub token: String,
    /// 1-based position within the token group, in row order.
    pub ordinal: usize,
    /// Row with its label set to `token` (not yet suffixed).
    pub row: Row,
}

impl SuffixedRow {
    /// `Token_Suffix` key, e.g. `Sep-01_2nd`.
    pub fn key(&self) -> String {
        format!("{}_{}", self.token, ordinal(self.ordinal))
    }
}

/// Rows of one ambiguous token, indices into `Disambiguation::rows`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguousGroup {
    pub token: String,
    pub members: Vec<usize>,
}

impl AmbiguousGroup {
    /// More than one row shares the token.
    pub fn is_collision(&self) -> bool {
        self.members.len() >= 2
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Disambiguation {
    pub rows: Vec<SuffixedRow>,
    pub duplicates_removed: usize,
    pub ambiguous: Vec<AmbiguousGroup>,
    group_sizes: HashMap<String, usize>,
}

impl Disambiguation {
    pub fn group_size(&self, token: &str) -> usize {
        self.group_sizes.get(token).copied().unwrap_or(0)
    }
}

/// Relabels date-like rows to canonical tokens, drops rows identical in label
/// and every cell, and numbers the remaining rows per token in row order.
pub fn disambiguate(rows: &[Row]) -> Disambiguation {
    let mut seen: HashSet<Row> = HashSet::new();
    let mut counters: HashMap<String, usize> = HashMap::new();
    let mut out = Disambiguation::default();

    for (source, row) in rows.iter().enumerate() {
        let Some(raw) = row.label.as_symbol() else { continue };
        let token = canonical_token(raw).unwrap_or_else(|| raw.to_string());
        let relabeled = row.relabeled(Label::Symbol(token.clone()));
        if !seen.insert(relabeled.clone()) {
            out.duplicates_removed += 1;
            continue;
        }
        let n = counters.entry(token.clone()).or_insert(0);
        *n += 1;
        out.rows.push(SuffixedRow { source, raw: raw.to_string(), token, ordinal: *n, row: relabeled });
    }

    for (i, r) in out.rows.iter().enumerate() {
        if !AMBIGUOUS_TOKENS.contains(&r.token.as_str()) {
            continue;
        }
        match out.ambiguous.iter_mut().find(|g| g.token == r.token) {
            Some(g) => g.members.push(i),
            None => out.ambiguous.push(AmbiguousGroup { token: r.token.clone(), members: vec![i] }),
        }
    }
    out.group_sizes = counters;
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(label: &str, v: &str) -> Row {
        Row::new(label, vec![v.into()])
    }

    #[test]
    fn suffixes_follow_row_order() {
        let d = disambiguate(&[r("Sep-01", "a"), r("Sep-01", "b"), r("Oct-03", "c")]);
        let keys: Vec<String> = d.rows.iter().map(|s| s.key()).collect();
        assert_eq!(keys, ["Sep-01_1st", "Sep-01_2nd", "Oct-03_1st"]);
        assert_eq!(d.duplicates_removed, 0);
        assert!(d.ambiguous.is_empty());
        assert_eq!(d.group_size("Sep-01"), 2);
        assert_eq!(d.group_size("Oct-03"), 1);
    }

    #[test]
    fn exact_duplicates_collapse_near_duplicates_stay() {
        let d = disambiguate(&[r("Sep-01", "a"), r("1-Sep", "a"), r("Sep-01", "b")]);
        assert_eq!(d.duplicates_removed, 1);
        let keys: Vec<String> = d.rows.iter().map(|s| s.key()).collect();
        assert_eq!(keys, ["Sep-01_1st", "Sep-01_2nd"]);
        assert_eq!(d.rows[1].row.cells, ["b".to_string()]);
        assert_eq!(d.rows[1].source, 2);
    }

    #[test]
    fn march_groups_are_exposed() {
        let d = disambiguate(&[r("Mar-02", "x"), r("1-Mar", "a"), r("Mar-01", "b"), r("Mar-03", "c")]);
        assert_eq!(d.ambiguous.len(), 2);
        assert_eq!(d.ambiguous[0].token, "Mar-02");
        assert!(!d.ambiguous[0].is_collision());
        assert_eq!(d.ambiguous[1].token, "Mar-01");
        assert!(d.ambiguous[1].is_collision());
        let raws: Vec<&str> = d.ambiguous[1].members.iter().map(|i| d.rows[*i].raw.as_str()).collect();
        assert_eq!(raws, ["1-Mar", "Mar-01"]);
    }

    #[test]
    fn singleton_still_gets_first_suffix() {
        let d = disambiguate(&[r("Dec-1", "a")]);
        assert_eq!(d.rows[0].key(), "Dec-01_1st");
    }
}
