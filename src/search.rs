//! Gene lookup over cleaned tables.

use strsim::jaro_winkler;

use crate::error::CleanError;
use crate::models::{Row, Table};
use crate::pipeline::CleanedCollection;

/// Minimum Jaro-Winkler similarity for a "did you mean" suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.85;

/// Splits a free-text query into upper-cased symbols, e.g.
/// `"SEPTIN1; delec1"` → `["SEPTIN1", "DELEC1"]`.
pub fn parse_query(query: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for part in query.split(|c: char| c == ';' || c == ',' || c.is_whitespace()) {
        let symbol = part.trim().to_uppercase();
        if !symbol.is_empty() && !out.contains(&symbol) {
            out.push(symbol);
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit<'a> {
    pub table: &'a str,
    pub rows: Vec<&'a Row>,
}

/// Looks `symbols` up in every table. Each table gets its own result, so a
/// miss in one never hides hits in another.
pub fn search<'a>(collection: &'a CleanedCollection, symbols: &[String]) -> Vec<Result<SearchHit<'a>, CleanError>> {
    collection.tables.iter().map(|t| search_table(&t.table, symbols)).collect()
}

pub fn search_table<'a>(table: &'a Table, symbols: &[String]) -> Result<SearchHit<'a>, CleanError> {
    let mut rows = Vec::new();
    let mut missing = Vec::new();
    for symbol in symbols {
        let before = rows.len();
        rows.extend(table.rows.iter().filter(|r| r.label.as_symbol().is_some_and(|l| l.eq_ignore_ascii_case(symbol))));
        if rows.len() == before {
            missing.push(symbol.clone());
        }
    }
    if missing.is_empty() {
        return Ok(SearchHit { table: &table.name, rows });
    }
    let suggestion = missing.first().and_then(|m| closest_label(table, m));
    Err(CleanError::LabelNotFound { table: table.name.clone(), missing, suggestion })
}

fn closest_label(table: &Table, symbol: &str) -> Option<String> {
    table
        .symbols()
        .map(|l| (jaro_winkler(&l.to_uppercase(), symbol), l))
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, l)| l.to_string())
}
