use serde::{Deserialize, Serialize};
use std::fmt;

/// Row label of an uploaded table.
///
/// `Missing` is the explicit marker left behind when a numeric date could not
/// be parsed. It orders after every symbol so those rows end up at the bottom
/// of a sorted table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    Symbol(String),
    Missing { raw: String },
}

impl Label {
    pub fn symbol(s: impl Into<String>) -> Self {
        Label::Symbol(s.into())
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Label::Symbol(s) => Some(s),
            Label::Missing { .. } => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Label::Missing { .. })
    }

    /// Text written to exported files; missing labels export as an empty cell.
    pub fn export_text(&self) -> &str {
        self.as_symbol().unwrap_or("")
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Symbol(s) => f.write_str(s),
            Label::Missing { raw } => write!(f, "<missing: {}>", raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Row {
    pub label: Label,
    pub cells: Vec<String>,
}

impl Row {
    pub fn new(label: impl Into<String>, cells: Vec<String>) -> Self {
        Self { label: Label::Symbol(label.into()), cells }
    }

    /// Second column of the source file, shown to whoever resolves ambiguous rows.
    pub fn description(&self) -> Option<&str> {
        self.cells.first().map(String::as_str).filter(|s| !s.trim().is_empty())
    }

    pub fn relabeled(&self, label: Label) -> Self {
        Self { label, cells: self.cells.clone() }
    }
}

/// An uploaded table: ordered rows keyed by the first column.
///
/// Row order is significant (ordinal suffixes follow it) and is only changed
/// by the final merge sort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub label_header: String,
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(name: impl Into<String>, label_header: impl Into<String>, headers: Vec<String>) -> Self {
        Self { name: name.into(), label_header: label_header.into(), headers, rows: Vec::new() }
    }

    pub fn with_rows(mut self, rows: Vec<Row>) -> Self {
        self.rows = rows;
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Labels in row order; missing labels are skipped.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().filter_map(|r| r.label.as_symbol())
    }

    pub fn rows_labeled<'a>(&'a self, symbol: &'a str) -> impl Iterator<Item = &'a Row> + 'a {
        self.rows.iter().filter(move |r| r.label.as_symbol() == Some(symbol))
    }

    /// Same table shape with a different set of rows.
    pub fn derive(&self, rows: Vec<Row>) -> Self {
        Self {
            name: self.name.clone(),
            label_header: self.label_header.clone(),
            headers: self.headers.clone(),
            rows,
        }
    }
}

/// Which correction path a table was routed down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    AmbiguousDates,
    Dates,
    Legacy,
    NumericDates,
    Clean,
}

impl RouteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AmbiguousDates => "ambiguous_dates",
            Self::Dates => "dates",
            Self::Legacy => "legacy",
            Self::NumericDates => "numeric_dates",
            Self::Clean => "clean",
        }
    }
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one table during a cleaning pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableReport {
    pub name: String,
    pub route: RouteKind,
    pub rows_in: usize,
    pub rows_out: usize,
    pub duplicates_collapsed: usize,
    /// (raw label, final label) for every relabeled row.
    pub renamed: Vec<(String, String)>,
    pub unparseable: Vec<String>,
    pub unmapped: Vec<String>,
}

impl TableReport {
    pub fn new(name: impl Into<String>, route: RouteKind, rows_in: usize) -> Self {
        Self {
            name: name.into(),
            route,
            rows_in,
            rows_out: rows_in,
            duplicates_collapsed: 0,
            renamed: Vec::new(),
            unparseable: Vec::new(),
            unmapped: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CleanedTable {
    pub table: Table,
    pub report: TableReport,
}
