//! Error types for gene_updater.
//!
//! Every cleaning error is recoverable at the label or table level: a bad
//! numeric date becomes a missing label, an unresolved ambiguity or a failed
//! search affects only the table it came from.

use thiserror::Error;

use crate::numeric::DateOrder;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CleanError {
    /// A numeric label did not parse under the declared format. Recorded as a
    /// diagnostic; the row keeps a missing label.
    #[error("'{label}' is not a valid {order} date")]
    UnparseableDate { label: String, order: DateOrder },

    /// An ambiguous token group has no disambiguation choice.
    #[error("table '{table}': {token} needs a disambiguation choice ({reason})")]
    UnresolvedAmbiguity { table: String, token: String, reason: String },

    /// Numeric date labels were found but no date format was supplied.
    #[error("table '{table}': numeric date labels need a date format ({reason})")]
    MissingDateFormat { table: String, reason: String },

    /// A searched symbol is absent from a cleaned table.
    #[error("table '{table}': gene not found: {}", describe_missing(.missing, .suggestion))]
    LabelNotFound { table: String, missing: Vec<String>, suggestion: Option<String> },
}

impl CleanError {
    /// Name of the table this error belongs to, if any.
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::UnparseableDate { .. } => None,
            Self::UnresolvedAmbiguity { table, .. }
            | Self::MissingDateFormat { table, .. }
            | Self::LabelNotFound { table, .. } => Some(table),
        }
    }
}

fn describe_missing(missing: &[String], suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!("{} (did you mean {}?)", missing.join(", "), s),
        None => missing.join(", "),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
