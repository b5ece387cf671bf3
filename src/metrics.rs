/// Run summary for gene_updater
/// Collects per-table reports, failures and timing for logging and JSON export

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::models::TableReport;
use crate::pipeline::CleanedCollection;
use crate::resolve::{PairChoice, ResolutionContext};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureSummary {
    pub table: String,
    pub stage: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub timestamp: DateTime<Utc>,
    pub elapsed_secs: f64,
    pub tables: Vec<TableReport>,
    pub failures: Vec<FailureSummary>,
    /// Disambiguation choices in force at the end of the run, by token.
    pub choices: BTreeMap<String, PairChoice>,
}

impl RunSummary {
    pub fn from_run(collection: &CleanedCollection, ctx: &ResolutionContext, elapsed: Duration) -> Self {
        Self {
            timestamp: Utc::now(),
            elapsed_secs: elapsed.as_secs_f64(),
            tables: collection.reports().cloned().collect(),
            failures: collection
                .failures
                .iter()
                .map(|f| FailureSummary { table: f.name.clone(), stage: f.stage.to_string(), error: f.error.to_string() })
                .collect(),
            choices: ctx.choices().map(|(k, v)| (k.to_string(), v)).collect(),
        }
    }

    pub fn rows_in(&self) -> usize {
        self.tables.iter().map(|t| t.rows_in).sum()
    }

    pub fn rows_out(&self) -> usize {
        self.tables.iter().map(|t| t.rows_out).sum()
    }

    pub fn renamed(&self) -> usize {
        self.tables.iter().map(|t| t.renamed.len()).sum()
    }

    pub fn unparseable(&self) -> usize {
        self.tables.iter().map(|t| t.unparseable.len()).sum()
    }

    pub fn unmapped(&self) -> usize {
        self.tables.iter().map(|t| t.unmapped.len()).sum()
    }

    /// Export as pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn log_summary(&self) {
        info!(
            "Cleaned {} table(s) in {:.3}s: {} rows in, {} rows out, {} labels corrected",
            self.tables.len(),
            self.elapsed_secs,
            self.rows_in(),
            self.rows_out(),
            self.renamed()
        );
        for t in &self.tables {
            info!(
                "  {} [{}]: {} -> {} rows, {} renamed, {} duplicates collapsed",
                t.name,
                t.route,
                t.rows_in,
                t.rows_out,
                t.renamed.len(),
                t.duplicates_collapsed
            );
        }
        if self.unparseable() > 0 {
            warn!("{} numeric label(s) could not be parsed", self.unparseable());
        }
        if self.unmapped() > 0 {
            warn!("{} date token(s) had no known gene symbol", self.unmapped());
        }
        for f in &self.failures {
            warn!("  {} failed after {}: {}", f.table, f.stage, f.error);
        }
    }
}

/// Simple wall-clock timer for a run
pub struct RunTimer {
    start: Instant,
}

impl RunTimer {
    pub fn start() -> Self {
        Self { start: Instant::now() }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
