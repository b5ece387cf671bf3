//! Per-table cleaning pass and the per-run collection of results.

use log::{debug, info, warn};
use std::collections::HashSet;
use std::fmt;

use crate::classify::{classify_table, Classification};
use crate::disambiguate::disambiguate;
use crate::error::CleanError;
use crate::merge::{merge, MergeOutcome};
use crate::models::{CleanedTable, Label, Row, RouteKind, Table, TableReport};
use crate::numeric::{parse_labels, relabel, DateFormatSource, NumericDateRequest};
use crate::reference::ReferenceTable;
use crate::resolve::{pair_for, AmbiguityResolver, RequestRow, ResolutionContext, ResolutionRequest};

/// Progress of one table through a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Unprocessed,
    Classified,
    Resolved,
    Merged,
    Final,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug)]
pub struct TableFailure {
    pub name: String,
    /// Last stage the table reached before failing.
    pub stage: Stage,
    pub error: CleanError,
}

/// Output of a run: cleaned tables in input order plus the tables that failed.
#[derive(Debug, Default)]
pub struct CleanedCollection {
    pub tables: Vec<CleanedTable>,
    pub failures: Vec<TableFailure>,
}

impl CleanedCollection {
    pub fn get(&self, name: &str) -> Option<&CleanedTable> {
        self.tables.iter().find(|t| t.table.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.table.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn reports(&self) -> impl Iterator<Item = &TableReport> {
        self.tables.iter().map(|t| &t.report)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CleanOptions {
    /// Upper-case every label before classification.
    pub uppercase_labels: bool,
}

pub struct Cleaner<'r> {
    reference: &'r ReferenceTable,
    options: CleanOptions,
}

struct DateResolution {
    merged: MergeOutcome,
    collapsed_before_merge: usize,
    renamed: Vec<(String, String)>,
    unmapped: Vec<String>,
}

impl<'r> Cleaner<'r> {
    pub fn new(reference: &'r ReferenceTable) -> Self {
        Self { reference, options: CleanOptions::default() }
    }

    pub fn with_options(mut self, options: CleanOptions) -> Self {
        self.options = options;
        self
    }

    /// Cleans every table in order. A failing table is recorded and skipped;
    /// the others are still processed.
    pub fn clean_all(
        &self,
        tables: Vec<Table>,
        ctx: &mut ResolutionContext,
        resolver: &mut dyn AmbiguityResolver,
        formats: &mut dyn DateFormatSource,
    ) -> CleanedCollection {
        let mut out = CleanedCollection::default();
        for table in tables {
            let mut stage = Stage::Unprocessed;
            match self.run(&table, ctx, resolver, formats, &mut stage) {
                Ok(cleaned) => out.tables.push(cleaned),
                Err(error) => {
                    warn!("Table '{}' not cleaned (stopped after {}): {}", table.name, stage, error);
                    out.failures.push(TableFailure { name: table.name.clone(), stage, error });
                }
            }
        }
        out
    }

    pub fn clean_table(
        &self,
        table: &Table,
        ctx: &mut ResolutionContext,
        resolver: &mut dyn AmbiguityResolver,
        formats: &mut dyn DateFormatSource,
    ) -> Result<CleanedTable, CleanError> {
        let mut stage = Stage::Unprocessed;
        self.run(table, ctx, resolver, formats, &mut stage)
    }

    fn run(
        &self,
        input: &Table,
        ctx: &mut ResolutionContext,
        resolver: &mut dyn AmbiguityResolver,
        formats: &mut dyn DateFormatSource,
        stage: &mut Stage,
    ) -> Result<CleanedTable, CleanError> {
        let table = self.prepare(input);
        let classification = classify_table(&table, self.reference);
        let route = classification.route();
        advance(&table.name, stage, Stage::Classified);
        info!("Table '{}': {} rows, route {}", table.name, table.len(), route);

        let mut report = TableReport::new(&table.name, route, table.len());
        let cleaned = match route {
            RouteKind::Clean => {
                info!("No errors detected for table '{}'", table.name);
                advance(&table.name, stage, Stage::Merged);
                table
            }
            RouteKind::Legacy => {
                let corrected = self.rename_legacy(&table, &classification, &mut report);
                advance(&table.name, stage, Stage::Resolved);
                let merged = merge(&table, &classification.legacy, corrected);
                advance(&table.name, stage, Stage::Merged);
                report.duplicates_collapsed = merged.duplicates_collapsed;
                merged.table
            }
            RouteKind::Dates | RouteKind::AmbiguousDates => {
                let res = self.resolve_dates(&table, &table, &classification.date_like, ctx, resolver, stage)?;
                finish_dates(&mut report, res)
            }
            RouteKind::NumericDates => {
                let request = NumericDateRequest { table: &table.name, labels: &classification.numeric };
                let format = formats.date_format(&request).map_err(|e| CleanError::MissingDateFormat {
                    table: table.name.clone(),
                    reason: e.to_string(),
                })?;
                info!("Table '{}': reading {} numeric labels as {} ({})", table.name, classification.numeric.len(), format.order, format.interpretation);
                let rename = parse_labels(&classification.numeric, format);
                report.unparseable = rename
                    .renamed
                    .iter()
                    .filter(|(_, label)| label.is_missing())
                    .map(|(raw, _)| raw.clone())
                    .collect();
                if !rename.failures.is_empty() {
                    warn!("Table '{}': {} labels could not be parsed; they are listed at the bottom of the table", table.name, rename.failures.len());
                }
                let renamed = relabel(&table, &rename);
                let reclassified = classify_table(&renamed, self.reference);
                match reclassified.route() {
                    RouteKind::Dates | RouteKind::AmbiguousDates => {
                        let res = self.resolve_dates(&renamed, &table, &reclassified.date_like, ctx, resolver, stage)?;
                        let out = finish_dates(&mut report, res);
                        report.renamed.extend(row_renames(&table, &renamed, &reclassified.date_like));
                        out
                    }
                    _ => {
                        report.renamed = row_renames(&table, &renamed, &[]);
                        let merged = merge(&renamed, &[], Vec::new());
                        advance(&table.name, stage, Stage::Merged);
                        report.duplicates_collapsed = merged.duplicates_collapsed;
                        merged.table
                    }
                }
            }
        };

        report.rows_out = cleaned.len();
        for token in &report.unmapped {
            warn!("Table '{}': no gene symbol known for {}", report.name, token);
        }
        advance(&cleaned.name, stage, Stage::Final);
        Ok(CleanedTable { table: cleaned, report })
    }

    fn prepare(&self, input: &Table) -> Table {
        if !self.options.uppercase_labels {
            return input.clone();
        }
        let rows = input
            .rows
            .iter()
            .map(|r| match &r.label {
                Label::Symbol(s) => r.relabeled(Label::Symbol(s.to_uppercase())),
                Label::Missing { .. } => r.clone(),
            })
            .collect();
        input.derive(rows)
    }

    fn rename_legacy(&self, table: &Table, classification: &Classification, report: &mut TableReport) -> Vec<Row> {
        let legacy: HashSet<&str> = classification.legacy.iter().map(String::as_str).collect();
        table
            .rows
            .iter()
            .filter_map(|row| {
                let prev = row.label.as_symbol().filter(|s| legacy.contains(s))?;
                let cur = self.reference.current_symbol(prev).unwrap_or(prev);
                report.renamed.push((prev.to_string(), cur.to_string()));
                Some(row.relabeled(Label::symbol(cur)))
            })
            .collect()
    }

    /// `origin` is `table` before any relabelling, row for row; the report
    /// names each corrected row by its label there.
    fn resolve_dates(
        &self,
        table: &Table,
        origin: &Table,
        date_like: &[String],
        ctx: &mut ResolutionContext,
        resolver: &mut dyn AmbiguityResolver,
        stage: &mut Stage,
    ) -> Result<DateResolution, CleanError> {
        let selected: HashSet<&str> = date_like.iter().map(String::as_str).collect();
        let positions: Vec<usize> = table
            .rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.label.as_symbol().is_some_and(|s| selected.contains(s)))
            .map(|(i, _)| i)
            .collect();
        let date_rows: Vec<Row> = positions.iter().map(|&i| table.rows[i].clone()).collect();
        let d = disambiguate(&date_rows);
        if d.duplicates_removed > 0 {
            info!("Table '{}': dropped {} duplicate rows", table.name, d.duplicates_removed);
        }

        for group in &d.ambiguous {
            let Some(pair) = pair_for(&group.token) else { continue };
            let rows = group
                .members
                .iter()
                .map(|&i| {
                    let s = &d.rows[i];
                    RequestRow { key: s.key(), raw: &s.raw, description: s.row.description(), cells: &s.row.cells }
                })
                .collect();
            let request = ResolutionRequest { table: &table.name, pair, rows };
            let choice = ctx.resolve(&request, resolver)?;
            debug!("Table '{}': {} resolved ({} first)", table.name, group.token, pair.assignment(choice).0);
        }
        advance(&table.name, stage, Stage::Resolved);

        let mut renamed = Vec::with_capacity(d.rows.len());
        let mut unmapped = Vec::new();
        let corrected: Vec<Row> = d
            .rows
            .iter()
            .map(|s| {
                let key = s.key();
                let label = match ctx.lookup(&key) {
                    Some(symbol) => symbol.to_string(),
                    None => {
                        unmapped.push(key.clone());
                        if d.group_size(&s.token) == 1 { s.token.clone() } else { key }
                    }
                };
                let raw = origin.rows.get(positions[s.source]).and_then(|r| r.label.as_symbol()).unwrap_or(&s.raw);
                renamed.push((raw.to_string(), label.clone()));
                s.row.relabeled(Label::Symbol(label))
            })
            .collect();

        let merged = merge(table, date_like, corrected);
        advance(&table.name, stage, Stage::Merged);
        Ok(DateResolution { merged, collapsed_before_merge: d.duplicates_removed, renamed, unmapped })
    }
}

fn finish_dates(report: &mut TableReport, res: DateResolution) -> Table {
    report.duplicates_collapsed = res.collapsed_before_merge + res.merged.duplicates_collapsed;
    report.renamed = res.renamed;
    report.unmapped = res.unmapped;
    res.merged.table
}

/// `before → after` for every row whose label changed to a symbol outside
/// `skip`. Both tables hold the same rows in the same order.
fn row_renames(before: &Table, after: &Table, skip: &[String]) -> Vec<(String, String)> {
    before
        .rows
        .iter()
        .zip(&after.rows)
        .filter_map(|(b, a)| {
            let (raw, symbol) = (b.label.as_symbol()?, a.label.as_symbol()?);
            (raw != symbol && !skip.iter().any(|s| s == symbol)).then(|| (raw.to_string(), symbol.to_string()))
        })
        .collect()
}

fn advance(table: &str, stage: &mut Stage, next: Stage) {
    debug!("Table '{}': {} -> {}", table, stage, next);
    *stage = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::{DateInterpretation, DateOrder, NumericDateFormat, PresetDateFormat};
    use crate::resolve::{PairChoice, PresetResolver};

    fn reference() -> ReferenceTable {
        ReferenceTable::from_pairs([("DEC1", "DELEC1"), ("SEPT1", "SEPTIN1")])
    }

    fn table(name: &str, rows: &[(&str, &str)]) -> Table {
        Table::new(name, "Gene", vec!["Description".into()]).with_rows(rows.iter().map(|(l, d)| Row::new(*l, vec![d.to_string()])).collect())
    }

    fn labels(t: &CleanedTable) -> Vec<String> {
        t.table.rows.iter().map(|r| r.label.to_string()).collect()
    }

    #[test]
    fn clean_tables_pass_through_unchanged() {
        let r = reference();
        let t = table("t", &[("TP53", "a"), ("ACTB", "b")]);
        let out = Cleaner::new(&r)
            .clean_table(&t, &mut ResolutionContext::new(), &mut PresetResolver::new(), &mut PresetDateFormat::default())
            .unwrap();
        assert_eq!(out.table, t);
        assert_eq!(out.report.route, RouteKind::Clean);
    }

    #[test]
    fn legacy_rename_leaves_unknown_labels() {
        let r = reference();
        let t = table("t", &[("TP53", "a"), ("DEC1", "b")]);
        let out = Cleaner::new(&r)
            .clean_table(&t, &mut ResolutionContext::new(), &mut PresetResolver::new(), &mut PresetDateFormat::default())
            .unwrap();
        assert_eq!(labels(&out), ["DELEC1", "TP53"]);
        assert_eq!(out.report.renamed, [("DEC1".to_string(), "DELEC1".to_string())]);
    }

    #[test]
    fn ambiguous_table_without_choice_fails_alone() {
        let r = reference();
        let tables = vec![table("bad", &[("Mar-01", "a")]), table("good", &[("Sep-01", "b")])];
        let out = Cleaner::new(&r).clean_all(tables, &mut ResolutionContext::new(), &mut PresetResolver::new(), &mut PresetDateFormat::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out.get("good").map(labels), Some(vec!["SEPTIN1".to_string()]));
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].stage, Stage::Classified);
        assert!(matches!(out.failures[0].error, CleanError::UnresolvedAmbiguity { .. }));
    }

    #[test]
    fn unmapped_tokens_fall_back() {
        let r = reference();
        let t = table("t", &[("Oct-3", "a"), ("Sep-01", "b"), ("Sep-01", "c")]);
        let out = Cleaner::new(&r)
            .clean_table(&t, &mut ResolutionContext::new(), &mut PresetResolver::new(), &mut PresetDateFormat::default())
            .unwrap();
        assert_eq!(labels(&out), ["Oct-03", "SEPTIN1", "Sep-01_2nd"]);
        assert_eq!(out.report.unmapped, ["Oct-03_1st".to_string(), "Sep-01_2nd".to_string()]);
    }

    #[test]
    fn numeric_dates_feed_the_date_path() {
        let r = reference();
        let t = table("t", &[("2021-09-01", "a"), ("2021-03-01", "b"), ("bogus-1-1", "c"), ("2021-44-01", "d")]);
        let mut ctx = ResolutionContext::new();
        let mut resolver = PresetResolver::new().with_choice("Mar-01", PairChoice::Second);
        let mut formats = PresetDateFormat(Some(NumericDateFormat::new(DateOrder::YearMonthDay, DateInterpretation::MonthDay)));
        let out = Cleaner::new(&r).clean_table(&t, &mut ctx, &mut resolver, &mut formats).unwrap();
        assert_eq!(out.report.route, RouteKind::NumericDates);
        assert_eq!(labels(&out), ["MARCHF1", "SEPTIN1", "bogus-1-1", "<missing: 2021-44-01>"]);
        assert_eq!(out.report.unparseable, ["2021-44-01".to_string()]);
        assert!(out.report.renamed.contains(&("2021-09-01".to_string(), "SEPTIN1".to_string())));
    }

    #[test]
    fn identical_numeric_labels_are_reported_per_row() {
        let r = reference();
        let t = table("t", &[("2021-03-01 00:00:00", "membrane associated ring-CH-type finger 1"), ("2021-03-01 00:00:00", "mitochondrial amidoxime reducing component 1")]);
        let mut resolver = PresetResolver::new().with_choice("Mar-01", PairChoice::Second);
        let mut formats = PresetDateFormat(Some(NumericDateFormat::new(DateOrder::YearMonthDay, DateInterpretation::MonthDay)));
        let out = Cleaner::new(&r).clean_table(&t, &mut ResolutionContext::new(), &mut resolver, &mut formats).unwrap();
        assert_eq!(labels(&out), ["MARCHF1", "MTARC1"]);
        let raw = "2021-03-01 00:00:00".to_string();
        assert_eq!(out.report.renamed, [(raw.clone(), "MARCHF1".to_string()), (raw, "MTARC1".to_string())]);
    }

    #[test]
    fn numeric_month_labels_outside_the_date_path_are_reported() {
        let r = reference();
        let t = table("t", &[("2021-01-05", "a"), ("2021-01-05", "b"), ("TP53", "c")]);
        let mut formats = PresetDateFormat(Some(NumericDateFormat::new(DateOrder::YearMonthDay, DateInterpretation::MonthDay)));
        let out = Cleaner::new(&r).clean_table(&t, &mut ResolutionContext::new(), &mut PresetResolver::new(), &mut formats).unwrap();
        assert_eq!(out.report.renamed.len(), 2);
        assert!(out.report.renamed.iter().all(|(raw, s)| raw == "2021-01-05" && s == "Jan-05"));
    }

    #[test]
    fn numeric_dates_without_format_fail() {
        let r = reference();
        let t = table("t", &[("2021-09-01", "a")]);
        let err = Cleaner::new(&r)
            .clean_table(&t, &mut ResolutionContext::new(), &mut PresetResolver::new(), &mut PresetDateFormat::default())
            .unwrap_err();
        assert!(matches!(err, CleanError::MissingDateFormat { .. }));
    }

    #[test]
    fn uppercase_option_applies_before_classification() {
        let r = reference();
        let t = table("t", &[("dec1", "a")]);
        let out = Cleaner::new(&r)
            .with_options(CleanOptions { uppercase_labels: true })
            .clean_table(&t, &mut ResolutionContext::new(), &mut PresetResolver::new(), &mut PresetDateFormat::default())
            .unwrap();
        assert_eq!(labels(&out), ["DELEC1"]);
    }
}
