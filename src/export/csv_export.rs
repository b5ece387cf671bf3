use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::{Writer, WriterBuilder};

use crate::models::Table;
use crate::pipeline::CleanedCollection;

/// Writes one `<name>.csv` per cleaned table into `dir` and returns the paths.
pub fn export_tables(collection: &CleanedCollection, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let mut written = Vec::with_capacity(collection.len());
    let stems = unique_file_stems(collection.names());
    for (cleaned, stem) in collection.tables.iter().zip(&stems) {
        let path = dir.join(format!("{}.csv", stem));
        export_table(&cleaned.table, &path)?;
        written.push(path);
    }
    Ok(written)
}

pub fn export_table(table: &Table, path: &Path) -> Result<()> {
    let mut w = Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    write_table(&mut w, table)?;
    w.flush()?;
    Ok(())
}

/// Header row first, then one record per row. Missing labels are written
/// as an empty first field.
pub fn write_table<W: Write>(w: &mut Writer<W>, table: &Table) -> Result<()> {
    write_headers(w, table)?;
    for row in &table.rows {
        w.write_field(row.label.export_text())?;
        w.write_record(&row.cells)?;
    }
    Ok(())
}

/// Tab-separated dump of several tables, each under a `== name ==` line.
pub fn dump_tables<W: Write>(tables: &[Table], mut out: W) -> Result<()> {
    for table in tables {
        writeln!(out, "== {} ==", table.name)?;
        let mut w = WriterBuilder::new().delimiter(b'\t').from_writer(&mut out);
        write_table(&mut w, table)?;
        w.flush()?;
    }
    Ok(())
}

fn write_headers<W: Write>(w: &mut Writer<W>, table: &Table) -> Result<()> {
    w.write_field(&table.label_header)?;
    w.write_record(&table.headers)?;
    Ok(())
}

fn file_name(table: &str) -> String {
    let cleaned: String = table
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ' | '(' | ')') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.').to_string();
    if cleaned.is_empty() { "table".to_string() } else { cleaned }
}

/// Sanitised stems, numbered ` (n)` when they repeat ignoring case.
fn unique_file_stems<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for name in names {
        let base = file_name(name);
        let mut candidate = base.clone();
        let mut n = 1;
        while !seen.insert(candidate.to_lowercase()) {
            n += 1;
            candidate = format!("{} ({})", base, n);
        }
        out.push(candidate);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CleanedTable, Label, Row, RouteKind, TableReport};

    #[test]
    fn write_csv_basic() {
        let mut missing = Row::new("x", vec!["gone".into()]);
        missing.label = Label::Missing { raw: "2021-31-31".into() };
        let table = Table::new("t", "Gene", vec!["Description".into()])
            .with_rows(vec![Row::new("SEPTIN1", vec!["septin 1".into()]), missing]);
        let mut w = Writer::from_writer(Vec::new());
        write_table(&mut w, &table).unwrap();
        let out = String::from_utf8(w.into_inner().unwrap()).unwrap();
        assert_eq!(out, "Gene,Description\nSEPTIN1,septin 1\n,gone\n");
    }

    #[test]
    fn one_file_per_table() {
        let dir = tempfile::tempdir().unwrap();
        let t = |name: &str| CleanedTable {
            table: Table::new(name, "Gene", vec![]).with_rows(vec![Row::new("DELEC1", vec![])]),
            report: TableReport::new(name, RouteKind::Legacy, 1),
        };
        let collection = CleanedCollection { tables: vec![t("liver"), t("a/b")], failures: vec![] };
        let paths = export_tables(&collection, &dir.path().join("out")).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths[1].ends_with("a_b.csv"));
        assert_eq!(std::fs::read_to_string(&paths[0]).unwrap(), "Gene\nDELEC1\n");
    }

    #[test]
    fn dump_lists_every_table() {
        let a = Table::new("screen", "Gene", vec!["Score".into()]).with_rows(vec![Row::new("Sep-01", vec!["4.2".into()])]);
        let b = Table::new("legacy", "Symbol", vec![]).with_rows(vec![Row::new("DEC1", vec![])]);
        let mut out = Vec::new();
        dump_tables(&[a, b], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "== screen ==\nGene\tScore\nSep-01\t4.2\n== legacy ==\nSymbol\nDEC1\n");
    }

    #[test]
    fn stems_that_collide_after_sanitising_are_numbered() {
        let stems = unique_file_stems(["liver+1", "liver_1", "Liver_1", "kidney"].into_iter());
        assert_eq!(stems, ["liver_1", "liver_1 (2)", "Liver_1 (3)", "kidney"]);
    }
}
