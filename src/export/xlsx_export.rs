use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::Result;
use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook, Worksheet};

use crate::metrics::RunSummary;
use crate::models::Table;
use crate::pipeline::CleanedCollection;

const MAX_SHEET_NAME: usize = 31;
const SUMMARY_SHEET: &str = "Summary";

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn header_format() -> Format {
    Format::new().set_bold().set_align(FormatAlign::Center)
}

fn row_format_even() -> Format {
    Format::new().set_background_color(Color::RGB(0xF2F2F2))
}

/// Excel sheet names: at most 31 chars, none of `[]:*?/\`, not blank.
pub fn sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\') { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'');
    let cleaned = if cleaned.is_empty() { "Sheet" } else { cleaned };
    cleaned.chars().take(MAX_SHEET_NAME).collect()
}

/// Sheet names for every table, sanitized and unique (case-insensitive, as
/// Excel compares them). `Summary` is reserved.
fn unique_sheet_names<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(SUMMARY_SHEET.to_lowercase());
    let mut out = Vec::new();
    for name in names {
        let base = sheet_name(name);
        let mut candidate = base.clone();
        let mut n = 1;
        while !seen.insert(candidate.to_lowercase()) {
            n += 1;
            let suffix = format!("~{}", n);
            let keep = MAX_SHEET_NAME - suffix.len();
            candidate = format!("{}{}", base.chars().take(keep).collect::<String>(), suffix);
        }
        out.push(candidate);
    }
    out
}

fn write_table_sheet(ws: &mut Worksheet, table: &Table) -> Result<()> {
    let hfmt = header_format();
    ws.write_string_with_format(0, 0, &table.label_header, &hfmt)?;
    for (c, h) in table.headers.iter().enumerate() {
        ws.write_string_with_format(0, (c + 1) as u16, h, &hfmt)?;
    }

    let even = row_format_even();
    for (i, row) in table.rows.iter().enumerate() {
        let r = (i + 1) as u32;
        if i % 2 == 0 { ws.set_row_format(r, &even)?; }
        ws.write_string(r, 0, row.label.export_text())?;
        for (c, v) in row.cells.iter().enumerate() {
            ws.write_string(r, (c + 1) as u16, v)?;
        }
    }
    Ok(())
}

fn write_summary_sheet(ws: &mut Worksheet, summary: &RunSummary) -> Result<()> {
    let hfmt = header_format();
    let mut row: u32 = 0;

    ws.write_string_with_format(row, 0, "Summary", &hfmt)?; row += 2;

    let kv = |ws: &mut Worksheet, r: &mut u32, k: &str, v: &str| -> Result<()> {
        ws.write_string(*r, 0, k)?;
        ws.write_string(*r, 1, v)?;
        *r += 1;
        Ok(())
    };

    kv(ws, &mut row, "Tables cleaned", &summary.tables.len().to_string())?;
    kv(ws, &mut row, "Tables failed", &summary.failures.len().to_string())?;
    kv(ws, &mut row, "Rows in", &summary.rows_in().to_string())?;
    kv(ws, &mut row, "Rows out", &summary.rows_out().to_string())?;
    kv(ws, &mut row, "Labels corrected", &summary.renamed().to_string())?;
    kv(ws, &mut row, "Unparseable dates", &summary.unparseable().to_string())?;
    kv(ws, &mut row, "Unmapped tokens", &summary.unmapped().to_string())?;
    for (token, choice) in &summary.choices {
        kv(ws, &mut row, &format!("{} choice", token), &choice.to_string())?;
    }
    kv(ws, &mut row, "Elapsed (s)", &format!("{:.3}", summary.elapsed_secs))?;
    kv(ws, &mut row, "Timestamp (UTC)", &summary.timestamp.to_rfc3339())?;

    row += 1;
    let headers = ["Table", "Route", "Rows in", "Rows out", "Duplicates", "Renamed", "Unparseable", "Unmapped"];
    for (c, h) in headers.iter().enumerate() {
        ws.write_string_with_format(row, c as u16, *h, &hfmt)?;
    }
    for t in &summary.tables {
        row += 1;
        ws.write_string(row, 0, &t.name)?;
        ws.write_string(row, 1, t.route.as_str())?;
        ws.write_number(row, 2, t.rows_in as f64)?;
        ws.write_number(row, 3, t.rows_out as f64)?;
        ws.write_number(row, 4, t.duplicates_collapsed as f64)?;
        ws.write_number(row, 5, t.renamed.len() as f64)?;
        ws.write_string(row, 6, &t.unparseable.join(", "))?;
        ws.write_string(row, 7, &t.unmapped.join(", "))?;
    }
    for f in &summary.failures {
        row += 1;
        ws.write_string(row, 0, &f.table)?;
        ws.write_string(row, 1, &format!("failed ({})", f.stage))?;
        ws.write_string(row, 6, &f.error)?;
    }
    Ok(())
}

/// One sheet per cleaned table, in collection order, plus a `Summary` sheet.
pub fn export_workbook(collection: &CleanedCollection, out_path: &Path, summary: &RunSummary) -> Result<()> {
    ensure_parent_dir(out_path)?;

    let mut workbook = Workbook::new();
    let names = unique_sheet_names(collection.names());
    for (cleaned, name) in collection.tables.iter().zip(&names) {
        let ws = workbook.add_worksheet();
        ws.set_name(name)?;
        write_table_sheet(ws, &cleaned.table)?;
    }

    let ws = workbook.add_worksheet();
    ws.set_name(SUMMARY_SHEET)?;
    write_summary_sheet(ws, summary)?;

    workbook.save(out_path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CleanedTable, Row, RouteKind, TableReport};
    use crate::resolve::ResolutionContext;
    use std::time::Duration;

    #[test]
    fn sheet_names_follow_excel_rules() {
        assert_eq!(sheet_name("a/b:c"), "a_b_c");
        assert_eq!(sheet_name("   "), "Sheet");
        assert_eq!(sheet_name(&"x".repeat(40)).len(), MAX_SHEET_NAME);

        let long = "y".repeat(40);
        let names = unique_sheet_names(["Genes", "genes", long.as_str(), long.as_str(), "Summary"].into_iter());
        assert_eq!(names[0], "Genes");
        assert_eq!(names[1], "genes~2");
        assert_eq!(names[3].len(), MAX_SHEET_NAME);
        assert!(names[3].ends_with("~2"));
        assert_eq!(names[4], "Summary~2");
    }

    #[test]
    fn write_xlsx_basic() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("cleaned.xlsx");
        let table = Table::new("liver", "Gene", vec!["Description".into()])
            .with_rows(vec![Row::new("MARCHF1", vec!["ring finger".into()]), Row::new("SEPTIN1", vec!["septin".into()])]);
        let collection = CleanedCollection {
            tables: vec![CleanedTable { table, report: TableReport::new("liver", RouteKind::Dates, 2) }],
            failures: vec![],
        };
        let summary = RunSummary::from_run(&collection, &ResolutionContext::new(), Duration::from_millis(1));
        export_workbook(&collection, &out, &summary).unwrap();
        let meta = std::fs::metadata(&out).unwrap();
        assert!(meta.len() > 0);
    }
}
