//! Loading uploaded tables from CSV/TSV files and Excel workbooks.
//!
//! The first column holds the gene label, every other column is carried
//! through untouched.

use anyhow::{anyhow, bail, Context, Result};
use calamine::{open_workbook_auto, DataType, Reader};
use csv::ReaderBuilder;
use log::{info, warn};
use std::collections::HashSet;
use std::path::Path;

use crate::models::{Row, Table};
use crate::normalize::normalize_label;

const DEFAULT_LABEL_HEADER: &str = "Gene";

/// Reads every input path. A file that cannot be read is logged and skipped;
/// it is an error only when nothing at all could be read.
pub fn read_inputs<P: AsRef<Path>>(paths: &[P], sheets: &[String]) -> Result<Vec<Table>> {
    let mut tables = Vec::new();
    for path in paths {
        let path = path.as_ref();
        match read_path(path, sheets) {
            Ok(mut t) => {
                info!("Loaded {} table(s) from {}", t.len(), path.display());
                tables.append(&mut t);
            }
            Err(e) => warn!("Skipping {}: {:#}", path.display(), e),
        }
    }
    if tables.is_empty() {
        bail!("no readable tables in {} input file(s)", paths.len());
    }
    make_names_unique(&mut tables);
    Ok(tables)
}

pub fn read_path(path: &Path, sheets: &[String]) -> Result<Vec<Table>> {
    let ext = path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).unwrap_or_default();
    match ext.as_str() {
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => read_xlsx(path, sheets),
        "csv" => Ok(vec![read_delimited(path, b',')?]),
        "tsv" | "txt" => Ok(vec![read_delimited(path, b'\t')?]),
        other => bail!("unsupported input type '{}'", other),
    }
}

pub fn read_csv(path: &Path) -> Result<Table> {
    read_delimited(path, b',')
}

fn read_delimited(path: &Path, delimiter: u8) -> Result<Table> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let mut records: Vec<Vec<String>> = Vec::new();
    for (i, rec) in rdr.records().enumerate() {
        let rec = rec.with_context(|| format!("{}: record {}", path.display(), i + 2))?;
        records.push(rec.iter().map(str::to_string).collect());
    }
    Ok(table_from_records(&file_stem(path), headers, records))
}

/// One table per sheet. With an empty `sheets` every sheet is read; requested
/// sheets that do not exist are logged and skipped.
pub fn read_xlsx(path: &Path, sheets: &[String]) -> Result<Vec<Table>> {
    let mut workbook = open_workbook_auto(path).map_err(|e| anyhow!("unable to open {}: {}", path.display(), e))?;
    let available = workbook.sheet_names().to_vec();
    let wanted: Vec<String> = if sheets.is_empty() {
        available.clone()
    } else {
        sheets
            .iter()
            .filter(|s| {
                let present = available.contains(s);
                if !present {
                    warn!("{}: no sheet named '{}'", path.display(), s);
                }
                present
            })
            .cloned()
            .collect()
    };

    let mut tables = Vec::with_capacity(wanted.len());
    for name in wanted {
        let range = workbook
            .worksheet_range(&name)
            .ok_or_else(|| anyhow!("unable to read sheet '{}'", name))?
            .map_err(|e| anyhow!("unable to read sheet '{}': {}", name, e))?;
        let mut rows = range.rows();
        let Some(header_row) = rows.next() else {
            warn!("{}: sheet '{}' is empty", path.display(), name);
            continue;
        };
        let headers = header_row.iter().map(|c| cell_to_string(c).trim().to_string()).collect();
        let records = rows.map(|r| r.iter().map(cell_to_string).collect()).collect();
        tables.push(table_from_records(&name, headers, records));
    }
    Ok(tables)
}

/// Date cells come back as `YYYY-MM-DD HH:MM:SS` so they reach the numeric
/// date path instead of looking like a float serial.
fn cell_to_string(cell: &DataType) -> String {
    match cell {
        DataType::Empty => String::new(),
        DataType::DateTime(_) => cell
            .as_datetime()
            .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| cell.to_string()),
        _ => cell.to_string(),
    }
}

/// Builds a table from a header row and raw records. Rows with a blank label
/// are dropped, short rows are padded to the header width.
pub fn table_from_records(name: &str, headers: Vec<String>, records: Vec<Vec<String>>) -> Table {
    let mut headers = headers.into_iter();
    let label_header = headers.next().filter(|h| !h.is_empty()).unwrap_or_else(|| DEFAULT_LABEL_HEADER.to_string());
    let mut headers: Vec<String> = headers.collect();

    let width = records.iter().map(|r| r.len().saturating_sub(1)).max().unwrap_or(0).max(headers.len());
    for i in headers.len()..width {
        headers.push(format!("Column{}", i + 2));
    }

    let mut rows = Vec::with_capacity(records.len());
    let mut skipped = 0usize;
    for record in records {
        let mut fields = record.into_iter();
        let label = normalize_label(&fields.next().unwrap_or_default(), false);
        let mut cells: Vec<String> = fields.collect();
        if label.is_empty() {
            if cells.iter().any(|c| !c.trim().is_empty()) {
                skipped += 1;
            }
            continue;
        }
        cells.resize(width, String::new());
        rows.push(Row::new(label, cells));
    }
    if skipped > 0 {
        warn!("Table '{}': skipped {} row(s) without a gene label", name, skipped);
    }
    Table::new(name, label_header, headers).with_rows(rows)
}

fn file_stem(path: &Path) -> String {
    path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "table".to_string())
}

fn make_names_unique(tables: &mut [Table]) {
    let mut seen = HashSet::new();
    for t in tables.iter_mut() {
        let base = t.name.clone();
        let mut n = 1;
        while !seen.insert(t.name.clone()) {
            n += 1;
            t.name = format!("{} ({})", base, n);
        }
    }
}
