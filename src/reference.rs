//! HGNC previous-symbol reference table.
//!
//! Loaded once per process and shared read-only by every cleaning pass.

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;

const EMBEDDED: &str = include_str!("../data/hgnc_previous_symbols.csv");

const PREVIOUS_HEADERS: [&str; 4] = ["previous symbol", "previoussymbol", "input", "previous"];
const CURRENT_HEADERS: [&str; 4] = ["current symbol", "currentsymbol", "approved symbol", "current"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceTable {
    map: BTreeMap<String, String>,
}

impl ReferenceTable {
    pub fn from_pairs<I, A, B>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (prev, cur) in pairs {
            map.entry(prev.into()).or_insert_with(|| cur.into());
        }
        Self { map }
    }

    /// The previous-symbol table bundled with the crate.
    pub fn embedded() -> Result<Self> {
        Self::from_reader(EMBEDDED.as_bytes()).context("embedded reference table is malformed")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let f = std::fs::File::open(path).with_context(|| format!("Failed to open reference table {}", path.display()))?;
        let table = Self::from_reader(f).with_context(|| format!("Failed to read reference table {}", path.display()))?;
        log::info!("Loaded {} previous symbols from {}", table.len(), path.display());
        Ok(table)
    }

    /// Reads either a plain `PreviousSymbol,CurrentSymbol` CSV or an HGNC
    /// multi-symbol checker export (preamble line, then `Input`, `Match type`,
    /// `Approved symbol`, ...). Rows without a current symbol are skipped.
    pub fn from_reader<R: Read>(r: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new().has_headers(false).flexible(true).from_reader(r);
        let mut columns: Option<(usize, usize)> = None;
        let mut map = BTreeMap::new();
        for rec in rdr.records() {
            let rec = rec?;
            let Some((prev_idx, cur_idx)) = columns else {
                columns = header_columns(&rec);
                continue;
            };
            let prev = rec.get(prev_idx).map(str::trim).unwrap_or("");
            let cur = rec.get(cur_idx).map(str::trim).unwrap_or("");
            if prev.is_empty() || cur.is_empty() {
                continue;
            }
            if let Some(existing) = map.get(prev) {
                if existing != cur {
                    log::debug!("{} maps to both {} and {}; keeping {}", prev, existing, cur, existing);
                }
                continue;
            }
            map.insert(prev.to_string(), cur.to_string());
        }
        if columns.is_none() {
            bail!("no header row with previous and current symbol columns found");
        }
        Ok(Self { map })
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.map.contains_key(symbol)
    }

    pub fn current_symbol(&self, previous: &str) -> Option<&str> {
        self.map.get(previous).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Tab-separated `Previous Symbol`/`Current Symbol` listing, sorted by
    /// previous symbol.
    pub fn write_tsv<W: Write>(&self, out: W) -> Result<()> {
        let mut w = WriterBuilder::new().delimiter(b'\t').from_writer(out);
        w.write_record(["Previous Symbol", "Current Symbol"])?;
        for (prev, cur) in self.iter() {
            w.write_record([prev, cur])?;
        }
        w.flush()?;
        Ok(())
    }
}

fn header_columns(rec: &StringRecord) -> Option<(usize, usize)> {
    let norm: Vec<String> = rec.iter().map(|s| s.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()).collect();
    let prev = norm.iter().position(|h| PREVIOUS_HEADERS.contains(&h.as_str()))?;
    let cur = norm.iter().position(|h| CURRENT_HEADERS.contains(&h.as_str()))?;
    Some((prev, cur))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_table_covers_excel_affected_genes() {
        let r = ReferenceTable::embedded().unwrap();
        assert_eq!(r.current_symbol("DEC1"), Some("DELEC1"));
        assert_eq!(r.current_symbol("SEPT1"), Some("SEPTIN1"));
        assert_eq!(r.current_symbol("MARC2"), Some("MTARC2"));
        assert_eq!(r.current_symbol("SEP15"), Some("SELENOF"));
        assert!(!r.contains("TP53"));
    }

    #[test]
    fn reads_hgnc_checker_export_with_preamble() {
        let data = "\
\"HGNC multi-symbol checker results, 2021\"
Input,Match type,Approved symbol,Approved name,HGNC ID
DEC1,Previous symbol,DELEC1,deleted in esophageal cancer 1,HGNC:23658
SEPT1,Previous symbol,SEPTIN1,septin 1,HGNC:2879
FOO1,Unmatched,,,
";
        let r = ReferenceTable::from_reader(data.as_bytes()).unwrap();
        assert_eq!(r.len(), 2);
        assert_eq!(r.current_symbol("SEPT1"), Some("SEPTIN1"));
        assert!(!r.contains("FOO1"));
    }

    #[test]
    fn first_mapping_wins() {
        let data = "Previous Symbol,Current Symbol\nA1,B1\nA1,C1\n";
        let r = ReferenceTable::from_reader(data.as_bytes()).unwrap();
        assert_eq!(r.current_symbol("A1"), Some("B1"));
    }

    #[test]
    fn listing_is_sorted_by_previous_symbol() {
        let r = ReferenceTable::from_pairs([("SEPT1", "SEPTIN1"), ("DEC1", "DELEC1")]);
        let mut out = Vec::new();
        r.write_tsv(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Previous Symbol\tCurrent Symbol\nDEC1\tDELEC1\nSEPT1\tSEPTIN1\n");

        let mut out = Vec::new();
        ReferenceTable::embedded().unwrap().write_tsv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.lines().any(|l| l == "MARCH1\tMARCHF1"));
        assert_eq!(text.lines().count(), ReferenceTable::embedded().unwrap().len() + 1);
    }

    #[test]
    fn missing_header_is_an_error() {
        assert!(ReferenceTable::from_reader("a,b\nc,d\n".as_bytes()).is_err());
    }
}
