use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::numeric::{DateInterpretation, DateOrder, NumericDateFormat, PresetDateFormat};
use crate::resolve::{PairChoice, PresetResolver, MAR01, MAR02};

pub const DEFAULT_OUT_PATH: &str = "cleaned";
pub const DEFAULT_FORMAT: &str = "xlsx";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
    Both,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" => Some(Self::Xlsx),
            "both" => Some(Self::Both),
            _ => None,
        }
    }

    pub fn writes_csv(&self) -> bool {
        matches!(self, Self::Csv | Self::Both)
    }

    pub fn writes_xlsx(&self) -> bool {
        matches!(self, Self::Xlsx | Self::Both)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub out_path: Option<String>,
    pub format: Option<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { out_path: Some(DEFAULT_OUT_PATH.into()), format: Some(DEFAULT_FORMAT.into()) }
    }
}

impl ExportConfig {
    pub fn export_format(&self) -> Result<ExportFormat, ConfigError> {
        let f = self.format.as_deref().unwrap_or(DEFAULT_FORMAT);
        ExportFormat::parse(f).ok_or(ConfigError::OutOfRange { field: "export.format", value: f.to_string() })
    }

    fn base(&self) -> PathBuf {
        PathBuf::from(self.out_path.as_deref().unwrap_or(DEFAULT_OUT_PATH))
    }

    /// Workbook path: the out path, with `.xlsx` appended unless it already ends in it.
    pub fn xlsx_path(&self) -> PathBuf {
        let base = self.base();
        if has_xlsx_extension(&base) {
            return base;
        }
        let mut name = base.into_os_string();
        name.push(".xlsx");
        PathBuf::from(name)
    }

    /// Directory for per-table CSV files: the out path without an `.xlsx` extension.
    pub fn csv_dir(&self) -> PathBuf {
        let base = self.base();
        if has_xlsx_extension(&base) { base.with_extension("") } else { base }
    }
}

fn has_xlsx_extension(path: &Path) -> bool {
    path.extension().map_or(false, |e| e.eq_ignore_ascii_case("xlsx"))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelConfig {
    pub uppercase: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionConfig {
    pub mar01: Option<PairChoice>,
    pub mar02: Option<PairChoice>,
    /// Prompt on the terminal for choices not given up front.
    pub interactive: bool,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self { mar01: None, mar02: None, interactive: true }
    }
}

impl ResolutionConfig {
    pub fn preset_resolver(&self) -> PresetResolver {
        let mut r = PresetResolver::new();
        if let Some(c) = self.mar01 { r = r.with_choice(MAR01.token, c); }
        if let Some(c) = self.mar02 { r = r.with_choice(MAR02.token, c); }
        r
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NumericConfig {
    pub order: Option<DateOrder>,
    pub interpretation: Option<DateInterpretation>,
}

impl NumericConfig {
    pub fn format(&self) -> Option<NumericDateFormat> {
        Some(NumericDateFormat::new(self.order?, self.interpretation?))
    }

    pub fn preset(&self) -> PresetDateFormat {
        PresetDateFormat(self.format())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Previous-symbol CSV; the bundled table is used when unset.
    pub reference: Option<String>,
    pub export: ExportConfig,
    pub labels: LabelConfig,
    pub resolution: ResolutionConfig,
    pub numeric: NumericConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(r) = &self.reference {
            if r.trim().is_empty() { return Err(ConfigError::MissingField("reference")); }
        }
        match self.export.out_path.as_deref() {
            None => return Err(ConfigError::MissingField("export.out_path")),
            Some(p) if p.trim().is_empty() => return Err(ConfigError::MissingField("export.out_path")),
            _ => {}
        }
        self.export.export_format()?;
        match (self.numeric.order, self.numeric.interpretation) {
            (Some(_), None) | (None, Some(_)) => {
                return Err(ConfigError::Invalid("date order and date meaning must be given together".into()));
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_paths() {
        let e = ExportConfig { out_path: Some("out/run1".into()), format: Some("both".into()) };
        assert_eq!(e.xlsx_path(), PathBuf::from("out/run1.xlsx"));
        assert_eq!(e.csv_dir(), PathBuf::from("out/run1"));
        let e = ExportConfig { out_path: Some("genes.xlsx".into()), format: None };
        assert_eq!(e.xlsx_path(), PathBuf::from("genes.xlsx"));
        assert_eq!(e.csv_dir(), PathBuf::from("genes"));
        assert_eq!(e.export_format(), Ok(ExportFormat::Xlsx));
    }

    #[test]
    fn dotted_out_path_keeps_its_name() {
        let e = ExportConfig { out_path: Some("run.v2".into()), format: Some("both".into()) };
        assert_eq!(e.xlsx_path(), PathBuf::from("run.v2.xlsx"));
        assert_eq!(e.csv_dir(), PathBuf::from("run.v2"));
        let e = ExportConfig { out_path: Some("out/Genes.XLSX".into()), format: None };
        assert_eq!(e.xlsx_path(), PathBuf::from("out/Genes.XLSX"));
        assert_eq!(e.csv_dir(), PathBuf::from("out/Genes"));
    }

    #[test]
    fn preset_resolver_from_config() {
        use crate::resolve::{AmbiguityResolver, ResolutionRequest};
        let cfg = ResolutionConfig { mar01: Some(PairChoice::Second), mar02: None, interactive: false };
        let mut r = cfg.preset_resolver();
        let req = ResolutionRequest { table: "t", pair: &MAR01, rows: vec![] };
        assert_eq!(r.choose(&req).unwrap(), PairChoice::Second);
        let req = ResolutionRequest { table: "t", pair: &MAR02, rows: vec![] };
        assert!(r.choose(&req).is_err());
    }
}
