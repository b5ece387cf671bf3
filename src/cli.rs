use clap::{Parser, ValueEnum};
use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::config::{AppConfig, ExportConfig, LabelConfig, NumericConfig, ResolutionConfig};
use crate::error::ConfigError;
use crate::numeric::{DateFormatSource, DateInterpretation, DateOrder, NumericDateFormat, NumericDateRequest};
use crate::resolve::{AmbiguityResolver, PairChoice, ResolutionRequest, ResolveError};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, ValueEnum, Debug)]
pub enum FormatOpt { Csv, Xlsx, Both }

impl FormatOpt {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
            Self::Both => "both"
        }
    }
}

impl std::fmt::Display for FormatOpt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Parser, Debug)]
#[command(name = "gene_updater", version, about = "Restore gene symbols mangled into dates by spreadsheets", disable_help_subcommand = true)]
pub struct Cli {
    /// Input tables (.csv, .tsv, .xlsx)
    #[arg(value_name = "INPUT", required_unless_present = "show_reference")]
    pub inputs: Vec<PathBuf>,
    /// Previous-symbol reference CSV (env: GENE_UPDATER_REFERENCE, default: bundled HGNC table)
    #[arg(short = 'r', long = "reference", value_name = "CSV", env = "GENE_UPDATER_REFERENCE")]
    pub reference: Option<String>,
    /// Output path (env: GENE_UPDATER_OUT)
    #[arg(short = 'o', long = "out", value_name = "PATH", env = "GENE_UPDATER_OUT", default_value = "cleaned")]
    pub out_path: String,
    /// Output format
    #[arg(short = 'f', long = "format", value_name = "FORMAT", default_value_t = FormatOpt::Xlsx)]
    pub format: FormatOpt,
    /// Workbook sheet to read (repeatable; default all)
    #[arg(long = "sheet", value_name = "NAME")]
    pub sheets: Vec<String>,
    /// Gene for the first Mar-01 row: mtarc or marchf
    #[arg(long = "mar01", value_name = "GENE")]
    pub mar01: Option<PairChoice>,
    /// Gene for the first Mar-02 row: mtarc or marchf
    #[arg(long = "mar02", value_name = "GENE")]
    pub mar02: Option<PairChoice>,
    /// Field order of numeric dates: yyyy-dd-mm, yyyy-mm-dd, dd-mm-yyyy, mm-dd-yyyy
    #[arg(long = "date-order", value_name = "ORDER")]
    pub date_order: Option<DateOrder>,
    /// What numeric dates encode: month-day or month-year
    #[arg(long = "date-meaning", value_name = "MEANING")]
    pub date_meaning: Option<DateInterpretation>,
    /// Never prompt; tables needing a missing choice fail (env: GENE_UPDATER_NON_INTERACTIVE)
    #[arg(long = "non-interactive", env = "GENE_UPDATER_NON_INTERACTIVE")]
    pub non_interactive: bool,
    /// Upper-case labels before processing
    #[arg(long = "uppercase-labels")]
    pub uppercase_labels: bool,
    /// Print rows for these genes after cleaning, e.g. "SEPTIN1; DELEC1"
    #[arg(long = "search", value_name = "QUERY")]
    pub search: Option<String>,
    /// Print the previous -> current symbol table in use
    #[arg(long = "show-reference")]
    pub show_reference: bool,
    /// Print the input tables as read, before cleaning
    #[arg(long = "show-inputs")]
    pub show_inputs: bool,
    /// Write the run summary as JSON
    #[arg(long = "summary-json", value_name = "PATH")]
    pub summary_json: Option<PathBuf>,
}

impl Cli {
    pub fn to_app_config(&self) -> Result<AppConfig, ConfigError> {
        let cfg = AppConfig {
            reference: self.reference.clone(),
            export: ExportConfig { out_path: Some(self.out_path.clone()), format: Some(self.format.as_str().into()) },
            labels: LabelConfig { uppercase: self.uppercase_labels },
            resolution: ResolutionConfig { mar01: self.mar01, mar02: self.mar02, interactive: !self.non_interactive },
            numeric: NumericConfig { order: self.date_order, interpretation: self.date_meaning },
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

const MAX_ATTEMPTS: usize = 3;
const SAMPLE_LABELS: usize = 5;

/// Asks the person running the tool, one line per answer.
pub struct TerminalPrompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Reads one trimmed answer; `q` or end of input abandons.
    fn read_answer(&mut self) -> Result<String, ResolveError> {
        write!(self.output, "> ")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(ResolveError::Abandoned("end of input".into()));
        }
        let answer = line.trim().to_string();
        if answer.eq_ignore_ascii_case("q") {
            return Err(ResolveError::Abandoned("quit at prompt".into()));
        }
        Ok(answer)
    }

    fn ask<T>(&mut self, parse: impl Fn(&str) -> Option<T>, what: &str) -> Result<T, ResolveError> {
        for _ in 0..MAX_ATTEMPTS {
            let answer = self.read_answer()?;
            if let Some(v) = parse(&answer) {
                return Ok(v);
            }
            writeln!(self.output, "Not understood: '{}'", answer)?;
        }
        Err(ResolveError::Abandoned(format!("no valid {} after {} attempts", what, MAX_ATTEMPTS)))
    }
}

impl<R: BufRead, W: Write> AmbiguityResolver for TerminalPrompter<R, W> {
    fn choose(&mut self, request: &ResolutionRequest<'_>) -> Result<PairChoice, ResolveError> {
        let pair = request.pair;
        writeln!(self.output, "\nTable '{}': {} can be {} or {}.", request.table, pair.token, pair.first.symbol, pair.second.symbol)?;
        for row in &request.rows {
            writeln!(self.output, "  {:<12} (was {}) {}", row.key, row.raw, row.description.unwrap_or(""))?;
        }
        writeln!(self.output, "Which gene is {}_1st?", pair.token)?;
        writeln!(self.output, "  1) {} - {}", pair.first.symbol, pair.first.description)?;
        writeln!(self.output, "  2) {} - {}", pair.second.symbol, pair.second.description)?;
        writeln!(self.output, "  q) skip this table")?;
        self.ask(|a| a.parse::<PairChoice>().ok(), "choice")
    }
}

impl<R: BufRead, W: Write> DateFormatSource for TerminalPrompter<R, W> {
    fn date_format(&mut self, request: &NumericDateRequest<'_>) -> Result<NumericDateFormat, ResolveError> {
        writeln!(self.output, "\nTable '{}' has {} labels stored as dates, e.g.:", request.table, request.labels.len())?;
        for l in request.labels.iter().take(SAMPLE_LABELS) {
            writeln!(self.output, "  {}", l)?;
        }
        writeln!(self.output, "Field order?")?;
        for (i, o) in DateOrder::ALL.iter().enumerate() {
            writeln!(self.output, "  {}) {}", i + 1, o)?;
        }
        let order = self.ask(
            |a| match a.parse::<usize>() {
                Ok(n) => DateOrder::ALL.get(n.wrapping_sub(1)).copied(),
                Err(_) => a.parse().ok(),
            },
            "date order",
        )?;
        writeln!(self.output, "Do the fields encode the gene as\n  1) month-day (Sep-01 from September 1st)\n  2) month-year (Sep-21 from September 2021)")?;
        let interpretation = self.ask(
            |a| match a {
                "1" => Some(DateInterpretation::MonthDay),
                "2" => Some(DateInterpretation::MonthYear),
                other => other.parse().ok(),
            },
            "date meaning",
        )?;
        Ok(NumericDateFormat::new(order, interpretation))
    }
}
