use anyhow::{bail, Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};
use std::cell::RefCell;
use std::io;

use gene_updater::cli::{Cli, TerminalPrompter};
use gene_updater::config::AppConfig;
use gene_updater::export::csv_export::{dump_tables, export_tables};
use gene_updater::export::xlsx_export::export_workbook;
use gene_updater::ingest::read_inputs;
use gene_updater::metrics::{RunSummary, RunTimer};
use gene_updater::numeric::{DateFormatSource, NumericDateRequest};
use gene_updater::pipeline::{CleanOptions, CleanedCollection, Cleaner};
use gene_updater::reference::ReferenceTable;
use gene_updater::resolve::{AmbiguityResolver, ResolutionContext, ResolutionRequest};
use gene_updater::search::{parse_query, search};

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let cfg = match cli.to_app_config() {
        Ok(cfg) => cfg,
        Err(e) => { eprintln!("Configuration error: {}", e); std::process::exit(2); }
    };

    if let Err(e) = run(&cli, &cfg) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli, cfg: &AppConfig) -> Result<()> {
    let timer = RunTimer::start();
    let reference = match &cfg.reference {
        Some(path) => ReferenceTable::load(path).with_context(|| format!("loading reference {}", path))?,
        None => ReferenceTable::embedded()?,
    };
    info!("Reference table: {} previous symbols", reference.len());
    if cli.show_reference {
        reference.write_tsv(io::stdout().lock()).context("printing reference table")?;
        if cli.inputs.is_empty() {
            return Ok(());
        }
    }

    let tables = read_inputs(&cli.inputs, &cli.sheets)?;
    if cli.show_inputs {
        dump_tables(&tables, io::stdout().lock()).context("printing input tables")?;
    }

    let mut preset = cfg.resolution.preset_resolver();
    let mut preset_format = cfg.numeric.preset();
    let interactive = cfg.resolution.interactive;
    let prompter = RefCell::new(TerminalPrompter::new(io::stdin().lock(), io::stderr()));
    let mut resolver = |req: &ResolutionRequest<'_>| match preset.choose(req) {
        Err(_) if interactive => prompter.borrow_mut().choose(req),
        other => other,
    };
    let mut formats = |req: &NumericDateRequest<'_>| match preset_format.date_format(req) {
        Err(_) if interactive => prompter.borrow_mut().date_format(req),
        other => other,
    };

    let mut ctx = ResolutionContext::new();
    let cleaner = Cleaner::new(&reference).with_options(CleanOptions { uppercase_labels: cfg.labels.uppercase });
    let collection = cleaner.clean_all(tables, &mut ctx, &mut resolver, &mut formats);

    let summary = RunSummary::from_run(&collection, &ctx, timer.elapsed());
    summary.log_summary();
    if collection.is_empty() {
        bail!("no table could be cleaned");
    }

    let format = cfg.export.export_format()?;
    if format.writes_csv() {
        let dir = cfg.export.csv_dir();
        let written = export_tables(&collection, &dir)?;
        info!("Wrote {} CSV file(s) to {}", written.len(), dir.display());
    }
    if format.writes_xlsx() {
        let path = cfg.export.xlsx_path();
        export_workbook(&collection, &path, &summary).with_context(|| format!("writing {}", path.display()))?;
        info!("Wrote {}", path.display());
    }

    if let Some(path) = &cli.summary_json {
        std::fs::write(path, summary.to_json()?).with_context(|| format!("writing {}", path.display()))?;
        info!("Summary written to {}", path.display());
    }

    if let Some(query) = &cli.search {
        print_search(&collection, query);
    }
    Ok(())
}

fn print_search(collection: &CleanedCollection, query: &str) {
    let symbols = parse_query(query);
    if symbols.is_empty() {
        warn!("Empty search query");
        return;
    }
    for result in search(collection, &symbols) {
        match result {
            Ok(hit) => {
                println!("== {} ==", hit.table);
                for row in hit.rows {
                    println!("{}\t{}", row.label, row.cells.join("\t"));
                }
            }
            Err(e) => warn!("{}", e),
        }
    }
}
