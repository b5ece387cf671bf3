use gene_updater::config::{AppConfig, ExportConfig, ExportFormat, LabelConfig, NumericConfig, ResolutionConfig};
use gene_updater::error::ConfigError;
use gene_updater::numeric::{DateInterpretation, DateOrder};
use gene_updater::resolve::PairChoice;

#[test]
fn defaults_and_validation_ok() {
    let cfg = AppConfig {
        reference: Some("data/hgnc_previous_symbols.csv".into()),
        export: ExportConfig { out_path: Some("./tmp/cleaned".into()), format: Some("both".into()) },
        labels: LabelConfig { uppercase: true },
        resolution: ResolutionConfig { mar01: Some(PairChoice::First), mar02: Some(PairChoice::Second), interactive: false },
        numeric: NumericConfig { order: Some(DateOrder::YearDayMonth), interpretation: Some(DateInterpretation::MonthYear) },
    };
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.export.export_format(), Ok(ExportFormat::Both));
    assert!(AppConfig::default().validate().is_ok());
    assert!(AppConfig::default().resolution.interactive);
}

#[test]
fn validation_catches_issues() {
    let bad = AppConfig {
        export: ExportConfig { out_path: Some("  ".into()), format: Some("xlsx".into()) },
        ..Default::default()
    };
    assert_eq!(bad.validate(), Err(ConfigError::MissingField("export.out_path")));

    let bad = AppConfig {
        export: ExportConfig { out_path: Some("out".into()), format: Some("pdf".into()) },
        ..Default::default()
    };
    let msg = format!("{}", bad.validate().unwrap_err());
    assert!(msg.contains("out of range") && msg.contains("pdf"));

    let bad = AppConfig {
        numeric: NumericConfig { order: None, interpretation: Some(DateInterpretation::MonthDay) },
        ..Default::default()
    };
    assert!(matches!(bad.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn config_round_trips_through_json() {
    let json = r#"{
        "reference": null,
        "export": { "out_path": "results/run", "format": "csv" },
        "labels": { "uppercase": false },
        "resolution": { "mar01": "second", "mar02": null, "interactive": false },
        "numeric": { "order": "dd-mm-yyyy", "interpretation": "month-day" }
    }"#;
    let cfg: AppConfig = serde_json::from_str(json).unwrap();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.resolution.mar01, Some(PairChoice::Second));
    assert_eq!(cfg.numeric.order, Some(DateOrder::DayMonthYear));
    assert!(cfg.export.export_format().unwrap().writes_csv());
}
