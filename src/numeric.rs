//! Numeric date labels.
//!
//! When a spreadsheet stored a corrupted gene as a real date cell, the loader
//! hands us `2021-09-01 00:00:00` instead of `1-Sep`. The field order and the
//! meaning of the fields cannot be inferred, so both come from the user.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::CleanError;
use crate::models::{Label, Table};
use crate::resolve::ResolveError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DateOrder {
    #[serde(rename = "yyyy-dd-mm")]
    YearDayMonth,
    #[serde(rename = "yyyy-mm-dd")]
    YearMonthDay,
    #[serde(rename = "dd-mm-yyyy")]
    DayMonthYear,
    #[serde(rename = "mm-dd-yyyy")]
    MonthDayYear,
}

impl DateOrder {
    pub const ALL: [DateOrder; 4] = [Self::YearDayMonth, Self::YearMonthDay, Self::DayMonthYear, Self::MonthDayYear];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::YearDayMonth => "yyyy-dd-mm",
            Self::YearMonthDay => "yyyy-mm-dd",
            Self::DayMonthYear => "dd-mm-yyyy",
            Self::MonthDayYear => "mm-dd-yyyy",
        }
    }

    fn chrono_format(&self) -> &'static str {
        match self {
            Self::YearDayMonth => "%Y-%d-%m",
            Self::YearMonthDay => "%Y-%m-%d",
            Self::DayMonthYear => "%d-%m-%Y",
            Self::MonthDayYear => "%m-%d-%Y",
        }
    }
}

impl fmt::Display for DateOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DateOrder {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase().replace('/', "-");
        Self::ALL
            .into_iter()
            .find(|o| o.as_str() == s)
            .ok_or_else(|| format!("unknown date order '{}': expected one of yyyy-dd-mm, yyyy-mm-dd, dd-mm-yyyy, mm-dd-yyyy", s))
    }
}

/// How the parsed date maps back onto a `Mon-DD` gene token.
///
/// `MonthYear` covers Excel writing the gene number into the year field: the
/// two-digit year becomes the token's day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DateInterpretation {
    #[serde(rename = "month-day")]
    MonthDay,
    #[serde(rename = "month-year")]
    MonthYear,
}

impl DateInterpretation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MonthDay => "month-day",
            Self::MonthYear => "month-year",
        }
    }

    fn output_format(&self) -> &'static str {
        match self {
            Self::MonthDay => "%b-%d",
            Self::MonthYear => "%b-%y",
        }
    }
}

impl fmt::Display for DateInterpretation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DateInterpretation {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "month-day" => Ok(Self::MonthDay),
            "month-year" => Ok(Self::MonthYear),
            other => Err(format!("unknown date meaning '{}': expected month-day or month-year", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericDateFormat {
    pub order: DateOrder,
    pub interpretation: DateInterpretation,
}

impl NumericDateFormat {
    pub fn new(order: DateOrder, interpretation: DateInterpretation) -> Self {
        Self { order, interpretation }
    }
}

/// What a date-format source is shown before it answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumericDateRequest<'a> {
    pub table: &'a str,
    pub labels: &'a [String],
}

pub trait DateFormatSource {
    fn date_format(&mut self, request: &NumericDateRequest<'_>) -> Result<NumericDateFormat, ResolveError>;
}

impl<F> DateFormatSource for F
where
    F: FnMut(&NumericDateRequest<'_>) -> Result<NumericDateFormat, ResolveError>,
{
    fn date_format(&mut self, request: &NumericDateRequest<'_>) -> Result<NumericDateFormat, ResolveError> {
        self(request)
    }
}

/// A format fixed up front; fails when none was configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct PresetDateFormat(pub Option<NumericDateFormat>);

impl DateFormatSource for PresetDateFormat {
    fn date_format(&mut self, _: &NumericDateRequest<'_>) -> Result<NumericDateFormat, ResolveError> {
        self.0.ok_or_else(|| ResolveError::Missing("date format".into()))
    }
}

/// Parses one numeric label into a month token such as `Sep-01`.
pub fn parse_numeric_label(label: &str, format: NumericDateFormat) -> Result<String, CleanError> {
    let date_part = label.trim().split([' ', 'T']).next().unwrap_or("");
    let normalized = date_part.replace(['/', '.'], "-");
    let date = NaiveDate::parse_from_str(&normalized, format.order.chrono_format())
        .map_err(|_| CleanError::UnparseableDate { label: label.to_string(), order: format.order })?;
    Ok(date.format(format.interpretation.output_format()).to_string())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NumericRename {
    /// raw label → new label, first occurrence order.
    pub renamed: Vec<(String, Label)>,
    /// One `UnparseableDate` per label that failed.
    pub failures: Vec<CleanError>,
}

/// Parses every label independently; a failure leaves a missing marker and
/// does not stop the batch.
pub fn parse_labels(labels: &[String], format: NumericDateFormat) -> NumericRename {
    let mut out = NumericRename::default();
    for label in labels {
        if out.renamed.iter().any(|(raw, _)| raw == label) {
            continue;
        }
        let new_label = match parse_numeric_label(label, format) {
            Ok(token) => Label::Symbol(token),
            Err(e) => {
                log::warn!("{}", e);
                out.failures.push(e);
                Label::Missing { raw: label.clone() }
            }
        };
        out.renamed.push((label.clone(), new_label));
    }
    out
}

/// Returns a copy of `table` with the numeric labels replaced.
pub fn relabel(table: &Table, rename: &NumericRename) -> Table {
    let lookup: HashMap<&str, &Label> = rename.renamed.iter().map(|(raw, l)| (raw.as_str(), l)).collect();
    let rows = table
        .rows
        .iter()
        .map(|row| match row.label.as_symbol().and_then(|s| lookup.get(s)) {
            Some(label) => row.relabeled((*label).clone()),
            None => row.clone(),
        })
        .collect();
    table.derive(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Row;

    fn fmt(order: DateOrder, interp: DateInterpretation) -> NumericDateFormat {
        NumericDateFormat::new(order, interp)
    }

    #[test]
    fn month_day_and_month_year_differ_by_design() {
        let md = fmt(DateOrder::YearMonthDay, DateInterpretation::MonthDay);
        let my = fmt(DateOrder::YearMonthDay, DateInterpretation::MonthYear);
        assert_eq!(parse_numeric_label("2021-09-01", md).unwrap(), "Sep-01");
        assert_eq!(parse_numeric_label("2021-09-01", my).unwrap(), "Sep-21");
    }

    #[test]
    fn every_field_order() {
        let f = |o| fmt(o, DateInterpretation::MonthDay);
        assert_eq!(parse_numeric_label("2021-01-03", f(DateOrder::YearDayMonth)).unwrap(), "Mar-01");
        assert_eq!(parse_numeric_label("01-03-2021", f(DateOrder::DayMonthYear)).unwrap(), "Mar-01");
        assert_eq!(parse_numeric_label("03-01-2021", f(DateOrder::MonthDayYear)).unwrap(), "Mar-01");
        assert_eq!(parse_numeric_label("03/01/2021", f(DateOrder::MonthDayYear)).unwrap(), "Mar-01");
    }

    #[test]
    fn time_suffix_is_ignored() {
        let f = fmt(DateOrder::YearMonthDay, DateInterpretation::MonthDay);
        assert_eq!(parse_numeric_label("2001-12-01 00:00:00", f).unwrap(), "Dec-01");
    }

    #[test]
    fn failures_do_not_abort_the_batch() {
        let f = fmt(DateOrder::YearMonthDay, DateInterpretation::MonthDay);
        let labels = vec!["2021-09-01".to_string(), "2021-31-31".to_string(), "2021-09-01".to_string()];
        let out = parse_labels(&labels, f);
        assert_eq!(out.renamed.len(), 2);
        assert_eq!(out.renamed[0].1, Label::symbol("Sep-01"));
        assert_eq!(out.renamed[1].1, Label::Missing { raw: "2021-31-31".into() });
        assert_eq!(out.failures.len(), 1);
        assert!(matches!(out.failures[0], CleanError::UnparseableDate { .. }));
    }

    #[test]
    fn relabel_keeps_other_rows() {
        let t = Table::new("t", "Gene", vec![]).with_rows(vec![Row::new("2021-09-01", vec![]), Row::new("TP53", vec![])]);
        let out = parse_labels(&["2021-09-01".to_string()], fmt(DateOrder::YearMonthDay, DateInterpretation::MonthDay));
        let t2 = relabel(&t, &out);
        let labels: Vec<&str> = t2.symbols().collect();
        assert_eq!(labels, ["Sep-01", "TP53"]);
        assert_eq!(t.rows[0].label, Label::symbol("2021-09-01"));
    }

    #[test]
    fn order_names_parse() {
        assert_eq!("YYYY-MM-DD".parse::<DateOrder>(), Ok(DateOrder::YearMonthDay));
        assert_eq!("dd/mm/yyyy".parse::<DateOrder>(), Ok(DateOrder::DayMonthYear));
        assert_eq!("month_year".parse::<DateInterpretation>(), Ok(DateInterpretation::MonthYear));
        assert!("yyyy".parse::<DateOrder>().is_err());
    }
}
