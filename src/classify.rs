//! Label classification.
//!
//! Each label is run through an ordered list of matchers (date, legacy,
//! numeric) and tagged with the first hit. The table is then routed down a
//! single correction path by exclusive priority: Excel corrupts a whole gene
//! column the same way, so one table is assumed to carry one corruption mode.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{RouteKind, Table};
use crate::normalize::{date_token, DateToken};
use crate::reference::ReferenceTable;

static DATE_LIKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:\d{1,2}[-/ _](?:mar|apr|sept?|oct|dec)(?:[^a-z]|$)|(?:mar|apr|sept?|oct|dec)[-/ _]\d{1,2}(?:[^0-9]|$))")
        .expect("date-like pattern")
});

static NUMERIC_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{1,4}[-/.]\d{1,2}[-/.]\d{1,4}(?:[ T]\d{1,2}:\d{2}(?::\d{2}(?:\.\d+)?)?)?$").expect("numeric date pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelMatch {
    Date(DateToken),
    Legacy,
    Numeric,
    NoMatch,
}

type Matcher = fn(&str, &ReferenceTable) -> Option<LabelMatch>;

const MATCHERS: [Matcher; 3] = [match_date, match_legacy, match_numeric];

fn match_date(label: &str, _: &ReferenceTable) -> Option<LabelMatch> {
    if !DATE_LIKE.is_match(label) {
        return None;
    }
    date_token(label).map(LabelMatch::Date)
}

fn match_legacy(label: &str, reference: &ReferenceTable) -> Option<LabelMatch> {
    reference.contains(label).then_some(LabelMatch::Legacy)
}

fn match_numeric(label: &str, _: &ReferenceTable) -> Option<LabelMatch> {
    NUMERIC_DATE.is_match(label).then_some(LabelMatch::Numeric)
}

pub fn classify_label(label: &str, reference: &ReferenceTable) -> LabelMatch {
    MATCHERS.iter().find_map(|m| m(label, reference)).unwrap_or(LabelMatch::NoMatch)
}

/// Candidate label subsets of one table, each in row order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub date_like: Vec<String>,
    pub ambiguous: Vec<String>,
    pub legacy: Vec<String>,
    pub numeric: Vec<String>,
}

impl Classification {
    pub fn route(&self) -> RouteKind {
        if !self.date_like.is_empty() {
            if self.ambiguous.is_empty() { RouteKind::Dates } else { RouteKind::AmbiguousDates }
        } else if !self.legacy.is_empty() {
            RouteKind::Legacy
        } else if !self.numeric.is_empty() {
            RouteKind::NumericDates
        } else {
            RouteKind::Clean
        }
    }

    /// Labels the chosen route will rewrite.
    pub fn selected(&self) -> &[String] {
        match self.route() {
            RouteKind::AmbiguousDates | RouteKind::Dates => &self.date_like,
            RouteKind::Legacy => &self.legacy,
            RouteKind::NumericDates => &self.numeric,
            RouteKind::Clean => &[],
        }
    }
}

pub fn classify_table(table: &Table, reference: &ReferenceTable) -> Classification {
    let mut c = Classification::default();
    for label in table.symbols() {
        match classify_label(label, reference) {
            LabelMatch::Date(token) => {
                if token.is_ambiguous() {
                    c.ambiguous.push(label.to_string());
                }
                c.date_like.push(label.to_string());
            }
            LabelMatch::Legacy => c.legacy.push(label.to_string()),
            LabelMatch::Numeric => c.numeric.push(label.to_string()),
            LabelMatch::NoMatch => {}
        }
    }
    c
}
