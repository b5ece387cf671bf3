use serde::{Deserialize, Serialize};
use std::fmt;

/// Months whose abbreviations collide with gene symbols (MARCH*, APR*, SEPT*, OCT*, DEC*).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Month {
    Mar,
    Apr,
    Sep,
    Oct,
    Dec,
}

impl Month {
    /// Case-insensitive; `Sept` is accepted as `Sep`.
    pub fn from_abbrev(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mar" => Some(Self::Mar),
            "apr" => Some(Self::Apr),
            "sep" | "sept" => Some(Self::Sep),
            "oct" => Some(Self::Oct),
            "dec" => Some(Self::Dec),
            _ => None,
        }
    }

    pub fn abbrev(&self) -> &'static str {
        match self {
            Self::Mar => "Mar",
            Self::Apr => "Apr",
            Self::Sep => "Sep",
            Self::Oct => "Oct",
            Self::Dec => "Dec",
        }
    }

    /// Months whose day 1 and 2 tokens stand for two different genes.
    pub fn is_dual_identity(&self) -> bool {
        matches!(self, Self::Mar)
    }
}

/// A reconstructed `Month-Day` date token, e.g. `Mar-01`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DateToken {
    pub month: Month,
    pub day: u8,
}

impl DateToken {
    pub fn new(month: Month, day: u8) -> Self {
        Self { month, day }
    }

    pub fn is_ambiguous(&self) -> bool {
        self.month.is_dual_identity() && matches!(self.day, 1 | 2)
    }

    /// The canonical `Mon-DD` string used as dedup and collision key.
    pub fn canonical(&self) -> String {
        format!("{}-{:02}", self.month.abbrev(), self.day)
    }
}

impl fmt::Display for DateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.month.abbrev(), self.day)
    }
}

/// Rebuilds a date token from a corrupted label, whatever order the day and
/// month appear in (`1-Mar`, `Mar-1`, `01-MAR`, `Sept-01`).
///
/// Takes the first run of digits and the first run of letters. Returns `None`
/// when either is missing, the letters are not a tracked month, or the day
/// does not fit two digits.
pub fn date_token(raw: &str) -> Option<DateToken> {
    let digits = first_run(raw, |c| c.is_ascii_digit())?;
    let letters = first_run(raw, |c| c.is_ascii_alphabetic())?;
    let month = Month::from_abbrev(letters)?;
    let day: u8 = digits.parse().ok()?;
    if digits.len() > 2 {
        return None;
    }
    Some(DateToken::new(month, day))
}

/// Canonical `Mon-DD` string for a date-like label.
pub fn canonical_token(raw: &str) -> Option<String> {
    date_token(raw).map(|t| t.canonical())
}

fn first_run(s: &str, pred: impl Fn(char) -> bool) -> Option<&str> {
    let start = s.find(|c: char| pred(c))?;
    let rest = &s[start..];
    let end = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Cleans a raw label cell: NFKC folds full-width digits and letters, then trims.
pub fn normalize_label(input: &str, uppercase: bool) -> String {
    use unicode_normalization::UnicodeNormalization;
    let folded: String = input.nfkc().collect::<String>().trim().to_string();
    if uppercase { folded.to_uppercase() } else { folded }
}

/// English ordinal suffix: 1 -> "1st", 12 -> "12th", 22 -> "22nd".
pub fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_and_order_collapse_to_one_token() {
        for raw in ["Mar-1", "1-Mar", "Mar-01", "01-Mar", "MAR-01", "1-mar", "Mar/1"] {
            assert_eq!(canonical_token(raw).as_deref(), Some("Mar-01"), "{}", raw);
        }
    }

    #[test]
    fn sept_is_normalized_to_sep() {
        assert_eq!(canonical_token("Sept-9").as_deref(), Some("Sep-09"));
        assert_eq!(canonical_token("15-SEPT").as_deref(), Some("Sep-15"));
    }

    #[test]
    fn non_month_labels_have_no_token() {
        assert_eq!(canonical_token("TP53"), None);
        assert_eq!(canonical_token("Jan-05"), None);
        assert_eq!(canonical_token("Mar"), None);
        assert_eq!(canonical_token("Mar-2021"), None);
    }

    #[test]
    fn ambiguity_is_march_day_one_or_two() {
        assert!(date_token("Mar-01").unwrap().is_ambiguous());
        assert!(date_token("2-Mar").unwrap().is_ambiguous());
        assert!(!date_token("Mar-03").unwrap().is_ambiguous());
        assert!(!date_token("Sep-01").unwrap().is_ambiguous());
    }

    #[test]
    fn ordinals() {
        let got: Vec<String> = [1, 2, 3, 4, 11, 12, 13, 21, 22, 23, 101, 111].iter().map(|n| ordinal(*n)).collect();
        assert_eq!(got, ["1st", "2nd", "3rd", "4th", "11th", "12th", "13th", "21st", "22nd", "23rd", "101st", "111th"]);
    }

    #[test]
    fn normalize_label_folds_fullwidth_and_trims() {
        assert_eq!(normalize_label("  １-Mar ", false), "1-Mar");
        assert_eq!(normalize_label("sept2", true), "SEPT2");
    }
}
