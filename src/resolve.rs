//! Resolution of date tokens back to gene symbols.
//!
//! Most suffixed tokens map to a single gene through a fixed seed table. The
//! two march tokens are different: `Mar-01` is either MTARC1 or MARCHF1 and
//! `Mar-02` is either MTARC2 or MARCHF2, and only the person who owns the data
//! can tell which row is which. An [`AmbiguityResolver`] answers that question
//! and the [`ResolutionContext`] remembers the answer for the rest of the run.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::CleanError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub symbol: &'static str,
    pub description: &'static str,
}

/// A token with exactly two possible genes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmbiguousPair {
    pub token: &'static str,
    pub first: Candidate,
    pub second: Candidate,
}

impl AmbiguousPair {
    /// Symbols for the `_1st` and `_2nd` rows under `choice`.
    pub fn assignment(&self, choice: PairChoice) -> (&'static str, &'static str) {
        match choice {
            PairChoice::First => (self.first.symbol, self.second.symbol),
            PairChoice::Second => (self.second.symbol, self.first.symbol),
        }
    }
}

pub const MAR01: AmbiguousPair = AmbiguousPair {
    token: "Mar-01",
    first: Candidate { symbol: "MTARC1", description: "mitochondrial amidoxime reducing component 1" },
    second: Candidate { symbol: "MARCHF1", description: "membrane associated ring-CH-type finger 1" },
};

pub const MAR02: AmbiguousPair = AmbiguousPair {
    token: "Mar-02",
    first: Candidate { symbol: "MTARC2", description: "mitochondrial amidoxime reducing component 2" },
    second: Candidate { symbol: "MARCHF2", description: "membrane associated ring-CH-type finger 2" },
};

pub fn pair_for(token: &str) -> Option<&'static AmbiguousPair> {
    [&MAR01, &MAR02].into_iter().find(|p| p.token == token)
}

/// Which candidate of the pair the `_1st` row is. The `_2nd` row gets the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairChoice {
    First,
    Second,
}

impl FromStr for PairChoice {
    type Err = String;

    /// Accepts `first`/`second` or the gene family, `mtarc`/`marchf`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" | "1" | "mtarc" | "marc" => Ok(Self::First),
            "second" | "2" | "marchf" | "march" => Ok(Self::Second),
            other => Err(format!("unknown choice '{}': expected mtarc or marchf", other)),
        }
    }
}

impl fmt::Display for PairChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::First => "first",
            Self::Second => "second",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRow<'a> {
    pub key: String,
    pub raw: &'a str,
    pub description: Option<&'a str>,
    pub cells: &'a [String],
}

/// What a resolver is shown: the table, the token's two genes and its rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRequest<'a> {
    pub table: &'a str,
    pub pair: &'static AmbiguousPair,
    pub rows: Vec<RequestRow<'a>>,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no choice supplied for {0}")]
    Missing(String),
    #[error("abandoned: {0}")]
    Abandoned(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub trait AmbiguityResolver {
    fn choose(&mut self, request: &ResolutionRequest<'_>) -> Result<PairChoice, ResolveError>;
}

impl<F> AmbiguityResolver for F
where
    F: FnMut(&ResolutionRequest<'_>) -> Result<PairChoice, ResolveError>,
{
    fn choose(&mut self, request: &ResolutionRequest<'_>) -> Result<PairChoice, ResolveError> {
        self(request)
    }
}

/// Answers from choices fixed up front (command line or config file).
#[derive(Debug, Clone, Default)]
pub struct PresetResolver {
    choices: HashMap<String, PairChoice>,
}

impl PresetResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_choice(mut self, token: &str, choice: PairChoice) -> Self {
        self.choices.insert(token.to_string(), choice);
        self
    }
}

impl AmbiguityResolver for PresetResolver {
    fn choose(&mut self, request: &ResolutionRequest<'_>) -> Result<PairChoice, ResolveError> {
        self.choices.get(request.pair.token).copied().ok_or_else(|| ResolveError::Missing(request.pair.token.to_string()))
    }
}

/// `Token_Suffix` → symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionMapping {
    map: HashMap<String, String>,
}

impl ResolutionMapping {
    /// Built-in assignments for tokens with a single possible gene.
    pub fn seed() -> Self {
        let mut map = HashMap::new();
        map.insert("Dec-01_1st".to_string(), "DELEC1".to_string());
        for n in 3..=11 {
            map.insert(format!("Mar-{:02}_1st", n), format!("MARCHF{}", n));
        }
        for n in (1..=12).chain([14]) {
            map.insert(format!("Sep-{:02}_1st", n), format!("SEPTIN{}", n));
        }
        map.insert("Sep-15_1st".to_string(), "SELENOF".to_string());
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    pub fn assign_pair(&mut self, pair: &AmbiguousPair, choice: PairChoice) {
        let (first, second) = pair.assignment(choice);
        self.map.insert(format!("{}_1st", pair.token), first.to_string());
        self.map.insert(format!("{}_2nd", pair.token), second.to_string());
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Default for ResolutionMapping {
    fn default() -> Self {
        Self::seed()
    }
}

/// Per-run resolution state, passed explicitly through every table.
///
/// A choice made for a token is reapplied to every later table containing
/// that token.
#[derive(Debug, Clone, Default)]
pub struct ResolutionContext {
    mapping: ResolutionMapping,
    choices: BTreeMap<String, PairChoice>,
}

impl ResolutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn choice(&self, token: &str) -> Option<PairChoice> {
        self.choices.get(token).copied()
    }

    pub fn choices(&self) -> impl Iterator<Item = (&str, PairChoice)> {
        self.choices.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn record(&mut self, pair: &AmbiguousPair, choice: PairChoice) {
        self.mapping.assign_pair(pair, choice);
        self.choices.insert(pair.token.to_string(), choice);
    }

    /// Returns the recorded choice for the request's token, or asks `resolver`
    /// and records its answer. Never guesses.
    pub fn resolve(&mut self, request: &ResolutionRequest<'_>, resolver: &mut dyn AmbiguityResolver) -> Result<PairChoice, CleanError> {
        let token = request.pair.token;
        if let Some(choice) = self.choice(token) {
            log::info!("Reusing earlier choice for {} in table '{}': {} first", token, request.table, request.pair.assignment(choice).0);
            return Ok(choice);
        }
        let choice = resolver.choose(request).map_err(|e| CleanError::UnresolvedAmbiguity {
            table: request.table.to_string(),
            token: token.to_string(),
            reason: e.to_string(),
        })?;
        self.record(request.pair, choice);
        Ok(choice)
    }

    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.mapping.get(key)
    }
}
