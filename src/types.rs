//! Listing records, IPC table cells and the year factor map

use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Gross collection as printed on the listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gross {
    /// Raw text of the second named numeric span, e.g. "$104.30M"
    Reported(String),
    /// The listing shows votes but no gross figure
    NotReported,
}

impl Gross {
    /// Written in place of a gross figure the site does not report
    pub const SENTINEL: &'static str = "*****";

    pub fn as_str(&self) -> &str {
        match self {
            Gross::Reported(raw) => raw,
            Gross::NotReported => Self::SENTINEL,
        }
    }
}

impl Serialize for Gross {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One movie scraped from a listing page. Every field is optional because each
/// one is extracted independently of the others.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListingRecord {
    pub rank: Option<u32>,
    pub title: Option<String>,
    pub year: Option<i32>,
    pub runtime_minutes: Option<u32>,
    pub genre: Option<String>,
    pub rating: Option<f64>,
    pub metascore: Option<u32>,
    pub votes: Option<u64>,
    /// Gross text as printed; the cleaned amount is a separate dataset column
    #[serde(rename = "gross_raw")]
    pub gross: Option<Gross>,
    pub synopsis: Option<String>,
    pub director: Option<String>,
    pub stars: Option<String>,
}

impl ListingRecord {
    /// Names of the fields that could not be extracted
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let checks = [
            ("rank", self.rank.is_none()),
            ("title", self.title.is_none()),
            ("year", self.year.is_none()),
            ("runtime_minutes", self.runtime_minutes.is_none()),
            ("genre", self.genre.is_none()),
            ("rating", self.rating.is_none()),
            ("metascore", self.metascore.is_none()),
            ("votes", self.votes.is_none()),
            ("gross", self.gross.is_none()),
            ("synopsis", self.synopsis.is_none()),
            ("director", self.director.is_none()),
            ("stars", self.stars.is_none()),
        ];
        checks
            .into_iter()
            .filter(|(_, missing)| *missing)
            .map(|(name, _)| name)
            .collect()
    }
}

/// Records of one listing page plus the link to the following page
#[derive(Debug, Clone, Default)]
pub struct PageResult {
    pub records: Vec<ListingRecord>,
    pub next: Option<String>,
}

/// What a table cell holds, taken from its first CSS class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Date,
    Numeric,
    Decorative,
}

impl CellKind {
    pub fn from_class(class: &str) -> Self {
        match class {
            "fecha" => CellKind::Date,
            "numero" => CellKind::Numeric,
            _ => CellKind::Decorative,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub kind: CellKind,
    pub text: String,
}

impl Cell {
    pub fn new(kind: CellKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Header and body of one IPC table. Body rows hold only date and numeric cells.
#[derive(Debug, Clone, Default)]
pub struct IpcTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

/// Monthly CPI variation for one month
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemporalObservation {
    /// First day of the observed month
    pub date: NaiveDate,
    /// Month-on-month change in percent
    pub monthly_change: f64,
}

impl TemporalObservation {
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    /// Exact-value identity used for deduplication
    pub fn key(&self) -> (NaiveDate, u64) {
        (self.date, self.monthly_change.to_bits())
    }
}

/// Multiplier per year that converts an amount of that year into the money of
/// the latest year of the range.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct YearFactors(BTreeMap<i32, f64>);

impl YearFactors {
    pub fn new(factors: BTreeMap<i32, f64>) -> Self {
        Self(factors)
    }

    pub fn get(&self, year: i32) -> Option<f64> {
        self.0.get(&year).copied()
    }

    pub fn first_year(&self) -> Option<i32> {
        self.0.keys().next().copied()
    }

    pub fn last_year(&self) -> Option<i32> {
        self.0.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, f64)> + '_ {
        self.0.iter().map(|(year, factor)| (*year, *factor))
    }
}

impl FromIterator<(i32, f64)> for YearFactors {
    fn from_iter<I: IntoIterator<Item = (i32, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Gross of one record expressed in money of the latest factor year
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizedRecord {
    pub year: i32,
    pub gross: f64,
    pub factor: f64,
    pub gross_equivalent: f64,
}
