//! Year adjustment factors from monthly CPI variation
//!
//! The yearly change is the plain sum of the monthly percentages, not their
//! compounded product. The factor of a year is then
//! `(latest_cumulative - cumulative(year)) / 100 + 1`, so the last year of the
//! range is always exactly 1.0. Years without data are linearly interpolated
//! between their known neighbours.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};

use crate::config::Config;
use crate::error::{FactorError, FetchError, ParseError};
use crate::fetch::Fetch;
use crate::table::read_table;
use crate::types::{Cell, CellKind, IpcTable, TemporalObservation, YearFactors};

const MONTHS: [(&str, u32); 12] = [
    ("Enero", 1),
    ("Febrero", 2),
    ("Marzo", 3),
    ("Abril", 4),
    ("Mayo", 5),
    ("Junio", 6),
    ("Julio", 7),
    ("Agosto", 8),
    ("Septiembre", 9),
    ("Octubre", 10),
    ("Noviembre", 11),
    ("Diciembre", 12),
];

/// Date, year-on-year, year-to-date, monthly
const MONTHLY_COLUMN_FALLBACK: usize = 3;

/// "Diciembre 2020" -> 2020-12-01
pub fn parse_month_year(text: &str) -> Result<NaiveDate, ParseError> {
    let err = || ParseError::Date(text.to_string());
    let mut words = text.split_whitespace();
    let (Some(name), Some(year), None) = (words.next(), words.next(), words.next()) else {
        return Err(err());
    };

    let month = MONTHS
        .iter()
        .find(|(m, _)| m.eq_ignore_ascii_case(name))
        .map(|(_, n)| *n)
        .ok_or_else(err)?;
    let year: i32 = year.parse().map_err(|_| err())?;

    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(err)
}

/// "0,4%" -> 0.4
pub fn parse_percent(text: &str) -> Result<f64, ParseError> {
    text.replace('%', "")
        .replace(',', ".")
        .trim()
        .parse()
        .map_err(|_| ParseError::Percent(text.to_string()))
}

/// Position of the monthly variation among the kept cells of a row
pub fn monthly_column(header: &[String]) -> usize {
    header
        .iter()
        .position(|h| h.to_lowercase().contains("mensual"))
        .unwrap_or(MONTHLY_COLUMN_FALLBACK)
}

pub fn parse_row(row: &[Cell], column: usize) -> Result<TemporalObservation, ParseError> {
    let date = row
        .iter()
        .find(|c| c.kind == CellKind::Date)
        .ok_or(ParseError::MissingDate)?;
    let value = row.get(column).ok_or(ParseError::ShortRow {
        found: row.len(),
        wanted: column,
    })?;

    Ok(TemporalObservation {
        date: parse_month_year(&date.text)?,
        monthly_change: parse_percent(&value.text)?,
    })
}

/// Drop exact repeats, keeping first occurrences in order
pub fn dedup(observations: Vec<TemporalObservation>) -> Vec<TemporalObservation> {
    let mut seen = HashSet::new();
    observations
        .into_iter()
        .filter(|o| seen.insert(o.key()))
        .collect()
}

/// Sum of monthly change per year
pub fn yearly_change(observations: &[TemporalObservation]) -> BTreeMap<i32, f64> {
    let mut yearly: BTreeMap<i32, f64> = BTreeMap::new();
    for o in observations {
        *yearly.entry(o.year()).or_insert(0.0) += o.monthly_change;
    }
    yearly
}

/// Factor for every year that has data
pub fn factors_from_yearly(yearly: &BTreeMap<i32, f64>) -> BTreeMap<i32, f64> {
    let mut running = 0.0;
    let cumulative: Vec<(i32, f64)> = yearly
        .iter()
        .map(|(year, change)| {
            running += change;
            (*year, running)
        })
        .collect();

    let Some(&(_, latest)) = cumulative.last() else {
        return BTreeMap::new();
    };

    cumulative
        .into_iter()
        .map(|(year, cum)| (year, (latest - cum) / 100.0 + 1.0))
        .collect()
}

/// Linear interpolation over points sorted by x, clamped to the end values
fn interp(x: f64, points: &[(f64, f64)]) -> Option<f64> {
    let &(x_first, y_first) = points.first()?;
    let &(x_last, y_last) = points.last()?;
    if x <= x_first {
        return Some(y_first);
    }
    if x >= x_last {
        return Some(y_last);
    }

    let i = points.partition_point(|(px, _)| *px <= x);
    let (x0, y0) = points[i - 1];
    let (x1, y1) = points[i];
    Some(y0 + (y1 - y0) * (x - x0) / (x1 - x0))
}

/// Add an interpolated factor for each year of `first..=last` without one
pub fn fill_missing_years(
    mut factors: BTreeMap<i32, f64>,
    first: i32,
    last: i32,
) -> BTreeMap<i32, f64> {
    let points: Vec<(f64, f64)> = factors
        .iter()
        .map(|(year, factor)| (f64::from(*year), *factor))
        .collect();

    for year in first..=last {
        if factors.contains_key(&year) {
            continue;
        }
        if let Some(factor) = interp(f64::from(year), &points) {
            tracing::debug!(year, factor, "interpolated missing year");
            factors.insert(year, factor);
        }
    }
    factors
}

/// Turn raw observations into the factor map for `first..=last`.
///
/// Observations outside the range are ignored. With a single year of data
/// every year gets a factor of 1.0.
pub fn compute_factors(
    observations: Vec<TemporalObservation>,
    first: i32,
    last: i32,
) -> Result<YearFactors, FactorError> {
    if first > last {
        return Err(FactorError::InvertedRange { first, last });
    }

    let total = observations.len();
    let in_range: Vec<TemporalObservation> = observations
        .into_iter()
        .filter(|o| (first..=last).contains(&o.year()))
        .collect();
    let unique = dedup(in_range);
    tracing::debug!(
        total,
        unique = unique.len(),
        "deduplicated monthly observations"
    );

    if unique.is_empty() {
        return Err(FactorError::NoObservations { first, last });
    }

    let known = factors_from_yearly(&yearly_change(&unique));
    if known.len() == 1 {
        tracing::warn!(first, last, "only one year of CPI data, factors are constant");
    }

    Ok(YearFactors::new(fill_missing_years(known, first, last)))
}

/// Fetches the CPI tables and builds the factor map
pub struct FactorBuilder<'a> {
    fetcher: &'a dyn Fetch,
    config: &'a Config,
}

impl<'a> FactorBuilder<'a> {
    pub fn new(fetcher: &'a dyn Fetch, config: &'a Config) -> Self {
        Self { fetcher, config }
    }

    /// One table per year, fetched `parallel_requests` at a time and
    /// returned in year order
    fn fetch_years(&self, first: i32, last: i32) -> Vec<(i32, Result<IpcTable, FetchError>)> {
        let years: Vec<i32> = (first..=last).collect();
        let mut results = Vec::with_capacity(years.len());

        for chunk in years.chunks(self.config.parallel_requests.max(1)) {
            std::thread::scope(|s| {
                let handles: Vec<_> = chunk
                    .iter()
                    .map(|&year| {
                        let url = self.config.ipc_year_url(year);
                        let fetcher = self.fetcher;
                        let handle = s.spawn(move || read_table(fetcher, &url));
                        (year, handle)
                    })
                    .collect();

                for (year, handle) in handles {
                    let result = handle.join().unwrap_or_else(|_| {
                        Err(FetchError::Panicked {
                            url: self.config.ipc_year_url(year),
                        })
                    });
                    results.push((year, result));
                }
            });
        }
        results
    }

    pub fn build(&self, first: i32, last: i32) -> Result<YearFactors, FactorError> {
        if first > last {
            return Err(FactorError::InvertedRange { first, last });
        }

        let column = match read_table(self.fetcher, &self.config.ipc_url) {
            Ok(table) => monthly_column(&table.header),
            Err(e) => {
                tracing::warn!(error = %e, "CPI header unavailable, assuming default column order");
                MONTHLY_COLUMN_FALLBACK
            }
        };

        let mut observations = Vec::new();
        let mut years_read = 0usize;
        for (year, result) in self.fetch_years(first, last) {
            let table = match result {
                Ok(table) => table,
                Err(e) => {
                    tracing::warn!(year, error = %e, "skipping year");
                    continue;
                }
            };
            years_read += 1;

            for row in &table.rows {
                match parse_row(row, column) {
                    Ok(observation) => observations.push(observation),
                    Err(e) => tracing::warn!(year, error = %e, "skipping CPI row"),
                }
            }
        }

        tracing::info!(
            first,
            last,
            years_read,
            observations = observations.len(),
            "CPI tables read"
        );
        compute_factors(observations, first, last)
    }
}
