//! CSV and JSON output

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::error::NormalizeError;
use crate::types::{ListingRecord, NormalizedRecord, YearFactors};

/// One output line: the scraped fields followed by the normalized gross
#[derive(Debug, Serialize)]
struct DatasetRow<'a> {
    rank: Option<u32>,
    title: Option<&'a str>,
    year: Option<i32>,
    runtime_minutes: Option<u32>,
    genre: Option<&'a str>,
    rating: Option<f64>,
    metascore: Option<u32>,
    votes: Option<u64>,
    gross_raw: Option<&'a str>,
    synopsis: Option<&'a str>,
    director: Option<&'a str>,
    stars: Option<&'a str>,
    gross: Option<f64>,
    factor: Option<f64>,
    gross_equivalent: Option<f64>,
}

impl<'a> DatasetRow<'a> {
    fn new(record: &'a ListingRecord, normalized: Option<&NormalizedRecord>) -> Self {
        Self {
            rank: record.rank,
            title: record.title.as_deref(),
            year: record.year,
            runtime_minutes: record.runtime_minutes,
            genre: record.genre.as_deref(),
            rating: record.rating,
            metascore: record.metascore,
            votes: record.votes,
            gross_raw: record.gross.as_ref().map(|g| g.as_str()),
            synopsis: record.synopsis.as_deref(),
            director: record.director.as_deref(),
            stars: record.stars.as_deref(),
            gross: normalized.map(|n| n.gross),
            factor: normalized.map(|n| n.factor),
            gross_equivalent: normalized.map(|n| n.gross_equivalent),
        }
    }
}

/// Create `path` for writing, creating its parent directories first
pub fn create_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    File::create(path).with_context(|| format!("Failed to create file: {}", path.display()))
}

/// Scraped records as they came off the listing pages
pub fn write_listing<W: Write>(writer: W, delimiter: u8, records: &[ListingRecord]) -> Result<()> {
    let mut csv = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);
    for record in records {
        csv.serialize(record)?;
    }
    csv.flush()?;
    Ok(())
}

/// Records joined with their normalization results, which must be in the same order
pub fn write_dataset<W: Write>(
    writer: W,
    delimiter: u8,
    records: &[ListingRecord],
    normalized: &[Result<NormalizedRecord, NormalizeError>],
) -> Result<()> {
    let mut csv = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);
    for (record, result) in records.iter().zip(normalized) {
        csv.serialize(DatasetRow::new(record, result.as_ref().ok()))?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_factors<W: Write>(writer: W, factors: &YearFactors) -> Result<()> {
    serde_json::to_writer_pretty(writer, factors)?;
    Ok(())
}

/// OSC 8 terminal hyperlink to a local file
pub fn file_link(path: &Path) -> String {
    let abs_path = fs::canonicalize(path)
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| path.to_string_lossy().to_string());
    format!(
        "\x1b]8;;file://{}\x1b\\{}\x1b]8;;\x1b\\",
        abs_path,
        path.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Gross;

    fn record(title: &str, year: i32, gross: Gross) -> ListingRecord {
        ListingRecord {
            rank: Some(1),
            title: Some(title.to_string()),
            year: Some(year),
            gross: Some(gross),
            synopsis: Some("Aliens, robots; and more".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_write_listing_uses_delimiter_and_sentinel() {
        let records = vec![record("Moon", 2009, Gross::NotReported)];
        let mut out = Vec::new();
        write_listing(&mut out, b';', &records).unwrap();

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("rank;title;year;runtime_minutes;genre;rating;metascore;votes;gross_raw;synopsis;director;stars")
        );
        assert_eq!(
            lines.next(),
            Some("1;Moon;2009;;;;;;*****;\"Aliens, robots; and more\";;")
        );
    }

    #[test]
    fn test_write_dataset_leaves_failures_empty() {
        let records = vec![
            record("Avatar", 2009, Gross::Reported("$760.51M".to_string())),
            record("Metropolis", 1927, Gross::NotReported),
        ];
        let normalized = vec![
            Ok(NormalizedRecord {
                year: 2009,
                gross: 100.0,
                factor: 1.5,
                gross_equivalent: 150.0,
            }),
            Err(NormalizeError::MissingFactor(1927)),
        ];
        let mut out = Vec::new();
        write_dataset(&mut out, b',', &records, &normalized).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("gross_raw,synopsis,director,stars,gross,factor,gross_equivalent"));
        assert!(lines[1].starts_with("1,Avatar,2009,"));
        assert!(lines[1].ends_with(",100.0,1.5,150.0"));
        assert!(lines[2].ends_with(",,,"));
    }

    #[test]
    fn test_raw_gross_column_matches_across_outputs() {
        let records = vec![record("Avatar", 2009, Gross::Reported("$760.51M".to_string()))];

        let mut listing = Vec::new();
        write_listing(&mut listing, b',', &records).unwrap();
        let mut dataset = Vec::new();
        write_dataset(&mut dataset, b',', &records, &[Err(NormalizeError::MissingFactor(2009))])
            .unwrap();

        let header = |out: &[u8]| -> Vec<String> {
            let text = String::from_utf8(out.to_vec()).unwrap();
            text.lines().next().unwrap().split(',').map(str::to_string).collect()
        };
        let listing_header = header(&listing);
        let dataset_header = header(&dataset);

        assert_eq!(listing_header[8], "gross_raw");
        assert_eq!(dataset_header[..12], listing_header[..]);
        assert!(!listing_header.contains(&"gross".to_string()));
    }

    #[test]
    fn test_write_factors_json() {
        let factors: YearFactors = [(2020, 1.0), (2019, 1.5)].into_iter().collect();
        let mut out = Vec::new();
        write_factors(&mut out, &factors).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["2019"], 1.5);
        assert_eq!(value["2020"], 1.0);
    }
}
