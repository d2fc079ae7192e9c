//! Applies year factors to the gross of each listing record

use crate::error::NormalizeError;
use crate::types::{Gross, ListingRecord, NormalizedRecord, YearFactors};

/// "$104.30M" -> 104300000.0, "500K" -> 500000.0, not reported -> 0.0
pub fn clean_gross(gross: &Gross) -> Result<f64, NormalizeError> {
    let raw = match gross {
        Gross::NotReported => return Ok(0.0),
        Gross::Reported(raw) => raw,
    };
    let invalid = || NormalizeError::InvalidGross(raw.clone());

    let text = raw.trim().replace(['$', ','], "");
    let (number, scale) = if let Some(n) = text.strip_suffix('M') {
        (n, 1_000_000.0)
    } else if let Some(n) = text.strip_suffix('K') {
        (n, 1_000.0)
    } else {
        (text.as_str(), 1.0)
    };

    let value: f64 = number.trim().parse().map_err(|_| invalid())?;
    Ok(value * scale)
}

pub fn normalize_record(
    record: &ListingRecord,
    factors: &YearFactors,
) -> Result<NormalizedRecord, NormalizeError> {
    let year = record.year.ok_or(NormalizeError::MissingYear)?;
    let factor = factors
        .get(year)
        .ok_or(NormalizeError::MissingFactor(year))?;
    let gross = clean_gross(record.gross.as_ref().ok_or(NormalizeError::MissingGross)?)?;

    Ok(NormalizedRecord {
        year,
        gross,
        factor,
        gross_equivalent: gross * factor,
    })
}

/// Normalize every record. Failures are reported per record, in input order.
pub fn normalize(
    records: &[ListingRecord],
    factors: &YearFactors,
) -> Vec<Result<NormalizedRecord, NormalizeError>> {
    let results: Vec<_> = records
        .iter()
        .map(|record| {
            let result = normalize_record(record, factors);
            if let Err(e) = &result {
                tracing::warn!(
                    rank = ?record.rank,
                    title = record.title.as_deref().unwrap_or("?"),
                    error = %e,
                    "cannot normalize gross"
                );
            }
            result
        })
        .collect();

    let failed = results.iter().filter(|r| r.is_err()).count();
    tracing::info!(records = results.len(), failed, "normalized gross");
    results
}
