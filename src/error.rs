//! Error types for fetching, table parsing, factor building and normalization

use thiserror::Error;

/// A page or table could not be retrieved.
///
/// The collector treats this as the end of pagination and the factor builder
/// skips the affected year; neither propagates it further.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("no table matching {selector} at {url}")]
    MissingTable { url: String, selector: String },

    #[error("cache error for {url}: {source}")]
    Cache {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("worker fetching {url} panicked")]
    Panicked { url: String },

    #[error("{0} not found")]
    NotFound(String),
}

/// Malformed text in a single table row.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("row has no date cell")]
    MissingDate,

    #[error("unrecognised date '{0}'")]
    Date(String),

    #[error("unrecognised percentage '{0}'")]
    Percent(String),

    #[error("row has {found} usable cells, need column {wanted}")]
    ShortRow { found: usize, wanted: usize },
}

/// The factor map cannot be built at all.
#[derive(Debug, Error, PartialEq)]
pub enum FactorError {
    #[error("first year {first} is after last year {last}")]
    InvertedRange { first: i32, last: i32 },

    #[error("no usable observations between {first} and {last}")]
    NoObservations { first: i32, last: i32 },
}

/// Per-record normalization failure; never fatal to the batch.
#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("record has no release year")]
    MissingYear,

    #[error("no adjustment factor for {0}")]
    MissingFactor(i32),

    #[error("record has no gross figure")]
    MissingGross,

    #[error("unparseable gross '{0}'")]
    InvalidGross(String),
}
