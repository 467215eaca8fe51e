// Error taxonomy for ingestion, storage and querying

use thiserror::Error;

/// Failures of the canonical store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No ingestion has ever succeeded against this store.
    #[error("no dataset has been ingested yet")]
    NotFound,
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored snapshot is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures of the ingestion operation. The prior snapshot is untouched
/// whenever one of these is returned.
#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("identifier column '{0}' not found in header")]
    MissingIdentifierColumn(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why a projection could not be shaped into the requested chart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NoDataForChart {
    #[error("select exactly one country (matched {matched})")]
    AmbiguousSelection { matched: usize },
    #[error("select a range covering at least two years (matched {matched})")]
    InsufficientYears { matched: usize },
    #[error("no data available for the selected years")]
    NoYearsAvailable,
}

/// Failures and warnings of the query path. None of these are fatal.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("no stored country matches {}", .candidates.join(", "))]
    NoCountryMatch { candidates: Vec<String> },
    #[error("invalid year range: {start} is after {end}")]
    InvalidYearRange { start: i32, end: i32 },
    #[error(transparent)]
    NoDataForChart(#[from] NoDataForChart),
    #[error(transparent)]
    Store(#[from] StoreError),
}
