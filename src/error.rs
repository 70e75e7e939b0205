//! Error types for each pipeline stage.
//!
//! Per-item failures (one listing row, one keyword, one day) are carried as
//! these typed errors up to the stage's aggregation step, where a
//! [`FailurePolicy`](crate::policy::FailurePolicy) decides how they show up
//! in the output. Anything that escapes a stage entry point is fatal.

use std::path::PathBuf;

/// Failures reading, parsing or writing a TSV table.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("table has no header row")]
    MissingHeader,

    #[error("required column `{0}` not found")]
    MissingColumn(String),

    #[error("row {row}: invalid value `{value}` in column `{column}`")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("column `{name}` has {found} values but the table has {expected} rows")]
    ColumnLength {
        name: String,
        expected: usize,
        found: usize,
    },
}

/// Failures while crawling the bill listing and detail pages.
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("listing page {page} could not be loaded: {reason}")]
    Listing { page: u32, reason: String },

    #[error("detail page has no attachment row")]
    MissingDetailRow,

    #[error("could not resolve attachment link `{0}`")]
    UnresolvedLink(String),

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Failures while turning PDFs into keyword rows.
#[derive(Debug, thiserror::Error)]
pub enum KeywordError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("text extraction failed for {path}: {reason}")]
    Extraction { path: PathBuf, reason: String },

    #[error("max_df corresponds to fewer documents ({max}) than min_df ({min})")]
    DocumentFrequencyBounds { max: f64, min: usize },

    #[error("after pruning, no terms remain; try a lower min_df or a higher max_df")]
    EmptyVocabulary,

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Failures of a single trend lookup.
#[derive(Debug, thiserror::Error)]
pub enum TrendError {
    #[error("blank keyword")]
    BlankKeyword,

    #[error("trend API credentials are not configured")]
    MissingCredentials,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("could not decode trend response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("trend response has no results")]
    NoResults,

    #[error("trend response has no data points")]
    NoDataPoints,

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Failures of a single day-scoped news query.
#[derive(Debug, thiserror::Error)]
pub enum NewsError {
    #[error("news API url is not configured")]
    MissingEndpoint,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("could not decode news response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("news API error: {0}")]
    Api(String),

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Failures loading the YAML configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Failures rendering charts.
#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("nothing to plot: {0}")]
    Empty(&'static str),

    #[error("drawing failed: {0}")]
    Drawing(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Table(#[from] TableError),
}
