use chrono::NaiveDate;
use polars::prelude::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalyzerError>;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// The document parsed, but no ticket list could be located in it.
    #[error("could not find a list of tickets in a JSON {root_kind}; top-level keys seen: {keys:?}")]
    SchemaDiscovery {
        root_kind: &'static str,
        keys: Vec<String>,
    },

    #[error("input is not a valid JSON document: {source}")]
    MalformedDocument {
        #[source]
        source: serde_json::Error,
    },

    #[error("no valid ticket records found ({skipped} of {total} records skipped)")]
    NoValidRecords { skipped: usize, total: usize },

    #[error("product reference table has duplicate sku '{sku}'")]
    NonUniqueKey { sku: String },

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid classifier keywords: {0}")]
    Keywords(#[from] aho_corasick::BuildError),

    #[error("failed to serialize pipeline settings: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("table error: {0}")]
    Polars(#[from] PolarsError),
}
