use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

use crate::types::DatasetKind;

pub type AdliftResult<T> = Result<T, AdliftError>;

/// A required canonical field that no source column could be matched to.
///
/// Recoverable: the pipeline records it and treats the dataset as absent.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MissingColumn {
    pub kind: DatasetKind,
    pub field: &'static str,
    pub candidates: Vec<&'static str>,
}

impl fmt::Display for MissingColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} table has no column for '{}' (expected one of: {})",
            self.kind,
            self.field,
            self.candidates.join(", ")
        )
    }
}

#[derive(Error, Debug)]
pub enum AdliftError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No analysis periods were supplied")]
    NoPeriods,

    #[error("Period '{name}' starts after it ends ({start} > {end})")]
    InvalidPeriod {
        name: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("Period name '{0}' is used more than once")]
    DuplicatePeriod(String),

    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),

    #[error("Ingest error: {0}")]
    Ingest(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AdliftError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
