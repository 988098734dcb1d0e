use std::path::PathBuf;

use thiserror::Error;

use crate::models::Period;

/// Failures of the ingest pipeline. Missing-history conditions (empty
/// history, no baseline to compare against) are modeled as states, not
/// errors, and do not appear here.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("unreadable document {path}: {reason}")]
    UnreadableDocument { path: PathBuf, reason: String },

    #[error("no overall rating found; document does not look like an EWA report")]
    NoOverallStatusFound,

    #[error("a report for {system} {period} is already ingested")]
    DuplicatePeriod { system: String, period: Period },

    #[error("cannot determine report period: {0}")]
    InvalidPeriod(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
