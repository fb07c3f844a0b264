//! Error taxonomy for the acquisition-and-load pipeline
//!
//! Every variant is fatal at the pipeline level: the run stops at the first
//! error and stages that already finished stay committed.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    /// The local file could not be opened for writing or the transfer did not complete
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// The archive could not be opened or its members could not be extracted
    #[error("Failed to extract {}: {reason}", .path.display())]
    Extract { path: PathBuf, reason: String },

    /// A data line does not fit its record shape
    #[error("Malformed record at {}:{line}: {reason}", .path.display())]
    MalformedRecord {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Line {line} of {} exceeds the maximum length of {max} bytes", .path.display())]
    LineTooLong { path: PathBuf, line: usize, max: usize },

    /// Duplicate-import guard tripped
    #[error("The table [{table}] is not empty.")]
    NonEmptyTable { table: String },

    /// A load worker finished unsuccessfully; `output` is what it printed
    #[error("Stage {class} failed:\n{output}")]
    Stage { class: String, output: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl IngestError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether the error concerns a single line that a skip-and-continue load may drop
    pub fn is_malformed_record(&self) -> bool {
        matches!(self, IngestError::MalformedRecord { .. })
    }
}
