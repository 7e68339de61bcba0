//! Error types for ctm-output.

use thiserror::Error;

/// Errors that can occur when writing simulation results.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A tick or result arrived before [`OutputWriter::begin`][crate::OutputWriter::begin].
    #[error("{0} written before the run header")]
    MissingHeader(&'static str),
}

/// Alias for `Result<T, OutputError>`.
pub type OutputResult<T> = Result<T, OutputError>;
