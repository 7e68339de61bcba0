//! Framework error type.
//!
//! Sub-crates define their own error enums; `CtmError` covers the failures
//! that belong to no particular subsystem (configuration, I/O).

use thiserror::Error;

use crate::CellId;

/// The top-level error type for `ctm-core` and a common base for sub-crates.
#[derive(Debug, Error)]
pub enum CtmError {
    #[error("cell {0} not found")]
    CellNotFound(CellId),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for `ctm-core`.
pub type CtmResult<T> = Result<T, CtmError>;
