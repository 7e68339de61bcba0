//! Spatial-subsystem error type.

use thiserror::Error;

/// Errors produced by `ctm-spatial`.
///
/// Every variant is fatal for the layout being loaded: the loader never
/// returns a partially built cell table.
#[derive(Debug, Error)]
pub enum SpatialError {
    #[error("layout line {line}: {message}")]
    Layout { line: usize, message: String },

    #[error(
        "calibration failed for cell {cell}: nmax = {nmax}, Qmax = {qmax} \
         (start fraction {start_fraction}); choose another initial guess for nmax"
    )]
    Calibration {
        cell:           String,
        nmax:           f64,
        qmax:           f64,
        start_fraction: f64,
    },

    #[error("cell {cell} lists unknown neighbor {neighbor}")]
    UnknownNeighbor { cell: String, neighbor: String },

    #[error("cell {0} is defined twice")]
    DuplicateCell(String),

    #[error("sensor references unknown cell {0}")]
    UnknownSensorCell(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SpatialResult<T> = Result<T, SpatialError>;
