use thiserror::Error;

#[derive(Debug, Error)]
pub enum DemandError {
    #[error("demand parse error: {0}")]
    Parse(String),

    #[error("route {route}: no cell belongs to zone {zone:?}")]
    UnresolvedZone { route: String, zone: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DemandResult<T> = Result<T, DemandError>;
