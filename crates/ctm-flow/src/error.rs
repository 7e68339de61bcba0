use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("occupancy store holds {found} cells, layout has {expected}")]
    CellCount { expected: usize, found: usize },

    #[error("{found} potential fields for {expected} routes")]
    FieldCount { expected: usize, found: usize },
}

pub type FlowResult<T> = Result<T, FlowError>;
