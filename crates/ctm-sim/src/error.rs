use ctm_core::{CellId, CtmError};
use ctm_demand::DemandError;
use ctm_flow::FlowError;
use ctm_spatial::SpatialError;
use thiserror::Error;

use crate::SimState;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("simulation configuration error: {0}")]
    Config(#[from] CtmError),

    #[error("layout error: {0}")]
    Spatial(#[from] SpatialError),

    #[error("demand error: {0}")]
    Demand(#[from] DemandError),

    #[error("inconsistent engine state: {0}")]
    Flow(#[from] FlowError),

    #[error("cannot {op} while the simulation is {state:?}")]
    InvalidState { op: &'static str, state: SimState },

    #[error("sensor cell {0} is not in the layout")]
    UnknownSensorCell(CellId),

    #[error("invalid parameters: {0}")]
    Parameters(String),

    #[error("simulation worker thread panicked")]
    WorkerPanicked,
}

pub type SimResult<T> = Result<T, SimError>;
