//! `ctm-spatial`: the cell graph and everything static about it.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                    |
//! |---------------|-------------------------------------------------------------|
//! | [`diagram`]   | `FundamentalDiagram`: flow/speed curves, `nmax`/`Qmax` calibration |
//! | [`cell`]      | `Cell`, `CellParams`                                        |
//! | [`table`]     | `CellTable`, `CellTableBuilder`, `Bounds`                   |
//! | [`layout`]    | `load_layout`, `load_layout_reader`, `Layout`               |
//! | [`potential`] | `PotentialSolver` trait, `BreadthFirstSolver`, `PotentialField` |
//! | [`error`]     | `SpatialError`, `SpatialResult<T>`                          |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on parameter types.        |

pub mod cell;
pub mod diagram;
pub mod error;
pub mod layout;
pub mod potential;
pub mod table;

#[cfg(test)]
mod tests;

pub use cell::{Cell, CellParams};
pub use diagram::{CalibrationFailure, FundamentalDiagram};
pub use error::{SpatialError, SpatialResult};
pub use layout::{Layout, load_layout, load_layout_reader};
pub use potential::{BreadthFirstSolver, PotentialField, PotentialSolver};
pub use table::{Bounds, CellTable, CellTableBuilder};
