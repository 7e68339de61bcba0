//! Static description of one cell.

use ctm_core::{CellId, ZoneId};

use crate::diagram::{CalibrationFailure, FundamentalDiagram};

/// Physical parameters of a cell as read from the layout.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellParams {
    /// γ of the fundamental diagram.
    pub shape: f64,
    /// deltaL².
    pub area: f64,
    /// Critical density kc (people per unit area at jam).
    pub critical_density: f64,
    /// Fraction of the free space a cell accepts per tick.
    pub delta: f64,
}

/// One polygonal cell of the discretised walking area.
///
/// The polygon is only used for bounds and rendering; movement follows
/// `neighbors` exclusively.  Population lives in the flow crate, not here.
#[derive(Debug, Clone)]
pub struct Cell {
    pub id:       CellId,
    /// Identifier used in the layout file and in every output.
    pub name:     String,
    pub zone:     ZoneId,
    pub params:   CellParams,
    /// Four vertices as `[x0, y0, x1, y1, x2, y2, x3, y3]`.
    pub polygon:  [f32; 8],
    /// Adjacent cells in layout order.
    pub neighbors: Vec<CellId>,
    pub diagram:  FundamentalDiagram,
}

impl Cell {
    /// Jam population `area · kc`.
    #[inline]
    pub fn max_capacity(&self) -> f64 {
        self.diagram.max_capacity
    }

    #[inline]
    pub fn nmax(&self) -> f64 {
        self.diagram.nmax
    }

    #[inline]
    pub fn qmax(&self) -> f64 {
        self.diagram.qmax
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.params.area
    }

    /// Replace shape and critical density, then re-derive `maxCapacity`,
    /// `nmax` and `Qmax`.  On failure the cell keeps its previous parameters.
    pub fn recalibrate(
        &mut self,
        shape:            f64,
        critical_density: f64,
        start_fraction:   f64,
    ) -> Result<(), CalibrationFailure> {
        let max_capacity = critical_density * self.params.area;
        let diagram = FundamentalDiagram::calibrate(shape, self.params.area, max_capacity, start_fraction)?;
        self.params.shape = shape;
        self.params.critical_density = critical_density;
        self.diagram = diagram;
        Ok(())
    }
}
