//! Cell table and builder.
//!
//! # Data layout
//!
//! Cells are stored in a `Vec` in layout order and addressed by [`CellId`]
//! (the position in that `Vec`).  Neighbor lists hold `CellId`s resolved
//! through the same table, so the graph has no cyclic ownership and every
//! lookup is an index.  String names are kept only for I/O; `by_name` maps
//! them back to ids.
//!
//! Zones are interned the same way: `ZoneId` indexes `zone_names`.

use std::collections::HashMap;

use ctm_core::{CellId, ZoneId};

use crate::cell::{Cell, CellParams};
use crate::diagram::FundamentalDiagram;
use crate::{SpatialError, SpatialResult};

// ── Bounds ────────────────────────────────────────────────────────────────────

/// Axis-aligned bounding box over all polygon vertices.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    /// Empty box: any point extends it.
    pub const EMPTY: Bounds = Bounds {
        min_x: f32::MAX,
        min_y: f32::MAX,
        max_x: f32::MIN,
        max_y: f32::MIN,
    };

    fn extend(&mut self, polygon: &[f32; 8]) {
        for pair in polygon.chunks_exact(2) {
            self.min_x = self.min_x.min(pair[0]);
            self.max_x = self.max_x.max(pair[0]);
            self.min_y = self.min_y.min(pair[1]);
            self.max_y = self.max_y.max(pair[1]);
        }
    }
}

// ── CellTable ─────────────────────────────────────────────────────────────────

/// All cells of a layout, their zones and their adjacency.
///
/// Do not construct directly; use [`CellTableBuilder`] (or the layout
/// loader, which drives it).
pub struct CellTable {
    cells:      Vec<Cell>,
    by_name:    HashMap<String, CellId>,
    zone_names: Vec<String>,
    zone_ids:   HashMap<String, ZoneId>,
    bounds:     Bounds,
}

impl CellTable {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id.index()]
    }

    /// All cells in layout order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Iterator over all cell ids in layout order.
    pub fn ids(&self) -> impl Iterator<Item = CellId> + '_ {
        (0..self.cells.len()).map(|i| CellId(i as u32))
    }

    #[inline]
    pub fn neighbors(&self, id: CellId) -> &[CellId] {
        &self.cells[id.index()].neighbors
    }

    pub fn id_of(&self, name: &str) -> Option<CellId> {
        self.by_name.get(name).copied()
    }

    pub fn zone_id(&self, name: &str) -> Option<ZoneId> {
        self.zone_ids.get(name).copied()
    }

    pub fn zone_name(&self, zone: ZoneId) -> &str {
        &self.zone_names[zone.index()]
    }

    pub fn zone_count(&self) -> usize {
        self.zone_names.len()
    }

    /// First cell in layout order that belongs to `zone`.
    pub fn first_cell_in_zone(&self, zone: ZoneId) -> Option<CellId> {
        self.cells.iter().find(|c| c.zone == zone).map(|c| c.id)
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Apply new shape / critical density to every cell.
    ///
    /// All cells are calibrated before any is modified, so a failure leaves
    /// the table untouched.
    pub fn recalibrate_all(
        &mut self,
        shape:            f64,
        critical_density: f64,
        start_fraction:   f64,
    ) -> SpatialResult<()> {
        for cell in &self.cells {
            let max_capacity = critical_density * cell.params.area;
            FundamentalDiagram::calibrate(shape, cell.params.area, max_capacity, start_fraction)
                .map_err(|f| SpatialError::Calibration {
                    cell: cell.name.clone(),
                    nmax: f.nmax,
                    qmax: f.qmax,
                    start_fraction,
                })?;
        }
        for cell in &mut self.cells {
            // Cannot fail: the same inputs were just validated above.
            let _ = cell.recalibrate(shape, critical_density, start_fraction);
        }
        Ok(())
    }
}

// ── CellTableBuilder ──────────────────────────────────────────────────────────

/// Construct a [`CellTable`] incrementally, then call [`build`](Self::build).
///
/// Cells may reference neighbors that are added later; names are resolved in
/// `build()`.  Each cell's fundamental diagram is calibrated there too, so a
/// built table never contains an uncalibrated cell.
///
/// # Example
///
/// ```
/// use ctm_spatial::{CellParams, CellTableBuilder};
///
/// let params = CellParams { shape: 1.913, area: 1.0, critical_density: 5.4, delta: 1.0 };
/// let mut b = CellTableBuilder::new();
/// b.add_cell("S", "A", params, [0.0; 8], &["K"]);
/// b.add_cell("K", "B", params, [0.0; 8], &["S"]);
/// let table = b.build(0.3).unwrap();
/// assert_eq!(table.len(), 2);
/// assert_eq!(table.zone_count(), 2);
/// ```
pub struct CellTableBuilder {
    raw: Vec<RawCell>,
}

struct RawCell {
    name:      String,
    zone:      String,
    params:    CellParams,
    polygon:   [f32; 8],
    neighbors: Vec<String>,
}

impl CellTableBuilder {
    pub fn new() -> Self {
        Self { raw: Vec::new() }
    }

    pub fn with_capacity(cells: usize) -> Self {
        Self { raw: Vec::with_capacity(cells) }
    }

    /// Queue a cell.  Returns the `CellId` it will have in the built table.
    pub fn add_cell<S: AsRef<str>>(
        &mut self,
        name:      &str,
        zone:      &str,
        params:    CellParams,
        polygon:   [f32; 8],
        neighbors: &[S],
    ) -> CellId {
        let id = CellId(self.raw.len() as u32);
        self.raw.push(RawCell {
            name:      name.to_owned(),
            zone:      zone.to_owned(),
            params,
            polygon,
            neighbors: neighbors.iter().map(|n| n.as_ref().to_owned()).collect(),
        });
        id
    }

    pub fn cell_count(&self) -> usize {
        self.raw.len()
    }

    /// Consume the builder, resolve names, and calibrate every cell.
    pub fn build(self, start_fraction: f64) -> SpatialResult<CellTable> {
        let mut by_name = HashMap::with_capacity(self.raw.len());
        for (i, raw) in self.raw.iter().enumerate() {
            if by_name.insert(raw.name.clone(), CellId(i as u32)).is_some() {
                return Err(SpatialError::DuplicateCell(raw.name.clone()));
            }
        }

        let mut zone_names: Vec<String> = Vec::new();
        let mut zone_ids: HashMap<String, ZoneId> = HashMap::new();
        let mut bounds = Bounds::EMPTY;
        let mut cells = Vec::with_capacity(self.raw.len());

        for (i, raw) in self.raw.into_iter().enumerate() {
            let zone = *zone_ids.entry(raw.zone.clone()).or_insert_with(|| {
                zone_names.push(raw.zone.clone());
                ZoneId((zone_names.len() - 1) as u32)
            });

            let neighbors = raw
                .neighbors
                .iter()
                .map(|n| {
                    by_name.get(n).copied().ok_or_else(|| SpatialError::UnknownNeighbor {
                        cell:     raw.name.clone(),
                        neighbor: n.clone(),
                    })
                })
                .collect::<SpatialResult<Vec<CellId>>>()?;

            let p = raw.params;
            let diagram = FundamentalDiagram::calibrate(
                p.shape,
                p.area,
                p.area * p.critical_density,
                start_fraction,
            )
            .map_err(|f| SpatialError::Calibration {
                cell: raw.name.clone(),
                nmax: f.nmax,
                qmax: f.qmax,
                start_fraction,
            })?;

            bounds.extend(&raw.polygon);

            cells.push(Cell {
                id: CellId(i as u32),
                name: raw.name,
                zone,
                params: p,
                polygon: raw.polygon,
                neighbors,
                diagram,
            });
        }

        Ok(CellTable { cells, by_name, zone_names, zone_ids, bounds })
    }
}

impl Default for CellTableBuilder {
    fn default() -> Self {
        Self::new()
    }
}
