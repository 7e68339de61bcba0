//! Static potential fields.
//!
//! # Pluggability
//!
//! The simulation computes fields through the [`PotentialSolver`] trait, so
//! an application can swap in another guidance field without touching the
//! engine.  The default [`BreadthFirstSolver`] assigns BFS levels from the
//! sink, propagating only through cells whose zone lies on the route.
//!
//! # Values
//!
//! | Value   | Meaning                                              |
//! |---------|------------------------------------------------------|
//! | `1.0`   | the route's sink cell                                |
//! | `k ≥ 2` | on-route cell reached in BFS round `k`               |
//! | `0.0`   | on-route cell not reachable without leaving the route |
//! | `-1.0`  | cell whose zone is not on the route                  |
//!
//! Only strictly positive values are routable.

use ctm_core::{CellId, ZoneId};

use crate::table::CellTable;

// ── PotentialField ────────────────────────────────────────────────────────────

/// One route's static potential, indexed by `CellId`.
#[derive(Debug, Clone, PartialEq)]
pub struct PotentialField {
    values: Vec<f64>,
}

impl PotentialField {
    pub const SINK: f64 = 1.0;
    pub const UNREACHED: f64 = 0.0;
    pub const OFF_ROUTE: f64 = -1.0;

    /// Wrap precomputed values (one per cell).
    pub fn from_values(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Potential of `cell`; cells outside the field report `OFF_ROUTE`.
    #[inline]
    pub fn get(&self, cell: CellId) -> f64 {
        self.values.get(cell.index()).copied().unwrap_or(Self::OFF_ROUTE)
    }

    /// `true` if people on this route may enter `cell`.
    #[inline]
    pub fn is_routable(&self, cell: CellId) -> bool {
        self.get(cell) > 0.0
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Highest level assigned (the BFS depth of the route).
    pub fn max_level(&self) -> f64 {
        self.values.iter().copied().fold(Self::OFF_ROUTE, f64::max)
    }
}

// ── PotentialSolver trait ─────────────────────────────────────────────────────

/// Pluggable static-field computation.
///
/// Implementations must be `Send + Sync` so a built simulation can move to a
/// worker thread.
pub trait PotentialSolver: Send + Sync {
    /// Compute the field for a route visiting `route_zones` and ending in
    /// `sink`.
    fn solve(&self, cells: &CellTable, route_zones: &[ZoneId], sink: CellId) -> PotentialField;
}

// ── BreadthFirstSolver ────────────────────────────────────────────────────────

/// Level-by-level propagation from the sink.
///
/// This is a label-correcting BFS, not a metric shortest path: ties are
/// broken by frontier order and cell geometry is ignored.
pub struct BreadthFirstSolver;

impl PotentialSolver for BreadthFirstSolver {
    fn solve(&self, cells: &CellTable, route_zones: &[ZoneId], sink: CellId) -> PotentialField {
        breadth_first(cells, route_zones, sink)
    }
}

fn breadth_first(cells: &CellTable, route_zones: &[ZoneId], sink: CellId) -> PotentialField {
    let n = cells.len();
    let mut on_route = vec![false; cells.zone_count()];
    for zone in route_zones {
        if let Some(slot) = on_route.get_mut(zone.index()) {
            *slot = true;
        }
    }
    let zone_on_route = |id: CellId| on_route[cells.cell(id).zone.index()];

    let mut field = vec![PotentialField::UNREACHED; n];
    // Guards against queueing a cell twice in the same round.
    let mut queued = vec![false; n];

    field[sink.index()] = PotentialField::SINK;

    let mut frontier: Vec<CellId> = cells
        .neighbors(sink)
        .iter()
        .copied()
        .filter(|&c| zone_on_route(c))
        .collect();
    let mut next: Vec<CellId> = Vec::new();
    let mut level = 2.0;

    while !frontier.is_empty() {
        for &cell in &frontier {
            queued[cell.index()] = false;
            if !zone_on_route(cell) {
                field[cell.index()] = PotentialField::OFF_ROUTE;
                continue;
            }
            if field[cell.index()] != PotentialField::UNREACHED {
                continue;
            }
            field[cell.index()] = level;
            for &nb in cells.neighbors(cell) {
                if zone_on_route(nb) && field[nb.index()] == PotentialField::UNREACHED && !queued[nb.index()] {
                    queued[nb.index()] = true;
                    next.push(nb);
                }
            }
        }
        std::mem::swap(&mut frontier, &mut next);
        next.clear();
        level += 1.0;
    }

    for id in cells.ids() {
        if !zone_on_route(id) {
            field[id.index()] = PotentialField::OFF_ROUTE;
        }
    }

    PotentialField::from_values(field)
}
