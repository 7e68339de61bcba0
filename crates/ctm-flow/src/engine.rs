//! The flow engine: projection, receiving capacities, rationed transfers.
//!
//! One call to [`FlowEngine::step`] performs, strictly in order:
//!
//! 1. **Projection.**  For every positive bucket of every cell, split its
//!    sendable people over the neighbors whose potential for the bucket's
//!    route is positive, using a logit over
//!    `pot(n) = alpha·SFF(n) − beta·speed(n)`.  The result is a list of
//!    pending transfers per receiving cell.  This phase only reads the store.
//! 2. **Receiving capacities.**  `Rc` of every cell that has a pending
//!    transfer, computed from its population *before* any transfer.
//! 3. **Resolution.**  If the summed pending inflow `S` of a cell fits in
//!    `Rc`, every transfer is granted; otherwise each is scaled by `Rc / S`.
//!    Granted people move from the sender's bucket to the receiver's bucket
//!    and are recorded by the receiver's sensor.
//!
//! All per-tick buffers are owned by the engine and cleared at the end of
//! `resolve`, so the only state that survives a tick is in the
//! [`OccupancyStore`] and the [`SensorTable`].

use ctm_core::{CellId, RouteId, Tick};
use ctm_spatial::{CellTable, PotentialField};

use crate::{Anomaly, Bucket, FlowError, FlowResult, OccupancyStore, SensorTable};

/// Buckets smaller than this do not raise the bucket-excess anomaly.
const NEGLIGIBLE: f64 = 1e-9;

// ── Inputs and outputs ────────────────────────────────────────────────────────

/// Route-choice weights and tolerances for one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowParams {
    /// Weight of the static potential.
    pub alpha: f64,
    /// Weight of the local walking speed.
    pub beta: f64,
    /// Relative excess of a bucket over its cell total that switches the
    /// split to `D·bucket`.
    pub bucket_excess_tolerance: f64,
}

/// People of one group that want to move into a cell this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transfer {
    pub from:      CellId,
    pub route:     RouteId,
    pub departure: Tick,
    pub people:    f64,
}

/// What one step did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowReport {
    /// People moved between cells.
    pub moved:     f64,
    pub anomalies: Vec<Anomaly>,
}

impl FlowReport {
    fn push(&mut self, anomaly: Anomaly) {
        log::warn!("{anomaly}");
        self.anomalies.push(anomaly);
    }
}

// ── FlowEngine ────────────────────────────────────────────────────────────────

pub struct FlowEngine {
    /// Speed of every cell at the start of the tick.
    speeds:    Vec<f64>,
    /// Pending transfers keyed by receiving cell.
    pending:   Vec<Vec<Transfer>>,
    /// Σ pending people per receiving cell (projected occupancy).
    inflow:    Vec<f64>,
    /// `Rc` per receiving cell.
    receiving: Vec<f64>,
    /// Cells with at least one pending transfer.
    targets:   Vec<CellId>,
    /// Projection output of one cell before it is merged into `pending`.
    staged:    Vec<(CellId, Transfer)>,
    /// Logit weights of one bucket's candidate neighbors.
    weights:   Vec<(CellId, f64)>,
}

impl FlowEngine {
    pub fn new(cell_count: usize) -> Self {
        Self {
            speeds:    vec![0.0; cell_count],
            pending:   vec![Vec::new(); cell_count],
            inflow:    vec![0.0; cell_count],
            receiving: vec![0.0; cell_count],
            targets:   Vec::new(),
            staged:    Vec::new(),
            weights:   Vec::new(),
        }
    }

    /// Check that the store and the potential fields match the layout.
    pub fn validate(
        cells:       &CellTable,
        store:       &OccupancyStore,
        fields:      &[PotentialField],
        route_count: usize,
    ) -> FlowResult<()> {
        if store.cell_count() != cells.len() {
            return Err(FlowError::CellCount { expected: cells.len(), found: store.cell_count() });
        }
        if fields.len() != route_count {
            return Err(FlowError::FieldCount { expected: route_count, found: fields.len() });
        }
        if let Some(f) = fields.iter().find(|f| f.values().len() != cells.len()) {
            return Err(FlowError::CellCount { expected: cells.len(), found: f.values().len() });
        }
        Ok(())
    }

    /// Run projection, receiving capacities and resolution for one tick.
    ///
    /// `fields` is indexed by `RouteId`.
    pub fn step(
        &mut self,
        cells:   &CellTable,
        store:   &mut OccupancyStore,
        fields:  &[PotentialField],
        sensors: &mut SensorTable,
        params:  &FlowParams,
        tick:    Tick,
    ) -> FlowReport {
        let mut report = FlowReport::default();
        self.project(cells, store, fields, params, tick, &mut report);
        self.compute_receiving_capacities(cells, store, tick, &mut report);
        self.resolve(store, sensors, tick, &mut report);
        report
    }

    // ── Phase 1: projection ───────────────────────────────────────────────

    /// Compute every desired transfer from the current populations.
    pub fn project(
        &mut self,
        cells:  &CellTable,
        store:  &OccupancyStore,
        fields: &[PotentialField],
        params: &FlowParams,
        tick:   Tick,
        report: &mut FlowReport,
    ) {
        for cell in cells.cells() {
            self.speeds[cell.id.index()] = cell.diagram.speed(store.total(cell.id));
        }

        #[cfg(not(feature = "parallel"))]
        {
            for id in cells.ids() {
                let mut found = Vec::new();
                project_cell(
                    id,
                    cells,
                    store,
                    fields,
                    &self.speeds,
                    params,
                    tick,
                    &mut self.weights,
                    &mut self.staged,
                    &mut found,
                );
                for anomaly in found {
                    report.push(anomaly);
                }
                self.merge_staged();
            }
        }

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;

            let speeds = self.speeds.as_slice();
            let per_cell: Vec<(Vec<(CellId, Transfer)>, Vec<Anomaly>)> = (0..cells.len())
                .into_par_iter()
                .map(|i| {
                    let mut weights = Vec::new();
                    let mut staged = Vec::new();
                    let mut found = Vec::new();
                    project_cell(
                        CellId(i as u32),
                        cells,
                        store,
                        fields,
                        speeds,
                        params,
                        tick,
                        &mut weights,
                        &mut staged,
                        &mut found,
                    );
                    (staged, found)
                })
                .collect();

            // Merge in ascending cell order: identical to the sequential path.
            for (staged, found) in per_cell {
                for anomaly in found {
                    report.push(anomaly);
                }
                self.staged = staged;
                self.merge_staged();
            }
        }
    }

    fn merge_staged(&mut self) {
        for (to, transfer) in self.staged.drain(..) {
            let slot = &mut self.pending[to.index()];
            if slot.is_empty() {
                self.targets.push(to);
            }
            slot.push(transfer);
            self.inflow[to.index()] += transfer.people;
        }
    }

    // ── Phase 2: receiving capacities ─────────────────────────────────────

    /// Compute `Rc` for every cell with pending inflow.  Must run before any
    /// transfer is applied.
    pub fn compute_receiving_capacities(
        &mut self,
        cells:  &CellTable,
        store:  &OccupancyStore,
        tick:   Tick,
        report: &mut FlowReport,
    ) {
        for &to in &self.targets {
            let cell = cells.cell(to);
            let n = store.total(to);
            let rc = cell.diagram.raw_receiving_capacity(n, cell.params.delta);
            self.receiving[to.index()] = if rc >= 0.0 {
                rc
            } else {
                report.push(Anomaly::CapacityExceeded {
                    tick,
                    cell: to,
                    free_space: cell.params.delta * (cell.max_capacity() - n),
                });
                0.0
            };
        }
    }

    // ── Phase 3: resolution ───────────────────────────────────────────────

    /// Apply every pending transfer, rationed by the receiver's `Rc`, and
    /// clear all per-tick state.
    pub fn resolve(
        &mut self,
        store:   &mut OccupancyStore,
        sensors: &mut SensorTable,
        tick:    Tick,
        report:  &mut FlowReport,
    ) {
        self.targets.sort_unstable();

        for &to in &self.targets {
            let i = to.index();
            let requested = self.inflow[i];

            if !(requested >= 0.0) {
                report.push(Anomaly::InvalidProjectedOccupancy { tick, cell: to, value: requested });
            } else if requested > 0.0 {
                let rc = self.receiving[i];
                let ratio = if requested <= rc { 1.0 } else { rc / requested };

                for t in &self.pending[i] {
                    let wanted = t.people * ratio;
                    if !(wanted > 0.0) {
                        continue;
                    }
                    let moved = store.subtract(t.from, t.route, t.departure, wanted);
                    if moved > 0.0 {
                        store.add(to, Bucket::new(t.route, t.departure, moved));
                        sensors.record(to, t.route, t.departure, tick, moved);
                        report.moved += moved;
                    }
                }
            }

            self.pending[i].clear();
            self.inflow[i] = 0.0;
            self.receiving[i] = 0.0;
        }
        self.targets.clear();
    }

    // ── Inspection ────────────────────────────────────────────────────────

    /// Transfers waiting to enter `cell` (between `project` and `resolve`).
    pub fn pending_into(&self, cell: CellId) -> &[Transfer] {
        &self.pending[cell.index()]
    }

    /// Σ pending people into `cell`.
    pub fn projected_inflow(&self, cell: CellId) -> f64 {
        self.inflow[cell.index()]
    }

    /// `Rc` of `cell` (after `compute_receiving_capacities`).
    pub fn receiving_capacity(&self, cell: CellId) -> f64 {
        self.receiving[cell.index()]
    }
}

// ── Per-cell projection ───────────────────────────────────────────────────────

/// Desired transfers out of one cell.  Reads only immutable state so it can
/// run for many cells concurrently.
#[allow(clippy::too_many_arguments)]
fn project_cell(
    id:        CellId,
    cells:     &CellTable,
    store:     &OccupancyStore,
    fields:    &[PotentialField],
    speeds:    &[f64],
    params:    &FlowParams,
    tick:      Tick,
    weights:   &mut Vec<(CellId, f64)>,
    out:       &mut Vec<(CellId, Transfer)>,
    anomalies: &mut Vec<Anomaly>,
) {
    let cell = cells.cell(id);
    let total = store.total(id);
    let sending_capacity = cell.diagram.sending_capacity(total);

    for bucket in store.buckets(id) {
        if !(bucket.people > 0.0) {
            continue;
        }
        let Some(field) = fields.get(bucket.route.index()) else {
            continue;
        };

        let own = params.alpha * field.get(id) - params.beta * speeds[id.index()];

        weights.clear();
        let mut z = 0.0;
        for &nb in &cell.neighbors {
            let sff = field.get(nb);
            if sff > 0.0 {
                let pot = params.alpha * sff - params.beta * speeds[nb.index()];
                let w = (-(pot - own)).exp();
                weights.push((nb, w));
                z += w;
            }
        }
        if z == 0.0 {
            continue;
        }

        let ml = bucket.people;
        let excess = ml > total && total / ml <= 1.0 - params.bucket_excess_tolerance;
        if excess && ml > NEGLIGIBLE {
            anomalies.push(Anomaly::BucketExceedsTotal {
                tick,
                cell: id,
                route: bucket.route,
                departure: bucket.departure,
                bucket: ml,
                total,
            });
        }

        for &(nb, w) in weights.iter() {
            let d = w / z;
            if !(d > 0.0) {
                continue;
            }
            let flow = if excess {
                d * ml
            } else {
                (d * ml).min(d * (ml / total) * sending_capacity)
            };
            if !(flow >= 0.0) {
                anomalies.push(Anomaly::InvalidSendingFlow {
                    tick,
                    from: id,
                    to: nb,
                    route: bucket.route,
                    departure: bucket.departure,
                    value: flow,
                });
                continue;
            }
            if flow > 0.0 {
                out.push((
                    nb,
                    Transfer { from: id, route: bucket.route, departure: bucket.departure, people: flow },
                ));
            }
        }
    }
}
