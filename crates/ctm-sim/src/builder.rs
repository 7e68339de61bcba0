//! Fluent builder for constructing a [`Sim`].

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use ctm_core::{CellId, CtmConfig, SimClock};
use ctm_demand::{Demand, RouteTable, load_demand_csv};
use ctm_flow::{AnomalyLog, FlowEngine, FlowParams, OccupancyStore, SensorTable};
use ctm_spatial::{BreadthFirstSolver, CellTable, Layout, PotentialField, PotentialSolver, load_layout};

use crate::{Sim, SimError, SimResult, SimState};
use crate::snapshot::RunStats;

/// Fluent builder for [`Sim`].
///
/// # Required inputs
///
/// - [`CellTable`]: from [`ctm_spatial::load_layout`] or a
///   [`CellTableBuilder`][ctm_spatial::CellTableBuilder]
/// - [`RouteTable`]: from [`RouteTable::resolve`]
///
/// # Optional inputs (have defaults)
///
/// | Method                | Default                         |
/// |-----------------------|---------------------------------|
/// | `.config(c)`          | `CtmConfig::default()`          |
/// | `.choice_weights(a,b)`| `alpha = 1`, `beta = 0`         |
/// | `.delta_l(d)`         | `1.0`                           |
/// | `.sensors(v)`         | none                            |
/// | `.solver(s)`          | [`BreadthFirstSolver`]          |
///
/// # Example
///
/// ```rust,ignore
/// let mut sim = SimBuilder::from_files(&layout_path, &demand_path, CtmConfig::default())?
///     .build()?;
/// sim.run(&mut NoopObserver)?;
/// ```
pub struct SimBuilder {
    cells:   CellTable,
    routes:  RouteTable,
    config:  CtmConfig,
    alpha:   f64,
    beta:    f64,
    delta_l: f64,
    sensors: Vec<CellId>,
    solver:  Box<dyn PotentialSolver>,
}

impl SimBuilder {
    /// Create a builder with all required inputs.
    pub fn new(cells: CellTable, routes: RouteTable) -> Self {
        Self {
            cells,
            routes,
            config:  CtmConfig::default(),
            alpha:   1.0,
            beta:    0.0,
            delta_l: 1.0,
            sensors: Vec::new(),
            solver:  Box::new(BreadthFirstSolver),
        }
    }

    /// Take cells, choice weights, cell size and sensors from a loaded
    /// layout and resolve `demand` against it.
    pub fn from_layout(layout: Layout, demand: &Demand) -> SimResult<Self> {
        let routes = RouteTable::resolve(demand, &layout.cells)?;
        Ok(Self::new(layout.cells, routes)
            .choice_weights(layout.alpha, layout.beta)
            .delta_l(layout.delta_l)
            .sensors(layout.sensors))
    }

    /// Load a layout file and a demand CSV.
    ///
    /// `config.calibration_start_fraction` is used while calibrating the
    /// cells, and `config` becomes the builder's configuration.
    pub fn from_files(layout: &Path, demand: &Path, config: CtmConfig) -> SimResult<Self> {
        config.validate()?;
        let layout = load_layout(layout, config.calibration_start_fraction)?;
        let demand = load_demand_csv(demand)?;
        Ok(Self::from_layout(layout, &demand)?.config(config))
    }

    pub fn config(mut self, config: CtmConfig) -> Self {
        self.config = config;
        self
    }

    /// Weights of the static potential (`alpha`) and of the local speed
    /// (`beta`) in the route choice.
    pub fn choice_weights(mut self, alpha: f64, beta: f64) -> Self {
        self.alpha = alpha;
        self.beta = beta;
        self
    }

    /// Cell side length; only used to derive the tick length on
    /// [`Sim::set_parameters`].
    pub fn delta_l(mut self, delta_l: f64) -> Self {
        self.delta_l = delta_l;
        self
    }

    /// Cells that record the flow entering them.
    pub fn sensors(mut self, sensors: Vec<CellId>) -> Self {
        self.sensors = sensors;
        self
    }

    /// Replace the static-field computation.
    pub fn solver<S: PotentialSolver + 'static>(mut self, solver: S) -> Self {
        self.solver = Box::new(solver);
        self
    }

    /// Validate inputs, compute every route's potential field, and return an
    /// idle [`Sim`].
    pub fn build(self) -> SimResult<Sim> {
        self.config.validate()?;

        let cell_count = self.cells.len();
        if let Some(&bad) = self.sensors.iter().find(|c| c.index() >= cell_count) {
            return Err(SimError::UnknownSensorCell(bad));
        }
        let fields: Vec<PotentialField> = self
            .routes
            .iter()
            .map(|route| {
                let field = self.solver.solve(&self.cells, &route.zone_ids, route.sink);
                let reachable = field.values().iter().filter(|&&v| v > 0.0).count();
                log::debug!(
                    "route {}: {} of {} cells reachable, depth {}",
                    route.name,
                    reachable,
                    cell_count,
                    field.max_level()
                );
                if !field.is_routable(route.source) {
                    log::warn!(
                        "route {}: source cell {} cannot reach the sink; its people will not move",
                        route.name,
                        self.cells.cell(route.source).name
                    );
                }
                field
            })
            .collect();

        let store = OccupancyStore::new(cell_count);
        FlowEngine::validate(&self.cells, &store, &fields, self.routes.len())?;

        let params = FlowParams {
            alpha:                   self.alpha,
            beta:                    self.beta,
            bucket_excess_tolerance: self.config.bucket_excess_tolerance,
        };

        log::info!(
            "built simulation: {} cells, {} routes, {} people scheduled",
            cell_count,
            self.routes.len(),
            self.routes.total_demand()
        );

        let anomaly_history = self.config.anomaly_history;
        Ok(Sim {
            config:    self.config,
            clock:     SimClock::default(),
            engine:    FlowEngine::new(cell_count),
            sensors:   SensorTable::new(cell_count, &self.sensors),
            cells:     self.cells,
            routes:    self.routes,
            fields,
            store,
            params,
            delta_l:   self.delta_l,
            state:     SimState::Idle,
            end_tick:  None,
            stats:     RunStats::default(),
            anomalies: AnomalyLog::new(anomaly_history),
            cancel:    Arc::new(AtomicBool::new(false)),
        })
    }
}
