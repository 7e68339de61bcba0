//! The `Sim` state machine and its timestep pipeline.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use ctm_core::{CtmConfig, SimClock, Tick};
use ctm_demand::RouteTable;
use ctm_flow::{AnomalyLog, Bucket, FlowEngine, FlowParams, OccupancyStore, SensorTable};
use ctm_spatial::{CellTable, PotentialField};

use crate::params::Parameters;
use crate::snapshot::{
    CellRecord, RouteTravelTimes, RunHeader, RunStats, RunSummary, SensorLine, SensorOutput,
    TickSnapshot,
};
use crate::{SimError, SimObserver, SimResult};

// ── Lifecycle ─────────────────────────────────────────────────────────────────

/// Lifecycle of a [`Sim`].
///
/// `Idle → Running` on [`Sim::start`] (or the first [`Sim::run`]),
/// `Running → Ended` when the termination check holds, and back to `Idle`
/// only through [`Sim::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SimState {
    Idle,
    Running,
    Ended,
}

/// How a call to [`Sim::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The termination check held; the engine is `Ended`.
    Ended,
    /// [`CancelHandle::cancel`] was observed at a timestep boundary; the
    /// engine is still `Running` and may be resumed or reset.
    Cancelled,
}

/// Cross-thread stop request for a running [`Sim`].
///
/// Cloning is cheap; every clone refers to the same flag.
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Ask the engine to stop before its next timestep.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ── Sim ───────────────────────────────────────────────────────────────────────

/// The pedestrian cell-transmission engine.
///
/// `Sim` owns the cells, routes, occupancy and sensors and drives the
/// per-timestep pipeline:
///
/// 1. **Drain sinks**: every route's people in its sink cell leave the
///    network and are recorded as travel-time samples.
/// 2. **Project**, 3. **receiving capacities**, 4. **resolve**: delegated to
///    [`FlowEngine::step`].
/// 5. **Inject arrivals** scheduled for this tick at each route's source.
/// 6. **Termination check**, then the clock advances.
///
/// Create via [`SimBuilder`][crate::SimBuilder].
pub struct Sim {
    pub(crate) config:    CtmConfig,
    pub(crate) clock:     SimClock,
    pub(crate) cells:     CellTable,
    pub(crate) routes:    RouteTable,
    /// Static potential per route, indexed by `RouteId`.
    pub(crate) fields:    Vec<PotentialField>,
    pub(crate) store:     OccupancyStore,
    pub(crate) engine:    FlowEngine,
    pub(crate) sensors:   SensorTable,
    pub(crate) params:    FlowParams,
    pub(crate) delta_l:   f64,
    pub(crate) state:     SimState,
    /// Tick in which the run ended.
    pub(crate) end_tick:  Option<Tick>,
    pub(crate) stats:     RunStats,
    pub(crate) anomalies: AnomalyLog,
    pub(crate) cancel:    Arc<AtomicBool>,
}

impl Sim {
    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Move from `Idle` to `Running` and publish the run header.
    pub fn start<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<()> {
        self.expect_state("start", SimState::Idle)?;
        self.state = SimState::Running;
        log::info!(
            "simulation started: {} cells, {} routes, latest departure {:?}",
            self.cells.len(),
            self.routes.len(),
            self.routes.latest_departure()
        );
        observer.on_sim_start(&self.header());
        Ok(())
    }

    /// Run until the termination check holds or a cancel request is seen.
    ///
    /// Starts the run first if the engine is `Idle`.  Cancellation is only
    /// checked between timesteps, and the flag is cleared once observed so
    /// a later call resumes where this one stopped.
    pub fn run<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<RunOutcome> {
        if self.state == SimState::Idle {
            self.start(observer)?;
        }
        self.expect_state("run", SimState::Running)?;

        let delay = Duration::from_millis(self.config.tick_delay_ms);
        loop {
            if self.cancel.swap(false, Ordering::AcqRel) {
                log::info!("simulation cancelled before tick {}", self.clock.current_tick);
                return Ok(RunOutcome::Cancelled);
            }
            if self.step(observer)? == SimState::Ended {
                return Ok(RunOutcome::Ended);
            }
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
        }
    }

    /// Process exactly one timestep and return the resulting state.
    pub fn step<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<SimState> {
        self.expect_state("step", SimState::Running)?;
        let now = self.clock.current_tick;
        observer.on_tick_start(now);

        self.drain_sinks(now);

        let report = self.engine.step(
            &self.cells,
            &mut self.store,
            &self.fields,
            &mut self.sensors,
            &self.params,
            now,
        );
        self.stats.moved += report.moved;
        for anomaly in report.anomalies {
            observer.on_anomaly(&anomaly);
            self.anomalies.push(anomaly);
        }

        self.inject_arrivals(now);

        let total = self.store.total_population();
        if self.config.progress_interval_ticks > 0
            && now.0.is_multiple_of(self.config.progress_interval_ticks)
        {
            log::debug!("tick {now}: {total:.3} people in the network");
        }

        let ended = self.is_finished(now, total);
        if ended {
            self.state = SimState::Ended;
            self.end_tick = Some(now);
        }

        let interval = self.config.snapshot_interval_ticks;
        if ended || (interval > 0 && now.0.is_multiple_of(interval)) {
            let mut snapshot = self.snapshot();
            snapshot.ended = ended;
            observer.on_snapshot(&snapshot);
        }

        if ended {
            let summary = self.summary();
            log::info!(
                "simulation ended at tick {now}: injected {:.3}, drained {:.3}, remaining {:.3}, {} anomalies",
                summary.stats.injected,
                summary.stats.drained,
                summary.remaining,
                summary.anomalies
            );
            observer.on_sim_end(&summary);
        }

        self.clock.advance();
        Ok(self.state)
    }

    /// Return to `Idle`: empty cells, tick 0, cleared statistics and sensors.
    ///
    /// Cells, routes, potential fields and parameters are kept.
    pub fn reset(&mut self) {
        self.store.clear();
        self.sensors.clear();
        self.routes.clear_statistics();
        self.clock.reset();
        self.anomalies.clear();
        self.stats = RunStats::default();
        self.end_tick = None;
        self.cancel.store(false, Ordering::Release);
        self.state = SimState::Idle;
    }

    /// Apply a new parameter set to every cell and to the route choice.
    ///
    /// Only allowed while `Idle`.  Every cell is recalibrated before any is
    /// changed, so a calibration failure leaves the engine untouched.
    pub fn set_parameters(&mut self, p: &Parameters) -> SimResult<()> {
        self.expect_state("set parameters", SimState::Idle)?;
        p.validate()?;
        self.cells.recalibrate_all(
            p.shape,
            p.critical_density,
            self.config.calibration_start_fraction,
        )?;
        self.params.alpha = p.alpha;
        self.params.beta = p.beta;
        self.clock.tick_duration_secs = self.delta_l / p.free_flow_speed;
        log::info!(
            "parameters set: vf {}, shape {}, kc {}, alpha {}, beta {}; one tick is {:.4}s",
            p.free_flow_speed,
            p.shape,
            p.critical_density,
            p.alpha,
            p.beta,
            self.clock.tick_duration_secs
        );
        Ok(())
    }

    /// A handle that can stop [`run`](Self::run) from another thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(Arc::clone(&self.cancel))
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn state(&self) -> SimState {
        self.state
    }

    /// The next tick to be processed.
    pub fn tick(&self) -> Tick {
        self.clock.current_tick
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn config(&self) -> &CtmConfig {
        &self.config
    }

    pub fn cells(&self) -> &CellTable {
        &self.cells
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn store(&self) -> &OccupancyStore {
        &self.store
    }

    pub fn sensors(&self) -> &SensorTable {
        &self.sensors
    }

    /// Static potential fields, indexed by `RouteId`.
    pub fn fields(&self) -> &[PotentialField] {
        &self.fields
    }

    pub fn flow_params(&self) -> &FlowParams {
        &self.params
    }

    pub fn anomalies(&self) -> &AnomalyLog {
        &self.anomalies
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    pub fn end_tick(&self) -> Option<Tick> {
        self.end_tick
    }

    pub fn total_population(&self) -> f64 {
        self.store.total_population()
    }

    // ── Published values ──────────────────────────────────────────────────

    /// Current state of every cell, stamped with the clock's current tick.
    ///
    /// Inside the pipeline this is the tick just processed; `ended` is left
    /// `false` and set by the pipeline on the final snapshot.
    pub fn snapshot(&self) -> TickSnapshot {
        let cells = self
            .cells
            .cells()
            .iter()
            .map(|cell| {
                let n = self.store.total(cell.id);
                let area = cell.area();
                let route_densities = self
                    .routes
                    .iter()
                    .map(|r| {
                        let people = self.store.route_people(cell.id, r.id);
                        if people > 0.0 && area > 0.0 { people / area } else { 0.0 }
                    })
                    .collect();
                CellRecord {
                    polygon: cell.polygon,
                    population: n,
                    area,
                    speed: cell.diagram.reported_speed(n),
                    flow: cell.diagram.flow(n),
                    qmax: cell.qmax(),
                    critical_density: cell.params.critical_density,
                    route_densities,
                }
            })
            .collect();

        TickSnapshot {
            tick: self.clock.current_tick,
            cells,
            total_population: self.store.total_population(),
            ended: false,
        }
    }

    /// Names, potentials and sensors of this run.
    pub fn header(&self) -> RunHeader {
        RunHeader {
            cells:      self.cells.cells().iter().map(|c| c.name.clone()).collect(),
            routes:     self.routes.iter().map(|r| r.name.clone()).collect(),
            potentials: self.fields.iter().map(|f| f.values().to_vec()).collect(),
            sensors:    self
                .sensors
                .cells()
                .iter()
                .map(|&c| self.cells.cell(c).name.clone())
                .collect(),
        }
    }

    /// Aggregate results so far; final once the engine is `Ended`.
    pub fn summary(&self) -> RunSummary {
        let travel_times = self
            .routes
            .iter()
            .map(|route| RouteTravelTimes {
                route:     route.name.clone(),
                samples:   route
                    .travel_times()
                    .iter()
                    .flat_map(|(&dep, samples)| samples.iter().map(move |&s| (dep, s)))
                    .collect(),
                summaries: route.travel_time_summaries(),
            })
            .collect();

        let sensors = self
            .sensors
            .cells()
            .iter()
            .map(|&cell| SensorOutput {
                cell:  self.cells.cell(cell).name.clone(),
                lines: self
                    .sensors
                    .records(cell)
                    .into_iter()
                    .map(|r| SensorLine {
                        departure: r.departure,
                        route:     self.routes.get(r.route).name.clone(),
                        crossing:  r.crossing,
                        weight:    r.weight,
                    })
                    .collect(),
            })
            .collect();

        RunSummary {
            final_tick: self.end_tick.unwrap_or(self.clock.current_tick),
            stats: self.stats,
            remaining: self.store.total_population(),
            travel_times,
            sensors,
            anomalies: self.anomalies.total(),
        }
    }

    // ── Pipeline steps ────────────────────────────────────────────────────

    /// Remove every route's people from its own sink.
    fn drain_sinks(&mut self, now: Tick) {
        for route in self.routes.iter_mut() {
            for Bucket { departure, people, .. } in self.store.drain_route(route.sink, route.id) {
                route.add_travel_time(departure, now.since(departure), people);
                self.stats.drained += people;
            }
            route.set_end_time(now);
        }
    }

    fn inject_arrivals(&mut self, now: Tick) {
        for route in self.routes.iter() {
            let amount = route.schedule.amount_at(now);
            if amount > 0.0 {
                self.store.add(route.source, Bucket::new(route.id, now, amount));
                self.stats.injected += amount;
            }
        }
    }

    /// Network empty after the last departure, or the hard cap reached.
    fn is_finished(&self, now: Tick, total: f64) -> bool {
        let departures_done = self.routes.latest_departure().is_none_or(|last| now >= last);
        let drained = departures_done && total < self.config.residual_tolerance;
        let capped = now >= self.config.max_tick();
        if capped && !drained {
            log::warn!(
                "tick cap {} reached with {total:.3} people still in the network",
                self.config.max_ticks
            );
        }
        drained || capped
    }

    fn expect_state(&self, op: &'static str, want: SimState) -> SimResult<()> {
        if self.state == want {
            Ok(())
        } else {
            Err(SimError::InvalidState { op, state: self.state })
        }
    }
}
