//! Immutable value types handed to observers.
//!
//! Observers never borrow engine state.  Everything they see is copied into
//! one of these types at a timestep boundary, so a snapshot can be sent to
//! another thread or kept after the engine moves on.

use ctm_core::Tick;
use ctm_demand::{TravelTimeSample, TravelTimeSummary};

// ── Per-tick snapshot ─────────────────────────────────────────────────────────

/// State of one cell at the end of a tick, in the shape renderers expect.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellRecord {
    pub polygon:          [f32; 8],
    pub population:       f64,
    pub area:             f64,
    pub speed:            f64,
    pub flow:             f64,
    pub qmax:             f64,
    pub critical_density: f64,
    /// Route people per unit area, indexed by `RouteId`; 0 where the route
    /// has nobody in the cell.
    pub route_densities:  Vec<f64>,
}

/// Every cell (in layout order) at the end of `tick`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TickSnapshot {
    pub tick:             Tick,
    pub cells:            Vec<CellRecord>,
    pub total_population: f64,
    /// `true` on the snapshot of the tick that ended the run.
    pub ended:            bool,
}

// ── Run header ────────────────────────────────────────────────────────────────

/// Static description of a run, published once before the first tick.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunHeader {
    /// Cell names in layout order.
    pub cells:      Vec<String>,
    /// Route names indexed by `RouteId`.
    pub routes:     Vec<String>,
    /// Static potential of every cell, one `Vec` per route.
    pub potentials: Vec<Vec<f64>>,
    /// Names of the sensor cells.
    pub sensors:    Vec<String>,
}

// ── Run summary ───────────────────────────────────────────────────────────────

/// Running totals used for the conservation check and summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunStats {
    /// People added at sources.
    pub injected: f64,
    /// People removed at sinks.
    pub drained:  f64,
    /// People transferred between cells, summed over all ticks.
    pub moved:    f64,
}

/// Travel-time statistics of one route.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RouteTravelTimes {
    pub route:     String,
    /// Every drained batch as `(departure interval, sample)`.
    pub samples:   Vec<(Tick, TravelTimeSample)>,
    /// Weighted mean per departure interval.
    pub summaries: Vec<TravelTimeSummary>,
}

/// One accumulated sensor line with the route resolved to its name.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorLine {
    pub departure: Tick,
    pub route:     String,
    pub crossing:  Tick,
    pub weight:    f64,
}

/// Everything a sensor cell recorded.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorOutput {
    pub cell:  String,
    pub lines: Vec<SensorLine>,
}

/// Aggregate results, published once when the run ends.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunSummary {
    /// Tick in which the termination condition held.
    pub final_tick:   Tick,
    pub stats:        RunStats,
    /// People still in the network at the end.
    pub remaining:    f64,
    pub travel_times: Vec<RouteTravelTimes>,
    pub sensors:      Vec<SensorOutput>,
    pub anomalies:    u64,
}

impl RunSummary {
    /// `injected − drained − remaining`; zero up to rounding.
    pub fn conservation_error(&self) -> f64 {
        self.stats.injected - self.stats.drained - self.remaining
    }
}
