//! Simulation observer trait for progress reporting and data collection.

use ctm_core::Tick;
use ctm_flow::Anomaly;

use crate::snapshot::{RunHeader, RunSummary, TickSnapshot};

/// Callbacks invoked by [`Sim`][crate::Sim] at timestep boundaries.
///
/// All methods have default no-op implementations so implementors only need to
/// override what they care about.  Every argument is an owned-value snapshot;
/// nothing borrows live engine state.
///
/// # Example: density logger
///
/// ```rust,ignore
/// struct Peak(f64);
///
/// impl SimObserver for Peak {
///     fn on_snapshot(&mut self, s: &TickSnapshot) {
///         for c in &s.cells {
///             self.0 = self.0.max(c.population / c.area);
///         }
///     }
/// }
/// ```
pub trait SimObserver {
    /// Called once when the run starts, before tick 0 is processed.
    fn on_sim_start(&mut self, _header: &RunHeader) {}

    /// Called at the very start of each tick, before any processing.
    fn on_tick_start(&mut self, _tick: Tick) {}

    /// Called after a tick completes, every `snapshot_interval_ticks` ticks
    /// and always for the final tick.
    fn on_snapshot(&mut self, _snapshot: &TickSnapshot) {}

    /// Called for every numerical anomaly, in the order they were found.
    fn on_anomaly(&mut self, _anomaly: &Anomaly) {}

    /// Called once after the final tick, with aggregate results.
    fn on_sim_end(&mut self, _summary: &RunSummary) {}
}

/// A [`SimObserver`] that does nothing.  Use when you need to call `run` but
/// don't want callbacks.
pub struct NoopObserver;

impl SimObserver for NoopObserver {}

/// Forward every callback to two observers in turn.
impl<A: SimObserver, B: SimObserver> SimObserver for (A, B) {
    fn on_sim_start(&mut self, header: &RunHeader) {
        self.0.on_sim_start(header);
        self.1.on_sim_start(header);
    }

    fn on_tick_start(&mut self, tick: Tick) {
        self.0.on_tick_start(tick);
        self.1.on_tick_start(tick);
    }

    fn on_snapshot(&mut self, snapshot: &TickSnapshot) {
        self.0.on_snapshot(snapshot);
        self.1.on_snapshot(snapshot);
    }

    fn on_anomaly(&mut self, anomaly: &Anomaly) {
        self.0.on_anomaly(anomaly);
        self.1.on_anomaly(anomaly);
    }

    fn on_sim_end(&mut self, summary: &RunSummary) {
        self.0.on_sim_end(summary);
        self.1.on_sim_end(summary);
    }
}

impl<O: SimObserver + ?Sized> SimObserver for &mut O {
    fn on_sim_start(&mut self, header: &RunHeader) {
        (**self).on_sim_start(header);
    }

    fn on_tick_start(&mut self, tick: Tick) {
        (**self).on_tick_start(tick);
    }

    fn on_snapshot(&mut self, snapshot: &TickSnapshot) {
        (**self).on_snapshot(snapshot);
    }

    fn on_anomaly(&mut self, anomaly: &Anomaly) {
        (**self).on_anomaly(anomaly);
    }

    fn on_sim_end(&mut self, summary: &RunSummary) {
        (**self).on_sim_end(summary);
    }
}
