//! `ctm-sim`: timestep pipeline and lifecycle of the pedestrian
//! cell-transmission model.
//!
//! # Timestep pipeline
//!
//! ```text
//! while state == Running:
//!   ① Drain        each route's people in its sink leave the network;
//!                  travel time = t − departure interval.
//!   ② Project      logit split of every bucket over routable neighbors
//!                  (parallel with the `parallel` feature).
//!   ③ Capacity     receiving capacity of every cell, before any transfer.
//!   ④ Resolve      scale pending inflow by Rc/S where S > Rc, apply,
//!                  record sensors.
//!   ⑤ Inject       scheduled arrivals enter each route's source.
//!   ⑥ Terminate?   t ≥ latest departure and population < tolerance,
//!                  or t ≥ max_ticks; then the clock advances.
//! ```
//!
//! Steps ②–④ live in [`ctm_flow::FlowEngine`]; this crate owns ① ⑤ ⑥, the
//! `Idle → Running → Ended` state machine, and what observers see.
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                 |
//! |------------|--------------------------------------------------------|
//! | `parallel` | Runs the projection phase on Rayon's thread pool.      |
//! | `fx-hash`  | FxHash maps for sensor accumulators.                   |
//! | `serde`    | Serialize/Deserialize on snapshots and summaries.      |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use ctm_core::CtmConfig;
//! use ctm_sim::{NoopObserver, SimBuilder};
//!
//! let mut sim = SimBuilder::from_files(layout, demand, CtmConfig::default())?.build()?;
//! sim.run(&mut NoopObserver)?;
//! println!("{:?}", sim.summary().travel_times);
//! ```

pub mod builder;
pub mod error;
pub mod observer;
pub mod params;
pub mod runner;
pub mod sim;
pub mod snapshot;


pub use builder::SimBuilder;
pub use error::{SimError, SimResult};
pub use observer::{NoopObserver, SimObserver};
pub use params::Parameters;
pub use runner::{RunEvent, SimRunner};
pub use sim::{CancelHandle, RunOutcome, Sim, SimState};
pub use snapshot::{
    CellRecord, RouteTravelTimes, RunHeader, RunStats, RunSummary, SensorLine, SensorOutput,
    TickSnapshot,
};
