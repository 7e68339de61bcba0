//! `ctm-flow`: who is where, and how they move in one tick.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                          |
//! |-------------|-------------------------------------------------------------------|
//! | [`bucket`]  | `Bucket`: people of one (route, departure interval) in one cell  |
//! | [`store`]   | `OccupancyStore`: per-cell bucket lists and totals               |
//! | [`engine`]  | `FlowEngine`: projection, receiving capacities, rationed transfers |
//! | [`sensor`]  | `SensorTable`, `SensorRecord`                                     |
//! | [`anomaly`] | `Anomaly`: non-fatal numerical problems                          |
//! | [`error`]   | `FlowError`, `FlowResult<T>`                                      |
//!
//! # Movement model (summary)
//!
//! Population is mesoscopic: each cell holds fractional head counts split
//! into buckets by route and departure interval.  A bucket spreads over the
//! neighbors that lie on its route with discrete-choice shares
//! `D(n) = exp(−(pot(n) − pot(self))) / Z`, limited by the cell's sending
//! capacity; receivers ration the sum of what they are offered down to their
//! receiving capacity.  The engine never creates or destroys people.
//!
//! # Feature flags
//!
//! | Flag       | Effect                                                   |
//! |------------|----------------------------------------------------------|
//! | `parallel` | Runs the projection phase on Rayon's thread pool.        |
//! | `fx-hash`  | Uses FxHash for the sensor accumulators.                 |

pub mod anomaly;
pub mod bucket;
pub mod engine;
pub mod error;
pub mod sensor;
pub mod store;

#[cfg(test)]
mod tests;

pub use anomaly::{Anomaly, AnomalyKind, AnomalyLog};
pub use bucket::Bucket;
pub use engine::{FlowEngine, FlowParams, FlowReport, Transfer};
pub use error::{FlowError, FlowResult};
pub use sensor::{SensorRecord, SensorTable};
pub use store::OccupancyStore;
