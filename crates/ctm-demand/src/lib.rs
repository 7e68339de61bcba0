//! `ctm-demand`: who wants to go where, and how long it took them.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                        |
//! |------------|-----------------------------------------------------------------|
//! | [`loader`] | `load_demand_csv`, `load_demand_reader`, `Demand`, `RouteDemand` |
//! | [`route`]  | `Route`, `RouteTable`, `ArrivalSchedule`, travel-time samples    |
//! | [`error`]  | `DemandError`, `DemandResult<T>`                                |
//!
//! # Route model (summary)
//!
//! A route is named by its zone sequence (`"A-C-B"`).  People enter at the
//! first cell of the first zone and leave at the first cell of the last
//! zone.  The arrival schedule says how many enter per tick; the travel-time
//! table collects, per departure interval, every drained batch as
//! `(travel ticks, weight)`.

pub mod error;
pub mod loader;
pub mod route;


pub use error::{DemandError, DemandResult};
pub use loader::{Demand, MAX_DEPARTURE, RouteDemand, load_demand_csv, load_demand_reader};
pub use route::{ArrivalSchedule, Route, RouteTable, TravelTimeSample, TravelTimeSummary};
