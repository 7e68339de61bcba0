//! `ctm-core`: foundational types for the pedestrian cell-transmission model.
//!
//! This crate is a dependency of every other `ctm-*` crate.  It has no
//! `ctm-*` dependencies and only `thiserror` (plus optional `serde`).
//!
//! # What lives here
//!
//! | Module      | Contents                                              |
//! |-------------|-------------------------------------------------------|
//! | [`ids`]     | `CellId`, `RouteId`, `ZoneId`                         |
//! | [`time`]    | `Tick`, `SimClock`                                    |
//! | [`config`]  | `CtmConfig`: run-level constants                     |
//! | [`error`]   | `CtmError`, `CtmResult`                               |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod config;
pub mod error;
pub mod ids;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::CtmConfig;
pub use error::{CtmError, CtmResult};
pub use ids::{CellId, RouteId, ZoneId};
pub use time::{SimClock, Tick};
