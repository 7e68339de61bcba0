//! `ctm-output`: result writers for the pedestrian cell-transmission model.
//!
//! Two backends are provided:
//!
//! | Feature   | Backend  | Files created                                                       |
//! |-----------|----------|---------------------------------------------------------------------|
//! | *(none)*  | Text     | `spaceTime.txt`, `routes/<route>.txt`, `TT_avg.txt`, `TT_dist.txt`, `<sensor>.txt` |
//! | `sqlite`  | SQLite   | `output.db`                                                         |
//!
//! Both implement [`OutputWriter`] and are driven by [`RunRecorder`], which
//! implements `ctm_sim::SimObserver`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use ctm_output::{RunRecorder, TextWriter};
//!
//! let mut rec = RunRecorder::new(TextWriter::new(Path::new("./output"))?);
//! sim.run(&mut rec)?;
//! if let Some(e) = rec.take_error() { eprintln!("output error: {e}") }
//! ```

pub mod error;
pub mod observer;
pub mod row;
pub mod text;
pub mod writer;

#[cfg(feature = "sqlite")]
pub mod sqlite;


pub use error::{OutputError, OutputResult};
pub use observer::RunRecorder;
pub use row::{SensorRow, TravelTimeRow};
pub use text::TextWriter;
pub use writer::OutputWriter;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteWriter;
