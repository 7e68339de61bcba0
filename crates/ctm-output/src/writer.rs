//! The `OutputWriter` trait implemented by all backend writers.

use ctm_sim::{RunHeader, RunSummary, TickSnapshot};

use crate::OutputResult;

/// Trait implemented by the text and SQLite writers.
///
/// Calls arrive in run order: `begin` once, `write_tick` per published
/// snapshot, `write_results` once, then `finish`.  Errors surface through
/// [`RunRecorder::take_error`][crate::RunRecorder::take_error] when driven
/// by the recorder.
pub trait OutputWriter {
    /// Static run description (cell names, routes, potentials).
    fn begin(&mut self, header: &RunHeader) -> OutputResult<()>;

    /// One published timestep.
    fn write_tick(&mut self, snapshot: &TickSnapshot) -> OutputResult<()>;

    /// Travel times and sensor records of the finished run.
    fn write_results(&mut self, summary: &RunSummary) -> OutputResult<()>;

    /// Flush and close all underlying file handles.
    ///
    /// Idempotent: safe to call more than once.
    fn finish(&mut self) -> OutputResult<()>;
}
