//! `RunRecorder<W>`: bridges `SimObserver` to an `OutputWriter`.

use ctm_sim::{RunHeader, RunSummary, SimObserver, TickSnapshot};

use crate::writer::OutputWriter;
use crate::{OutputError, OutputResult};

/// A [`SimObserver`] that forwards the run header, every published snapshot
/// and the final summary to any [`OutputWriter`] backend.
///
/// Errors from the writer are stored internally because `SimObserver` methods
/// have no return value.  After `sim.run()` returns, check for errors with
/// [`take_error`][Self::take_error].  Once a write fails, later calls are
/// skipped so a half-broken backend is not fed more data.
pub struct RunRecorder<W: OutputWriter> {
    writer:     W,
    last_error: Option<OutputError>,
}

impl<W: OutputWriter> RunRecorder<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, last_error: None }
    }

    /// Take the stored write error (if any) after `sim.run()` returns.
    ///
    /// Returns `None` if all writes succeeded.
    pub fn take_error(&mut self) -> Option<OutputError> {
        self.last_error.take()
    }

    /// Unwrap the inner writer (e.g. to inspect files after the sim).
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn record(&mut self, write: impl FnOnce(&mut W) -> OutputResult<()>) {
        if self.last_error.is_some() {
            return;
        }
        if let Err(e) = write(&mut self.writer) {
            log::warn!("output write failed: {e}");
            self.last_error = Some(e);
        }
    }
}

impl<W: OutputWriter> SimObserver for RunRecorder<W> {
    fn on_sim_start(&mut self, header: &RunHeader) {
        self.record(|w| w.begin(header));
    }

    fn on_snapshot(&mut self, snapshot: &TickSnapshot) {
        self.record(|w| w.write_tick(snapshot));
    }

    fn on_sim_end(&mut self, summary: &RunSummary) {
        self.record(|w| w.write_results(summary));
        self.record(|w| w.finish());
    }
}
