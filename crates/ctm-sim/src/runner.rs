//! Run a [`Sim`] on a worker thread and watch it through a channel.

use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, bounded};

use crate::observer::SimObserver;
use crate::sim::{CancelHandle, RunOutcome, Sim};
use crate::snapshot::{RunSummary, TickSnapshot};
use crate::{SimError, SimResult};

/// Messages published by the worker, in pipeline order.
#[derive(Debug, Clone)]
pub enum RunEvent {
    Snapshot(TickSnapshot),
    Finished(RunSummary),
}

/// Forwards snapshots and the final summary into a bounded channel.
///
/// `send` blocks when the channel is full, so a slow consumer throttles the
/// engine instead of growing a queue.  A dropped receiver is ignored.
struct ChannelObserver {
    tx: Sender<RunEvent>,
}

impl SimObserver for ChannelObserver {
    fn on_snapshot(&mut self, snapshot: &TickSnapshot) {
        let _ = self.tx.send(RunEvent::Snapshot(snapshot.clone()));
    }

    fn on_sim_end(&mut self, summary: &RunSummary) {
        let _ = self.tx.send(RunEvent::Finished(summary.clone()));
    }
}

/// A [`Sim`] running on its own thread.
///
/// ```rust,ignore
/// let runner = SimRunner::spawn(sim, 16);
/// for event in runner.events() {
///     if let RunEvent::Snapshot(s) = event { draw(&s) }
/// }
/// let (sim, outcome) = runner.join()?;
/// ```
pub struct SimRunner {
    events: Receiver<RunEvent>,
    cancel: CancelHandle,
    handle: JoinHandle<(Sim, SimResult<RunOutcome>)>,
}

impl SimRunner {
    /// Move `sim` onto a worker thread and start running it.
    ///
    /// `capacity` bounds the number of unread events.
    pub fn spawn(mut sim: Sim, capacity: usize) -> Self {
        let (tx, events) = bounded(capacity);
        let cancel = sim.cancel_handle();
        let handle = std::thread::spawn(move || {
            let mut observer = ChannelObserver { tx };
            let outcome = sim.run(&mut observer);
            (sim, outcome)
        });
        Self { events, cancel, handle }
    }

    /// Events published so far; iteration ends when the worker finishes.
    pub fn events(&self) -> &Receiver<RunEvent> {
        &self.events
    }

    /// Stop the worker at its next timestep boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker and take the engine back.
    ///
    /// Unread events are discarded so a worker blocked on a full channel can
    /// exit.
    pub fn join(self) -> SimResult<(Sim, RunOutcome)> {
        let Self { events, handle, .. } = self;
        drop(events);
        let (sim, outcome) = handle.join().map_err(|_| SimError::WorkerPanicked)?;
        Ok((sim, outcome?))
    }
}
