//! Numerical anomalies.
//!
//! None of these stop a run.  The engine logs each one at `warn` level,
//! clamps the offending value and carries on; the caller decides whether to
//! surface or count them.

use std::collections::VecDeque;
use std::fmt;

use ctm_core::{CellId, RouteId, Tick};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Anomaly {
    /// A desired transfer came out negative or NaN; clamped to zero.
    InvalidSendingFlow {
        tick:      Tick,
        from:      CellId,
        to:        CellId,
        route:     RouteId,
        departure: Tick,
        value:     f64,
    },
    /// A bucket held noticeably more people than its cell's total, so the
    /// flow split fell back to `D·bucket`.
    BucketExceedsTotal {
        tick:      Tick,
        cell:      CellId,
        route:     RouteId,
        departure: Tick,
        bucket:    f64,
        total:     f64,
    },
    /// The cell holds more than its jam capacity; receiving capacity clamped
    /// to zero.  `free_space` is `delta·(maxCapacity − n)`.
    CapacityExceeded {
        tick:       Tick,
        cell:       CellId,
        free_space: f64,
    },
    /// The summed inflow requested into a cell was negative or NaN; no
    /// transfer into it was applied.
    InvalidProjectedOccupancy {
        tick:  Tick,
        cell:  CellId,
        value: f64,
    },
}

/// The variant of an [`Anomaly`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnomalyKind {
    InvalidSendingFlow,
    BucketExceedsTotal,
    CapacityExceeded,
    InvalidProjectedOccupancy,
}

impl AnomalyKind {
    pub const ALL: [AnomalyKind; 4] = [
        AnomalyKind::InvalidSendingFlow,
        AnomalyKind::BucketExceedsTotal,
        AnomalyKind::CapacityExceeded,
        AnomalyKind::InvalidProjectedOccupancy,
    ];
}

impl Anomaly {
    pub fn kind(&self) -> AnomalyKind {
        match self {
            Anomaly::InvalidSendingFlow { .. } => AnomalyKind::InvalidSendingFlow,
            Anomaly::BucketExceedsTotal { .. } => AnomalyKind::BucketExceedsTotal,
            Anomaly::CapacityExceeded { .. } => AnomalyKind::CapacityExceeded,
            Anomaly::InvalidProjectedOccupancy { .. } => AnomalyKind::InvalidProjectedOccupancy,
        }
    }

    pub fn tick(&self) -> Tick {
        match *self {
            Anomaly::InvalidSendingFlow { tick, .. }
            | Anomaly::BucketExceedsTotal { tick, .. }
            | Anomaly::CapacityExceeded { tick, .. }
            | Anomaly::InvalidProjectedOccupancy { tick, .. } => tick,
        }
    }
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Anomaly::InvalidSendingFlow { tick, from, to, route, departure, value } => write!(
                f,
                "{tick}: sending flow {from} -> {to} ({route}, departed {departure}) is {value}; clamped to 0"
            ),
            Anomaly::BucketExceedsTotal { tick, cell, route, departure, bucket, total } => write!(
                f,
                "{tick}: people got lost in {cell}: bucket ({route}, departed {departure}) holds {bucket}, cell total {total}"
            ),
            Anomaly::CapacityExceeded { tick, cell, free_space } => {
                write!(f, "{tick}: capacity exceeded in {cell} ({free_space})")
            }
            Anomaly::InvalidProjectedOccupancy { tick, cell, value } => {
                write!(f, "{tick}: projected occupancy of {cell} is {value}")
            }
        }
    }
}

// ── AnomalyLog ────────────────────────────────────────────────────────────────

/// Per-kind counts of every anomaly of a run plus the most recent ones.
///
/// Memory stays bounded by `capacity` however long the run.
#[derive(Debug, Clone, Default)]
pub struct AnomalyLog {
    capacity: usize,
    recent:   VecDeque<Anomaly>,
    counts:   [u64; 4],
}

impl AnomalyLog {
    /// Keep the last `capacity` anomalies in full (0 = count only).
    pub fn new(capacity: usize) -> Self {
        Self { capacity, recent: VecDeque::with_capacity(capacity.min(1024)), counts: [0; 4] }
    }

    pub fn push(&mut self, anomaly: Anomaly) {
        self.counts[anomaly.kind() as usize] += 1;
        if self.capacity == 0 {
            return;
        }
        if self.recent.len() == self.capacity {
            self.recent.pop_front();
        }
        self.recent.push_back(anomaly);
    }

    /// Every anomaly seen since the last [`clear`](Self::clear).
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn count(&self, kind: AnomalyKind) -> u64 {
        self.counts[kind as usize]
    }

    /// The retained anomalies, oldest first.
    pub fn recent(&self) -> impl ExactSizeIterator<Item = &Anomaly> {
        self.recent.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn clear(&mut self) {
        self.recent.clear();
        self.counts = [0; 4];
    }
}
