//! Route-tagged population buckets.

use ctm_core::{RouteId, Tick};

/// People in one cell who share a route and a departure interval.
///
/// Two buckets belong to the same group iff both `route` and `departure`
/// match; a cell never holds two buckets of the same group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bucket {
    pub route:     RouteId,
    /// Tick at which these people entered the network.
    pub departure: Tick,
    /// Fractional head count, always `> 0` while stored.
    pub people:    f64,
}

impl Bucket {
    #[inline]
    pub fn new(route: RouteId, departure: Tick, people: f64) -> Self {
        Self { route, departure, people }
    }

    #[inline]
    pub fn same_group(&self, route: RouteId, departure: Tick) -> bool {
        self.route == route && self.departure == departure
    }
}
