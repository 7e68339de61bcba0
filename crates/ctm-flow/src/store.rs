//! The `OccupancyStore`: per-cell bucket lists and population totals.

use ctm_core::{CellId, RouteId, Tick};

use crate::Bucket;

/// Dynamic population of every cell.
///
/// Both vectors are indexed by `CellId` and always have one entry per cell.
/// `totals[c]` is kept equal to the sum of `buckets[c]` by every mutating
/// method; callers cannot touch either directly.
pub struct OccupancyStore {
    buckets: Vec<Vec<Bucket>>,
    totals:  Vec<f64>,
}

impl OccupancyStore {
    /// Create a store with every cell empty.
    pub fn new(cell_count: usize) -> Self {
        Self {
            buckets: vec![Vec::new(); cell_count],
            totals:  vec![0.0; cell_count],
        }
    }

    pub fn cell_count(&self) -> usize {
        self.buckets.len()
    }

    /// Add people to `cell`, merging into an existing bucket of the same group.
    ///
    /// Non-positive amounts are ignored.
    pub fn add(&mut self, cell: CellId, bucket: Bucket) {
        if !(bucket.people > 0.0) {
            return;
        }
        let list = &mut self.buckets[cell.index()];
        match list.iter_mut().find(|b| b.same_group(bucket.route, bucket.departure)) {
            Some(existing) => existing.people += bucket.people,
            None => list.push(bucket),
        }
        self.totals[cell.index()] += bucket.people;
    }

    /// Remove up to `amount` people of one group from `cell`.
    ///
    /// Returns the amount actually removed, which is less than requested only
    /// when the bucket holds fewer people (or is absent).  A bucket that
    /// reaches zero is dropped.
    pub fn subtract(&mut self, cell: CellId, route: RouteId, departure: Tick, amount: f64) -> f64 {
        let i = cell.index();
        let list = &mut self.buckets[i];
        let Some(pos) = list.iter().position(|b| b.same_group(route, departure)) else {
            return 0.0;
        };
        let removed = amount.min(list[pos].people).max(0.0);
        list[pos].people -= removed;
        if list[pos].people <= 0.0 {
            list.swap_remove(pos);
        }
        self.totals[i] = (self.totals[i] - removed).max(0.0);
        if list.is_empty() {
            // Resync so rounding residue cannot accumulate in an empty cell.
            self.totals[i] = 0.0;
        }
        removed
    }

    /// Remove every bucket of `route` from `cell` and return them.
    pub fn drain_route(&mut self, cell: CellId, route: RouteId) -> Vec<Bucket> {
        let i = cell.index();
        let list = &mut self.buckets[i];
        let mut drained = Vec::new();
        list.retain(|b| {
            if b.route == route {
                drained.push(*b);
                false
            } else {
                true
            }
        });
        let removed: f64 = drained.iter().map(|b| b.people).sum();
        self.totals[i] = if list.is_empty() { 0.0 } else { (self.totals[i] - removed).max(0.0) };
        drained
    }

    #[inline]
    pub fn buckets(&self, cell: CellId) -> &[Bucket] {
        &self.buckets[cell.index()]
    }

    /// Total people in `cell` (all routes).
    #[inline]
    pub fn total(&self, cell: CellId) -> f64 {
        self.totals[cell.index()]
    }

    /// People of `route` in `cell`, summed over departure intervals.
    pub fn route_people(&self, cell: CellId, route: RouteId) -> f64 {
        self.buckets[cell.index()]
            .iter()
            .filter(|b| b.route == route)
            .map(|b| b.people)
            .sum()
    }

    /// People in the whole network.
    pub fn total_population(&self) -> f64 {
        self.totals.iter().sum()
    }

    /// Empty every cell.
    pub fn clear(&mut self) {
        for list in &mut self.buckets {
            list.clear();
        }
        self.totals.fill(0.0);
    }
}
