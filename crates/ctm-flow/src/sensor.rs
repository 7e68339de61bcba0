//! Flow sensors.
//!
//! A sensor cell accumulates, for every (route, departure interval, crossing
//! tick), the weight of people transferred *into* it.  Sensors are pure
//! output; the engine never reads them back.
//!
//! Each output row therefore sums every transfer of one route and departure
//! interval within one tick, so two inflows of equal weight in the same tick
//! add up instead of collapsing into a single (interval, route, weight) row.

use ctm_core::{CellId, RouteId, Tick};

#[cfg(feature = "fx-hash")]
type RecordMap = rustc_hash::FxHashMap<SensorKey, f64>;
#[cfg(not(feature = "fx-hash"))]
type RecordMap = std::collections::HashMap<SensorKey, f64>;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
struct SensorKey {
    route:     RouteId,
    departure: Tick,
    crossing:  Tick,
}

/// One accumulated line of a sensor's output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorRecord {
    pub departure: Tick,
    pub route:     RouteId,
    /// Tick in which the people entered the sensor cell.
    pub crossing:  Tick,
    pub weight:    f64,
}

/// Accumulators of every sensor cell.
pub struct SensorTable {
    /// Sensor cells in declaration order.
    cells:   Vec<CellId>,
    /// `slot[c]` is the position of cell `c` in `cells`, if it is a sensor.
    slot:    Vec<Option<usize>>,
    records: Vec<RecordMap>,
}

impl SensorTable {
    /// Instrument `sensors` out of `cell_count` cells.  Duplicates are ignored.
    pub fn new(cell_count: usize, sensors: &[CellId]) -> Self {
        let mut cells = Vec::with_capacity(sensors.len());
        let mut slot = vec![None; cell_count];
        for &cell in sensors {
            if slot[cell.index()].is_none() {
                slot[cell.index()] = Some(cells.len());
                cells.push(cell);
            }
        }
        let records = cells.iter().map(|_| RecordMap::default()).collect();
        Self { cells, slot, records }
    }

    /// A table with no sensors.
    pub fn empty(cell_count: usize) -> Self {
        Self::new(cell_count, &[])
    }

    pub fn cells(&self) -> &[CellId] {
        &self.cells
    }

    #[inline]
    pub fn is_sensor(&self, cell: CellId) -> bool {
        self.slot.get(cell.index()).is_some_and(Option::is_some)
    }

    /// Add `weight` people of (`route`, `departure`) entering `cell` at
    /// `crossing`.  No-op for cells without a sensor.
    #[inline]
    pub fn record(&mut self, cell: CellId, route: RouteId, departure: Tick, crossing: Tick, weight: f64) {
        let Some(Some(slot)) = self.slot.get(cell.index()) else {
            return;
        };
        *self.records[*slot]
            .entry(SensorKey { route, departure, crossing })
            .or_insert(0.0) += weight;
    }

    /// All records of `cell`, sorted by (route, departure, crossing).
    ///
    /// Empty for cells without a sensor.
    pub fn records(&self, cell: CellId) -> Vec<SensorRecord> {
        let Some(Some(slot)) = self.slot.get(cell.index()) else {
            return Vec::new();
        };
        let mut keys: Vec<(&SensorKey, &f64)> = self.records[*slot].iter().collect();
        keys.sort_unstable_by_key(|(k, _)| **k);
        keys.into_iter()
            .map(|(k, &weight)| SensorRecord {
                departure: k.departure,
                route:     k.route,
                crossing:  k.crossing,
                weight,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        for map in &mut self.records {
            map.clear();
        }
    }
}
