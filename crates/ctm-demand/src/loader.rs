//! Demand CSV loader.
//!
//! # CSV format
//!
//! Headerless, one row per (route, departure interval):
//!
//! ```csv
//! 0,A-B,0,10
//! 1,A-B,0,4.5
//! 0,A-C-B,0,2
//! ```
//!
//! | Column | Meaning                                                 |
//! |--------|---------------------------------------------------------|
//! | 0      | departure interval (tick, non-negative integer)         |
//! | 1      | route id: zone sequence joined by `-`                   |
//! | 2      | unused                                                  |
//! | 3      | weight (people entering the source cell at that tick)   |
//!
//! A later row for the same (route, departure) pair replaces the earlier one.
//! Rows are aggregated here without any reference to the layout; zone
//! resolution happens in [`RouteTable::resolve`](crate::RouteTable::resolve).

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::{DemandError, DemandResult};

/// Latest departure interval the loader accepts.
///
/// Schedules are dense from the first to the last departure, so this also
/// bounds the per-route allocation.
pub const MAX_DEPARTURE: u64 = 1_000_000;

// ── CSV record ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct DemandRecord {
    departure: u64,
    route:     String,
    _unused:   String,
    weight:    f64,
}

// ── Aggregated demand ─────────────────────────────────────────────────────────

/// All departures of one route, keyed by departure tick.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteDemand {
    /// Route id as written in the CSV (`"Z1-Z3-Z7"`).
    pub name:       String,
    pub departures: BTreeMap<u64, f64>,
}

impl RouteDemand {
    /// Zone tokens in travel order.
    pub fn zones(&self) -> impl Iterator<Item = &str> {
        self.name.split('-')
    }

    pub fn total(&self) -> f64 {
        self.departures.values().sum()
    }
}

/// Demand of every route, in order of first appearance in the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Demand {
    pub routes: Vec<RouteDemand>,
}

impl Demand {
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Add (or replace) the weight departing on `route` at `departure`.
    pub fn insert(&mut self, route: &str, departure: u64, weight: f64) {
        let entry = match self.routes.iter().position(|r| r.name == route) {
            Some(i) => &mut self.routes[i],
            None => {
                self.routes.push(RouteDemand { name: route.to_owned(), departures: BTreeMap::new() });
                let last = self.routes.len() - 1;
                &mut self.routes[last]
            }
        };
        if let Some(previous) = entry.departures.insert(departure, weight) {
            log::warn!(
                "demand for route {route} at interval {departure} given twice; \
                 {weight} replaces {previous}"
            );
        }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Load demand from a CSV file.
pub fn load_demand_csv(path: &Path) -> DemandResult<Demand> {
    let file = std::fs::File::open(path)?;
    let demand = load_demand_reader(file)?;
    log::info!(
        "loaded demand {}: {} routes, {} people",
        path.display(),
        demand.routes.len(),
        demand.routes.iter().map(RouteDemand::total).sum::<f64>()
    );
    Ok(demand)
}

/// Like [`load_demand_csv`] but accepts any `Read` source.
///
/// Useful for testing (pass a `std::io::Cursor`).
pub fn load_demand_reader<R: Read>(reader: R) -> DemandResult<Demand> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut demand = Demand::default();

    for result in csv_reader.deserialize::<DemandRecord>() {
        let row = result.map_err(|e| DemandError::Parse(e.to_string()))?;
        if row.route.split('-').any(str::is_empty) {
            return Err(DemandError::Parse(format!("invalid route id {:?}", row.route)));
        }
        if row.departure > MAX_DEPARTURE {
            return Err(DemandError::Parse(format!(
                "route {}: departure interval {} exceeds the maximum of {MAX_DEPARTURE}",
                row.route, row.departure
            )));
        }
        if !row.weight.is_finite() || row.weight < 0.0 {
            return Err(DemandError::Parse(format!(
                "route {}: invalid weight {} at interval {}",
                row.route, row.weight, row.departure
            )));
        }
        demand.insert(&row.route, row.departure, row.weight);
    }

    Ok(demand)
}
