//! Routes and their arrival schedules and travel-time statistics.
//!
//! A [`Route`] is the immutable description of one origin–destination zone
//! sequence plus the two pieces of state the engine updates while running:
//! the travel-time table (appended on every sink drain) and the end time.

use std::collections::{BTreeMap, HashMap};

use ctm_core::{CellId, RouteId, Tick, ZoneId};
use ctm_spatial::CellTable;

use crate::loader::Demand;
use crate::{DemandError, DemandResult};

// ── ArrivalSchedule ───────────────────────────────────────────────────────────

/// People entering the source cell, per absolute tick.
///
/// `amounts[i]` enters at tick `start + i`.  Gaps between departures are
/// zero-filled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArrivalSchedule {
    start:   Tick,
    amounts: Vec<f64>,
}

impl ArrivalSchedule {
    pub fn new(start: Tick, amounts: Vec<f64>) -> Self {
        Self { start, amounts }
    }

    /// Build from sparse `departure tick → weight` pairs.
    pub fn from_departures(departures: &BTreeMap<u64, f64>) -> Self {
        let (Some((&first, _)), Some((&last, _))) =
            (departures.first_key_value(), departures.last_key_value())
        else {
            return Self::default();
        };
        let mut amounts = vec![0.0; (last - first + 1) as usize];
        for (&t, &w) in departures {
            amounts[(t - first) as usize] = w;
        }
        Self { start: Tick(first), amounts }
    }

    /// First tick with an entry.
    pub fn start(&self) -> Tick {
        self.start
    }

    /// One past the last tick with an entry, saturating at `u64::MAX`.
    pub fn end(&self) -> Tick {
        Tick(self.start.0.saturating_add(self.amounts.len() as u64))
    }

    /// Last tick with an entry, `None` for an empty schedule.
    pub fn last_departure(&self) -> Option<Tick> {
        let span = (self.amounts.len() as u64).checked_sub(1)?;
        self.start.0.checked_add(span).map(Tick)
    }

    /// People entering at `tick` (0 outside the schedule).
    pub fn amount_at(&self, tick: Tick) -> f64 {
        if tick < self.start {
            return 0.0;
        }
        self.amounts.get((tick.0 - self.start.0) as usize).copied().unwrap_or(0.0)
    }

    pub fn amounts(&self) -> &[f64] {
        &self.amounts
    }

    pub fn total(&self) -> f64 {
        self.amounts.iter().sum()
    }
}

// ── Travel times ──────────────────────────────────────────────────────────────

/// One drained batch: how long it took and how many people it held.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TravelTimeSample {
    pub travel_ticks: u64,
    pub weight:       f64,
}

/// Weighted mean travel time of everyone who departed in one interval.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TravelTimeSummary {
    pub departure:    Tick,
    pub mean_ticks:   f64,
    pub total_weight: f64,
}

// ── Route ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Route {
    pub id:       RouteId,
    /// Full zone sequence, e.g. `"Z1-Z3-Z7"`.
    pub name:     String,
    /// Zone tokens in travel order.
    pub zones:    Vec<String>,
    /// Interned ids of the zones that exist in the layout.
    pub zone_ids: Vec<ZoneId>,
    pub source:   CellId,
    pub sink:     CellId,
    pub schedule: ArrivalSchedule,
    travel_times: BTreeMap<Tick, Vec<TravelTimeSample>>,
    end_time:     Option<Tick>,
}

impl Route {
    /// Record people who departed at `departure` leaving through the sink
    /// after `travel_ticks`.
    pub fn add_travel_time(&mut self, departure: Tick, travel_ticks: u64, weight: f64) {
        self.travel_times
            .entry(departure)
            .or_default()
            .push(TravelTimeSample { travel_ticks, weight });
    }

    pub fn set_end_time(&mut self, tick: Tick) {
        self.end_time = Some(tick);
    }

    /// Last tick at which the sink was drained; `None` before the first step.
    pub fn end_time(&self) -> Option<Tick> {
        self.end_time
    }

    pub fn start_time(&self) -> Tick {
        self.schedule.start()
    }

    /// Every sample, grouped by departure interval in ascending order.
    pub fn travel_times(&self) -> &BTreeMap<Tick, Vec<TravelTimeSample>> {
        &self.travel_times
    }

    /// Weighted mean travel time per departure interval.
    ///
    /// Intervals whose samples carry zero total weight report a mean of 0.
    pub fn travel_time_summaries(&self) -> Vec<TravelTimeSummary> {
        self.travel_times
            .iter()
            .map(|(&departure, samples)| {
                let total_weight: f64 = samples.iter().map(|s| s.weight).sum();
                let weighted: f64 = samples.iter().map(|s| s.travel_ticks as f64 * s.weight).sum();
                let mean_ticks = if total_weight > 0.0 { weighted / total_weight } else { 0.0 };
                TravelTimeSummary { departure, mean_ticks, total_weight }
            })
            .collect()
    }

    /// Forget travel times and end time (used when a run is reset).
    pub fn clear_statistics(&mut self) {
        self.travel_times.clear();
        self.end_time = None;
    }
}

// ── RouteTable ────────────────────────────────────────────────────────────────

/// All routes of a scenario, addressed by [`RouteId`].
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes:  Vec<Route>,
    by_name: HashMap<String, RouteId>,
}

impl RouteTable {
    /// Resolve loaded demand against a cell table.
    ///
    /// The source is the first cell (in layout order) of the first zone
    /// token, the sink the first cell of the last token.  Intermediate zones
    /// without any cell are kept in `zones` but cannot be walked through.
    pub fn resolve(demand: &Demand, cells: &CellTable) -> DemandResult<RouteTable> {
        let mut table = RouteTable::default();

        for rd in &demand.routes {
            let zones: Vec<String> = rd.zones().map(str::to_owned).collect();

            let locate = |zone: &str| -> DemandResult<CellId> {
                cells
                    .zone_id(zone)
                    .and_then(|z| cells.first_cell_in_zone(z))
                    .ok_or_else(|| DemandError::UnresolvedZone {
                        route: rd.name.clone(),
                        zone:  zone.to_owned(),
                    })
            };
            // `zones()` on a validated name always yields at least one token.
            let first = zones.first().map(String::as_str).unwrap_or_default();
            let last = zones.last().map(String::as_str).unwrap_or_default();
            let source = locate(first)?;
            let sink = locate(last)?;

            let mut zone_ids = Vec::with_capacity(zones.len());
            for zone in &zones {
                match cells.zone_id(zone) {
                    Some(z) => zone_ids.push(z),
                    None => log::warn!("route {}: zone {zone:?} has no cells", rd.name),
                }
            }

            let id = RouteId(table.routes.len() as u32);
            table.by_name.insert(rd.name.clone(), id);
            table.routes.push(Route {
                id,
                name: rd.name.clone(),
                zones,
                zone_ids,
                source,
                sink,
                schedule: ArrivalSchedule::from_departures(&rd.departures),
                travel_times: BTreeMap::new(),
                end_time: None,
            });
        }

        Ok(table)
    }

    pub fn from_routes(routes: Vec<Route>) -> Self {
        let by_name = routes.iter().map(|r| (r.name.clone(), r.id)).collect();
        Self { routes, by_name }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    #[inline]
    pub fn get(&self, id: RouteId) -> &Route {
        &self.routes[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: RouteId) -> &mut Route {
        &mut self.routes[id.index()]
    }

    pub fn id_of(&self, name: &str) -> Option<RouteId> {
        self.by_name.get(name).copied()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Route> {
        self.routes.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Route> {
        self.routes.iter_mut()
    }

    /// Latest tick at which any route still injects people.
    pub fn latest_departure(&self) -> Option<Tick> {
        self.routes.iter().filter_map(|r| r.schedule.last_departure()).max()
    }

    /// Total people scheduled across all routes.
    pub fn total_demand(&self) -> f64 {
        self.routes.iter().map(|r| r.schedule.total()).sum()
    }

    pub fn clear_statistics(&mut self) {
        for route in &mut self.routes {
            route.clear_statistics();
        }
    }
}
