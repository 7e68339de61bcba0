//! Flat rows shared by every backend.

use ctm_core::Tick;
use ctm_sim::RunSummary;

/// One travel-time line: `interval,route,value,weight`.
///
/// In the averages `value` is the weighted mean travel time in ticks and
/// `weight` the number of people it covers; in the distribution every
/// drained batch is one row.
#[derive(Debug, Clone, PartialEq)]
pub struct TravelTimeRow {
    pub interval: Tick,
    pub route:    String,
    pub value:    f64,
    pub weight:   f64,
}

impl TravelTimeRow {
    /// Weighted mean per (route, departure interval).
    pub fn averages(summary: &RunSummary) -> Vec<TravelTimeRow> {
        summary
            .travel_times
            .iter()
            .flat_map(|tt| {
                tt.summaries.iter().map(|s| TravelTimeRow {
                    interval: s.departure,
                    route:    tt.route.clone(),
                    value:    s.mean_ticks,
                    weight:   s.total_weight,
                })
            })
            .collect()
    }

    /// Every drained batch.
    pub fn distribution(summary: &RunSummary) -> Vec<TravelTimeRow> {
        summary
            .travel_times
            .iter()
            .flat_map(|tt| {
                tt.samples.iter().map(|(interval, s)| TravelTimeRow {
                    interval: *interval,
                    route:    tt.route.clone(),
                    value:    s.travel_ticks as f64,
                    weight:   s.weight,
                })
            })
            .collect()
    }
}

/// One sensor line: `departure,route,arrival,weight`.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorRow {
    pub cell:      String,
    pub departure: Tick,
    pub route:     String,
    /// Tick in which the flow entered the sensor cell.
    pub arrival:   Tick,
    pub weight:    f64,
}

impl SensorRow {
    pub fn all(summary: &RunSummary) -> Vec<SensorRow> {
        summary
            .sensors
            .iter()
            .flat_map(|out| {
                out.lines.iter().map(|l| SensorRow {
                    cell:      out.cell.clone(),
                    departure: l.departure,
                    route:     l.route.clone(),
                    arrival:   l.crossing,
                    weight:    l.weight,
                })
            })
            .collect()
    }
}
