//! Unit tests for ctm-flow.

use ctm_core::{CellId, RouteId, Tick};
use ctm_spatial::{CellParams, CellTable, CellTableBuilder, PotentialField};

use crate::{
    Anomaly, AnomalyKind, AnomalyLog, Bucket, FlowEngine, FlowParams, FlowReport, OccupancyStore,
    SensorTable,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

const R0: RouteId = RouteId(0);
const R1: RouteId = RouteId(1);

fn params() -> CellParams {
    CellParams { shape: 1.913, area: 1.0, critical_density: 5.4, delta: 1.0 }
}

fn flow_params(alpha: f64, beta: f64) -> FlowParams {
    FlowParams { alpha, beta, bucket_excess_tolerance: 0.01 }
}

/// Centre cell `c` (id 0) with three neighbors `n1`, `n2`, `n3` (ids 1–3).
fn star() -> CellTable {
    let mut b = CellTableBuilder::new();
    b.add_cell("c", "A", params(), [0.0; 8], &["n1", "n2", "n3"]);
    b.add_cell("n1", "A", params(), [0.0; 8], &["c"]);
    b.add_cell("n2", "A", params(), [0.0; 8], &["c"]);
    b.add_cell("n3", "A", params(), [0.0; 8], &["c"]);
    b.build(0.3).unwrap()
}

/// `l` (0) - `m` (1) - `r` (2): two senders around one receiver.
fn line() -> CellTable {
    let mut b = CellTableBuilder::new();
    b.add_cell("l", "A", params(), [0.0; 8], &["m"]);
    b.add_cell("m", "B", params(), [0.0; 8], &["l", "r"]);
    b.add_cell("r", "A", params(), [0.0; 8], &["m"]);
    b.build(0.3).unwrap()
}

fn field(values: &[f64]) -> PotentialField {
    PotentialField::from_values(values.to_vec())
}

fn cell_flow(table: &CellTable, n: f64) -> f64 {
    table.cell(CellId(0)).diagram.flow(n)
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-12
}

// ── OccupancyStore ────────────────────────────────────────────────────────────

#[cfg(test)]
mod store {
    use super::*;

    #[test]
    fn add_merges_same_group() {
        let mut s = OccupancyStore::new(2);
        s.add(CellId(0), Bucket::new(R0, Tick(0), 2.0));
        s.add(CellId(0), Bucket::new(R0, Tick(0), 1.5));
        s.add(CellId(0), Bucket::new(R0, Tick(1), 1.0));
        s.add(CellId(0), Bucket::new(R1, Tick(0), 0.5));
        assert_eq!(s.buckets(CellId(0)).len(), 3);
        assert_eq!(s.total(CellId(0)), 5.0);
        assert_eq!(s.route_people(CellId(0), R0), 4.5);
        assert_eq!(s.total_population(), 5.0);
    }

    #[test]
    fn non_positive_add_ignored() {
        let mut s = OccupancyStore::new(1);
        s.add(CellId(0), Bucket::new(R0, Tick(0), 0.0));
        s.add(CellId(0), Bucket::new(R0, Tick(0), -1.0));
        s.add(CellId(0), Bucket::new(R0, Tick(0), f64::NAN));
        assert!(s.buckets(CellId(0)).is_empty());
        assert_eq!(s.total(CellId(0)), 0.0);
    }

    #[test]
    fn subtract_is_capped_by_bucket() {
        let mut s = OccupancyStore::new(1);
        s.add(CellId(0), Bucket::new(R0, Tick(0), 2.0));
        assert_eq!(s.subtract(CellId(0), R0, Tick(0), 0.5), 0.5);
        assert_eq!(s.subtract(CellId(0), R0, Tick(0), 9.0), 1.5);
        assert!(s.buckets(CellId(0)).is_empty());
        assert_eq!(s.total(CellId(0)), 0.0);
        assert_eq!(s.subtract(CellId(0), R0, Tick(0), 1.0), 0.0);
    }

    #[test]
    fn drain_route_removes_only_that_route() {
        let mut s = OccupancyStore::new(1);
        s.add(CellId(0), Bucket::new(R0, Tick(0), 2.0));
        s.add(CellId(0), Bucket::new(R0, Tick(3), 1.0));
        s.add(CellId(0), Bucket::new(R1, Tick(0), 4.0));
        let drained = s.drain_route(CellId(0), R0);
        assert_eq!(drained.len(), 2);
        assert_eq!(s.total(CellId(0)), 4.0);
        assert_eq!(s.route_people(CellId(0), R0), 0.0);
    }

    #[test]
    fn clear_empties_everything() {
        let mut s = OccupancyStore::new(3);
        s.add(CellId(2), Bucket::new(R0, Tick(0), 2.0));
        s.clear();
        assert_eq!(s.total_population(), 0.0);
        assert!(s.buckets(CellId(2)).is_empty());
    }
}

// ── SensorTable ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod sensor {
    use super::*;

    #[test]
    fn records_accumulate_per_key() {
        let mut t = SensorTable::new(3, &[CellId(1)]);
        t.record(CellId(1), R0, Tick(0), Tick(4), 1.0);
        t.record(CellId(1), R0, Tick(0), Tick(4), 0.5);
        t.record(CellId(1), R0, Tick(0), Tick(5), 2.0);
        let recs = t.records(CellId(1));
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].crossing, Tick(4));
        assert_eq!(recs[0].weight, 1.5);
        assert_eq!(recs[1].weight, 2.0);
    }

    #[test]
    fn records_sorted_by_route_then_departure() {
        let mut t = SensorTable::new(1, &[CellId(0)]);
        t.record(CellId(0), R1, Tick(0), Tick(9), 1.0);
        t.record(CellId(0), R0, Tick(2), Tick(5), 1.0);
        t.record(CellId(0), R0, Tick(1), Tick(7), 1.0);
        let order: Vec<(RouteId, Tick)> =
            t.records(CellId(0)).iter().map(|r| (r.route, r.departure)).collect();
        assert_eq!(order, vec![(R0, Tick(1)), (R0, Tick(2)), (R1, Tick(0))]);
    }

    #[test]
    fn non_sensor_cells_ignored() {
        let mut t = SensorTable::new(3, &[CellId(1), CellId(1)]);
        assert_eq!(t.cells(), &[CellId(1)]);
        t.record(CellId(2), R0, Tick(0), Tick(0), 1.0);
        assert!(!t.is_sensor(CellId(2)));
        assert!(t.records(CellId(2)).is_empty());
    }
}

// ── Projection ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod projection {
    use super::*;

    fn project(
        table: &CellTable,
        store: &OccupancyStore,
        fields: &[PotentialField],
        fp: FlowParams,
    ) -> (FlowEngine, FlowReport) {
        let mut engine = FlowEngine::new(table.len());
        let mut report = FlowReport::default();
        engine.project(table, store, fields, &fp, Tick(0), &mut report);
        (engine, report)
    }

    #[test]
    fn shares_follow_logit_over_routable_neighbors() {
        let t = star();
        let mut s = OccupancyStore::new(t.len());
        s.add(CellId(0), Bucket::new(R0, Tick(0), 1.0));
        // n1 is one level closer to the sink, n2 level, n3 off-route.
        let fields = [field(&[3.0, 2.0, 3.0, -1.0])];
        let (engine, report) = project(&t, &s, &fields, flow_params(1.0, 0.0));

        assert!(report.anomalies.is_empty());
        let sendable = cell_flow(&t, 1.0);
        let e = std::f64::consts::E;
        let to_n1 = engine.projected_inflow(CellId(1));
        let to_n2 = engine.projected_inflow(CellId(2));
        assert!(close(to_n1, sendable * e / (1.0 + e)), "n1 got {to_n1}");
        assert!(close(to_n2, sendable / (1.0 + e)), "n2 got {to_n2}");
        assert!(engine.pending_into(CellId(3)).is_empty());
    }

    #[test]
    fn split_sums_to_sendable_amount() {
        let t = star();
        let mut s = OccupancyStore::new(t.len());
        // Above nmax: sendable is capped at Qmax.
        s.add(CellId(0), Bucket::new(R0, Tick(0), 2.0));
        s.add(CellId(0), Bucket::new(R0, Tick(1), 1.0));
        let fields = [field(&[4.0, 2.0, 3.0, 5.0])];
        let (engine, _) = project(&t, &s, &fields, flow_params(1.0, 0.0));

        let total: f64 = (1..4).map(|i| engine.projected_inflow(CellId(i))).sum();
        let qmax = t.cell(CellId(0)).qmax();
        assert!((total - qmax).abs() < 1e-12, "total {total}, Qmax {qmax}");
    }

    #[test]
    fn bucket_without_routable_neighbor_stays() {
        let t = star();
        let mut s = OccupancyStore::new(t.len());
        s.add(CellId(0), Bucket::new(R0, Tick(0), 1.0));
        let fields = [field(&[1.0, -1.0, 0.0, -1.0])];
        let (engine, _) = project(&t, &s, &fields, flow_params(1.0, 0.0));
        for i in 1..4 {
            assert_eq!(engine.projected_inflow(CellId(i)), 0.0);
        }
    }

    #[test]
    fn beta_prefers_faster_neighbor() {
        let t = star();
        let mut s = OccupancyStore::new(t.len());
        s.add(CellId(0), Bucket::new(R0, Tick(0), 1.0));
        // n2 is crowded by another route pinned in place.
        s.add(CellId(2), Bucket::new(R1, Tick(0), 3.0));
        let fields = [field(&[2.0, 1.0, 1.0, -1.0]), field(&[-1.0, -1.0, 1.0, -1.0])];
        let (engine, _) = project(&t, &s, &fields, flow_params(1.0, 5.0));
        assert!(engine.projected_inflow(CellId(1)) > engine.projected_inflow(CellId(2)));
    }

    #[test]
    fn each_bucket_routes_by_its_own_field() {
        let t = star();
        let mut s = OccupancyStore::new(t.len());
        s.add(CellId(0), Bucket::new(R0, Tick(0), 0.5));
        s.add(CellId(0), Bucket::new(R1, Tick(0), 0.5));
        let fields = [field(&[2.0, 1.0, -1.0, -1.0]), field(&[2.0, -1.0, -1.0, 1.0])];
        let (engine, _) = project(&t, &s, &fields, flow_params(1.0, 0.0));
        assert!(engine.pending_into(CellId(1)).iter().all(|p| p.route == R0));
        assert!(engine.pending_into(CellId(3)).iter().all(|p| p.route == R1));
        assert!(engine.pending_into(CellId(2)).is_empty());
    }
}

// ── Rationing and conservation ────────────────────────────────────────────────

#[cfg(test)]
mod resolution {
    use super::*;

    /// Route 0 drains toward `m`; route 1 pins a crowd inside `m`.
    fn fields() -> [PotentialField; 2] {
        [field(&[2.0, 1.0, 2.0]), field(&[-1.0, 1.0, -1.0])]
    }

    #[test]
    fn uncongested_transfers_granted_in_full() {
        let t = line();
        let mut s = OccupancyStore::new(t.len());
        s.add(CellId(0), Bucket::new(R0, Tick(0), 1.0));
        let mut sensors = SensorTable::empty(t.len());
        let mut engine = FlowEngine::new(t.len());

        let report = engine.step(&t, &mut s, &fields(), &mut sensors, &flow_params(1.0, 0.0), Tick(0));

        let sent = cell_flow(&t, 1.0);
        assert!(close(report.moved, sent));
        assert!(close(s.total(CellId(1)), sent));
        assert!(close(s.total(CellId(0)), 1.0 - sent));
    }

    #[test]
    fn congested_receiver_rations_proportionally() {
        let t = line();
        let mut s = OccupancyStore::new(t.len());
        s.add(CellId(0), Bucket::new(R0, Tick(0), 1.0));
        s.add(CellId(2), Bucket::new(R0, Tick(1), 0.5));
        s.add(CellId(1), Bucket::new(R1, Tick(0), 5.3));
        let mut sensors = SensorTable::new(t.len(), &[CellId(1)]);
        let mut engine = FlowEngine::new(t.len());
        let fp = flow_params(1.0, 0.0);
        let fields = fields();

        let mut report = FlowReport::default();
        engine.project(&t, &s, &fields, &fp, Tick(7), &mut report);
        engine.compute_receiving_capacities(&t, &s, Tick(7), &mut report);

        let from_l = engine.pending_into(CellId(1)).iter().find(|p| p.from == CellId(0)).unwrap().people;
        let from_r = engine.pending_into(CellId(1)).iter().find(|p| p.from == CellId(2)).unwrap().people;
        let requested = engine.projected_inflow(CellId(1));
        let rc = engine.receiving_capacity(CellId(1));
        assert!(requested > rc, "scenario must be congested");

        engine.resolve(&mut s, &mut sensors, Tick(7), &mut report);

        // The receiver gains exactly Rc, split in proportion to the requests.
        assert!(close(s.total(CellId(1)), 5.3 + rc));
        assert!(close(s.total(CellId(0)), 1.0 - from_l * rc / requested));
        assert!(close(s.total(CellId(2)), 0.5 - from_r * rc / requested));

        let recs = sensors.records(CellId(1));
        assert_eq!(recs.len(), 2);
        assert!(recs.iter().all(|r| r.crossing == Tick(7) && r.route == R0));
        assert!(close(recs.iter().map(|r| r.weight).sum::<f64>(), rc));
    }

    #[test]
    fn over_capacity_receiver_accepts_nothing() {
        let t = line();
        let mut s = OccupancyStore::new(t.len());
        s.add(CellId(0), Bucket::new(R0, Tick(0), 1.0));
        s.add(CellId(1), Bucket::new(R1, Tick(0), 6.0));
        let mut sensors = SensorTable::empty(t.len());
        let mut engine = FlowEngine::new(t.len());

        let report = engine.step(&t, &mut s, &fields(), &mut sensors, &flow_params(1.0, 0.0), Tick(3));

        assert_eq!(report.moved, 0.0);
        assert_eq!(s.total(CellId(0)), 1.0);
        assert!(matches!(
            report.anomalies.as_slice(),
            [crate::Anomaly::CapacityExceeded { cell: CellId(1), .. }]
        ));
    }

    #[test]
    fn pending_state_cleared_after_step() {
        let t = line();
        let mut s = OccupancyStore::new(t.len());
        s.add(CellId(0), Bucket::new(R0, Tick(0), 1.0));
        let mut sensors = SensorTable::empty(t.len());
        let mut engine = FlowEngine::new(t.len());
        engine.step(&t, &mut s, &fields(), &mut sensors, &flow_params(1.0, 0.0), Tick(0));
        for i in 0..3 {
            assert!(engine.pending_into(CellId(i)).is_empty());
            assert_eq!(engine.projected_inflow(CellId(i)), 0.0);
            assert_eq!(engine.receiving_capacity(CellId(i)), 0.0);
        }
    }

    #[test]
    fn population_is_conserved_over_many_steps() {
        // 3×3 grid, everyone heading for the corner (id 8) which has no exit.
        let mut b = CellTableBuilder::new();
        for y in 0..3 {
            for x in 0..3 {
                let mut nbs = Vec::new();
                if x > 0 { nbs.push(format!("c{}", y * 3 + x - 1)); }
                if x < 2 { nbs.push(format!("c{}", y * 3 + x + 1)); }
                if y > 0 { nbs.push(format!("c{}", (y - 1) * 3 + x)); }
                if y < 2 { nbs.push(format!("c{}", (y + 1) * 3 + x)); }
                b.add_cell(&format!("c{}", y * 3 + x), "A", params(), [0.0; 8], &nbs);
            }
        }
        let t = b.build(0.3).unwrap();
        let values: Vec<f64> = (0..9).map(|i| (4 - i / 3 - i % 3 + 1) as f64).collect();
        let fields = [PotentialField::from_values(values)];

        let mut s = OccupancyStore::new(t.len());
        for i in 0..8 {
            s.add(CellId(i), Bucket::new(R0, Tick(i as u64 % 3), 0.7 + i as f64 * 0.4));
        }
        let before = s.total_population();

        let mut sensors = SensorTable::empty(t.len());
        let mut engine = FlowEngine::new(t.len());
        for tick in 0..50 {
            engine.step(&t, &mut s, &fields, &mut sensors, &flow_params(1.0, 0.5), Tick(tick));
            for id in t.ids() {
                assert!(s.total(id) >= 0.0);
            }
        }
        assert!((s.total_population() - before).abs() < 1e-9);
        assert!(s.total(CellId(8)) > s.total(CellId(0)));
    }
}

// ── Validation ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod validation {
    use super::*;
    use crate::FlowError;

    #[test]
    fn field_count_must_match_routes() {
        let t = line();
        let s = OccupancyStore::new(t.len());
        let fields = [field(&[2.0, 1.0, 2.0])];
        assert!(FlowEngine::validate(&t, &s, &fields, 1).is_ok());
        assert!(matches!(
            FlowEngine::validate(&t, &s, &fields, 2),
            Err(FlowError::FieldCount { expected: 2, found: 1 })
        ));
    }

    #[test]
    fn store_size_must_match_layout() {
        let t = line();
        let s = OccupancyStore::new(5);
        assert!(matches!(
            FlowEngine::validate(&t, &s, &[], 0),
            Err(FlowError::CellCount { expected: 3, found: 5 })
        ));
    }
}

// ── Anomaly log ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod anomaly_log {
    use super::*;

    fn capacity(tick: u64) -> Anomaly {
        Anomaly::CapacityExceeded { tick: Tick(tick), cell: CellId(1), free_space: -0.5 }
    }

    #[test]
    fn keeps_only_the_most_recent() {
        let mut log = AnomalyLog::new(3);
        for t in 0..10 {
            log.push(capacity(t));
        }
        log.push(Anomaly::InvalidProjectedOccupancy { tick: Tick(10), cell: CellId(0), value: f64::NAN });

        assert_eq!(log.total(), 11);
        assert_eq!(log.count(AnomalyKind::CapacityExceeded), 10);
        assert_eq!(log.count(AnomalyKind::InvalidProjectedOccupancy), 1);
        assert_eq!(log.count(AnomalyKind::BucketExceedsTotal), 0);
        let ticks: Vec<u64> = log.recent().map(|a| a.tick().0).collect();
        assert_eq!(ticks, [8, 9, 10]);
    }

    #[test]
    fn zero_capacity_only_counts() {
        let mut log = AnomalyLog::new(0);
        log.push(capacity(0));
        assert_eq!(log.total(), 1);
        assert_eq!(log.recent().len(), 0);
    }

    #[test]
    fn clear_resets_counts() {
        let mut log = AnomalyLog::new(4);
        log.push(capacity(0));
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.recent().len(), 0);
        assert!(AnomalyKind::ALL.iter().all(|&k| log.count(k) == 0));
    }
}
