//! Unit tests for ctm-spatial.
//!
//! All tests use hand-written layouts so they run without any data files.

#[cfg(test)]
mod helpers {
    use crate::{CellParams, CellTable, CellTableBuilder};

    pub fn params() -> CellParams {
        CellParams { shape: 1.913, area: 1.0, critical_density: 5.4, delta: 1.0 }
    }

    pub fn square(x: f32, y: f32) -> [f32; 8] {
        [x, y, x + 1.0, y, x + 1.0, y + 1.0, x, y + 1.0]
    }

    /// A 2×3 grid of cells:
    ///
    /// ```text
    ///   a0(A) a1(A) a2(B)
    ///   b0(C) b1(C) b2(B)
    /// ```
    ///
    /// 4-neighborhood.  Zone C is a detour area not on route A-B.
    pub fn grid() -> CellTable {
        let mut b = CellTableBuilder::new();
        b.add_cell("a0", "A", params(), square(0.0, 0.0), &["a1", "b0"]);
        b.add_cell("a1", "A", params(), square(1.0, 0.0), &["a0", "a2", "b1"]);
        b.add_cell("a2", "B", params(), square(2.0, 0.0), &["a1", "b2"]);
        b.add_cell("b0", "C", params(), square(0.0, 1.0), &["a0", "b1"]);
        b.add_cell("b1", "C", params(), square(1.0, 1.0), &["a1", "b0", "b2"]);
        b.add_cell("b2", "B", params(), square(2.0, 1.0), &["a2", "b1"]);
        b.build(0.3).unwrap()
    }

    pub const TWO_CELL_LAYOUT: &str = "\
#Simulation
two cells
#Cells
2 1 1 0 K
S A 1.913 1 5.4 1
0 0 1 0 1 1 0 1
K
K B 1.913 1 5.4 1
1 0 2 0 2 1 1 1
S
#End
";
}

// ── Fundamental diagram ───────────────────────────────────────────────────────

#[cfg(test)]
mod diagram {
    use crate::FundamentalDiagram;

    fn reference() -> FundamentalDiagram {
        FundamentalDiagram::calibrate(1.913, 1.0, 5.4, 0.3).unwrap()
    }

    #[test]
    fn calibration_produces_interior_optimum() {
        let d = reference();
        assert!(d.nmax > 0.0 && d.nmax < d.max_capacity, "nmax = {}", d.nmax);
        assert!(d.qmax > 0.0 && d.qmax < d.nmax, "Qmax = {}", d.qmax);
        // Hand-computed reference values for these parameters.
        assert!((d.nmax - 1.750).abs() < 0.01, "nmax = {}", d.nmax);
        assert!((d.qmax - 0.914).abs() < 0.01, "Qmax = {}", d.qmax);
    }

    #[test]
    fn calibration_is_deterministic() {
        let a = reference();
        let b = reference();
        assert_eq!(a.nmax.to_bits(), b.nmax.to_bits());
        assert_eq!(a.qmax.to_bits(), b.qmax.to_bits());
    }

    #[test]
    fn qmax_matches_flow_at_nmax() {
        let d = reference();
        assert!((d.flow(d.nmax) - d.qmax).abs() < 1e-12);
    }

    #[test]
    fn degenerate_parameters_fail() {
        // Zero area makes x0 = xN = 0 and the quadratic collapses.
        assert!(FundamentalDiagram::calibrate(1.913, 0.0, 0.0, 0.3).is_err());
        // Negative shape yields a negative optimum.
        assert!(FundamentalDiagram::calibrate(-2.0, 1.0, 5.4, 0.3).is_err());
    }

    #[test]
    fn flow_is_zero_when_empty_or_jammed() {
        let d = reference();
        assert_eq!(d.flow(0.0), 0.0);
        assert_eq!(d.flow(d.max_capacity), 0.0);
        assert_eq!(d.flow(d.max_capacity + 1.0), 0.0);
        assert!(d.flow(1.0) > 0.0);
    }

    #[test]
    fn sending_capacity_saturates_at_qmax() {
        let d = reference();
        assert_eq!(d.sending_capacity(d.nmax + 0.5), d.qmax);
        assert_eq!(d.sending_capacity(10.0), d.qmax);
        assert_eq!(d.sending_capacity(0.5), d.flow(0.5));
    }

    #[test]
    fn receiving_capacity_limited_by_free_space() {
        let d = reference();
        // Empty cell: limited by Qmax.
        assert_eq!(d.raw_receiving_capacity(0.0, 1.0), d.qmax);
        // Nearly full cell: limited by delta · remaining space.
        let rc = d.raw_receiving_capacity(5.3, 1.0);
        assert!((rc - 0.1).abs() < 1e-9 || rc < 0.1, "rc = {rc}");
        // Over capacity: negative before clamping.
        assert!(d.raw_receiving_capacity(6.0, 1.0) < 0.0);
    }

    #[test]
    fn speed_bounds() {
        let d = reference();
        assert_eq!(d.speed(0.0), 1.0);
        assert_eq!(d.speed(-1.0), 1.0);
        assert!(d.speed(1.0) > d.speed(3.0));
        assert!(d.speed(d.max_capacity * 2.0) < 0.0);
        assert_eq!(d.reported_speed(d.max_capacity * 2.0), 0.0);
        assert_eq!(d.reported_speed(1.0), d.speed(1.0));
    }
}

// ── Cell table ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod table {
    use ctm_core::CellId;

    use crate::{CellTableBuilder, SpatialError};

    use super::helpers::{grid, params, square};

    #[test]
    fn ids_follow_insertion_order() {
        let t = grid();
        assert_eq!(t.len(), 6);
        assert_eq!(t.id_of("a0"), Some(CellId(0)));
        assert_eq!(t.id_of("b2"), Some(CellId(5)));
        assert_eq!(t.id_of("zz"), None);
    }

    #[test]
    fn neighbors_resolved_to_ids() {
        let t = grid();
        let a1 = t.id_of("a1").unwrap();
        let names: Vec<&str> = t.neighbors(a1).iter().map(|&n| t.cell(n).name.as_str()).collect();
        assert_eq!(names, ["a0", "a2", "b1"]);
    }

    #[test]
    fn zones_interned() {
        let t = grid();
        assert_eq!(t.zone_count(), 3);
        let b = t.zone_id("B").unwrap();
        assert_eq!(t.zone_name(b), "B");
        assert_eq!(t.first_cell_in_zone(b), t.id_of("a2"));
    }

    #[test]
    fn bounds_cover_all_vertices() {
        let b = grid().bounds();
        assert_eq!((b.min_x, b.min_y, b.max_x, b.max_y), (0.0, 0.0, 3.0, 2.0));
    }

    #[test]
    fn unknown_neighbor_rejected() {
        let mut b = CellTableBuilder::new();
        b.add_cell("x", "A", params(), square(0.0, 0.0), &["ghost"]);
        assert!(matches!(b.build(0.3), Err(SpatialError::UnknownNeighbor { .. })));
    }

    #[test]
    fn duplicate_cell_rejected() {
        let mut b = CellTableBuilder::new();
        b.add_cell("x", "A", params(), square(0.0, 0.0), &[] as &[&str]);
        b.add_cell("x", "A", params(), square(1.0, 0.0), &[] as &[&str]);
        assert!(matches!(b.build(0.3), Err(SpatialError::DuplicateCell(_))));
    }

    #[test]
    fn calibration_failure_names_cell() {
        let mut b = CellTableBuilder::new();
        let mut bad = params();
        bad.shape = -2.0;
        b.add_cell("bad", "A", bad, square(0.0, 0.0), &[] as &[&str]);
        match b.build(0.3) {
            Err(SpatialError::Calibration { cell, .. }) => assert_eq!(cell, "bad"),
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("calibration should have failed"),
        }
    }

    #[test]
    fn recalibrate_all_updates_capacity() {
        let mut t = grid();
        let before = t.cell(CellId(0)).qmax();
        t.recalibrate_all(1.913, 10.8, 0.3).unwrap();
        let cell = t.cell(CellId(0));
        assert_eq!(cell.max_capacity(), 10.8);
        assert!(cell.qmax() > before);
    }

    #[test]
    fn failed_recalibration_leaves_table_untouched() {
        let mut t = grid();
        let before = t.cell(CellId(3)).diagram;
        assert!(t.recalibrate_all(-2.0, 5.4, 0.3).is_err());
        assert_eq!(t.cell(CellId(3)).diagram, before);
    }
}

// ── Layout loader ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod layout {
    use std::io::Cursor;

    use crate::{SpatialError, load_layout_reader};

    use super::helpers::TWO_CELL_LAYOUT;

    fn load(text: &str) -> Result<crate::Layout, SpatialError> {
        load_layout_reader(Cursor::new(text), 0.3)
    }

    #[test]
    fn parses_two_cell_layout() {
        let layout = load(TWO_CELL_LAYOUT).unwrap();
        assert_eq!(layout.delta_l, 1.0);
        assert_eq!(layout.alpha, 1.0);
        assert_eq!(layout.beta, 0.0);
        assert_eq!(layout.cells.len(), 2);

        let s = layout.cells.id_of("S").unwrap();
        let k = layout.cells.id_of("K").unwrap();
        assert_eq!(layout.cells.neighbors(s), &[k]);
        assert_eq!(layout.cells.cell(k).polygon, [1.0, 0.0, 2.0, 0.0, 2.0, 1.0, 1.0, 1.0]);
        assert_eq!(layout.sensors, vec![k]);
    }

    #[test]
    fn crlf_line_endings_accepted() {
        let text = TWO_CELL_LAYOUT.replace('\n', "\r\n");
        assert!(load(&text).is_ok());
    }

    #[test]
    fn missing_simulation_header_rejected() {
        let text = TWO_CELL_LAYOUT.replacen("#Simulation", "#Sim", 1);
        assert!(matches!(load(&text), Err(SpatialError::Layout { line: 1, .. })));
    }

    #[test]
    fn missing_end_marker_rejected() {
        let text = TWO_CELL_LAYOUT.replace("#End", "");
        assert!(matches!(load(&text), Err(SpatialError::Layout { .. })));
    }

    #[test]
    fn short_polygon_rejected() {
        let text = TWO_CELL_LAYOUT.replacen("0 0 1 0 1 1 0 1", "0 0 1 0 1 1", 1);
        assert!(matches!(load(&text), Err(SpatialError::Layout { line: 6, .. })));
    }

    #[test]
    fn cell_count_mismatch_rejected() {
        // Claims three cells but only two blocks follow.
        let text = TWO_CELL_LAYOUT.replacen("2 1 1 0 K", "3 1 1 0 K", 1);
        assert!(load(&text).is_err());
    }

    #[test]
    fn oversized_cell_count_rejected() {
        let text = "#Simulation\n\n#Cells\n18446744073709551615 1 1 0\n#End\n";
        assert!(matches!(load(text), Err(SpatialError::Layout { line: 4, .. })));

        let text = TWO_CELL_LAYOUT.replacen("2 1 1 0 K", "100000000000 1 1 0 K", 1);
        assert!(matches!(load(&text), Err(SpatialError::Layout { line: 4, .. })));
    }

    #[test]
    fn bad_number_rejected() {
        let text = TWO_CELL_LAYOUT.replacen("1.913", "abc", 1);
        assert!(matches!(load(&text), Err(SpatialError::Layout { line: 5, .. })));
    }

    #[test]
    fn unknown_sensor_rejected() {
        let text = TWO_CELL_LAYOUT.replacen("2 1 1 0 K", "2 1 1 0 Q", 1);
        assert!(matches!(load(&text), Err(SpatialError::UnknownSensorCell(_))));
    }

    #[test]
    fn trailing_content_after_end_ignored() {
        let text = format!("{TWO_CELL_LAYOUT}anything goes here\n");
        assert!(load(&text).is_ok());
    }
}

// ── Potential fields ──────────────────────────────────────────────────────────

#[cfg(test)]
mod potential {
    use ctm_core::ZoneId;

    use crate::{BreadthFirstSolver, PotentialField, PotentialSolver};

    use super::helpers::grid;

    fn zones(t: &crate::CellTable, names: &[&str]) -> Vec<ZoneId> {
        names.iter().map(|n| t.zone_id(n).unwrap()).collect()
    }

    #[test]
    fn sink_is_one_and_levels_grow() {
        let t = grid();
        let sink = t.id_of("a2").unwrap();
        let field = BreadthFirstSolver.solve(&t, &zones(&t, &["A", "B"]), sink);

        assert_eq!(field.get(sink), 1.0);
        assert_eq!(field.get(t.id_of("b2").unwrap()), 2.0);
        assert_eq!(field.get(t.id_of("a1").unwrap()), 2.0);
        assert_eq!(field.get(t.id_of("a0").unwrap()), 3.0);
        assert_eq!(field.max_level(), 3.0);
    }

    #[test]
    fn off_route_cells_are_minus_one() {
        let t = grid();
        let sink = t.id_of("a2").unwrap();
        let field = BreadthFirstSolver.solve(&t, &zones(&t, &["A", "B"]), sink);
        assert_eq!(field.get(t.id_of("b0").unwrap()), PotentialField::OFF_ROUTE);
        assert_eq!(field.get(t.id_of("b1").unwrap()), PotentialField::OFF_ROUTE);
        assert!(!field.is_routable(t.id_of("b1").unwrap()));
    }

    #[test]
    fn detour_zone_on_route_is_reached() {
        let t = grid();
        let sink = t.id_of("a2").unwrap();
        let field = BreadthFirstSolver.solve(&t, &zones(&t, &["C", "B"]), sink);
        // a2 → b2 → b1 → b0; zone A is off-route.
        assert_eq!(field.get(t.id_of("b2").unwrap()), 2.0);
        assert_eq!(field.get(t.id_of("b1").unwrap()), 3.0);
        assert_eq!(field.get(t.id_of("b0").unwrap()), 4.0);
        assert_eq!(field.get(t.id_of("a0").unwrap()), PotentialField::OFF_ROUTE);
    }

    #[test]
    fn neighbor_levels_differ_by_at_most_one() {
        let t = grid();
        let sink = t.id_of("a2").unwrap();
        let field = BreadthFirstSolver.solve(&t, &zones(&t, &["A", "B", "C"]), sink);
        for id in t.ids() {
            assert!(field.is_routable(id), "{} should be reachable", t.cell(id).name);
            for &nb in t.neighbors(id) {
                assert!((field.get(id) - field.get(nb)).abs() <= 1.0);
            }
        }
    }

    #[test]
    fn unreachable_on_route_cell_stays_unassigned() {
        use crate::CellTableBuilder;

        let p = super::helpers::params();
        let mut b = CellTableBuilder::new();
        b.add_cell("s", "A", p, [0.0; 8], &["k"]);
        b.add_cell("k", "B", p, [0.0; 8], &["s"]);
        // Same zone as the route, but only connected through an off-route cell.
        b.add_cell("x", "X", p, [0.0; 8], &["island"]);
        b.add_cell("island", "A", p, [0.0; 8], &["x"]);
        let t = b.build(0.3).unwrap();

        let field = BreadthFirstSolver.solve(&t, &zones(&t, &["A", "B"]), t.id_of("k").unwrap());
        assert_eq!(field.get(t.id_of("s").unwrap()), 2.0);
        assert_eq!(field.get(t.id_of("island").unwrap()), PotentialField::UNREACHED);
        assert_eq!(field.get(t.id_of("x").unwrap()), PotentialField::OFF_ROUTE);
    }
}
