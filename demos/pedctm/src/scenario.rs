//! Built-in demo scenario, used when no input files are given.
//!
//! A corridor that forks into two exits:
//!
//! ```text
//!   a1 ── c1 ── c2 ── c3 ── b1
//!                │
//!                d1
//! ```
//!
//! Zone `A` is the entrance, `C` the corridor, `B` and `D` the exits.
//! `c2` carries a sensor.

pub const LAYOUT: &str = "\
#Simulation
fork demo
#Cells
6 1 1 0.5 c2
a1 A 1.913 2 5.4 1
0 0 1 0 1 2 0 2
c1
c1 C 1.913 2 5.4 1
1 0 2 0 2 2 1 2
a1 c2
c2 C 1.913 2 5.4 1
2 0 3 0 3 2 2 2
c1 c3 d1
c3 C 1.913 2 5.4 1
3 0 4 0 4 2 3 2
c2 b1
b1 B 1.913 2 5.4 1
4 0 5 0 5 2 4 2
c3
d1 D 1.913 2 5.4 1
2 2 3 2 3 4 2 4
c2
#End
";

/// Ten intervals of arrivals: three people per tick to `B`, one to `D`.
pub fn demand_csv() -> String {
    let mut csv = String::new();
    for t in 0..10 {
        csv.push_str(&format!("{t},A-C-B,walk,3\n"));
        csv.push_str(&format!("{t},A-C-D,walk,1\n"));
    }
    csv
}
