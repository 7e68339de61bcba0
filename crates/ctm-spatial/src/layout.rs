//! Layout file loader.
//!
//! # Format
//!
//! Line-oriented text, whitespace-separated fields:
//!
//! ```text
//! #Simulation
//! <free text, ignored>
//! #Cells
//! numberCells deltaL alpha beta [sensorCellId]*
//! cellId zoneId shape area kc delta        ┐
//! x0 y0 x1 y1 x2 y2 x3 y3                  │ repeated numberCells times
//! neighborId neighborId …                  ┘
//! #End
//! ```
//!
//! Anything after `#End` is ignored.  Any other deviation rejects the whole
//! file; no partially built table is ever returned.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use ctm_core::CellId;

use crate::cell::CellParams;
use crate::table::{CellTable, CellTableBuilder};
use crate::{SpatialError, SpatialResult};

/// A fully loaded layout: global parameters, the cell table and the cells
/// instrumented with sensors.
pub struct Layout {
    /// Cell side length (area = deltaL² for square cells).
    pub delta_l: f64,
    /// Weight of the static potential in the route choice.
    pub alpha: f64,
    /// Weight of the local speed in the route choice.
    pub beta: f64,
    pub cells: CellTable,
    /// Sensor cells in the order they appear in the header line.
    pub sensors: Vec<CellId>,
}

/// Load a layout from a file.
pub fn load_layout(path: &Path, start_fraction: f64) -> SpatialResult<Layout> {
    let file = std::fs::File::open(path)?;
    let layout = load_layout_reader(file, start_fraction)?;
    log::info!(
        "loaded layout {}: {} cells, {} zones, {} sensors",
        path.display(),
        layout.cells.len(),
        layout.cells.zone_count(),
        layout.sensors.len()
    );
    Ok(layout)
}

/// Like [`load_layout`] but accepts any `Read` source.
pub fn load_layout_reader<R: Read>(reader: R, start_fraction: f64) -> SpatialResult<Layout> {
    let lines: Vec<String> = BufReader::new(reader)
        .lines()
        .map(|l| l.map(|s| s.trim_end_matches('\r').to_owned()))
        .collect::<Result<_, _>>()?;

    let line = |i: usize| line_at(&lines, i);

    if line(0)?.trim() != "#Simulation" {
        return Err(layout_err(0, "expected \"#Simulation\" header"));
    }
    if line(2)?.trim() != "#Cells" {
        return Err(layout_err(2, "expected \"#Cells\" header"));
    }

    // ── Global parameters ─────────────────────────────────────────────────
    let header: Vec<&str> = line(3)?.split_whitespace().collect();
    if header.len() < 4 {
        return Err(layout_err(3, "expected \"numberCells deltaL alpha beta [sensor]*\""));
    }
    let cell_count: usize = parse_field(header[0], 3, "numberCells")?;
    let delta_l: f64 = parse_field(header[1], 3, "deltaL")?;
    let alpha: f64 = parse_field(header[2], 3, "alpha")?;
    let beta: f64 = parse_field(header[3], 3, "beta")?;
    let sensor_names: Vec<&str> = header[4..].to_vec();

    // Three lines per cell plus the four header lines and `#End`.
    let end = cell_count
        .checked_mul(3)
        .and_then(|n| n.checked_add(4))
        .filter(|&end| end < lines.len())
        .ok_or_else(|| {
            layout_err(3, &format!("numberCells {cell_count} does not fit the {} lines of the file", lines.len()))
        })?;

    // ── Cell blocks ───────────────────────────────────────────────────────
    let mut builder = CellTableBuilder::with_capacity(cell_count);
    for k in 0..cell_count {
        let base = 4 + 3 * k;

        let fields: Vec<&str> = line(base)?.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(layout_err(
                base,
                &format!("expected \"cellId zoneId shape area kc delta\", found {} fields", fields.len()),
            ));
        }
        let params = CellParams {
            shape:            parse_field(fields[2], base, "shape")?,
            area:             parse_field(fields[3], base, "area")?,
            critical_density: parse_field(fields[4], base, "kc")?,
            delta:            parse_field(fields[5], base, "delta")?,
        };

        let coords: Vec<&str> = line(base + 1)?.split_whitespace().collect();
        if coords.len() != 8 {
            return Err(layout_err(
                base + 1,
                &format!("expected 8 polygon coordinates, found {}", coords.len()),
            ));
        }
        let mut polygon = [0.0f32; 8];
        for (slot, raw) in polygon.iter_mut().zip(&coords) {
            *slot = parse_field(raw, base + 1, "coordinate")?;
        }

        let neighbors: Vec<&str> = line(base + 2)?.split_whitespace().collect();

        builder.add_cell(fields[0], fields[1], params, polygon, &neighbors);
    }

    if line(end)?.trim() != "#End" {
        return Err(layout_err(end, "expected \"#End\" after the last cell block"));
    }

    let cells = builder.build(start_fraction)?;

    let sensors = sensor_names
        .into_iter()
        .map(|name| {
            cells
                .id_of(name)
                .ok_or_else(|| SpatialError::UnknownSensorCell(name.to_owned()))
        })
        .collect::<SpatialResult<Vec<CellId>>>()?;

    Ok(Layout { delta_l, alpha, beta, cells, sensors })
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn line_at(lines: &[String], index: usize) -> SpatialResult<&str> {
    lines
        .get(index)
        .map(String::as_str)
        .ok_or_else(|| layout_err(index, "unexpected end of file"))
}

/// Errors report 1-based line numbers.
fn layout_err(index: usize, message: &str) -> SpatialError {
    SpatialError::Layout { line: index + 1, message: message.to_owned() }
}

fn parse_field<T: std::str::FromStr>(raw: &str, index: usize, what: &str) -> SpatialResult<T> {
    raw.parse::<T>()
        .map_err(|_| layout_err(index, &format!("invalid {what} {raw:?}")))
}
