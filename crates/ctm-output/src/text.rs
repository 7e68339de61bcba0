//! Plain-text output backend.
//!
//! Creates, in the configured output directory:
//! - `spaceTime.txt`: cell names, then one line of populations per tick
//! - `routes/<route>.txt`: static potential per cell, then one line of route
//!   densities per tick
//! - `TT_avg.txt`, `TT_dist.txt`: `interval,route,value,weight`, no header
//! - `<sensor cell>.txt`: `departure,route,arrival,weight`, no header
//!
//! Every file is written to a temporary sibling and renamed into place, so
//! a failed run never leaves a truncated file behind.

use std::fmt::Display;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use ctm_sim::{RunHeader, RunSummary, TickSnapshot};

use crate::row::{SensorRow, TravelTimeRow};
use crate::writer::OutputWriter;
use crate::{OutputError, OutputResult};

pub const SPACE_TIME_FILE: &str = "spaceTime.txt";
pub const ROUTES_DIR: &str = "routes";
pub const TT_AVG_FILE: &str = "TT_avg.txt";
pub const TT_DIST_FILE: &str = "TT_dist.txt";

/// Buffers per-tick lines and writes every file on [`finish`](OutputWriter::finish).
pub struct TextWriter {
    dir:        PathBuf,
    space_time: Vec<String>,
    /// `(route name, lines)` indexed by `RouteId`.
    routes:     Vec<(String, Vec<String>)>,
    started:    bool,
    finished:   bool,
}

impl TextWriter {
    /// Create `dir` (and `dir/routes`) if needed.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        fs::create_dir_all(dir.join(ROUTES_DIR))?;
        Ok(Self {
            dir:        dir.to_path_buf(),
            space_time: Vec::new(),
            routes:     Vec::new(),
            started:    false,
            finished:   false,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn route_path(&self, route: &str) -> PathBuf {
        self.dir.join(ROUTES_DIR).join(format!("{route}.txt"))
    }
}

impl OutputWriter for TextWriter {
    fn begin(&mut self, header: &RunHeader) -> OutputResult<()> {
        self.space_time.clear();
        self.space_time.push(header.cells.join(" "));
        self.routes = header
            .routes
            .iter()
            .zip(&header.potentials)
            .map(|(name, potential)| (name.clone(), vec![join(potential)]))
            .collect();
        self.started = true;
        self.finished = false;
        Ok(())
    }

    fn write_tick(&mut self, snapshot: &TickSnapshot) -> OutputResult<()> {
        if !self.started {
            return Err(OutputError::MissingHeader("tick"));
        }
        self.space_time.push(join(snapshot.cells.iter().map(|c| c.population)));
        for (r, (_, lines)) in self.routes.iter_mut().enumerate() {
            let densities = snapshot
                .cells
                .iter()
                .map(|c| c.route_densities.get(r).copied().unwrap_or(0.0));
            lines.push(join(densities));
        }
        Ok(())
    }

    fn write_results(&mut self, summary: &RunSummary) -> OutputResult<()> {
        if !self.started {
            return Err(OutputError::MissingHeader("results"));
        }

        write_atomic(&self.dir.join(TT_AVG_FILE), &travel_time_csv(&TravelTimeRow::averages(summary))?)?;
        write_atomic(&self.dir.join(TT_DIST_FILE), &travel_time_csv(&TravelTimeRow::distribution(summary))?)?;

        let rows = SensorRow::all(summary);
        for out in &summary.sensors {
            let mut w = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
            for row in rows.iter().filter(|r| r.cell == out.cell) {
                w.write_record(&[
                    row.departure.0.to_string(),
                    row.route.clone(),
                    row.arrival.0.to_string(),
                    row.weight.to_string(),
                ])?;
            }
            let bytes = w.into_inner().map_err(|e| e.into_error())?;
            write_atomic(&self.dir.join(format!("{}.txt", out.cell)), &bytes)?;
        }

        log::info!(
            "wrote travel times for {} routes and {} sensor files to {}",
            summary.travel_times.len(),
            summary.sensors.len(),
            self.dir.display()
        );
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished || !self.started {
            return Ok(());
        }
        self.finished = true;
        write_atomic(&self.dir.join(SPACE_TIME_FILE), lines_bytes(&self.space_time).as_slice())?;
        for (name, lines) in &self.routes {
            write_atomic(&self.route_path(name), lines_bytes(lines).as_slice())?;
        }
        Ok(())
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn join<T: Display>(values: impl IntoIterator<Item = T>) -> String {
    values.into_iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ")
}

fn lines_bytes(lines: &[String]) -> Vec<u8> {
    let mut out = Vec::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
    for line in lines {
        out.extend_from_slice(line.as_bytes());
        out.push(b'\n');
    }
    out
}

fn travel_time_csv(rows: &[TravelTimeRow]) -> OutputResult<Vec<u8>> {
    let mut w = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    for row in rows {
        w.write_record(&[
            row.interval.0.to_string(),
            row.route.clone(),
            row.value.to_string(),
            row.weight.to_string(),
        ])?;
    }
    Ok(w.into_inner().map_err(|e| e.into_error())?)
}

/// Write `bytes` next to `path` and rename over it.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> OutputResult<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".part");
    let tmp = PathBuf::from(tmp);

    let result = (|| {
        let mut f = File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
        fs::rename(&tmp, path)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    Ok(result?)
}
