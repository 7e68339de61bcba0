//! SQLite output backend (feature `sqlite`).
//!
//! Creates a single `output.db` file in the configured output directory with
//! the same content as the text backend, one table per file kind:
//! `cells`, `potentials`, `space_time`, `route_density`, `tt_avg`,
//! `tt_dist` and `sensors`.

use std::path::Path;

use rusqlite::Connection;
use ctm_sim::{RunHeader, RunSummary, TickSnapshot};

use crate::row::{SensorRow, TravelTimeRow};
use crate::writer::OutputWriter;
use crate::{OutputError, OutputResult};

pub const DB_FILE: &str = "output.db";

/// Writes simulation results to an SQLite database.
pub struct SqliteWriter {
    conn:     Connection,
    routes:   Vec<String>,
    started:  bool,
    finished: bool,
}

impl SqliteWriter {
    /// Open (or create) `output.db` in `dir` and initialise the schema.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        std::fs::create_dir_all(dir)?;
        let conn = Connection::open(dir.join(DB_FILE))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous  = NORMAL;
             CREATE TABLE IF NOT EXISTS cells (
                 cell INTEGER PRIMARY KEY,
                 name TEXT    NOT NULL
             );
             CREATE TABLE IF NOT EXISTS potentials (
                 route TEXT    NOT NULL,
                 cell  INTEGER NOT NULL,
                 value REAL    NOT NULL
             );
             CREATE TABLE IF NOT EXISTS space_time (
                 tick       INTEGER NOT NULL,
                 cell       INTEGER NOT NULL,
                 population REAL    NOT NULL
             );
             CREATE TABLE IF NOT EXISTS route_density (
                 tick    INTEGER NOT NULL,
                 route   TEXT    NOT NULL,
                 cell    INTEGER NOT NULL,
                 density REAL    NOT NULL
             );
             CREATE TABLE IF NOT EXISTS tt_avg (
                 interval INTEGER NOT NULL,
                 route    TEXT    NOT NULL,
                 mean     REAL    NOT NULL,
                 weight   REAL    NOT NULL
             );
             CREATE TABLE IF NOT EXISTS tt_dist (
                 interval     INTEGER NOT NULL,
                 route        TEXT    NOT NULL,
                 travel_ticks REAL    NOT NULL,
                 weight       REAL    NOT NULL
             );
             CREATE TABLE IF NOT EXISTS sensors (
                 cell      TEXT    NOT NULL,
                 departure INTEGER NOT NULL,
                 route     TEXT    NOT NULL,
                 arrival   INTEGER NOT NULL,
                 weight    REAL    NOT NULL
             );",
        )?;

        Ok(Self { conn, routes: Vec::new(), started: false, finished: false })
    }

    fn insert_travel_times(&self, table: &str, rows: &[TravelTimeRow]) -> OutputResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(&format!("INSERT INTO {table} VALUES (?1, ?2, ?3, ?4)"))?;
            for row in rows {
                stmt.execute(rusqlite::params![row.interval.0 as i64, row.route, row.value, row.weight])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

impl OutputWriter for SqliteWriter {
    fn begin(&mut self, header: &RunHeader) -> OutputResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut cells = tx.prepare_cached("INSERT OR REPLACE INTO cells (cell, name) VALUES (?1, ?2)")?;
            for (i, name) in header.cells.iter().enumerate() {
                cells.execute(rusqlite::params![i as i64, name])?;
            }
            let mut potentials =
                tx.prepare_cached("INSERT INTO potentials (route, cell, value) VALUES (?1, ?2, ?3)")?;
            for (route, values) in header.routes.iter().zip(&header.potentials) {
                for (i, v) in values.iter().enumerate() {
                    potentials.execute(rusqlite::params![route, i as i64, v])?;
                }
            }
        }
        tx.commit()?;
        self.routes = header.routes.clone();
        self.started = true;
        Ok(())
    }

    fn write_tick(&mut self, snapshot: &TickSnapshot) -> OutputResult<()> {
        if !self.started {
            return Err(OutputError::MissingHeader("tick"));
        }
        let tick = snapshot.tick.0 as i64;
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut pop = tx.prepare_cached(
                "INSERT INTO space_time (tick, cell, population) VALUES (?1, ?2, ?3)",
            )?;
            let mut density = tx.prepare_cached(
                "INSERT INTO route_density (tick, route, cell, density) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (i, cell) in snapshot.cells.iter().enumerate() {
                pop.execute(rusqlite::params![tick, i as i64, cell.population])?;
                for (route, d) in self.routes.iter().zip(&cell.route_densities) {
                    if *d > 0.0 {
                        density.execute(rusqlite::params![tick, route, i as i64, d])?;
                    }
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn write_results(&mut self, summary: &RunSummary) -> OutputResult<()> {
        if !self.started {
            return Err(OutputError::MissingHeader("results"));
        }
        self.insert_travel_times("tt_avg", &TravelTimeRow::averages(summary))?;
        self.insert_travel_times("tt_dist", &TravelTimeRow::distribution(summary))?;

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO sensors (cell, departure, route, arrival, weight) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for row in SensorRow::all(summary) {
                stmt.execute(rusqlite::params![
                    row.cell,
                    row.departure.0 as i64,
                    row.route,
                    row.arrival.0 as i64,
                    row.weight,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.conn
            .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}
