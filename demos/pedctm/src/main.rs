//! pedctm: command-line driver for the pedestrian cell-transmission model.
//!
//! ```text
//! pedctm                                   run the built-in fork scenario
//! pedctm LAYOUT DEMAND [OUTDIR] [CONFIG]   run a scenario from files
//! ```
//!
//! `OUTDIR` defaults to `output`.  `CONFIG` is an optional JSON file with any
//! subset of the `CtmConfig` fields.  Log verbosity comes from `PEDCTM_LOG`
//! (e.g. `PEDCTM_LOG=debug`).

mod scenario;

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};

use ctm_core::CtmConfig;
use ctm_demand::load_demand_reader;
use ctm_output::{RunRecorder, TextWriter};
use ctm_sim::{RunOutcome, SimBuilder, SimObserver, TickSnapshot};
use ctm_spatial::load_layout_reader;

// ── Observer wrapper to track the peak ────────────────────────────────────────

/// Forwards to the recorder and remembers the busiest tick.
struct PeakObserver<O: SimObserver> {
    inner: O,
    peak:  (u64, f64),
}

impl<O: SimObserver> SimObserver for PeakObserver<O> {
    fn on_sim_start(&mut self, header: &ctm_sim::RunHeader) {
        self.inner.on_sim_start(header);
    }

    fn on_snapshot(&mut self, snapshot: &TickSnapshot) {
        if snapshot.total_population > self.peak.1 {
            self.peak = (snapshot.tick.0, snapshot.total_population);
        }
        self.inner.on_snapshot(snapshot);
    }

    fn on_sim_end(&mut self, summary: &ctm_sim::RunSummary) {
        self.inner.on_sim_end(summary);
    }
}

// ── Arguments ─────────────────────────────────────────────────────────────────

struct Args {
    /// `None` runs the built-in scenario.
    inputs:  Option<(PathBuf, PathBuf)>,
    out_dir: PathBuf,
    config:  Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [] => Ok(Args { inputs: None, out_dir: "output".into(), config: None }),
        [layout, demand, rest @ ..] if rest.len() <= 2 => Ok(Args {
            inputs:  Some((layout.into(), demand.into())),
            out_dir: rest.first().map_or_else(|| "output".into(), PathBuf::from),
            config:  rest.get(1).map(PathBuf::from),
        }),
        _ => bail!("usage: pedctm [LAYOUT DEMAND [OUTDIR] [CONFIG]]"),
    }
}

fn load_config(path: Option<&Path>) -> Result<CtmConfig> {
    let Some(path) = path else {
        return Ok(CtmConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: CtmConfig = serde_json::from_str(&text)
        .with_context(|| format!("parsing config {}", path.display()))?;
    log::info!("loaded config from {}", path.display());
    Ok(config)
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::new().filter_or("PEDCTM_LOG", "info")).init();

    let args = parse_args()?;
    let config = load_config(args.config.as_deref())?;

    // 1. Build the engine from files or the embedded scenario.
    let builder = match &args.inputs {
        Some((layout, demand)) => SimBuilder::from_files(layout, demand, config)?,
        None => {
            println!("=== pedctm: built-in fork scenario ===");
            let layout = load_layout_reader(
                Cursor::new(scenario::LAYOUT),
                config.calibration_start_fraction,
            )?;
            let demand = load_demand_reader(Cursor::new(scenario::demand_csv()))?;
            SimBuilder::from_layout(layout, &demand)?.config(config)
        }
    };
    let mut sim = builder.build()?;
    println!(
        "Layout: {} cells  |  Routes: {}  |  Scheduled: {:.1} people",
        sim.cells().len(),
        sim.routes().len(),
        sim.routes().total_demand()
    );

    // 2. Set up output.
    let writer = TextWriter::new(&args.out_dir)
        .with_context(|| format!("creating output directory {}", args.out_dir.display()))?;
    let mut obs = PeakObserver { inner: RunRecorder::new(writer), peak: (0, 0.0) };

    // 3. Run.
    let t0 = Instant::now();
    let outcome = sim.run(&mut obs)?;
    let elapsed = t0.elapsed();

    if let Some(e) = obs.inner.take_error() {
        eprintln!("output error: {e}");
    }
    if outcome == RunOutcome::Cancelled {
        println!("Run cancelled at tick {}", sim.tick());
        return Ok(());
    }

    // 4. Summary.
    let summary = sim.summary();
    println!(
        "Simulation ended at tick {} ({:.1} s simulated) in {:.3} s",
        summary.final_tick,
        (summary.final_tick.0 + 1) as f64 * sim.clock().tick_duration_secs,
        elapsed.as_secs_f64()
    );
    println!(
        "  injected {:.3}  drained {:.3}  remaining {:.3}  (balance {:+.2e})",
        summary.stats.injected,
        summary.stats.drained,
        summary.remaining,
        summary.conservation_error()
    );
    println!("  peak population {:.3} at tick {}", obs.peak.1, obs.peak.0);
    if summary.anomalies > 0 {
        println!("  {} numerical anomalies (see log)", summary.anomalies);
    }
    println!();

    println!("{:<12} {:>10} {:>10} {:>10}", "Route", "Interval", "Mean", "People");
    println!("{}", "-".repeat(45));
    for tt in &summary.travel_times {
        for s in &tt.summaries {
            println!(
                "{:<12} {:>10} {:>10.2} {:>10.2}",
                tt.route, s.departure.0, s.mean_ticks, s.total_weight
            );
        }
    }
    println!();
    println!("Results written to {}", args.out_dir.display());

    Ok(())
}
