//! Run-level configuration.

use crate::{CtmError, CtmResult, Tick};

/// Constants that govern one simulation run.
///
/// Layout-level parameters (`deltaL`, `alpha`, `beta`) live with the layout,
/// not here.  Typically built with `CtmConfig::default()` and adjusted, or
/// loaded from JSON by the application crate (feature `serde`).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CtmConfig {
    /// Hard cap: the run ends once this tick has been processed.
    pub max_ticks: u64,

    /// Total population below which the network counts as empty.
    /// Absorbs floating-point residue; exact zero is never reached.
    pub residual_tolerance: f64,

    /// Relative excess of a bucket over its cell total above which the
    /// projection falls back to routing the whole bucket (and warns).
    pub bucket_excess_tolerance: f64,

    /// Starting guess `n0 = fraction · maxCapacity` for the capacity
    /// calibration.  0.3 works for the usual range of `shape`.
    pub calibration_start_fraction: f64,

    /// Sleep between ticks, for observers that render every snapshot.
    /// 0 disables the throttle.
    pub tick_delay_ms: u64,

    /// Log progress every N ticks (0 = never).
    pub progress_interval_ticks: u64,

    /// Publish a snapshot to observers every N ticks.  The final tick is
    /// always published.  0 disables snapshots.
    pub snapshot_interval_ticks: u64,

    /// How many of the most recent anomalies a run keeps in full.  Older
    /// ones are only counted.
    pub anomaly_history: usize,
}

impl CtmConfig {
    /// The last tick the engine may process.
    #[inline]
    pub fn max_tick(&self) -> Tick {
        Tick(self.max_ticks)
    }

    /// Reject values that would make the run meaningless.
    pub fn validate(&self) -> CtmResult<()> {
        if !(self.residual_tolerance >= 0.0) {
            return Err(CtmError::Config(format!(
                "residual_tolerance must be >= 0, got {}",
                self.residual_tolerance
            )));
        }
        if !(self.bucket_excess_tolerance >= 0.0 && self.bucket_excess_tolerance < 1.0) {
            return Err(CtmError::Config(format!(
                "bucket_excess_tolerance must be in [0, 1), got {}",
                self.bucket_excess_tolerance
            )));
        }
        if !(self.calibration_start_fraction > 0.0 && self.calibration_start_fraction < 1.0) {
            return Err(CtmError::Config(format!(
                "calibration_start_fraction must be in (0, 1), got {}",
                self.calibration_start_fraction
            )));
        }
        Ok(())
    }
}

impl Default for CtmConfig {
    fn default() -> Self {
        Self {
            max_ticks:                  9_999,
            residual_tolerance:         0.01,
            bucket_excess_tolerance:    0.01,
            calibration_start_fraction: 0.3,
            tick_delay_ms:              0,
            progress_interval_ticks:    100,
            snapshot_interval_ticks:    1,
            anomaly_history:            256,
        }
    }
}
