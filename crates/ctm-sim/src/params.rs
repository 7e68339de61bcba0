//! Parameter reconfiguration for calibration loops.

use crate::{SimError, SimResult};

/// The five tunable model parameters.
///
/// External calibration tools pass them as a flat vector in the order
/// `[free_flow_speed, shape, critical_density, alpha, beta]`; see
/// [`Parameters::from_slice`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Parameters {
    /// Free-flow walking speed `vf`.  One tick lasts `deltaL / vf` seconds,
    /// so this is the inverse of the cell-length time scale.
    pub free_flow_speed:  f64,
    /// γ applied to every cell.
    pub shape:            f64,
    /// kc applied to every cell.
    pub critical_density: f64,
    pub alpha:            f64,
    pub beta:             f64,
}

impl Parameters {
    /// Parse the flat calibration vector.
    pub fn from_slice(x: &[f64]) -> SimResult<Self> {
        let [free_flow_speed, shape, critical_density, alpha, beta] = x else {
            return Err(SimError::Parameters(format!(
                "expected 5 values [vf, shape, kc, alpha, beta], got {}",
                x.len()
            )));
        };
        let p = Self {
            free_flow_speed:  *free_flow_speed,
            shape:            *shape,
            critical_density: *critical_density,
            alpha:            *alpha,
            beta:             *beta,
        };
        p.validate()?;
        Ok(p)
    }

    pub fn validate(&self) -> SimResult<()> {
        if !(self.free_flow_speed > 0.0 && self.free_flow_speed.is_finite()) {
            return Err(SimError::Parameters(format!(
                "free-flow speed must be positive, got {}",
                self.free_flow_speed
            )));
        }
        if !(self.critical_density > 0.0 && self.critical_density.is_finite()) {
            return Err(SimError::Parameters(format!(
                "critical density must be positive, got {}",
                self.critical_density
            )));
        }
        if !self.alpha.is_finite() || !self.beta.is_finite() || !self.shape.is_finite() {
            return Err(SimError::Parameters("shape, alpha and beta must be finite".into()));
        }
        Ok(())
    }
}
