//! Exponential speed–density fundamental diagram and its capacity calibration.
//!
//! For a cell of area `A`, jam population `N = A·kc` and shape `γ`, the
//! normalised speed at population `n` is
//!
//! ```text
//! v(n) = 1 − exp(−γ·A·(1/n − 1/N))
//! ```
//!
//! and the flow is `q(n) = n·v(n)`.  The flow peaks at `nmax` with value
//! `Qmax`.  There is no closed form for the peak; [`FundamentalDiagram::calibrate`]
//! expands the optimality condition to second order around a starting guess
//! `n0 = f·N` and keeps the positive root of the resulting quadratic in
//! `x = γ·A / n`.

/// The starting fraction was unsuitable for the cell's parameters: the
/// quadratic produced a non-positive, infinite or NaN optimum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationFailure {
    pub nmax: f64,
    pub qmax: f64,
}

/// Calibrated capacity parameters of one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FundamentalDiagram {
    /// γ: steepness of the speed drop with density.
    pub shape: f64,
    /// Cell area (deltaL²).
    pub area: f64,
    /// Jam population `N = area · kc`.
    pub max_capacity: f64,
    /// Population at the flow optimum.
    pub nmax: f64,
    /// Flow at the optimum.
    pub qmax: f64,
}

impl FundamentalDiagram {
    /// Solve for `nmax` / `Qmax`.
    ///
    /// Deterministic: identical inputs always produce bit-identical output.
    pub fn calibrate(
        shape:          f64,
        area:           f64,
        max_capacity:   f64,
        start_fraction: f64,
    ) -> Result<Self, CalibrationFailure> {
        let ga = shape * area;
        let x0 = ga / (start_fraction * max_capacity);
        let xn = ga / max_capacity;

        let e = (xn - x0).exp();
        let a = 0.5 * (1.0 - x0) * e;
        let b = x0 * x0 * e;
        let c = 1.0 - (1.0 + x0 + 0.5 * x0 * x0 + 0.5 * x0 * x0 * x0) * e;

        // The negative root has no physical meaning.
        let xopt = (-b + (b * b - 4.0 * a * c).sqrt()) / (2.0 * a);

        let nmax = ga / xopt;
        let qmax = nmax * (1.0 - (-ga * (1.0 / nmax - 1.0 / max_capacity)).exp());

        let valid = |v: f64| v > 0.0 && v.is_finite();
        if !valid(nmax) || !valid(qmax) {
            return Err(CalibrationFailure { nmax, qmax });
        }

        Ok(Self { shape, area, max_capacity, nmax, qmax })
    }

    /// Flow at population `n`; zero for an empty or jammed cell.
    pub fn flow(&self, n: f64) -> f64 {
        if n > 0.0 && n < self.max_capacity {
            n * self.speed_term(n)
        } else {
            0.0
        }
    }

    /// Outflow cap: the actual flow below the optimum, `Qmax` at or above it.
    pub fn sending_capacity(&self, n: f64) -> f64 {
        if n < self.nmax { self.flow(n) } else { self.qmax }
    }

    /// Inflow cap before clamping.
    ///
    /// Negative when the cell already holds more than `max_capacity`; the
    /// caller reports that and clamps to zero.
    pub fn raw_receiving_capacity(&self, n: f64, delta: f64) -> f64 {
        let flow = if n > self.nmax { self.flow(n) } else { self.qmax };
        flow.min(delta * (self.max_capacity - n))
    }

    /// Normalised walking speed; free flow for an empty cell.
    ///
    /// Negative above `max_capacity`.  Route choice uses this value as is.
    pub fn speed(&self, n: f64) -> f64 {
        if n <= 0.0 {
            return 1.0;
        }
        self.speed_term(n)
    }

    /// [`speed`](Self::speed) floored at 0, as published in snapshots.
    pub fn reported_speed(&self, n: f64) -> f64 {
        self.speed(n).max(0.0)
    }

    #[inline]
    fn speed_term(&self, n: f64) -> f64 {
        1.0 - (-self.shape * self.area * (1.0 / n - 1.0 / self.max_capacity)).exp()
    }
}
