//! Bisection solver
//!
//! Halves a bracketing interval until `|f(mid) − target| < tolerance`.
//! Requires a genuine bracket up front and reports exhaustion instead of
//! looping forever; no step of the search evaluates `f` outside the
//! initial interval.

use super::SolveError;

/// Bracketing bisection with a fixed tolerance and iteration budget.
#[derive(Debug, Clone, Copy)]
pub struct Bisection {
    /// Residual tolerance on `|f(mid) − target|`.
    pub tolerance: f64,
    /// Maximum number of halvings before giving up.
    pub max_iterations: u32,
    /// Verify `f(lower) <= target <= f(upper)` before bisecting.
    ///
    /// For callers that know their function is strictly monotonically
    /// increasing, this fails fast on an ill-posed bracket instead of
    /// bisecting a function that leaves the interval.
    pub strictly_increasing: bool,
}

impl Default for Bisection {
    fn default() -> Self {
        Self {
            tolerance: 1e-12,
            max_iterations: 200,
            strictly_increasing: false,
        }
    }
}

impl Bisection {
    /// Solver with the given tolerance and iteration budget.
    pub fn new(tolerance: f64, max_iterations: u32) -> Self {
        Self {
            tolerance,
            max_iterations,
            strictly_increasing: false,
        }
    }

    /// Require the strictly-increasing boundary check.
    pub fn strictly_increasing(mut self) -> Self {
        self.strictly_increasing = true;
        self
    }

    /// Find `x ∈ [lower, upper]` with `f(x) = target`.
    ///
    /// Fails with [`SolveError::OutOfRange`] when the boundary values do
    /// not bracket the target, and with [`SolveError::Exhausted`] when
    /// the iteration budget runs out first.
    pub fn solve<F>(&self, f: F, lower: f64, upper: f64, target: f64) -> Result<f64, SolveError>
    where
        F: Fn(f64) -> f64,
    {
        let out_of_range = SolveError::OutOfRange {
            lower,
            upper,
            target,
        };

        let mut lo = lower;
        let mut hi = upper;
        let mut f_lo = f(lo) - target;
        let f_hi = f(hi) - target;

        if self.strictly_increasing && (f_lo > 0.0 || f_hi < 0.0) {
            return Err(out_of_range);
        }
        if f_lo.abs() < self.tolerance {
            return Ok(lo);
        }
        if f_hi.abs() < self.tolerance {
            return Ok(hi);
        }
        if f_lo * f_hi > 0.0 {
            return Err(out_of_range);
        }

        for _ in 0..self.max_iterations {
            let mid = 0.5 * (lo + hi);
            let f_mid = f(mid) - target;
            if f_mid.abs() < self.tolerance {
                return Ok(mid);
            }
            // Keep the half that still brackets the sign change.
            if (f_mid < 0.0) == (f_lo < 0.0) {
                lo = mid;
                f_lo = f_mid;
            } else {
                hi = mid;
            }
        }

        Err(SolveError::Exhausted {
            iterations: self.max_iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_square_root() {
        let solver = Bisection::new(1e-10, 200);
        let root = solver.solve(|x| x * x, 0.0, 3.0, 2.0).unwrap();
        assert!((root - 2f64.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn handles_decreasing_functions() {
        let solver = Bisection::default();
        let root = solver.solve(|x| -x, -5.0, 5.0, -1.5).unwrap();
        assert!((root - 1.5).abs() < 1e-9);
    }

    #[test]
    fn unbracketed_target_is_out_of_range() {
        let solver = Bisection::default();
        let err = solver.solve(|x| x, 0.0, 1.0, 5.0).unwrap_err();
        assert!(matches!(err, SolveError::OutOfRange { .. }));
    }

    #[test]
    fn strictly_increasing_rejects_reversed_bracket() {
        // f is decreasing, so a caller claiming monotone increase fails
        // fast even though the interval brackets the target.
        let strict = Bisection::default().strictly_increasing();
        let err = strict.solve(|x| -x, -5.0, 5.0, 0.0).unwrap_err();
        assert!(matches!(err, SolveError::OutOfRange { .. }));

        let lax = Bisection::default();
        assert!(lax.solve(|x| -x, -5.0, 5.0, 0.0).is_ok());
    }

    #[test]
    fn exhaustion_is_reported_not_looped() {
        let solver = Bisection::new(1e-30, 8);
        let err = solver.solve(|x| x * x * x, 1.0, 2.0, 5.0).unwrap_err();
        assert_eq!(err, SolveError::Exhausted { iterations: 8 });
    }

    #[test]
    fn boundary_hit_returns_immediately() {
        let solver = Bisection::default();
        let root = solver.solve(|x| x, 1.0, 2.0, 1.0).unwrap();
        assert_eq!(root, 1.0);
    }
}
