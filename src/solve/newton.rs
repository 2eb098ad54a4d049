//! Newton's method
//!
//! Classic update x ← x − f(x)/f'(x), with two deliberate strictness
//! choices: a vanishing derivative aborts immediately, and convergence
//! requires both the residual and the step to fall under the tolerance
//! (a small residual with a large pending step is not converged).

use super::SolveError;

/// Newton–Raphson iteration with a fixed tolerance and budget.
#[derive(Debug, Clone, Copy)]
pub struct NewtonsMethod {
    /// Tolerance applied to both `|f(x)|` and `|f(x)/f'(x)|`.
    pub tolerance: f64,
    /// Maximum number of updates before giving up.
    pub max_iterations: u32,
}

impl Default for NewtonsMethod {
    fn default() -> Self {
        Self {
            tolerance: 1e-12,
            max_iterations: 100,
        }
    }
}

impl NewtonsMethod {
    /// Solver with the given tolerance and iteration budget.
    pub fn new(tolerance: f64, max_iterations: u32) -> Self {
        Self {
            tolerance,
            max_iterations,
        }
    }

    /// Find a root of `f` starting from `guess`, using derivative `df`.
    pub fn solve<F, D>(&self, f: F, df: D, guess: f64) -> Result<f64, SolveError>
    where
        F: Fn(f64) -> f64,
        D: Fn(f64) -> f64,
    {
        let mut x = guess;

        for _ in 0..self.max_iterations {
            let fx = f(x);
            let dfx = df(x);
            if dfx == 0.0 {
                return Err(SolveError::DegenerateDerivative { x });
            }

            let step = fx / dfx;
            if fx.abs() < self.tolerance && step.abs() < self.tolerance {
                return Ok(x);
            }
            x -= step;
        }

        Err(SolveError::Exhausted {
            iterations: self.max_iterations,
        })
    }
}
