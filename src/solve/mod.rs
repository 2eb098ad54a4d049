//! Generic scalar root finders
//!
//! Pure functions over closures, shared by nothing: safe to call from
//! independent threads on independent inputs. Calibration layers its own
//! retry/bracketing policy above these; the solvers themselves never
//! retry.

mod bisection;
mod newton;

pub use bisection::Bisection;
pub use newton::NewtonsMethod;

use thiserror::Error;

/// Failure modes of the scalar solvers.
///
/// Non-convergence is a reportable condition, not a crash; the caller
/// decides whether to rebracket, reguess, or abort.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    /// The target value is not bracketed by `[f(lower), f(upper)]`.
    #[error("target {target} not bracketed by f over [{lower}, {upper}]")]
    OutOfRange {
        /// Lower end of the attempted bracket.
        lower: f64,
        /// Upper end of the attempted bracket.
        upper: f64,
        /// Target value that was not bracketed.
        target: f64,
    },

    /// Iteration budget exhausted before convergence.
    #[error("no convergence after {iterations} iterations")]
    Exhausted {
        /// Iterations performed.
        iterations: u32,
    },

    /// Newton iterate with a vanishing derivative.
    #[error("derivative vanished at x = {x}")]
    DegenerateDerivative {
        /// Iterate at which `f'` was zero.
        x: f64,
    },
}
