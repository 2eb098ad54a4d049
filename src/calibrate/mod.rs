//! Short-rate moment matching
//!
//! Assigns every node a rate and every branch a probability so that the
//! lattice reproduces the conditional mean and variance of a discretized
//! mean-reverting short-rate process at each step:
//!
//! - mean:     p·r_up + (1−p)·r_down = μ = r + k·(θ − r)·Δt
//! - variance: p·(r_up−μ)² + (1−p)·(r_down−μ)² = σ²·Δt
//!
//! Per branch this is two equations in two unknowns, reduced to one
//! nonlinear equation by substituting p = (μ − r_known)/(r_x − r_known):
//! the sibling rate fixed by the adjacent, already-calibrated parent is
//! reused, which is what keeps the tree recombining instead of diverging
//! into 2^n distinct rates.

use tracing::debug;

use crate::lattice::{EdgeKey, Lattice};
use crate::solve::{Bisection, SolveError};
use crate::topology::{RecombiningTopology, Topology};
use crate::traversal::level_visit_order;
use crate::LatticeError;

use thiserror::Error;

/// Parameters of the mean-reverting short-rate model.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShortRateParams {
    /// Mean-reversion speed.
    pub k: f64,
    /// Long-run mean the rate reverts toward.
    pub theta: f64,
    /// Rate at the root.
    pub r0: f64,
    /// Step length in years.
    pub dt: f64,
    /// Annualized volatility.
    pub sigma: f64,
}

impl ShortRateParams {
    /// Validate the parameter set before calibration touches the lattice.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        let all_finite = [self.k, self.theta, self.r0, self.dt, self.sigma]
            .iter()
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(CalibrationError::InvalidParams {
                reason: "all parameters must be finite",
            });
        }
        if self.dt <= 0.0 {
            return Err(CalibrationError::InvalidParams {
                reason: "dt must be positive",
            });
        }
        if self.sigma <= 0.0 {
            return Err(CalibrationError::InvalidParams {
                reason: "sigma must be positive",
            });
        }
        Ok(())
    }

    /// Theoretical one-step drift from `rate`.
    #[inline]
    pub fn drift(&self, rate: f64) -> f64 {
        rate + self.k * (self.theta - rate) * self.dt
    }

    /// Target one-step variance σ²·Δt.
    #[inline]
    pub fn step_variance(&self) -> f64 {
        self.sigma * self.sigma * self.dt
    }

    /// One-step volatility σ·√Δt.
    #[inline]
    pub fn step_volatility(&self) -> f64 {
        self.sigma * self.dt.sqrt()
    }
}

/// Node payload for short-rate calibration.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RateState {
    /// Calibrated short rate at this node.
    pub rate: f64,
    /// Order in which the middle-out traversal visited this node.
    pub visit_order: u64,
}

/// Summary of a completed calibration pass.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CalibrationReport {
    /// Levels calibrated (including the two seeded levels).
    pub levels: u32,
    /// Bisection invocations across all branches.
    pub solver_calls: u64,
    /// Smallest rate anywhere in the lattice.
    pub min_rate: f64,
    /// Largest rate anywhere in the lattice.
    pub max_rate: f64,
}

/// Calibration failures.
///
/// A solver failure on any node aborts the whole pass: a partially
/// calibrated lattice is not safe to price against, so nothing is
/// substituted silently.
#[derive(Error, Debug)]
pub enum CalibrationError {
    /// Parameter set rejected before touching the lattice.
    #[error("invalid short-rate parameters: {reason}")]
    InvalidParams {
        /// Which validation failed.
        reason: &'static str,
    },

    /// The solve-up/solve-down scheme is derived for binary branching.
    #[error("calibration requires a binary lattice (got {branches} branches)")]
    UnsupportedBranching {
        /// Branch count of the offending lattice.
        branches: u16,
    },

    /// Traversal must have created the nodes first.
    #[error("lattice must be initialized by traversal before calibration")]
    NotBuilt,

    /// The root finder found no admissible rate for a node.
    #[error("no calibrated rate for node {node} at level {level}")]
    NonConvergence {
        /// Level whose calibration failed.
        level: u32,
        /// Node whose branch equation had no root.
        node: u64,
        /// Underlying solver failure.
        #[source]
        source: SolveError,
    },

    /// Structural failure from the lattice layer.
    #[error(transparent)]
    Lattice(#[from] LatticeError),
}

/// Which sibling of a pair is being solved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unknown {
    Upper,
    Lower,
}

/// Calibrate a binary recombining lattice in place.
///
/// Levels 0 and 1 are seeded from the deterministic drift formula (no
/// sibling exists yet to anchor against); every later level is processed
/// parent by parent in middle-out order, where the first parent seeds its
/// pair symmetrically about its drift and each subsequent parent solves
/// for its single unknown child via bisection.
pub fn calibrate(
    lattice: &mut Lattice<RateState, RecombiningTopology>,
    params: &ShortRateParams,
) -> Result<CalibrationReport, CalibrationError> {
    params.validate()?;
    if lattice.branches() != 2 {
        return Err(CalibrationError::UnsupportedBranching {
            branches: lattice.branches(),
        });
    }
    let height = lattice.height();
    if lattice.len() != lattice.topology().node_count(height) {
        return Err(CalibrationError::NotBuilt);
    }

    let mut report = CalibrationReport {
        levels: height,
        solver_calls: 0,
        min_rate: params.r0,
        max_rate: params.r0,
    };

    // Level 0: the root carries the initial rate as-is.
    lattice.node_mut(0)?.state.rate = params.r0;
    if height == 1 {
        return Ok(report);
    }

    // Level 1: symmetric pair about the root's drift; the mean equation
    // pins the branch probability (0.5 by symmetry).
    let vol = params.step_volatility();
    let mu0 = params.drift(params.r0);
    let (r_up, r_down) = (mu0 + vol, mu0 - vol);
    lattice.node_mut(1)?.state.rate = r_up;
    lattice.node_mut(2)?.state.rate = r_down;
    let p_up = (mu0 - r_down) / (r_up - r_down);
    lattice.edges_mut().set(EdgeKey::new(0, 1), p_up)?;
    lattice.edges_mut().set(EdgeKey::new(0, 2), 1.0 - p_up)?;
    track(&mut report, r_up);
    track(&mut report, r_down);

    // The variance residual grows away from the drift, so solve-up sees a
    // strictly increasing function of the unknown rate.
    let solve_up = Bisection::default().strictly_increasing();
    let solve_down = Bisection::default();

    for parent_level in 1..height - 1 {
        let parent_ids = lattice.levels()[parent_level as usize].clone();
        let child_start = lattice.levels()[parent_level as usize + 1][0];
        let child_width = lattice.levels()[parent_level as usize + 1].len();
        let mut fixed = vec![false; child_width];
        let mut seeded = false;

        for position in level_visit_order(parent_ids.len() as u64) {
            let parent_id = parent_ids[position as usize];
            let mu = params.drift(lattice.node(parent_id)?.state.rate);
            let up_id = lattice.topology().child_index(parent_id, 0)?;
            let down_id = lattice.topology().child_index(parent_id, 1)?;
            let up_slot = (up_id - child_start) as usize;
            let down_slot = (down_id - child_start) as usize;

            let (up_rate, down_rate, p_up) = match (fixed[up_slot], fixed[down_slot]) {
                (false, false) => {
                    // Only the first parent of a level has no anchored
                    // sibling; it seeds its pair symmetrically, which
                    // satisfies both moments exactly.
                    if seeded {
                        unreachable!("middle-out order leaves exactly one sibling fixed");
                    }
                    seeded = true;
                    (mu + vol, mu - vol, 0.5)
                }
                (false, true) => {
                    let known = lattice.node(down_id)?.state.rate;
                    let (rate, p) = solve_branch(
                        &solve_up, params, mu, known, Unknown::Upper,
                    )
                    .map_err(|source| CalibrationError::NonConvergence {
                        level: parent_level + 1,
                        node: up_id,
                        source,
                    })?;
                    report.solver_calls += 1;
                    (rate, known, p)
                }
                (true, false) => {
                    let known = lattice.node(up_id)?.state.rate;
                    let (rate, p) = solve_branch(
                        &solve_down, params, mu, known, Unknown::Lower,
                    )
                    .map_err(|source| CalibrationError::NonConvergence {
                        level: parent_level + 1,
                        node: down_id,
                        source,
                    })?;
                    report.solver_calls += 1;
                    (known, rate, 1.0 - p)
                }
                (true, true) => {
                    unreachable!("middle-out order never revisits a fully fixed pair")
                }
            };

            lattice.node_mut(up_id)?.state.rate = up_rate;
            lattice.node_mut(down_id)?.state.rate = down_rate;
            fixed[up_slot] = true;
            fixed[down_slot] = true;
            lattice.edges_mut().set(EdgeKey::new(parent_id, up_id), p_up)?;
            lattice
                .edges_mut()
                .set(EdgeKey::new(parent_id, down_id), 1.0 - p_up)?;
            track(&mut report, up_rate);
            track(&mut report, down_rate);
        }

        debug!(
            level = parent_level + 1,
            solver_calls = report.solver_calls,
            "level calibrated"
        );
    }

    Ok(report)
}

/// Solve the reduced one-unknown branch equation.
///
/// With the sibling rate fixed, the probability of the unknown branch is
/// p = (μ − r_known)/(r_x − r_known) and the variance constraint becomes
/// p·(r_x−μ)² + (1−p)·(r_known−μ)² = σ²·Δt, solved for r_x by bisection.
/// The bracket starts one step-volatility wide on the unknown's side of
/// the drift and doubles until the residual changes sign; growing the
/// bracket is this caller's policy, not the solver's.
///
/// Returns the solved rate and the unknown branch's probability.
fn solve_branch(
    solver: &Bisection,
    params: &ShortRateParams,
    mu: f64,
    r_known: f64,
    unknown: Unknown,
) -> Result<(f64, f64), SolveError> {
    // The anchored sibling must sit on the far side of the drift or the
    // variance equation has no admissible root.
    let anchored = match unknown {
        Unknown::Upper => r_known < mu,
        Unknown::Lower => r_known > mu,
    };
    if !anchored {
        return Err(SolveError::OutOfRange {
            lower: mu,
            upper: r_known,
            target: 0.0,
        });
    }

    let variance = params.step_variance();
    let residual = |r_x: f64| {
        let p = (mu - r_known) / (r_x - r_known);
        p * (r_x - mu) * (r_x - mu) + (1.0 - p) * (r_known - mu) * (r_known - mu) - variance
    };

    let mut span = params.step_volatility();
    let far = |span: f64| match unknown {
        Unknown::Upper => mu + span,
        Unknown::Lower => mu - span,
    };
    let mut doublings = 0;
    while residual(far(span)) < 0.0 && doublings < 64 {
        span *= 2.0;
        doublings += 1;
    }

    let rate = match unknown {
        Unknown::Upper => solver.solve(residual, mu, far(span), 0.0)?,
        Unknown::Lower => solver.solve(residual, far(span), mu, 0.0)?,
    };
    let probability = (mu - r_known) / (rate - r_known);
    Ok((rate, probability))
}

fn track(report: &mut CalibrationReport, rate: f64) {
    report.min_rate = report.min_rate.min(rate);
    report.max_rate = report.max_rate.max(rate);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traversal::middle_out;

    fn params() -> ShortRateParams {
        ShortRateParams {
            k: 0.025,
            theta: 0.15339,
            r0: 0.05121,
            dt: 1.0 / 12.0,
            sigma: 0.0126,
        }
    }

    fn built(height: u32) -> Lattice<RateState, RecombiningTopology> {
        let mut lattice: Lattice<RateState, RecombiningTopology> =
            Lattice::new(RecombiningTopology::new(2).unwrap(), height).unwrap();
        middle_out(&mut lattice, |visit, node| {
            node.state.visit_order = visit.order;
        })
        .unwrap();
        lattice
    }

    #[test]
    fn rejects_non_positive_dt_and_sigma() {
        let mut bad = params();
        bad.dt = 0.0;
        assert!(matches!(
            bad.validate(),
            Err(CalibrationError::InvalidParams { .. })
        ));
        let mut bad = params();
        bad.sigma = -0.1;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn rejects_trinomial_lattices() {
        let mut lattice: Lattice<RateState, _> =
            Lattice::new(RecombiningTopology::new(3).unwrap(), 4).unwrap();
        middle_out(&mut lattice, |_, _| {}).unwrap();
        assert!(matches!(
            calibrate(&mut lattice, &params()),
            Err(CalibrationError::UnsupportedBranching { branches: 3 })
        ));
    }

    #[test]
    fn rejects_unbuilt_lattices() {
        let mut lattice: Lattice<RateState, _> =
            Lattice::new(RecombiningTopology::new(2).unwrap(), 4).unwrap();
        assert!(matches!(
            calibrate(&mut lattice, &params()),
            Err(CalibrationError::NotBuilt)
        ));
    }

    #[test]
    fn level_one_is_seeded_from_the_drift() {
        let mut lattice = built(3);
        calibrate(&mut lattice, &params()).unwrap();

        let p = params();
        let mu0 = p.drift(p.r0);
        let vol = p.step_volatility();
        assert!((lattice[1].state.rate - (mu0 + vol)).abs() < 1e-15);
        assert!((lattice[2].state.rate - (mu0 - vol)).abs() < 1e-15);

        let p_up = lattice.edges().probability(0, 1).unwrap();
        assert!((p_up - 0.5).abs() < 1e-12);
    }

    #[test]
    fn solve_branch_matches_both_moments() {
        let p = params();
        let mu = p.drift(p.r0);
        let r_known = mu - p.step_volatility();
        let solver = Bisection::default().strictly_increasing();

        let (r_up, prob) =
            solve_branch(&solver, &p, mu, r_known, Unknown::Upper).unwrap();

        let mean = prob * r_up + (1.0 - prob) * r_known;
        let var = prob * (r_up - mu).powi(2) + (1.0 - prob) * (r_known - mu).powi(2);
        assert!((mean - mu).abs() < 1e-9);
        assert!((var - p.step_variance()).abs() < 1e-9);
    }

    #[test]
    fn misanchored_sibling_is_rejected() {
        let p = params();
        let mu = p.drift(p.r0);
        let solver = Bisection::default();
        // An "anchor" above the drift cannot anchor an upper unknown.
        let err = solve_branch(&solver, &p, mu, mu + 0.01, Unknown::Upper).unwrap_err();
        assert!(matches!(err, SolveError::OutOfRange { .. }));
    }
}
