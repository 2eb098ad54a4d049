//! # Pointer-free lattice engine with moment-matching calibration
//!
//! This library builds discrete-time lattices (recombining and complete
//! trees) without storing a single pointer: every structural relation is
//! recovered from dense integer index arithmetic.
//!
//! ## Core pipeline
//!
//! 1. **Topology strategy**: closed-form index math per tree shape
//!    (node counts, index ↔ depth, child/parent formulas)
//! 2. **Middle-out traversal**: level-synchronous walk that classifies
//!    every node into one of six structural roles and seeds equal-split
//!    edge probabilities
//! 3. **Root finding**: generic scalar bisection / Newton solvers
//! 4. **Calibration**: per-branch moment matching against a
//!    mean-reverting short-rate model
//!
//! Result: a lattice whose conditional mean and variance match the target
//! process at every step, sharing recombined nodes so the state count
//! stays polynomial in the height.
//!
//! ## Usage Example
//!
//! ```
//! use trellis::{build_calibrated, ShortRateParams};
//!
//! let params = ShortRateParams {
//!     k: 0.025,
//!     theta: 0.15339,
//!     r0: 0.05121,
//!     dt: 1.0 / 12.0,
//!     sigma: 0.0126,
//! };
//! let (lattice, report) = build_calibrated(7, &params).unwrap();
//! assert_eq!(lattice.len(), 7 * 8 / 2);
//! assert_eq!(report.levels, 7);
//! ```

#![warn(missing_docs, missing_debug_implementations)]
#![allow(clippy::new_without_default)]

// Core modules - each implements one stage of the pipeline
pub mod calibrate; // Short-rate moment matching
pub mod lattice; // Node / Lattice / EdgeStore data model
pub mod solve; // Scalar root finders
pub mod topology; // Pure index arithmetic per tree shape
pub mod traversal; // Middle-out level-synchronous walk

// Re-exports for convenience
pub use calibrate::{calibrate, CalibrationError, CalibrationReport, RateState, ShortRateParams};
pub use lattice::{EdgeKey, EdgeStore, Lattice, Node};
pub use solve::{Bisection, NewtonsMethod, SolveError};
pub use topology::{CompleteTopology, RecombiningTopology, Topology};
pub use traversal::{middle_out, Role, Visit};

use thiserror::Error;

/// Structural and configuration errors raised by the lattice core.
///
/// Configuration errors fail at the point of the offending call; nothing
/// is clamped or deferred.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LatticeError {
    /// Branch count not supported by the chosen topology strategy.
    #[error("unsupported topology: {branches} branches")]
    UnsupportedTopology {
        /// Offending branch count.
        branches: u16,
    },

    /// Branch selector outside `[0, branches)`.
    #[error("branch {branch} out of range for a {branches}-branch topology")]
    InvalidBranch {
        /// Offending branch selector.
        branch: u16,
        /// Branch count of the topology.
        branches: u16,
    },

    /// Node id outside the lattice's dense id space.
    #[error("node id {id} out of range for a lattice of {len} nodes")]
    IndexOutOfRange {
        /// Requested node id.
        id: u64,
        /// Number of nodes owned by the lattice.
        len: u64,
    },

    /// Lattice height must cover at least the root level.
    #[error("lattice height must be at least 1 (got {height})")]
    InvalidHeight {
        /// Offending height.
        height: u32,
    },

    /// Edge probabilities live in `[0, 1]`.
    #[error("edge probability {value} outside [0, 1]")]
    InvalidProbability {
        /// Offending probability value.
        value: f64,
    },

    /// Traversal initializes a lattice exactly once.
    #[error("lattice already built: traversal runs once per lattice")]
    AlreadyBuilt,
}

/// Build and calibrate a binary recombining short-rate lattice.
///
/// This is the main entry point that orchestrates:
/// 1. Topology validation and lattice construction
/// 2. Middle-out traversal (node creation, visitation order,
///    equal-split placeholder probabilities)
/// 3. Level-by-level moment-matching calibration
pub fn build_calibrated(
    height: u32,
    params: &ShortRateParams,
) -> Result<(Lattice<RateState, RecombiningTopology>, CalibrationReport), CalibrationError> {
    let topology = RecombiningTopology::new(2)?;
    let mut lattice: Lattice<RateState, _> = Lattice::new(topology, height)?;

    middle_out(&mut lattice, |visit, node| {
        node.state.visit_order = visit.order;
    })?;

    let report = calibrate(&mut lattice, params)?;
    Ok((lattice, report))
}
