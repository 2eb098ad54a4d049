//! Pointer-free tree topologies
//!
//! A topology is pure index arithmetic: no node objects, no pointers.
//! Structure (node counts, depths, child/parent relations) is recovered
//! on demand from a node's dense breadth-first index.

mod complete;
mod recombining;

pub use complete::CompleteTopology;
pub use recombining::RecombiningTopology;

use crate::LatticeError;

/// Index arithmetic for one tree shape.
///
/// Implementations are value types carried as a compile-time generic
/// parameter of [`crate::Lattice`], so the hot index math is dispatched
/// statically.
pub trait Topology {
    /// Branching factor.
    fn branches(&self) -> u16;

    /// Total node count for a lattice of `height` levels (levels
    /// `0..height`).
    fn node_count(&self, height: u32) -> u64;

    /// Level of the node at `index`, recovered from the index alone.
    fn depth(&self, index: u64) -> u32;

    /// Dense index of the child reached from `index` under `branch`.
    ///
    /// Fails with [`LatticeError::InvalidBranch`] when
    /// `branch >= branches()`; never clamps.
    fn child_index(&self, index: u64, branch: u16) -> Result<u64, LatticeError>;

    /// Dense indices of all parents of `index`, in increasing order.
    ///
    /// Empty for the root; a single entry for non-recombined nodes; more
    /// where paths collapse onto the same state.
    fn parent_indices(&self, index: u64) -> Vec<u64>;
}
