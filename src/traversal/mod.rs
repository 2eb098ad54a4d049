//! Middle-out level-synchronous traversal
//!
//! Visits every level exactly once: the unpaired middle node first (odd
//! level widths only), interior pairs moving outward, the single-parent
//! frontier pair last. Each node is classified into a structural [`Role`]
//! and stamped with a strictly increasing visitation order, and every
//! discovered parent→child edge is registered with the equal-split
//! placeholder probability 1/branches.
//!
//! The walk is oblivious to the calibration domain: it works for any
//! state payload and any topology.

use std::cmp::Ordering;

use tracing::trace;

use crate::lattice::{EdgeKey, Lattice, Node};
use crate::topology::Topology;
use crate::LatticeError;

/// Structural role of a node within its level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The single parentless node at level 0.
    Root,
    /// Unpaired node at the exact middle of an odd-width level.
    Middle,
    /// Upper half of an interior pair (recombined).
    UpperInterior,
    /// Lower half of an interior pair (recombined).
    LowerInterior,
    /// Upper outer edge of the level, reached by one path.
    UpperFrontier,
    /// Lower outer edge of the level, reached by one path.
    LowerFrontier,
}

/// One entry of the recorded visitation sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visit {
    /// Id of the visited node.
    pub id: u64,
    /// Structural role assigned during the visit.
    pub role: Role,
    /// Strictly increasing global visitation order, starting at 0.
    pub order: u64,
}

/// Middle-out position order within a level of the given width.
///
/// Middle (or innermost pair) first, pairs moving outward, the extreme
/// pair last. Upper position before lower within each pair.
pub(crate) fn level_visit_order(width: u64) -> Vec<u64> {
    if width == 1 {
        return vec![0];
    }
    let mut order = Vec::with_capacity(width as usize);
    if width % 2 == 1 {
        let mid = width / 2;
        order.push(mid);
        for k in 1..=mid {
            order.push(mid - k);
            order.push(mid + k);
        }
    } else {
        let upper_mid = width / 2 - 1;
        for k in 0..width / 2 {
            order.push(upper_mid - k);
            order.push(upper_mid + 1 + k);
        }
    }
    order
}

/// Classify a node's structural role from its parent count combined with
/// its level position.
///
/// A single parent marks a frontier node wherever it sits: the level's
/// extremes always, and every node of a non-recombining shape. Middle and
/// interior roles are reserved for recombined nodes. The six cases are
/// exhaustive for every (level, width, position, parents) a topology can
/// produce; anything else is a programming error, not a recoverable
/// condition.
fn classify(level: u32, position: u64, width: u64, parents: usize) -> Role {
    if level == 0 {
        return Role::Root;
    }
    if position == 0 {
        return Role::UpperFrontier;
    }
    if position == width - 1 {
        return Role::LowerFrontier;
    }
    if parents == 1 {
        // Reached by one path despite an inner position: no recombination
        // happens here, so the node is frontier-like on its half.
        return if position < width / 2 {
            Role::UpperFrontier
        } else {
            Role::LowerFrontier
        };
    }
    match position.cmp(&(width / 2)) {
        Ordering::Less => Role::UpperInterior,
        Ordering::Equal if width % 2 == 1 => Role::Middle,
        Ordering::Equal | Ordering::Greater => Role::LowerInterior,
    }
}

/// Initialize a lattice with one middle-out pass.
///
/// Creates every node (ids dense breadth-first, parents from the
/// topology), builds the per-level index, registers every incoming edge
/// with the equal-split placeholder, and invokes `init` once per node in
/// visitation order. Returns the recorded visitation sequence.
///
/// Guarantees: every node is visited exactly once, and only after the
/// level holding all of its parents has been visited.
pub fn middle_out<S, T, F>(
    lattice: &mut Lattice<S, T>,
    mut init: F,
) -> Result<Vec<Visit>, LatticeError>
where
    S: Default,
    T: Topology,
    F: FnMut(&Visit, &mut Node<S>),
{
    if !lattice.is_empty() {
        return Err(LatticeError::AlreadyBuilt);
    }

    let height = lattice.height();
    let branches = lattice.branches();
    let equal_split = 1.0 / f64::from(branches);

    let mut visits = Vec::with_capacity(lattice.topology().node_count(height) as usize);
    let mut order = 0u64;

    for level in 0..height {
        let start = lattice.topology().node_count(level);
        let width = lattice.topology().node_count(level + 1) - start;
        trace!(level, width, "initializing level");

        // Materialize the level in id order; ids are pure arithmetic, so
        // creation order and visitation order are independent.
        let mut ids = Vec::with_capacity(width as usize);
        for id in start..start + width {
            let parents = lattice.topology().parent_indices(id);
            debug_assert!(parents.len() <= usize::from(branches));
            debug_assert_eq!(lattice.topology().depth(id), level);
            lattice.push_node(Node::new(id, level, parents, S::default()));
            ids.push(id);
        }
        lattice.push_level(ids);

        for position in level_visit_order(width) {
            let id = start + position;
            let parents = lattice.node(id)?.parent_ids.clone();
            let role = classify(level, position, width, parents.len());
            let visit = Visit { id, role, order };
            order += 1;

            for parent in parents {
                lattice.edges_mut().set(EdgeKey::new(parent, id), equal_split)?;
            }

            init(&visit, lattice.node_mut(id)?);
            visits.push(visit);
        }
    }

    Ok(visits)
}
