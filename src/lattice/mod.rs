//! Lattice data model
//!
//! The lattice owns a dense array of nodes, the per-level id index, and
//! the edge store; all structural questions are delegated to the
//! topology. Nodes are created by the middle-out traversal, state values
//! and probabilities are finalized by calibration, and the lattice is
//! immutable (and freely shareable) afterwards.

mod edge;
mod node;

pub use edge::{EdgeKey, EdgeStore};
pub use node::Node;

use std::ops::Index;

use crate::topology::Topology;
use crate::LatticeError;

/// Pointer-free tree of `Node<S>` values under a topology strategy `T`.
#[derive(Debug, Clone)]
pub struct Lattice<S, T: Topology> {
    topology: T,
    height: u32,
    nodes: Vec<Node<S>>,
    levels: Vec<Vec<u64>>,
    edges: EdgeStore,
}

impl<S, T: Topology> Lattice<S, T> {
    /// Create an empty lattice for the given topology and height.
    ///
    /// Invalid configurations fail here, not lazily: the topology has
    /// already vetted its branch count, and a lattice needs at least the
    /// root level.
    pub fn new(topology: T, height: u32) -> Result<Self, LatticeError> {
        if height == 0 {
            return Err(LatticeError::InvalidHeight { height });
        }
        let capacity = topology.node_count(height) as usize;
        Ok(Self {
            topology,
            height,
            nodes: Vec::with_capacity(capacity),
            levels: Vec::with_capacity(height as usize),
            edges: EdgeStore::new(),
        })
    }

    /// The topology strategy.
    pub fn topology(&self) -> &T {
        &self.topology
    }

    /// Branching factor, forwarded from the topology.
    pub fn branches(&self) -> u16 {
        self.topology.branches()
    }

    /// Number of levels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of nodes created so far.
    pub fn len(&self) -> u64 {
        self.nodes.len() as u64
    }

    /// True before traversal has created any node.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Bounds-checked shared access to a node.
    pub fn node(&self, id: u64) -> Result<&Node<S>, LatticeError> {
        self.nodes
            .get(id as usize)
            .ok_or(LatticeError::IndexOutOfRange {
                id,
                len: self.len(),
            })
    }

    /// Bounds-checked exclusive access to a node.
    pub fn node_mut(&mut self, id: u64) -> Result<&mut Node<S>, LatticeError> {
        let len = self.len();
        self.nodes
            .get_mut(id as usize)
            .ok_or(LatticeError::IndexOutOfRange { id, len })
    }

    /// Node ids per level, in increasing id order; built once by the
    /// traversal and never mutated afterwards.
    pub fn levels(&self) -> &[Vec<u64>] {
        &self.levels
    }

    /// The transition probabilities.
    pub fn edges(&self) -> &EdgeStore {
        &self.edges
    }

    /// Exclusive access to the transition probabilities (traversal and
    /// calibration only).
    pub fn edges_mut(&mut self) -> &mut EdgeStore {
        &mut self.edges
    }

    /// Child ids of `id`, derived from the topology and clipped to the
    /// lattice's height (the last level has no children).
    pub fn child_ids(&self, id: u64) -> Result<Vec<u64>, LatticeError> {
        let node = self.node(id)?;
        if node.depth + 1 >= self.height {
            return Ok(Vec::new());
        }
        let mut children = Vec::with_capacity(usize::from(self.branches()));
        for branch in 0..self.branches() {
            children.push(self.topology.child_index(id, branch)?);
        }
        Ok(children)
    }

    /// Append a node created by the traversal. Ids are dense, so nodes
    /// arrive in id order.
    pub(crate) fn push_node(&mut self, node: Node<S>) {
        debug_assert_eq!(node.id, self.len(), "ids are dense and sequential");
        self.nodes.push(node);
    }

    /// Record the id range of a completed level.
    pub(crate) fn push_level(&mut self, ids: Vec<u64>) {
        self.levels.push(ids);
    }
}

impl<S, T: Topology> Index<u64> for Lattice<S, T> {
    type Output = Node<S>;

    fn index(&self, id: u64) -> &Self::Output {
        match self.node(id) {
            Ok(node) => node,
            Err(err) => panic!("{err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::RecombiningTopology;

    fn empty_lattice(height: u32) -> Lattice<(), RecombiningTopology> {
        Lattice::new(RecombiningTopology::new(2).unwrap(), height).unwrap()
    }

    #[test]
    fn zero_height_fails_at_construction() {
        let topo = RecombiningTopology::new(2).unwrap();
        assert_eq!(
            Lattice::<(), _>::new(topo, 0).err(),
            Some(LatticeError::InvalidHeight { height: 0 })
        );
    }

    #[test]
    fn node_access_is_bounds_checked() {
        let lattice = empty_lattice(4);
        assert_eq!(
            lattice.node(7).err(),
            Some(LatticeError::IndexOutOfRange { id: 7, len: 0 })
        );
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn indexer_panics_through_the_checked_path() {
        let lattice = empty_lattice(4);
        let _ = &lattice[99];
    }
}
