//! Lattice node
//!
//! Identity, depth, and parent ids are fixed at creation; child ids are
//! never stored, they are recomputed from the topology on demand. The
//! state payload is the only field calibration mutates.

use std::fmt;

/// A node of the lattice, addressed by its dense breadth-first id.
#[derive(Debug, Clone, PartialEq)]
pub struct Node<S> {
    /// Dense breadth-first id, unique within the owning lattice.
    pub id: u64,

    /// Level in the lattice; 0 at the root.
    pub depth: u32,

    /// Ids of the parents: 0 (root), 1 (frontier), 2+ (recombined
    /// interior).
    pub parent_ids: Vec<u64>,

    /// Mutable payload owned exclusively by this node.
    pub state: S,
}

impl<S> Node<S> {
    /// Create a node with its immutable identity fields.
    pub fn new(id: u64, depth: u32, parent_ids: Vec<u64>, state: S) -> Self {
        Self {
            id,
            depth,
            parent_ids,
            state,
        }
    }

    /// The single node without parents.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent_ids.is_empty()
    }

    /// Reached by exactly one path.
    #[inline]
    pub fn is_frontier(&self) -> bool {
        self.parent_ids.len() == 1
    }

    /// Reached by recombining paths.
    #[inline]
    pub fn is_interior(&self) -> bool {
        self.parent_ids.len() >= 2
    }
}

impl<S> fmt::Display for Node<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} (level {})", self.id, self.depth)
    }
}
