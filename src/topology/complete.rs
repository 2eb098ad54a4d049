//! Complete k-ary topology (no recombination)
//!
//! Level l holds b^l nodes; a lattice of height H holds the geometric
//! series (b^H − 1)/(b − 1). Children of index i sit at i·b + 1 + m,
//! the unique parent at (i − 1)/b.

use crate::LatticeError;

use super::Topology;

/// Complete k-ary tree addressed by dense breadth-first index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompleteTopology {
    branches: u16,
}

impl CompleteTopology {
    /// Create a complete topology with the given branching factor.
    ///
    /// The geometric-series closed form needs `branches >= 2`.
    pub fn new(branches: u16) -> Result<Self, LatticeError> {
        if branches < 2 {
            return Err(LatticeError::UnsupportedTopology { branches });
        }
        Ok(Self { branches })
    }

    /// Index of the first node at `level` (= node count below it).
    #[inline]
    fn level_offset(&self, level: u32) -> u64 {
        let b = u64::from(self.branches);
        (b.pow(level) - 1) / (b - 1)
    }
}

impl Topology for CompleteTopology {
    fn branches(&self) -> u16 {
        self.branches
    }

    fn node_count(&self, height: u32) -> u64 {
        self.level_offset(height)
    }

    fn depth(&self, index: u64) -> u32 {
        // Largest d with (b^d - 1)/(b - 1) <= index. Heights are tens of
        // levels, so a linear scan beats getting float logs exactly right.
        let mut d = 0;
        while self.level_offset(d + 1) <= index {
            d += 1;
        }
        d
    }

    fn child_index(&self, index: u64, branch: u16) -> Result<u64, LatticeError> {
        if branch >= self.branches {
            return Err(LatticeError::InvalidBranch {
                branch,
                branches: self.branches,
            });
        }
        Ok(index * u64::from(self.branches) + 1 + u64::from(branch))
    }

    fn parent_indices(&self, index: u64) -> Vec<u64> {
        if index == 0 {
            return Vec::new();
        }
        vec![(index - 1) / u64::from(self.branches)]
    }
}
