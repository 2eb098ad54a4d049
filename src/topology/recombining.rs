//! Recombining topology (binomial / trinomial)
//!
//! Paths that reach the same state collapse onto one node, so level l
//! holds only (b−1)·l + 1 nodes. For b = 2 the dense layout is the
//! triangular numbers (a height-H lattice holds H·(H+1)/2 nodes); for
//! b = 3 it is the squares (H² nodes). Depth is recovered from the index
//! by the closed-form inverse of the respective layout.
//!
//! The closed forms are derived per branching factor and do not
//! generalize without re-derivation, hence only b ∈ {2, 3}.

use crate::LatticeError;

use super::Topology;

/// Recombining lattice addressed by dense breadth-first index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecombiningTopology {
    branches: u16,
}

impl RecombiningTopology {
    /// Create a recombining topology; only 2 or 3 branches are supported.
    pub fn new(branches: u16) -> Result<Self, LatticeError> {
        if branches != 2 && branches != 3 {
            return Err(LatticeError::UnsupportedTopology { branches });
        }
        Ok(Self { branches })
    }

    /// Nodes at `level`: (b−1)·l + 1.
    #[inline]
    pub(crate) fn level_width(&self, level: u32) -> u64 {
        u64::from(self.branches - 1) * u64::from(level) + 1
    }

    /// Index of the first node at `level`.
    ///
    /// Sum of widths below: l + (b−1)·l·(l−1)/2.
    #[inline]
    pub(crate) fn level_offset(&self, level: u32) -> u64 {
        let l = u64::from(level);
        l + u64::from(self.branches - 1) * l * l.saturating_sub(1) / 2
    }
}

impl Topology for RecombiningTopology {
    fn branches(&self) -> u16 {
        self.branches
    }

    fn node_count(&self, height: u32) -> u64 {
        self.level_offset(height)
    }

    fn depth(&self, index: u64) -> u32 {
        // Closed-form inverse of the level offset, with an exact integer
        // fixup for float rounding at level boundaries.
        let guess = match self.branches {
            // offset(l) = l(l+1)/2, inverse: ceil((−1+√(1+8(i+1)))/2) − 1
            2 => {
                let i = (index + 1) as f64;
                (0.5 * (-1.0 + (1.0 + 8.0 * i).sqrt())).ceil() as u32 - 1
            }
            // offset(l) = l², inverse: floor(√i)
            3 => (index as f64).sqrt().floor() as u32,
            _ => unreachable!("constructor admits only 2 or 3 branches"),
        };

        let mut level = guess;
        while self.level_offset(level) > index {
            level -= 1;
        }
        while self.level_offset(level + 1) <= index {
            level += 1;
        }
        level
    }

    fn child_index(&self, index: u64, branch: u16) -> Result<u64, LatticeError> {
        if branch >= self.branches {
            return Err(LatticeError::InvalidBranch {
                branch,
                branches: self.branches,
            });
        }
        let level = self.depth(index);
        let position = index - self.level_offset(level);
        Ok(self.level_offset(level + 1) + position + u64::from(branch))
    }

    fn parent_indices(&self, index: u64) -> Vec<u64> {
        if index == 0 {
            return Vec::new();
        }
        let level = self.depth(index);
        let position = index - self.level_offset(level);

        let span = u64::from(self.branches - 1);
        let lo = position.saturating_sub(span);
        let hi = position.min(self.level_width(level - 1) - 1);
        debug_assert!(lo <= hi, "every non-root node has a parent");

        let parent_offset = self.level_offset(level - 1);
        (lo..=hi).map(|p| parent_offset + p).collect()
    }
}
