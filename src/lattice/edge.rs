//! Edge store
//!
//! Probabilities keyed by the structural (parent, child) pair. A value
//! type with derived equality and hashing replaces any formatted-string
//! keying: no allocation per lookup, no format-mismatch hazard.

use std::collections::HashMap;

use crate::LatticeError;

/// Ordered (parent, child) pair identifying a directed edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeKey {
    /// Id of the parent node.
    pub parent: u64,
    /// Id of the child node.
    pub child: u64,
}

impl EdgeKey {
    /// Build a key from parent and child ids.
    #[inline]
    pub fn new(parent: u64, child: u64) -> Self {
        Self { parent, child }
    }
}

/// Transition probabilities of the lattice.
///
/// Extended during traversal, overwritten during calibration, read-only
/// afterwards. Invariant: the outgoing probabilities of any single parent
/// sum to 1 (incoming probabilities of a recombined node need not, they
/// belong to different parents).
#[derive(Debug, Clone, Default)]
pub struct EdgeStore {
    probabilities: HashMap<EdgeKey, f64>,
}

impl EdgeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered edges.
    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    /// True when no edge has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }

    /// Insert or overwrite an edge probability.
    ///
    /// Rejects values outside `[0, 1]` (including NaN) instead of
    /// clamping.
    pub fn set(&mut self, key: EdgeKey, probability: f64) -> Result<(), LatticeError> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(LatticeError::InvalidProbability { value: probability });
        }
        self.probabilities.insert(key, probability);
        Ok(())
    }

    /// Probability of the edge, if registered.
    pub fn probability(&self, parent: u64, child: u64) -> Option<f64> {
        self.probabilities.get(&EdgeKey::new(parent, child)).copied()
    }

    /// Iterate over all (key, probability) entries, in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&EdgeKey, &f64)> {
        self.probabilities.iter()
    }
}
