//! Lattice trait for data flow analysis.
//!
//! The meet combines the states of several control flow paths where they
//! merge. For the may-analyses of this crate the meet is set union, the
//! empty set is its identity and the fixpoint is the least solution.

use std::fmt::Debug;

use crate::utils::BitSet;

/// A meet semi-lattice.
///
/// The meet must be:
///
/// - **Idempotent**: `x.meet(x) = x`
/// - **Commutative**: `x.meet(y) = y.meet(x)`
/// - **Associative**: `x.meet(y.meet(z)) = (x.meet(y)).meet(z)`
pub trait MeetSemiLattice: Clone + Debug + PartialEq {
    /// Combines the information of two paths that merge.
    #[must_use]
    fn meet(&self, other: &Self) -> Self;
}

impl MeetSemiLattice for BitSet {
    /// Union: a fact holds if it holds on any incoming path.
    fn meet(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.union_with(other);
        result
    }
}
