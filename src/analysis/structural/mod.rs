//! Structural analysis: recovery of high-level control constructs.
//!
//! [`StructuralAnalysis`] turns a [`crate::ControlGraph`] into a tree of
//! regions. Leaves wrap single graph nodes; inner regions are straight-line
//! blocks, named sections, conditionals and loops. Queries map region-level
//! edges back to the control graph edges that realise them.
//!
//! The tree borrows the graph it was built from. It is a snapshot: edit the
//! graph and the analysis has to be rebuilt.

mod analysis;
mod node;

pub use analysis::StructuralAnalysis;
pub use node::{CfgMatch, StructId, StructuralEdge, StructuralKind, StructuralNode};
