//! Program analysis infrastructure for shader control graphs.
//!
//! This module provides the graph the rest of the crate works on and the
//! analyses the optimizer builds upon.
//!
//! # Architecture
//!
//! The analysis module is organized into focused sub-modules:
//!
//! - [`cfg`] - Control graph construction, traversal and editing
//! - [`structural`] - Recovery of blocks, sections, conditionals and loops
//! - [`dataflow`] - Generic dataflow framework and reaching definitions
//! - [`defuse`] - Use-def and def-use chains on statements
//!
//! # Usage
//!
//! ```rust,ignore
//! use shcore::analysis::{ControlGraph, DefUseChains, StructuralAnalysis};
//!
//! // Parse a front end block list into a graph
//! let mut graph = ControlGraph::from_blocks(blocks)?;
//!
//! // Recover the high-level structure
//! let structure = StructuralAnalysis::new(&graph);
//! println!("{}", structure.print());
//!
//! // Annotate every statement with its use-def and def-use sets
//! let chains = DefUseChains::build(&mut graph)?;
//! ```

pub mod cfg;
pub mod dataflow;
pub mod defuse;
pub mod structural;

// Re-export primary types at module level
pub use cfg::{Branch, CfgNode, CfgNodeId, ControlGraph, DfsIter, EdgeSlot, Parser};
pub use dataflow::{
    AnalysisResults, DataFlowAnalysis, DataFlowSolver, Definition, Direction, MeetSemiLattice,
    ReachingDefinitions, ReachingDefsResult,
};
pub use defuse::{DefUseChains, Location};
pub use structural::{
    CfgMatch, StructId, StructuralAnalysis, StructuralEdge, StructuralKind, StructuralNode,
};
