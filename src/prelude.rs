//! # shcore Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the shcore library. Import this module to get quick access to the essential
//! types for building, analyzing and optimizing shader programs.
//!
//! ```rust
//! use shcore::prelude::*;
//!
//! let graph = ControlGraph::from_blocks(BlockList::new())?;
//! assert!(graph.validate().is_ok());
//! # Ok::<(), shcore::Error>(())
//! ```

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all shcore operations
pub use crate::Error;

/// The result type used throughout shcore
pub use crate::Result;

// ================================================================================================
// Intermediate Representation
// ================================================================================================

/// Variables and their arena
pub use crate::ir::{VarId, VariableArena, VariableKind, VariableNode};

/// Statements and their operands
pub use crate::ir::{Operand, Operation, Statement, StmtId, Swizzle};

/// Front end input
pub use crate::ir::{BasicBlock, Block, BlockList, Token, TokenArgument, TokenKind};

// ================================================================================================
// Analysis
// ================================================================================================

/// Control graph
pub use crate::analysis::{Branch, CfgNode, CfgNodeId, ControlGraph};

/// Structural analysis
pub use crate::analysis::{StructId, StructuralAnalysis, StructuralKind};

/// Dataflow and def-use chains
pub use crate::analysis::{DataFlowAnalysis, DataFlowSolver, DefUseChains, ReachingDefinitions};

// ================================================================================================
// Optimizer
// ================================================================================================

/// Optimizer driver, configuration and diagnostics
pub use crate::compiler::{
    EventKind, EventLog, OptimizationPasses, Optimizer, OptimizerConfig, Pass,
};

/// Program container
pub use crate::program::Program;
