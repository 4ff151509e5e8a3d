//! Data flow analysis framework for control graphs.
//!
//! This module provides a generic framework for computing facts that
//! propagate along control flow edges. It supports both forward and backward
//! analyses using a worklist-based solver.
//!
//! # Architecture
//!
//! The framework is built around three core abstractions:
//!
//! - **Lattice**: the domain of facts and the meet that merges paths
//! - **Analysis**: transfer function and boundary condition
//! - **Solver**: iterates to a fixpoint over the reachable nodes
//!
//! # Analyses Provided
//!
//! - [`ReachingDefinitions`]: which definitions may reach each node, tracked
//!   per written component
//!
//! # Example
//!
//! ```rust
//! use shcore::analysis::{DataFlowSolver, ReachingDefinitions};
//! use shcore::prelude::*;
//!
//! let mut vars = VariableArena::new();
//! let c = vars.add("c", VariableKind::Input, 1);
//! let t = vars.add("t", VariableKind::Temp, 1);
//!
//! let mut body = BasicBlock::new();
//! body.add_statement(Statement::assign(Operand::new(t, 1), Operand::new(c, 1)));
//!
//! let mut blocks = BlockList::new();
//! blocks.push_token(Token::with_arguments(
//!     TokenKind::While,
//!     vec![TokenArgument::value(Operand::new(c, 1))],
//! ));
//! blocks.push_basic(body);
//! blocks.push_token(Token::new(TokenKind::EndWhile));
//!
//! let graph = ControlGraph::from_blocks(blocks)?;
//! let mut solver = DataFlowSolver::new(ReachingDefinitions::new(&graph));
//! let results = solver.solve(&graph);
//!
//! // The loop body's assignment flows around the back edge to the exit.
//! assert!(results.in_state(graph.exit()).is_some_and(|s| s.reaches(0)));
//! # Ok::<(), shcore::Error>(())
//! ```

mod framework;
mod lattice;
mod reaching;
mod solver;

pub use framework::{AnalysisResults, DataFlowAnalysis, Direction};
pub use lattice::MeetSemiLattice;
pub use reaching::{Definition, ReachingDefinitions, ReachingDefsResult};
pub use solver::DataFlowSolver;
