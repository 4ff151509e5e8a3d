// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # shcore
//!
//! The middle-end of an embedded shader metaprogramming system. A front end
//! records shader code as a flat list of basic blocks interleaved with control
//! tokens (`IF`, `WHILE`, `FOR`, sections, ...). `shcore` turns that list into
//! a control graph, recovers its high-level structure, analyzes how values
//! flow through it and optimizes it before a backend lowers it.
//!
//! ## Features
//!
//! - **Structured parsing** - Block lists with nested control tokens become an
//!   arena-backed control graph with a single entry and exit
//! - **Structural analysis** - Blocks, sections, conditionals and loops are
//!   recovered as a region tree that maps back to graph edges
//! - **Dataflow framework** - Forward and backward analyses over a bit-set
//!   lattice, with reaching definitions and def-use chains on top
//! - **Optimizer** - Copy propagation, move elimination, dead code elimination
//!   and graph cleanup, run to a fixpoint under a level-based configuration
//!
//! ## Quick Start
//!
//! ### Using the Prelude
//!
//! For convenient access to the most commonly used types, import the prelude:
//!
//! ```rust
//! use shcore::prelude::*;
//!
//! let mut vars = VariableArena::new();
//! let pos = vars.add("pos", VariableKind::Input, 4);
//! let color = vars.add("color", VariableKind::Output, 4);
//! let t = vars.add("t", VariableKind::Temp, 4);
//! let unused = vars.add("unused", VariableKind::Temp, 4);
//!
//! let mut block = BasicBlock::new();
//! block.add_statement(Statement::unary(Operand::new(t, 4), Operation::Abs, Operand::new(pos, 4)));
//! block.add_statement(Statement::assign(Operand::new(unused, 4), Operand::new(pos, 4)));
//! block.add_statement(Statement::assign(Operand::new(color, 4), Operand::new(t, 4)));
//!
//! let mut blocks = BlockList::new();
//! blocks.push_basic(block);
//!
//! let mut program = Program::from_blocks(blocks, vars)?;
//! let events = program.optimize(OptimizerConfig::default())?;
//! println!("{}", events.summary());
//! assert!(program.temps().is_empty());
//! # Ok::<(), shcore::Error>(())
//! ```
//!
//! ## Architecture
//!
//! `shcore` is organized into several key modules:
//!
//! - [`prelude`] - Convenient re-exports of commonly used types and traits
//! - [`ir`] - Statements, operands, variables, basic blocks and control tokens
//! - [`analysis`] - Control graph, structural analysis, dataflow, def-use chains
//! - [`compiler`] - Optimizer passes, their driver and configuration
//! - [`program`] - A graph together with its variables and declarations
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Logging
//!
//! The optimizer records everything it does in an
//! [`EventLog`](compiler::EventLog) and forwards each event to the [`log`]
//! facade. Install any `log` compatible logger to see it.

#[macro_use]
pub(crate) mod error;

pub mod analysis;
pub mod compiler;
pub mod ir;
pub mod prelude;
pub mod program;
pub mod utils;

/// `shcore` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
/// This is used consistently throughout the crate for all fallible operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `shcore` Error type
///
/// The main error type for all operations in this crate. Each variant documents
/// the condition it reports.
pub use error::Error;

/// The control graph and its building blocks.
///
/// # Example
///
/// ```rust
/// use shcore::{BlockList, ControlGraph};
///
/// let graph = ControlGraph::from_blocks(BlockList::new())?;
/// assert_eq!(graph.preorder(), vec![graph.entry(), graph.exit()]);
/// # Ok::<(), shcore::Error>(())
/// ```
pub use analysis::{CfgNode, CfgNodeId, ControlGraph, Parser};

/// Front end input types.
pub use ir::{BasicBlock, BlockList, Token, TokenKind};

/// The program container.
pub use program::Program;
