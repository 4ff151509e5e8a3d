//! Control graph construction and manipulation.
//!
//! A [`ControlGraph`] is an arena of [`CfgNode`]s. Each node optionally holds a
//! [`crate::ir::BasicBlock`], an ordered list of guarded successors and at most
//! one unconditional follower. The [`Parser`] builds graphs from the block
//! lists a front end produces.
//!
//! # Key Components
//!
//! - [`ControlGraph`] - Node arena with entry, exit, traversal and editing
//! - [`CfgNode`] - One node: block, declarations, outgoing edges
//! - [`Branch`] - A conditional successor and its guard
//! - [`EdgeSlot`] - Names one outgoing edge of a node
//! - [`Parser`] - Structured parser over [`crate::ir::BlockList`]
//!
//! # Branch Semantics
//!
//! Conditional successors are evaluated in list order and the first whose
//! guard is positive is taken. If none is, control moves to the follower.
//! [`ControlGraph::validate_exclusive_guards`] checks that no node tests the
//! same guard twice.
//!
//! # Examples
//!
//! ```rust
//! use shcore::prelude::*;
//!
//! let mut vars = VariableArena::new();
//! let cond = Operand::new(vars.add("cond", VariableKind::Input, 1), 1);
//!
//! let mut blocks = BlockList::new();
//! blocks.push_token(Token::with_arguments(
//!     TokenKind::While,
//!     vec![TokenArgument::value(cond)],
//! ));
//! blocks.push_basic(BasicBlock::new());
//! blocks.push_token(Token::new(TokenKind::EndWhile));
//!
//! let graph = ControlGraph::from_blocks(blocks)?;
//! assert!(graph.validate().is_ok());
//! println!("{}", graph.to_dot(&vars));
//! # Ok::<(), shcore::Error>(())
//! ```

mod graph;
mod node;
mod parser;

pub use graph::{ControlGraph, DfsIter};
pub use node::{Branch, CfgNode, CfgNodeId, EdgeSlot};
pub use parser::Parser;
