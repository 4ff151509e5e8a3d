//! Optimizer for the shader middle-end.
//!
//! This module sits on top of [`crate::analysis`]: it rewrites a
//! [`ControlGraph`](crate::analysis::ControlGraph) in place, using the
//! def-use chains and dataflow results the analysis layer provides.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                       Optimizer Pipeline                         │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  OptimizerConfig             Level, disabled passes, round cap   │
//! │                                                                  │
//! │  CompilerContext             Per-run state                       │
//! │    ├─ VariableArena           (variable kinds and names)         │
//! │    └─ EventLog                (what every pass did)              │
//! │                                                                  │
//! │  Optimizer                   Round-based fixpoint execution      │
//! │    Each round: run every enabled pass once, stop when stable     │
//! │                                                                  │
//! │  Pass trait                  Interface for all passes            │
//! │                                                                  │
//! │  Passes (6 built-in)                                             │
//! │    ├─ Level 1: copy propagation, move elimination, DCE           │
//! │    └─ Level 2: empty blocks, straightening, redundant edges      │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use shcore::compiler::{CompilerContext, Optimizer, OptimizerConfig};
//!
//! let ctx = CompilerContext::new(&vars, OptimizerConfig::default());
//! let rounds = Optimizer::new().run(&mut graph, &ctx)?;
//! println!("{rounds} rounds: {}", ctx.events.summary());
//! ```

mod config;
mod context;
mod events;
mod pass;
mod passes;
mod scheduler;

pub use config::{OptimizationPasses, OptimizerConfig};
pub use context::CompilerContext;
pub use events::{Event, EventBuilder, EventKind, EventLog};
pub use pass::Pass;
pub use passes::{
    insert_branch_instructions, remove_branch_instructions, CopyPropagationPass,
    DeadCodeEliminationPass, EmptyBlockRemovalPass, MoveEliminationPass,
    RedundantEdgeRemovalPass, StraighteningPass,
};
pub use scheduler::Optimizer;
