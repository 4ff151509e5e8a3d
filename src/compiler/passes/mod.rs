//! Built-in optimizer passes.
//!
//! Statement rewriting (level 1 and above):
//!
//! - [`CopyPropagationPass`] - reads of copied temporaries read the source
//! - [`MoveEliminationPass`] - `t := e; x := t` becomes `x := e`
//! - [`DeadCodeEliminationPass`] - statements without observable effect go
//!
//! Graph restructuring (level 2 and above):
//!
//! - [`EmptyBlockRemovalPass`] - forwarding-only nodes go
//! - [`StraighteningPass`] - single-predecessor followers are merged
//! - [`RedundantEdgeRemovalPass`] - conditional edges to the follower go

mod branches;
mod copying;
mod deadcode;
mod edges;
mod emptyblocks;
mod moveelim;
mod straighten;

pub use branches::{insert_branch_instructions, remove_branch_instructions};
pub use copying::CopyPropagationPass;
pub use deadcode::DeadCodeEliminationPass;
pub use edges::RedundantEdgeRemovalPass;
pub use emptyblocks::EmptyBlockRemovalPass;
pub use moveelim::MoveEliminationPass;
pub use straighten::StraighteningPass;
