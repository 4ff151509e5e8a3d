//! Small shared building blocks that are not specific to the shader IR.

mod bitset;
mod dot;

pub use bitset::{BitSet, BitSetIter};
pub use dot::{dot_lines, escape_dot};
