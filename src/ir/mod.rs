//! The shader intermediate representation.
//!
//! A program is a control graph whose nodes hold [`BasicBlock`]s of
//! [`Statement`]s. Statements refer to variables through [`Operand`]s, which
//! combine a [`VarId`] handle with a [`Swizzle`] and a negation flag. Before a
//! graph exists, the front end hands over a [`BlockList`] where straight-line
//! code is interleaved with control [`Token`]s.

mod block;
mod operand;
mod operation;
mod statement;
mod token;
mod variable;

pub use block::BasicBlock;
pub use operand::{Operand, Swizzle};
pub use operation::{Operation, OperationInfo, ResultSource};
pub use statement::{Statement, StatementInfo, StmtId, ValueTracking};
pub use token::{Block, BlockList, Token, TokenArgument, TokenKind};
pub use variable::{VarId, VariableArena, VariableKind, VariableNode};
