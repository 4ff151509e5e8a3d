//! Control tokens and the block list handed over by the front end.
//!
//! A front end records straight-line code as [`BasicBlock`]s and marks control
//! constructs with [`Token`]s in between. Tokens that need a computed value (the
//! condition of an `IF`, the three clauses of a `FOR`) carry it as a
//! [`TokenArgument`]: a nested block list computing the value plus the operand
//! that holds it afterwards.

use std::{collections::VecDeque, fmt};

use strum::IntoStaticStr;

use crate::{analysis::ControlGraph, ir::BasicBlock, ir::Operand};

/// Kinds of control tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum TokenKind {
    /// Opens a conditional. One argument: the condition.
    If,
    /// Separates the two arms of a conditional.
    Else,
    /// Closes a conditional.
    EndIf,
    /// Opens a pre-tested loop. One argument: the condition.
    While,
    /// Closes a pre-tested loop.
    EndWhile,
    /// Opens a post-tested loop.
    Do,
    /// Closes a post-tested loop. One argument: the exit condition.
    Until,
    /// Opens a counted loop. Three arguments: init, condition, update.
    For,
    /// Closes a counted loop.
    EndFor,
    /// Leaves the innermost loop. One argument: the guard.
    Break,
    /// Jumps to the next iteration of the innermost loop. One argument: the guard.
    Continue,
    /// Opens a named section.
    #[strum(serialize = "STARTSEC")]
    StartSection,
    /// Closes a named section.
    #[strum(serialize = "ENDSEC")]
    EndSection,
}

impl TokenKind {
    /// Number of arguments a well-formed token of this kind carries.
    #[must_use]
    pub const fn argument_count(self) -> usize {
        match self {
            Self::If | Self::While | Self::Until | Self::Break | Self::Continue => 1,
            Self::For => 3,
            Self::Else
            | Self::EndIf
            | Self::EndWhile
            | Self::Do
            | Self::EndFor
            | Self::StartSection
            | Self::EndSection => 0,
        }
    }

    /// Returns `true` for tokens that end the statement sequence being parsed.
    #[must_use]
    pub const fn terminates_sequence(self) -> bool {
        matches!(
            self,
            Self::Else
                | Self::EndIf
                | Self::EndWhile
                | Self::Until
                | Self::EndFor
                | Self::EndSection
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name: &'static str = self.into();
        f.write_str(name)
    }
}

/// A computed token argument.
#[derive(Debug, Default)]
pub struct TokenArgument {
    /// Operand holding the value once `blocks` has executed.
    pub result: Operand,
    /// Code computing the value. May be empty if `result` is already available.
    pub blocks: BlockList,
}

impl TokenArgument {
    /// Creates an argument.
    #[must_use]
    pub fn new(result: Operand, blocks: BlockList) -> Self {
        Self { result, blocks }
    }

    /// An argument whose value needs no computation.
    #[must_use]
    pub fn value(result: Operand) -> Self {
        Self::new(result, BlockList::new())
    }
}

/// A control construct marker.
#[derive(Debug)]
pub struct Token {
    /// What kind of construct this token marks.
    pub kind: TokenKind,
    /// Computed arguments, see [`TokenKind::argument_count`].
    pub arguments: Vec<TokenArgument>,
    /// Section name, only meaningful for [`TokenKind::StartSection`].
    pub name: Option<String>,
}

impl Token {
    /// A token without arguments.
    #[must_use]
    pub fn new(kind: TokenKind) -> Self {
        Self {
            kind,
            arguments: Vec::new(),
            name: None,
        }
    }

    /// A token with arguments.
    #[must_use]
    pub fn with_arguments(kind: TokenKind, arguments: Vec<TokenArgument>) -> Self {
        Self {
            kind,
            arguments,
            name: None,
        }
    }

    /// A section start token.
    #[must_use]
    pub fn start_section(name: impl Into<String>) -> Self {
        Self {
            kind: TokenKind::StartSection,
            arguments: Vec::new(),
            name: Some(name.into()),
        }
    }
}

/// One element of a [`BlockList`].
#[derive(Debug)]
pub enum Block {
    /// Straight-line code.
    Basic(BasicBlock),
    /// A control construct marker.
    Token(Token),
    /// A control graph built earlier, spliced in as a unit.
    Graph(ControlGraph),
}

/// The ordered output of a front end, consumed front to back by the parser.
#[derive(Debug, Default)]
pub struct BlockList {
    items: VecDeque<Block>,
}

impl BlockList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends any element.
    pub fn push(&mut self, block: Block) {
        self.items.push_back(block);
    }

    /// Appends straight-line code.
    pub fn push_basic(&mut self, block: BasicBlock) {
        self.push(Block::Basic(block));
    }

    /// Appends a control token.
    pub fn push_token(&mut self, token: Token) {
        self.push(Block::Token(token));
    }

    /// Appends a prebuilt control graph.
    pub fn push_graph(&mut self, graph: ControlGraph) {
        self.push(Block::Graph(graph));
    }

    /// Returns the first element.
    #[must_use]
    pub fn front(&self) -> Option<&Block> {
        self.items.front()
    }

    /// Returns the first element mutably.
    pub fn front_mut(&mut self) -> Option<&mut Block> {
        self.items.front_mut()
    }

    /// Removes and returns the first element.
    pub fn pop_front(&mut self) -> Option<Block> {
        self.items.pop_front()
    }

    /// Number of top-level elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the list has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<Block> for BlockList {
    fn from_iter<T: IntoIterator<Item = Block>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
