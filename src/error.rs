use thiserror::Error;

macro_rules! parse_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Parse {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Parse {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! internal_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Internal {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Internal {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// None of these conditions are expected to surface for a well-formed token stream produced by
/// a front end. They exist so that contract violations are reported instead of silently
/// corrupting a control graph.
///
/// # Error Categories
///
/// ## Front End Errors
/// - [`Error::Parse`] - Unbalanced or malformed control tokens in a block list
///
/// ## Internal Consistency Errors
/// - [`Error::Internal`] - A contract inside the compiler was violated
/// - [`Error::InvalidSwizzle`] - A swizzle selects a component the source does not have
/// - [`Error::StaleHandle`] - A variable handle outlived its arena slot
///
/// ## Graph Errors
/// - [`Error::Graph`] - A graph edit violated a structural precondition
///
/// # Examples
///
/// ```rust
/// use shcore::{BlockList, ControlGraph, Error, Token, TokenKind};
///
/// let mut blocks = BlockList::new();
/// blocks.push_token(Token::new(TokenKind::EndIf));
///
/// match ControlGraph::from_blocks(blocks) {
///     Err(Error::Parse { message, .. }) => println!("rejected: {message}"),
///     Err(e) => println!("other error: {e}"),
///     Ok(_) => unreachable!(),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The block list handed to the structured parser is malformed.
    ///
    /// Raised for a token of the wrong kind, a token with the wrong number of
    /// arguments, a `BREAK`/`CONTINUE` outside of any loop, or tokens left over
    /// once the top level has been parsed. The error includes the source location
    /// where the mismatch was detected.
    ///
    /// # Fields
    ///
    /// * `message` - Description of the mismatch
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Parse error - {file}:{line}: {message}")]
    Parse {
        /// The message to be printed for the Parse error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// Internal compiler error.
    ///
    /// A statement or analysis broke an invariant that the rest of the crate
    /// relies on, e.g. a statement that needs a destination has none, or a use
    /// has no reaching definition entry.
    #[error("Internal error - {file}:{line}: {message}")]
    Internal {
        /// The message to be printed for the Internal error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A swizzle index is not smaller than the size of the swizzled operand.
    #[error("Swizzle index {index} is out of range for size {size}")]
    InvalidSwizzle {
        /// The offending component index
        index: usize,
        /// The size of the operand the swizzle applies to
        size: usize,
    },

    /// A variable handle refers to a slot that has been removed or reused.
    #[error("Variable handle is stale")]
    StaleHandle,

    /// Control graph error.
    ///
    /// Errors related to structural edits of a control graph, such as setting a
    /// second follower, referring to a node that no longer exists or querying
    /// predecessor lists that have not been recomputed since the last edit.
    #[error("{0}")]
    Graph(String),
}
