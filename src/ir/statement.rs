//! IR statements and their analysis side-table.

use std::{collections::BTreeSet, fmt};

use crate::{
    ir::{Operand, Operation, VarId},
    Result,
};

/// Identity of a statement within one control graph.
///
/// Ids are assigned by [`crate::ControlGraph::renumber_statements`], which the
/// dataflow analyses call before they build use-def information. Statements
/// that were never numbered carry [`StmtId::UNASSIGNED`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StmtId(pub(crate) u32);

impl StmtId {
    /// Placeholder id of a statement that has not been numbered yet.
    pub const UNASSIGNED: StmtId = StmtId(u32::MAX);

    /// Returns the numeric value of this id.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StmtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Use-def and def-use chains of one statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueTracking {
    /// For each source slot, the definitions that may supply the value read.
    pub use_def: [BTreeSet<StmtId>; 3],
    /// The statements that may read the value this statement defines.
    pub def_use: BTreeSet<StmtId>,
}

/// Analysis annotations attached to a statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementInfo {
    /// Free-form text. Section markers carry their section name this way.
    pub comment: Option<String>,
    /// Chains computed by the use-def analysis.
    pub tracking: Option<ValueTracking>,
}

/// One IR instruction: `dest := op(src0, src1, src2)`.
///
/// Only the first [`Operation::arity`] sources are meaningful.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Identity within the owning graph.
    pub id: StmtId,
    /// Destination operand, null for operations without a result.
    pub dest: Operand,
    /// Operation code.
    pub op: Operation,
    /// Source operands.
    pub src: [Operand; 3],
    /// Side-table of annotations.
    pub info: StatementInfo,
}

impl Statement {
    /// Creates a statement from all of its parts.
    #[must_use]
    pub fn new(dest: Operand, op: Operation, src: [Operand; 3]) -> Self {
        Self {
            id: StmtId::UNASSIGNED,
            dest,
            op,
            src,
            info: StatementInfo::default(),
        }
    }

    /// A statement without destination or sources (markers, comments).
    #[must_use]
    pub fn nullary(op: Operation) -> Self {
        Self::new(
            Operand::null(),
            op,
            [Operand::null(), Operand::null(), Operand::null()],
        )
    }

    /// `dest := op(a)`.
    #[must_use]
    pub fn unary(dest: Operand, op: Operation, a: Operand) -> Self {
        Self::new(dest, op, [a, Operand::null(), Operand::null()])
    }

    /// `dest := op(a, b)`.
    #[must_use]
    pub fn binary(dest: Operand, op: Operation, a: Operand, b: Operand) -> Self {
        Self::new(dest, op, [a, b, Operand::null()])
    }

    /// `dest := op(a, b, c)`.
    #[must_use]
    pub fn ternary(dest: Operand, op: Operation, a: Operand, b: Operand, c: Operand) -> Self {
        Self::new(dest, op, [a, b, c])
    }

    /// `dest := src`.
    #[must_use]
    pub fn assign(dest: Operand, src: Operand) -> Self {
        Self::unary(dest, Operation::Asn, src)
    }

    /// A `DECL` statement declaring `var`.
    #[must_use]
    pub fn declare(var: Operand) -> Self {
        Self::new(
            var,
            Operation::Decl,
            [Operand::null(), Operand::null(), Operand::null()],
        )
    }

    /// A marker or comment statement carrying `text`.
    #[must_use]
    pub fn annotated(op: Operation, text: impl Into<String>) -> Self {
        let mut stmt = Self::nullary(op);
        stmt.info.comment = Some(text.into());
        stmt
    }

    /// Returns the meaningful source operands.
    #[must_use]
    pub fn sources(&self) -> &[Operand] {
        &self.src[..self.op.arity()]
    }

    /// Returns `true` if this statement writes a variable, which makes it a
    /// definition for reaching-definitions purposes.
    #[must_use]
    pub fn is_definition(&self) -> bool {
        !self.dest.is_null() && self.op.yields_result()
    }

    /// Returns the variable written by this statement, if it is a definition.
    #[must_use]
    pub fn defined_var(&self) -> Option<VarId> {
        if self.is_definition() {
            self.dest.var()
        } else {
            None
        }
    }

    /// Returns `true` if any meaningful source reads `var`.
    #[must_use]
    pub fn reads(&self, var: VarId) -> bool {
        self.sources().iter().any(|s| s.refers_to(var))
    }

    /// Checks the operand slots against the operation's arity.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Internal`] if a result-producing operation has no
    /// destination or a meaningful source slot is empty.
    pub fn validate(&self) -> Result<()> {
        if self.op.yields_result() && self.dest.is_null() {
            return Err(internal_error!("{} requires a destination", self.op));
        }
        if self.op == Operation::Decl && self.dest.is_null() {
            return Err(internal_error!("DECL requires a declared variable"));
        }
        if let Some(slot) = self.sources().iter().position(Operand::is_null) {
            return Err(internal_error!(
                "{} reads source {} which is empty",
                self.op,
                slot
            ));
        }
        Ok(())
    }

    /// Returns the comment text, if any.
    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.info.comment.as_deref()
    }

    /// Returns the use-def/def-use chains, if computed.
    #[must_use]
    pub fn tracking(&self) -> Option<&ValueTracking> {
        self.info.tracking.as_ref()
    }

    /// Returns the chains, creating empty ones first if needed.
    pub fn tracking_mut(&mut self) -> &mut ValueTracking {
        self.info.tracking.get_or_insert_with(ValueTracking::default)
    }

    /// Drops the use-def/def-use chains.
    pub fn clear_tracking(&mut self) {
        self.info.tracking = None;
    }

    /// Formats the statement, resolving variable names with `name`.
    pub fn display_with<F>(&self, name: F) -> String
    where
        F: Fn(VarId) -> String,
    {
        let mut out = String::new();
        if !self.dest.is_null() {
            out.push_str(&self.dest.display_with(&name));
            out.push_str(" := ");
        }
        out.push_str(self.op.info().name);
        let sources: Vec<String> = self
            .sources()
            .iter()
            .map(|s| s.display_with(&name))
            .collect();
        if !sources.is_empty() {
            out.push(' ');
            out.push_str(&sources.join(", "));
        }
        if let Some(comment) = self.comment() {
            out.push_str(&format!(" \"{comment}\""));
        }
        out
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_with(|var| var.to_string()))
    }
}
