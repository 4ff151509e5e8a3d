//! Control graph nodes and edges.

use std::{collections::BTreeSet, fmt};

use crate::ir::{BasicBlock, Operand, Operation, VarId};

/// Handle to a node of a [`crate::ControlGraph`].
///
/// Handles index into the graph's node arena and stay valid until the node is
/// removed. They are meaningless for any other graph, including copies.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CfgNodeId(pub(crate) usize);

impl CfgNodeId {
    /// Creates a handle from an arena index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for CfgNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CfgNodeId({})", self.0)
    }
}

impl fmt::Display for CfgNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A conditional successor: taken if `guard` is positive.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    /// Operand whose value decides the branch.
    pub guard: Operand,
    /// Node control transfers to.
    pub target: CfgNodeId,
}

/// Identifies one outgoing edge of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeSlot {
    /// The conditional successor at this position.
    Branch(usize),
    /// The unconditional follower.
    Follower,
}

/// A node of a control graph.
///
/// Conditional successors are tried in list order and the first one whose
/// guard holds is taken. The follower is taken when none holds. A node without
/// successors and follower ends the program.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CfgNode {
    /// Code executed when control reaches the node.
    pub block: Option<BasicBlock>,
    /// Conditional successors, in evaluation order.
    pub successors: Vec<Branch>,
    /// Unconditional successor.
    pub follower: Option<CfgNodeId>,
    /// Temporaries whose scope starts at this node.
    pub decls: BTreeSet<VarId>,
    pub(crate) predecessors: Vec<CfgNodeId>,
}

impl CfgNode {
    /// Creates a node without code or edges.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a node executing `block`.
    #[must_use]
    pub fn with_block(block: BasicBlock) -> Self {
        Self {
            block: Some(block),
            ..Self::default()
        }
    }

    /// Returns `true` if the node has no outgoing edge.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.successors.is_empty() && self.follower.is_none()
    }

    /// Returns `true` if the node has no block or an empty one.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.block.as_ref().is_none_or(BasicBlock::is_empty)
    }

    /// Number of statements in the node's block.
    #[must_use]
    pub fn statement_count(&self) -> usize {
        self.block.as_ref().map_or(0, BasicBlock::len)
    }

    /// Outgoing edges in traversal order: conditional successors, then the follower.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeSlot, Option<&Operand>, CfgNodeId)> + '_ {
        self.successors
            .iter()
            .enumerate()
            .map(|(i, b)| (EdgeSlot::Branch(i), Some(&b.guard), b.target))
            .chain(self.follower.map(|f| (EdgeSlot::Follower, None, f)))
    }

    /// Targets of all outgoing edges in traversal order, duplicates included.
    pub fn targets(&self) -> impl Iterator<Item = CfgNodeId> + '_ {
        self.successors
            .iter()
            .map(|b| b.target)
            .chain(self.follower)
    }

    /// Target of the edge in `slot`.
    #[must_use]
    pub fn target(&self, slot: EdgeSlot) -> Option<CfgNodeId> {
        match slot {
            EdgeSlot::Branch(i) => self.successors.get(i).map(|b| b.target),
            EdgeSlot::Follower => self.follower,
        }
    }

    /// Returns `true` if the block starts with `op`.
    #[must_use]
    pub fn starts_with(&self, op: Operation) -> bool {
        self.block
            .as_ref()
            .and_then(BasicBlock::first)
            .is_some_and(|s| s.op == op)
    }

    /// Returns `true` if the block ends with `op`.
    #[must_use]
    pub fn ends_with(&self, op: Operation) -> bool {
        self.block
            .as_ref()
            .and_then(BasicBlock::last)
            .is_some_and(|s| s.op == op)
    }

    /// Returns the block, creating an empty one first if needed.
    pub fn block_mut(&mut self) -> &mut BasicBlock {
        self.block.get_or_insert_with(BasicBlock::new)
    }

    /// Declares `var` at this node.
    pub fn add_decl(&mut self, var: VarId) {
        self.decls.insert(var);
    }

    /// Returns `true` if `var` is declared at this node.
    #[must_use]
    pub fn has_decl(&self, var: VarId) -> bool {
        self.decls.contains(&var)
    }

    /// Rewrites every edge target with `map`.
    pub(crate) fn remap_targets(&mut self, map: impl Fn(CfgNodeId) -> CfgNodeId) {
        for branch in &mut self.successors {
            branch.target = map(branch.target);
        }
        self.follower = self.follower.map(&map);
    }
}
