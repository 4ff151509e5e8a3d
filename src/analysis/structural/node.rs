//! Regions of the structural tree.

use std::fmt;

use strum::IntoStaticStr;

use crate::{
    analysis::cfg::{CfgNodeId, EdgeSlot},
    ir::Operand,
};

/// Handle to a region of a [`crate::analysis::StructuralAnalysis`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StructId(pub(crate) usize);

impl StructId {
    /// Returns the arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StructId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// What a region is, together with the regions it was collapsed from.
#[derive(Debug, Clone, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum StructuralKind {
    /// A single control graph node.
    Unreduced {
        /// The wrapped node.
        cfg: CfgNodeId,
    },
    /// A straight-line chain, in execution order.
    Block {
        /// Chain members, first to last.
        members: Vec<StructId>,
    },
    /// A chain delimited by matching section markers.
    Section {
        /// Name carried by the start marker.
        name: String,
        /// Chain members, from the start marker region to the end marker region.
        members: Vec<StructId>,
    },
    /// A head with one conditional arm that rejoins the head's other successor.
    If {
        /// Region deciding the branch.
        head: StructId,
        /// The arm.
        body: StructId,
    },
    /// A head with two arms rejoining at the same successor.
    #[strum(serialize = "IFELSE")]
    IfElse {
        /// Region deciding the branch.
        head: StructId,
        /// First arm in edge order.
        then_branch: StructId,
        /// Second arm in edge order.
        else_branch: StructId,
    },
    /// A region branching back to itself.
    #[strum(serialize = "SELFLOOP")]
    SelfLoop {
        /// The repeated region.
        body: StructId,
    },
    /// A test region and a body region that returns to it.
    #[strum(serialize = "WHILELOOP")]
    WhileLoop {
        /// Loop test.
        head: StructId,
        /// Loop body.
        body: StructId,
    },
}

impl StructuralKind {
    /// Regions directly collapsed into this one, entry region first.
    #[must_use]
    pub fn members(&self) -> Vec<StructId> {
        match self {
            Self::Unreduced { .. } => Vec::new(),
            Self::Block { members } | Self::Section { members, .. } => members.clone(),
            Self::If { head, body } | Self::WhileLoop { head, body } => vec![*head, *body],
            Self::IfElse {
                head,
                then_branch,
                else_branch,
            } => vec![*head, *then_branch, *else_branch],
            Self::SelfLoop { body } => vec![*body],
        }
    }

    /// Upper-case kind name used in dumps.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.into()
    }
}

/// A region-level edge. Outgoing edges point at their target, incoming edges
/// at their source. A `None` guard stands for a follower edge.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuralEdge {
    /// Guard of the underlying control graph edge.
    pub guard: Option<Operand>,
    /// Region at the other end of the edge.
    pub target: StructId,
}

impl StructuralEdge {
    pub(crate) fn new(guard: Option<Operand>, target: StructId) -> Self {
        Self { guard, target }
    }
}

/// One region of the structural tree.
#[derive(Debug, Clone)]
pub struct StructuralNode {
    pub(crate) kind: StructuralKind,
    pub(crate) container: Option<StructId>,
    pub(crate) parent: Option<StructId>,
    pub(crate) children: Vec<StructId>,
    pub(crate) succs: Vec<StructuralEdge>,
    pub(crate) preds: Vec<StructuralEdge>,
    pub(crate) sec_start: Option<String>,
    pub(crate) sec_end: Option<String>,
}

impl StructuralNode {
    pub(crate) fn new(kind: StructuralKind) -> Self {
        Self {
            kind,
            container: None,
            parent: None,
            children: Vec::new(),
            succs: Vec::new(),
            preds: Vec::new(),
            sec_start: None,
            sec_end: None,
        }
    }

    /// Region kind and members.
    #[must_use]
    pub fn kind(&self) -> &StructuralKind {
        &self.kind
    }

    /// Regions directly collapsed into this one.
    #[must_use]
    pub fn members(&self) -> Vec<StructId> {
        self.kind.members()
    }

    /// The region this one was collapsed into, `None` while it is still live.
    #[must_use]
    pub fn container(&self) -> Option<StructId> {
        self.container
    }

    /// Parent in the depth-first spanning tree.
    #[must_use]
    pub fn parent(&self) -> Option<StructId> {
        self.parent
    }

    /// Children in the depth-first spanning tree.
    #[must_use]
    pub fn children(&self) -> &[StructId] {
        &self.children
    }

    /// Outgoing region edges: conditional edges before the follower.
    #[must_use]
    pub fn succs(&self) -> &[StructuralEdge] {
        &self.succs
    }

    /// Incoming region edges.
    #[must_use]
    pub fn preds(&self) -> &[StructuralEdge] {
        &self.preds
    }

    /// Name of a section opened at this region's entry and not yet closed.
    #[must_use]
    pub fn section_start(&self) -> Option<&str> {
        self.sec_start.as_deref()
    }

    /// Name of a section closed at this region's exit and not yet opened.
    #[must_use]
    pub fn section_end(&self) -> Option<&str> {
        self.sec_end.as_deref()
    }
}

/// A control graph edge found by a region query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CfgMatch {
    /// Source node.
    pub from: CfgNodeId,
    /// Target node.
    pub to: CfgNodeId,
    /// Which of `from`'s edges this is.
    pub slot: EdgeSlot,
}

impl CfgMatch {
    /// Returns `true` if the edge is `from`'s follower.
    #[must_use]
    pub fn is_follower(&self) -> bool {
        self.slot == EdgeSlot::Follower
    }
}
