//! Data flow analysis framework trait and direction.
//!
//! Any analysis over a [`ControlGraph`] implements [`DataFlowAnalysis`] and is
//! run to a fixpoint by [`crate::analysis::DataFlowSolver`].

use crate::analysis::{
    cfg::{CfgNode, CfgNodeId, ControlGraph},
    dataflow::lattice::MeetSemiLattice,
};

/// Direction of data flow analysis.
///
/// The direction determines how information propagates through the graph and
/// which neighbours are combined at a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Information flows from the entry towards the exit.
    ///
    /// The state entering a node is the meet of the states leaving its
    /// predecessors. Example: reaching definitions.
    Forward,

    /// Information flows from the exit towards the entry.
    ///
    /// The state leaving a node is the meet of the states entering its
    /// successors. Example: live variables.
    Backward,
}

/// A data flow analysis over a control graph.
///
/// Implementations provide the boundary condition and the per-node transfer
/// function; the solver handles iteration to a fixpoint.
///
/// For forward analyses: `out[n] = transfer(n, in[n])`
/// For backward analyses: `in[n] = transfer(n, out[n])`
///
/// # Example
///
/// ```rust
/// use shcore::analysis::{DataFlowAnalysis, DataFlowSolver, Direction};
/// use shcore::utils::BitSet;
/// use shcore::{CfgNode, CfgNodeId, ControlGraph};
///
/// /// Which nodes lie on some path from the entry.
/// struct Visited {
///     capacity: usize,
/// }
///
/// impl DataFlowAnalysis for Visited {
///     type Lattice = BitSet;
///     const DIRECTION: Direction = Direction::Forward;
///
///     fn boundary(&self, _graph: &ControlGraph) -> BitSet {
///         BitSet::new(self.capacity)
///     }
///
///     fn initial(&self, _graph: &ControlGraph) -> BitSet {
///         BitSet::new(self.capacity)
///     }
///
///     fn transfer(&self, id: CfgNodeId, _node: &CfgNode, input: &BitSet) -> BitSet {
///         let mut out = input.clone();
///         out.insert(id.index());
///         out
///     }
/// }
///
/// let graph = ControlGraph::new();
/// let mut solver = DataFlowSolver::new(Visited { capacity: graph.capacity() });
/// let results = solver.solve(&graph);
/// assert_eq!(results.out_state(graph.exit()).map(BitSet::count), Some(2));
/// ```
pub trait DataFlowAnalysis {
    /// The lattice type for this analysis.
    type Lattice: MeetSemiLattice;

    /// The direction of this analysis.
    const DIRECTION: Direction;

    /// Returns the state at the boundary of the graph.
    ///
    /// For forward analyses, this is the state entering the entry node.
    /// For backward analyses, this is the state leaving the exit node.
    fn boundary(&self, graph: &ControlGraph) -> Self::Lattice;

    /// Returns the initial state of every other node.
    ///
    /// This must be the identity of the meet so that a node's first visit is
    /// not polluted by neighbours that have not been processed yet.
    fn initial(&self, graph: &ControlGraph) -> Self::Lattice;

    /// Computes the state after flowing through `node` (in analysis
    /// direction) from `input`.
    fn transfer(&self, id: CfgNodeId, node: &CfgNode, input: &Self::Lattice) -> Self::Lattice;

    /// Called once the fixpoint is reached, with states indexed by arena
    /// index.
    ///
    /// The default implementation does nothing.
    fn finalize(
        &mut self,
        _in_states: &[Self::Lattice],
        _out_states: &[Self::Lattice],
        _graph: &ControlGraph,
    ) {
    }
}

/// Results of a data flow analysis.
///
/// States are stored by arena index. Nodes that are unreachable, or were
/// removed, keep the analysis' initial state.
#[derive(Debug, Clone)]
pub struct AnalysisResults<L> {
    /// State entering each node.
    pub in_states: Vec<L>,
    /// State leaving each node.
    pub out_states: Vec<L>,
}

impl<L: Clone> AnalysisResults<L> {
    /// Creates analysis results from per-node states.
    #[must_use]
    pub fn new(in_states: Vec<L>, out_states: Vec<L>) -> Self {
        Self {
            in_states,
            out_states,
        }
    }

    /// Returns the state entering `node`, or `None` if the handle is outside
    /// the analysed arena.
    #[must_use]
    pub fn in_state(&self, node: CfgNodeId) -> Option<&L> {
        self.in_states.get(node.index())
    }

    /// Returns the state leaving `node`, or `None` if the handle is outside
    /// the analysed arena.
    #[must_use]
    pub fn out_state(&self, node: CfgNodeId) -> Option<&L> {
        self.out_states.get(node.index())
    }

    /// Returns the number of arena slots covered.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.in_states.len()
    }
}
