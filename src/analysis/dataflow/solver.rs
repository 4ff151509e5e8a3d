//! Worklist-based data flow solver.
//!
//! # Algorithm
//!
//! The solver iterates until a fixpoint is reached:
//!
//! 1. Initialize every node with the initial value
//! 2. Seed the boundary value at the entry (forward) or exit (backward)
//! 3. Add every reachable node to the worklist, in depth-first preorder for
//!    forward analyses and in reverse preorder for backward ones
//! 4. While the worklist is non-empty:
//!    a. Remove a node from the worklist
//!    b. Compute its input by meeting the states of its predecessors
//!    (forward) or successors (backward)
//!    c. Apply the transfer function
//!    d. If the result changed, add the affected neighbours to the worklist
//! 5. Call the finalize hook
//!
//! Only nodes reachable from the entry take part. The solver derives its own
//! adjacency from one traversal, so it does not depend on the graph's cached
//! predecessor lists being fresh.

use std::collections::VecDeque;

use crate::analysis::{
    cfg::{CfgNodeId, ControlGraph},
    dataflow::{
        framework::{AnalysisResults, DataFlowAnalysis, Direction},
        lattice::MeetSemiLattice,
    },
};

/// Worklist-based data flow solver.
///
/// ```rust
/// use shcore::analysis::{DataFlowSolver, ReachingDefinitions};
/// use shcore::ControlGraph;
///
/// let graph = ControlGraph::new();
/// let mut solver = DataFlowSolver::new(ReachingDefinitions::new(&graph));
/// let results = solver.solve(&graph);
/// assert!(results.in_state(graph.exit()).is_some_and(|s| s.is_empty()));
/// ```
pub struct DataFlowSolver<A: DataFlowAnalysis> {
    /// The analysis being solved.
    analysis: A,
    /// Input state for each arena slot.
    in_states: Vec<A::Lattice>,
    /// Output state for each arena slot.
    out_states: Vec<A::Lattice>,
    /// Predecessors of each reachable node, one entry per edge.
    preds: Vec<Vec<usize>>,
    /// Successors of each reachable node, one entry per edge.
    succs: Vec<Vec<usize>>,
    /// Worklist of nodes to process.
    worklist: VecDeque<usize>,
    /// Whether each node is currently in the worklist.
    in_worklist: Vec<bool>,
    /// Number of node visits performed.
    iterations: usize,
}

impl<A: DataFlowAnalysis> DataFlowSolver<A> {
    /// Creates a new solver for the given analysis.
    #[must_use]
    pub fn new(analysis: A) -> Self {
        Self {
            analysis,
            in_states: Vec::new(),
            out_states: Vec::new(),
            preds: Vec::new(),
            succs: Vec::new(),
            worklist: VecDeque::new(),
            in_worklist: Vec::new(),
            iterations: 0,
        }
    }

    /// Solves the analysis to a fixpoint.
    ///
    /// Returns the state entering and leaving each node, indexed by arena
    /// index. The solver can be reused on another graph afterwards.
    pub fn solve(&mut self, graph: &ControlGraph) -> AnalysisResults<A::Lattice> {
        self.initialize(graph);
        self.iterate(graph);
        self.analysis
            .finalize(&self.in_states, &self.out_states, graph);
        AnalysisResults::new(
            std::mem::take(&mut self.in_states),
            std::mem::take(&mut self.out_states),
        )
    }

    /// Returns the number of node visits of the last [`DataFlowSolver::solve`].
    #[must_use]
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    /// Returns the analysis.
    #[must_use]
    pub fn analysis(&self) -> &A {
        &self.analysis
    }

    /// Consumes the solver and returns the analysis.
    #[must_use]
    pub fn into_analysis(self) -> A {
        self.analysis
    }

    fn initialize(&mut self, graph: &ControlGraph) {
        let capacity = graph.capacity();
        let initial = self.analysis.initial(graph);

        self.in_states = vec![initial.clone(); capacity];
        self.out_states = vec![initial; capacity];
        self.preds = vec![Vec::new(); capacity];
        self.succs = vec![Vec::new(); capacity];
        self.in_worklist = vec![false; capacity];
        self.worklist.clear();
        self.iterations = 0;

        let mut order = Vec::new();
        for (id, node) in graph.dfs() {
            order.push(id.index());
            for target in node.targets() {
                if let Some(preds) = self.preds.get_mut(target.index()) {
                    preds.push(id.index());
                    self.succs[id.index()].push(target.index());
                }
            }
        }

        match A::DIRECTION {
            Direction::Forward => {
                if let Some(state) = self.in_states.get_mut(graph.entry().index()) {
                    *state = self.analysis.boundary(graph);
                }
            }
            Direction::Backward => {
                if let Some(state) = self.out_states.get_mut(graph.exit().index()) {
                    *state = self.analysis.boundary(graph);
                }
                order.reverse();
            }
        }

        for idx in order {
            self.worklist.push_back(idx);
            self.in_worklist[idx] = true;
        }
    }

    fn iterate(&mut self, graph: &ControlGraph) {
        let boundary = self.analysis.boundary(graph);
        let boundary_idx = match A::DIRECTION {
            Direction::Forward => graph.entry().index(),
            Direction::Backward => graph.exit().index(),
        };

        while let Some(idx) = self.worklist.pop_front() {
            self.in_worklist[idx] = false;
            self.iterations += 1;

            let Some(node) = graph.node(CfgNodeId::new(idx)) else {
                continue;
            };

            let (neighbours, sources, targets) = match A::DIRECTION {
                Direction::Forward => (&self.preds[idx], &self.out_states, &self.in_states),
                Direction::Backward => (&self.succs[idx], &self.in_states, &self.out_states),
            };

            // The boundary node meets its seeded value with any back edges.
            let mut input = if idx == boundary_idx {
                Some(boundary.clone())
            } else {
                None
            };
            for &n in neighbours {
                input = Some(match input {
                    None => sources[n].clone(),
                    Some(acc) => acc.meet(&sources[n]),
                });
            }
            let input = input.unwrap_or_else(|| targets[idx].clone());

            let output = self.analysis.transfer(CfgNodeId::new(idx), node, &input);

            let changed = match A::DIRECTION {
                Direction::Forward => {
                    self.in_states[idx] = input;
                    let changed = output != self.out_states[idx];
                    self.out_states[idx] = output;
                    changed
                }
                Direction::Backward => {
                    self.out_states[idx] = input;
                    let changed = output != self.in_states[idx];
                    self.in_states[idx] = output;
                    changed
                }
            };

            if changed {
                self.add_affected_to_worklist(idx);
            }
        }
    }

    fn add_affected_to_worklist(&mut self, idx: usize) {
        let affected = match A::DIRECTION {
            Direction::Forward => &self.succs[idx],
            Direction::Backward => &self.preds[idx],
        };
        for &n in affected {
            if !self.in_worklist[n] {
                self.worklist.push_back(n);
                self.in_worklist[n] = true;
            }
        }
    }
}
