//! Use-def and def-use chains.
//!
//! [`DefUseChains::build`] numbers the statements of a graph, solves reaching
//! definitions and records the result on every statement's
//! [`ValueTracking`](crate::ir::ValueTracking):
//!
//! - **use-def**: for each source slot, the definitions that may supply a
//!   component the slot reads
//! - **def-use**: for each definition, the statements with a slot whose
//!   use-def set contains it
//!
//! The chains describe the graph as it was when they were built. Any edit
//! invalidates them, and the optimizer rebuilds them before every pass that
//! reads them.
//!
//! # Usage
//!
//! ```rust
//! use shcore::analysis::DefUseChains;
//! use shcore::prelude::*;
//!
//! let mut vars = VariableArena::new();
//! let a = vars.add("a", VariableKind::Input, 1);
//! let t = vars.add("t", VariableKind::Temp, 1);
//! let o = vars.add("o", VariableKind::Output, 1);
//!
//! let mut block = BasicBlock::new();
//! block.add_statement(Statement::assign(Operand::new(t, 1), Operand::new(a, 1)));
//! block.add_statement(Statement::assign(Operand::new(o, 1), Operand::new(t, 1)));
//! let mut blocks = BlockList::new();
//! blocks.push_basic(block);
//!
//! let mut graph = ControlGraph::from_blocks(blocks)?;
//! let chains = DefUseChains::build(&mut graph)?;
//!
//! let copy = graph.preorder().into_iter()
//!     .filter_map(|id| graph.node(id)?.block.as_ref()?.first().cloned())
//!     .next()
//!     .ok_or(shcore::Error::Graph("no statements".into()))?;
//! let uses = &copy.tracking().ok_or(shcore::Error::Graph("no chains".into()))?.def_use;
//! assert_eq!(uses.len(), 1);
//! assert_eq!(chains.statement_count(), 2);
//! # Ok::<(), shcore::Error>(())
//! ```

use std::{
    collections::{BTreeSet, HashMap},
    fmt,
};

use crate::{
    analysis::{
        cfg::{CfgNodeId, ControlGraph},
        dataflow::{AnalysisResults, DataFlowSolver, ReachingDefinitions, ReachingDefsResult},
    },
    ir::{BasicBlock, Operand, Statement, StmtId},
    Result,
};

/// Position of a statement in a graph: node plus index in the node's block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location {
    /// Node holding the statement.
    pub node: CfgNodeId,
    /// Index of the statement in the node's block.
    pub index: usize,
}

impl Location {
    /// Creates a new location.
    #[must_use]
    pub const fn new(node: CfgNodeId, index: usize) -> Self {
        Self { node, index }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node, self.index)
    }
}

/// Reaching definitions of a graph together with where each statement sits.
///
/// Built once per graph state. Besides writing the chains onto the
/// statements, it answers [`DefUseChains::defs_reaching`] for operands other
/// than a statement's own sources.
#[derive(Debug)]
pub struct DefUseChains {
    analysis: ReachingDefinitions,
    results: AnalysisResults<ReachingDefsResult>,
    locations: HashMap<StmtId, Location>,
    statement_count: usize,
}

impl DefUseChains {
    /// Builds the chains of every reachable statement of `graph` and stores
    /// them in the statements' tracking data.
    ///
    /// Statements are renumbered first and chains left over from earlier
    /// builds are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Internal`] if a use-def set names a statement
    /// that has no location, which means the graph changed under the analysis.
    pub fn build(graph: &mut ControlGraph) -> Result<Self> {
        graph.clear_tracking();
        let statement_count = graph.renumber_statements();

        let mut solver = DataFlowSolver::new(ReachingDefinitions::new(graph));
        let results = solver.solve(graph);
        let analysis = solver.into_analysis();

        let mut locations = HashMap::with_capacity(statement_count);
        let mut use_defs: HashMap<StmtId, [BTreeSet<StmtId>; 3]> =
            HashMap::with_capacity(statement_count);

        for (id, node) in graph.dfs() {
            let mut state = analysis.state_before(&results, id, 0);
            let statements = node.block.iter().flat_map(BasicBlock::iter);
            for (index, stmt) in statements.enumerate() {
                locations.insert(stmt.id, Location::new(id, index));

                let mut chains: [BTreeSet<StmtId>; 3] = Default::default();
                for (slot, operand) in stmt.sources().iter().enumerate() {
                    chains[slot] = analysis.reaching_operand(&state, operand);
                }
                use_defs.insert(stmt.id, chains);

                if let Some(def) = analysis.definition_at(id, index) {
                    analysis.apply(def, &mut state);
                }
            }
        }

        let mut def_uses: HashMap<StmtId, BTreeSet<StmtId>> = HashMap::new();
        for (&user, chains) in &use_defs {
            for &def in chains.iter().flatten() {
                if !locations.contains_key(&def) {
                    return Err(internal_error!(
                        "{} reads a definition {} that is not in the graph",
                        user,
                        def
                    ));
                }
                def_uses.entry(def).or_default().insert(user);
            }
        }

        graph.dfs_mut(|_, node| {
            for stmt in node.block.iter_mut().flat_map(BasicBlock::iter_mut) {
                let id = stmt.id;
                let tracking = stmt.tracking_mut();
                tracking.use_def = use_defs.remove(&id).unwrap_or_default();
                tracking.def_use = def_uses.remove(&id).unwrap_or_default();
            }
        });

        Ok(Self {
            analysis,
            results,
            locations,
            statement_count,
        })
    }

    /// Number of statements numbered by the build.
    #[must_use]
    pub const fn statement_count(&self) -> usize {
        self.statement_count
    }

    /// Where statement `id` sat when the chains were built.
    #[must_use]
    pub fn location(&self, id: StmtId) -> Option<Location> {
        self.locations.get(&id).copied()
    }

    /// Looks up statement `id` in `graph` by its recorded location.
    #[must_use]
    pub fn statement<'g>(&self, graph: &'g ControlGraph, id: StmtId) -> Option<&'g Statement> {
        let at = self.location(id)?;
        graph
            .node(at.node)?
            .block
            .as_ref()?
            .get(at.index)
            .filter(|stmt| stmt.id == id)
    }

    /// The underlying reaching definitions analysis.
    #[must_use]
    pub fn reaching(&self) -> &ReachingDefinitions {
        &self.analysis
    }

    /// Definitions supplying a component that `operand` would read if it
    /// were a source of the statement at `at`.
    #[must_use]
    pub fn defs_reaching(&self, at: Location, operand: &Operand) -> BTreeSet<StmtId> {
        let state = self.analysis.state_before(&self.results, at.node, at.index);
        self.analysis.reaching_operand(&state, operand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{
        BlockList, Operation, Swizzle, Token, TokenArgument, TokenKind, ValueTracking,
        VariableArena, VariableKind,
    };

    fn statements_in_order(graph: &ControlGraph) -> Vec<Statement> {
        graph
            .dfs()
            .flat_map(|(_, node)| node.block.iter().flat_map(BasicBlock::iter).cloned())
            .collect()
    }

    #[test]
    fn test_straight_line_chains() {
        let mut vars = VariableArena::new();
        let a = vars.add("a", VariableKind::Input, 1);
        let t = vars.add("t", VariableKind::Temp, 1);
        let o = vars.add("o", VariableKind::Output, 1);

        let block: BasicBlock = vec![
            Statement::assign(Operand::new(t, 1), Operand::new(a, 1)),
            Statement::binary(
                Operand::new(o, 1),
                Operation::Add,
                Operand::new(t, 1),
                Operand::new(t, 1),
            ),
        ]
        .into_iter()
        .collect();
        let mut blocks = BlockList::new();
        blocks.push_basic(block);
        let mut graph = ControlGraph::from_blocks(blocks).unwrap();

        let chains = DefUseChains::build(&mut graph).unwrap();
        let stmts = statements_in_order(&graph);
        let (copy, sum) = (&stmts[0], &stmts[1]);

        let copy_tracking = copy.tracking().unwrap();
        assert!(copy_tracking.use_def[0].is_empty());
        assert_eq!(copy_tracking.def_use, BTreeSet::from([sum.id]));

        let sum_tracking = sum.tracking().unwrap();
        assert_eq!(sum_tracking.use_def[0], BTreeSet::from([copy.id]));
        assert_eq!(sum_tracking.use_def[1], BTreeSet::from([copy.id]));
        assert!(sum_tracking.def_use.is_empty());

        let at = chains.location(sum.id).unwrap();
        assert_eq!(at.index, 1);
        assert_eq!(chains.statement(&graph, sum.id), Some(sum));
    }

    #[test]
    fn test_loop_carried_use() {
        let mut vars = VariableArena::new();
        let c = vars.add("c", VariableKind::Input, 1);
        let t = vars.add("t", VariableKind::Temp, 1);

        let mut blocks = BlockList::new();
        blocks.push_basic(
            std::iter::once(Statement::assign(Operand::new(t, 1), Operand::new(c, 1))).collect(),
        );
        blocks.push_token(Token::with_arguments(
            TokenKind::While,
            vec![TokenArgument::value(Operand::new(c, 1))],
        ));
        blocks.push_basic(
            std::iter::once(Statement::binary(
                Operand::new(t, 1),
                Operation::Add,
                Operand::new(t, 1),
                Operand::new(c, 1),
            ))
            .collect(),
        );
        blocks.push_token(Token::new(TokenKind::EndWhile));
        let mut graph = ControlGraph::from_blocks(blocks).unwrap();

        DefUseChains::build(&mut graph).unwrap();
        let stmts = statements_in_order(&graph);
        let update = stmts.iter().find(|s| s.op == Operation::Add).unwrap();
        let init = stmts.iter().find(|s| s.op == Operation::Asn).unwrap();

        let reads = &update.tracking().unwrap().use_def[0];
        assert_eq!(reads, &BTreeSet::from([init.id, update.id]));
        assert!(update.tracking().unwrap().def_use.contains(&update.id));
    }

    #[test]
    fn test_component_granular_chains() {
        let mut vars = VariableArena::new();
        let a = vars.add("a", VariableKind::Input, 1);
        let t = vars.add("t", VariableKind::Temp, 2);
        let o = vars.add("o", VariableKind::Output, 1);
        let x = Swizzle::new(2, vec![0]).unwrap();
        let y = Swizzle::new(2, vec![1]).unwrap();

        let block: BasicBlock = vec![
            Statement::assign(Operand::swizzled(t, x.clone()), Operand::new(a, 1)),
            Statement::assign(Operand::swizzled(t, y), Operand::new(a, 1)),
            Statement::assign(Operand::new(o, 1), Operand::swizzled(t, x)),
        ]
        .into_iter()
        .collect();
        let mut blocks = BlockList::new();
        blocks.push_basic(block);
        let mut graph = ControlGraph::from_blocks(blocks).unwrap();

        DefUseChains::build(&mut graph).unwrap();
        let stmts = statements_in_order(&graph);
        assert_eq!(
            stmts[2].tracking().unwrap().use_def[0],
            BTreeSet::from([stmts[0].id])
        );
        assert!(stmts[1].tracking().unwrap().def_use.is_empty());
    }

    #[test]
    fn test_defs_reaching_at_other_point() {
        let mut vars = VariableArena::new();
        let a = vars.add("a", VariableKind::Input, 1);
        let s = vars.add("s", VariableKind::Temp, 1);
        let t = vars.add("t", VariableKind::Temp, 1);

        let block: BasicBlock = vec![
            Statement::assign(Operand::new(s, 1), Operand::new(a, 1)),
            Statement::assign(Operand::new(t, 1), Operand::new(s, 1)),
            Statement::unary(Operand::new(s, 1), Operation::Neg, Operand::new(a, 1)),
            Statement::assign(Operand::new(a, 1), Operand::new(t, 1)),
        ]
        .into_iter()
        .collect();
        let mut blocks = BlockList::new();
        blocks.push_basic(block);
        let mut graph = ControlGraph::from_blocks(blocks).unwrap();

        let chains = DefUseChains::build(&mut graph).unwrap();
        let stmts = statements_in_order(&graph);
        let copy_at = chains.location(stmts[1].id).unwrap();
        let last_at = chains.location(stmts[3].id).unwrap();

        let s_read = Operand::new(s, 1);
        assert_eq!(chains.defs_reaching(copy_at, &s_read), BTreeSet::from([stmts[0].id]));
        assert_eq!(chains.defs_reaching(last_at, &s_read), BTreeSet::from([stmts[2].id]));
    }

    #[test]
    fn test_rebuild_replaces_stale_chains() {
        let mut vars = VariableArena::new();
        let a = vars.add("a", VariableKind::Input, 1);
        let o = vars.add("o", VariableKind::Output, 1);

        let mut blocks = BlockList::new();
        blocks.push_basic(
            std::iter::once(Statement::assign(Operand::new(o, 1), Operand::new(a, 1))).collect(),
        );
        let mut graph = ControlGraph::from_blocks(blocks).unwrap();

        let first = DefUseChains::build(&mut graph).unwrap();
        let second = DefUseChains::build(&mut graph).unwrap();
        assert_eq!(first.statement_count(), second.statement_count());
        let stmts = statements_in_order(&graph);
        assert_eq!(stmts[0].tracking(), Some(&ValueTracking::default()));
    }
}
