//! Copy propagation pass.
//!
//! This pass replaces reads of a copied temporary with reads of the copy's
//! source. The copy itself is left in place; dead code elimination removes it
//! once nothing reads it anymore.
//!
//! # Example
//!
//! Before:
//! ```text
//! t := a(zyx)        // Copy
//! o := ADD t(x), b
//! ```
//!
//! After:
//! ```text
//! t := a(zyx)        // Can now be eliminated by DCE
//! o := ADD a(z), b
//! ```
//!
//! # Algorithm
//!
//! A copy is an assignment `t := s` to a whole temporary `t` from a different
//! variable `s`. A use of `t` is rewritten when:
//!
//! 1. its use-def set is exactly `{t := s}`, and
//! 2. the copy is *available* at the use: on every path from the entry the
//!    copy executes, and neither `t` nor `s` is written again before the use.
//!
//! Availability is a forward must-analysis solved with the regular
//! [`DataFlowSolver`]: its meet is intersection, every node starts with all
//! copies available and the entry starts with none. The rewritten operand
//! composes the two swizzles and combines the negation flags, see
//! [`Operand::substitute`].
//!
//! Sources are taken as they were before the pass, so a chain `u := t; t := s`
//! resolves one link per run. The optimizer's driver repeats the pass until
//! it finds nothing to do.

use std::collections::HashMap;

use crate::{
    analysis::{
        CfgNode, CfgNodeId, ControlGraph, DataFlowAnalysis, DataFlowSolver, DefUseChains,
        Direction, Location, MeetSemiLattice,
    },
    compiler::{
        config::OptimizationPasses,
        context::CompilerContext,
        events::{EventKind, EventLog},
        pass::Pass,
    },
    ir::{BasicBlock, Operand, Operation, Statement, StmtId, VarId, VariableArena, VariableKind},
    utils::BitSet,
    Result,
};

/// A copy `dest := source` found in the graph.
#[derive(Debug, Clone)]
struct CopyDef {
    stmt: StmtId,
    dest: VarId,
    source: Operand,
}

/// Set of copies available on every incoming path.
#[derive(Debug, Clone, PartialEq)]
struct AvailableSet(BitSet);

impl MeetSemiLattice for AvailableSet {
    /// Intersection: a copy is available only if it is available on all paths.
    fn meet(&self, other: &Self) -> Self {
        let mut result = self.0.clone();
        result.intersect_with(&other.0);
        Self(result)
    }
}

/// Available copies analysis.
struct AvailableCopies {
    copies: Vec<CopyDef>,
    by_stmt: HashMap<StmtId, usize>,
    /// Copies reading or writing each variable, killed by any write to it.
    touching: HashMap<VarId, Vec<usize>>,
}

impl AvailableCopies {
    /// Collects the copies of the reachable graph. Statement ids must be
    /// unique, which [`DefUseChains::build`] guarantees.
    fn new(graph: &ControlGraph, vars: &VariableArena) -> Result<Self> {
        let mut copies = Vec::new();
        for (_, node) in graph.dfs() {
            for stmt in node.block.iter().flat_map(BasicBlock::iter) {
                if let Some(copy) = Self::as_copy(stmt, vars)? {
                    copies.push(copy);
                }
            }
        }

        let mut by_stmt = HashMap::with_capacity(copies.len());
        let mut touching: HashMap<VarId, Vec<usize>> = HashMap::new();
        for (index, copy) in copies.iter().enumerate() {
            by_stmt.insert(copy.stmt, index);
            touching.entry(copy.dest).or_default().push(index);
            if let Some(source) = copy.source.var() {
                touching.entry(source).or_default().push(index);
            }
        }

        Ok(Self {
            copies,
            by_stmt,
            touching,
        })
    }

    /// Returns the copy `stmt` performs, if it is one.
    fn as_copy(stmt: &Statement, vars: &VariableArena) -> Result<Option<CopyDef>> {
        if stmt.op != Operation::Asn || !stmt.dest.has_identity_swizzle() {
            return Ok(None);
        }
        let (Some(dest), Some(source)) = (stmt.dest.var(), stmt.src[0].var()) else {
            return Ok(None);
        };
        if dest == source
            || stmt.src[0].size() != stmt.dest.size()
            || vars.kind(dest)? != VariableKind::Temp
        {
            return Ok(None);
        }
        Ok(Some(CopyDef {
            stmt: stmt.id,
            dest,
            source: stmt.src[0].clone(),
        }))
    }

    fn is_empty(&self) -> bool {
        self.copies.is_empty()
    }

    /// Updates `state` past `stmt`.
    fn apply(&self, stmt: &Statement, state: &mut BitSet) {
        if let Some(var) = stmt.defined_var() {
            for &copy in self.touching.get(&var).into_iter().flatten() {
                state.remove(copy);
            }
        }
        if let Some(&copy) = self.by_stmt.get(&stmt.id) {
            state.insert(copy);
        }
    }

    /// The copy supplying every component of `operand` at slot `slot` of
    /// `stmt`, if one is available in `state`.
    fn available_for(
        &self,
        stmt: &Statement,
        slot: usize,
        operand: &Operand,
        state: &BitSet,
    ) -> Option<&CopyDef> {
        let var = operand.var()?;
        let defs = &stmt.tracking()?.use_def[slot];
        if defs.len() != 1 {
            return None;
        }
        let index = *self.by_stmt.get(defs.iter().next()?)?;
        let copy = &self.copies[index];
        (copy.dest == var && state.contains(index)).then_some(copy)
    }
}

impl DataFlowAnalysis for AvailableCopies {
    type Lattice = AvailableSet;
    const DIRECTION: Direction = Direction::Forward;

    fn boundary(&self, _graph: &ControlGraph) -> AvailableSet {
        AvailableSet(BitSet::new(self.copies.len()))
    }

    fn initial(&self, _graph: &ControlGraph) -> AvailableSet {
        AvailableSet(BitSet::full(self.copies.len()))
    }

    fn transfer(&self, _id: CfgNodeId, node: &CfgNode, input: &AvailableSet) -> AvailableSet {
        let mut state = input.0.clone();
        for stmt in node.block.iter().flat_map(BasicBlock::iter) {
            self.apply(stmt, &mut state);
        }
        AvailableSet(state)
    }
}

/// A planned rewrite of one source slot.
struct Rewrite {
    at: Location,
    slot: usize,
    operand: Operand,
    copy: StmtId,
}

/// Copy propagation pass.
///
/// Handles whole-variable copies between any variables as long as the
/// destination is a temporary. Swizzled and negated uses are rewritten by
/// composition.
pub struct CopyPropagationPass;

impl Default for CopyPropagationPass {
    fn default() -> Self {
        Self::new()
    }
}

impl CopyPropagationPass {
    /// Creates a new copy propagation pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Finds every use that can read the copy source instead.
    fn plan(graph: &mut ControlGraph, vars: &VariableArena) -> Result<Vec<Rewrite>> {
        DefUseChains::build(graph)?;
        let analysis = AvailableCopies::new(graph, vars)?;
        if analysis.is_empty() {
            return Ok(Vec::new());
        }

        let mut solver = DataFlowSolver::new(analysis);
        let results = solver.solve(graph);
        let analysis = solver.into_analysis();

        let mut rewrites = Vec::new();
        for (id, node) in graph.dfs() {
            let Some(input) = results.in_state(id) else {
                continue;
            };
            let mut state = input.0.clone();
            for (index, stmt) in node.block.iter().flat_map(BasicBlock::iter).enumerate() {
                for (slot, operand) in stmt.sources().iter().enumerate() {
                    if let Some(copy) = analysis.available_for(stmt, slot, operand, &state) {
                        rewrites.push(Rewrite {
                            at: Location::new(id, index),
                            slot,
                            operand: operand.substitute(&copy.source)?,
                            copy: copy.stmt,
                        });
                    }
                }
                analysis.apply(stmt, &mut state);
            }
        }
        Ok(rewrites)
    }
}

impl Pass for CopyPropagationPass {
    fn name(&self) -> &'static str {
        "copy-propagation"
    }

    fn flag(&self) -> OptimizationPasses {
        OptimizationPasses::COPY_PROPAGATION
    }

    fn description(&self) -> &'static str {
        "Propagates copy operations, replacing uses with original sources"
    }

    fn run(&self, graph: &mut ControlGraph, ctx: &CompilerContext) -> Result<bool> {
        let rewrites = Self::plan(graph, ctx.vars)?;
        let changes = EventLog::new();

        for rewrite in rewrites {
            let stmt = graph
                .try_node_mut(rewrite.at.node)?
                .block_mut()
                .get_mut(rewrite.at.index)
                .ok_or_else(|| internal_error!("no statement at {}", rewrite.at))?;
            let before = stmt.src[rewrite.slot].display_with(|v| ctx.vars.name(v));
            stmt.src[rewrite.slot] = rewrite.operand;
            changes
                .record(EventKind::CopyPropagated)
                .pass(self.name())
                .node(rewrite.at.node)
                .stmt(stmt.id)
                .message(format!(
                    "{before} -> {} (copy {})",
                    stmt.src[rewrite.slot].display_with(|v| ctx.vars.name(v)),
                    rewrite.copy
                ));
        }

        let changed = !changes.is_empty();
        if changed {
            ctx.events.merge(changes);
        }
        Ok(changed)
    }
}
