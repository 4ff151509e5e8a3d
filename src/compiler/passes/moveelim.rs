//! Move elimination pass.
//!
//! Folds a temporary that only exists to be moved somewhere else:
//!
//! ```text
//! t := ADD a, b          x := ADD a, b
//! ...              =>    ...
//! x := t
//! ```
//!
//! The move `x := t` takes over the operation and sources of the statement
//! defining `t`, and that statement is removed. The fold is local to a block
//! and requires that:
//!
//! - `t` is a temporary, read by the move as a whole without negation
//! - the move is the only statement reading that definition of `t`, and that
//!   definition is the only one reaching the move
//! - no variable read by the defining statement is written in between
//!
//! Each statement takes part in at most one fold per run, so a chain
//! `t := e; u := t; x := u` needs two runs.

use std::collections::{BTreeSet, HashSet};

use crate::{
    analysis::{CfgNodeId, ControlGraph, DefUseChains},
    compiler::{
        config::OptimizationPasses,
        context::CompilerContext,
        events::{EventKind, EventLog},
        pass::Pass,
    },
    ir::{BasicBlock, Operation, Statement, StmtId, VarId, VariableArena, VariableKind},
    Result,
};

/// A planned fold of `producer` into `mover`, both in `node`.
struct Fold {
    node: CfgNodeId,
    producer: StmtId,
    mover: StmtId,
}

/// Move elimination pass.
pub struct MoveEliminationPass;

impl Default for MoveEliminationPass {
    fn default() -> Self {
        Self::new()
    }
}

impl MoveEliminationPass {
    /// Creates a new move elimination pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the temporary moved by `stmt`, if it is a plain move of one.
    fn moved_temp(stmt: &Statement, vars: &VariableArena) -> Result<Option<VarId>> {
        let source = &stmt.src[0];
        if stmt.op != Operation::Asn
            || stmt.dest.is_null()
            || source.negated()
            || !source.has_identity_swizzle()
        {
            return Ok(None);
        }
        match source.var() {
            Some(var) if vars.kind(var)? == VariableKind::Temp => Ok(Some(var)),
            _ => Ok(None),
        }
    }

    /// Finds the producer of the move at `index`, if it can be folded.
    fn producer_of(
        block: &BasicBlock,
        index: usize,
        temp: VarId,
        taken: &HashSet<StmtId>,
    ) -> Option<usize> {
        let mover = block.get(index)?;
        let defs = &mover.tracking()?.use_def[0];
        if defs.len() != 1 {
            return None;
        }
        let def = *defs.iter().next()?;
        let at = block.iter().take(index).position(|s| s.id == def)?;
        let producer = block.get(at)?;

        if taken.contains(&producer.id)
            || producer.defined_var() != Some(temp)
            || !producer.dest.has_identity_swizzle()
            || producer.tracking()?.def_use != BTreeSet::from([mover.id])
        {
            return None;
        }

        let reads: Vec<VarId> = producer.sources().iter().filter_map(|s| s.var()).collect();
        let clobbered = block
            .iter()
            .skip(at + 1)
            .take(index - at - 1)
            .filter_map(Statement::defined_var)
            .any(|v| reads.contains(&v));
        (!clobbered).then_some(at)
    }

    fn plan(graph: &mut ControlGraph, vars: &VariableArena) -> Result<Vec<Fold>> {
        DefUseChains::build(graph)?;

        let mut folds = Vec::new();
        for (id, node) in graph.dfs() {
            let Some(block) = node.block.as_ref() else {
                continue;
            };
            let mut taken = HashSet::new();
            for (index, stmt) in block.iter().enumerate() {
                if taken.contains(&stmt.id) {
                    continue;
                }
                let Some(temp) = Self::moved_temp(stmt, vars)? else {
                    continue;
                };
                let Some(at) = Self::producer_of(block, index, temp, &taken) else {
                    continue;
                };
                let producer = block.get(at).map(|s| s.id);
                if let Some(producer) = producer {
                    taken.insert(producer);
                    taken.insert(stmt.id);
                    folds.push(Fold {
                        node: id,
                        producer,
                        mover: stmt.id,
                    });
                }
            }
        }
        Ok(folds)
    }
}

impl Pass for MoveEliminationPass {
    fn name(&self) -> &'static str {
        "move-elimination"
    }

    fn flag(&self) -> OptimizationPasses {
        OptimizationPasses::MOVE_ELIMINATION
    }

    fn description(&self) -> &'static str {
        "Folds single-use temporaries into the move that reads them"
    }

    fn run(&self, graph: &mut ControlGraph, ctx: &CompilerContext) -> Result<bool> {
        let folds = Self::plan(graph, ctx.vars)?;
        let changes = EventLog::new();

        for fold in folds {
            let block = graph.try_node_mut(fold.node)?.block_mut();
            let position = |id: StmtId| block.iter().position(|s| s.id == id);
            let (Some(at), Some(_)) = (position(fold.producer), position(fold.mover)) else {
                return Err(internal_error!(
                    "move {} lost its producer {} in {}",
                    fold.mover,
                    fold.producer,
                    fold.node
                ));
            };
            let Some(producer) = block.remove(at) else {
                continue;
            };
            let Some(mover) = block.iter_mut().find(|s| s.id == fold.mover) else {
                continue;
            };
            mover.op = producer.op;
            mover.src = producer.src;

            changes
                .record(EventKind::MoveEliminated)
                .pass(self.name())
                .node(fold.node)
                .stmt(fold.mover)
                .message(mover.display_with(|v| ctx.vars.name(v)));
        }

        let changed = !changes.is_empty();
        if changed {
            ctx.events.merge(changes);
        }
        Ok(changed)
    }
}
