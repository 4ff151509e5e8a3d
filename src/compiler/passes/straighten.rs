//! Straightening pass.
//!
//! Merges a node with its follower when control can only flow from one to the
//! other. The follower's statements are appended to the node's block, and the
//! node takes over the follower's declarations, conditional successors and
//! follower. A chain of such nodes collapses into one node.
//!
//! A node `a` is merged with its follower `b` when:
//!
//! - `a` is not the entry and has no conditional successors
//! - `b` is not the exit, not `a` itself, and has `a` as its only predecessor
//! - `a` does not close a section and `b` does not open one, so section
//!   markers stay at the boundary of their own nodes

use crate::{
    analysis::{CfgNodeId, ControlGraph},
    compiler::{
        config::OptimizationPasses,
        context::CompilerContext,
        events::{EventKind, EventLog},
        pass::Pass,
    },
    ir::Operation,
    Result,
};

/// Straightening pass.
pub struct StraighteningPass;

impl Default for StraighteningPass {
    fn default() -> Self {
        Self::new()
    }
}

impl StraighteningPass {
    /// Creates a new straightening pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the follower `id` can absorb. Predecessor lists must be fresh.
    fn mergeable(graph: &ControlGraph, id: CfgNodeId) -> Result<Option<CfgNodeId>> {
        if id == graph.entry() {
            return Ok(None);
        }
        let Some(node) = graph.node(id) else {
            return Ok(None);
        };
        let Some(next) = node.follower else {
            return Ok(None);
        };
        if next == id
            || next == graph.exit()
            || !node.successors.is_empty()
            || node.ends_with(Operation::EndSection)
        {
            return Ok(None);
        }
        let follower = graph.try_node(next)?;
        if follower.starts_with(Operation::StartSection) || graph.predecessors(next)?.len() != 1 {
            return Ok(None);
        }
        Ok(Some(next))
    }

    /// Moves everything of `next` into `id` and removes `next`.
    fn merge(graph: &mut ControlGraph, id: CfgNodeId, next: CfgNodeId) -> Result<()> {
        let absorbed = graph
            .remove_node(next)
            .ok_or_else(|| internal_error!("follower {} of {} vanished", next, id))?;
        let node = graph.try_node_mut(id)?;

        if let Some(mut block) = absorbed.block {
            node.block_mut().append(&mut block);
        }
        node.decls.extend(absorbed.decls);
        node.successors = absorbed.successors;
        node.follower = absorbed.follower;
        Ok(())
    }
}

impl Pass for StraighteningPass {
    fn name(&self) -> &'static str {
        "straightening"
    }

    fn flag(&self) -> OptimizationPasses {
        OptimizationPasses::STRAIGHTEN
    }

    fn min_level(&self) -> u32 {
        2
    }

    fn description(&self) -> &'static str {
        "Merges nodes with a follower that has no other predecessor"
    }

    fn run(&self, graph: &mut ControlGraph, ctx: &CompilerContext) -> Result<bool> {
        let changes = EventLog::new();
        graph.compute_predecessors();

        for id in graph.preorder() {
            while let Some(next) = Self::mergeable(graph, id)? {
                Self::merge(graph, id, next)?;
                graph.compute_predecessors();
                changes
                    .record(EventKind::BlocksMerged)
                    .pass(self.name())
                    .node(id)
                    .message(format!("absorbed {next}"));
            }
        }

        let changed = !changes.is_empty();
        if changed {
            ctx.events.merge(changes);
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::CfgNode,
        compiler::OptimizerConfig,
        ir::{BasicBlock, Operand, Statement, VariableArena, VariableKind},
    };

    fn chain(
        vars: &mut VariableArena,
        length: usize,
    ) -> (ControlGraph, Vec<CfgNodeId>, Vec<Statement>) {
        let a = vars.add("a", VariableKind::Input, 1);
        let mut graph = ControlGraph::new();
        let (entry, exit) = (graph.entry(), graph.exit());
        graph.node_mut(entry).unwrap().follower = None;

        let mut ids = Vec::new();
        let mut stmts = Vec::new();
        let mut last = entry;
        for i in 0..length {
            let t = vars.add(format!("t{i}"), VariableKind::Temp, 1);
            let stmt = Statement::assign(Operand::new(t, 1), Operand::new(a, 1));
            stmts.push(stmt.clone());
            let id = graph.add_node(CfgNode::with_block(
                std::iter::once(stmt).collect::<BasicBlock>(),
            ));
            graph.link(last, id).unwrap();
            ids.push(id);
            last = id;
        }
        graph.link(last, exit).unwrap();
        (graph, ids, stmts)
    }

    #[test]
    fn test_chain_collapses_in_order() {
        let mut vars = VariableArena::new();
        let (mut graph, ids, stmts) = chain(&mut vars, 5);

        let ctx = CompilerContext::new(&vars, OptimizerConfig::default());
        assert!(StraighteningPass::new().run(&mut graph, &ctx).unwrap());

        assert_eq!(graph.preorder(), vec![graph.entry(), ids[0], graph.exit()]);
        let merged: Vec<Statement> = graph
            .node(ids[0])
            .unwrap()
            .block
            .iter()
            .flat_map(BasicBlock::iter)
            .cloned()
            .collect();
        assert_eq!(merged, stmts);
        assert_eq!(ctx.events.count_kind(EventKind::BlocksMerged), 4);
        assert!(!StraighteningPass::new().run(&mut graph, &ctx).unwrap());
    }

    #[test]
    fn test_join_point_is_not_merged() {
        let mut vars = VariableArena::new();
        let (mut graph, ids, _) = chain(&mut vars, 3);
        let g = vars.add("g", VariableKind::Temp, 1);
        // A second way into the last node.
        graph
            .link_guarded(graph.entry(), ids[2], Operand::new(g, 1))
            .unwrap();

        let ctx = CompilerContext::new(&vars, OptimizerConfig::default());
        assert!(StraighteningPass::new().run(&mut graph, &ctx).unwrap());
        assert!(graph.node(ids[1]).is_none());
        assert!(graph.node(ids[2]).is_some());
        assert_eq!(graph.node(ids[0]).unwrap().follower, Some(ids[2]));
    }

    #[test]
    fn test_section_boundaries_are_kept() {
        let mut vars = VariableArena::new();
        let (mut graph, ids, _) = chain(&mut vars, 3);
        graph
            .node_mut(ids[1])
            .unwrap()
            .block_mut()
            .prepend_statement(Statement::annotated(Operation::StartSection, "s"));
        graph
            .node_mut(ids[1])
            .unwrap()
            .block_mut()
            .add_statement(Statement::annotated(Operation::EndSection, "s"));

        let ctx = CompilerContext::new(&vars, OptimizerConfig::default());
        assert!(!StraighteningPass::new().run(&mut graph, &ctx).unwrap());
        assert_eq!(graph.preorder().len(), 5);
    }
}
