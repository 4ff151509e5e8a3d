//! Redundant edge removal pass.
//!
//! A conditional successor that targets the node's own follower changes
//! nothing: whether the guard holds or not, control ends up in the same place.
//! Such edges are dropped. The guard computation itself is left for dead code
//! elimination.

use crate::{
    analysis::ControlGraph,
    compiler::{
        config::OptimizationPasses,
        context::CompilerContext,
        events::{EventKind, EventLog},
        pass::Pass,
    },
    Result,
};

/// Redundant edge removal pass.
pub struct RedundantEdgeRemovalPass;

impl Default for RedundantEdgeRemovalPass {
    fn default() -> Self {
        Self::new()
    }
}

impl RedundantEdgeRemovalPass {
    /// Creates a new redundant edge removal pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Pass for RedundantEdgeRemovalPass {
    fn name(&self) -> &'static str {
        "redundant-edge-removal"
    }

    fn flag(&self) -> OptimizationPasses {
        OptimizationPasses::REDUNDANT_EDGES
    }

    fn min_level(&self) -> u32 {
        2
    }

    fn description(&self) -> &'static str {
        "Drops conditional edges that lead to the follower"
    }

    fn run(&self, graph: &mut ControlGraph, ctx: &CompilerContext) -> Result<bool> {
        let changes = EventLog::new();
        let name = self.name();

        graph.dfs_mut(|id, node| {
            let Some(follower) = node.follower else {
                return;
            };
            node.successors.retain(|branch| {
                if branch.target != follower {
                    return true;
                }
                changes
                    .record(EventKind::EdgeRemoved)
                    .pass(name)
                    .node(id)
                    .message(format!(
                        "[{}] -> {follower}",
                        branch.guard.display_with(|v| ctx.vars.name(v))
                    ));
                false
            });
        });

        let changed = !changes.is_empty();
        if changed {
            graph.invalidate_predecessors();
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
        ir::{Operand, VariableArena, VariableKind},
    };

    #[test]
    fn test_edge_to_follower_is_removed() {
        let mut vars = VariableArena::new();
        let g = vars.add("g", VariableKind::Temp, 1);
        let h = vars.add("h", VariableKind::Temp, 1);

        let mut graph = ControlGraph::new();
        let (entry, exit) = (graph.entry(), graph.exit());
        let side = graph.add_node(CfgNode::new());
        graph.link(side, exit).unwrap();
        graph.link_guarded(entry, exit, Operand::new(g, 1)).unwrap();
        graph.link_guarded(entry, side, Operand::new(h, 1)).unwrap();

        let ctx = CompilerContext::new(&vars, OptimizerConfig::default());
        assert!(RedundantEdgeRemovalPass::new().run(&mut graph, &ctx).unwrap());

        let node = graph.node(entry).unwrap();
        assert_eq!(node.successors.len(), 1);
        assert_eq!(node.successors[0].target, side);
        assert_eq!(node.follower, Some(exit));
        assert_eq!(ctx.events.count_kind(EventKind::EdgeRemoved), 1);

        assert!(!RedundantEdgeRemovalPass::new().run(&mut graph, &ctx).unwrap());
    }
}
