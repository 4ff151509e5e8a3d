//! Empty block removal pass.
//!
//! A node without statements, declarations and conditional successors only
//! forwards control to its follower. Such a node is removed and every edge into
//! it is redirected to the follower. The entry node is never removed.

use crate::{
    analysis::{CfgNodeId, ControlGraph},
    compiler::{
        config::OptimizationPasses,
        context::CompilerContext,
        events::{EventKind, EventLog},
        pass::Pass,
    },
    Result,
};

/// Empty block removal pass.
pub struct EmptyBlockRemovalPass;

impl Default for EmptyBlockRemovalPass {
    fn default() -> Self {
        Self::new()
    }
}

impl EmptyBlockRemovalPass {
    /// Creates a new empty block removal pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the follower `id` forwards to, if the node can be removed.
    fn forwards_to(graph: &ControlGraph, id: CfgNodeId) -> Option<CfgNodeId> {
        if id == graph.entry() {
            return None;
        }
        let node = graph.node(id)?;
        let follower = node.follower?;
        let removable = follower != id
            && node.is_empty()
            && node.decls.is_empty()
            && node.successors.is_empty();
        removable.then_some(follower)
    }

    /// Removes `id` and points every edge into it at `follower`.
    fn bypass(graph: &mut ControlGraph, id: CfgNodeId, follower: CfgNodeId) {
        for other in graph.node_ids() {
            if let Some(node) = graph.node_mut(other) {
                node.remap_targets(|t| if t == id { follower } else { t });
            }
        }
        graph.remove_node(id);
    }
}

impl Pass for EmptyBlockRemovalPass {
    fn name(&self) -> &'static str {
        "empty-block-removal"
    }

    fn flag(&self) -> OptimizationPasses {
        OptimizationPasses::EMPTY_BLOCKS
    }

    fn min_level(&self) -> u32 {
        2
    }

    fn description(&self) -> &'static str {
        "Removes nodes that only forward control to their follower"
    }

    fn run(&self, graph: &mut ControlGraph, ctx: &CompilerContext) -> Result<bool> {
        let changes = EventLog::new();

        for id in graph.preorder() {
            let Some(follower) = Self::forwards_to(graph, id) else {
                continue;
            };
            Self::bypass(graph, id, follower);
            changes
                .record(EventKind::BlockRemoved)
                .pass(self.name())
                .node(id)
                .message(format!("forwarded to {follower}"));
        }

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
        ir::{
            BasicBlock, BlockList, Operand, Statement, Token, TokenArgument, TokenKind,
            VariableArena, VariableKind,
        },
    };

    #[test]
    fn test_removes_synthesized_else_and_merge() {
        let mut vars = VariableArena::new();
        let c = vars.add("c", VariableKind::Input, 1);
        let o = vars.add("o", VariableKind::Output, 1);

        let mut blocks = BlockList::new();
        blocks.push_token(Token::with_arguments(
            TokenKind::If,
            vec![TokenArgument::value(Operand::new(c, 1))],
        ));
        blocks.push_basic(
            std::iter::once(Statement::assign(Operand::new(o, 1), Operand::new(c, 1))).collect(),
        );
        blocks.push_token(Token::new(TokenKind::EndIf));
        let mut graph = ControlGraph::from_blocks(blocks).unwrap();
        let before = graph.preorder().len();

        let ctx = CompilerContext::new(&vars, OptimizerConfig::default());
        assert!(EmptyBlockRemovalPass::new().run(&mut graph, &ctx).unwrap());

        let after = graph.preorder();
        assert!(after.len() < before);
        assert!(after.contains(&graph.entry()));
        assert!(after.contains(&graph.exit()));
        // Every remaining non-entry node either has code, branches or ends the graph.
        for id in after {
            let node = graph.node(id).unwrap();
            assert!(
                id == graph.entry()
                    || !node.is_empty()
                    || !node.successors.is_empty()
                    || node.follower.is_none()
            );
        }
        assert!(graph.validate().is_ok());
        assert!(!EmptyBlockRemovalPass::new().run(&mut graph, &ctx).unwrap());
    }

    #[test]
    fn test_keeps_nodes_with_declarations() {
        let mut vars = VariableArena::new();
        let t = vars.add("t", VariableKind::Temp, 1);

        let mut graph = ControlGraph::new();
        let (entry, exit) = (graph.entry(), graph.exit());
        let mut decl = CfgNode::new();
        decl.add_decl(t);
        let decl = graph.add_node(decl);
        graph.node_mut(entry).unwrap().follower = None;
        graph.link(entry, decl).unwrap();
        graph.link(decl, exit).unwrap();

        let ctx = CompilerContext::new(&vars, OptimizerConfig::default());
        assert!(!EmptyBlockRemovalPass::new().run(&mut graph, &ctx).unwrap());
        assert_eq!(graph.preorder(), vec![entry, decl, exit]);
    }

    #[test]
    fn test_empty_self_loop_is_kept() {
        let vars = VariableArena::new();
        let mut graph = ControlGraph::new();
        let entry = graph.entry();
        let spin = graph.add_node(CfgNode::with_block(BasicBlock::new()));
        graph.node_mut(entry).unwrap().follower = None;
        graph.link(entry, spin).unwrap();
        graph.link(spin, spin).unwrap();

        let ctx = CompilerContext::new(&vars, OptimizerConfig::default());
        assert!(!EmptyBlockRemovalPass::new().run(&mut graph, &ctx).unwrap());
        assert!(graph.node(spin).is_some());
    }
}
