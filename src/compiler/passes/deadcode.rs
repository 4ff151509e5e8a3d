//! Dead code elimination pass.
//!
//! Removes statements whose results never reach anything observable.
//!
//! # Algorithm
//!
//! 1. Protect branch guards with `OPTBRA` markers, see
//!    [`insert_branch_instructions`]
//! 2. Build use-def chains
//! 3. Seed the live set with every statement that is observable on its own:
//!    - operations without a result (`KIL`, `OPTBRA`, `RET`, markers)
//!    - writes to any variable that is not a temporary
//! 4. Propagate liveness backwards along use-def chains with a worklist
//! 5. Remove every statement that is not live, then strip the markers
//!
//! # Example
//!
//! Before:
//! ```text
//! t1 := ADD a, b
//! t2 := MUL t1, two
//! out := ADD a, one
//! ```
//!
//! After:
//! ```text
//! out := ADD a, one
//! ```

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::{
    analysis::{ControlGraph, DefUseChains},
    compiler::{
        config::OptimizationPasses,
        context::CompilerContext,
        events::{EventKind, EventLog},
        pass::Pass,
        passes::branches::{insert_branch_instructions, remove_branch_instructions},
    },
    ir::{BasicBlock, Statement, StmtId, VariableArena},
    Result,
};

/// Dead code elimination pass.
pub struct DeadCodeEliminationPass;

impl Default for DeadCodeEliminationPass {
    fn default() -> Self {
        Self::new()
    }
}

impl DeadCodeEliminationPass {
    /// Creates a new dead code elimination pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns true if `stmt` must stay no matter who reads its result.
    fn is_root(stmt: &Statement, vars: &VariableArena) -> Result<bool> {
        if !stmt.op.yields_result() {
            return Ok(true);
        }
        match stmt.dest.var() {
            Some(var) => Ok(vars.kind(var)?.is_observable()),
            None => Ok(true),
        }
    }

    /// Computes the live statements of a graph whose chains are built.
    fn mark_live(graph: &ControlGraph, vars: &VariableArena) -> Result<HashSet<StmtId>> {
        let mut live = HashSet::new();
        let mut worklist = Vec::new();

        for (_, node) in graph.dfs() {
            for stmt in node.block.iter().flat_map(BasicBlock::iter) {
                if Self::is_root(stmt, vars)? && live.insert(stmt.id) {
                    worklist.push(stmt.id);
                }
            }
        }

        let use_defs: HashMap<StmtId, &[BTreeSet<StmtId>; 3]> = graph
            .dfs()
            .flat_map(|(_, node)| node.block.iter().flat_map(BasicBlock::iter))
            .filter_map(|stmt| stmt.tracking().map(|t| (stmt.id, &t.use_def)))
            .collect();

        while let Some(id) = worklist.pop() {
            let Some(chains) = use_defs.get(&id) else {
                continue;
            };
            for &def in chains.iter().flatten() {
                if live.insert(def) {
                    worklist.push(def);
                }
            }
        }

        Ok(live)
    }

    fn sweep(
        graph: &mut ControlGraph,
        vars: &VariableArena,
        changes: &EventLog,
        name: &'static str,
    ) -> Result<usize> {
        DefUseChains::build(graph)?;
        let live = Self::mark_live(graph, vars)?;

        let mut removed = 0;
        graph.dfs_mut(|id, node| {
            let Some(block) = node.block.as_mut() else {
                return;
            };
            block.retain(|stmt| {
                if live.contains(&stmt.id) {
                    return true;
                }
                changes
                    .record(EventKind::StatementRemoved)
                    .pass(name)
                    .node(id)
                    .stmt(stmt.id)
                    .message(stmt.display_with(|v| vars.name(v)));
                removed += 1;
                false
            });
        });
        Ok(removed)
    }
}

impl Pass for DeadCodeEliminationPass {
    fn name(&self) -> &'static str {
        "dead-code-elimination"
    }

    fn flag(&self) -> OptimizationPasses {
        OptimizationPasses::DEAD_CODE
    }

    fn description(&self) -> &'static str {
        "Removes statements that do not contribute to an observable result"
    }

    fn run(&self, graph: &mut ControlGraph, ctx: &CompilerContext) -> Result<bool> {
        let changes = EventLog::new();

        let protected = insert_branch_instructions(graph);
        if protected > 0 {
            changes
                .record(EventKind::GuardsProtected)
                .pass(self.name())
                .message(format!("{protected} branch guards"));
        }

        let swept = Self::sweep(graph, ctx.vars, &changes, self.name());
        remove_branch_instructions(graph);
        let removed = swept?;

        if !changes.is_empty() {
            ctx.events.merge(changes);
        }
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compiler::OptimizerConfig,
        ir::{BlockList, Operand, Operation, Token, TokenArgument, TokenKind, VariableKind},
    };

    fn statements(graph: &ControlGraph) -> Vec<Statement> {
        graph
            .dfs()
            .flat_map(|(_, node)| node.block.iter().flat_map(BasicBlock::iter).cloned())
            .collect()
    }

    #[test]
    fn test_removes_unused_chain() {
        let mut vars = VariableArena::new();
        let a = vars.add("a", VariableKind::Input, 1);
        let b = vars.add("b", VariableKind::Input, 1);
        let two = vars.add("two", VariableKind::Constant, 1);
        let one = vars.add("one", VariableKind::Constant, 1);
        let t1 = vars.add("t1", VariableKind::Temp, 1);
        let t2 = vars.add("t2", VariableKind::Temp, 1);
        let out = vars.add("out", VariableKind::Output, 1);

        let block: BasicBlock = vec![
            Statement::binary(
                Operand::new(t1, 1),
                Operation::Add,
                Operand::new(a, 1),
                Operand::new(b, 1),
            ),
            Statement::binary(
                Operand::new(t2, 1),
                Operation::Mul,
                Operand::new(t1, 1),
                Operand::new(two, 1),
            ),
            Statement::binary(
                Operand::new(out, 1),
                Operation::Add,
                Operand::new(a, 1),
                Operand::new(one, 1),
            ),
        ]
        .into_iter()
        .collect();
        let mut blocks = BlockList::new();
        blocks.push_basic(block);
        let mut graph = ControlGraph::from_blocks(blocks).unwrap();

        let ctx = CompilerContext::new(&vars, OptimizerConfig::default());
        assert!(DeadCodeEliminationPass::new().run(&mut graph, &ctx).unwrap());

        let left = statements(&graph);
        assert_eq!(left.len(), 1);
        assert!(left[0].dest.refers_to(out));
        assert_eq!(ctx.events.count_kind(EventKind::StatementRemoved), 2);

        // Nothing left to remove.
        assert!(!DeadCodeEliminationPass::new().run(&mut graph, &ctx).unwrap());
    }

    #[test]
    fn test_keeps_branch_guard_computation() {
        let mut vars = VariableArena::new();
        let a = vars.add("a", VariableKind::Input, 1);
        let c = vars.add("c", VariableKind::Temp, 1);
        let out = vars.add("out", VariableKind::Output, 1);

        let guard: BasicBlock = [Statement::binary(
            Operand::new(c, 1),
            Operation::Slt,
            Operand::new(a, 1),
            Operand::new(a, 1),
        )]
        .into_iter()
        .collect();
        let body: BasicBlock = [Statement::assign(Operand::new(out, 1), Operand::new(a, 1))]
            .into_iter()
            .collect();

        let mut cond = BlockList::new();
        cond.push_basic(guard);

        let mut blocks = BlockList::new();
        blocks.push_token(Token::with_arguments(
            TokenKind::If,
            vec![TokenArgument::new(Operand::new(c, 1), cond)],
        ));
        blocks.push_basic(body);
        blocks.push_token(Token::new(TokenKind::EndIf));
        let mut graph = ControlGraph::from_blocks(blocks).unwrap();
        let before = statements(&graph).len();

        let ctx = CompilerContext::new(&vars, OptimizerConfig::default());
        assert!(!DeadCodeEliminationPass::new().run(&mut graph, &ctx).unwrap());

        let after = statements(&graph);
        assert_eq!(after.len(), before);
        assert!(after.iter().all(|s| s.op != Operation::Optbra));
        assert!(ctx.events.has(EventKind::GuardsProtected));
    }

    #[test]
    fn test_kill_is_always_live() {
        let mut vars = VariableArena::new();
        let t = vars.add("t", VariableKind::Temp, 1);
        let a = vars.add("a", VariableKind::Input, 1);

        let block: BasicBlock = vec![
            Statement::assign(Operand::new(t, 1), Operand::new(a, 1)),
            Statement::unary(Operand::null(), Operation::Kil, Operand::new(t, 1)),
        ]
        .into_iter()
        .collect();
        let mut blocks = BlockList::new();
        blocks.push_basic(block);
        let mut graph = ControlGraph::from_blocks(blocks).unwrap();

        let ctx = CompilerContext::new(&vars, OptimizerConfig::default());
        assert!(!DeadCodeEliminationPass::new().run(&mut graph, &ctx).unwrap());
        assert_eq!(statements(&graph).len(), 2);
    }

    #[test]
    fn test_stale_variable_is_an_error() {
        let mut vars = VariableArena::new();
        let t = vars.add("t", VariableKind::Temp, 1);
        let a = vars.add("a", VariableKind::Input, 1);
        assert!(vars.remove(t).is_some());

        let block: BasicBlock = [Statement::assign(Operand::new(t, 1), Operand::new(a, 1))]
            .into_iter()
            .collect();
        let mut blocks = BlockList::new();
        blocks.push_basic(block);
        let mut graph = ControlGraph::from_blocks(blocks).unwrap();

        let ctx = CompilerContext::new(&vars, OptimizerConfig::default());
        assert!(DeadCodeEliminationPass::new().run(&mut graph, &ctx).is_err());
        // The markers are gone even though the pass failed.
        assert!(statements(&graph).iter().all(|s| s.op != Operation::Optbra));
    }
}
