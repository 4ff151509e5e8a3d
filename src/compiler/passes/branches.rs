//! Branch guard protection.
//!
//! A conditional successor reads its guard operand, but that read lives on the
//! edge and not in any statement. Use-def chains therefore do not see it, and
//! dead code elimination would strip the statements computing the guard.
//! Before such a pass runs, every conditional successor gets an `OPTBRA guard`
//! marker appended to its node's block. `OPTBRA` is never removed as dead, so
//! the guard's definitions stay live. The markers are stripped again once the
//! pass is done.

use crate::{
    analysis::ControlGraph,
    ir::{Operand, Operation, Statement},
};

/// Appends an `OPTBRA guard` statement for every conditional successor of
/// every reachable node, creating the node's block if it has none.
///
/// Returns the number of markers inserted.
pub fn insert_branch_instructions(graph: &mut ControlGraph) -> usize {
    let mut inserted = 0;
    graph.dfs_mut(|_, node| {
        let guards: Vec<Operand> = node.successors.iter().map(|b| b.guard.clone()).collect();
        for guard in guards {
            node.block_mut()
                .add_statement(Statement::unary(Operand::null(), Operation::Optbra, guard));
            inserted += 1;
        }
    });
    inserted
}

/// Removes every `OPTBRA` statement from the reachable nodes.
///
/// A block that only held markers is dropped, so a node that had no block
/// before [`insert_branch_instructions`] has none afterwards either.
///
/// Returns the number of markers removed.
pub fn remove_branch_instructions(graph: &mut ControlGraph) -> usize {
    let mut removed = 0;
    graph.dfs_mut(|_, node| {
        let Some(block) = node.block.as_mut() else {
            return;
        };
        let before = block.len();
        block.retain(|stmt| stmt.op != Operation::Optbra);
        let dropped = before - block.len();
        if dropped > 0 && block.is_empty() {
            node.block = None;
        }
        removed += dropped;
    });
    removed
}
