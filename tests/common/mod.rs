//! Builders shared by the integration tests.

#![allow(dead_code)]

use shcore::{
    analysis::{CfgNodeId, ControlGraph},
    ir::{
        BasicBlock, Block, Operand, Operation, Statement, Token, TokenArgument, TokenKind, VarId,
        VariableArena, VariableKind,
    },
};

/// A basic block holding a single comment, used to tell nodes apart.
pub fn comment(text: &str) -> Block {
    Block::Basic(std::iter::once(Statement::annotated(Operation::Comment, text)).collect())
}

/// A basic block holding `stmts`.
pub fn code(stmts: Vec<Statement>) -> Block {
    Block::Basic(stmts.into_iter().collect())
}

/// A token without arguments.
pub fn token(kind: TokenKind) -> Block {
    Block::Token(Token::new(kind))
}

/// A token whose single argument is the ready-made `cond`.
pub fn guarded(kind: TokenKind, cond: &Operand) -> Block {
    Block::Token(Token::with_arguments(
        kind,
        vec![TokenArgument::value(cond.clone())],
    ))
}

/// A scalar variable of `kind`, as a whole-variable operand.
pub fn scalar(vars: &mut VariableArena, name: &str, kind: VariableKind) -> (VarId, Operand) {
    let var = vars.add(name, kind, 1);
    (var, Operand::new(var, 1))
}

/// All statements of reachable nodes, in depth-first order.
pub fn statements(graph: &ControlGraph) -> Vec<Statement> {
    graph
        .dfs()
        .flat_map(|(_, node)| node.block.iter().flat_map(BasicBlock::iter).cloned())
        .collect()
}

/// The node whose block starts with the comment `text`.
pub fn node_with_comment(graph: &ControlGraph, text: &str) -> Option<CfgNodeId> {
    graph.preorder().into_iter().find(|&id| {
        graph
            .node(id)
            .and_then(|node| node.block.as_ref())
            .and_then(BasicBlock::first)
            .and_then(Statement::comment)
            == Some(text)
    })
}

/// Asserts that `graph` has a single terminal node, the exit, and that every
/// reachable node leads somewhere.
pub fn assert_single_exit(graph: &ControlGraph) {
    for id in graph.preorder() {
        let node = graph.node(id).unwrap();
        if id == graph.exit() {
            assert!(node.is_terminal(), "exit {id} has outgoing edges");
        } else {
            assert!(!node.is_terminal(), "{id} is a dead end");
        }
    }
    assert!(graph.preorder().contains(&graph.exit()));
}
