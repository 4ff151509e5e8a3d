//! Structural analysis integration tests.
//!
//! Graphs come out of the structured parser, so every one of them must reduce
//! to a single region. The tests check which regions the reduction finds on
//! the way and how region edges map back to graph edges.

mod common;

use common::{comment, guarded, node_with_comment, scalar, token};
use shcore::{
    analysis::{ControlGraph, Parser, StructId, StructuralAnalysis, StructuralKind},
    compiler::{CompilerContext, EmptyBlockRemovalPass, OptimizerConfig, Pass},
    ir::{Block, Token, TokenArgument, TokenKind, VariableArena, VariableKind},
    Result,
};

/// All regions ever created, collapsed ones included.
fn regions(tree: &StructuralAnalysis<'_>) -> Vec<StructId> {
    let mut all = Vec::new();
    let mut stack = vec![tree.head()];
    while let Some(id) = stack.pop() {
        all.push(id);
        if let Some(kind) = tree.kind(id) {
            stack.extend(kind.members());
        }
    }
    all
}

fn find_region<F>(tree: &StructuralAnalysis<'_>, pick: F) -> Option<StructId>
where
    F: Fn(&StructuralKind) -> bool,
{
    regions(tree)
        .into_iter()
        .find(|&id| tree.kind(id).is_some_and(&pick))
}

#[test]
fn test_if_else_region() -> Result<()> {
    let mut vars = VariableArena::new();
    let (_, c) = scalar(&mut vars, "c", VariableKind::Input);

    let graph = Parser::parse(
        [
            guarded(TokenKind::If, &c),
            comment("a"),
            token(TokenKind::Else),
            comment("b"),
            token(TokenKind::EndIf),
        ]
        .into_iter()
        .collect(),
    )?;
    let tree = StructuralAnalysis::new(&graph);
    assert!(tree.is_fully_reduced());

    let diamond =
        find_region(&tree, |kind| matches!(kind, StructuralKind::IfElse { .. })).unwrap();
    let a = node_with_comment(&graph, "a").unwrap();
    let b = node_with_comment(&graph, "b").unwrap();

    let mut inside = tree.leaves(diamond);
    inside.sort();
    let mut expected = vec![graph.entry(), a, b];
    expected.sort();
    assert_eq!(inside, expected);

    // Both arms leave the region towards the merge node.
    let exits = tree.get_exits(diamond, None);
    assert_eq!(exits.len(), 2);
    assert!(exits.iter().all(|edge| edge.to == graph.exit()));
    Ok(())
}

#[test]
fn test_empty_while_body() -> Result<()> {
    let mut vars = VariableArena::new();
    let (_, c) = scalar(&mut vars, "c", VariableKind::Input);

    let mut graph = ControlGraph::from_blocks(
        [guarded(TokenKind::While, &c), token(TokenKind::EndWhile)]
            .into_iter()
            .collect(),
    )?;

    // As parsed, the empty body still has a node of its own.
    let tree = StructuralAnalysis::new(&graph);
    assert!(tree.is_fully_reduced());
    let looped =
        find_region(&tree, |kind| matches!(kind, StructuralKind::WhileLoop { .. })).unwrap();
    assert_eq!(tree.leaves(looped).len(), 2);
    drop(tree);

    // Once empty nodes are gone the test node branches back to itself.
    let ctx = CompilerContext::new(&vars, OptimizerConfig::default());
    assert!(EmptyBlockRemovalPass::new().run(&mut graph, &ctx)?);

    let tree = StructuralAnalysis::new(&graph);
    assert!(tree.is_fully_reduced());
    let looped =
        find_region(&tree, |kind| matches!(kind, StructuralKind::SelfLoop { .. })).unwrap();
    let leaves = tree.leaves(looped);
    assert_eq!(leaves.len(), 1);
    let head = graph.node(leaves[0]).unwrap();
    assert_eq!(head.successors.len(), 1);
    assert_eq!(head.successors[0].target, leaves[0]);
    assert_eq!(head.successors[0].guard, c);
    Ok(())
}

#[test]
fn test_straight_chain_collapses_in_one_round() -> Result<()> {
    let graph = Parser::parse(
        ["one", "two", "three", "four", "five"]
            .into_iter()
            .map(comment)
            .collect(),
    )?;
    let tree = StructuralAnalysis::new(&graph);

    assert!(tree.is_fully_reduced());
    let Some(StructuralKind::Block { members }) = tree.kind(tree.head()) else {
        panic!("expected a block region");
    };
    assert_eq!(members.len(), 5);
    assert_eq!(tree.leaves(tree.head()), graph.preorder());
    // One collapsing round plus the round that finds nothing left to do.
    assert_eq!(tree.rounds(), 2);
    Ok(())
}

#[test]
fn test_parser_output_is_reducible() -> Result<()> {
    let mut vars = VariableArena::new();
    let (_, c) = scalar(&mut vars, "c", VariableKind::Input);
    let (_, d) = scalar(&mut vars, "d", VariableKind::Input);

    let graph = ControlGraph::from_blocks(
        [
            comment("start"),
            guarded(TokenKind::While, &c),
            guarded(TokenKind::If, &d),
            comment("then"),
            token(TokenKind::Else),
            token(TokenKind::Do),
            comment("inner"),
            guarded(TokenKind::Until, &d),
            token(TokenKind::EndIf),
            token(TokenKind::EndWhile),
            Block::Token(Token::start_section("tail")),
            comment("last"),
            token(TokenKind::EndSection),
        ]
        .into_iter()
        .collect(),
    )?;
    let tree = StructuralAnalysis::new(&graph);

    assert!(tree.is_fully_reduced());
    let mut covered = tree.leaves(tree.head());
    covered.sort();
    let mut reachable = graph.preorder();
    reachable.sort();
    assert_eq!(covered, reachable);

    assert!(find_region(&tree, |k| matches!(k, StructuralKind::WhileLoop { .. })).is_some());
    assert!(find_region(&tree, |k| matches!(k, StructuralKind::IfElse { .. })).is_some());
    let section = find_region(&tree, |k| matches!(k, StructuralKind::Section { .. })).unwrap();
    let Some(StructuralKind::Section { name, .. }) = tree.kind(section) else {
        unreachable!();
    };
    assert_eq!(name, "tail");
    Ok(())
}

#[test]
fn test_one_armed_if_after_cleanup() -> Result<()> {
    let mut vars = VariableArena::new();
    let (_, c) = scalar(&mut vars, "c", VariableKind::Input);

    let mut graph = ControlGraph::from_blocks(
        [
            Block::Token(Token::with_arguments(
                TokenKind::If,
                vec![TokenArgument::value(c)],
            )),
            comment("then"),
            token(TokenKind::EndIf),
            comment("after"),
        ]
        .into_iter()
        .collect(),
    )?;
    let ctx = CompilerContext::new(&vars, OptimizerConfig::default());
    EmptyBlockRemovalPass::new().run(&mut graph, &ctx)?;

    let tree = StructuralAnalysis::new(&graph);
    assert!(tree.is_fully_reduced());
    let region = find_region(&tree, |k| matches!(k, StructuralKind::If { .. })).unwrap();
    let then = node_with_comment(&graph, "then").unwrap();
    assert!(tree.contains(region, then));
    Ok(())
}
