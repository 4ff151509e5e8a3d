//! Benchmarks for the analysis and optimization pipeline.
//!
//! Every benchmark works on the same generated program: a sequence of loops,
//! each holding an if/else and a chain of temporaries of which only the last
//! value reaches an output.
//! - Parsing the block list into a control graph
//! - Structural analysis of the parsed graph
//! - Def-use chain construction
//! - The full optimizer at its default level

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use shcore::{
    analysis::{DefUseChains, StructuralAnalysis},
    compiler::OptimizerConfig,
    ir::{
        Block, BlockList, Operand, Operation, Statement, Token, TokenArgument, TokenKind,
        VariableArena, VariableKind,
    },
    ControlGraph, Program,
};
use std::hint::black_box;

const LOOPS: usize = 16;
const CHAIN: usize = 8;

fn scalar(vars: &mut VariableArena, name: &str, kind: VariableKind) -> Operand {
    Operand::new(vars.add(name, kind, 1), 1)
}

fn guarded(kind: TokenKind, cond: &Operand) -> Block {
    Block::Token(Token::with_arguments(
        kind,
        vec![TokenArgument::value(cond.clone())],
    ))
}

/// Variables plus a builder for the block list, since blocks are consumed by
/// every parse.
fn nested_program() -> (VariableArena, impl Fn() -> BlockList) {
    let mut vars = VariableArena::new();
    let cond = scalar(&mut vars, "c", VariableKind::Input);
    let input = scalar(&mut vars, "a", VariableKind::Input);
    let one = scalar(&mut vars, "one", VariableKind::Constant);
    let temps: Vec<Operand> = (0..CHAIN)
        .map(|i| scalar(&mut vars, &format!("t{i}"), VariableKind::Temp))
        .collect();
    let outputs: Vec<Operand> = (0..LOOPS)
        .map(|i| scalar(&mut vars, &format!("o{i}"), VariableKind::Output))
        .collect();

    let build = move || {
        let mut blocks = BlockList::new();
        for out in &outputs {
            let mut chain = vec![Statement::assign(temps[0].clone(), input.clone())];
            for pair in temps.windows(2) {
                chain.push(Statement::binary(
                    pair[1].clone(),
                    Operation::Add,
                    pair[0].clone(),
                    one.clone(),
                ));
            }

            blocks.push(guarded(TokenKind::While, &cond));
            blocks.push(guarded(TokenKind::If, &cond));
            blocks.push(Block::Basic(chain.into_iter().collect()));
            blocks.push(Block::Token(Token::new(TokenKind::Else)));
            blocks.push(Block::Basic(
                std::iter::once(Statement::assign(temps[0].clone(), one.clone())).collect(),
            ));
            blocks.push(Block::Token(Token::new(TokenKind::EndIf)));
            blocks.push(Block::Basic(
                std::iter::once(Statement::assign(out.clone(), temps[CHAIN - 1].clone()))
                    .collect(),
            ));
            blocks.push(Block::Token(Token::new(TokenKind::EndWhile)));
        }
        blocks
    };
    (vars, build)
}

fn bench_parse(c: &mut Criterion) {
    let (_, blocks) = nested_program();

    c.bench_function("parse_nested", |b| {
        b.iter_batched(
            &blocks,
            |list| black_box(ControlGraph::from_blocks(list).unwrap()),
            BatchSize::SmallInput,
        );
    });
}

fn bench_structural(c: &mut Criterion) {
    let (_, blocks) = nested_program();
    let graph = ControlGraph::from_blocks(blocks()).unwrap();

    c.bench_function("structural_nested", |b| {
        b.iter(|| {
            let tree = StructuralAnalysis::new(black_box(&graph));
            black_box(tree.is_fully_reduced())
        });
    });
}

fn bench_def_use(c: &mut Criterion) {
    let (_, blocks) = nested_program();
    let graph = ControlGraph::from_blocks(blocks()).unwrap();

    c.bench_function("def_use_nested", |b| {
        b.iter_batched(
            || graph.copy(),
            |mut graph| black_box(DefUseChains::build(&mut graph).unwrap()),
            BatchSize::SmallInput,
        );
    });
}

fn bench_optimize(c: &mut Criterion) {
    let (vars, blocks) = nested_program();

    c.bench_function("optimize_nested", |b| {
        b.iter_batched(
            || Program::from_blocks(blocks(), vars.clone()).unwrap(),
            |mut program| black_box(program.optimize(OptimizerConfig::default()).unwrap()),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_parse,
    bench_structural,
    bench_def_use,
    bench_optimize
);
criterion_main!(benches);
