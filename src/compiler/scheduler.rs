//! Optimizer driver.
//!
//! The [`Optimizer`] runs its passes in a fixed order, one round after the
//! other, until a whole round changes nothing. Every round either leaves the
//! program alone or removes statements, nodes or edges, or replaces a read of
//! a copy by an earlier value, so the loop settles without an iteration cap.
//! [`OptimizerConfig::max_rounds`](crate::compiler::OptimizerConfig) can still
//! bound it.

use crate::{
    analysis::ControlGraph,
    compiler::{
        context::CompilerContext,
        events::EventKind,
        pass::Pass,
        passes::{
            CopyPropagationPass, DeadCodeEliminationPass, EmptyBlockRemovalPass,
            MoveEliminationPass, RedundantEdgeRemovalPass, StraighteningPass,
        },
    },
    Result,
};

/// Runs optimizer passes to a fixpoint.
///
/// The default pipeline runs, in this order:
///
/// 1. copy propagation
/// 2. move elimination
/// 3. empty block removal
/// 4. straightening
/// 5. redundant edge removal
/// 6. dead code elimination
///
/// Passes the configuration does not enable are skipped.
pub struct Optimizer {
    passes: Vec<Box<dyn Pass>>,
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::with_passes(vec![
            Box::new(CopyPropagationPass::new()),
            Box::new(MoveEliminationPass::new()),
            Box::new(EmptyBlockRemovalPass::new()),
            Box::new(StraighteningPass::new()),
            Box::new(RedundantEdgeRemovalPass::new()),
            Box::new(DeadCodeEliminationPass::new()),
        ])
    }
}

impl Optimizer {
    /// Creates an optimizer with the default pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an optimizer running `passes` in the given order.
    #[must_use]
    pub fn with_passes(passes: Vec<Box<dyn Pass>>) -> Self {
        Self { passes }
    }

    /// Returns the passes in execution order.
    pub fn passes(&self) -> impl Iterator<Item = &dyn Pass> {
        self.passes.iter().map(AsRef::as_ref)
    }

    /// Runs the enabled passes once each.
    ///
    /// Returns `true` if any pass made changes, `false` otherwise.
    fn run_round(
        passes: &[&dyn Pass],
        graph: &mut ControlGraph,
        ctx: &CompilerContext,
    ) -> Result<bool> {
        let mut any_changed = false;
        for pass in passes {
            ctx.events
                .record(EventKind::PassStarted)
                .pass(pass.name())
                .message(pass.description());

            let changed = pass.run(graph, ctx)?;
            any_changed |= changed;

            ctx.events
                .record(EventKind::PassCompleted)
                .pass(pass.name())
                .message(if changed { "changed" } else { "unchanged" });
        }
        Ok(any_changed)
    }

    /// Optimizes `graph` under the configuration in `ctx`.
    ///
    /// # Returns
    ///
    /// The number of rounds completed. Events are accumulated in `ctx.events`.
    ///
    /// # Errors
    ///
    /// Returns an error if any pass fails. The graph may have been partially
    /// optimized by the passes that ran before.
    pub fn run(&self, graph: &mut ControlGraph, ctx: &CompilerContext) -> Result<usize> {
        let enabled: Vec<&dyn Pass> = self
            .passes()
            .filter(|pass| pass.should_run(&ctx.config))
            .collect();
        if enabled.is_empty() {
            return Ok(0);
        }

        let mut rounds = 0;
        loop {
            if ctx.config.max_rounds.is_some_and(|max| rounds >= max) {
                ctx.events
                    .warn(format!("stopped after {rounds} rounds without reaching a fixpoint"));
                break;
            }
            rounds += 1;

            let changed = Self::run_round(&enabled, graph, ctx)?;
            ctx.events
                .record(EventKind::RoundCompleted)
                .message(format!("round {rounds}: {}", if changed { "changed" } else { "stable" }));

            if !changed {
                break;
            }
        }

        log::debug!("optimizer finished after {rounds} rounds: {}", ctx.events.summary());
        Ok(rounds)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::{
        compiler::{OptimizationPasses, OptimizerConfig},
        ir::VariableArena,
    };

    struct TestPass {
        name: &'static str,
        changes_to_make: Cell<usize>,
    }

    impl TestPass {
        fn new(name: &'static str, changes: usize) -> Self {
            Self {
                name,
                changes_to_make: Cell::new(changes),
            }
        }
    }

    impl Pass for TestPass {
        fn name(&self) -> &'static str {
            self.name
        }

        fn flag(&self) -> OptimizationPasses {
            OptimizationPasses::COPY_PROPAGATION
        }

        fn run(&self, _graph: &mut ControlGraph, ctx: &CompilerContext) -> Result<bool> {
            let left = self.changes_to_make.get();
            if left == 0 {
                return Ok(false);
            }
            self.changes_to_make.set(left - 1);
            ctx.events
                .record(EventKind::CopyPropagated)
                .pass(self.name)
                .message("test");
            Ok(true)
        }
    }

    #[test]
    fn test_runs_until_stable() {
        let vars = VariableArena::new();
        let ctx = CompilerContext::new(&vars, OptimizerConfig::default());
        let optimizer = Optimizer::with_passes(vec![Box::new(TestPass::new("pass1", 3))]);

        let mut graph = ControlGraph::new();
        let rounds = optimizer.run(&mut graph, &ctx).unwrap();
        assert_eq!(rounds, 4);
        assert_eq!(ctx.events.count_kind(EventKind::CopyPropagated), 3);
        assert_eq!(ctx.events.count_kind(EventKind::RoundCompleted), 4);
    }

    #[test]
    fn test_round_cap() {
        let vars = VariableArena::new();
        let config = OptimizerConfig::default().with_max_rounds(2);
        let ctx = CompilerContext::new(&vars, config);
        let optimizer = Optimizer::with_passes(vec![Box::new(TestPass::new("pass1", 10))]);

        let mut graph = ControlGraph::new();
        assert_eq!(optimizer.run(&mut graph, &ctx).unwrap(), 2);
        assert!(ctx.events.has(EventKind::Warning));
    }

    #[test]
    fn test_level_zero_runs_nothing() {
        let vars = VariableArena::new();
        let ctx = CompilerContext::new(&vars, OptimizerConfig::disabled());
        let mut graph = ControlGraph::new();
        assert_eq!(Optimizer::new().run(&mut graph, &ctx).unwrap(), 0);
        assert!(ctx.events.is_empty());
    }

    #[test]
    fn test_default_pipeline_order() {
        let names: Vec<_> = Optimizer::new().passes().map(|p| p.name()).collect();
        assert_eq!(
            names,
            vec![
                "copy-propagation",
                "move-elimination",
                "empty-block-removal",
                "straightening",
                "redundant-edge-removal",
                "dead-code-elimination",
            ]
        );
    }

    #[test]
    fn test_level_one_skips_restructuring() {
        let optimizer = Optimizer::new();
        let config = OptimizerConfig::local();
        let enabled: Vec<_> = optimizer
            .passes()
            .filter(|p| p.should_run(&config))
            .map(|p| p.name())
            .collect();
        assert_eq!(
            enabled,
            vec!["copy-propagation", "move-elimination", "dead-code-elimination"]
        );
    }
}
