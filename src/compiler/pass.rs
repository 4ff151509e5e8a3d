//! Pass trait for the optimizer pipeline.

use crate::{
    analysis::ControlGraph,
    compiler::{
        config::{OptimizationPasses, OptimizerConfig},
        context::CompilerContext,
    },
    Result,
};

/// An optimizer pass over a control graph.
///
/// A pass rewrites the graph in place and reports whether it changed
/// anything. The [`crate::compiler::Optimizer`] keeps running the enabled
/// passes until a whole round reports no change.
pub trait Pass {
    /// Unique name for logging and debugging.
    fn name(&self) -> &'static str;

    /// The flag that switches this pass off in [`OptimizerConfig::disabled`].
    fn flag(&self) -> OptimizationPasses;

    /// The lowest optimization level that runs this pass.
    fn min_level(&self) -> u32 {
        1
    }

    /// Should this pass run under `config`?
    fn should_run(&self, config: &OptimizerConfig) -> bool {
        config.enables(self.flag(), self.min_level())
    }

    /// Runs the pass on `graph`.
    ///
    /// Returns `true` if any changes were made, `false` otherwise.
    /// Events should be recorded to `ctx.events`.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph violates an invariant the pass relies
    /// on, such as a statement referring to a stale variable handle.
    fn run(&self, graph: &mut ControlGraph, ctx: &CompilerContext) -> Result<bool>;

    /// Get a description of what this pass does.
    fn description(&self) -> &'static str {
        "No description available"
    }
}
