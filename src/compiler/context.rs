//! Shared state handed to every optimizer pass.

use crate::{
    compiler::{config::OptimizerConfig, events::EventLog},
    ir::VariableArena,
};

/// Context of one optimizer run.
///
/// Passes read variable kinds through `vars` (to tell observable results from
/// temporaries) and record what they did into `events`.
pub struct CompilerContext<'a> {
    /// The variables referenced by the program being optimized.
    pub vars: &'a VariableArena,

    /// The configuration the run was started with.
    pub config: OptimizerConfig,

    /// Events recorded by the passes.
    pub events: EventLog,
}

impl<'a> CompilerContext<'a> {
    /// Creates a context with an empty event log.
    #[must_use]
    pub fn new(vars: &'a VariableArena, config: OptimizerConfig) -> Self {
        Self {
            vars,
            config,
            events: EventLog::new(),
        }
    }
}
