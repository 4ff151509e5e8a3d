//! Optimizer configuration
//!
//! The optimization level gates which families of passes run, and a set of
//! flags switches individual passes off regardless of the level.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Individual optimizer passes, used to switch passes off by name
    pub struct OptimizationPasses: u32 {
        /// Block-local copy propagation
        const COPY_PROPAGATION = 0x0001;
        /// Folding of `t := expr; x := t` into `x := expr`
        const MOVE_ELIMINATION = 0x0002;
        /// Dead code elimination over use-def chains
        const DEAD_CODE = 0x0004;
        /// Removal of nodes without statements
        const EMPTY_BLOCKS = 0x0008;
        /// Merging of single-predecessor follower chains
        const STRAIGHTEN = 0x0010;
        /// Removal of conditional edges that duplicate the follower
        const REDUNDANT_EDGES = 0x0020;
    }
}

impl OptimizationPasses {
    /// Passes that only rewrite statements
    pub const DATAFLOW: Self = Self::COPY_PROPAGATION
        .union(Self::MOVE_ELIMINATION)
        .union(Self::DEAD_CODE);

    /// Passes that restructure the control graph
    pub const RESTRUCTURING: Self = Self::EMPTY_BLOCKS
        .union(Self::STRAIGHTEN)
        .union(Self::REDUNDANT_EDGES);

    /// Resolves a pass by its name as reported in events.
    ///
    /// ```rust
    /// use shcore::compiler::OptimizationPasses;
    ///
    /// assert_eq!(
    ///     OptimizationPasses::from_pass_name("dead-code-elimination"),
    ///     Some(OptimizationPasses::DEAD_CODE)
    /// );
    /// assert_eq!(OptimizationPasses::from_pass_name("inlining"), None);
    /// ```
    #[must_use]
    pub fn from_pass_name(name: &str) -> Option<Self> {
        match name {
            "copy-propagation" => Some(Self::COPY_PROPAGATION),
            "move-elimination" => Some(Self::MOVE_ELIMINATION),
            "dead-code-elimination" => Some(Self::DEAD_CODE),
            "empty-block-removal" => Some(Self::EMPTY_BLOCKS),
            "straightening" => Some(Self::STRAIGHTEN),
            "redundant-edge-removal" => Some(Self::REDUNDANT_EDGES),
            _ => None,
        }
    }
}

/// Configuration of one optimizer run
///
/// Level 0 disables the optimizer. Level 1 runs the statement-rewriting passes
/// (copy propagation, move elimination, dead code elimination). Level 2 and
/// above also restructure the control graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizerConfig {
    /// Optimization level, 0 turns every pass off
    pub level: u32,

    /// Passes switched off even when the level enables them
    pub disabled: OptimizationPasses,

    /// Upper bound on driver rounds, `None` runs until no pass changes anything
    pub max_rounds: Option<usize>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            level: 2,
            disabled: OptimizationPasses::empty(),
            max_rounds: None,
        }
    }
}

impl OptimizerConfig {
    /// Creates a configuration that leaves the program untouched
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            level: 0,
            disabled: OptimizationPasses::all(),
            max_rounds: Some(0),
        }
    }

    /// Creates a configuration that rewrites statements but keeps the graph shape
    #[must_use]
    pub fn local() -> Self {
        Self {
            level: 1,
            ..Self::default()
        }
    }

    /// Creates a configuration with every pass enabled
    #[must_use]
    pub fn full() -> Self {
        Self::default()
    }

    /// Creates a configuration for a numeric optimization level
    #[must_use]
    pub fn for_level(level: u32) -> Self {
        match level {
            0 => Self::disabled(),
            1 => Self::local(),
            _ => Self {
                level,
                ..Self::default()
            },
        }
    }

    /// Returns a copy with `passes` switched off
    #[must_use]
    pub fn without(mut self, passes: OptimizationPasses) -> Self {
        self.disabled |= passes;
        self
    }

    /// Returns a copy with the round cap set
    #[must_use]
    pub fn with_max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = Some(rounds);
        self
    }

    /// Returns true if `pass` runs under this configuration, given the lowest
    /// level that enables it.
    #[must_use]
    pub fn enables(&self, pass: OptimizationPasses, min_level: u32) -> bool {
        self.level > 0 && self.level >= min_level && !self.disabled.intersects(pass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimizer_config_presets() {
        let disabled = OptimizerConfig::disabled();
        assert_eq!(disabled.level, 0);
        assert!(!disabled.enables(OptimizationPasses::DEAD_CODE, 1));

        let local = OptimizerConfig::local();
        assert!(local.enables(OptimizationPasses::COPY_PROPAGATION, 1));
        assert!(!local.enables(OptimizationPasses::STRAIGHTEN, 2));

        let full = OptimizerConfig::full();
        assert!(full.enables(OptimizationPasses::STRAIGHTEN, 2));
        assert!(full.enables(OptimizationPasses::DEAD_CODE, 1));
        assert_eq!(full.max_rounds, None);
    }

    #[test]
    fn test_default_config() {
        assert_eq!(OptimizerConfig::default(), OptimizerConfig::full());
        assert_eq!(OptimizerConfig::for_level(1), OptimizerConfig::local());
        assert_eq!(OptimizerConfig::for_level(3).level, 3);
    }

    #[test]
    fn test_disabled_pass_overrides_level() {
        let config = OptimizerConfig::full().without(OptimizationPasses::RESTRUCTURING);
        assert!(!config.enables(OptimizationPasses::EMPTY_BLOCKS, 2));
        assert!(!config.enables(OptimizationPasses::REDUNDANT_EDGES, 2));
        assert!(config.enables(OptimizationPasses::MOVE_ELIMINATION, 1));
    }

    #[test]
    fn test_pass_name_lookup() {
        for flag in OptimizationPasses::all().iter() {
            let name = match flag {
                f if f == OptimizationPasses::COPY_PROPAGATION => "copy-propagation",
                f if f == OptimizationPasses::MOVE_ELIMINATION => "move-elimination",
                f if f == OptimizationPasses::DEAD_CODE => "dead-code-elimination",
                f if f == OptimizationPasses::EMPTY_BLOCKS => "empty-block-removal",
                f if f == OptimizationPasses::STRAIGHTEN => "straightening",
                _ => "redundant-edge-removal",
            };
            assert_eq!(OptimizationPasses::from_pass_name(name), Some(flag));
        }
    }
}
