//! The program container.
//!
//! A [`Program`] ties a [`ControlGraph`] to the [`VariableArena`] its
//! statements refer to, and keeps derived views of it: the referenced
//! variables grouped by kind, and the set of declared temporaries. The views
//! are recomputed wholesale by [`Program::collect_variables`] and
//! [`Program::collect_decls`] rather than maintained incrementally.

use std::collections::{BTreeSet, HashSet};

use crate::{
    analysis::{CfgNodeId, ControlGraph},
    compiler::{CompilerContext, EventLog, Optimizer, OptimizerConfig},
    ir::{BlockList, VarId, VariableArena, VariableKind},
    Result,
};

/// A shader program: graph, variables and the lists derived from them.
#[derive(Debug, Clone)]
pub struct Program {
    graph: ControlGraph,
    vars: VariableArena,
    inputs: Vec<VarId>,
    outputs: Vec<VarId>,
    temps: Vec<VarId>,
    uniforms: Vec<VarId>,
    constants: Vec<VarId>,
    streams: Vec<VarId>,
    textures: Vec<VarId>,
    palettes: Vec<VarId>,
    declared: BTreeSet<VarId>,
}

impl Program {
    /// Wraps `graph` and classifies the variables it references.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StaleHandle`] if a statement refers to a
    /// variable no longer in `vars`.
    pub fn new(graph: ControlGraph, vars: VariableArena) -> Result<Self> {
        let mut program = Program {
            graph,
            vars,
            inputs: Vec::new(),
            outputs: Vec::new(),
            temps: Vec::new(),
            uniforms: Vec::new(),
            constants: Vec::new(),
            streams: Vec::new(),
            textures: Vec::new(),
            palettes: Vec::new(),
            declared: BTreeSet::new(),
        };
        program.collect_variables()?;
        program.collect_decls();
        Ok(program)
    }

    /// Parses `blocks` and wraps the resulting graph.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Parse`] if the token nesting is malformed, or
    /// [`crate::Error::StaleHandle`] as for [`Program::new`].
    pub fn from_blocks(blocks: BlockList, vars: VariableArena) -> Result<Self> {
        Self::new(ControlGraph::from_blocks(blocks)?, vars)
    }

    /// The control graph.
    #[must_use]
    pub fn graph(&self) -> &ControlGraph {
        &self.graph
    }

    /// Mutable access to the control graph. Call
    /// [`Program::collect_variables`] after edits that add or drop references.
    pub fn graph_mut(&mut self) -> &mut ControlGraph {
        &mut self.graph
    }

    /// The variable arena.
    #[must_use]
    pub fn vars(&self) -> &VariableArena {
        &self.vars
    }

    /// Mutable access to the variable arena, for passes that introduce
    /// temporaries.
    pub fn vars_mut(&mut self) -> &mut VariableArena {
        &mut self.vars
    }

    /// Referenced inputs (including in-out variables), in first-reference order.
    #[must_use]
    pub fn inputs(&self) -> &[VarId] {
        &self.inputs
    }

    /// Referenced outputs (including in-out variables), in first-reference order.
    #[must_use]
    pub fn outputs(&self) -> &[VarId] {
        &self.outputs
    }

    /// Referenced temporaries.
    #[must_use]
    pub fn temps(&self) -> &[VarId] {
        &self.temps
    }

    /// Referenced uniforms.
    #[must_use]
    pub fn uniforms(&self) -> &[VarId] {
        &self.uniforms
    }

    /// Referenced constants.
    #[must_use]
    pub fn constants(&self) -> &[VarId] {
        &self.constants
    }

    /// Referenced streams.
    #[must_use]
    pub fn streams(&self) -> &[VarId] {
        &self.streams
    }

    /// Referenced textures.
    #[must_use]
    pub fn textures(&self) -> &[VarId] {
        &self.textures
    }

    /// Referenced palettes.
    #[must_use]
    pub fn palettes(&self) -> &[VarId] {
        &self.palettes
    }

    /// Temporaries declared anywhere in the graph, as of the last
    /// [`Program::collect_decls`].
    #[must_use]
    pub fn declared(&self) -> &BTreeSet<VarId> {
        &self.declared
    }

    /// Rebuilds the per-kind variable lists with one walk over the graph.
    ///
    /// A statement contributes its destination, then its meaningful sources.
    /// A node contributes its statements, then its branch guards.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StaleHandle`] on a reference to a removed
    /// variable. The lists are left empty in that case.
    pub fn collect_variables(&mut self) -> Result<()> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        for (_, node) in self.graph.dfs() {
            let statements = node.block.iter().flat_map(|block| block.iter());
            let referenced = statements
                .flat_map(|stmt| std::iter::once(&stmt.dest).chain(stmt.sources()))
                .chain(node.successors.iter().map(|branch| &branch.guard))
                .filter_map(|operand| operand.var());
            for var in referenced {
                if seen.insert(var) {
                    order.push(var);
                }
            }
        }

        self.clear_lists();
        for var in order {
            let kind = match self.vars.kind(var) {
                Ok(kind) => kind,
                Err(e) => {
                    self.clear_lists();
                    return Err(e);
                }
            };
            match kind {
                VariableKind::Temp => self.temps.push(var),
                VariableKind::Input => self.inputs.push(var),
                VariableKind::Output => self.outputs.push(var),
                VariableKind::InOut => {
                    self.inputs.push(var);
                    self.outputs.push(var);
                }
                VariableKind::Uniform => self.uniforms.push(var),
                VariableKind::Constant => self.constants.push(var),
                VariableKind::Stream => self.streams.push(var),
                VariableKind::Texture => self.textures.push(var),
                VariableKind::Palette => self.palettes.push(var),
            }
        }
        Ok(())
    }

    fn clear_lists(&mut self) {
        for list in [
            &mut self.inputs,
            &mut self.outputs,
            &mut self.temps,
            &mut self.uniforms,
            &mut self.constants,
            &mut self.streams,
            &mut self.textures,
            &mut self.palettes,
        ] {
            list.clear();
        }
    }

    /// Rebuilds the declared-temporaries set from the nodes' declarations.
    pub fn collect_decls(&mut self) {
        self.declared = self.graph.collect_decls().into_iter().collect();
    }

    /// Returns `true` if `var` was declared as of the last collection or a
    /// later [`Program::add_decl`].
    #[must_use]
    pub fn has_decl(&self, var: VarId) -> bool {
        self.declared.contains(&var)
    }

    /// Declares `var` at `at`, or at the entry node if `at` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Graph`] if `at` names a removed node.
    pub fn add_decl(&mut self, var: VarId, at: Option<CfgNodeId>) -> Result<()> {
        let at = at.unwrap_or_else(|| self.graph.entry());
        self.graph.try_node_mut(at)?.add_decl(var);
        self.declared.insert(var);
        Ok(())
    }

    /// Optimizes the program with the default pipeline and refreshes the
    /// derived lists.
    ///
    /// # Errors
    ///
    /// Returns the first error a pass reports. The program may be partially
    /// optimized in that case.
    pub fn optimize(&mut self, config: OptimizerConfig) -> Result<EventLog> {
        self.collect_decls();

        let ctx = CompilerContext::new(&self.vars, config);
        let rounds = Optimizer::new().run(&mut self.graph, &ctx)?;
        let events = ctx.events;

        self.collect_variables()?;
        self.collect_decls();
        log::debug!(
            "optimized program in {rounds} rounds, {} temporaries left",
            self.temps.len()
        );
        Ok(events)
    }

    /// Pretty-prints the graph.
    #[must_use]
    pub fn print(&self) -> String {
        self.graph.print(&self.vars)
    }

    /// Renders the graph in Graphviz DOT syntax.
    #[must_use]
    pub fn to_dot(&self) -> String {
        self.graph.to_dot(&self.vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compiler::EventKind,
        ir::{BasicBlock, Operand, Operation, Statement, Token, TokenArgument, TokenKind},
        Error,
    };

    #[test]
    fn test_collect_variables_by_kind_in_order() {
        let mut vars = VariableArena::new();
        let pos = vars.add("pos", VariableKind::Input, 4);
        let color = vars.add("color", VariableKind::Output, 4);
        let scale = vars.add("scale", VariableKind::Uniform, 4);
        let acc = vars.add("acc", VariableKind::InOut, 4);
        let t = vars.add("t", VariableKind::Temp, 4);
        let c = vars.add("c", VariableKind::Input, 1);

        let mut body = BasicBlock::new();
        body.add_statement(Statement::binary(
            Operand::new(t, 4),
            Operation::Mul,
            Operand::new(pos, 4),
            Operand::new(scale, 4),
        ));
        body.add_statement(Statement::binary(
            Operand::new(acc, 4),
            Operation::Add,
            Operand::new(acc, 4),
            Operand::new(t, 4),
        ));
        body.add_statement(Statement::assign(Operand::new(color, 4), Operand::new(t, 4)));

        let mut blocks = BlockList::new();
        blocks.push_token(Token::with_arguments(
            TokenKind::If,
            vec![TokenArgument::value(Operand::new(c, 1))],
        ));
        blocks.push_basic(body);
        blocks.push_token(Token::new(TokenKind::EndIf));

        let program = Program::from_blocks(blocks, vars).unwrap();
        assert_eq!(program.temps(), &[t]);
        assert_eq!(program.inputs(), &[c, pos, acc]);
        assert_eq!(program.outputs(), &[acc, color]);
        assert_eq!(program.uniforms(), &[scale]);
        assert!(program.textures().is_empty());
    }

    #[test]
    fn test_stale_reference_is_reported() {
        let mut vars = VariableArena::new();
        let a = vars.add("a", VariableKind::Input, 1);
        let o = vars.add("o", VariableKind::Output, 1);
        let mut block = BasicBlock::new();
        block.add_statement(Statement::assign(Operand::new(o, 1), Operand::new(a, 1)));
        let mut blocks = BlockList::new();
        blocks.push_basic(block);
        assert!(vars.remove(a).is_some());

        assert!(matches!(
            Program::from_blocks(blocks, vars),
            Err(Error::StaleHandle)
        ));
    }

    #[test]
    fn test_declarations() {
        let mut vars = VariableArena::new();
        let t = vars.add("t", VariableKind::Temp, 1);
        let u = vars.add("u", VariableKind::Temp, 1);

        let mut block = BasicBlock::new();
        block.add_statement(Statement::declare(Operand::new(t, 1)));
        let mut blocks = BlockList::new();
        blocks.push_basic(block);

        let mut program = Program::from_blocks(blocks, vars).unwrap();
        assert!(program.has_decl(t));
        assert!(!program.has_decl(u));

        program.add_decl(u, None).unwrap();
        assert!(program.has_decl(u));
        let entry = program.graph().entry();
        assert!(program.graph().node(entry).unwrap().has_decl(u));

        program.collect_decls();
        assert_eq!(program.declared().len(), 2);
    }

    #[test]
    fn test_optimize_drops_unused_temporaries() {
        let mut vars = VariableArena::new();
        let a = vars.add("a", VariableKind::Input, 1);
        let o = vars.add("o", VariableKind::Output, 1);
        let t = vars.add("t", VariableKind::Temp, 1);
        let unused = vars.add("unused", VariableKind::Temp, 1);

        let mut block = BasicBlock::new();
        block.add_statement(Statement::unary(
            Operand::new(t, 1),
            Operation::Abs,
            Operand::new(a, 1),
        ));
        block.add_statement(Statement::unary(
            Operand::new(unused, 1),
            Operation::Abs,
            Operand::new(a, 1),
        ));
        block.add_statement(Statement::assign(Operand::new(o, 1), Operand::new(t, 1)));
        let mut blocks = BlockList::new();
        blocks.push_basic(block);

        let mut program = Program::from_blocks(blocks, vars).unwrap();
        assert_eq!(program.temps().len(), 2);

        let events = program.optimize(OptimizerConfig::default()).unwrap();
        assert!(events.has(EventKind::StatementRemoved));
        assert!(program.temps().is_empty());
        assert_eq!(program.outputs(), &[o]);
    }
}
