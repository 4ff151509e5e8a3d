//! Reaching definitions analysis.
//!
//! Reaching definitions computes, for each node, which definitions may reach
//! it without being overwritten on the way.
//!
//! # Granularity
//!
//! Shader variables are tuples and statements often write only some of their
//! components (`t(x) := a`). A definition therefore owns one bit per written
//! component, and a later write kills exactly the bits of the components it
//! overwrites. A definition reaches a point if any of its bits does.
//!
//! # Algorithm
//!
//! For each node `n`, scanning its statements in order:
//! - `GEN[n]` = component bits of definitions in `n` not overwritten later in `n`
//! - `PRESERVE[n]` = bits of components that `n` never writes
//! - `IN[n]` = ∪{OUT[p] | p is a predecessor of n}
//! - `OUT[n]` = GEN[n] ∪ (IN[n] ∩ PRESERVE[n])

use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use crate::{
    analysis::{
        cfg::{CfgNode, CfgNodeId, ControlGraph},
        dataflow::{
            framework::{AnalysisResults, DataFlowAnalysis, Direction},
            lattice::MeetSemiLattice,
        },
        defuse::Location,
    },
    ir::{BasicBlock, Operand, StmtId, VarId},
    utils::BitSet,
};

/// One definition: a statement writing some components of a variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    /// Id of the defining statement.
    pub stmt: StmtId,
    /// Where the defining statement sits.
    pub location: Location,
    /// Variable written.
    pub var: VarId,
    components: Vec<usize>,
    offset: usize,
}

impl Definition {
    /// Components of [`Definition::var`] written, in destination order.
    #[must_use]
    pub fn components(&self) -> &[usize] {
        &self.components
    }

    /// Bit indices owned by this definition.
    #[must_use]
    pub fn bits(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.components.len()
    }
}

/// Reaching definitions analysis.
///
/// Definitions are numbered in depth-first order of the graph they were
/// collected from. Statement ids are copied as they are, so callers that need
/// them to be meaningful renumber the graph first.
///
/// # Example
///
/// ```rust
/// use shcore::analysis::{DataFlowSolver, ReachingDefinitions};
/// use shcore::prelude::*;
///
/// let mut vars = VariableArena::new();
/// let a = vars.add("a", VariableKind::Input, 4);
/// let t = vars.add("t", VariableKind::Temp, 4);
///
/// let mut block = BasicBlock::new();
/// block.add_statement(Statement::assign(Operand::new(t, 4), Operand::new(a, 4)));
/// let mut blocks = BlockList::new();
/// blocks.push_basic(block);
///
/// let mut graph = ControlGraph::from_blocks(blocks)?;
/// graph.renumber_statements();
///
/// let mut solver = DataFlowSolver::new(ReachingDefinitions::new(&graph));
/// let results = solver.solve(&graph);
/// let reaching = results.in_state(graph.exit()).map(|s| s.count());
/// assert_eq!(reaching, Some(1));
/// # Ok::<(), shcore::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ReachingDefinitions {
    definitions: Vec<Definition>,
    /// Owning definition of each bit.
    owners: Arc<[usize]>,
    /// Bits writing each (variable, component) pair.
    by_component: HashMap<(VarId, usize), Vec<usize>>,
    /// Definitions of each node as (statement index, definition index).
    node_defs: Vec<Vec<(usize, usize)>>,
    gen_sets: Vec<BitSet>,
    preserve_sets: Vec<BitSet>,
}

impl ReachingDefinitions {
    /// Collects the definitions of every reachable node and computes the
    /// per-node GEN and PRESERVE sets.
    #[must_use]
    pub fn new(graph: &ControlGraph) -> Self {
        let capacity = graph.capacity();
        let mut definitions = Vec::new();
        let mut owners = Vec::new();
        let mut by_component: HashMap<(VarId, usize), Vec<usize>> = HashMap::new();
        let mut node_defs = vec![Vec::new(); capacity];

        for (id, node) in graph.dfs() {
            let statements = node.block.iter().flat_map(BasicBlock::iter);
            for (index, stmt) in statements.enumerate() {
                let Some(var) = stmt.defined_var() else {
                    continue;
                };
                let components = stmt
                    .dest
                    .swizzle()
                    .map(|s| s.indices().to_vec())
                    .unwrap_or_default();
                let def = definitions.len();
                let offset = owners.len();
                for (i, &component) in components.iter().enumerate() {
                    owners.push(def);
                    by_component
                        .entry((var, component))
                        .or_default()
                        .push(offset + i);
                }
                node_defs[id.index()].push((index, def));
                definitions.push(Definition {
                    stmt: stmt.id,
                    location: Location::new(id, index),
                    var,
                    components,
                    offset,
                });
            }
        }

        let mut analysis = Self {
            definitions,
            owners: owners.into(),
            by_component,
            node_defs,
            gen_sets: Vec::new(),
            preserve_sets: Vec::new(),
        };

        let bits = analysis.bit_count();
        let mut gen_sets = vec![BitSet::new(bits); capacity];
        let mut preserve_sets = vec![BitSet::full(bits); capacity];
        for (slot, defs) in analysis.node_defs.iter().enumerate() {
            for &(_, def) in defs {
                analysis.kill(def, &mut gen_sets[slot]);
                analysis.kill(def, &mut preserve_sets[slot]);
                for bit in analysis.definitions[def].bits() {
                    gen_sets[slot].insert(bit);
                }
            }
        }
        analysis.gen_sets = gen_sets;
        analysis.preserve_sets = preserve_sets;
        analysis
    }

    /// All definitions, in depth-first order.
    #[must_use]
    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    /// Returns the definition with the given index.
    #[must_use]
    pub fn definition(&self, index: usize) -> Option<&Definition> {
        self.definitions.get(index)
    }

    /// Number of component bits across all definitions.
    #[must_use]
    pub fn bit_count(&self) -> usize {
        self.owners.len()
    }

    /// Index of the definition made by statement `index` of `node`, if that
    /// statement is a definition.
    #[must_use]
    pub fn definition_at(&self, node: CfgNodeId, index: usize) -> Option<usize> {
        self.node_defs
            .get(node.index())?
            .iter()
            .find(|(i, _)| *i == index)
            .map(|&(_, def)| def)
    }

    /// An empty reaching set sized for this analysis.
    #[must_use]
    pub fn empty_set(&self) -> ReachingDefsResult {
        ReachingDefsResult {
            defs: BitSet::new(self.bit_count()),
            owners: Arc::clone(&self.owners),
        }
    }

    /// Steps `state` over definition `def`: its components are overwritten,
    /// then its own bits become reaching.
    pub fn apply(&self, def: usize, state: &mut ReachingDefsResult) {
        self.kill(def, &mut state.defs);
        if let Some(definition) = self.definitions.get(def) {
            for bit in definition.bits() {
                state.defs.insert(bit);
            }
        }
    }

    /// The reaching set immediately before statement `index` of `node`, given
    /// the fixpoint `results`.
    #[must_use]
    pub fn state_before(
        &self,
        results: &AnalysisResults<ReachingDefsResult>,
        node: CfgNodeId,
        index: usize,
    ) -> ReachingDefsResult {
        let mut state = results
            .in_state(node)
            .cloned()
            .unwrap_or_else(|| self.empty_set());
        if let Some(defs) = self.node_defs.get(node.index()) {
            for &(_, def) in defs.iter().take_while(|(i, _)| *i < index) {
                self.apply(def, &mut state);
            }
        }
        state
    }

    /// Statements whose definitions in `state` supply a component read by
    /// `operand`.
    #[must_use]
    pub fn reaching_operand(&self, state: &ReachingDefsResult, operand: &Operand) -> BTreeSet<StmtId> {
        let (Some(var), Some(swizzle)) = (operand.var(), operand.swizzle()) else {
            return BTreeSet::new();
        };
        swizzle
            .indices()
            .iter()
            .filter_map(|&component| self.by_component.get(&(var, component)))
            .flatten()
            .filter(|&&bit| state.defs.contains(bit))
            .map(|&bit| self.definitions[self.owners[bit]].stmt)
            .collect()
    }

    /// Clears every bit of a component that definition `def` writes.
    fn kill(&self, def: usize, set: &mut BitSet) {
        let Some(definition) = self.definitions.get(def) else {
            return;
        };
        for &component in &definition.components {
            if let Some(bits) = self.by_component.get(&(definition.var, component)) {
                for &bit in bits {
                    set.remove(bit);
                }
            }
        }
    }
}

impl DataFlowAnalysis for ReachingDefinitions {
    type Lattice = ReachingDefsResult;
    const DIRECTION: Direction = Direction::Forward;

    fn boundary(&self, _graph: &ControlGraph) -> Self::Lattice {
        // Nothing is defined before the program starts.
        self.empty_set()
    }

    fn initial(&self, _graph: &ControlGraph) -> Self::Lattice {
        self.empty_set()
    }

    fn transfer(&self, id: CfgNodeId, _node: &CfgNode, input: &Self::Lattice) -> Self::Lattice {
        let mut defs = input.defs.clone();
        if let (Some(gen), Some(preserve)) = (
            self.gen_sets.get(id.index()),
            self.preserve_sets.get(id.index()),
        ) {
            defs.intersect_with(preserve);
            defs.union_with(gen);
        }
        ReachingDefsResult {
            defs,
            owners: Arc::clone(&input.owners),
        }
    }
}

/// The definitions reaching one program point.
#[derive(Debug, Clone, PartialEq)]
pub struct ReachingDefsResult {
    /// Reaching component bits.
    defs: BitSet,
    /// Owning definition of each bit, shared with the analysis.
    owners: Arc<[usize]>,
}

impl ReachingDefsResult {
    /// Returns `true` if any component of definition `def` reaches this point.
    #[must_use]
    pub fn reaches(&self, def: usize) -> bool {
        self.defs.iter().any(|bit| self.owners.get(bit) == Some(&def))
    }

    /// Returns `true` if `bit` is set.
    #[must_use]
    pub fn contains_bit(&self, bit: usize) -> bool {
        self.defs.contains(bit)
    }

    /// Indices of the reaching definitions, ascending.
    pub fn definitions(&self) -> impl Iterator<Item = usize> + '_ {
        let mut last = None;
        self.defs.iter().filter_map(move |bit| {
            let owner = self.owners.get(bit).copied();
            if owner == last {
                None
            } else {
                last = owner;
                owner
            }
        })
    }

    /// Returns the number of reaching definitions.
    #[must_use]
    pub fn count(&self) -> usize {
        self.definitions().count()
    }

    /// Returns `true` if no definition reaches this point.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

impl MeetSemiLattice for ReachingDefsResult {
    /// Union: a definition reaches if it reaches along any predecessor.
    fn meet(&self, other: &Self) -> Self {
        Self {
            defs: self.defs.meet(&other.defs),
            owners: Arc::clone(&self.owners),
        }
    }
}
