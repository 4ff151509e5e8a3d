//! The control graph: an arena of [`CfgNode`]s with a designated entry and exit.

use std::{collections::HashMap, fmt::Write};

use crate::{
    analysis::cfg::{
        node::{Branch, CfgNode, CfgNodeId},
        parser::Parser,
    },
    ir::{BasicBlock, BlockList, Operand, StmtId, VarId, VariableArena},
    utils::{dot_lines, escape_dot, BitSet},
    Error, Result,
};

/// A control graph owning all of its nodes.
///
/// Nodes live in an arena and refer to each other through [`CfgNodeId`]
/// handles. Removing a node leaves an empty slot so that the handles of all
/// other nodes stay valid.
///
/// Predecessor lists are derived data. They are recomputed by
/// [`ControlGraph::compute_predecessors`] and every structural edit marks them
/// stale, after which [`ControlGraph::predecessors`] refuses to answer.
///
/// # Examples
///
/// ```rust
/// use shcore::{BasicBlock, BlockList, ControlGraph};
///
/// let mut blocks = BlockList::new();
/// blocks.push_basic(BasicBlock::new());
///
/// let mut graph = ControlGraph::from_blocks(blocks)?;
/// graph.compute_predecessors();
/// assert_eq!(graph.preorder().len(), 3);
/// assert_eq!(graph.predecessors(graph.exit())?.len(), 1);
/// # Ok::<(), shcore::Error>(())
/// ```
#[derive(Debug)]
pub struct ControlGraph {
    nodes: Vec<Option<CfgNode>>,
    entry: CfgNodeId,
    exit: CfgNodeId,
    predecessors_fresh: bool,
}

impl Default for ControlGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ControlGraph {
    fn clone(&self) -> Self {
        self.copy()
    }
}

impl ControlGraph {
    /// Creates the trivial graph: an empty entry node followed by an empty exit node.
    #[must_use]
    pub fn new() -> Self {
        let exit = CfgNodeId(1);
        let entry = CfgNode {
            follower: Some(exit),
            ..CfgNode::new()
        };
        Self {
            nodes: vec![Some(entry), Some(CfgNode::new())],
            entry: CfgNodeId(0),
            exit,
            predecessors_fresh: false,
        }
    }

    /// A graph without nodes whose entry and exit are set once parsing is done.
    pub(crate) fn under_construction() -> Self {
        Self {
            nodes: Vec::new(),
            entry: CfgNodeId(0),
            exit: CfgNodeId(0),
            predecessors_fresh: false,
        }
    }

    pub(crate) fn set_bounds(&mut self, entry: CfgNodeId, exit: CfgNodeId) {
        self.entry = entry;
        self.exit = exit;
    }

    /// Builds a graph from a front end block list.
    ///
    /// The parsed program sits between a fresh empty entry node and a fresh
    /// empty exit node. An empty block list yields the trivial graph.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the token nesting is malformed.
    pub fn from_blocks(blocks: BlockList) -> Result<Self> {
        let mut parser = Parser::new();
        let entry = parser.graph.add_node(CfgNode::new());
        let exit = parser.graph.add_node(CfgNode::new());

        match parser.parse_all(blocks)? {
            Some((head, tail)) => {
                parser.graph.link(entry, head)?;
                parser.graph.link(tail, exit)?;
            }
            None => parser.graph.link(entry, exit)?,
        }

        let mut graph = parser.graph;
        graph.set_bounds(entry, exit);
        Ok(graph)
    }

    /// Returns the entry node.
    #[must_use]
    pub const fn entry(&self) -> CfgNodeId {
        self.entry
    }

    /// Returns the exit node.
    #[must_use]
    pub const fn exit(&self) -> CfgNodeId {
        self.exit
    }

    /// Adds a node to the arena and returns its handle.
    pub fn add_node(&mut self, node: CfgNode) -> CfgNodeId {
        self.predecessors_fresh = false;
        self.nodes.push(Some(node));
        CfgNodeId(self.nodes.len() - 1)
    }

    /// Returns the node behind `id`.
    #[must_use]
    pub fn node(&self, id: CfgNodeId) -> Option<&CfgNode> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    /// Returns the node behind `id` mutably.
    ///
    /// Editing edges through this reference does not mark predecessor data
    /// stale. Use [`ControlGraph::link`], [`ControlGraph::link_guarded`] or call
    /// [`ControlGraph::invalidate_predecessors`] after edge edits.
    pub fn node_mut(&mut self, id: CfgNodeId) -> Option<&mut CfgNode> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Returns the node behind `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Graph`] if `id` does not name a live node.
    pub fn try_node(&self, id: CfgNodeId) -> Result<&CfgNode> {
        self.node(id)
            .ok_or_else(|| Error::Graph(format!("node {id} does not exist")))
    }

    /// Returns the node behind `id` mutably.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Graph`] if `id` does not name a live node.
    pub fn try_node_mut(&mut self, id: CfgNodeId) -> Result<&mut CfgNode> {
        self.node_mut(id)
            .ok_or_else(|| Error::Graph(format!("node {id} does not exist")))
    }

    /// Removes a node from the arena. Edges pointing at it are left dangling
    /// and must be redirected by the caller.
    pub(crate) fn remove_node(&mut self, id: CfgNodeId) -> Option<CfgNode> {
        self.predecessors_fresh = false;
        self.nodes.get_mut(id.0).and_then(Option::take)
    }

    /// Number of live nodes, reachable or not.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// Size of the node arena. Every handle's index is below this value,
    /// removed slots included.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Handles of all live nodes in arena order.
    #[must_use]
    pub fn node_ids(&self) -> Vec<CfgNodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|_| CfgNodeId(i)))
            .collect()
    }

    /// Makes `to` the follower of `from`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Graph`] if either node does not exist or `from`
    /// already has a follower.
    pub fn link(&mut self, from: CfgNodeId, to: CfgNodeId) -> Result<()> {
        self.try_node(to)?;
        let node = self.try_node_mut(from)?;
        if let Some(existing) = node.follower {
            return Err(Error::Graph(format!(
                "node {from} already follows into {existing}, cannot follow into {to}"
            )));
        }
        node.follower = Some(to);
        self.predecessors_fresh = false;
        Ok(())
    }

    /// Adds a conditional successor `to` guarded by `guard` to `from`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Graph`] if either node does not exist.
    pub fn link_guarded(&mut self, from: CfgNodeId, to: CfgNodeId, guard: Operand) -> Result<()> {
        self.try_node(to)?;
        self.try_node_mut(from)?.successors.push(Branch { guard, target: to });
        self.predecessors_fresh = false;
        Ok(())
    }

    /// Marks predecessor lists as stale after edits made through
    /// [`ControlGraph::node_mut`].
    pub fn invalidate_predecessors(&mut self) {
        self.predecessors_fresh = false;
    }

    /// Iterates over the reachable nodes in depth-first preorder.
    ///
    /// A node is visited before its conditional successors (in list order),
    /// which come before its follower. Each reachable node is yielded exactly
    /// once, cycles included. The visited set belongs to the iterator, so
    /// traversals are independent of each other.
    #[must_use]
    pub fn dfs(&self) -> DfsIter<'_> {
        DfsIter {
            graph: self,
            stack: vec![self.entry],
            visited: BitSet::new(self.nodes.len()),
        }
    }

    /// Handles of all reachable nodes in depth-first preorder.
    #[must_use]
    pub fn preorder(&self) -> Vec<CfgNodeId> {
        self.dfs().map(|(id, _)| id).collect()
    }

    /// Calls `visit` on every reachable node in depth-first preorder.
    pub fn for_each_dfs<F>(&self, mut visit: F)
    where
        F: FnMut(CfgNodeId, &CfgNode),
    {
        for (id, node) in self.dfs() {
            visit(id, node);
        }
    }

    /// Calls `visit` mutably on every reachable node in depth-first preorder.
    ///
    /// The visiting order is fixed before the first call, edits made by
    /// `visit` do not change which nodes are visited.
    pub fn dfs_mut<F>(&mut self, mut visit: F)
    where
        F: FnMut(CfgNodeId, &mut CfgNode),
    {
        for id in self.preorder() {
            if let Some(node) = self.node_mut(id) {
                visit(id, node);
            }
        }
    }

    /// Recomputes every predecessor list with one traversal.
    ///
    /// Each edge contributes one entry, so a node reached by both a
    /// conditional successor and the follower of the same node lists that node
    /// twice.
    pub fn compute_predecessors(&mut self) {
        for node in self.nodes.iter_mut().flatten() {
            node.predecessors.clear();
        }
        let edges: Vec<(CfgNodeId, CfgNodeId)> = self
            .dfs()
            .flat_map(|(id, node)| node.targets().map(move |t| (id, t)))
            .collect();
        for (from, to) in edges {
            if let Some(target) = self.node_mut(to) {
                target.predecessors.push(from);
            }
        }
        self.predecessors_fresh = true;
    }

    /// Returns the predecessors of `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Graph`] if the graph was edited since the last call to
    /// [`ControlGraph::compute_predecessors`], or `id` does not exist.
    pub fn predecessors(&self, id: CfgNodeId) -> Result<&[CfgNodeId]> {
        if !self.predecessors_fresh {
            return Err(Error::Graph(
                "predecessor lists are stale, call compute_predecessors first".to_string(),
            ));
        }
        Ok(&self.try_node(id)?.predecessors)
    }

    /// Returns `true` if predecessor lists match the current edges.
    #[must_use]
    pub const fn has_fresh_predecessors(&self) -> bool {
        self.predecessors_fresh
    }

    /// Deep-copies the graph.
    ///
    /// Every reachable node, plus the exit, is cloned with all edges remapped to
    /// the clones. Unreachable nodes are dropped and the arena is compacted, so
    /// handles of the original are not valid for the copy. Statements keep
    /// their ids and annotations, which stay consistent within the copy.
    #[must_use]
    pub fn copy(&self) -> ControlGraph {
        let mut order = self.preorder();
        if !order.contains(&self.exit) && self.node(self.exit).is_some() {
            order.push(self.exit);
        }
        let map: HashMap<CfgNodeId, CfgNodeId> = order
            .iter()
            .enumerate()
            .map(|(new, &old)| (old, CfgNodeId(new)))
            .collect();

        let nodes = order
            .iter()
            .filter_map(|&old| self.node(old))
            .map(|node| {
                let mut clone = node.clone();
                clone.remap_targets(|t| map.get(&t).copied().unwrap_or(t));
                clone.predecessors = node
                    .predecessors
                    .iter()
                    .filter_map(|p| map.get(p).copied())
                    .collect();
                Some(clone)
            })
            .collect();

        ControlGraph {
            nodes,
            entry: map.get(&self.entry).copied().unwrap_or(CfgNodeId(0)),
            exit: map.get(&self.exit).copied().unwrap_or(CfgNodeId(0)),
            predecessors_fresh: self.predecessors_fresh,
        }
    }

    /// Moves all nodes of `other` into this arena.
    ///
    /// Returns the new handles of `other`'s entry and exit. The absorbed
    /// statements lose their ids and use-def chains, which referred to
    /// `other`'s numbering.
    pub(crate) fn absorb(&mut self, other: ControlGraph) -> (CfgNodeId, CfgNodeId) {
        let offset = self.nodes.len();
        let shift = |id: CfgNodeId| CfgNodeId(id.0 + offset);
        for slot in other.nodes {
            self.nodes.push(slot.map(|mut node| {
                node.remap_targets(shift);
                node.predecessors.clear();
                for stmt in node.block.iter_mut().flat_map(BasicBlock::iter_mut) {
                    stmt.id = StmtId::UNASSIGNED;
                    stmt.clear_tracking();
                }
                node
            }));
        }
        self.predecessors_fresh = false;
        (shift(other.entry), shift(other.exit))
    }

    /// Inserts a fresh empty node in front of the entry.
    ///
    /// The old entry gets an empty block if it had none, so that it can hold
    /// entry-wide statements. Returns the old entry.
    pub fn prepend_entry(&mut self) -> CfgNodeId {
        let old = self.entry;
        let fresh = self.add_node(CfgNode {
            follower: Some(old),
            ..CfgNode::new()
        });
        if let Some(node) = self.node_mut(old) {
            if node.block.is_some() {
                log::warn!("entry node {old} already holds a block");
            }
            node.block_mut();
        }
        self.entry = fresh;
        old
    }

    /// Appends a fresh empty node after the exit.
    ///
    /// The old exit gets an empty block if it had none. Returns the old exit.
    pub fn append_exit(&mut self) -> CfgNodeId {
        let old = self.exit;
        let fresh = self.add_node(CfgNode::new());
        if let Some(node) = self.node_mut(old) {
            if node.block.is_some() {
                log::warn!("exit node {old} already holds a block");
            }
            node.block_mut();
            node.follower = Some(fresh);
        }
        self.exit = fresh;
        old
    }

    /// Sequences `other` after this graph.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Graph`] if this graph's exit already has a follower.
    pub fn append(&mut self, other: ControlGraph) -> Result<()> {
        if self.try_node(self.exit)?.follower.is_some() {
            return Err(Error::Graph(format!(
                "exit node {} already has a follower",
                self.exit
            )));
        }
        let (entry, exit) = self.absorb(other);
        self.link(self.exit, entry)?;
        self.exit = exit;
        Ok(())
    }

    /// Sequences `other` before this graph.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Graph`] if `other`'s exit already has a follower.
    pub fn prepend(&mut self, other: ControlGraph) -> Result<()> {
        if other.try_node(other.exit)?.follower.is_some() {
            return Err(Error::Graph(format!(
                "exit node {} of the prepended graph already has a follower",
                other.exit
            )));
        }
        let (entry, exit) = self.absorb(other);
        self.link(exit, self.entry)?;
        self.entry = entry;
        Ok(())
    }

    /// Splits `id` after the statement at index `at`.
    ///
    /// The statements after `at` move to a new node, which takes over all
    /// outgoing edges of `id` and becomes its follower. Declarations stay with
    /// `id`. If `id` is the exit, the new node becomes the exit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Graph`] if `id` does not exist or has no statement at `at`.
    pub fn split(&mut self, id: CfgNodeId, at: usize) -> Result<CfgNodeId> {
        let node = self.try_node_mut(id)?;
        let Some(block) = node.block.as_mut().filter(|b| at < b.len()) else {
            return Err(Error::Graph(format!("node {id} has no statement {at}")));
        };
        let rest = block.split(at);
        let tail = CfgNode {
            block: Some(rest),
            successors: std::mem::take(&mut node.successors),
            follower: node.follower.take(),
            ..CfgNode::new()
        };
        let tail = self.add_node(tail);
        self.link(id, tail)?;
        if self.exit == id {
            self.exit = tail;
        }
        Ok(tail)
    }

    /// Assigns consecutive statement ids in depth-first order.
    ///
    /// Returns the number of numbered statements.
    pub fn renumber_statements(&mut self) -> usize {
        let mut next = 0u32;
        self.dfs_mut(|_, node| {
            for stmt in node.block.iter_mut().flat_map(BasicBlock::iter_mut) {
                stmt.id = StmtId(next);
                next += 1;
            }
        });
        next as usize
    }

    /// Removes use-def and def-use chains from every statement.
    pub fn clear_tracking(&mut self) {
        for node in self.nodes.iter_mut().flatten() {
            for stmt in node.block.iter_mut().flat_map(BasicBlock::iter_mut) {
                stmt.clear_tracking();
            }
        }
    }

    /// Union of all declaration sets of reachable nodes.
    #[must_use]
    pub fn collect_decls(&self) -> Vec<VarId> {
        let mut decls: Vec<VarId> = self
            .dfs()
            .flat_map(|(_, node)| node.decls.iter().copied())
            .collect();
        decls.sort_unstable();
        decls.dedup();
        decls
    }

    /// Checks basic well-formedness: entry and exit exist, every edge of a
    /// reachable node targets a live node and the exit is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Graph`] describing the first violation found.
    pub fn validate(&self) -> Result<()> {
        self.try_node(self.entry)?;
        self.try_node(self.exit)?;
        let mut exit_reached = false;
        for (id, node) in self.dfs() {
            exit_reached |= id == self.exit;
            if let Some(target) = node.targets().find(|&t| self.node(t).is_none()) {
                return Err(Error::Graph(format!(
                    "node {id} has an edge to removed node {target}"
                )));
            }
        }
        if !exit_reached {
            return Err(Error::Graph(format!(
                "exit node {} is not reachable from the entry",
                self.exit
            )));
        }
        Ok(())
    }

    /// Checks that branch selection never depends on evaluation order.
    ///
    /// Conditional successors are evaluated first-match-wins. The parser emits
    /// at most one conditional successor per node, so its graphs always pass.
    /// Other producers may add more, in which case no two of them may test the
    /// same guard operand: the later edge could never be taken.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Graph`] naming the first node with a repeated guard.
    pub fn validate_exclusive_guards(&self) -> Result<()> {
        for (id, node) in self.dfs() {
            for (i, branch) in node.successors.iter().enumerate() {
                if node.successors[..i].iter().any(|b| b.guard == branch.guard) {
                    return Err(Error::Graph(format!(
                        "node {id} tests guard {} more than once",
                        branch.guard
                    )));
                }
            }
        }
        Ok(())
    }

    /// Renders the reachable graph as indented text.
    ///
    /// Each node lists its declarations and statements, followed by its
    /// conditional edges and its follower.
    #[must_use]
    pub fn print(&self, vars: &VariableArena) -> String {
        let name = |v: VarId| vars.name(v);
        let mut out = String::new();
        for (id, node) in self.dfs() {
            let role = match (id == self.entry, id == self.exit) {
                (true, true) => " (entry, exit)",
                (true, false) => " (entry)",
                (false, true) => " (exit)",
                (false, false) => "",
            };
            let _ = writeln!(out, "{id}{role}:");
            for var in &node.decls {
                let _ = writeln!(out, "  DECL {}", name(*var));
            }
            for stmt in node.block.iter().flat_map(BasicBlock::iter) {
                let _ = writeln!(out, "  {}", stmt.display_with(name));
            }
            for branch in &node.successors {
                let _ = writeln!(
                    out,
                    "  [{}] -> {}",
                    branch.guard.display_with(name),
                    branch.target
                );
            }
            if let Some(follower) = node.follower {
                let _ = writeln!(out, "  -> {follower}");
            }
        }
        out
    }

    /// Renders the reachable graph in Graphviz DOT format.
    ///
    /// Nodes with code are boxes listing declarations and statements, nodes
    /// without a block are small circles. Conditional edges are dashed and
    /// labelled with their guard. The entry is filled green, the exit red.
    #[must_use]
    pub fn to_dot(&self, vars: &VariableArena) -> String {
        let name = |v: VarId| vars.name(v);
        let mut out = String::from("digraph control {\n");
        out.push_str("    node [fontname=\"Courier\"];\n");
        for (id, node) in self.dfs() {
            let fill = if id == self.entry {
                ", style=filled, fillcolor=lightgreen"
            } else if id == self.exit {
                ", style=filled, fillcolor=lightcoral"
            } else {
                ""
            };
            match &node.block {
                Some(block) => {
                    let decls = node.decls.iter().map(|v| format!("DECL {}", name(*v)));
                    let code = block.iter().map(|s| s.display_with(name));
                    let _ = writeln!(
                        out,
                        "    {id} [shape=box, label=\"{id}\\l{}\"{fill}];",
                        dot_lines(decls.chain(code))
                    );
                }
                None => {
                    let _ = writeln!(out, "    {id} [shape=circle, label=\"\"{fill}];");
                }
            }
            for branch in &node.successors {
                let _ = writeln!(
                    out,
                    "    {id} -> {} [style=dashed, label=\"{}\"];",
                    branch.target,
                    escape_dot(&branch.guard.display_with(name))
                );
            }
            if let Some(follower) = node.follower {
                let _ = writeln!(out, "    {id} -> {follower};");
            }
        }
        out.push_str("}\n");
        out
    }
}

/// Depth-first preorder iterator over a [`ControlGraph`].
pub struct DfsIter<'a> {
    graph: &'a ControlGraph,
    stack: Vec<CfgNodeId>,
    visited: BitSet,
}

impl<'a> Iterator for DfsIter<'a> {
    type Item = (CfgNodeId, &'a CfgNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            let Some(node) = self.graph.node(id) else {
                continue;
            };
            if !self.visited.insert(id.0) {
                continue;
            }
            // Pushed in reverse so that branches pop in list order, follower last.
            self.stack.extend(node.follower);
            self.stack
                .extend(node.successors.iter().rev().map(|b| b.target));
            return Some((id, node));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Operation, Statement, VariableKind};

    fn comment(text: &str) -> BasicBlock {
        std::iter::once(Statement::annotated(Operation::Comment, text)).collect()
    }

    /// entry -> a -[g]-> b -> a (loop), a -> exit
    fn looping_graph() -> (ControlGraph, CfgNodeId, CfgNodeId, VariableArena) {
        let mut vars = VariableArena::new();
        let g = vars.add("g", VariableKind::Temp, 1);

        let mut graph = ControlGraph::new();
        let a = graph.add_node(CfgNode::with_block(comment("a")));
        let b = graph.add_node(CfgNode::with_block(comment("b")));
        let entry = graph.entry();
        let exit = graph.exit();
        graph.node_mut(entry).unwrap().follower = None;
        graph.link(entry, a).unwrap();
        graph.link_guarded(a, b, Operand::new(g, 1)).unwrap();
        graph.link(a, exit).unwrap();
        graph.link(b, a).unwrap();
        (graph, a, b, vars)
    }

    #[test]
    fn test_trivial_graph() {
        let graph = ControlGraph::new();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.preorder(), vec![graph.entry(), graph.exit()]);
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_dfs_visits_cycle_once_and_repeats() {
        let (graph, a, b, _) = looping_graph();
        let first = graph.preorder();
        assert_eq!(first, vec![graph.entry(), a, b, graph.exit()]);
        assert_eq!(graph.preorder(), first);

        let mut count = 0;
        graph.for_each_dfs(|_, _| count += 1);
        assert_eq!(count, 4);
    }

    #[test]
    fn test_link_rejects_second_follower() {
        let (mut graph, a, b, _) = looping_graph();
        assert!(matches!(graph.link(a, b), Err(Error::Graph(_))));
        assert!(graph.link(a, CfgNodeId::new(99)).is_err());
    }

    #[test]
    fn test_predecessors_require_recompute() {
        let (mut graph, a, b, _) = looping_graph();
        assert!(graph.predecessors(a).is_err());

        graph.compute_predecessors();
        assert_eq!(graph.predecessors(a).unwrap(), &[graph.entry(), b]);
        assert_eq!(graph.predecessors(graph.exit()).unwrap(), &[a]);

        graph.link_guarded(b, graph.exit(), Operand::null()).unwrap();
        assert!(graph.predecessors(a).is_err());
    }

    #[test]
    fn test_copy_is_independent() {
        let (graph, a, _, _) = looping_graph();
        let mut copy = graph.copy();
        assert_eq!(copy.node_count(), graph.node_count());
        assert_eq!(copy.preorder().len(), 4);

        let copied_a = copy.preorder()[1];
        copy.node_mut(copied_a)
            .unwrap()
            .block_mut()
            .add_statement(Statement::nullary(Operation::Comment));
        assert_eq!(graph.node(a).unwrap().statement_count(), 1);
        assert_eq!(copy.node(copied_a).unwrap().statement_count(), 2);
    }

    #[test]
    fn test_copy_drops_unreachable_nodes() {
        let mut graph = ControlGraph::new();
        graph.add_node(CfgNode::with_block(comment("orphan")));
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.copy().node_count(), 2);
    }

    #[test]
    fn test_prepend_entry_and_append_exit() {
        let mut graph = ControlGraph::new();
        let old_entry = graph.prepend_entry();
        let old_exit = graph.append_exit();

        assert_ne!(graph.entry(), old_entry);
        assert_ne!(graph.exit(), old_exit);
        assert!(graph.node(old_entry).unwrap().block.is_some());
        assert!(graph.node(old_exit).unwrap().block.is_some());
        assert!(graph.node(graph.entry()).unwrap().block.is_none());
        assert_eq!(
            graph.preorder(),
            vec![graph.entry(), old_entry, old_exit, graph.exit()]
        );
    }

    #[test]
    fn test_append_and_prepend_graphs() {
        let mut graph = ControlGraph::new();
        graph.append(ControlGraph::new()).unwrap();
        assert_eq!(graph.preorder().len(), 4);
        graph.prepend(ControlGraph::new()).unwrap();
        assert_eq!(graph.preorder().len(), 6);
        assert!(graph.validate().is_ok());

        let mut closed = ControlGraph::new();
        let exit = closed.exit();
        let entry = closed.entry();
        closed.link(exit, entry).unwrap();
        assert!(graph.prepend(closed.copy()).is_err());
        assert!(closed.append(ControlGraph::new()).is_err());
    }

    #[test]
    fn test_split_moves_edges() {
        let (mut graph, a, b, _) = looping_graph();
        graph
            .node_mut(a)
            .unwrap()
            .block_mut()
            .add_statement(Statement::annotated(Operation::Comment, "a2"));

        let tail = graph.split(a, 0).unwrap();
        let head = graph.node(a).unwrap();
        assert_eq!(head.follower, Some(tail));
        assert!(head.successors.is_empty());
        assert_eq!(head.statement_count(), 1);

        let tail_node = graph.node(tail).unwrap();
        assert_eq!(tail_node.successors[0].target, b);
        assert_eq!(tail_node.follower, Some(graph.exit()));
        assert_eq!(tail_node.block.as_ref().unwrap()[0].comment(), Some("a2"));

        assert!(graph.split(graph.exit(), 0).is_err());
    }

    #[test]
    fn test_renumber_in_dfs_order() {
        let (mut graph, a, b, _) = looping_graph();
        assert_eq!(graph.renumber_statements(), 2);
        assert_eq!(graph.node(a).unwrap().block.as_ref().unwrap()[0].id, StmtId(0));
        assert_eq!(graph.node(b).unwrap().block.as_ref().unwrap()[0].id, StmtId(1));
    }

    #[test]
    fn test_validate_detects_dangling_edge() {
        let (mut graph, _, b, _) = looping_graph();
        graph.remove_node(b);
        assert!(matches!(graph.validate(), Err(Error::Graph(_))));
    }

    #[test]
    fn test_competing_guards_are_reported() {
        let (mut graph, a, b, vars) = looping_graph();
        assert!(graph.validate_exclusive_guards().is_ok());

        let g = vars.iter().next().unwrap().0;
        graph.link_guarded(a, b, Operand::new(g, 1).negate()).unwrap();
        assert!(graph.validate_exclusive_guards().is_ok());

        graph.link_guarded(a, graph.exit(), Operand::new(g, 1)).unwrap();
        assert!(matches!(
            graph.validate_exclusive_guards(),
            Err(Error::Graph(_))
        ));
    }

    #[test]
    fn test_dumps() {
        let (graph, _, _, vars) = looping_graph();
        let text = graph.print(&vars);
        assert!(text.contains("[g] -> n3"));
        assert!(text.contains("(entry)"));

        let dot = graph.to_dot(&vars);
        assert!(dot.starts_with("digraph control {"));
        assert!(dot.contains("style=dashed, label=\"g\""));
        assert!(dot.contains("fillcolor=lightgreen"));
        assert!(dot.trim_end().ends_with('}'));
    }
}
