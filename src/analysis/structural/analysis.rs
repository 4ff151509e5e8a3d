//! Region recovery by repeated collapsing.

use std::{
    collections::{HashMap, VecDeque},
    fmt::Write,
};

use crate::{
    analysis::{
        cfg::{CfgNodeId, ControlGraph},
        structural::node::{CfgMatch, StructId, StructuralEdge, StructuralKind, StructuralNode},
    },
    ir::{Operand, Operation, Statement, VarId, VariableArena},
    utils::{dot_lines, escape_dot},
};

/// Structural tree of a control graph.
///
/// Construction wraps every reachable control graph node into an
/// [`StructuralKind::Unreduced`] region and links the regions along a
/// depth-first spanning tree. Regions are then visited in postorder and
/// collapsed whenever one of the following patterns matches, highest priority
/// first:
///
/// 1. **Section**: a straight-line chain from a region opening a section to the
///    first region closing one.
/// 2. **Block**: a straight-line chain of at least two regions. Chains never
///    continue past a section boundary.
/// 3. **If-Else**: two successors with a single predecessor each, sharing
///    their only successor.
/// 4. **If**: a successor whose only successor is the other successor.
/// 5. **While loop**: a successor whose only predecessor and only successor is
///    the region itself.
/// 6. **Self loop**: a region with an edge to itself.
///
/// Collapsed regions stay in the arena with their container set. A new round
/// starts from a fresh postorder until a round collapses nothing. For graphs
/// built by the parser from structured constructs only the result is a single
/// live region, [`StructuralAnalysis::head`].
///
/// # Examples
///
/// ```rust
/// use shcore::prelude::*;
///
/// let mut blocks = BlockList::new();
/// blocks.push_basic(BasicBlock::new());
/// blocks.push_basic(BasicBlock::new());
///
/// let graph = ControlGraph::from_blocks(blocks)?;
/// let tree = StructuralAnalysis::new(&graph);
/// assert!(tree.is_fully_reduced());
/// assert!(matches!(tree.kind(tree.head()), Some(StructuralKind::Block { .. })));
/// # Ok::<(), shcore::Error>(())
/// ```
#[derive(Debug)]
pub struct StructuralAnalysis<'a> {
    graph: &'a ControlGraph,
    nodes: Vec<StructuralNode>,
    head: StructId,
    rounds: usize,
}

impl<'a> StructuralAnalysis<'a> {
    /// Builds and reduces the structural tree of `graph`.
    #[must_use]
    pub fn new(graph: &'a ControlGraph) -> Self {
        let mut analysis = Self {
            graph,
            nodes: Vec::new(),
            head: StructId(0),
            rounds: 0,
        };
        analysis.head = analysis.build_tree();
        analysis.reduce();
        analysis
    }

    /// The outermost live region.
    #[must_use]
    pub const fn head(&self) -> StructId {
        self.head
    }

    /// The analysed graph.
    #[must_use]
    pub const fn graph(&self) -> &'a ControlGraph {
        self.graph
    }

    /// Number of reduction rounds run, the final unproductive one included.
    #[must_use]
    pub const fn rounds(&self) -> usize {
        self.rounds
    }

    /// Returns the region behind `id`.
    #[must_use]
    pub fn node(&self, id: StructId) -> Option<&StructuralNode> {
        self.nodes.get(id.0)
    }

    /// Returns the kind of the region behind `id`.
    #[must_use]
    pub fn kind(&self, id: StructId) -> Option<&StructuralKind> {
        self.node(id).map(StructuralNode::kind)
    }

    /// Number of regions ever created, collapsed ones included.
    #[must_use]
    pub fn region_count(&self) -> usize {
        self.nodes.len()
    }

    /// Regions not collapsed into any other region.
    #[must_use]
    pub fn live_regions(&self) -> Vec<StructId> {
        (0..self.nodes.len())
            .map(StructId)
            .filter(|&id| self.at(id).container.is_none())
            .collect()
    }

    /// Returns `true` if everything collapsed into the head region.
    #[must_use]
    pub fn is_fully_reduced(&self) -> bool {
        self.live_regions() == [self.head]
    }

    /// The [`StructuralKind::Unreduced`] region wrapping `cfg`.
    #[must_use]
    pub fn leaf(&self, cfg: CfgNodeId) -> Option<StructId> {
        (0..self.nodes.len())
            .map(StructId)
            .find(|&id| matches!(self.at(id).kind, StructuralKind::Unreduced { cfg: c } if c == cfg))
    }

    /// Control graph nodes inside `id`, in member order.
    #[must_use]
    pub fn leaves(&self, id: StructId) -> Vec<CfgNodeId> {
        let mut leaves = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.node(current) else {
                continue;
            };
            match &node.kind {
                StructuralKind::Unreduced { cfg } => leaves.push(*cfg),
                kind => stack.extend(kind.members().into_iter().rev()),
            }
        }
        leaves
    }

    /// Returns `true` if `cfg` is one of the nodes inside `id`.
    #[must_use]
    pub fn contains(&self, id: StructId, cfg: CfgNodeId) -> bool {
        self.leaves(id).contains(&cfg)
    }

    /// Control graph edges leaving `id` that realise the region edge `edge`:
    /// same guard, target inside `edge.target`.
    #[must_use]
    pub fn get_succs(&self, id: StructId, edge: &StructuralEdge) -> Vec<CfgMatch> {
        let targets = self.leaves(edge.target);
        self.cfg_edges(id, |guard, to| {
            guard == edge.guard.as_ref() && targets.contains(&to)
        })
    }

    /// Control graph edges from inside `id` to outside of `of` (default `id`).
    #[must_use]
    pub fn get_exits(&self, id: StructId, of: Option<StructId>) -> Vec<CfgMatch> {
        let inside = self.leaves(of.unwrap_or(id));
        self.cfg_edges(id, |_, to| !inside.contains(&to))
    }

    /// Control graph edges from `id`'s predecessor regions into `of` (default `id`).
    #[must_use]
    pub fn get_entries(&self, id: StructId, of: Option<StructId>) -> Vec<CfgMatch> {
        let inside = self.leaves(of.unwrap_or(id));
        self.incoming(id)
            .iter()
            .flat_map(|pred| self.cfg_edges(pred.target, |_, to| inside.contains(&to)))
            .collect()
    }

    /// Control graph edges entering `id` with guard `edge.guard`, taken from
    /// the predecessor regions reached through incoming edges with that guard.
    #[must_use]
    pub fn get_preds(&self, id: StructId, edge: &StructuralEdge) -> Vec<CfgMatch> {
        let inside = self.leaves(id);
        self.incoming(id)
            .iter()
            .filter(|pred| pred.guard == edge.guard)
            .flat_map(|pred| {
                self.cfg_edges(pred.target, |guard, to| {
                    guard == edge.guard.as_ref() && inside.contains(&to)
                })
            })
            .collect()
    }

    fn incoming(&self, id: StructId) -> &[StructuralEdge] {
        self.node(id)
            .map(|node| node.preds.as_slice())
            .unwrap_or_default()
    }

    fn cfg_edges<F>(&self, id: StructId, keep: F) -> Vec<CfgMatch>
    where
        F: Fn(Option<&Operand>, CfgNodeId) -> bool,
    {
        self.leaves(id)
            .into_iter()
            .filter_map(|from| self.graph.node(from).map(|node| (from, node)))
            .flat_map(|(from, node)| {
                node.edges()
                    .filter(|&(_, guard, to)| keep(guard, to))
                    .map(move |(slot, _, to)| CfgMatch { from, to, slot })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    fn at(&self, id: StructId) -> &StructuralNode {
        &self.nodes[id.0]
    }

    fn at_mut(&mut self, id: StructId) -> &mut StructuralNode {
        &mut self.nodes[id.0]
    }

    fn add_unreduced(&mut self, cfg: CfgNodeId) -> StructId {
        let mut region = StructuralNode::new(StructuralKind::Unreduced { cfg });
        if let Some(block) = self.graph.node(cfg).and_then(|n| n.block.as_ref()) {
            region.sec_start = marker_name(block.first(), Operation::StartSection);
            region.sec_end = marker_name(block.last(), Operation::EndSection);
        }
        self.nodes.push(region);
        StructId(self.nodes.len() - 1)
    }

    /// Wraps every reachable node and records the depth-first spanning tree.
    fn build_tree(&mut self) -> StructId {
        let entry = self.graph.entry();
        let root = self.add_unreduced(entry);
        let mut regions = HashMap::from([(entry, root)]);
        let mut stack = vec![(entry, 0usize)];

        while let Some((cfg, next)) = stack.last_mut() {
            let cfg = *cfg;
            let edge = self
                .graph
                .node(cfg)
                .and_then(|node| node.edges().nth(*next))
                .map(|(_, guard, to)| (guard.cloned(), to));
            let Some((guard, to)) = edge else {
                stack.pop();
                continue;
            };
            *next += 1;

            let Some(&from) = regions.get(&cfg) else {
                continue;
            };
            if self.graph.node(to).is_none() {
                continue;
            }
            let target = match regions.get(&to) {
                Some(&target) => target,
                None => {
                    let target = self.add_unreduced(to);
                    regions.insert(to, target);
                    self.at_mut(target).parent = Some(from);
                    self.at_mut(from).children.push(target);
                    stack.push((to, 0));
                    target
                }
            };
            self.at_mut(from)
                .succs
                .push(StructuralEdge::new(guard.clone(), target));
            self.at_mut(target)
                .preds
                .push(StructuralEdge::new(guard, from));
        }
        root
    }

    fn postorder(&self) -> Vec<StructId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(self.head, 0usize)];
        while let Some((id, next)) = stack.last_mut() {
            let id = *id;
            match self.at(id).children.get(*next) {
                Some(&child) => {
                    *next += 1;
                    stack.push((child, 0));
                }
                None => {
                    order.push(id);
                    stack.pop();
                }
            }
        }
        order
    }

    fn reduce(&mut self) {
        loop {
            self.rounds += 1;
            let mut changed = false;
            let mut worklist: VecDeque<StructId> = self.postorder().into();
            while let Some(id) = worklist.pop_front() {
                if let Some(kind) = self.match_region(id) {
                    self.collapse(kind, &mut worklist);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    fn match_region(&self, id: StructId) -> Option<StructuralKind> {
        let chain = self.chain(id);
        if let Some(section) = self.find_section(&chain) {
            return Some(section);
        }
        if let Some(members) = self.block_segment(&chain, id) {
            return Some(StructuralKind::Block { members });
        }
        self.match_conditional(id).or_else(|| self.match_loop(id))
    }

    /// Maximal straight-line chain through `seed`. Each link is the only
    /// successor of its source and the only predecessor of its target.
    fn chain(&self, seed: StructId) -> Vec<StructId> {
        let mut chain = VecDeque::from([seed]);
        while let Some(&first) = chain.front() {
            let [pred] = self.at(first).preds.as_slice() else {
                break;
            };
            if self.at(pred.target).succs.len() != 1 || chain.contains(&pred.target) {
                break;
            }
            chain.push_front(pred.target);
        }
        while let Some(&last) = chain.back() {
            let [succ] = self.at(last).succs.as_slice() else {
                break;
            };
            if self.at(succ.target).preds.len() != 1 || chain.contains(&succ.target) {
                break;
            }
            chain.push_back(succ.target);
        }
        chain.into()
    }

    /// The last section start in `chain` together with the first end after it.
    fn find_section(&self, chain: &[StructId]) -> Option<StructuralKind> {
        let start = chain
            .iter()
            .rposition(|&id| self.at(id).sec_start.is_some())?;
        let name = self.at(chain[start]).sec_start.clone()?;
        let Some(length) = chain[start..]
            .iter()
            .position(|&id| self.at(id).sec_end.is_some())
        else {
            log::trace!("section {name} does not end within its chain");
            return None;
        };
        Some(StructuralKind::Section {
            name,
            members: chain[start..=start + length].to_vec(),
        })
    }

    /// The part of `chain` around `seed` that crosses no section boundary.
    fn block_segment(&self, chain: &[StructId], seed: StructId) -> Option<Vec<StructId>> {
        let mut segment = Vec::new();
        for &id in chain {
            let node = self.at(id);
            if node.sec_start.is_some() && !segment.is_empty() {
                if segment.contains(&seed) {
                    break;
                }
                segment.clear();
            }
            segment.push(id);
            if node.sec_end.is_some() {
                if segment.contains(&seed) {
                    break;
                }
                segment.clear();
            }
        }
        (segment.len() >= 2 && segment.contains(&seed)).then_some(segment)
    }

    fn match_conditional(&self, id: StructId) -> Option<StructuralKind> {
        let [first, second] = self.at(id).succs.as_slice() else {
            return None;
        };
        let (m, n) = (first.target, second.target);
        if m == n || m == id || n == id {
            return None;
        }

        let (arm_m, arm_n) = (self.at(m), self.at(n));
        if let ([join], 1, 1) = (arm_m.succs.as_slice(), arm_m.preds.len(), arm_n.preds.len()) {
            if arm_m.succs == arm_n.succs && ![id, m, n].contains(&join.target) {
                return Some(StructuralKind::IfElse {
                    head: id,
                    then_branch: m,
                    else_branch: n,
                });
            }
        }

        [(m, n), (n, m)].into_iter().find_map(|(body, other)| {
            let arm = self.at(body);
            match arm.succs.as_slice() {
                [only] if only.target == other && arm.preds.len() == 1 => {
                    Some(StructuralKind::If { head: id, body })
                }
                _ => None,
            }
        })
    }

    fn match_loop(&self, id: StructId) -> Option<StructuralKind> {
        let node = self.at(id);
        let body = node.succs.iter().map(|e| e.target).find(|&s| {
            let arm = self.at(s);
            s != id
                && arm.preds.len() == 1
                && matches!(arm.succs.as_slice(), [back] if back.target == id)
        });
        if let Some(body) = body {
            return Some(StructuralKind::WhileLoop { head: id, body });
        }
        node.succs
            .iter()
            .any(|e| e.target == id)
            .then_some(StructuralKind::SelfLoop { body: id })
    }

    /// Replaces the members of `kind` by one new region and rewires the tree.
    fn collapse(&mut self, kind: StructuralKind, worklist: &mut VecDeque<StructId>) {
        let set = kind.members();
        let (Some(&front), Some(&back)) = (set.first(), set.last()) else {
            return;
        };
        let is_block = matches!(kind, StructuralKind::Block { .. });
        let new = StructId(self.nodes.len());

        let mut region = StructuralNode::new(kind);
        region.parent = self.at(front).parent.filter(|p| !set.contains(p));
        match region.kind {
            StructuralKind::Block { .. } => {
                region.sec_start = self.at(front).sec_start.clone();
                region.sec_end = self.at(back).sec_end.clone();
            }
            StructuralKind::If { .. } | StructuralKind::IfElse { .. } => {
                region.sec_start = self.at(front).sec_start.clone();
            }
            _ => {}
        }

        for (position, &member) in set.iter().enumerate() {
            let node = self.at(member);
            for pred in &node.preds {
                if position == 0 && is_block && pred.target == back {
                    region.preds.push(StructuralEdge::new(pred.guard.clone(), new));
                } else if !set.contains(&pred.target) && !region.preds.contains(pred) {
                    region.preds.push(pred.clone());
                }
            }
            for succ in &node.succs {
                if member == back && is_block && succ.target == front {
                    region.succs.push(StructuralEdge::new(succ.guard.clone(), new));
                } else if !set.contains(&succ.target) && !region.succs.contains(succ) {
                    region.succs.push(succ.clone());
                }
            }
            region
                .children
                .extend(node.children.iter().filter(|c| !set.contains(c)));
        }
        dedup_edges(&mut region.succs);
        dedup_edges(&mut region.preds);

        for &member in &set {
            if let Some(parent) = self.at(member).parent.filter(|p| !set.contains(p)) {
                for child in &mut self.at_mut(parent).children {
                    if *child == member {
                        *child = new;
                    }
                }
            }
            self.at_mut(member).container = Some(new);
        }
        worklist.retain(|id| !set.contains(id));

        let children = region.children.clone();
        let succs: Vec<StructId> = region.succs.iter().map(|e| e.target).collect();
        let preds: Vec<StructId> = region.preds.iter().map(|e| e.target).collect();
        log::trace!(
            "collapsed {:?} into {} {new}",
            set,
            region.kind.name()
        );
        self.nodes.push(region);

        for child in children {
            self.at_mut(child).parent = Some(new);
        }
        for succ in succs.into_iter().filter(|&s| s != new) {
            let edges = &mut self.at_mut(succ).preds;
            retarget(edges, &set, new);
            dedup_edges(edges);
        }
        for pred in preds.into_iter().filter(|&p| p != new) {
            let edges = &mut self.at_mut(pred).succs;
            retarget(edges, &set, new);
            dedup_edges(edges);
        }

        worklist.push_back(new);
        if set.contains(&self.head) {
            self.head = new;
        }
    }

    /// Renders the tree as indented text, one region per line.
    #[must_use]
    pub fn print(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![(self.head, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let node = self.at(id);
            let _ = write!(out, "{:indent$}{} {id}", "", node.kind.name(), indent = depth * 2);
            match &node.kind {
                StructuralKind::Unreduced { cfg } => {
                    let _ = write!(out, " {cfg}");
                }
                StructuralKind::Section { name, .. } => {
                    let _ = write!(out, " \"{name}\"");
                }
                _ => {}
            }
            out.push('\n');
            stack.extend(node.members().into_iter().rev().map(|m| (m, depth + 1)));
        }
        out
    }

    /// Renders the tree in Graphviz DOT format.
    ///
    /// Every collapsed region becomes a cluster with a green entry marker and a
    /// red exit marker. Region edges connect exit markers to entry markers;
    /// guarded edges are dashed and labelled.
    #[must_use]
    pub fn to_dot(&self, vars: &VariableArena) -> String {
        let mut out = String::from("digraph structural {\n");
        self.dot_region(self.head, vars, &mut out);

        let mut stack = vec![self.head];
        while let Some(id) = stack.pop() {
            let node = self.at(id);
            for succ in &node.succs {
                let _ = write!(out, "  {} -> {}", self.dot_from(id), self.dot_to(succ.target));
                if let Some(guard) = &succ.guard {
                    let label = guard.display_with(|v: VarId| vars.name(v));
                    let _ = write!(out, " [style=dashed, label=\"{}\"]", escape_dot(&label));
                }
                out.push_str(";\n");
            }
            stack.extend(node.members());
        }
        out.push_str("}\n");
        out
    }

    fn dot_region(&self, id: StructId, vars: &VariableArena, out: &mut String) {
        let node = self.at(id);
        if let StructuralKind::Unreduced { cfg } = node.kind {
            match self.graph.node(cfg).and_then(|n| n.block.as_ref()) {
                Some(block) => {
                    let lines = block.iter().map(|s| s.display_with(|v| vars.name(v)));
                    let _ = writeln!(out, "  {id} [label=\"{cfg}\\l{}\", shape=box];", dot_lines(lines));
                }
                None => {
                    let _ = writeln!(out, "  {id} [label=\"\", shape=circle, height=0.25];");
                }
            }
            return;
        }

        let _ = writeln!(out, "subgraph cluster_{id} {{");
        let _ = writeln!(
            out,
            "  {id}_entry [label=\"\", shape=box, style=filled, fillcolor=green];"
        );
        for member in node.members() {
            self.dot_region(member, vars, out);
        }
        let _ = writeln!(out, "  label=\"{}\";", node.kind.name());
        let _ = writeln!(
            out,
            "  {id}_exit [label=\"\", shape=box, style=filled, fillcolor=red];"
        );
        out.push_str("}\n");
    }

    fn dot_from(&self, id: StructId) -> String {
        match self.at(id).kind {
            StructuralKind::Unreduced { .. } => id.to_string(),
            _ => format!("{id}_exit"),
        }
    }

    fn dot_to(&self, id: StructId) -> String {
        match self.at(id).kind {
            StructuralKind::Unreduced { .. } => id.to_string(),
            _ => format!("{id}_entry"),
        }
    }
}

fn marker_name(stmt: Option<&Statement>, op: Operation) -> Option<String> {
    stmt.filter(|s| s.op == op)
        .map(|s| s.comment().unwrap_or_default().to_string())
}

/// Points edges at members of `set` to `new`.
fn retarget(edges: &mut [StructuralEdge], set: &[StructId], new: StructId) {
    for edge in edges.iter_mut().filter(|e| set.contains(&e.target)) {
        edge.target = new;
    }
}

/// Keeps one edge per target. An unconditional edge wins over guarded ones.
fn dedup_edges(edges: &mut Vec<StructuralEdge>) {
    let mut kept: Vec<StructuralEdge> = Vec::with_capacity(edges.len());
    for edge in edges.drain(..) {
        match kept.iter().position(|k| k.target == edge.target) {
            Some(index) if edge.guard.is_none() && kept[index].guard.is_some() => {
                kept.remove(index);
                kept.push(edge);
            }
            Some(_) => {}
            None => kept.push(edge),
        }
    }
    *edges = kept;
}
