//! Structured parser turning a front end [`BlockList`] into a [`ControlGraph`].
//!
//! Every construct becomes a small subgraph with one head and one tail node.
//! Consecutive constructs are chained through follower edges. Loops push a
//! scope holding the `BREAK` and `CONTINUE` targets.

use crate::{
    analysis::cfg::{
        graph::ControlGraph,
        node::{CfgNode, CfgNodeId},
    },
    ir::{BasicBlock, Block, BlockList, Operation, Statement, Token, TokenKind},
    Result,
};

/// Head and tail of a parsed range.
type Range = (CfgNodeId, CfgNodeId);

/// Jump targets of the innermost enclosing loop.
#[derive(Debug, Clone, Copy)]
struct LoopScope {
    break_target: CfgNodeId,
    continue_target: CfgNodeId,
}

/// Recursive-descent parser over a block list.
///
/// The only state besides the graph under construction is the loop scope
/// stack. Parsing is a pure function of the input, see [`Parser::parse`].
#[derive(Debug)]
pub struct Parser {
    pub(crate) graph: ControlGraph,
    scopes: Vec<LoopScope>,
}

impl Parser {
    pub(crate) fn new() -> Self {
        Self {
            graph: ControlGraph::under_construction(),
            scopes: Vec::new(),
        }
    }

    /// Parses `blocks` into a graph whose entry is the head of the first
    /// construct and whose exit is the tail of the last one.
    ///
    /// An empty block list yields the trivial two-node graph. Use
    /// [`ControlGraph::from_blocks`] to get a graph framed by empty entry and
    /// exit nodes instead.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Parse`] if a token has the wrong kind or argument
    /// count, a `BREAK`/`CONTINUE` appears outside of a loop, a section has no
    /// name, or tokens are left over at the top level.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use shcore::{BasicBlock, BlockList, Parser};
    ///
    /// let mut blocks = BlockList::new();
    /// blocks.push_basic(BasicBlock::new());
    /// blocks.push_basic(BasicBlock::new());
    ///
    /// let graph = Parser::parse(blocks)?;
    /// assert_eq!(graph.preorder().len(), 2);
    /// # Ok::<(), shcore::Error>(())
    /// ```
    pub fn parse(blocks: BlockList) -> Result<ControlGraph> {
        let mut parser = Self::new();
        match parser.parse_all(blocks)? {
            Some((head, tail)) => {
                let mut graph = parser.graph;
                graph.set_bounds(head, tail);
                Ok(graph)
            }
            None => Ok(ControlGraph::new()),
        }
    }

    /// Parses the whole list and rejects leftover tokens.
    pub(crate) fn parse_all(&mut self, mut blocks: BlockList) -> Result<Option<Range>> {
        let range = self.parse_stmts(&mut blocks)?;
        match blocks.pop_front() {
            None => Ok(range),
            Some(Block::Token(token)) => Err(parse_error!("unexpected {} token", token.kind)),
            Some(_) => Err(parse_error!("unexpected block after top level sequence")),
        }
    }

    /// Parses constructs until the list is exhausted or a closing token shows up.
    fn parse_stmts(&mut self, blocks: &mut BlockList) -> Result<Option<Range>> {
        let mut range: Option<Range> = None;
        while let Some((head, tail)) = self.parse_construct(blocks)? {
            range = match range {
                None => Some((head, tail)),
                Some((first, last)) => {
                    self.graph.link(last, head)?;
                    Some((first, tail))
                }
            };
        }
        Ok(range)
    }

    /// Like [`Parser::parse_stmts`], but an empty range becomes one empty node.
    fn parse_nonempty(&mut self, blocks: &mut BlockList) -> Result<Range> {
        match self.parse_stmts(blocks)? {
            Some(range) => Ok(range),
            None => Ok(self.empty_range()),
        }
    }

    fn empty_range(&mut self) -> Range {
        let node = self.graph.add_node(CfgNode::new());
        (node, node)
    }

    /// Parses one construct from the front of `blocks`.
    fn parse_construct(&mut self, blocks: &mut BlockList) -> Result<Option<Range>> {
        if let Some(Block::Token(token)) = blocks.front() {
            if token.kind.terminates_sequence() {
                return Ok(None);
            }
        }
        let range = match blocks.pop_front() {
            None => return Ok(None),
            Some(Block::Basic(block)) => self.parse_block(block),
            Some(Block::Graph(graph)) => self.graph.absorb(graph),
            Some(Block::Token(token)) => {
                let token = check_arguments(token)?;
                match token.kind {
                    TokenKind::If => self.parse_if(token, blocks)?,
                    TokenKind::While => self.parse_while(token, blocks)?,
                    TokenKind::Do => self.parse_do(blocks)?,
                    TokenKind::For => self.parse_for(token, blocks)?,
                    TokenKind::Break | TokenKind::Continue => self.parse_jump(token)?,
                    TokenKind::StartSection => self.parse_section(token, blocks)?,
                    other => return Err(parse_error!("unexpected {} token", other)),
                }
            }
        };
        Ok(Some(range))
    }

    /// One node per basic block. `DECL` statements move into the node's
    /// declaration set.
    fn parse_block(&mut self, mut block: BasicBlock) -> Range {
        let mut node = CfgNode::new();
        block.retain(|stmt| {
            if stmt.op != Operation::Decl {
                return true;
            }
            if let Some(var) = stmt.dest.var() {
                node.add_decl(var);
            }
            false
        });
        node.block = Some(block);
        let id = self.graph.add_node(node);
        (id, id)
    }

    fn parse_if(&mut self, mut token: Token, blocks: &mut BlockList) -> Result<Range> {
        let cond = token.arguments.remove(0);
        let (head, tail) = self.parse_nonempty_list(cond.blocks)?;

        let (if_head, if_tail) = self.parse_nonempty(blocks)?;
        let mut closing = pop_any_token(blocks)?;
        let (else_head, else_tail) = if closing.kind == TokenKind::Else {
            let range = self.parse_nonempty(blocks)?;
            closing = pop_any_token(blocks)?;
            range
        } else {
            self.empty_range()
        };
        if closing.kind != TokenKind::EndIf {
            return Err(parse_error!("expected ENDIF, found {}", closing.kind));
        }

        self.graph.link_guarded(tail, if_head, cond.result)?;
        self.graph.link(tail, else_head)?;

        let merge = self.graph.add_node(CfgNode::new());
        self.graph.link(if_tail, merge)?;
        self.graph.link(else_tail, merge)?;
        Ok((head, merge))
    }

    fn parse_while(&mut self, mut token: Token, blocks: &mut BlockList) -> Result<Range> {
        let cond = token.arguments.remove(0);
        let (head, tail) = self.parse_nonempty_list(cond.blocks)?;

        let exit = self.graph.add_node(CfgNode::new());
        let (body_head, body_tail) = self.parse_loop_body(blocks, exit, head)?;
        pop_token(blocks, TokenKind::EndWhile)?;

        self.graph.link_guarded(tail, body_head, cond.result)?;
        self.graph.link(tail, exit)?;
        self.graph.link(body_tail, head)?;
        Ok((head, exit))
    }

    fn parse_do(&mut self, blocks: &mut BlockList) -> Result<Range> {
        let head = self.graph.add_node(CfgNode::new());
        let exit = self.graph.add_node(CfgNode::new());
        let loop_end = self.graph.add_node(CfgNode::new());

        // The until condition still belongs to the loop.
        let scope = LoopScope {
            break_target: exit,
            continue_target: loop_end,
        };
        let ((body_head, body_tail), (cond_head, cond_tail), result) =
            self.within_loop(scope, |parser| {
                let body = parser.parse_nonempty(blocks)?;
                let mut token = pop_token(blocks, TokenKind::Until)?;
                let cond = token.arguments.remove(0);
                let range = parser.parse_nonempty_list(cond.blocks)?;
                Ok((body, range, cond.result))
            })?;

        self.graph.link(head, body_head)?;
        self.graph.link(body_tail, loop_end)?;
        self.graph.link(loop_end, cond_head)?;
        self.graph.link_guarded(cond_tail, exit, result)?;
        self.graph.link(cond_tail, body_head)?;
        Ok((head, exit))
    }

    fn parse_for(&mut self, token: Token, blocks: &mut BlockList) -> Result<Range> {
        let mut arguments = token.arguments.into_iter();
        let (Some(init), Some(cond), Some(update)) =
            (arguments.next(), arguments.next(), arguments.next())
        else {
            return Err(parse_error!("FOR requires init, condition and update"));
        };

        let (head, tail) = self.parse_nonempty_list(init.blocks)?;
        let (cond_head, cond_tail) = self.parse_nonempty_list(cond.blocks)?;
        let (update_head, update_tail) = self.parse_nonempty_list(update.blocks)?;

        let exit = self.graph.add_node(CfgNode::new());
        let (body_head, body_tail) = self.parse_loop_body(blocks, exit, update_head)?;
        pop_token(blocks, TokenKind::EndFor)?;

        self.graph.link(tail, cond_head)?;
        self.graph.link_guarded(cond_tail, body_head, cond.result)?;
        self.graph.link(cond_tail, exit)?;
        self.graph.link(body_tail, update_head)?;
        self.graph.link(update_tail, cond_head)?;
        Ok((head, exit))
    }

    /// `BREAK` and `CONTINUE`: the guard computation ends with a guarded edge
    /// to the innermost loop's exit or continuation.
    fn parse_jump(&mut self, mut token: Token) -> Result<Range> {
        let kind = token.kind;
        let scope = self
            .scopes
            .last()
            .copied()
            .ok_or_else(|| parse_error!("{} outside of a loop", kind))?;
        let target = if kind == TokenKind::Break {
            scope.break_target
        } else {
            scope.continue_target
        };

        let cond = token.arguments.remove(0);
        let (head, tail) = self.parse_nonempty_list(cond.blocks)?;
        self.graph.link_guarded(tail, target, cond.result)?;
        Ok((head, tail))
    }

    /// Wraps the section body between a `STARTSEC` node and an `ENDSEC` node,
    /// both tagged with the section name.
    fn parse_section(&mut self, token: Token, blocks: &mut BlockList) -> Result<Range> {
        let name = match token.name {
            Some(name) => name,
            None => take_leading_comment(blocks)
                .ok_or_else(|| parse_error!("STARTSEC without a section name"))?,
        };

        let (body_head, body_tail) = self.parse_nonempty(blocks)?;
        pop_token(blocks, TokenKind::EndSection)?;

        let head = self.graph.add_node(CfgNode::with_block(
            std::iter::once(Statement::annotated(Operation::StartSection, name.clone())).collect(),
        ));
        let tail = self.graph.add_node(CfgNode::with_block(
            std::iter::once(Statement::annotated(Operation::EndSection, name)).collect(),
        ));
        self.graph.link(head, body_head)?;
        self.graph.link(body_tail, tail)?;
        Ok((head, tail))
    }

    fn parse_loop_body(
        &mut self,
        blocks: &mut BlockList,
        break_target: CfgNodeId,
        continue_target: CfgNodeId,
    ) -> Result<Range> {
        let scope = LoopScope {
            break_target,
            continue_target,
        };
        self.within_loop(scope, |parser| parser.parse_nonempty(blocks))
    }

    /// Runs `parse` with `scope` as the innermost loop.
    fn within_loop<T>(
        &mut self,
        scope: LoopScope,
        parse: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.scopes.push(scope);
        let parsed = parse(self);
        self.scopes.pop();
        parsed
    }

    /// Parses a token argument's own block list, which must be consumed entirely.
    fn parse_nonempty_list(&mut self, mut blocks: BlockList) -> Result<Range> {
        let range = self.parse_nonempty(&mut blocks)?;
        if let Some(Block::Token(token)) = blocks.front() {
            return Err(parse_error!("unexpected {} token in token argument", token.kind));
        }
        Ok(range)
    }
}

/// Pops a token of `kind` carrying exactly [`TokenKind::argument_count`] arguments.
fn pop_token(blocks: &mut BlockList, kind: TokenKind) -> Result<Token> {
    let token = pop_any_token(blocks)?;
    if token.kind != kind {
        return Err(parse_error!("expected {}, found {}", kind, token.kind));
    }
    check_arguments(token)
}

fn check_arguments(token: Token) -> Result<Token> {
    let expected = token.kind.argument_count();
    if token.arguments.len() != expected {
        return Err(parse_error!(
            "{} expects {} arguments, found {}",
            token.kind,
            expected,
            token.arguments.len()
        ));
    }
    Ok(token)
}

fn pop_any_token(blocks: &mut BlockList) -> Result<Token> {
    match blocks.pop_front() {
        Some(Block::Token(token)) => Ok(token),
        Some(_) => Err(parse_error!("expected a token, found a block")),
        None => Err(parse_error!("expected a token, found the end of input")),
    }
}

/// Removes a leading `COMMENT` from the next basic block and returns its text.
fn take_leading_comment(blocks: &mut BlockList) -> Option<String> {
    let Some(Block::Basic(block)) = blocks.front_mut() else {
        return None;
    };
    if block.first().map(|s| s.op) != Some(Operation::Comment) {
        return None;
    }
    block.remove(0).and_then(|stmt| stmt.info.comment)
}
