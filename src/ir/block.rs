//! Basic blocks: straight-line statement sequences.

use std::ops::Index;

use crate::ir::Statement;

/// An ordered sequence of statements without internal control transfer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BasicBlock {
    statements: Vec<Statement>,
}

impl BasicBlock {
    /// Creates an empty block.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a statement.
    pub fn add_statement(&mut self, stmt: Statement) {
        self.statements.push(stmt);
    }

    /// Inserts a statement in front of all others.
    pub fn prepend_statement(&mut self, stmt: Statement) {
        self.statements.insert(0, stmt);
    }

    /// Inserts a statement at `index`, shifting later statements back.
    ///
    /// # Panics
    ///
    /// Panics if `index > self.len()`.
    pub fn insert(&mut self, index: usize, stmt: Statement) {
        self.statements.insert(index, stmt);
    }

    /// Removes and returns the statement at `index`.
    pub fn remove(&mut self, index: usize) -> Option<Statement> {
        (index < self.statements.len()).then(|| self.statements.remove(index))
    }

    /// Splits the block after the statement at `at`.
    ///
    /// `self` keeps statements `0..=at`; the returned block holds the rest in
    /// their original order. An `at` past the end returns an empty block.
    #[must_use]
    pub fn split(&mut self, at: usize) -> BasicBlock {
        let cut = (at + 1).min(self.statements.len());
        BasicBlock {
            statements: self.statements.split_off(cut),
        }
    }

    /// Moves all statements of `other` to the end of this block.
    pub fn append(&mut self, other: &mut BasicBlock) {
        self.statements.append(&mut other.statements);
    }

    /// Keeps only the statements for which `keep` returns `true`.
    pub fn retain(&mut self, keep: impl FnMut(&Statement) -> bool) {
        self.statements.retain(keep);
    }

    /// Number of statements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Returns `true` if the block has no statements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// First statement.
    #[must_use]
    pub fn first(&self) -> Option<&Statement> {
        self.statements.first()
    }

    /// Last statement.
    #[must_use]
    pub fn last(&self) -> Option<&Statement> {
        self.statements.last()
    }

    /// Iterates over the statements in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Statement> {
        self.statements.iter()
    }

    /// Iterates mutably over the statements in order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Statement> {
        self.statements.iter_mut()
    }

    /// Returns the statement at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Statement> {
        self.statements.get(index)
    }

    /// Returns the statement at `index` mutably.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Statement> {
        self.statements.get_mut(index)
    }
}

impl Index<usize> for BasicBlock {
    type Output = Statement;

    fn index(&self, index: usize) -> &Statement {
        &self.statements[index]
    }
}

impl FromIterator<Statement> for BasicBlock {
    fn from_iter<T: IntoIterator<Item = Statement>>(iter: T) -> Self {
        Self {
            statements: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a BasicBlock {
    type Item = &'a Statement;
    type IntoIter = std::slice::Iter<'a, Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.iter()
    }
}

impl<'a> IntoIterator for &'a mut BasicBlock {
    type Item = &'a mut Statement;
    type IntoIter = std::slice::IterMut<'a, Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.iter_mut()
    }
}

impl IntoIterator for BasicBlock {
    type Item = Statement;
    type IntoIter = std::vec::IntoIter<Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Operation;

    fn comments(names: &[&str]) -> BasicBlock {
        names
            .iter()
            .map(|n| Statement::annotated(Operation::Comment, *n))
            .collect()
    }

    fn names(block: &BasicBlock) -> Vec<&str> {
        block.iter().filter_map(Statement::comment).collect()
    }

    #[test]
    fn test_split_keeps_prefix_through_at() {
        let mut block = comments(&["a", "b", "c", "d"]);
        let tail = block.split(1);
        assert_eq!(names(&block), vec!["a", "b"]);
        assert_eq!(names(&tail), vec!["c", "d"]);
    }

    #[test]
    fn test_split_at_last() {
        let mut block = comments(&["a", "b"]);
        let tail = block.split(1);
        assert_eq!(block.len(), 2);
        assert!(tail.is_empty());

        let tail = block.split(10);
        assert!(tail.is_empty());
    }

    #[test]
    fn test_append_and_edit() {
        let mut a = comments(&["a"]);
        let mut b = comments(&["b", "c"]);
        a.append(&mut b);
        assert!(b.is_empty());

        a.prepend_statement(Statement::annotated(Operation::Comment, "z"));
        assert_eq!(names(&a), vec!["z", "a", "b", "c"]);

        assert!(a.remove(9).is_none());
        let removed = a.remove(0).unwrap();
        assert_eq!(removed.comment(), Some("z"));

        a.retain(|s| s.comment() != Some("b"));
        assert_eq!(names(&a), vec!["a", "c"]);
        assert_eq!(a.first().and_then(Statement::comment), Some("a"));
        assert_eq!(a.last().and_then(Statement::comment), Some("c"));
    }
}
