//! Variable nodes and the arena that owns them.
//!
//! Statements never own variables. They hold a [`VarId`], a copyable handle
//! into a [`VariableArena`]. Handles carry a generation so that a handle to a
//! removed variable is detected instead of silently aliasing a newer one.

use std::fmt;

use strum::{EnumIter, IntoStaticStr};

use crate::{Error, Result};

/// The binding kind of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum VariableKind {
    /// A program-local temporary.
    Temp,
    /// A program input.
    Input,
    /// A program output.
    Output,
    /// A variable that is both read as input and written as output.
    InOut,
    /// A uniform parameter bound from outside the program.
    Uniform,
    /// A compile-time constant.
    Constant,
    /// A stream channel read by `FETCH`/`LOOKUP`.
    Stream,
    /// A texture object.
    Texture,
    /// A palette array.
    Palette,
}

impl VariableKind {
    /// Returns `true` if writes to a variable of this kind are visible outside
    /// the program, which makes them live regardless of later uses.
    #[must_use]
    pub fn is_observable(self) -> bool {
        self != Self::Temp
    }
}

/// A variable as seen by the middle-end: a name, a kind and a tuple size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableNode {
    /// Name used in dumps.
    pub name: String,
    /// Binding kind.
    pub kind: VariableKind,
    /// Number of components.
    pub size: usize,
}

impl VariableNode {
    /// Creates a variable node.
    pub fn new(name: impl Into<String>, kind: VariableKind, size: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            size,
        }
    }
}

/// Handle to a [`VariableNode`] stored in a [`VariableArena`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId {
    index: u32,
    generation: u32,
}

impl VarId {
    /// Returns the slot index of this handle.
    #[must_use]
    pub const fn index(self) -> usize {
        self.index as usize
    }

    /// Returns the generation this handle was issued for.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VarId({}#{})", self.index, self.generation)
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.index)
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<VariableNode>,
}

/// Owner of all variable nodes of one or more programs.
///
/// Removing a variable frees its slot for reuse and bumps the slot's
/// generation, so outstanding handles report [`Error::StaleHandle`].
#[derive(Debug, Clone, Default)]
pub struct VariableArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl VariableArena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a variable and returns its handle.
    pub fn insert(&mut self, node: VariableNode) -> VarId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return VarId {
                index,
                generation: slot.generation,
            };
        }

        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        VarId {
            index,
            generation: 0,
        }
    }

    /// Convenience wrapper around [`VariableArena::insert`].
    pub fn add(&mut self, name: impl Into<String>, kind: VariableKind, size: usize) -> VarId {
        self.insert(VariableNode::new(name, kind, size))
    }

    /// Returns the variable behind `id`, or `None` for a stale handle.
    #[must_use]
    pub fn get(&self, id: VarId) -> Option<&VariableNode> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    /// Returns the variable behind `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleHandle`] if the variable was removed.
    pub fn node(&self, id: VarId) -> Result<&VariableNode> {
        self.get(id).ok_or(Error::StaleHandle)
    }

    /// Returns the kind of the variable behind `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleHandle`] if the variable was removed.
    pub fn kind(&self, id: VarId) -> Result<VariableKind> {
        self.node(id).map(|node| node.kind)
    }

    /// Returns the name of `id`, or a placeholder for stale handles.
    #[must_use]
    pub fn name(&self, id: VarId) -> String {
        self.get(id)
            .map_or_else(|| format!("<stale {id}>"), |node| node.name.clone())
    }

    /// Removes a variable and invalidates all handles to it.
    pub fn remove(&mut self, id: VarId) -> Option<VariableNode> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(node)
    }

    /// Returns the number of live variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    /// Returns `true` if the arena holds no variables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over all live variables with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (VarId, &VariableNode)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            let node = slot.node.as_ref()?;
            Some((
                VarId {
                    index: index as u32,
                    generation: slot.generation,
                },
                node,
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_lookup() {
        let mut vars = VariableArena::new();
        let a = vars.add("a", VariableKind::Input, 4);
        let t = vars.add("t0", VariableKind::Temp, 3);

        assert_eq!(vars.len(), 2);
        assert_eq!(vars.node(a).unwrap().size, 4);
        assert_eq!(vars.kind(t).unwrap(), VariableKind::Temp);
        assert_eq!(vars.name(t), "t0");
        assert_ne!(a, t);
    }

    #[test]
    fn test_stale_handle_after_remove() {
        let mut vars = VariableArena::new();
        let t = vars.add("t", VariableKind::Temp, 1);
        assert!(vars.remove(t).is_some());

        let reused = vars.add("u", VariableKind::Temp, 2);
        assert_eq!(reused.index(), t.index());
        assert_ne!(reused.generation(), t.generation());

        assert!(vars.get(t).is_none());
        assert!(matches!(vars.kind(t), Err(Error::StaleHandle)));
        assert!(vars.remove(t).is_none());
        assert_eq!(vars.name(reused), "u");
    }

    #[test]
    fn test_observable_kinds() {
        assert!(!VariableKind::Temp.is_observable());
        assert!(VariableKind::Output.is_observable());
        assert!(VariableKind::Uniform.is_observable());
    }
}
