//! Operands: a variable reference with a swizzle and a negation flag.

use std::fmt;

use crate::{ir::VarId, Error, Result};

/// Component names used when printing swizzles of up to four components.
const COMPONENT_NAMES: [char; 4] = ['x', 'y', 'z', 'w'];

/// An ordered selection of components out of a tuple of `source_size`
/// components.
///
/// The selected indices may repeat and may be fewer or more than the source
/// size. The size of a swizzled operand is the number of indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Swizzle {
    source_size: usize,
    indices: Vec<usize>,
}

impl Swizzle {
    /// Selects every component of a `size`-tuple in order.
    #[must_use]
    pub fn identity(size: usize) -> Self {
        Self {
            source_size: size,
            indices: (0..size).collect(),
        }
    }

    /// Creates a swizzle selecting `indices` out of a `source_size`-tuple.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSwizzle`] if an index is not below `source_size`.
    pub fn new(source_size: usize, indices: impl Into<Vec<usize>>) -> Result<Self> {
        let indices = indices.into();
        if let Some(&index) = indices.iter().find(|&&i| i >= source_size) {
            return Err(Error::InvalidSwizzle {
                index,
                size: source_size,
            });
        }
        Ok(Self {
            source_size,
            indices,
        })
    }

    /// Number of components the swizzle is applied to.
    #[must_use]
    pub const fn source_size(&self) -> usize {
        self.source_size
    }

    /// Number of components the swizzle produces.
    #[must_use]
    pub fn size(&self) -> usize {
        self.indices.len()
    }

    /// Selected component indices, in order.
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Returns `true` if the swizzle selects every source component in order.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.indices.len() == self.source_size
            && self.indices.iter().enumerate().all(|(i, &c)| i == c)
    }

    /// Applies `outer` on top of `self`.
    ///
    /// `x.swizzle(self).swizzle(outer)` selects component
    /// `self.indices[outer.indices[i]]` of `x`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSwizzle`] if `outer` reads past the size produced
    /// by `self`.
    pub fn then(&self, outer: &Swizzle) -> Result<Swizzle> {
        let indices = outer
            .indices
            .iter()
            .map(|&i| {
                self.indices.get(i).copied().ok_or(Error::InvalidSwizzle {
                    index: i,
                    size: self.size(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Swizzle {
            source_size: self.source_size,
            indices,
        })
    }
}

impl fmt::Display for Swizzle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_identity() {
            return Ok(());
        }
        f.write_str("(")?;
        for (n, &i) in self.indices.iter().enumerate() {
            if self.source_size <= COMPONENT_NAMES.len() {
                write!(f, "{}", COMPONENT_NAMES[i])?;
            } else {
                if n > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{i}")?;
            }
        }
        f.write_str(")")
    }
}

/// A reference to a variable as read or written by a statement.
///
/// A null operand (no variable) marks an unused slot, e.g. the destination of a
/// `KIL` or the guard of an unconditional edge. Equality compares variable
/// identity, swizzle and negation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Operand {
    var: Option<VarId>,
    swizzle: Option<Swizzle>,
    negated: bool,
}

impl Operand {
    /// The empty operand.
    #[must_use]
    pub const fn null() -> Self {
        Self {
            var: None,
            swizzle: None,
            negated: false,
        }
    }

    /// References all `size` components of `var` in order.
    #[must_use]
    pub fn new(var: VarId, size: usize) -> Self {
        Self {
            var: Some(var),
            swizzle: Some(Swizzle::identity(size)),
            negated: false,
        }
    }

    /// References `var` through `swizzle`.
    #[must_use]
    pub fn swizzled(var: VarId, swizzle: Swizzle) -> Self {
        Self {
            var: Some(var),
            swizzle: Some(swizzle),
            negated: false,
        }
    }

    /// Returns this operand with its negation flag flipped.
    #[must_use]
    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    /// Returns `true` for the empty operand.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.var.is_none()
    }

    /// Returns the referenced variable.
    #[must_use]
    pub const fn var(&self) -> Option<VarId> {
        self.var
    }

    /// Returns the swizzle, `None` for the empty operand.
    #[must_use]
    pub fn swizzle(&self) -> Option<&Swizzle> {
        self.swizzle.as_ref()
    }

    /// Returns `true` if the operand is negated.
    #[must_use]
    pub const fn negated(&self) -> bool {
        self.negated
    }

    /// Number of components this operand yields.
    #[must_use]
    pub fn size(&self) -> usize {
        self.swizzle.as_ref().map_or(0, Swizzle::size)
    }

    /// Returns `true` if the operand selects every component of its variable in
    /// order.
    #[must_use]
    pub fn has_identity_swizzle(&self) -> bool {
        self.swizzle.as_ref().is_some_and(Swizzle::is_identity)
    }

    /// Returns `true` if the operand refers to `var`.
    #[must_use]
    pub fn refers_to(&self, var: VarId) -> bool {
        self.var == Some(var)
    }

    /// Replaces a use of a copy destination by the copy source.
    ///
    /// `self` reads a variable `t` that was assigned `t := source` with an
    /// identity destination swizzle. The result reads `source`'s variable with
    /// both swizzles composed and the negation flags combined.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSwizzle`] if the swizzles do not compose.
    pub fn substitute(&self, source: &Operand) -> Result<Operand> {
        let (Some(outer), Some(inner)) = (&self.swizzle, &source.swizzle) else {
            return Err(internal_error!("cannot substitute through an empty operand"));
        };
        Ok(Operand {
            var: source.var,
            swizzle: Some(inner.then(outer)?),
            negated: self.negated ^ source.negated,
        })
    }

    /// Formats the operand, resolving the variable name with `name`.
    pub fn display_with<F>(&self, name: F) -> String
    where
        F: Fn(VarId) -> String,
    {
        match (self.var, &self.swizzle) {
            (Some(var), Some(swizzle)) => format!(
                "{}{}{}",
                if self.negated { "-" } else { "" },
                name(var),
                swizzle
            ),
            _ => "<null>".to_string(),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_with(|var| var.to_string()))
    }
}
