//! Operation codes of the shader IR.
//!
//! The set of operations is closed: every statement carries exactly one
//! [`Operation`], and [`Operation::info`] describes how many source operands it
//! reads and how its result relates to them.

use std::fmt;

use strum::{EnumCount, EnumIter, IntoStaticStr};

/// How the destination components of an operation depend on its sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultSource {
    /// `dest[i]` depends only on component `i` of each source.
    Linear,
    /// `dest[i]` may depend on every component of every source.
    All,
    /// The result is produced by an external source such as a texture unit.
    External,
    /// The operation does not produce a result. Such statements are never dead.
    Ignore,
}

/// Static description of an [`Operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationInfo {
    /// Mnemonic used in dumps, e.g. `"ASN"`.
    pub name: &'static str,
    /// Number of meaningful source operands (0 to 3).
    pub arity: usize,
    /// Dependency class of the result.
    pub result_source: ResultSource,
    /// `true` if the order of the sources does not matter.
    pub commutative: bool,
}

/// An IR operation code.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, EnumCount, IntoStaticStr,
)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Operation {
    /// Assignment, `dest = src0`.
    Asn,
    /// Negation.
    Neg,
    /// Addition.
    Add,
    /// Multiplication, either side may be scalar.
    Mul,
    /// Division, the right side may be scalar.
    Div,
    /// Set if less than.
    Slt,
    /// Set if less than or equal.
    Sle,
    /// Set if greater than.
    Sgt,
    /// Set if greater than or equal.
    Sge,
    /// Set if equal.
    Seq,
    /// Set if not equal.
    Sne,
    /// Absolute value.
    Abs,
    /// Arc cosine.
    Acos,
    /// Arc sine.
    Asin,
    /// Arc tangent.
    Atan,
    /// Arc tangent of `src1 / src0`.
    Atan2,
    /// Cube root.
    Cbrt,
    /// Ceiling.
    Ceil,
    /// Cosine.
    Cos,
    /// Hyperbolic cosine.
    Cosh,
    /// Product of components.
    Cmul,
    /// Sum of components.
    Csum,
    /// Dot product.
    Dot,
    /// Screen-space derivative in x.
    Dx,
    /// Screen-space derivative in y.
    Dy,
    /// Natural exponent.
    Exp,
    /// Base-2 exponent.
    Exp2,
    /// Base-10 exponent.
    Exp10,
    /// Floor.
    Flr,
    /// Fractional part.
    Frac,
    /// Lighting coefficients.
    Lit,
    /// Natural logarithm.
    Log,
    /// Base-2 logarithm.
    Log2,
    /// Base-10 logarithm.
    Log10,
    /// Linear interpolation `src0 * src1 + (1 - src0) * src2`.
    Lrp,
    /// Multiply-add `src0 * src1 + src2`.
    Mad,
    /// Componentwise maximum.
    Max,
    /// Componentwise minimum.
    Min,
    /// Floating point modulus.
    Mod,
    /// Power.
    Pow,
    /// Reciprocal.
    Rcp,
    /// Round to nearest integer.
    Rnd,
    /// Reciprocal square root.
    Rsq,
    /// Sine.
    Sin,
    /// Hyperbolic sine.
    Sinh,
    /// Componentwise sign.
    Sgn,
    /// Square root.
    Sqrt,
    /// Tangent.
    Tan,
    /// Hyperbolic tangent.
    Tanh,
    /// Vector normalization.
    Norm,
    /// Cross product.
    Xpd,
    /// Texture lookup with normalized coordinates.
    Tex,
    /// Texture lookup with texel coordinates.
    Texi,
    /// Texture lookup with explicit derivatives.
    Texd,
    /// Conditional select `src0 > 0 ? src1 : src2`.
    Cond,
    /// Discard the fragment if any component of `src0` is positive.
    Kil,
    /// Marks a branch guard so that dead code elimination keeps its computation.
    Optbra,
    /// Declares the scope start of a temporary.
    Decl,
    /// Opens a named section.
    #[strum(serialize = "STARTSEC")]
    StartSection,
    /// Closes a named section.
    #[strum(serialize = "ENDSEC")]
    EndSection,
    /// Fetch the next element of a stream.
    Fetch,
    /// Indexed stream lookup.
    Lookup,
    /// Palette lookup.
    Pal,
    /// Carries a comment annotation.
    Comment,
    /// Return from the program.
    Ret,
}

impl Operation {
    /// Returns the static description of this operation.
    #[must_use]
    pub fn info(self) -> OperationInfo {
        use ResultSource::{All, External, Ignore, Linear};

        let (arity, result_source, commutative) = match self {
            Self::Asn | Self::Neg => (1, Linear, false),
            Self::Add | Self::Mul => (2, Linear, true),
            Self::Div => (2, Linear, false),
            Self::Seq | Self::Sne => (2, Linear, true),
            Self::Slt | Self::Sle | Self::Sgt | Self::Sge => (2, Linear, false),
            Self::Abs
            | Self::Acos
            | Self::Asin
            | Self::Atan
            | Self::Cbrt
            | Self::Ceil
            | Self::Cos
            | Self::Cosh
            | Self::Exp
            | Self::Exp2
            | Self::Exp10
            | Self::Flr
            | Self::Frac
            | Self::Log
            | Self::Log2
            | Self::Log10
            | Self::Rcp
            | Self::Rnd
            | Self::Rsq
            | Self::Sin
            | Self::Sinh
            | Self::Sgn
            | Self::Sqrt
            | Self::Tan
            | Self::Tanh => (1, Linear, false),
            Self::Atan2 | Self::Mod | Self::Pow => (2, Linear, false),
            Self::Max | Self::Min => (2, Linear, true),
            Self::Lrp | Self::Cond => (3, Linear, false),
            Self::Mad => (3, Linear, false),
            Self::Cmul | Self::Csum | Self::Dx | Self::Dy | Self::Lit | Self::Norm => {
                (1, All, false)
            }
            Self::Dot => (2, All, true),
            Self::Xpd => (2, All, false),
            Self::Tex | Self::Texi => (2, External, false),
            Self::Texd => (3, External, false),
            Self::Fetch => (1, External, false),
            Self::Lookup | Self::Pal => (2, External, false),
            Self::Kil | Self::Optbra | Self::Ret => (1, Ignore, false),
            Self::Decl | Self::StartSection | Self::EndSection | Self::Comment => {
                (0, Ignore, false)
            }
        };

        OperationInfo {
            name: self.into(),
            arity,
            result_source,
            commutative,
        }
    }

    /// Returns the number of meaningful source operands.
    #[must_use]
    pub fn arity(self) -> usize {
        self.info().arity
    }

    /// Returns `true` if this operation writes its destination operand.
    ///
    /// `DECL` names a variable in its destination slot without writing it.
    #[must_use]
    pub fn yields_result(self) -> bool {
        self.info().result_source != ResultSource::Ignore
    }

    /// Returns `true` for the section start/end markers.
    #[must_use]
    pub fn is_section_marker(self) -> bool {
        matches!(self, Self::StartSection | Self::EndSection)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.info().name)
    }
}
