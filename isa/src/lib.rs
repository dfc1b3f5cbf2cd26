//! SIMD instruction-set descriptors for the ddkern kernel generators.
//!
//! A [`SimdTarget`] maps the abstract operations used by the generators
//! (load, add, fused multiply-add, double-double arithmetic, ...) onto the
//! concrete intrinsic names of one instruction set, together with the vector
//! width and the number of architectural vector registers.
//!
//! # Usage
//!
//! ```
//! use ddkern_isa::{AbstractOp, InstructionSet};
//!
//! let avx = InstructionSet::Avx.target().unwrap();
//! assert_eq!(avx.width(), 4);
//! assert_eq!(avx.op(AbstractOp::Fma).unwrap(), "_mm256_fmadd_pd");
//! ```

pub mod error;
pub mod microarch;
mod tables;


use std::collections::BTreeMap;

use snafu::OptionExt;
use strum::VariantArray;

pub use error::*;
pub use microarch::Microarch;

/// Closed set of instruction-set identities accepted by the generators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::Display, strum::EnumString, strum::AsRefStr, strum::VariantArray, strum::EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum InstructionSet {
    Scalar,
    Sse,
    Avx,
    /// Knights Corner (Xeon Phi) 512-bit vectors.
    Mic,
    Armv8,
    Vsx,
    Qpx,
}

impl InstructionSet {
    /// Parse an instruction-set name, reporting the accepted names on failure.
    pub fn parse(name: &str) -> Result<Self> {
        name.parse::<Self>().ok().context(UnknownIsaSnafu { name, expected: Self::names() })
    }

    /// Comma-separated list of every accepted name.
    pub fn names() -> String {
        Self::VARIANTS.iter().map(|isa| isa.as_ref()).collect::<Vec<_>>().join(", ")
    }

    /// Resolve the full descriptor for this instruction set.
    ///
    /// Fails with [`Error::UnsupportedIsa`] for identities that have no
    /// operation table.
    pub fn target(self) -> Result<SimdTarget> {
        match self {
            Self::Avx => Ok(tables::avx()),
            Self::Mic => Ok(tables::mic()),
            isa => UnsupportedIsaSnafu { isa }.fail(),
        }
    }

    /// Whether [`InstructionSet::target`] succeeds for this identity.
    pub fn is_supported(self) -> bool {
        matches!(self, Self::Avx | Self::Mic)
    }
}

/// Abstract operations the generators emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::Display, strum::AsRefStr, strum::VariantArray, strum::EnumCount)]
#[strum(serialize_all = "snake_case")]
pub enum AbstractOp {
    // Double-precision vectors
    Zero,
    Load,
    Add,
    Mul,
    Fma,
    /// Whole-vector horizontal sum to a scalar double.
    ReduceAdd,

    // Double-double vectors
    DdZero,
    DdAdd,
    DdMul,
    /// Error-free vector addition (`hi = a + b`, error through pointer).
    EfAdd,
    /// Error-free vector multiplication (`hi = a * b`, error through pointer).
    EfMul,
    DdBroadcast,
    DdLoadDeinterleave,
    DdLoadDeinterleaveUnaligned,
    DdInterleaveStore,
    DdInterleaveStoreUnaligned,
    /// Whole-vector horizontal sum to a scalar double-double.
    DdReduceAdd,

    // Half-width lane primitives used to synthesize `ReduceAdd`
    HalfCastLow,
    HalfExtractHigh,
    HalfAdd,
    HalfUnpackHigh,
    HalfAddLow,
    HalfToScalar,
    /// Name of the generated two-lane horizontal sum helper.
    HalfReduceAdd,
}

/// How a target sums the lanes of one vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalReduce {
    /// `ReduceAdd` names an intrinsic the target already provides.
    Intrinsic,

    /// `ReduceAdd` must be emitted as helper functions that split the vector
    /// into halves of `half_type` and add them down to one lane.
    SplitHalves { half_type: &'static str },
}

impl HorizontalReduce {
    /// Operations the generator needs to synthesize the reduction helpers.
    pub fn helper_ops(&self) -> &'static [AbstractOp] {
        match self {
            Self::Intrinsic => &[],
            Self::SplitHalves { .. } => &[
                AbstractOp::HalfCastLow,
                AbstractOp::HalfExtractHigh,
                AbstractOp::HalfAdd,
                AbstractOp::HalfUnpackHigh,
                AbstractOp::HalfAddLow,
                AbstractOp::HalfToScalar,
                AbstractOp::HalfReduceAdd,
            ],
        }
    }
}

/// Immutable abstract-op to intrinsic-name table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpTable {
    entries: BTreeMap<AbstractOp, &'static str>,
}

impl OpTable {
    pub fn new(entries: impl IntoIterator<Item = (AbstractOp, &'static str)>) -> Self {
        Self { entries: entries.into_iter().collect() }
    }

    pub fn get(&self, op: AbstractOp) -> Option<&'static str> {
        self.entries.get(&op).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AbstractOp, &'static str)> + '_ {
        self.entries.iter().map(|(op, name)| (*op, *name))
    }
}

/// Resolved descriptor of one SIMD instruction set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimdTarget {
    isa: InstructionSet,
    width: usize,
    registers: usize,
    vector_type: &'static str,
    dd_vector_type: &'static str,
    horizontal: HorizontalReduce,
    ops: OpTable,
}

impl SimdTarget {
    /// Assemble a target from an explicit table.
    ///
    /// Used for out-of-tree instruction sets; the generators validate it the
    /// same way as the built-in ones.
    pub fn custom(
        isa: InstructionSet,
        width: usize,
        registers: usize,
        vector_type: &'static str,
        dd_vector_type: &'static str,
        horizontal: HorizontalReduce,
        ops: OpTable,
    ) -> Self {
        Self { isa, width, registers, vector_type, dd_vector_type, horizontal, ops }
    }

    pub fn isa(&self) -> InstructionSet {
        self.isa
    }

    /// Number of doubles per vector register.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of architectural vector registers.
    pub fn registers(&self) -> usize {
        self.registers
    }

    pub fn vector_type(&self) -> &'static str {
        self.vector_type
    }

    pub fn dd_vector_type(&self) -> &'static str {
        self.dd_vector_type
    }

    pub fn horizontal(&self) -> HorizontalReduce {
        self.horizontal
    }

    pub fn ops(&self) -> &OpTable {
        &self.ops
    }

    /// Concrete name of `op`, or [`Error::MissingOp`] naming the op and the ISA.
    pub fn op(&self, op: AbstractOp) -> Result<&'static str> {
        self.ops.get(op).context(MissingOpSnafu { op, isa: self.isa })
    }

    /// Check that every op in `ops` resolves.
    pub fn require(&self, ops: &[AbstractOp]) -> Result<()> {
        for &op in ops {
            self.op(op)?;
        }
        Ok(())
    }
}
