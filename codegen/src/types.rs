//! Types for generated kernels and artifacts.

use std::fmt;

use crate::c::{CType, Param, Signature};

/// Operation family of a generated kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::AsRefStr, strum::IntoStaticStr, strum::VariantArray)]
#[strum(serialize_all = "snake_case")]
pub enum KernelFamily {
    /// Dot product with a separate multiply and add (two roundings per element).
    MulAdd,
    /// Dot product with fused multiply-add.
    Fma,
    /// Double-double dot product built on error-free transforms.
    Compensated,
    /// Double-double GEMM microkernel.
    DdGemm,
}

impl KernelFamily {
    /// The three dot-product families, in emission order.
    pub const DOT: [KernelFamily; 3] = [Self::MulAdd, Self::Fma, Self::Compensated];

    /// Function-name stem shared by every kernel of the family.
    pub fn stem(&self) -> &'static str {
        match self {
            Self::MulAdd => "dot_product_muladd",
            Self::Fma => "dot_product_fma",
            Self::Compensated => "compensated_dot_product_efmuladd",
            Self::DdGemm => "ddgemm",
        }
    }

    /// Whether the accumulators are double-double (hi, lo) vector pairs.
    pub fn is_double_double(&self) -> bool {
        matches!(self, Self::Compensated | Self::DdGemm)
    }
}

/// Shape parameters encoded in a kernel's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KernelShape {
    Unroll(usize),
    Tile { mr: usize, nr: usize },
}

impl fmt::Display for KernelShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unroll(u) => write!(f, "unroll{u}"),
            Self::Tile { mr, nr } => write!(f, "{mr}x{nr}"),
        }
    }
}

/// A generated function: its name, family, shape and C signature.
///
/// The name is part of the external contract; the implementation, header
/// and unit test all render it from this value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kernel {
    pub family: KernelFamily,
    pub shape: KernelShape,
    pub name: String,
    pub signature: Signature,
}

impl Kernel {
    /// Dot-product kernel of `family` unrolled `unroll` times.
    ///
    /// Signature: `(size_t n, const double a[n], const double b[n])`,
    /// returning `double` or, for the compensated family, `doubledouble`.
    pub fn dot(family: KernelFamily, unroll: usize) -> Self {
        debug_assert!(family != KernelFamily::DdGemm);
        let shape = KernelShape::Unroll(unroll);
        let ret = if family.is_double_double() { CType::DoubleDouble } else { CType::Double };
        let signature = Signature {
            ret,
            params: vec![
                Param::value(CType::Size, "n"),
                Param::input(CType::Double, "a", "n"),
                Param::input(CType::Double, "b", "n"),
            ],
        };
        Self { family, shape, name: format!("{}_{shape}", family.stem()), signature }
    }

    /// Double-double GEMM microkernel for an `mr` x `nr` register tile.
    ///
    /// Signature: `(size_t k, const double a[2*k*mr], const doubledouble b[k*nr], doubledouble c[mr*nr])`.
    pub fn ddgemm(mr: usize, nr: usize) -> Self {
        let shape = KernelShape::Tile { mr, nr };
        let signature = Signature {
            ret: CType::Void,
            params: vec![
                Param::value(CType::Size, "k"),
                Param::input(CType::Double, "a", format!("2*k*{mr}")),
                Param::input(CType::DoubleDouble, "b", format!("k*{nr}")),
                Param::in_out(CType::DoubleDouble, "c", format!("{mr}*{nr}")),
            ],
        };
        Self { family: KernelFamily::DdGemm, shape, name: format!("{}_{shape}", KernelFamily::DdGemm.stem()), signature }
    }

    pub fn unroll(&self) -> Option<usize> {
        match self.shape {
            KernelShape::Unroll(u) => Some(u),
            KernelShape::Tile { .. } => None,
        }
    }

    pub fn tile(&self) -> Option<(usize, usize)> {
        match self.shape {
            KernelShape::Tile { mr, nr } => Some((mr, nr)),
            KernelShape::Unroll(_) => None,
        }
    }

    pub fn definition(&self) -> String {
        self.signature.definition(&self.name)
    }

    pub fn prototype(&self) -> String {
        self.signature.prototype(&self.name)
    }
}

/// The three documents produced for one request, plus the kernels they define.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    /// C implementation defining every kernel.
    pub implementation: String,

    /// C/C++ header declaring every kernel (and, for GEMM, the dispatch function).
    pub header: String,

    /// googletest source with one test per kernel.
    pub unittest: String,

    /// Kernels in emission order.
    pub kernels: Vec<Kernel>,
}

impl Artifacts {
    pub fn kernel(&self, name: &str) -> Option<&Kernel> {
        self.kernels.iter().find(|k| k.name == name)
    }

    pub fn kernels_of(&self, family: KernelFamily) -> impl Iterator<Item = &Kernel> {
        self.kernels.iter().filter(move |k| k.family == family)
    }
}
