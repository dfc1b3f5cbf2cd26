//! Generation requests.
//!
//! Requests are plain values built with bon builders. Modes that alter the
//! emitted code also have environment-variable fallbacks for build scripts
//! that cannot pass flags.

use bon::bon;
use ddkern_isa::InstructionSet;

// ============================================================================
// MODES
// ============================================================================

/// How the scalar tail of the fma dot-product family multiplies and adds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TailFma {
    /// Fused: `__builtin_fma` with GNU compilers, C99 `fma` otherwise.
    #[default]
    Fused,

    /// Explicit alternate mode: `sum += a * b` with two roundings.
    ///
    /// The fma family then only differs from muladd in its vector loop. The
    /// header records the mode.
    Unfused,
}

impl TailFma {
    /// Read the mode from the environment.
    ///
    /// # Environment Variables
    ///
    /// * `DDKERN_TAIL_FMA=unfused` - Use the unfused tail
    pub fn from_env() -> Self {
        match std::env::var("DDKERN_TAIL_FMA").as_deref() {
            Ok("unfused") => Self::Unfused,
            _ => Self::Fused,
        }
    }

    pub fn is_fused(&self) -> bool {
        matches!(self, Self::Fused)
    }
}

/// Alignment assumed for the GEMM output tile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Alignment {
    /// Vector-aligned `c`; uses the aligned deinterleaved load / interleaved store.
    #[default]
    Aligned,

    /// Arbitrary `c`; uses the unaligned variants.
    Unaligned,
}

impl Alignment {
    /// Read the alignment from the environment.
    ///
    /// # Environment Variables
    ///
    /// * `DDKERN_UNALIGNED_OUTPUT` - Use unaligned output access if set
    pub fn from_env() -> Self {
        if std::env::var("DDKERN_UNALIGNED_OUTPUT").is_ok() { Self::Unaligned } else { Self::Aligned }
    }
}

// ============================================================================
// DOT PRODUCT
// ============================================================================

/// Dot-product generation request: one (muladd, fma, compensated) kernel
/// triple per unroll factor in `[unroll_min, unroll_max]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotRequest {
    pub isa: InstructionSet,
    pub unroll_min: usize,
    pub unroll_max: usize,
    pub tail_fma: TailFma,
    /// Path of the generated header as seen from `#include <...>`.
    pub header_include: String,
}

#[bon]
impl DotRequest {
    #[builder]
    pub fn builder(
        isa: InstructionSet,
        #[builder(default = 1)] unroll_min: usize,
        #[builder(default = 8)] unroll_max: usize,
        #[builder(default)] tail_fma: TailFma,
        #[builder(into, default = "dot/dot.h".to_string())] header_include: String,
    ) -> Self {
        Self { isa, unroll_min, unroll_max, tail_fma, header_include }
    }

    pub fn unrolls(&self) -> std::ops::RangeInclusive<usize> {
        self.unroll_min..=self.unroll_max
    }
}

// ============================================================================
// GEMM
// ============================================================================

/// GEMM microkernel generation request: one kernel per `(mr, nr)` with `mr`
/// stepping by the vector width over `[mr_min, mr_max]` and `nr` over
/// `[nr_min, nr_max]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GemmRequest {
    pub isa: InstructionSet,
    pub mr_min: usize,
    pub mr_max: usize,
    pub nr_min: usize,
    pub nr_max: usize,
    pub output: Alignment,
    pub header_include: String,
}

#[bon]
impl GemmRequest {
    #[builder]
    pub fn builder(
        isa: InstructionSet,
        mr_min: usize,
        mr_max: usize,
        #[builder(default = 1)] nr_min: usize,
        #[builder(default = 8)] nr_max: usize,
        #[builder(default)] output: Alignment,
        #[builder(into, default = "ddgemm/ddgemm.h".to_string())] header_include: String,
    ) -> Self {
        Self { isa, mr_min, mr_max, nr_min, nr_max, output, header_include }
    }
}

// ============================================================================
// TESTS
// ============================================================================
