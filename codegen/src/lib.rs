//! Generator of SIMD dot-product and double-double GEMM microkernels.
//!
//! This crate turns a validated request (instruction set plus unroll or tile
//! ranges) into three C/C++ documents: an implementation, a header and a
//! googletest unit test. All three are rendered from the same [`Kernel`]
//! values, so their function names and signatures cannot drift apart.
//!
//! # Architecture
//!
//! - **Writer**: indentation-tracking text sink (`CodeWriter`)
//! - **Dot**: muladd, fma and compensated dot-product kernels per unroll factor
//! - **Gemm**: double-double microkernels per `(mr, nr)` tile plus a dispatch table
//! - **Reduce**: pairwise accumulator tree and horizontal reduction helpers
//! - **Model**: executable Rust model of the emitted arithmetic
//!
//! # Usage
//!
//! ```
//! use ddkern_codegen::{DotRequest, generate_dot};
//! use ddkern_isa::InstructionSet;
//!
//! let request = DotRequest::builder().isa(InstructionSet::Avx).unroll_min(1).unroll_max(4).build();
//! let artifacts = generate_dot(request).unwrap();
//! assert_eq!(artifacts.kernels.len(), 12);
//! ```

pub mod artifact;
pub mod c;
pub mod config;
pub mod dispatch;
pub mod dot;
pub mod error;
pub mod gemm;
pub mod model;
pub mod reduce;
pub mod traits;
pub mod types;
pub mod writer;


pub use artifact::ArtifactPaths;
pub use config::{Alignment, DotRequest, GemmRequest, TailFma};
pub use dispatch::DispatchTable;
pub use dot::DotGenerator;
pub use error::*;
pub use gemm::GemmGenerator;
pub use traits::*;
pub use types::*;
pub use writer::CodeWriter;

/// Validate a dot-product request and render its artifacts.
#[tracing::instrument(skip_all, fields(isa = %request.isa))]
pub fn generate_dot(request: DotRequest) -> Result<Artifacts> {
    DotGenerator::new(request)?.generate()
}

/// Validate a GEMM request and render its artifacts.
#[tracing::instrument(skip_all, fields(isa = %request.isa))]
pub fn generate_gemm(request: GemmRequest) -> Result<Artifacts> {
    GemmGenerator::new(request)?.generate()
}
