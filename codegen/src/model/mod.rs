//! Executable model of the generated kernels.
//!
//! Each function here performs, in Rust, the same sequence of floating-point
//! operations the emitted C performs for one kernel: the same unrolled main
//! loop, the same pairwise tree, the same lane-halving horizontal sum and the
//! same scalar tail. The test suite uses it to check accuracy properties of
//! the generated code without a C toolchain.

pub mod eft;
pub mod kernels;

pub use eft::{DoubleDouble, fast_two_sum, two_prod, two_sum};
pub use kernels::{compensated_dot, ddgemm, dot, pack_a};
