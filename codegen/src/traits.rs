//! Core traits for kernel generation.

use crate::{Artifacts, Kernel, Result};

/// Generator of one artifact triple.
///
/// Implementers validate their request at construction, so `generate` only
/// renders text. Generating twice yields byte-identical artifacts.
pub trait Generator {
    /// Kernels the artifacts define, in emission order.
    fn kernels(&self) -> Vec<Kernel>;

    /// Render the implementation, header and unit test.
    fn generate(&self) -> Result<Artifacts>;

    /// Short generator name (e.g. "dot", "gemm").
    fn name(&self) -> &str;
}
