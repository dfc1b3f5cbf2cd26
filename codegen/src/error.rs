//! Error types for kernel generation.

use std::path::PathBuf;

use ddkern_isa::InstructionSet;
use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur while validating a request or writing its artifacts.
///
/// Configuration errors are raised before any text is generated; nothing is
/// written for a request that fails validation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Instruction-set resolution failed (unknown, unsupported or missing op).
    #[snafu(display("{source}"), context(false))]
    Isa { source: ddkern_isa::Error },

    /// A parameter range is empty or starts below its minimum.
    #[snafu(display("Invalid {parameter} range [{min}, {max}] for instruction set '{isa}': {reason}"))]
    InvalidRange { parameter: &'static str, min: usize, max: usize, isa: InstructionSet, reason: &'static str },

    /// The accumulators of an unrolled kernel do not fit in the register file.
    #[snafu(display(
        "Unroll factor {unroll} of {family} kernel needs {needed} registers, \
         but instruction set '{isa}' has {available}"
    ))]
    UnrollExceedsRegisters { unroll: usize, family: &'static str, needed: usize, available: usize, isa: InstructionSet },

    /// A row tile bound is not a positive multiple of the vector width.
    #[snafu(display("Row tile {parameter}={value} is not a multiple of the vector width {width} of instruction set '{isa}'"))]
    TileMisaligned { parameter: &'static str, value: usize, width: usize, isa: InstructionSet },

    /// Writing an artifact to its temporary file failed.
    #[snafu(display("Failed to write artifact {}: {source}", path.display()))]
    Io { path: PathBuf, source: std::io::Error },

    /// Moving a completed artifact to its destination failed.
    #[snafu(display("Failed to persist artifact {}: {source}", path.display()))]
    Persist { path: PathBuf, source: tempfile::PersistError },
}
