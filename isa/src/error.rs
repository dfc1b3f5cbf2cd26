//! Error types for instruction-set resolution.

use snafu::Snafu;

use crate::{AbstractOp, InstructionSet};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while resolving an instruction set or one of its operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// The name does not belong to the closed set of instruction sets.
    #[snafu(display("Unknown instruction set '{name}' (expected one of: {expected})"))]
    UnknownIsa { name: String, expected: String },

    /// The instruction set is known but has no operation table.
    #[snafu(display("Instruction set '{isa}' is not supported by the kernel generators"))]
    UnsupportedIsa { isa: InstructionSet },

    /// An abstract operation has no mapping for the instruction set.
    #[snafu(display("Operation '{op}' is not available for instruction set '{isa}'"))]
    MissingOp { op: AbstractOp, isa: InstructionSet },

    /// The micro-architecture name is not recognized.
    #[snafu(display("Unknown micro-architecture '{name}' (expected one of: {expected})"))]
    UnknownMicroarch { name: String, expected: String },
}
