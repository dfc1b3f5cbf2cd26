//! Named micro-architectures and the instruction set each one targets.

use snafu::OptionExt;
use strum::VariantArray;

use crate::{InstructionSet, Result, UnknownMicroarchSnafu};

/// Micro-architectures the kernels are tuned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::Display, strum::EnumString, strum::AsRefStr, strum::VariantArray)]
#[strum(serialize_all = "lowercase")]
pub enum Microarch {
    Haswell,
    Broadwell,
    Skylake,
    Bulldozer,
    Piledriver,
    Steamroller,
    /// Knights Corner.
    Knc,
}

impl Microarch {
    pub fn parse(name: &str) -> Result<Self> {
        let expected = Self::VARIANTS.iter().map(|u| u.as_ref()).collect::<Vec<_>>().join(", ");
        name.parse::<Self>().ok().context(UnknownMicroarchSnafu { name, expected })
    }

    pub fn instruction_set(self) -> InstructionSet {
        match self {
            Self::Knc => InstructionSet::Mic,
            Self::Haswell
            | Self::Broadwell
            | Self::Skylake
            | Self::Bulldozer
            | Self::Piledriver
            | Self::Steamroller => InstructionSet::Avx,
        }
    }
}
