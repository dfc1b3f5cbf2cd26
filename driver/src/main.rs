//! `ddkern`: generate dot-product or double-double GEMM kernels.
//!
//! ```text
//! ddkern dot --unroll-min 1 --unroll-max 8 --simd avx \
//!     --implementation dot.c --header dot/dot.h --unittest dot.cc
//! ddkern gemm --mr-min 4 --mr-max 12 --nr-min 1 --nr-max 4 --uarch haswell \
//!     --implementation ddgemm.c --header ddgemm/ddgemm.h --unittest ddgemm.cc
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `warn`). A
//! failed run is reported once, as an `error` event.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use ddkern_codegen::{
    Alignment, ArtifactPaths, Artifacts, DotRequest, GemmRequest, TailFma, generate_dot, generate_gemm,
};
use ddkern_isa::{InstructionSet, Microarch};
use snafu::{OptionExt, ResultExt, Snafu};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("{source}"))]
    Generate { source: ddkern_codegen::Error },

    #[snafu(display("Failed to write {kind} artifacts: {source}"))]
    Write { kind: &'static str, source: ddkern_codegen::Error },

    #[snafu(display("Either --simd or --uarch must be given"))]
    MissingTarget,
}

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Parser, Debug)]
#[command(name = "ddkern", version)]
#[command(about = "Generate SIMD dot-product and double-double GEMM microkernels", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Unrolled muladd, fma and compensated dot-product kernels
    Dot {
        /// Smallest unroll factor
        #[arg(long)]
        unroll_min: usize,
        /// Largest unroll factor
        #[arg(long)]
        unroll_max: usize,
        /// Scalar tail of the fma kernels (defaults to DDKERN_TAIL_FMA or fused)
        #[arg(long, value_enum)]
        tail_fma: Option<TailFmaArg>,
        /// Header path used in #include directives
        #[arg(long, default_value = "dot/dot.h")]
        header_include: String,
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Double-double GEMM microkernels and their dispatch function
    Gemm {
        /// Smallest row tile (a multiple of the vector width)
        #[arg(long)]
        mr_min: usize,
        /// Largest row tile (a multiple of the vector width)
        #[arg(long)]
        mr_max: usize,
        /// Smallest column tile
        #[arg(long)]
        nr_min: usize,
        /// Largest column tile
        #[arg(long)]
        nr_max: usize,
        /// Do not assume the output tile is vector-aligned (also DDKERN_UNALIGNED_OUTPUT)
        #[arg(long)]
        unaligned_output: bool,
        /// Header path used in #include directives
        #[arg(long, default_value = "ddgemm/ddgemm.h")]
        header_include: String,
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct TargetArgs {
    /// Instruction set
    #[arg(long, value_parser = InstructionSet::parse)]
    simd: Option<InstructionSet>,
    /// Micro-architecture, mapped to its instruction set
    #[arg(long, value_parser = Microarch::parse)]
    uarch: Option<Microarch>,
}

impl TargetArgs {
    fn isa(&self) -> Result<InstructionSet> {
        self.simd.or_else(|| self.uarch.map(Microarch::instruction_set)).context(MissingTargetSnafu)
    }
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Path of the generated C implementation
    #[arg(long)]
    implementation: PathBuf,
    /// Path of the generated header
    #[arg(long)]
    header: PathBuf,
    /// Path of the generated googletest source
    #[arg(long)]
    unittest: PathBuf,
}

impl From<OutputArgs> for ArtifactPaths {
    fn from(args: OutputArgs) -> Self {
        Self { implementation: args.implementation, header: args.header, unittest: args.unittest }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TailFmaArg {
    Fused,
    Unfused,
}

impl From<TailFmaArg> for TailFma {
    fn from(arg: TailFmaArg) -> Self {
        match arg {
            TailFmaArg::Fused => Self::Fused,
            TailFmaArg::Unfused => Self::Unfused,
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let (kind, artifacts, output): (&'static str, Artifacts, OutputArgs) = match cli.command {
        Command::Dot { unroll_min, unroll_max, tail_fma, header_include, target, output } => {
            let request = DotRequest::builder()
                .isa(target.isa()?)
                .unroll_min(unroll_min)
                .unroll_max(unroll_max)
                .tail_fma(tail_fma.map_or_else(TailFma::from_env, TailFma::from))
                .header_include(header_include)
                .build();
            ("dot", generate_dot(request).context(GenerateSnafu)?, output)
        }
        Command::Gemm { mr_min, mr_max, nr_min, nr_max, unaligned_output, header_include, target, output } => {
            let request = GemmRequest::builder()
                .isa(target.isa()?)
                .mr_min(mr_min)
                .mr_max(mr_max)
                .nr_min(nr_min)
                .nr_max(nr_max)
                .output(if unaligned_output { Alignment::Unaligned } else { Alignment::from_env() })
                .header_include(header_include)
                .build();
            ("gemm", generate_gemm(request).context(GenerateSnafu)?, output)
        }
    };

    artifacts.write(&output.into()).context(WriteSnafu { kind })?;
    tracing::info!(kind, kernels = artifacts.kernels.len(), "artifacts written");
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "generation failed");
            ExitCode::FAILURE
        }
    }
}
