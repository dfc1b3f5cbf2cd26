//! Double-double GEMM microkernel generator.
//!
//! `ddgemm_<mr>x<nr>` computes `C += A * B` for an `mr x nr` tile of `C`
//! over `k` reduction steps, entirely in double-double arithmetic:
//!
//! - `(mr / W) * nr` double-double accumulators, zero-initialized.
//! - Per step: `mr / W` A vectors from the packed panel, one broadcast B
//!   value per column, `acc += a * b` with double-double multiply and add.
//! - After the loop: deinterleaved load of the existing `C` tile, add,
//!   interleaved store.
//!
//! `C` is column-major inside the tile: element `(m, n)` lives at `c[n*mr + m]`.

use ddkern_isa::{AbstractOp, SimdTarget};
use itertools::iproduct;
use snafu::ensure;

use crate::c;
use crate::config::{Alignment, GemmRequest};
use crate::dispatch::{DispatchTable, FUNCTION_TYPEDEF};
use crate::types::{Artifacts, Kernel};
use crate::writer::CodeWriter;
use crate::{Generator, InvalidRangeSnafu, Result, TileMisalignedSnafu};

pub const TESTER_HEADER: &str = "ddgemm-tester.h";

#[derive(Debug, Clone)]
struct GemmIntrinsics {
    dd_vector: &'static str,
    load: &'static str,
    dd_zero: &'static str,
    dd_add: &'static str,
    dd_mul: &'static str,
    broadcast: &'static str,
    load_output: &'static str,
    store_output: &'static str,
}

impl GemmIntrinsics {
    fn resolve(target: &SimdTarget, output: Alignment) -> Result<Self> {
        let (load_output, store_output) = match output {
            Alignment::Aligned => (AbstractOp::DdLoadDeinterleave, AbstractOp::DdInterleaveStore),
            Alignment::Unaligned => (AbstractOp::DdLoadDeinterleaveUnaligned, AbstractOp::DdInterleaveStoreUnaligned),
        };
        Ok(Self {
            dd_vector: target.dd_vector_type(),
            load: target.op(AbstractOp::Load)?,
            dd_zero: target.op(AbstractOp::DdZero)?,
            dd_add: target.op(AbstractOp::DdAdd)?,
            dd_mul: target.op(AbstractOp::DdMul)?,
            broadcast: target.op(AbstractOp::DdBroadcast)?,
            load_output: target.op(load_output)?,
            store_output: target.op(store_output)?,
        })
    }
}

/// Validated GEMM microkernel generator for one request.
#[derive(Debug, Clone)]
pub struct GemmGenerator {
    request: GemmRequest,
    target: SimdTarget,
    ops: GemmIntrinsics,
}

impl GemmGenerator {
    pub fn new(request: GemmRequest) -> Result<Self> {
        let target = request.isa.target()?;
        Self::with_target(request, target)
    }

    /// Validate `request` against an explicit target.
    pub fn with_target(request: GemmRequest, target: SimdTarget) -> Result<Self> {
        let isa = target.isa();
        let width = target.width();

        for (parameter, value) in [("mr_min", request.mr_min), ("mr_max", request.mr_max)] {
            ensure!(value > 0 && value % width == 0, TileMisalignedSnafu { parameter, value, width, isa });
        }
        let (min, max) = (request.mr_min, request.mr_max);
        ensure!(min <= max, InvalidRangeSnafu { parameter: "mr", min, max, isa, reason: "minimum exceeds maximum" });

        let (min, max) = (request.nr_min, request.nr_max);
        ensure!(min >= 1, InvalidRangeSnafu { parameter: "nr", min, max, isa, reason: "column tiles start at 1" });
        ensure!(min <= max, InvalidRangeSnafu { parameter: "nr", min, max, isa, reason: "minimum exceeds maximum" });

        let ops = GemmIntrinsics::resolve(&target, request.output)?;
        Ok(Self { request, target, ops })
    }

    pub fn request(&self) -> &GemmRequest {
        &self.request
    }

    pub fn target(&self) -> &SimdTarget {
        &self.target
    }

    /// Row tiles, stepped by the vector width.
    pub fn row_tiles(&self) -> std::iter::StepBy<std::ops::RangeInclusive<usize>> {
        (self.request.mr_min..=self.request.mr_max).step_by(self.target.width())
    }

    pub fn column_tiles(&self) -> std::ops::RangeInclusive<usize> {
        self.request.nr_min..=self.request.nr_max
    }

    /// Dispatch table over the generated grid.
    pub fn dispatch_table(&self) -> DispatchTable {
        DispatchTable::new(&self.kernels())
    }

    fn emit_kernel(&self, w: &mut CodeWriter, kernel: &Kernel, mr: usize, nr: usize) {
        let ops = &self.ops;
        let width = self.target.width();
        let rows = mr / width;

        w.lines(kernel.definition());
        w.block(|w| {
            for (m, n) in iproduct!(0..rows, 0..nr) {
                w.line(format!("{} va{m}b{n} = {}();", ops.dd_vector, ops.dd_zero));
            }
            w.blank();
            w.line("for (; k != 0; k--) {");
            w.block(|w| {
                for m in 0..rows {
                    let hi = c::call(ops.load, &[&format!("a+{}", 2 * m * width)]);
                    let lo = c::call(ops.load, &[&format!("a+{}", (2 * m + 1) * width)]);
                    w.line(format!("const {} va{m} = {{ {hi}, {lo} }};", ops.dd_vector));
                }
                w.line(format!("a += {};", 2 * mr));
                w.blank();
                for n in 0..nr {
                    let broadcast = c::call(ops.broadcast, &[&format!("b+{n}")]);
                    w.line(format!("const {} vb{n} = {broadcast};", ops.dd_vector));
                }
                w.line(format!("b += {nr};"));
                w.blank();
                for (m, n) in iproduct!(0..rows, 0..nr) {
                    let acc = format!("va{m}b{n}");
                    let product = c::call(ops.dd_mul, &[&format!("va{m}"), &format!("vb{n}")]);
                    w.line(format!("{acc} = {};", c::call(ops.dd_add, &[&acc, &product])));
                }
            });
            w.line("}");
            w.blank();
            for (n, m) in iproduct!(0..nr, 0..rows) {
                let address = format!("&c[{n}*{mr}+{m}*{width}]");
                let updated = c::call(ops.dd_add, &[&format!("va{m}b{n}"), &c::call(ops.load_output, &[&address])]);
                w.line(format!("{};", c::call(ops.store_output, &[&address, &updated])));
            }
        });
        w.line("}");
        w.blank();
    }

    fn implementation(&self, kernels: &[Kernel]) -> String {
        let mut w = CodeWriter::new();
        c::include_system(&mut w, "fpplus.h");
        w.blank();
        c::include_system(&mut w, &self.request.header_include);
        w.blank();

        for kernel in kernels {
            let Some((mr, nr)) = kernel.tile() else { continue };
            tracing::debug!(kernel.name = %kernel.name, mr, nr, "gemm: emitting kernel");
            self.emit_kernel(&mut w, kernel, mr, nr);
        }
        w.finish()
    }

    fn header(&self, kernels: &[Kernel], table: &DispatchTable) -> String {
        let mut w = CodeWriter::new();
        w.line("#pragma once");
        w.blank();
        c::extern_c_open(&mut w);
        w.blank();
        c::include_system(&mut w, "stddef.h");
        w.blank();
        c::include_system(&mut w, "fpplus.h");
        w.blank();

        let defines = [
            ("DDGEMM_MR_MIN", self.request.mr_min),
            ("DDGEMM_MR_MAX", self.request.mr_max),
            ("DDGEMM_MR_STEP", self.target.width()),
            ("DDGEMM_NR_MIN", self.request.nr_min),
            ("DDGEMM_NR_MAX", self.request.nr_max),
        ];
        for (name, value) in defines {
            w.line(format!("#define {name} {value}"));
        }
        w.blank();

        if let Some(first) = kernels.first() {
            w.line(first.signature.pointer_typedef(FUNCTION_TYPEDEF));
            w.blank();
        }
        if self.request.output == Alignment::Unaligned {
            c::comment(&mut w, "Output tiles are accessed with unaligned loads and stores");
        }
        for kernel in kernels {
            w.line(kernel.prototype());
        }
        w.blank();

        table.render(&mut w);
        w.blank();

        c::extern_c_close(&mut w);
        w.finish()
    }

    fn unittest(&self, kernels: &[Kernel]) -> String {
        let mut w = CodeWriter::new();
        c::gtest_prelude(&mut w, &self.request.header_include, TESTER_HEADER);

        let width = self.target.width();
        for kernel in kernels {
            let Some((mr, nr)) = kernel.tile() else { continue };
            w.line(format!("TEST(ddgemm, ukernel{mr}x{nr}) {{"));
            w.indent_line(format!("DDGEMMTester<{mr}, {nr}, {width}, {}>().test();", kernel.name));
            w.line("}");
            w.blank();
        }

        c::gtest_main(&mut w);
        w.finish()
    }
}

impl Generator for GemmGenerator {
    fn kernels(&self) -> Vec<Kernel> {
        iproduct!(self.row_tiles(), self.column_tiles()).map(|(mr, nr)| Kernel::ddgemm(mr, nr)).collect()
    }

    fn generate(&self) -> Result<Artifacts> {
        let kernels = self.kernels();
        let table = DispatchTable::new(&kernels);

        let implementation = self.implementation(&kernels);
        let header = self.header(&kernels, &table);
        let unittest = self.unittest(&kernels);

        tracing::info!(
            generator = self.name(),
            isa = %self.target.isa(),
            mr_min = self.request.mr_min,
            mr_max = self.request.mr_max,
            nr_min = self.request.nr_min,
            nr_max = self.request.nr_max,
            kernels = kernels.len(),
            "generated artifacts"
        );

        Ok(Artifacts { implementation, header, unittest, kernels })
    }

    fn name(&self) -> &str {
        "gemm"
    }
}
