//! Unrolled dot-product kernel generator.
//!
//! For every unroll factor `U` in the request three kernels are emitted:
//!
//! - `dot_product_muladd_unroll<U>`: vector multiply then add (two roundings).
//! - `dot_product_fma_unroll<U>`: vector fused multiply-add.
//! - `compensated_dot_product_efmuladd_unroll<U>`: double-double accumulators
//!   updated with an error-free product and an error-free sum per element.
//!
//! All three share the loop shape: `U` accumulators, a main loop consuming
//! `U * width` elements per iteration, the pairwise tree from
//! [`crate::reduce`], a horizontal sum, and a scalar tail for the remaining
//! `< U * width` elements.

use std::collections::BTreeSet;

use ddkern_isa::{AbstractOp, SimdTarget};
use snafu::ensure;

use crate::c::{self, EFADD, EFADDORD, EFMUL};
use crate::config::{DotRequest, TailFma};
use crate::reduce::{emit_horizontal_helpers, emit_pairwise};
use crate::types::{Artifacts, Kernel, KernelFamily};
use crate::writer::CodeWriter;
use crate::{Generator, InvalidRangeSnafu, Result, UnrollExceedsRegistersSnafu};

/// Name of the googletest fixture helper the generated tests include.
pub const TESTER_HEADER: &str = "dot-tester.h";

/// Vector registers occupied by the accumulators of one kernel.
pub fn accumulator_registers(family: KernelFamily, unroll: usize) -> usize {
    if family.is_double_double() { 2 * unroll } else { unroll }
}

/// Intrinsic names resolved once at validation time.
#[derive(Debug, Clone)]
struct DotIntrinsics {
    vector: &'static str,
    dd_vector: &'static str,
    zero: &'static str,
    load: &'static str,
    add: &'static str,
    mul: &'static str,
    fma: &'static str,
    reduce_add: &'static str,
    dd_zero: &'static str,
    dd_add: &'static str,
    ef_add: &'static str,
    ef_mul: &'static str,
    dd_reduce_add: &'static str,
}

impl DotIntrinsics {
    fn resolve(target: &SimdTarget) -> Result<Self> {
        Ok(Self {
            vector: target.vector_type(),
            dd_vector: target.dd_vector_type(),
            zero: target.op(AbstractOp::Zero)?,
            load: target.op(AbstractOp::Load)?,
            add: target.op(AbstractOp::Add)?,
            mul: target.op(AbstractOp::Mul)?,
            fma: target.op(AbstractOp::Fma)?,
            reduce_add: target.op(AbstractOp::ReduceAdd)?,
            dd_zero: target.op(AbstractOp::DdZero)?,
            dd_add: target.op(AbstractOp::DdAdd)?,
            ef_add: target.op(AbstractOp::EfAdd)?,
            ef_mul: target.op(AbstractOp::EfMul)?,
            dd_reduce_add: target.op(AbstractOp::DdReduceAdd)?,
        })
    }
}

/// Validated dot-product generator for one request.
#[derive(Debug, Clone)]
pub struct DotGenerator {
    request: DotRequest,
    target: SimdTarget,
    ops: DotIntrinsics,
}

impl DotGenerator {
    /// Validate `request` against its built-in instruction set.
    pub fn new(request: DotRequest) -> Result<Self> {
        let target = request.isa.target()?;
        Self::with_target(request, target)
    }

    /// Validate `request` against an explicit target.
    ///
    /// Every check runs here, so a generator that exists cannot fail to
    /// produce its artifacts for configuration reasons.
    pub fn with_target(request: DotRequest, target: SimdTarget) -> Result<Self> {
        let isa = target.isa();
        let (min, max) = (request.unroll_min, request.unroll_max);
        ensure!(
            min >= 1,
            InvalidRangeSnafu { parameter: "unroll", min, max, isa, reason: "unroll factors start at 1" }
        );
        ensure!(
            min <= max,
            InvalidRangeSnafu { parameter: "unroll", min, max, isa, reason: "minimum exceeds maximum" }
        );

        target.require(target.horizontal().helper_ops())?;
        let ops = DotIntrinsics::resolve(&target)?;

        for family in KernelFamily::DOT {
            let needed = accumulator_registers(family, max);
            ensure!(
                needed <= target.registers(),
                UnrollExceedsRegistersSnafu {
                    unroll: max,
                    family,
                    needed,
                    available: target.registers(),
                    isa,
                }
            );
        }

        if !request.tail_fma.is_fused() {
            tracing::warn!(isa = %isa, "dot: fma kernels will use an unfused scalar tail");
        }

        Ok(Self { request, target, ops })
    }

    pub fn request(&self) -> &DotRequest {
        &self.request
    }

    pub fn target(&self) -> &SimdTarget {
        &self.target
    }

    fn implementation(&self, kernels: &[Kernel]) -> Result<String> {
        let mut w = CodeWriter::new();
        c::include_system(&mut w, "fpplus.h");
        w.blank();
        c::include_system(&mut w, &self.request.header_include);
        w.blank();

        let helpers = emit_horizontal_helpers(&mut w, &self.target)?;
        tracing::debug!(helpers = ?helpers, "dot: horizontal reduction helpers");

        for kernel in kernels {
            let Some(unroll) = kernel.unroll() else { continue };
            tracing::debug!(kernel.name = %kernel.name, unroll, "dot: emitting kernel");
            match kernel.family {
                KernelFamily::Compensated => self.emit_compensated(&mut w, kernel, unroll),
                _ => self.emit_plain(&mut w, kernel, unroll),
            }
        }
        Ok(w.finish())
    }

    /// Vector loads of one main-loop iteration, shared by every family.
    fn emit_loads(&self, w: &mut CodeWriter, unroll: usize) {
        let ops = &self.ops;
        let width = self.target.width();
        for i in 0..unroll {
            w.line(format!("const {} va{i} = {};", ops.vector, c::call(ops.load, &[&format!("a+{}", i * width)])));
        }
        for i in 0..unroll {
            w.line(format!("const {} vb{i} = {};", ops.vector, c::call(ops.load, &[&format!("b+{}", i * width)])));
        }
    }

    fn emit_plain(&self, w: &mut CodeWriter, kernel: &Kernel, unroll: usize) {
        let ops = &self.ops;
        let step = unroll * self.target.width();
        let fma = kernel.family == KernelFamily::Fma;

        w.lines(kernel.definition());
        w.block(|w| {
            for i in 0..unroll {
                w.line(format!("{} vsum{i} = {}();", ops.vector, ops.zero));
            }
            w.line(format!("for (; n >= {step}; n -= {step}) {{"));
            w.block(|w| {
                self.emit_loads(w, unroll);
                for i in 0..unroll {
                    let (va, vb, vsum) = (format!("va{i}"), format!("vb{i}"), format!("vsum{i}"));
                    let update = if fma {
                        c::call(ops.fma, &[&va, &vb, &vsum])
                    } else {
                        c::call(ops.add, &[&vsum, &c::call(ops.mul, &[&va, &vb])])
                    };
                    w.line(format!("{vsum} = {update};"));
                }
                w.line(format!("a += {step};"));
                w.line(format!("b += {step};"));
            });
            w.line("}");

            emit_pairwise(w, unroll, "vsum", ops.add);
            w.line(format!("double sum = {};", c::call(ops.reduce_add, &["vsum0"])));

            w.line("while (n--) {");
            w.block(|w| match (fma, self.request.tail_fma) {
                (true, TailFma::Fused) => {
                    w.line("#if defined(__GNUC__)");
                    w.indent_line("sum = __builtin_fma(*a++, *b++, sum);");
                    w.line("#else");
                    w.indent_line("sum = fma(*a++, *b++, sum);");
                    w.line("#endif");
                }
                _ => {
                    w.line("sum += (*a++) * (*b++);");
                }
            });
            w.line("}");
            w.line("return sum;");
        });
        w.line("}");
        w.blank();
    }

    fn emit_compensated(&self, w: &mut CodeWriter, kernel: &Kernel, unroll: usize) {
        let ops = &self.ops;
        let step = unroll * self.target.width();

        w.lines(kernel.definition());
        w.block(|w| {
            for i in 0..unroll {
                w.line(format!("{} vsum{i} = {}();", ops.dd_vector, ops.dd_zero));
            }
            w.line(format!("for (; n >= {step}; n -= {step}) {{"));
            w.block(|w| {
                self.emit_loads(w, unroll);
                for i in 0..unroll {
                    w.line(format!("{} vproduct{i}_error, vsum{i}_error;", ops.vector));
                }
                for i in 0..unroll {
                    let error = format!("&vproduct{i}_error");
                    let product = c::call(ops.ef_mul, &[&format!("va{i}"), &format!("vb{i}"), &error]);
                    w.line(format!("const {} vproduct{i} = {product};", ops.vector));
                }
                for i in 0..unroll {
                    let error = format!("&vsum{i}_error");
                    let sum = c::call(ops.ef_add, &[&format!("vsum{i}.hi"), &format!("vproduct{i}"), &error]);
                    w.line(format!("vsum{i}.hi = {sum};"));
                }
                for i in 0..unroll {
                    let errors = c::call(ops.add, &[&format!("vsum{i}_error"), &format!("vproduct{i}_error")]);
                    w.line(format!("vsum{i}.lo = {};", c::call(ops.add, &[&format!("vsum{i}.lo"), &errors])));
                }
                w.line(format!("a += {step};"));
                w.line(format!("b += {step};"));
            });
            w.line("}");

            emit_pairwise(w, unroll, "vsum", ops.dd_add);
            w.line(format!("doubledouble sum = {};", c::call(ops.dd_reduce_add, &["vsum0"])));

            w.line("while (n--) {");
            w.block(|w| {
                w.line("double product_error, sum_error;");
                w.line(format!("const double product = {};", c::call(EFMUL, &["*a++", "*b++", "&product_error"])));
                w.line(format!("sum.hi = {};", c::call(EFADD, &["sum.hi", "product", "&sum_error"])));
                w.line("sum.lo += (sum_error + product_error);");
            });
            w.line("}");
            c::comment(w, "Normalize");
            w.line(format!("sum.hi = {};", c::call(EFADDORD, &["sum.hi", "sum.lo", "&sum.lo"])));
            w.line("return sum;");
        });
        w.line("}");
        w.blank();
    }

    fn header(&self, kernels: &[Kernel]) -> String {
        let mut w = CodeWriter::new();
        w.line("#pragma once");
        w.blank();
        c::extern_c_open(&mut w);
        w.blank();
        c::include_system(&mut w, "stddef.h");
        w.blank();
        c::include_system(&mut w, "fpplus.h");
        w.blank();
        w.line(Kernel::dot(KernelFamily::MulAdd, 1).signature.pointer_typedef("dot_product_function"));
        w.line(Kernel::dot(KernelFamily::Compensated, 1).signature.pointer_typedef("compensated_dot_product_function"));
        w.blank();

        for family in KernelFamily::DOT {
            c::comment(&mut w, family_comment(family));
            if family == KernelFamily::Fma && !self.request.tail_fma.is_fused() {
                c::comment(&mut w, "Scalar tail uses unfused multiply-add (two roundings per element)");
            }
            for kernel in kernels.iter().filter(|k| k.family == family) {
                w.line(kernel.prototype());
            }
            w.blank();
        }

        c::extern_c_close(&mut w);
        w.finish()
    }

    fn unittest(&self, kernels: &[Kernel]) -> String {
        let mut w = CodeWriter::new();
        c::gtest_prelude(&mut w, &self.request.header_include, TESTER_HEADER);

        for family in KernelFamily::DOT {
            c::comment(&mut w, family_comment(family));
            for kernel in kernels.iter().filter(|k| k.family == family) {
                let Some(unroll) = kernel.unroll() else { continue };
                let (suite, method) = match family {
                    KernelFamily::Compensated => ("compensated_dot_product", "testCompensatedDotProduct"),
                    _ => ("dot_product", "testDotProduct"),
                };
                let lengths =
                    test_lengths(unroll, self.target.width()).iter().map(ToString::to_string).collect::<Vec<_>>();

                w.line(format!("TEST({suite}, {}_unroll{unroll}) {{", test_qualifier(family)));
                w.block(|w| {
                    w.line("DotTester tester;");
                    w.line(format!("for (size_t elements : {{{}}}) {{", lengths.join(", ")));
                    w.indent_line(format!("tester.arrayElements(elements).{method}({});", kernel.name));
                    w.line("}");
                });
                w.line("}");
                w.blank();
            }
        }

        c::gtest_main(&mut w);
        w.finish()
    }
}

impl Generator for DotGenerator {
    fn kernels(&self) -> Vec<Kernel> {
        KernelFamily::DOT
            .into_iter()
            .flat_map(|family| self.request.unrolls().map(move |unroll| Kernel::dot(family, unroll)))
            .collect()
    }

    fn generate(&self) -> Result<Artifacts> {
        let kernels = self.kernels();
        let implementation = self.implementation(&kernels)?;
        let header = self.header(&kernels);
        let unittest = self.unittest(&kernels);

        tracing::info!(
            generator = self.name(),
            isa = %self.target.isa(),
            unroll_min = self.request.unroll_min,
            unroll_max = self.request.unroll_max,
            kernels = kernels.len(),
            "generated artifacts"
        );

        Ok(Artifacts { implementation, header, unittest, kernels })
    }

    fn name(&self) -> &str {
        "dot"
    }
}

fn family_comment(family: KernelFamily) -> &'static str {
    match family {
        KernelFamily::MulAdd => "Dot product based on multiplication and addition (with intermediate rounding)",
        KernelFamily::Fma => "Dot product based on fused multiply-add",
        KernelFamily::Compensated => {
            "Compensated dot product based on error-free multiplication and error-free addition"
        }
        KernelFamily::DdGemm => "Double-double GEMM microkernels",
    }
}

fn test_qualifier(family: KernelFamily) -> &'static str {
    match family {
        KernelFamily::MulAdd => "mac",
        KernelFamily::Fma => "fma",
        KernelFamily::Compensated => "compensated",
        KernelFamily::DdGemm => "ukernel",
    }
}

/// Array lengths exercised by the generated test of an unroll-`unroll` kernel:
/// a single element, a partial vector, exact multiples of the main-loop step,
/// a multiple plus a tail, and a large odd length.
pub fn test_lengths(unroll: usize, width: usize) -> Vec<usize> {
    let step = unroll * width;
    let lengths: BTreeSet<usize> = [1, width.saturating_sub(1).max(1), step, 3 * step, 3 * step + 1, 1027].into();
    lengths.into_iter().collect()
}
