//! Dot-product generator tests.

use ddkern_isa::{AbstractOp, HorizontalReduce, InstructionSet, OpTable, SimdTarget};
use strum::VariantArray;
use test_case::test_case;

use crate::dot::{DotGenerator, accumulator_registers, test_lengths};
use crate::{DotRequest, Error, Generator, KernelFamily, TailFma};

fn generate(isa: InstructionSet, unroll_min: usize, unroll_max: usize) -> crate::Artifacts {
    let request = DotRequest::builder().isa(isa).unroll_min(unroll_min).unroll_max(unroll_max).build();
    DotGenerator::new(request).expect("valid request").generate().expect("generation failed")
}

/// Text of one function definition, from its return type to the closing brace.
fn function<'a>(code: &'a str, name: &str) -> &'a str {
    let start = code.find(&format!(" {name}(")).expect("function not found");
    let start = code[..start].rfind('\n').map_or(0, |i| i + 1);
    let end = start + code[start..].find("\n}\n").expect("unterminated function") + 3;
    &code[start..end]
}

fn target_without(isa: InstructionSet, missing: AbstractOp) -> SimdTarget {
    let base = isa.target().unwrap();
    let ops = OpTable::new(base.ops().iter().filter(|(op, _)| *op != missing));
    SimdTarget::custom(
        base.isa(),
        base.width(),
        base.registers(),
        base.vector_type(),
        base.dd_vector_type(),
        base.horizontal(),
        ops,
    )
}

// ============================================================================
// Emitted Text
// ============================================================================

#[test]
fn test_muladd_unroll1_avx() {
    let artifacts = generate(InstructionSet::Avx, 1, 1);
    let expected = "\
double dot_product_muladd_unroll1(
\tsize_t n,
\tconst double a[restrict static n],
\tconst double b[restrict static n])
{
\t__m256d vsum0 = _mm256_setzero_pd();
\tfor (; n >= 4; n -= 4) {
\t\tconst __m256d va0 = _mm256_load_pd(a+0);
\t\tconst __m256d vb0 = _mm256_load_pd(b+0);
\t\tvsum0 = _mm256_add_pd(vsum0, _mm256_mul_pd(va0, vb0));
\t\ta += 4;
\t\tb += 4;
\t}
\tdouble sum = _mm256_reduce_add_pd(vsum0);
\twhile (n--) {
\t\tsum += (*a++) * (*b++);
\t}
\treturn sum;
}
";
    assert_eq!(function(&artifacts.implementation, "dot_product_muladd_unroll1"), expected);
}

#[test]
fn test_fma_unroll2_mic() {
    let artifacts = generate(InstructionSet::Mic, 2, 2);
    let code = function(&artifacts.implementation, "dot_product_fma_unroll2");

    assert!(code.contains("for (; n >= 16; n -= 16) {"), "{code}");
    assert!(code.contains("const __m512d va1 = _mm512_load_pd(a+8);"), "{code}");
    assert!(code.contains("const __m512d vb1 = _mm512_load_pd(b+8);"), "{code}");
    assert!(code.contains("vsum1 = _mm512_fmadd_pd(va1, vb1, vsum1);"), "{code}");
    assert!(code.contains("vsum0 = _mm512_add_pd(vsum0, vsum1);"), "{code}");
    assert!(code.contains("double sum = _mm512_reduce_add_pd(vsum0);"), "{code}");
    assert!(code.contains("\t\t#if defined(__GNUC__)\n\t\t\tsum = __builtin_fma(*a++, *b++, sum);\n"), "{code}");
    assert!(code.contains("\t\t#else\n\t\t\tsum = fma(*a++, *b++, sum);\n\t\t#endif\n"), "{code}");
}

#[test]
fn test_compensated_unroll2_avx() {
    let artifacts = generate(InstructionSet::Avx, 2, 2);
    let code = function(&artifacts.implementation, "compensated_dot_product_efmuladd_unroll2");

    assert!(code.starts_with("doubledouble compensated_dot_product_efmuladd_unroll2(\n"), "{code}");
    assert!(code.contains("__m256dd vsum1 = _mm256_setzero_pdd();"), "{code}");
    assert!(code.contains("for (; n >= 8; n -= 8) {"), "{code}");
    assert!(code.contains("const __m256d vproduct1 = _mm256_efmul_pd(va1, vb1, &vproduct1_error);"), "{code}");
    assert!(code.contains("vsum1.hi = _mm256_efadd_pd(vsum1.hi, vproduct1, &vsum1_error);"), "{code}");
    assert!(code.contains("vsum1.lo = _mm256_add_pd(vsum1.lo, _mm256_add_pd(vsum1_error, vproduct1_error));"), "{code}");
    assert!(code.contains("vsum0 = _mm256_add_pdd(vsum0, vsum1);"), "{code}");
    assert!(code.contains("doubledouble sum = _mm256_reduce_add_pdd(vsum0);"), "{code}");
    assert!(code.contains("const double product = efmul(*a++, *b++, &product_error);"), "{code}");
    assert!(code.contains("sum.hi = efadd(sum.hi, product, &sum_error);"), "{code}");
    assert!(code.contains("sum.lo += (sum_error + product_error);"), "{code}");
    assert!(code.ends_with("\t/* Normalize */\n\tsum.hi = efaddord(sum.hi, sum.lo, &sum.lo);\n\treturn sum;\n}\n"), "{code}");
}

#[test]
fn test_pairwise_tree_for_five_accumulators() {
    let artifacts = generate(InstructionSet::Mic, 5, 5);
    let code = function(&artifacts.implementation, "dot_product_muladd_unroll5");
    let tree = "\
\tvsum0 = _mm512_add_pd(vsum0, vsum1);
\tvsum2 = _mm512_add_pd(vsum2, vsum3);
\tvsum0 = _mm512_add_pd(vsum0, vsum2);
\tvsum0 = _mm512_add_pd(vsum0, vsum4);
";
    assert!(code.contains(tree), "{code}");
}

#[test]
fn test_avx_emits_horizontal_helpers_first() {
    let artifacts = generate(InstructionSet::Avx, 1, 1);
    let code = &artifacts.implementation;

    assert!(code.starts_with("#include <fpplus.h>\n\n#include <dot/dot.h>\n\n"), "{code}");
    let helper = code.find("FPPLUS_STATIC_INLINE double _mm_reduce_add_pd(const __m128d x) {").unwrap();
    let reduce = code.find("FPPLUS_STATIC_INLINE double _mm256_reduce_add_pd(const __m256d x) {").unwrap();
    let kernel = code.find("dot_product_muladd_unroll1(").unwrap();
    assert!(helper < reduce && reduce < kernel);
    assert!(code.contains("return _mm_reduce_add_pd(_mm_add_pd(x_lo, x_hi));"), "{code}");
}

#[test]
fn test_mic_emits_no_helpers() {
    let artifacts = generate(InstructionSet::Mic, 1, 2);
    assert!(!artifacts.implementation.contains("FPPLUS_STATIC_INLINE"));
}

#[test]
fn test_generator_accessors() {
    let request = DotRequest::builder().isa(InstructionSet::Mic).unroll_min(2).unroll_max(3).build();
    let generator = DotGenerator::new(request.clone()).unwrap();

    assert_eq!(generator.name(), "dot");
    assert_eq!(generator.request(), &request);
    assert_eq!(generator.target().width(), 8);
    assert_eq!(generator.kernels().len(), 6);
}

#[test]
fn test_kernel_order() {
    let artifacts = generate(InstructionSet::Avx, 1, 2);
    let names: Vec<_> = artifacts.kernels.iter().map(|k| k.name.as_str()).collect();
    assert_eq!(
        names,
        [
            "dot_product_muladd_unroll1",
            "dot_product_muladd_unroll2",
            "dot_product_fma_unroll1",
            "dot_product_fma_unroll2",
            "compensated_dot_product_efmuladd_unroll1",
            "compensated_dot_product_efmuladd_unroll2",
        ]
    );

    let positions: Vec<_> =
        names.iter().map(|name| artifacts.implementation.find(&format!(" {name}(\n")).unwrap()).collect();
    assert!(positions.is_sorted());
}

#[test_case(KernelFamily::MulAdd, "dot_product_muladd_unroll3"; "muladd")]
#[test_case(KernelFamily::Fma, "dot_product_fma_unroll3"; "fma")]
#[test_case(KernelFamily::Compensated, "compensated_dot_product_efmuladd_unroll3"; "compensated")]
fn test_unroll_shape_drives_loop_step(family: KernelFamily, name: &str) {
    let artifacts = generate(InstructionSet::Avx, 3, 3);
    let kernel = artifacts.kernel(name).expect("kernel generated");
    assert_eq!((kernel.family, kernel.unroll()), (family, Some(3)));

    let code = function(&artifacts.implementation, name);
    assert!(code.contains("\tfor (; n >= 12; n -= 12) {\n"), "{code}");
    assert!(code.contains("const __m256d vb2 = _mm256_load_pd(b+8);"), "{code}");
    assert!(!code.contains("vb3"), "{code}");
    assert_eq!(artifacts.unittest.matches("for (size_t elements : {1, 3, 12, 36, 37, 1027}) {").count(), 3);
}

// ============================================================================
// Header and Unit Test
// ============================================================================

#[test]
fn test_header_layout() {
    let artifacts = generate(InstructionSet::Avx, 1, 1);
    let header = &artifacts.header;

    assert!(header.starts_with("#pragma once\n\n#ifdef __cplusplus\nextern \"C\" {\n#endif\n"), "{header}");
    assert!(header.contains("typedef double (*dot_product_function)(size_t, const double*, const double*);"));
    assert!(header.contains(
        "typedef doubledouble (*compensated_dot_product_function)(size_t, const double*, const double*);"
    ));
    assert!(header.contains(
        "/* Dot product based on fused multiply-add */\n\
         double dot_product_fma_unroll1(size_t n, const double a[], const double b[]);\n"
    ));
    assert!(header.ends_with("#ifdef __cplusplus\n} /* extern \"C\" */\n#endif\n"), "{header}");
}

#[test]
fn test_unittest_stanzas() {
    let artifacts = generate(InstructionSet::Avx, 1, 2);
    let test = &artifacts.unittest;

    assert!(test.contains("#include <dot/dot.h>\n\n#include \"dot-tester.h\"\n"), "{test}");
    assert!(test.contains(
        "TEST(dot_product, mac_unroll1) {\n\
         \tDotTester tester;\n\
         \tfor (size_t elements : {1, 3, 4, 12, 13, 1027}) {\n\
         \t\ttester.arrayElements(elements).testDotProduct(dot_product_muladd_unroll1);\n\
         \t}\n\
         }\n"
    ));
    assert!(test.contains("TEST(dot_product, fma_unroll2) {"));
    assert!(test.contains("tester.arrayElements(elements).testCompensatedDotProduct(compensated_dot_product_efmuladd_unroll2);"));
    assert!(test.ends_with("\treturn RUN_ALL_TESTS();\n}\n"));
}

#[test]
fn test_custom_header_include() {
    let request = DotRequest::builder().isa(InstructionSet::Avx).unroll_max(1).header_include("fpplus/dot.h").build();
    let artifacts = DotGenerator::new(request).unwrap().generate().unwrap();

    assert!(artifacts.implementation.contains("#include <fpplus/dot.h>"));
    assert!(artifacts.unittest.contains("#include <fpplus/dot.h>"));
}

// ============================================================================
// Scalar Tail Mode
// ============================================================================

#[test]
fn test_unfused_tail() {
    let request = DotRequest::builder().isa(InstructionSet::Avx).unroll_max(1).tail_fma(TailFma::Unfused).build();
    let artifacts = DotGenerator::new(request).unwrap().generate().unwrap();
    let fma = function(&artifacts.implementation, "dot_product_fma_unroll1");

    assert!(!fma.contains("fma(*a++"), "{fma}");
    assert!(fma.contains("sum += (*a++) * (*b++);"), "{fma}");
    assert!(fma.contains("vsum0 = _mm256_fmadd_pd(va0, vb0, vsum0);"), "{fma}");
    assert!(artifacts.header.contains("/* Scalar tail uses unfused multiply-add (two roundings per element) */"));
}

#[test]
fn test_fused_tail_only_in_fma_family() {
    let artifacts = generate(InstructionSet::Avx, 1, 1);
    let muladd = function(&artifacts.implementation, "dot_product_muladd_unroll1");
    let compensated = function(&artifacts.implementation, "compensated_dot_product_efmuladd_unroll1");

    assert!(!muladd.contains("fma"), "{muladd}");
    assert!(!compensated.contains("__builtin_fma"), "{compensated}");
    assert!(!artifacts.header.contains("unfused"));
}

// ============================================================================
// Validation
// ============================================================================

#[test_case(0, 4, "unroll factors start at 1"; "zero minimum")]
#[test_case(5, 4, "minimum exceeds maximum"; "inverted range")]
fn test_invalid_unroll_range(unroll_min: usize, unroll_max: usize, expected: &str) {
    let request = DotRequest::builder().isa(InstructionSet::Avx).unroll_min(unroll_min).unroll_max(unroll_max).build();
    let err = DotGenerator::new(request).unwrap_err();

    assert!(matches!(err, Error::InvalidRange { parameter: "unroll", .. }), "{err}");
    let message = err.to_string();
    assert!(message.contains(expected) && message.contains("avx"), "{message}");
}

#[test_case(InstructionSet::Avx, 8, true; "avx 8 fits")]
#[test_case(InstructionSet::Avx, 9, false; "avx 9 overflows compensated")]
#[test_case(InstructionSet::Mic, 16, true; "mic 16 fits")]
#[test_case(InstructionSet::Mic, 17, false; "mic 17 overflows compensated")]
fn test_register_limit(isa: InstructionSet, unroll_max: usize, fits: bool) {
    let request = DotRequest::builder().isa(isa).unroll_min(1).unroll_max(unroll_max).build();
    let result = DotGenerator::new(request);
    assert_eq!(result.is_ok(), fits);
}

#[test]
fn test_register_error_names_family_and_isa() {
    let request = DotRequest::builder().isa(InstructionSet::Avx).unroll_min(1).unroll_max(9).build();
    let err = DotGenerator::new(request).unwrap_err();

    match &err {
        Error::UnrollExceedsRegisters { unroll, family, needed, available, isa } => {
            assert_eq!((*unroll, *needed, *available), (9, 18, 16));
            assert_eq!(*family, "compensated");
            assert_eq!(*isa, InstructionSet::Avx);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("avx"));
}

#[test]
fn test_family_names_are_static() {
    let names: Vec<&'static str> = KernelFamily::VARIANTS.iter().map(|&family| <&'static str>::from(family)).collect();
    assert_eq!(names, ["mul_add", "fma", "compensated", "dd_gemm"]);
}

#[test]
fn test_accumulator_registers() {
    assert_eq!(accumulator_registers(KernelFamily::MulAdd, 3), 3);
    assert_eq!(accumulator_registers(KernelFamily::Fma, 3), 3);
    assert_eq!(accumulator_registers(KernelFamily::Compensated, 3), 6);
}

#[test]
fn test_unsupported_isa_fails_before_generation() {
    let request = DotRequest::builder().isa(InstructionSet::Sse).build();
    let err = DotGenerator::new(request).unwrap_err();
    assert!(matches!(err, Error::Isa { source: ddkern_isa::Error::UnsupportedIsa { .. } }), "{err}");
    assert!(err.to_string().contains("sse"));
}

#[test]
fn test_missing_op_names_op_and_isa() {
    let request = DotRequest::builder().isa(InstructionSet::Mic).unroll_max(2).build();
    let err = DotGenerator::with_target(request, target_without(InstructionSet::Mic, AbstractOp::EfMul)).unwrap_err();

    assert!(
        matches!(err, Error::Isa { source: ddkern_isa::Error::MissingOp { op: AbstractOp::EfMul, isa: InstructionSet::Mic } }),
        "{err}"
    );
    let message = err.to_string();
    assert!(message.contains("ef_mul") && message.contains("mic"), "{message}");
}

#[test]
fn test_missing_helper_op() {
    let request = DotRequest::builder().isa(InstructionSet::Avx).unroll_max(2).build();
    let target = target_without(InstructionSet::Avx, AbstractOp::HalfUnpackHigh);
    assert!(matches!(target.horizontal(), HorizontalReduce::SplitHalves { .. }));

    let err = DotGenerator::with_target(request, target).unwrap_err();
    assert!(
        matches!(err, Error::Isa { source: ddkern_isa::Error::MissingOp { op: AbstractOp::HalfUnpackHigh, .. } }),
        "{err}"
    );
}

#[test_case(1, 4, vec![1, 3, 4, 12, 13, 1027]; "avx unroll 1")]
#[test_case(2, 8, vec![1, 7, 16, 48, 49, 1027]; "mic unroll 2")]
#[test_case(1, 1, vec![1, 3, 4, 1027]; "scalar width")]
fn test_generated_test_lengths(unroll: usize, width: usize, expected: Vec<usize>) {
    assert_eq!(test_lengths(unroll, width), expected);
}
