//! Built-in operation tables.
//!
//! Double-double names follow the FP+ library conventions (`_pdd` suffix for
//! double-double vectors, `ef` prefix for error-free transforms).

use crate::{AbstractOp, HorizontalReduce, InstructionSet, OpTable, SimdTarget};

pub(crate) fn avx() -> SimdTarget {
    use AbstractOp::*;

    let ops = OpTable::new([
        (Zero, "_mm256_setzero_pd"),
        (Load, "_mm256_load_pd"),
        (Add, "_mm256_add_pd"),
        (Mul, "_mm256_mul_pd"),
        (Fma, "_mm256_fmadd_pd"),
        (ReduceAdd, "_mm256_reduce_add_pd"),
        (DdZero, "_mm256_setzero_pdd"),
        (DdAdd, "_mm256_add_pdd"),
        (DdMul, "_mm256_mul_pdd"),
        (EfAdd, "_mm256_efadd_pd"),
        (EfMul, "_mm256_efmul_pd"),
        (DdBroadcast, "_mm256_broadcast_sdd"),
        (DdLoadDeinterleave, "_mm256_loaddeinterleave_pdd"),
        (DdLoadDeinterleaveUnaligned, "_mm256_loadudeinterleave_pdd"),
        (DdInterleaveStore, "_mm256_interleavestore_pdd"),
        (DdInterleaveStoreUnaligned, "_mm256_interleavestoreu_pdd"),
        (DdReduceAdd, "_mm256_reduce_add_pdd"),
        (HalfCastLow, "_mm256_castpd256_pd128"),
        (HalfExtractHigh, "_mm256_extractf128_pd"),
        (HalfAdd, "_mm_add_pd"),
        (HalfUnpackHigh, "_mm_unpackhi_pd"),
        (HalfAddLow, "_mm_add_sd"),
        (HalfToScalar, "_mm_cvtsd_f64"),
        (HalfReduceAdd, "_mm_reduce_add_pd"),
    ]);

    SimdTarget::custom(
        InstructionSet::Avx,
        4,
        16,
        "__m256d",
        "__m256dd",
        HorizontalReduce::SplitHalves { half_type: "__m128d" },
        ops,
    )
}

pub(crate) fn mic() -> SimdTarget {
    use AbstractOp::*;

    // The 512-bit ISA has a native horizontal sum, so no half-lane primitives.
    let ops = OpTable::new([
        (Zero, "_mm512_setzero_pd"),
        (Load, "_mm512_load_pd"),
        (Add, "_mm512_add_pd"),
        (Mul, "_mm512_mul_pd"),
        (Fma, "_mm512_fmadd_pd"),
        (ReduceAdd, "_mm512_reduce_add_pd"),
        (DdZero, "_mm512_setzero_pdd"),
        (DdAdd, "_mm512_add_pdd"),
        (DdMul, "_mm512_mul_pdd"),
        (EfAdd, "_mm512_efadd_pd"),
        (EfMul, "_mm512_efmul_pd"),
        (DdBroadcast, "_mm512_broadcast_sdd"),
        (DdLoadDeinterleave, "_mm512_loaddeinterleave_pdd"),
        (DdLoadDeinterleaveUnaligned, "_mm512_loadudeinterleave_pdd"),
        (DdInterleaveStore, "_mm512_interleavestore_pdd"),
        (DdInterleaveStoreUnaligned, "_mm512_interleavestoreu_pdd"),
        (DdReduceAdd, "_mm512_reduce_add_pdd"),
    ]);

    SimdTarget::custom(InstructionSet::Mic, 8, 32, "__m512d", "__m512dd", HorizontalReduce::Intrinsic, ops)
}
