use strum::{EnumCount, IntoEnumIterator, VariantArray};
use test_case::test_case;

use crate::{AbstractOp, Error, HorizontalReduce, InstructionSet, OpTable, SimdTarget};

#[test_case(InstructionSet::Avx, 4, 16, "__m256d", "__m256dd"; "avx")]
#[test_case(InstructionSet::Mic, 8, 32, "__m512d", "__m512dd"; "mic")]
fn test_supported_descriptor(isa: InstructionSet, width: usize, registers: usize, vector: &str, dd_vector: &str) {
    let target = isa.target().expect("supported target");
    assert_eq!(target.isa(), isa);
    assert_eq!(target.width(), width);
    assert_eq!(target.registers(), registers);
    assert_eq!(target.vector_type(), vector);
    assert_eq!(target.dd_vector_type(), dd_vector);
}

#[test_case(InstructionSet::Scalar; "scalar")]
#[test_case(InstructionSet::Sse; "sse")]
#[test_case(InstructionSet::Armv8; "armv8")]
#[test_case(InstructionSet::Vsx; "vsx")]
#[test_case(InstructionSet::Qpx; "qpx")]
fn test_unsupported_isa_fails_fast(isa: InstructionSet) {
    let err = isa.target().unwrap_err();
    assert!(matches!(err, Error::UnsupportedIsa { isa: got } if got == isa));
    assert!(err.to_string().contains(isa.as_ref()), "message should name the ISA: {err}");
    assert!(!isa.is_supported());
}

#[test]
fn test_parse_roundtrips_every_name() {
    for isa in InstructionSet::iter() {
        assert_eq!(InstructionSet::parse(&isa.to_string()).unwrap(), isa);
    }
}

#[test]
fn test_parse_unknown_lists_expected_names() {
    let err = InstructionSet::parse("neon").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("'neon'"), "{message}");
    assert!(message.contains("avx") && message.contains("mic"), "{message}");
}

#[test]
fn test_builtin_tables_cover_all_vector_ops() {
    let core = [
        AbstractOp::Zero,
        AbstractOp::Load,
        AbstractOp::Add,
        AbstractOp::Mul,
        AbstractOp::Fma,
        AbstractOp::ReduceAdd,
        AbstractOp::DdZero,
        AbstractOp::DdAdd,
        AbstractOp::DdMul,
        AbstractOp::EfAdd,
        AbstractOp::EfMul,
        AbstractOp::DdBroadcast,
        AbstractOp::DdLoadDeinterleave,
        AbstractOp::DdLoadDeinterleaveUnaligned,
        AbstractOp::DdInterleaveStore,
        AbstractOp::DdInterleaveStoreUnaligned,
        AbstractOp::DdReduceAdd,
    ];
    for isa in [InstructionSet::Avx, InstructionSet::Mic] {
        let target = isa.target().unwrap();
        target.require(&core).unwrap();
        target.require(target.horizontal().helper_ops()).unwrap();
    }
}

#[test]
fn test_avx_has_every_op() {
    let avx = InstructionSet::Avx.target().unwrap();
    assert_eq!(avx.ops().len(), AbstractOp::COUNT);
    avx.require(AbstractOp::VARIANTS).unwrap();
}

#[test]
fn test_mic_uses_native_horizontal_sum() {
    let mic = InstructionSet::Mic.target().unwrap();
    assert_eq!(mic.horizontal(), HorizontalReduce::Intrinsic);
    assert_eq!(mic.op(AbstractOp::ReduceAdd).unwrap(), "_mm512_reduce_add_pd");

    let err = mic.op(AbstractOp::HalfCastLow).unwrap_err();
    assert!(matches!(err, Error::MissingOp { op: AbstractOp::HalfCastLow, isa: InstructionSet::Mic }));
}

#[test]
fn test_missing_op_names_op_and_isa() {
    let table = OpTable::new([(AbstractOp::Zero, "_mm_setzero_pd"), (AbstractOp::Load, "_mm_load_pd")]);
    let sse = SimdTarget::custom(InstructionSet::Sse, 2, 16, "__m128d", "__m128dd", HorizontalReduce::Intrinsic, table);

    assert!(sse.require(&[AbstractOp::Zero, AbstractOp::Load]).is_ok());

    let err = sse.require(&[AbstractOp::Zero, AbstractOp::Fma, AbstractOp::Mul]).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("fma"), "{message}");
    assert!(message.contains("sse"), "{message}");
}

#[test]
fn test_table_lookup_is_stable() {
    let avx = InstructionSet::Avx.target().unwrap();
    let again = InstructionSet::Avx.target().unwrap();
    assert_eq!(avx, again);
    assert_eq!(avx.op(AbstractOp::DdBroadcast).unwrap(), "_mm256_broadcast_sdd");
    assert_eq!(avx.op(AbstractOp::HalfExtractHigh).unwrap(), "_mm256_extractf128_pd");
}
