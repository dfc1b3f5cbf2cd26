//! Pairwise reduction tree and horizontal (lane) reduction.
//!
//! Both generators combine their accumulators with the same tournament
//! schedule: round `r` uses stride `2^r` and folds `acc[i + stride]` into
//! `acc[i]` for every `i` that is a multiple of `2 * stride` with
//! `i + stride < count`. Unpaired accumulators are carried to the next round
//! untouched, and `acc[0]` holds the result after `ceil(log2(count))` rounds.
//!
//! The emitted C and the numeric model in [`crate::model`] both walk
//! [`pairwise_rounds`], so they round identically.

use ddkern_isa::{AbstractOp, HorizontalReduce, SimdTarget};

use crate::Result;
use crate::c::{self, STATIC_INLINE};
use crate::writer::CodeWriter;

/// One step of the tree: `acc[dst] = acc[dst] (+) acc[src]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Combine {
    pub dst: usize,
    pub src: usize,
}

/// Rounds of the pairwise tree over `count` accumulators.
pub fn pairwise_rounds(count: usize) -> Vec<Vec<Combine>> {
    let mut rounds = Vec::new();
    let mut stride = 1;
    while stride < count {
        let round = (0..count - stride).step_by(2 * stride).map(|dst| Combine { dst, src: dst + stride }).collect();
        rounds.push(round);
        stride *= 2;
    }
    rounds
}

/// Apply the pairwise tree to `values` in place and return `values[0]`.
pub fn fold_pairwise<T: Clone>(values: &mut [T], mut combine: impl FnMut(&T, &T) -> T) -> Option<T> {
    for round in pairwise_rounds(values.len()) {
        for Combine { dst, src } in round {
            values[dst] = combine(&values[dst], &values[src]);
        }
    }
    values.first().cloned()
}

/// Strides of the lane-halving reduction of a `width`-lane vector:
/// `width/2, width/4, ..., 1`.
pub fn halving_strides(width: usize) -> Vec<usize> {
    debug_assert!(width.is_power_of_two());
    std::iter::successors(Some(width / 2), |&s| (s > 1).then_some(s / 2)).filter(|&s| s > 0).collect()
}

/// Sum the lanes of one vector the way the horizontal reduction does:
/// at each stride `s`, lane `i < s` absorbs lane `i + s`.
pub fn fold_lanes<T: Clone>(lanes: &mut [T], mut combine: impl FnMut(&T, &T) -> T) -> Option<T> {
    for stride in halving_strides(lanes.len()) {
        for i in 0..stride {
            lanes[i] = combine(&lanes[i], &lanes[i + stride]);
        }
    }
    lanes.first().cloned()
}

/// Emit the pairwise tree over `{var}0 .. {var}{count-1}` using `combine_fn`.
pub fn emit_pairwise(w: &mut CodeWriter, count: usize, var: &str, combine_fn: &str) {
    for round in pairwise_rounds(count) {
        for Combine { dst, src } in round {
            let lhs = format!("{var}{dst}");
            let rhs = format!("{var}{src}");
            w.line(format!("{lhs} = {};", c::call(combine_fn, &[&lhs, &rhs])));
        }
    }
}

/// Emit the helper functions a target needs for its horizontal sum and
/// return their names in definition order.
///
/// Targets with [`HorizontalReduce::Intrinsic`] need none. For
/// [`HorizontalReduce::SplitHalves`] the vector is split into two-lane halves
/// which are added, then the two lanes of the sum are added.
pub fn emit_horizontal_helpers(w: &mut CodeWriter, target: &SimdTarget) -> Result<Vec<&'static str>> {
    let HorizontalReduce::SplitHalves { half_type } = target.horizontal() else {
        return Ok(Vec::new());
    };

    let half_reduce = target.op(AbstractOp::HalfReduceAdd)?;
    let unpack_high = target.op(AbstractOp::HalfUnpackHigh)?;
    let add_low = target.op(AbstractOp::HalfAddLow)?;
    let to_scalar = target.op(AbstractOp::HalfToScalar)?;
    let cast_low = target.op(AbstractOp::HalfCastLow)?;
    let extract_high = target.op(AbstractOp::HalfExtractHigh)?;
    let half_add = target.op(AbstractOp::HalfAdd)?;
    let reduce = target.op(AbstractOp::ReduceAdd)?;

    w.line(format!("{STATIC_INLINE} double {half_reduce}(const {half_type} x) {{"));
    w.block(|w| {
        w.line(format!("const {half_type} x_hi = {};", c::call(unpack_high, &["x", "x"])));
        w.line(format!("const {half_type} sum = {};", c::call(add_low, &["x", "x_hi"])));
        w.line(format!("return {};", c::call(to_scalar, &["sum"])));
    });
    w.line("}");
    w.blank();

    w.line(format!("{STATIC_INLINE} double {reduce}(const {} x) {{", target.vector_type()));
    w.block(|w| {
        w.line(format!("const {half_type} x_lo = {};", c::call(cast_low, &["x"])));
        w.line(format!("const {half_type} x_hi = {};", c::call(extract_high, &["x", "1"])));
        w.line(format!("return {};", c::call(half_reduce, &[&c::call(half_add, &["x_lo", "x_hi"])])));
    });
    w.line("}");
    w.blank();

    Ok(vec![half_reduce, reduce])
}
