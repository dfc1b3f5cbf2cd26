//! Lane-accurate simulations of the generated kernels.

use crate::config::TailFma;
use crate::reduce::{fold_lanes, fold_pairwise};
use crate::types::KernelFamily;

use super::eft::{DoubleDouble, fast_two_sum, two_prod, two_sum};

/// Model of `dot_product_{muladd,fma}_unroll<unroll>` on a `width`-lane target.
///
/// `family` must be [`KernelFamily::MulAdd`] or [`KernelFamily::Fma`];
/// `tail` only affects the fma family.
pub fn dot(family: KernelFamily, unroll: usize, width: usize, tail: TailFma, a: &[f64], b: &[f64]) -> f64 {
    debug_assert!(matches!(family, KernelFamily::MulAdd | KernelFamily::Fma));
    debug_assert_eq!(a.len(), b.len());

    let step = unroll * width;
    let mut acc = vec![vec![0.0f64; width]; unroll];
    let mut offset = 0;
    while a.len() - offset >= step {
        for (u, lanes) in acc.iter_mut().enumerate() {
            for (lane, sum) in lanes.iter_mut().enumerate() {
                let i = offset + u * width + lane;
                *sum = match family {
                    KernelFamily::Fma => a[i].mul_add(b[i], *sum),
                    _ => *sum + a[i] * b[i],
                };
            }
        }
        offset += step;
    }

    let mut vsum = fold_pairwise(&mut acc, |x, y| x.iter().zip(y).map(|(p, q)| p + q).collect()).unwrap_or_default();
    let mut sum = fold_lanes(&mut vsum, |p, q| p + q).unwrap_or(0.0);

    for i in offset..a.len() {
        sum = match (family, tail) {
            (KernelFamily::Fma, TailFma::Fused) => a[i].mul_add(b[i], sum),
            _ => sum + a[i] * b[i],
        };
    }
    sum
}

/// One compensated accumulation step: error-free product, error-free add of
/// the product into `hi`, both errors folded into `lo`.
fn compensated_step(acc: DoubleDouble, x: f64, y: f64) -> DoubleDouble {
    let (product, product_error) = two_prod(x, y);
    let (hi, sum_error) = two_sum(acc.hi, product);
    DoubleDouble { hi, lo: acc.lo + (sum_error + product_error) }
}

/// Model of `compensated_dot_product_efmuladd_unroll<unroll>`.
pub fn compensated_dot(unroll: usize, width: usize, a: &[f64], b: &[f64]) -> DoubleDouble {
    debug_assert_eq!(a.len(), b.len());

    let step = unroll * width;
    let mut acc = vec![vec![DoubleDouble::ZERO; width]; unroll];
    let mut offset = 0;
    while a.len() - offset >= step {
        for (u, lanes) in acc.iter_mut().enumerate() {
            for (lane, sum) in lanes.iter_mut().enumerate() {
                let i = offset + u * width + lane;
                *sum = compensated_step(*sum, a[i], b[i]);
            }
        }
        offset += step;
    }

    let mut vsum = fold_pairwise(&mut acc, |x, y| x.iter().zip(y).map(|(p, q)| *p + *q).collect()).unwrap_or_default();
    let mut sum = fold_lanes(&mut vsum, |p, q| *p + *q).unwrap_or(DoubleDouble::ZERO);

    for i in offset..a.len() {
        sum = compensated_step(sum, a[i], b[i]);
    }

    let (hi, lo) = fast_two_sum(sum.hi, sum.lo);
    DoubleDouble { hi, lo }
}

/// Pack a `k x mr` double-double A panel (row `p` holds the `mr` values of
/// reduction step `p`) into the kernel's layout: per step and per register
/// row, `width` high parts followed by `width` low parts.
pub fn pack_a(panel: &[DoubleDouble], mr: usize, width: usize) -> Vec<f64> {
    debug_assert_eq!(panel.len() % mr, 0);
    let mut packed = vec![0.0; 2 * panel.len()];
    for (p, row) in panel.chunks(mr).enumerate() {
        for (m, value) in row.iter().enumerate() {
            let base = 2 * p * mr + (m / width) * 2 * width + m % width;
            packed[base] = value.hi;
            packed[base + width] = value.lo;
        }
    }
    packed
}

/// Model of `ddgemm_<mr>x<nr>`: `c += A * B` over `k` reduction steps.
///
/// `a` is packed by [`pack_a`], `b` holds `nr` values per step and `c` is the
/// column-major `mr x nr` tile (`c[n * mr + m]`).
pub fn ddgemm(mr: usize, nr: usize, width: usize, k: usize, a: &[f64], b: &[DoubleDouble], c: &mut [DoubleDouble]) {
    debug_assert_eq!(mr % width, 0);
    debug_assert!(a.len() >= 2 * k * mr && b.len() >= k * nr && c.len() >= mr * nr);

    let mut acc = vec![DoubleDouble::ZERO; mr * nr];
    for p in 0..k {
        let a_step = &a[2 * p * mr..2 * (p + 1) * mr];
        for n in 0..nr {
            let vb = b[p * nr + n];
            for m in 0..mr {
                let base = (m / width) * 2 * width + m % width;
                let va = DoubleDouble::new(a_step[base], a_step[base + width]);
                acc[n * mr + m] = acc[n * mr + m] + va * vb;
            }
        }
    }

    for (out, sum) in c.iter_mut().zip(acc) {
        *out = *out + sum;
    }
}
