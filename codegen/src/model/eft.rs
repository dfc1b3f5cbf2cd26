//! Error-free transformations and double-double arithmetic.

use std::ops::{Add, Mul};

/// `(s, e)` with `s = fl(a + b)` and `s + e == a + b` exactly (Knuth's two-sum).
pub fn two_sum(a: f64, b: f64) -> (f64, f64) {
    let s = a + b;
    let b_virtual = s - a;
    let a_virtual = s - b_virtual;
    (s, (a - a_virtual) + (b - b_virtual))
}

/// Two-sum for `|a| >= |b|` (or `a == 0`), three operations instead of six.
pub fn fast_two_sum(a: f64, b: f64) -> (f64, f64) {
    let s = a + b;
    (s, b - (s - a))
}

/// `(p, e)` with `p = fl(a * b)` and `p + e == a * b` exactly (barring underflow).
pub fn two_prod(a: f64, b: f64) -> (f64, f64) {
    let p = a * b;
    (p, a.mul_add(b, -p))
}

/// Unevaluated sum `hi + lo` of two doubles.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DoubleDouble {
    pub hi: f64,
    pub lo: f64,
}

impl DoubleDouble {
    pub const ZERO: Self = Self { hi: 0.0, lo: 0.0 };

    pub const fn new(hi: f64, lo: f64) -> Self {
        Self { hi, lo }
    }

    /// Re-split so that `|lo| <= ulp(hi) / 2`; assumes `|hi| >= |lo|`.
    pub fn renormalize(self) -> Self {
        let (hi, lo) = fast_two_sum(self.hi, self.lo);
        Self { hi, lo }
    }

    pub fn to_f64(self) -> f64 {
        self.hi + self.lo
    }
}

impl From<f64> for DoubleDouble {
    fn from(hi: f64) -> Self {
        Self { hi, lo: 0.0 }
    }
}

/// `ddadd`: two-sum of the high parts, low parts folded in, then renormalized.
impl Add for DoubleDouble {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        let (hi, e) = two_sum(self.hi, rhs.hi);
        Self { hi, lo: e + (self.lo + rhs.lo) }.renormalize()
    }
}

/// `ddmul`: two-product of the high parts plus both cross terms, renormalized.
impl Mul for DoubleDouble {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let (hi, e) = two_prod(self.hi, rhs.hi);
        let lo = self.hi.mul_add(rhs.lo, e);
        let lo = self.lo.mul_add(rhs.hi, lo);
        Self { hi, lo }.renormalize()
    }
}
