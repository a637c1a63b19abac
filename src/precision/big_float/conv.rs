use num::{BigInt, Float, ToPrimitive, Zero};

use super::{arith, BigFloat};
use crate::{precision::Dpe, util::float::ldexp};

/// Public
impl BigFloat {
    /// Exact conversion. Non-finite values become zero.
    #[must_use]
    pub fn from_f64(x: f64) -> Self {
        if x == 0.0 || !x.is_finite() {
            return Self::zero();
        }
        let (m, e, s) = Float::integer_decode(x);
        let mant = if s < 0 {
            -BigInt::from(m)
        } else {
            BigInt::from(m)
        };
        Self::exact(mant, i64::from(e))
    }

    /// Exact conversion. Non-finite values become zero.
    #[must_use]
    pub fn from_dpe(x: Dpe) -> Self {
        Self::from_f64(x.mantissa()).mul_pow2(x.exponent())
    }

    /// Rounds to the nearest `f64`, saturating to infinity or zero.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        let (m, e) = self.top_bits();
        ldexp(m, e)
    }

    /// Rounds to the nearest [`Dpe`].
    #[must_use]
    pub fn to_dpe(&self) -> Dpe {
        let (m, e) = self.top_bits();
        Dpe::new(m, e)
    }

    /// `log2 |self|`, `-inf` for zero.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn log2_abs(&self) -> f64 {
        let (m, e) = self.top_bits();
        if m == 0.0 {
            return f64::NEG_INFINITY;
        }
        m.abs().log2() + e as f64
    }

    /// The value rounded to 53 bits, split as an exactly representable
    /// `f64` and a binary exponent.
    fn top_bits(&self) -> (f64, i64) {
        if self.mant.is_zero() {
            return (0.0, 0);
        }
        let r = arith::round(self.mant.clone(), self.exp, 53);
        // at most 53 bits, so the conversion is exact
        let m = r.mant.to_f64().unwrap_or(0.0);
        (m, r.exp)
    }
}
