//! Double precision with an extended exponent.

use std::{
    cmp::Ordering,
    fmt,
    ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Rem, Sub, SubAssign},
};

use anyhow::bail;
use num::{Num, One, Zero};

use crate::util::float::{frexp, ldexp};

/// Exponents further apart than this make the smaller addend invisible.
const ALIGN_LIMIT: i64 = 64;

/// A binary64 mantissa paired with an `i64` exponent, `mant * 2^exp`.
///
/// The mantissa is kept normalized to `0.5 <= |mant| < 1`, so the value has
/// 53 bits of precision and a range that does not overflow or underflow in
/// practice. Zero is stored as `(0, 0)`, and the non-finite values use the
/// mantissa's own encoding with exponent 0.
#[derive(Clone, Copy, Debug, Default)]
pub struct Dpe {
    mant: f64,
    exp: i64,
}

impl Dpe {
    pub const ZERO: Self = Self { mant: 0.0, exp: 0 };
    pub const ONE: Self = Self { mant: 0.5, exp: 1 };
    pub const INFINITY: Self = Self {
        mant: f64::INFINITY,
        exp: 0,
    };

    /// `mant * 2^exp`, normalized.
    #[must_use]
    pub fn new(mant: f64, exp: i64) -> Self {
        if mant == 0.0 || !mant.is_finite() {
            return Self { mant, exp: 0 };
        }
        let (m, e) = frexp(mant);
        Self {
            mant: m,
            exp: exp.saturating_add(e),
        }
    }

    #[must_use]
    pub fn from_f64(x: f64) -> Self {
        Self::new(x, 0)
    }

    /// `2^l` for a real `l`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_log2(l: f64) -> Self {
        if l.is_nan() {
            return Self::new(f64::NAN, 0);
        }
        if l == f64::INFINITY {
            return Self::INFINITY;
        }
        if l == f64::NEG_INFINITY {
            return Self::ZERO;
        }
        let e = l.floor();
        Self::new((l - e).exp2(), e as i64)
    }

    /// Approximation of `10^k`, good to a few ulps.
    #[must_use]
    pub fn exp10(k: i32) -> Self {
        Self::from_log2(f64::from(k) * std::f64::consts::LOG2_10)
    }

    /// Rounds to the nearest `f64`, saturating to infinity or zero.
    #[must_use]
    pub fn to_f64(self) -> f64 {
        ldexp(self.mant, self.exp)
    }

    #[must_use]
    pub const fn mantissa(self) -> f64 {
        self.mant
    }

    #[must_use]
    pub const fn exponent(self) -> i64 {
        self.exp
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.mant.is_finite()
    }

    #[must_use]
    pub fn abs(self) -> Self {
        Self {
            mant: self.mant.abs(),
            exp: self.exp,
        }
    }

    #[must_use]
    pub fn mul_pow2(self, k: i64) -> Self {
        if self.mant == 0.0 || !self.mant.is_finite() {
            return self;
        }
        Self {
            mant: self.mant,
            exp: self.exp.saturating_add(k),
        }
    }

    /// `log2 |self|`, `-inf` for zero.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn log2_abs(self) -> f64 {
        if self.mant == 0.0 {
            return f64::NEG_INFINITY;
        }
        self.mant.abs().log2() + self.exp as f64
    }

    /// Square root, NaN for negative values.
    #[must_use]
    pub fn sqrt(self) -> Self {
        if self.mant == 0.0 || !self.mant.is_finite() {
            return Self::new(self.mant.sqrt(), 0);
        }
        if self.exp % 2 == 0 {
            Self::new(self.mant.sqrt(), self.exp / 2)
        } else {
            Self::new((self.mant * 2.0).sqrt(), (self.exp - 1) / 2)
        }
    }

    #[must_use]
    pub fn max(self, other: Self) -> Self {
        if other > self {
            other
        } else {
            self
        }
    }

    #[must_use]
    pub fn min(self, other: Self) -> Self {
        if other < self {
            other
        } else {
            self
        }
    }

    /// Rounds towards zero to an integer value.
    #[must_use]
    pub fn trunc(self) -> Self {
        if !self.mant.is_finite() || self.exp >= 53 {
            return self;
        }
        if self.exp <= 0 {
            return Self::ZERO;
        }
        Self::from_f64(ldexp(self.mant, self.exp).trunc())
    }
}

impl PartialEq for Dpe {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Dpe {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if !self.mant.is_finite() || !other.mant.is_finite() {
            return self.mant.partial_cmp(&other.mant);
        }
        let sign = |x: f64| {
            if x > 0.0 {
                1
            } else if x < 0.0 {
                -1
            } else {
                0
            }
        };
        let (sa, sb) = (sign(self.mant), sign(other.mant));
        if sa != sb || sa == 0 {
            return Some(sa.cmp(&sb));
        }
        let by_magnitude = self
            .exp
            .cmp(&other.exp)
            .then(self.mant.abs().total_cmp(&other.mant.abs()));
        Some(if sa > 0 {
            by_magnitude
        } else {
            by_magnitude.reverse()
        })
    }
}

impl Add for Dpe {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        if !self.mant.is_finite() || !rhs.mant.is_finite() {
            return Self::new(self.mant + rhs.mant, 0);
        }
        if self.mant == 0.0 {
            return rhs;
        }
        if rhs.mant == 0.0 {
            return self;
        }
        let d = self.exp.saturating_sub(rhs.exp);
        if d > ALIGN_LIMIT {
            self
        } else if d < -ALIGN_LIMIT {
            rhs
        } else if d >= 0 {
            Self::new(self.mant + ldexp(rhs.mant, -d), self.exp)
        } else {
            Self::new(ldexp(self.mant, d) + rhs.mant, rhs.exp)
        }
    }
}

impl Sub for Dpe {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        self + (-rhs)
    }
}

impl Mul for Dpe {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Self::new(self.mant * rhs.mant, self.exp.saturating_add(rhs.exp))
    }
}

impl Div for Dpe {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        Self::new(self.mant / rhs.mant, self.exp.saturating_sub(rhs.exp))
    }
}

impl Rem for Dpe {
    type Output = Self;

    fn rem(self, rhs: Self) -> Self::Output {
        self - (self / rhs).trunc() * rhs
    }
}

impl Neg for Dpe {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self {
            mant: -self.mant,
            exp: self.exp,
        }
    }
}

impl AddAssign for Dpe {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Dpe {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl MulAssign for Dpe {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl DivAssign for Dpe {
    fn div_assign(&mut self, rhs: Self) {
        *self = *self / rhs;
    }
}

impl Zero for Dpe {
    fn zero() -> Self {
        Self::ZERO
    }

    fn is_zero(&self) -> bool {
        self.mant == 0.0
    }
}

impl One for Dpe {
    fn one() -> Self {
        Self::ONE
    }
}

impl Num for Dpe {
    type FromStrRadixErr = anyhow::Error;

    fn from_str_radix(str: &str, radix: u32) -> Result<Self, Self::FromStrRadixErr> {
        if radix != 10 {
            bail!("only decimal strings are supported");
        }
        Ok(Self::from_f64(str.trim().parse::<f64>()?))
    }
}

impl From<f64> for Dpe {
    fn from(x: f64) -> Self {
        Self::from_f64(x)
    }
}

impl fmt::Display for Dpe {
    #[allow(clippy::cast_possible_truncation)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.mant.is_finite() || self.mant == 0.0 || (-1000..1000).contains(&self.exp) {
            return match f.precision() {
                Some(p) => write!(f, "{:.*e}", p, self.to_f64()),
                None => write!(f, "{:e}", self.to_f64()),
            };
        }
        let log10 = self.log2_abs() * std::f64::consts::LOG10_2;
        let k = log10.floor();
        let m = 10f64.powf(log10 - k).copysign(self.mant);
        match f.precision() {
            Some(p) => write!(f, "{:.*}e{}", p, m, k as i64),
            None => write!(f, "{}e{}", m, k as i64),
        }
    }
}

#[cfg(test)]
mod test {
    use num::{One, Zero};

    use super::Dpe;

    #[test]
    fn normalized() {
        let x = Dpe::from_f64(6.0);
        assert_eq!(x.mantissa(), 0.75);
        assert_eq!(x.exponent(), 3);
        assert_eq!(x.to_f64(), 6.0);
        assert_eq!(Dpe::one().to_f64(), 1.0);
    }

    #[test]
    fn range_beyond_f64() {
        let big = Dpe::from_f64(1e300) * Dpe::from_f64(1e300);
        assert!(big.is_finite());
        assert_eq!(big.to_f64(), f64::INFINITY);
        let back = big / Dpe::from_f64(1e300);
        assert!((back.to_f64() - 1e300).abs() <= 1e285);

        let tiny = Dpe::from_f64(1e-300) * Dpe::from_f64(1e-300);
        assert!(!tiny.is_zero());
        assert!(tiny > Dpe::zero());
        assert!(tiny < Dpe::from_f64(f64::MIN_POSITIVE));
    }

    #[test]
    fn arithmetic() {
        let a = Dpe::from_f64(1.5);
        let b = Dpe::from_f64(-0.25);
        assert_eq!((a + b).to_f64(), 1.25);
        assert_eq!((a - b).to_f64(), 1.75);
        assert_eq!((a * b).to_f64(), -0.375);
        assert_eq!((a / b).to_f64(), -6.0);
        assert_eq!((-a).to_f64(), -1.5);
        assert_eq!((Dpe::from_f64(7.0) % Dpe::from_f64(2.0)).to_f64(), 1.0);
    }

    #[test]
    fn negligible_addend() {
        let a = Dpe::from_f64(1.0);
        let b = Dpe::from_f64(1.0).mul_pow2(-200);
        assert_eq!(a + b, a);
        assert_eq!(b + a, a);
    }

    #[test]
    fn ordering() {
        let xs = [-4.0, -0.5, 0.0, 1e-320, 0.5, 3.0];
        for w in xs.windows(2) {
            assert!(Dpe::from_f64(w[0]) < Dpe::from_f64(w[1]), "{w:?}");
        }
        assert!(Dpe::INFINITY > Dpe::from_f64(1e308).mul_pow2(1 << 40));
        assert_eq!(Dpe::from_f64(2.0), Dpe::from_f64(1.0).mul_pow2(1));
    }

    #[test]
    fn sqrt_and_log() {
        assert_eq!(Dpe::from_f64(16.0).sqrt().to_f64(), 4.0);
        assert_eq!(Dpe::from_f64(8.0).sqrt().to_f64(), 8f64.sqrt());
        let x = Dpe::from_f64(1.0).mul_pow2(-3001);
        assert!((x.sqrt().log2_abs() + 1500.5).abs() < 1e-9);
        assert!((Dpe::exp10(-50).log2_abs() + 50.0 * std::f64::consts::LOG2_10).abs() < 1e-9);
        assert_eq!(Dpe::zero().log2_abs(), f64::NEG_INFINITY);
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", Dpe::from_f64(2.5)), "2.5e0");
        let x = Dpe::exp10(-4000) * Dpe::from_f64(3.0);
        assert_eq!(format!("{x:.3}"), "3.000e-4000");
    }
}
