//! Arbitrary precision binary floating point.

use std::{
    cmp::Ordering,
    fmt,
    ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Rem, Sub, SubAssign},
};

use anyhow::bail;
use num::{BigInt, Num, One, Zero};

use crate::util::doc_macros::panic_division_by_zero;

mod arith;
mod cmp;
mod conv;

/// Bits used for quotients and square roots of two exact operands.
pub const EXACT_FALLBACK_BITS: u32 = 64;

/// `mant * 2^exp`, rounded to `prec` bits.
///
/// A precision of 0 marks an exact value, such as a constant or an input
/// coefficient. Operations round their result to the larger of their
/// operands' precisions, to nearest, so the relative error of every
/// operation is at most `2^-prec`. Exact operands stay exact under
/// addition and multiplication; division and square root of exact operands
/// round to [`EXACT_FALLBACK_BITS`].
#[derive(Clone, Debug, Default)]
pub struct BigFloat {
    mant: BigInt,
    exp: i64,
    prec: u32,
}

/// Private
impl BigFloat {
    fn from_parts(mant: BigInt, exp: i64, prec: u32) -> Self {
        arith::round(mant, exp, prec)
    }
}

/// Public
impl BigFloat {
    /// Exact `mant * 2^exp`.
    #[must_use]
    pub fn exact(mant: BigInt, exp: i64) -> Self {
        Self { mant, exp, prec: 0 }
    }

    #[must_use]
    pub const fn mantissa(&self) -> &BigInt {
        &self.mant
    }

    #[must_use]
    pub const fn exponent(&self) -> i64 {
        self.exp
    }

    /// Working precision in bits, 0 for exact values.
    #[must_use]
    pub const fn precision(&self) -> u32 {
        self.prec
    }

    /// Re-rounds to `bits`. Widening never changes the value.
    #[must_use]
    pub fn with_precision(&self, bits: u32) -> Self {
        Self::from_parts(self.mant.clone(), self.exp, bits)
    }

    #[must_use]
    pub fn abs(&self) -> Self {
        Self {
            mant: self.mant.magnitude().clone().into(),
            exp: self.exp,
            prec: self.prec,
        }
    }

    #[must_use]
    pub fn mul_pow2(&self, k: i64) -> Self {
        Self {
            mant: self.mant.clone(),
            exp: self.exp.saturating_add(k),
            prec: self.prec,
        }
    }

    /// Square root, rounded to nearest. Negative values give zero.
    #[must_use]
    pub fn sqrt(&self) -> Self {
        arith::sqrt(self)
    }

    /// Rounds towards zero to an integer value.
    #[must_use]
    pub fn trunc(&self) -> Self {
        arith::trunc(self)
    }

    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.mant.sign() == num::bigint::Sign::Minus
    }
}

impl Add for BigFloat {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        arith::add(&self, &rhs)
    }
}

impl<'a> Add<&'a BigFloat> for &'a BigFloat {
    type Output = BigFloat;

    fn add(self, rhs: &'a BigFloat) -> Self::Output {
        arith::add(self, rhs)
    }
}

impl AddAssign for BigFloat {
    fn add_assign(&mut self, rhs: Self) {
        *self = arith::add(self, &rhs);
    }
}

impl Sub for BigFloat {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        arith::add(&self, &-rhs)
    }
}

impl<'a> Sub<&'a BigFloat> for &'a BigFloat {
    type Output = BigFloat;

    fn sub(self, rhs: &'a BigFloat) -> Self::Output {
        arith::add(self, &-rhs.clone())
    }
}

impl SubAssign for BigFloat {
    fn sub_assign(&mut self, rhs: Self) {
        *self = arith::add(self, &-rhs);
    }
}

impl Mul for BigFloat {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        arith::mul(&self, &rhs)
    }
}

impl<'a> Mul<&'a BigFloat> for &'a BigFloat {
    type Output = BigFloat;

    fn mul(self, rhs: &'a BigFloat) -> Self::Output {
        arith::mul(self, rhs)
    }
}

impl MulAssign for BigFloat {
    fn mul_assign(&mut self, rhs: Self) {
        *self = arith::mul(self, &rhs);
    }
}

impl Div for BigFloat {
    type Output = Self;

    /// # Panics
    #[doc = panic_division_by_zero!()]
    fn div(self, rhs: Self) -> Self::Output {
        arith::div(&self, &rhs)
    }
}

impl DivAssign for BigFloat {
    fn div_assign(&mut self, rhs: Self) {
        *self = arith::div(self, &rhs);
    }
}

impl Rem for BigFloat {
    type Output = Self;

    fn rem(self, rhs: Self) -> Self::Output {
        let q = arith::div(&self, &rhs).trunc();
        arith::add(&self, &-arith::mul(&q, &rhs))
    }
}

impl Neg for BigFloat {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self {
            mant: -self.mant,
            exp: self.exp,
            prec: self.prec,
        }
    }
}

impl PartialEq for BigFloat {
    fn eq(&self, other: &Self) -> bool {
        cmp::cmp(self, other) == Ordering::Equal
    }
}

impl PartialOrd for BigFloat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(cmp::cmp(self, other))
    }
}

impl Zero for BigFloat {
    fn zero() -> Self {
        Self::exact(BigInt::zero(), 0)
    }

    fn is_zero(&self) -> bool {
        self.mant.is_zero()
    }
}

impl One for BigFloat {
    fn one() -> Self {
        Self::exact(BigInt::one(), 0)
    }
}

impl Num for BigFloat {
    type FromStrRadixErr = anyhow::Error;

    /// Parses an integer or a finite decimal float. Decimal fractions are
    /// only as accurate as `f64`.
    fn from_str_radix(str: &str, radix: u32) -> Result<Self, Self::FromStrRadixErr> {
        let str = str.trim();
        if let Ok(i) = BigInt::from_str_radix(str, radix) {
            return Ok(Self::exact(i, 0));
        }
        if radix != 10 {
            bail!("only integers can be parsed in radix {radix}");
        }
        let x: f64 = str.parse()?;
        if !x.is_finite() {
            bail!("{str} is not a finite number");
        }
        Ok(Self::from_f64(x))
    }
}

impl fmt::Display for BigFloat {
    /// Renders an approximation with the range of [`super::Dpe`].
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_dpe(), f)
    }
}
