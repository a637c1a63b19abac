//! Number representations the engine can iterate in, and the order in which
//! it moves between them.
//!
//! Every tier implements [`RealScalar`], and the engine is generic over it,
//! so one instantiation never mixes representations. Moving to a wider tier
//! goes through [`Widen`], which is lossless.

use std::{fmt, ops::Neg};

use num::{Complex, Num};

mod big_float;
mod dpe;

pub use big_float::{BigFloat, EXACT_FALLBACK_BITS};
pub use dpe::Dpe;

/// Precision of the first arbitrary precision level.
pub const FIRST_ARBITRARY_BITS: u32 = 128;

/// Smallest accepted maximum precision.
pub const MIN_MAX_BITS: u32 = 64;

/// Numeric representation family, ordered by cost.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    /// IEEE binary64.
    Standard,
    /// Binary64 mantissa with a wide exponent, see [`Dpe`].
    Extended,
    /// Software floating point with a caller-chosen mantissa, see [`BigFloat`].
    Arbitrary,
}

/// A tier together with its working precision in bits.
///
/// Levels are totally ordered, first by tier then by bits, and the levels
/// visited by a solve never decrease.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PrecisionLevel {
    tier: Tier,
    bits: u32,
}

impl PrecisionLevel {
    pub const STANDARD: Self = Self {
        tier: Tier::Standard,
        bits: 53,
    };
    pub const EXTENDED: Self = Self {
        tier: Tier::Extended,
        bits: 53,
    };

    #[must_use]
    pub const fn arbitrary(bits: u32) -> Self {
        Self {
            tier: Tier::Arbitrary,
            bits,
        }
    }

    #[must_use]
    pub const fn tier(self) -> Tier {
        self.tier
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.bits
    }

    /// `u = 2^-bits`.
    #[must_use]
    pub fn unit_roundoff(self) -> Dpe {
        Dpe::ONE.mul_pow2(-i64::from(self.bits))
    }

    /// The level a solve starting in `tier` begins at.
    pub(crate) fn first(tier: Tier, max_bits: u32) -> Self {
        match tier {
            Tier::Standard => Self::STANDARD,
            Tier::Extended => Self::EXTENDED,
            Tier::Arbitrary => Self::arbitrary(FIRST_ARBITRARY_BITS.min(max_bits)),
        }
    }

    /// The level after this one, `None` once `max_bits` is reached.
    ///
    /// Standard only steps to Extended when the last cycle overflowed, since
    /// Extended adds range but no digits.
    pub(crate) fn next(self, overflow: bool, max_bits: u32) -> Option<Self> {
        match self.tier {
            Tier::Standard if overflow => Some(Self::EXTENDED),
            Tier::Standard | Tier::Extended => {
                Some(Self::arbitrary(FIRST_ARBITRARY_BITS.min(max_bits)))
            }
            Tier::Arbitrary if self.bits >= max_bits => None,
            Tier::Arbitrary => Some(Self::arbitrary(
                self.bits.saturating_mul(2).min(max_bits),
            )),
        }
    }
}

impl fmt::Display for PrecisionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.tier {
            Tier::Standard => "standard",
            Tier::Extended => "extended",
            Tier::Arbitrary => "arbitrary",
        };
        write!(f, "{name} ({} bits)", self.bits)
    }
}

/// Real arithmetic of one precision tier.
///
/// The ring operations come from [`Num`]; everything else the engine needs
/// is here. Conversions to [`Dpe`] and `f64` round to nearest; conversion to
/// [`BigFloat`] is exact.
pub trait RealScalar:
    Num + Clone + PartialOrd + Neg<Output = Self> + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    const TIER: Tier;

    /// Converts a binary64 value. Exact in every tier.
    fn from_f64_at(x: f64, bits: u32) -> Self;

    /// Converts a [`Dpe`]. In the standard tier this may overflow to
    /// infinity or underflow to zero, callers check.
    fn from_dpe_at(x: Dpe, bits: u32) -> Self;

    fn to_f64(&self) -> f64;
    fn to_dpe(&self) -> Dpe;
    fn to_big(&self) -> BigFloat;

    fn abs(&self) -> Self;
    fn sqrt(&self) -> Self;
    fn mul_pow2(&self, k: i64) -> Self;
    fn log2_abs(&self) -> f64;
    fn is_finite(&self) -> bool;

    /// `2^-bits` in this representation.
    fn unit_roundoff(bits: u32) -> Self {
        Self::one().mul_pow2(-i64::from(bits))
    }

    #[allow(clippy::cast_precision_loss)]
    fn from_usize_at(n: usize, bits: u32) -> Self {
        Self::from_f64_at(n as f64, bits)
    }
}

impl RealScalar for f64 {
    const TIER: Tier = Tier::Standard;

    fn from_f64_at(x: f64, _bits: u32) -> Self {
        x
    }

    fn from_dpe_at(x: Dpe, _bits: u32) -> Self {
        x.to_f64()
    }

    fn to_f64(&self) -> f64 {
        *self
    }

    fn to_dpe(&self) -> Dpe {
        Dpe::from_f64(*self)
    }

    fn to_big(&self) -> BigFloat {
        BigFloat::from_f64(*self).with_precision(53)
    }

    fn abs(&self) -> Self {
        f64::abs(*self)
    }

    fn sqrt(&self) -> Self {
        f64::sqrt(*self)
    }

    fn mul_pow2(&self, k: i64) -> Self {
        crate::util::float::ldexp(*self, k)
    }

    fn log2_abs(&self) -> f64 {
        f64::abs(*self).log2()
    }

    fn is_finite(&self) -> bool {
        f64::is_finite(*self)
    }
}

impl RealScalar for Dpe {
    const TIER: Tier = Tier::Extended;

    fn from_f64_at(x: f64, _bits: u32) -> Self {
        Self::from_f64(x)
    }

    fn from_dpe_at(x: Dpe, _bits: u32) -> Self {
        x
    }

    fn to_f64(&self) -> f64 {
        Self::to_f64(*self)
    }

    fn to_dpe(&self) -> Dpe {
        *self
    }

    fn to_big(&self) -> BigFloat {
        BigFloat::from_dpe(*self).with_precision(53)
    }

    fn abs(&self) -> Self {
        Self::abs(*self)
    }

    fn sqrt(&self) -> Self {
        Self::sqrt(*self)
    }

    fn mul_pow2(&self, k: i64) -> Self {
        Self::mul_pow2(*self, k)
    }

    fn log2_abs(&self) -> f64 {
        Self::log2_abs(*self)
    }

    fn is_finite(&self) -> bool {
        Self::is_finite(*self)
    }
}

impl RealScalar for BigFloat {
    const TIER: Tier = Tier::Arbitrary;

    fn from_f64_at(x: f64, bits: u32) -> Self {
        Self::from_f64(x).with_precision(bits)
    }

    fn from_dpe_at(x: Dpe, bits: u32) -> Self {
        Self::from_dpe(x).with_precision(bits)
    }

    fn to_f64(&self) -> f64 {
        Self::to_f64(self)
    }

    fn to_dpe(&self) -> Dpe {
        Self::to_dpe(self)
    }

    fn to_big(&self) -> BigFloat {
        self.clone()
    }

    fn abs(&self) -> Self {
        Self::abs(self)
    }

    fn sqrt(&self) -> Self {
        Self::sqrt(self)
    }

    fn mul_pow2(&self, k: i64) -> Self {
        Self::mul_pow2(self, k)
    }

    fn log2_abs(&self) -> f64 {
        Self::log2_abs(self)
    }

    fn is_finite(&self) -> bool {
        true
    }
}

/// Lossless promotion into a representation at least as wide.
pub trait Widen<T> {
    fn widen(&self, bits: u32) -> T;
}

impl Widen<f64> for f64 {
    fn widen(&self, _bits: u32) -> f64 {
        *self
    }
}

impl Widen<Dpe> for f64 {
    fn widen(&self, _bits: u32) -> Dpe {
        Dpe::from_f64(*self)
    }
}

impl Widen<Dpe> for Dpe {
    fn widen(&self, _bits: u32) -> Dpe {
        *self
    }
}

impl Widen<BigFloat> for f64 {
    fn widen(&self, bits: u32) -> BigFloat {
        BigFloat::from_f64(*self).with_precision(bits)
    }
}

impl Widen<BigFloat> for Dpe {
    fn widen(&self, bits: u32) -> BigFloat {
        BigFloat::from_dpe(*self).with_precision(bits)
    }
}

impl Widen<BigFloat> for BigFloat {
    fn widen(&self, bits: u32) -> BigFloat {
        debug_assert!(bits >= self.precision(), "narrowing is not a widen");
        self.with_precision(bits)
    }
}

pub(crate) fn widen_complex<A: Widen<B>, B>(z: &Complex<A>, bits: u32) -> Complex<B> {
    Complex::new(z.re.widen(bits), z.im.widen(bits))
}

/// Narrows a non-negative bound to [`Dpe`], rounding up.
pub(crate) fn bound_to_dpe<R: RealScalar>(x: &R) -> Dpe {
    let d = x.to_dpe();
    if !d.is_finite() {
        return Dpe::INFINITY;
    }
    // conversion is to nearest, one relative ulp covers it
    d.abs() * (Dpe::ONE + Dpe::ONE.mul_pow2(-51))
}

#[cfg(test)]
mod test {
    use num::One;

    use super::{BigFloat, Dpe, PrecisionLevel, RealScalar, Tier, Widen};

    #[test]
    fn level_sequence() {
        let max = 512;
        let s = PrecisionLevel::STANDARD;
        assert_eq!(s.next(true, max), Some(PrecisionLevel::EXTENDED));
        assert_eq!(s.next(false, max), Some(PrecisionLevel::arbitrary(128)));
        assert_eq!(
            PrecisionLevel::EXTENDED.next(false, max),
            Some(PrecisionLevel::arbitrary(128))
        );
        assert_eq!(
            PrecisionLevel::arbitrary(128).next(false, max),
            Some(PrecisionLevel::arbitrary(256))
        );
        assert_eq!(
            PrecisionLevel::arbitrary(384).next(false, max),
            Some(PrecisionLevel::arbitrary(512))
        );
        assert_eq!(PrecisionLevel::arbitrary(512).next(false, max), None);
        assert_eq!(
            PrecisionLevel::STANDARD.next(false, 64),
            Some(PrecisionLevel::arbitrary(64))
        );
    }

    #[test]
    fn levels_are_ordered() {
        assert!(PrecisionLevel::STANDARD < PrecisionLevel::EXTENDED);
        assert!(PrecisionLevel::EXTENDED < PrecisionLevel::arbitrary(64));
        assert!(PrecisionLevel::arbitrary(128) < PrecisionLevel::arbitrary(256));
        assert!(Tier::Standard < Tier::Arbitrary);
    }

    #[test]
    fn unit_roundoff() {
        assert_eq!(PrecisionLevel::STANDARD.unit_roundoff().to_f64(), 2f64.powi(-53));
        assert_eq!(<f64 as RealScalar>::unit_roundoff(53), 2f64.powi(-53));
        assert_eq!(
            BigFloat::unit_roundoff(200),
            BigFloat::one().mul_pow2(-200)
        );
    }

    #[test]
    fn widening_is_lossless() {
        let x = 0.1f64;
        let d: Dpe = x.widen(53);
        let b: BigFloat = d.widen(128);
        assert_eq!(b.to_f64(), x);
        let wider: BigFloat = b.widen(256);
        assert_eq!(wider, b);
        assert_eq!(wider.precision(), 256);
    }

    #[test]
    fn bounds_round_up() {
        let third = BigFloat::one().with_precision(128) / BigFloat::from_f64(3.0);
        let bound = super::bound_to_dpe(&third);
        assert!(BigFloat::from_dpe(bound) >= third);
        assert_eq!(super::bound_to_dpe(&f64::INFINITY), Dpe::INFINITY);
    }

    #[test]
    fn display() {
        assert_eq!(PrecisionLevel::arbitrary(256).to_string(), "arbitrary (256 bits)");
    }
}
