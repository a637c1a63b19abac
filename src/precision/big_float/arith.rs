use num::{
    bigint::{BigUint, Sign},
    BigInt, One, Zero,
};

use super::{BigFloat, EXACT_FALLBACK_BITS};

fn bit_len(x: &BigInt) -> i64 {
    i64::try_from(x.bits()).unwrap_or(i64::MAX)
}

fn shift_of(n: i64) -> usize {
    usize::try_from(n.max(0)).unwrap_or(usize::MAX)
}

/// Rounds `mant * 2^exp` to `prec` bits, to nearest with ties away from zero.
pub(super) fn round(mant: BigInt, exp: i64, prec: u32) -> BigFloat {
    if mant.is_zero() {
        return BigFloat {
            mant,
            exp: 0,
            prec,
        };
    }
    let bits = mant.bits();
    if prec == 0 || bits <= u64::from(prec) {
        return BigFloat { mant, exp, prec };
    }
    let shift = bits - u64::from(prec);
    let (sign, mag) = mant.into_parts();
    let half = BigUint::one() << shift_of(i64::try_from(shift - 1).unwrap_or(i64::MAX));
    let mut q: BigUint = (mag + half) >> shift_of(i64::try_from(shift).unwrap_or(i64::MAX));
    let mut exp = exp.saturating_add(i64::try_from(shift).unwrap_or(i64::MAX));
    if q.bits() > u64::from(prec) {
        // carry rippled into a new bit, the dropped bit is zero
        q >>= 1usize;
        exp = exp.saturating_add(1);
    }
    BigFloat {
        mant: BigInt::from_biguint(sign, q),
        exp,
        prec,
    }
}

pub(super) fn add(a: &BigFloat, b: &BigFloat) -> BigFloat {
    let prec = a.prec.max(b.prec);
    if a.mant.is_zero() {
        return round(b.mant.clone(), b.exp, prec);
    }
    if b.mant.is_zero() {
        return round(a.mant.clone(), a.exp, prec);
    }
    if prec > 0 {
        // an addend entirely below half an ulp of the other leaves it unchanged
        let top_a = a.exp.saturating_add(bit_len(&a.mant));
        let top_b = b.exp.saturating_add(bit_len(&b.mant));
        let gap = i64::from(prec) + 2;
        if top_a.saturating_sub(top_b) > gap {
            return round(a.mant.clone(), a.exp, prec);
        }
        if top_b.saturating_sub(top_a) > gap {
            return round(b.mant.clone(), b.exp, prec);
        }
    }
    let exp = a.exp.min(b.exp);
    let ma = &a.mant << shift_of(a.exp - exp);
    let mb = &b.mant << shift_of(b.exp - exp);
    round(ma + mb, exp, prec)
}

pub(super) fn mul(a: &BigFloat, b: &BigFloat) -> BigFloat {
    let prec = a.prec.max(b.prec);
    round(&a.mant * &b.mant, a.exp.saturating_add(b.exp), prec)
}

/// Magnitude quotient with a sticky bit appended, so that the final
/// rounding sees whether the discarded remainder was zero.
fn sticky(q: BigUint, inexact: bool) -> BigUint {
    let q = q << 1usize;
    if inexact {
        q + BigUint::one()
    } else {
        q
    }
}

pub(super) fn div(a: &BigFloat, b: &BigFloat) -> BigFloat {
    assert!(!b.mant.is_zero(), "attempted to divide by zero");
    let prec = a.prec.max(b.prec);
    if a.mant.is_zero() {
        return BigFloat {
            mant: BigInt::zero(),
            exp: 0,
            prec,
        };
    }
    let target = if prec == 0 { EXACT_FALLBACK_BITS } else { prec };
    let shift = (i64::from(target) + 2 + bit_len(&b.mant) - bit_len(&a.mant)).max(0);
    let num = a.mant.magnitude() << shift_of(shift);
    let den = b.mant.magnitude();
    let q = &num / den;
    let inexact = !(&num % den).is_zero();
    let sign = if a.mant.sign() == b.mant.sign() {
        Sign::Plus
    } else {
        Sign::Minus
    };
    round(
        BigInt::from_biguint(sign, sticky(q, inexact)),
        a.exp.saturating_sub(b.exp).saturating_sub(shift).saturating_sub(1),
        target,
    )
}

pub(super) fn sqrt(x: &BigFloat) -> BigFloat {
    if x.mant.sign() != Sign::Plus {
        return BigFloat {
            mant: BigInt::zero(),
            exp: 0,
            prec: x.prec,
        };
    }
    let target = if x.prec == 0 {
        EXACT_FALLBACK_BITS
    } else {
        x.prec
    };
    let mut shift = (2 * i64::from(target) + 4 - bit_len(&x.mant)).max(0);
    if (x.exp - shift).rem_euclid(2) != 0 {
        shift += 1;
    }
    let m = x.mant.magnitude() << shift_of(shift);
    let r = m.sqrt();
    let inexact = &r * &r != m;
    round(
        BigInt::from_biguint(Sign::Plus, sticky(r, inexact)),
        (x.exp - shift) / 2 - 1,
        target,
    )
}

pub(super) fn trunc(x: &BigFloat) -> BigFloat {
    if x.exp >= 0 || x.mant.is_zero() {
        return x.clone();
    }
    let drop = x.exp.unsigned_abs();
    if drop >= x.mant.bits() {
        return BigFloat {
            mant: BigInt::zero(),
            exp: 0,
            prec: x.prec,
        };
    }
    let mag = x.mant.magnitude() >> shift_of(i64::try_from(drop).unwrap_or(i64::MAX));
    BigFloat {
        mant: BigInt::from_biguint(x.mant.sign(), mag),
        exp: 0,
        prec: x.prec,
    }
}

#[cfg(test)]
mod test {
    use num::{BigInt, One};

    use super::round;

    #[test]
    fn round_half_away() {
        // 0b1011 at 3 bits: 0b110 * 2
        let r = round(BigInt::from(11), 0, 3);
        assert_eq!(r.mant, BigInt::from(6));
        assert_eq!(r.exp, 1);
        // 0b1001 at 3 bits: 0b101 * 2 (tie rounds up in magnitude)
        let r = round(BigInt::from(-9), 0, 3);
        assert_eq!(r.mant, BigInt::from(-5));
        assert_eq!(r.exp, 1);
    }

    #[test]
    fn round_carry() {
        // 0b1111 at 3 bits rounds to 0b1000 * 2, renormalized to 0b100 * 4
        let r = round(BigInt::from(15), 0, 3);
        assert_eq!(r.mant, BigInt::from(4));
        assert_eq!(r.exp, 2);
    }

    #[test]
    fn exact_is_untouched() {
        let m = BigInt::one() << 300usize;
        let r = round(m.clone(), -5, 0);
        assert_eq!(r.mant, m);
        assert_eq!(r.exp, -5);
    }
}
