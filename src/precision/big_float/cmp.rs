use std::cmp::Ordering;

use num::bigint::Sign;

use super::BigFloat;

const fn sign_rank(s: Sign) -> i8 {
    match s {
        Sign::Minus => -1,
        Sign::NoSign => 0,
        Sign::Plus => 1,
    }
}

fn cmp_magnitude(a: &BigFloat, b: &BigFloat) -> Ordering {
    let top_a = a.exp.saturating_add(i64::try_from(a.mant.bits()).unwrap_or(i64::MAX));
    let top_b = b.exp.saturating_add(i64::try_from(b.mant.bits()).unwrap_or(i64::MAX));
    if top_a != top_b {
        return top_a.cmp(&top_b);
    }
    // same leading bit position, align on the smaller exponent
    let exp = a.exp.min(b.exp);
    let shift = |e: i64| usize::try_from(e - exp).unwrap_or(usize::MAX);
    let ma = a.mant.magnitude() << shift(a.exp);
    let mb = b.mant.magnitude() << shift(b.exp);
    ma.cmp(&mb)
}

pub(super) fn cmp(a: &BigFloat, b: &BigFloat) -> Ordering {
    let ra = sign_rank(a.mant.sign());
    let rb = sign_rank(b.mant.sign());
    if ra != rb || ra == 0 {
        return ra.cmp(&rb);
    }
    let by_magnitude = cmp_magnitude(a, b);
    if ra > 0 {
        by_magnitude
    } else {
        by_magnitude.reverse()
    }
}
