//! Bit-level helpers for `f64` that the standard library does not provide.

const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;

/// Split `x` into a mantissa `m` with `0.5 <= |m| < 1` and an exponent `e`
/// such that `x = m * 2^e`.
///
/// Zero, infinities and NaN are returned unchanged with exponent 0.
pub(crate) fn frexp(x: f64) -> (f64, i64) {
    if x == 0.0 || !x.is_finite() {
        return (x, 0);
    }
    let bits = x.to_bits();
    let raw_exp = i64::try_from((bits >> 52) & 0x7ff).unwrap_or(0);
    if raw_exp == 0 {
        // subnormal
        let (m, e) = frexp(x * TWO_POW_64);
        return (m, e - 64);
    }
    let m = f64::from_bits((bits & !(0x7ff_u64 << 52)) | (1022_u64 << 52));
    (m, raw_exp - 1022)
}

/// Computes `x * 2^e` without intermediate overflow.
///
/// The result saturates to infinity or zero when it does not fit in an `f64`.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn ldexp(x: f64, e: i64) -> f64 {
    if x == 0.0 || !x.is_finite() {
        return x;
    }
    let mut x = x;
    let mut e = e.clamp(-2200, 2200);
    while e > 1000 {
        x *= 2f64.powi(1000);
        e -= 1000;
    }
    while e < -1000 {
        x *= 2f64.powi(-1000);
        e += 1000;
    }
    x * 2f64.powi(e as i32)
}
