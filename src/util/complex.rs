// internal utilities for dealing with Complex annoyances

use num::{Complex, One, Zero};

use crate::precision::{bound_to_dpe, Dpe, RealScalar};

// neg operator for Complex by reference
pub(crate) fn c_neg<T: RealScalar>(x: &Complex<T>) -> Complex<T> {
    Complex::new(-x.re.clone(), -x.im.clone())
}

/// Modulus, rounded like one square root.
pub(crate) fn c_abs<T: RealScalar>(z: &Complex<T>) -> T {
    z.norm_sqr().sqrt()
}

/// `|re| + |im|`, an upper bound of the modulus that needs no square root.
pub(crate) fn c_taxicab<T: RealScalar>(z: &Complex<T>) -> T {
    z.re.abs() + z.im.abs()
}

/// Upper bound of the modulus, as a [`Dpe`].
pub(crate) fn c_abs_bound<T: RealScalar>(z: &Complex<T>) -> Dpe {
    bound_to_dpe(&c_abs(z))
}

pub(crate) fn c_is_finite<T: RealScalar>(z: &Complex<T>) -> bool {
    z.re.is_finite() && z.im.is_finite()
}

pub(crate) fn c_mul_real<T: RealScalar>(z: &Complex<T>, k: &T) -> Complex<T> {
    Complex::new(z.re.clone() * k.clone(), z.im.clone() * k.clone())
}

pub(crate) fn c_from_f64<T: RealScalar>(z: Complex<f64>, bits: u32) -> Complex<T> {
    Complex::new(T::from_f64_at(z.re, bits), T::from_f64_at(z.im, bits))
}

/// `radius * e^(i angle)`.
pub(crate) fn c_from_polar<T: RealScalar>(radius: Dpe, angle: f64, bits: u32) -> Complex<T> {
    let re = radius * Dpe::from_f64(angle.cos());
    let im = radius * Dpe::from_f64(angle.sin());
    Complex::new(T::from_dpe_at(re, bits), T::from_dpe_at(im, bits))
}

/// `1/z`, `None` if `z` is zero.
pub(crate) fn c_recip<T: RealScalar>(z: &Complex<T>) -> Option<Complex<T>> {
    if z.is_zero() {
        return None;
    }
    Some(Complex::<T>::one() / z.clone())
}

/// formatting for Complex, because the implementation is not good enough for me
pub(crate) fn complex_fmt<T: std::fmt::Display + Zero + PartialOrd>(c: &Complex<T>) -> String {
    let r = &c.re;
    let i = &c.im;
    if i.is_zero() {
        format!("{r}")
    } else if *i < T::zero() {
        format!("({r}-i{})", format!("{i}").trim_start_matches('-'))
    } else {
        format!("({r}+i{i})")
    }
}

#[cfg(test)]
mod test {
    use num::Complex;

    use super::{c_abs, c_from_polar, c_recip, c_taxicab, complex_fmt};
    use crate::precision::Dpe;

    #[test]
    fn abs_and_taxicab() {
        let z = Complex::new(3.0f64, -4.0);
        assert_eq!(c_abs(&z), 5.0);
        assert_eq!(c_taxicab(&z), 7.0);
    }

    #[test]
    fn polar_in_extended_range() {
        let r = Dpe::from_f64(1.0).mul_pow2(5000);
        let z: Complex<Dpe> = c_from_polar(r, 0.0, 53);
        assert_eq!(z.re, r);
        assert_eq!(z.im, Dpe::from_f64(0.0));
    }

    #[test]
    fn recip_of_zero() {
        assert!(c_recip(&Complex::new(0.0f64, 0.0)).is_none());
        assert_eq!(c_recip(&Complex::new(0.0f64, 2.0)), Some(Complex::new(0.0, -0.5)));
    }

    #[test]
    fn formatting() {
        assert_eq!(complex_fmt(&Complex::new(1.5f64, 0.0)), "1.5");
        assert_eq!(complex_fmt(&Complex::new(1.0f64, 2.0)), "(1+i2)");
        assert_eq!(complex_fmt(&Complex::new(1.0f64, -2.0)), "(1-i2)");
    }
}
