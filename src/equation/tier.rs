use num::{Complex, One, Zero};

use crate::{
    precision::RealScalar,
    util::complex::{c_abs, c_from_f64, c_is_finite, c_neg, c_recip, c_taxicab},
};

/// An equation instantiated in one precision tier.
///
/// Both variants evaluate the same kind of object, a polynomial `p` with
/// the equation's roots. The secular variant never forms `p` directly: it
/// goes through the secular function with the nearest pole factored out,
/// which stays finite and accurate at the poles themselves.
#[derive(Clone, Debug)]
pub struct TierModel<R> {
    form: Form<R>,
    degree: usize,
    bits: u32,
    unit: R,
}

#[derive(Clone, Debug)]
enum Form<R> {
    Polynomial {
        coeffs: Vec<Complex<R>>,
        // upper bounds of |coeffs[k]|
        moduli: Vec<R>,
    },
    Secular {
        a: Vec<Complex<R>>,
        b: Vec<Complex<R>>,
        // absolute rounding bound of each a[i]
        a_err: Vec<R>,
    },
}

/// `p(x)/p'(x) = num/den`, split so callers can fold more terms into the
/// denominator before dividing.
#[derive(Clone, Debug)]
pub(crate) struct NewtonQuotient<R> {
    pub num: Complex<R>,
    pub den: Complex<R>,
    /// `|num|` is below the rounding error bound of its evaluation.
    pub dominated: bool,
    pub finite: bool,
}

impl<R: RealScalar> NewtonQuotient<R> {
    /// Newton correction, `None` where `p'` vanishes.
    pub fn correction(&self) -> Option<Complex<R>> {
        if self.den.is_zero() {
            return None;
        }
        Some(self.num.clone() / self.den.clone())
    }
}

/// Weierstrass correction of one approximation, with an absolute bound on
/// the error of its computation.
#[derive(Clone, Debug)]
pub(crate) struct Weierstrass<R> {
    pub w: Complex<R>,
    pub err: R,
}

/// Pieces of the secular form evaluated at one point.
struct SecularParts<R> {
    /// `a* + (x - b*) R(x)`, with `b*` the nearest pole.
    num: Complex<R>,
    /// `R + (x - b*) R' + T num`, where `T = Σ_{j≠*} 1/(x - b_j)`.
    den: Complex<R>,
    /// `Π_{j≠*} (x - b_j)`.
    q: Complex<R>,
    nearest: usize,
    err: R,
    finite: bool,
}

impl<R: RealScalar> TierModel<R> {
    pub(crate) fn from_polynomial(coeffs: &[Complex<f64>], bits: u32) -> Self {
        let coeffs: Vec<Complex<R>> = coeffs.iter().map(|&c| c_from_f64(c, bits)).collect();
        let moduli = coeffs.iter().map(c_taxicab).collect();
        Self {
            degree: coeffs.len().saturating_sub(1),
            form: Form::Polynomial { coeffs, moduli },
            bits,
            unit: R::unit_roundoff(bits),
        }
    }

    pub(crate) fn from_secular(a: &[Complex<f64>], b: &[Complex<f64>], bits: u32) -> Self {
        Self::secular(
            a.iter().map(|&c| c_from_f64(c, bits)).collect(),
            b.iter().map(|&c| c_from_f64(c, bits)).collect(),
            vec![R::zero(); a.len()],
            bits,
        )
    }

    /// Secular form with the given poles and numerators. `a_err[i]` bounds
    /// the absolute error already present in `a[i]`.
    pub(crate) fn secular(a: Vec<Complex<R>>, b: Vec<Complex<R>>, a_err: Vec<R>, bits: u32) -> Self {
        debug_assert_eq!(a.len(), b.len());
        debug_assert_eq!(a.len(), a_err.len());
        Self {
            degree: a.len(),
            form: Form::Secular { a, b, a_err },
            bits,
            unit: R::unit_roundoff(bits),
        }
    }

    #[must_use]
    pub const fn degree(&self) -> usize {
        self.degree
    }

    #[must_use]
    pub const fn bits(&self) -> u32 {
        self.bits
    }

    /// The poles, for the secular form.
    #[must_use]
    pub fn poles(&self) -> Option<&[Complex<R>]> {
        match &self.form {
            Form::Polynomial { .. } => None,
            Form::Secular { b, .. } => Some(b),
        }
    }

    /// `p(x)`.
    #[must_use]
    pub fn evaluate(&self, x: &Complex<R>) -> Complex<R> {
        match &self.form {
            Form::Polynomial { coeffs, moduli } => horner(coeffs, moduli, x).0,
            Form::Secular { a, b, a_err } => {
                let parts = self.secular_parts(a, b, a_err, x);
                c_neg(&(parts.q * parts.num))
            }
        }
    }

    /// `p'(x)`.
    #[must_use]
    pub fn derivative(&self, x: &Complex<R>) -> Complex<R> {
        match &self.form {
            Form::Polynomial { coeffs, moduli } => horner(coeffs, moduli, x).1,
            Form::Secular { a, b, a_err } => {
                let parts = self.secular_parts(a, b, a_err, x);
                c_neg(&(parts.q * parts.den))
            }
        }
    }

    /// `S(x) = Σ a_i/(x - b_i) - 1` for the secular form. `None` for a
    /// polynomial or at a pole.
    #[must_use]
    pub fn secular_value(&self, x: &Complex<R>) -> Option<Complex<R>> {
        let Form::Secular { a, b, .. } = &self.form else {
            return None;
        };
        let mut s = c_neg(&Complex::one());
        for (a, b) in a.iter().zip(b) {
            s = s + a.clone() * c_recip(&(x.clone() - b.clone()))?;
        }
        Some(s)
    }

    pub(crate) fn newton(&self, x: &Complex<R>) -> NewtonQuotient<R> {
        match &self.form {
            Form::Polynomial { coeffs, moduli } => {
                let (p, dp, s) = horner(coeffs, moduli, x);
                let err = s * self.unit.clone() * R::from_usize_at(4 * self.degree + 4, self.bits);
                NewtonQuotient {
                    dominated: c_taxicab(&p) <= err,
                    finite: c_is_finite(&p) && c_is_finite(&dp) && err.is_finite(),
                    num: p,
                    den: dp,
                }
            }
            Form::Secular { a, b, a_err } => {
                let parts = self.secular_parts(a, b, a_err, x);
                NewtonQuotient {
                    dominated: c_taxicab(&parts.num) <= parts.err,
                    finite: parts.finite,
                    num: parts.num,
                    den: parts.den,
                }
            }
        }
    }

    /// `w_i = p(x_i) / (lc Π_{j≠i} (x_i - x_j))`, `None` when two points
    /// coincide or the computation leaves the representable range.
    pub(crate) fn weierstrass(&self, points: &[Complex<R>], i: usize) -> Option<Weierstrass<R>> {
        debug_assert_eq!(points.len(), self.degree);
        let x = &points[i];
        let (w, err) = match &self.form {
            Form::Polynomial { coeffs, moduli } => {
                let (p, _, s) = horner(coeffs, moduli, x);
                let err = s * self.unit.clone() * R::from_usize_at(4 * self.degree + 4, self.bits);
                let mut prod = coeffs.last()?.clone();
                for (j, y) in points.iter().enumerate() {
                    if j != i {
                        prod = prod * (x.clone() - y.clone());
                    }
                }
                if prod.is_zero() || !c_is_finite(&prod) {
                    return None;
                }
                let modulus = c_abs(&prod);
                (p / prod, err / modulus)
            }
            Form::Secular { a, b, a_err } => {
                let parts = self.secular_parts(a, b, a_err, x);
                // pair factors up so the running product stays near 1
                let mut ratio = Complex::<R>::one();
                let poles = (0..self.degree).filter(|&j| j != parts.nearest);
                let others = (0..self.degree).filter(|&k| k != i);
                for (j, k) in poles.zip(others) {
                    let gap = x.clone() - points[k].clone();
                    let inv = c_recip(&gap)?;
                    ratio = ratio * (x.clone() - b[j].clone()) * inv;
                }
                if !parts.finite || !c_is_finite(&ratio) {
                    return None;
                }
                let modulus = c_abs(&ratio);
                (c_neg(&(parts.num * ratio)), parts.err * modulus)
            }
        };
        if !c_is_finite(&w) || !err.is_finite() {
            return None;
        }
        Some(Weierstrass { w, err })
    }

    fn secular_parts(
        &self,
        a: &[Complex<R>],
        b: &[Complex<R>],
        a_err: &[R],
        x: &Complex<R>,
    ) -> SecularParts<R> {
        let n = self.degree;
        let mut nearest = 0;
        let mut best = (x.clone() - b[0].clone()).norm_sqr();
        for (j, bj) in b.iter().enumerate().skip(1) {
            let dist = (x.clone() - bj.clone()).norm_sqr();
            if dist < best {
                best = dist;
                nearest = j;
            }
        }
        let d = x.clone() - b[nearest].clone();

        let mut r = c_neg(&Complex::one());
        let mut dr = Complex::<R>::zero();
        let mut t = Complex::<R>::zero();
        let mut q = Complex::<R>::one();
        let mut sum_abs = R::zero();
        let mut err_a = R::zero();
        let mut finite = true;
        for j in (0..n).filter(|&j| j != nearest) {
            let gap = x.clone() - b[j].clone();
            let Some(inv) = c_recip(&gap) else {
                finite = false;
                continue;
            };
            let term = a[j].clone() * inv.clone();
            sum_abs = sum_abs + c_taxicab(&term);
            err_a = err_a + a_err[j].clone() * c_taxicab(&inv);
            r = r + term.clone();
            dr = dr - term * inv.clone();
            t = t + inv;
            q = q * gap;
        }
        let num = a[nearest].clone() + d.clone() * r.clone();
        let den = r + d.clone() * dr + t * num.clone();

        let td = c_taxicab(&d);
        let scale = c_taxicab(&a[nearest]) + td.clone() * (sum_abs + R::one());
        let err = scale * self.unit.clone() * R::from_usize_at(4 * n + 8, self.bits)
            + a_err[nearest].clone()
            + td * err_a;
        finite = finite && c_is_finite(&num) && c_is_finite(&den) && c_is_finite(&q) && err.is_finite();
        SecularParts {
            num,
            den,
            q,
            nearest,
            err,
            finite,
        }
    }
}

/// `(p(x), p'(x), Σ |c_k| |x|^k)`, the last one an upper bound.
fn horner<R: RealScalar>(
    coeffs: &[Complex<R>],
    moduli: &[R],
    x: &Complex<R>,
) -> (Complex<R>, Complex<R>, R) {
    let n = coeffs.len() - 1;
    let ax = c_taxicab(x);
    let mut p = coeffs[n].clone();
    let mut dp = Complex::<R>::zero();
    let mut s = moduli[n].clone();
    for k in (0..n).rev() {
        dp = dp * x.clone() + p.clone();
        p = p * x.clone() + coeffs[k].clone();
        s = s * ax.clone() + moduli[k].clone();
    }
    (p, dp, s)
}
