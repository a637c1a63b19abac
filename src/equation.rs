//! The equations the solver accepts.
//!
//! Inputs are binary64 and treated as exact. To compute with them, an
//! equation is instantiated at a precision level as a [`TierModel`], which
//! carries the coefficients in that level's representation.

use itertools::Itertools;
use num::{Complex, One, Zero};

use crate::{
    error::{Error, Result},
    precision::{PrecisionLevel, RealScalar},
};

mod tier;
pub use tier::TierModel;

/// Polynomial with complex coefficients in order of ascending degree.
#[derive(Clone, Debug, PartialEq)]
pub struct Polynomial {
    coeffs: Vec<Complex<f64>>,
}

impl Polynomial {
    /// Create a polynomial from coefficients of ascending degree.
    ///
    /// Zero coefficients of the highest degrees are trimmed, so the leading
    /// coefficient is non-zero unless the polynomial is zero.
    ///
    /// # Errors
    /// - `InvalidModel` if a coefficient is not finite.
    pub fn new(coeffs: &[Complex<f64>]) -> Result<Self> {
        if coeffs
            .iter()
            .any(|c| !c.re.is_finite() || !c.im.is_finite())
        {
            return Err(Error::InvalidModel(
                "polynomial coefficients must be finite".into(),
            ));
        }
        let mut coeffs = coeffs.to_vec();
        while coeffs.len() > 1 && coeffs.last().is_some_and(Zero::is_zero) {
            coeffs.pop();
        }
        if coeffs.is_empty() {
            coeffs.push(Complex::zero());
        }
        Ok(Self { coeffs })
    }

    /// Create a polynomial from real coefficients of ascending degree.
    ///
    /// # Errors
    /// - `InvalidModel` if a coefficient is not finite.
    pub fn from_reals(coeffs: &[f64]) -> Result<Self> {
        Self::new(&coeffs.iter().map(|&c| Complex::new(c, 0.0)).collect_vec())
    }

    /// The monic polynomial with the given roots, expanded in `f64`.
    ///
    /// The expansion rounds unless the roots are small integers, so the
    /// roots of the result are only close to `roots` in general.
    ///
    /// # Errors
    /// - `InvalidModel` if the expansion overflows.
    pub fn from_roots(roots: &[Complex<f64>]) -> Result<Self> {
        let mut coeffs = vec![Complex::one()];
        for r in roots {
            coeffs = mul_linear(&coeffs, *r);
        }
        Self::new(&coeffs)
    }

    #[must_use]
    pub fn degree(&self) -> usize {
        self.coeffs.len() - 1
    }

    /// Coefficients in order of ascending degree.
    #[must_use]
    pub fn coeffs(&self) -> &[Complex<f64>] {
        &self.coeffs
    }

    /// Horner evaluation in `f64`.
    #[must_use]
    pub fn eval(&self, x: Complex<f64>) -> Complex<f64> {
        self.coeffs
            .iter()
            .rev()
            .fold(Complex::zero(), |acc, c| acc * x + c)
    }

    /// Removes the roots at the origin, returning the remaining polynomial
    /// and how many were removed.
    pub(crate) fn deflate_zero_roots(&self) -> (Self, usize) {
        let k = self
            .coeffs
            .iter()
            .take(self.degree())
            .take_while(|c| c.is_zero())
            .count();
        (
            Self {
                coeffs: self.coeffs[k..].to_vec(),
            },
            k,
        )
    }
}

// multiply by (x - r)
fn mul_linear(coeffs: &[Complex<f64>], r: Complex<f64>) -> Vec<Complex<f64>> {
    let mut out = vec![Complex::zero(); coeffs.len() + 1];
    for (k, c) in coeffs.iter().enumerate() {
        out[k + 1] += c;
        out[k] -= c * r;
    }
    out
}

/// Generalized secular equation `S(x) = Σ a_i / (x - b_i) - 1 = 0`.
///
/// Its roots are those of the monic polynomial
/// `Π (x - b_j) - Σ a_i Π_{j≠i} (x - b_j)` of degree `n = a.len()`.
#[derive(Clone, Debug, PartialEq)]
pub struct SecularEquation {
    a: Vec<Complex<f64>>,
    b: Vec<Complex<f64>>,
}

impl SecularEquation {
    /// # Errors
    /// - `InvalidModel` if `a` and `b` differ in length, a value is not
    ///   finite, or two poles `b` coincide.
    pub fn new(a: &[Complex<f64>], b: &[Complex<f64>]) -> Result<Self> {
        if a.len() != b.len() {
            return Err(Error::InvalidModel(format!(
                "{} numerators but {} poles",
                a.len(),
                b.len()
            )));
        }
        if a
            .iter()
            .chain(b)
            .any(|c| !c.re.is_finite() || !c.im.is_finite())
        {
            return Err(Error::InvalidModel(
                "secular coefficients must be finite".into(),
            ));
        }
        if let Some((i, j)) = (0..b.len())
            .tuple_combinations()
            .find(|&(i, j)| b[i] == b[j])
        {
            return Err(Error::InvalidModel(format!(
                "poles {i} and {j} coincide"
            )));
        }
        Ok(Self {
            a: a.to_vec(),
            b: b.to_vec(),
        })
    }

    #[must_use]
    pub fn degree(&self) -> usize {
        self.a.len()
    }

    #[must_use]
    pub fn numerators(&self) -> &[Complex<f64>] {
        &self.a
    }

    #[must_use]
    pub fn poles(&self) -> &[Complex<f64>] {
        &self.b
    }

    /// `S(x)` in `f64`, `None` at a pole.
    #[must_use]
    pub fn value(&self, x: Complex<f64>) -> Option<Complex<f64>> {
        let mut s = Complex::new(-1.0, 0.0);
        for (a, b) in self.a.iter().zip(&self.b) {
            let d = x - b;
            if d.is_zero() {
                return None;
            }
            s += a / d;
        }
        Some(s)
    }

    /// The equivalent monic polynomial, expanded in `f64`.
    ///
    /// # Errors
    /// - `InvalidModel` if the expansion overflows.
    pub fn to_polynomial(&self) -> Result<Polynomial> {
        let n = self.degree();
        let mut coeffs = vec![Complex::one()];
        for b in &self.b {
            coeffs = mul_linear(&coeffs, *b);
        }
        for i in 0..n {
            let mut term = vec![self.a[i]];
            for (j, b) in self.b.iter().enumerate() {
                if j != i {
                    term = mul_linear(&term, *b);
                }
            }
            for (c, t) in coeffs.iter_mut().zip(&term) {
                *c -= t;
            }
        }
        Polynomial::new(&coeffs)
    }
}

/// An equation whose roots are sought.
#[derive(Clone, Debug, PartialEq)]
pub enum EquationModel {
    Polynomial(Polynomial),
    Secular(SecularEquation),
}

impl EquationModel {
    /// Number of roots, counted with multiplicity.
    #[must_use]
    pub fn degree(&self) -> usize {
        match self {
            Self::Polynomial(p) => p.degree(),
            Self::Secular(s) => s.degree(),
        }
    }

    /// The equation with its coefficients converted to `R` at `level`.
    ///
    /// # Panics
    /// In debug builds, if `R` is not the representation of `level`.
    #[must_use]
    pub fn instantiate<R: RealScalar>(&self, level: PrecisionLevel) -> TierModel<R> {
        debug_assert_eq!(R::TIER, level.tier());
        match self {
            Self::Polynomial(p) => TierModel::from_polynomial(p.coeffs(), level.bits()),
            Self::Secular(s) => TierModel::from_secular(s.numerators(), s.poles(), level.bits()),
        }
    }

    /// `p(x)`, where `p` is the polynomial itself or the one associated
    /// with the secular equation.
    #[must_use]
    pub fn evaluate<R: RealScalar>(&self, x: &Complex<R>, level: PrecisionLevel) -> Complex<R> {
        self.instantiate::<R>(level).evaluate(x)
    }

    /// `p'(x)`, see [`EquationModel::evaluate`].
    #[must_use]
    pub fn derivative<R: RealScalar>(&self, x: &Complex<R>, level: PrecisionLevel) -> Complex<R> {
        self.instantiate::<R>(level).derivative(x)
    }

    /// Factors out exact roots at the origin.
    pub(crate) fn deflate_zero_roots(&self) -> (Self, usize) {
        match self {
            Self::Polynomial(p) => {
                let (q, k) = p.deflate_zero_roots();
                (Self::Polynomial(q), k)
            }
            Self::Secular(_) => (self.clone(), 0),
        }
    }
}

impl From<Polynomial> for EquationModel {
    fn from(value: Polynomial) -> Self {
        Self::Polynomial(value)
    }
}

impl From<SecularEquation> for EquationModel {
    fn from(value: SecularEquation) -> Self {
        Self::Secular(value)
    }
}

#[cfg(test)]
mod test {
    use num::Complex;

    use super::{EquationModel, Polynomial, SecularEquation};
    use crate::{complex, error::Error, precision::PrecisionLevel};

    #[test]
    fn trims_leading_zeros() {
        let p = Polynomial::from_reals(&[1.0, 2.0, 0.0, 0.0]).unwrap();
        assert_eq!(p.degree(), 1);
        let zero = Polynomial::from_reals(&[0.0, 0.0]).unwrap();
        assert_eq!(zero.degree(), 0);
        assert_eq!(Polynomial::from_reals(&[]).unwrap().degree(), 0);
    }

    #[test]
    fn rejects_non_finite() {
        assert!(matches!(
            Polynomial::from_reals(&[1.0, f64::NAN]),
            Err(Error::InvalidModel(_))
        ));
    }

    #[test]
    fn from_roots() {
        let p = Polynomial::from_roots(&[complex!(1.0), complex!(-2.0), complex!(0.0, 1.0)])
            .unwrap();
        assert_eq!(p.degree(), 3);
        for r in [complex!(1.0), complex!(-2.0), complex!(0.0, 1.0)] {
            assert_eq!(p.eval(r), complex!(0.0));
        }
    }

    #[test]
    fn zero_roots() {
        let p = Polynomial::from_reals(&[0.0, 0.0, -1.0, 1.0]).unwrap();
        let (q, k) = p.deflate_zero_roots();
        assert_eq!(k, 2);
        assert_eq!(q.coeffs(), &[complex!(-1.0), complex!(1.0)]);
        let (q, k) = Polynomial::from_reals(&[0.0, 0.0, 3.0])
            .unwrap()
            .deflate_zero_roots();
        assert_eq!((q.degree(), k), (0, 2));
    }

    #[test]
    fn secular_validation() {
        let ok = SecularEquation::new(&[complex!(1.0), complex!(1.0)], &[complex!(0.0), complex!(1.0)]);
        assert!(ok.is_ok());
        let repeated = SecularEquation::new(&[complex!(1.0), complex!(1.0)], &[complex!(2.0), complex!(2.0)]);
        assert!(matches!(repeated, Err(Error::InvalidModel(_))));
        let lengths = SecularEquation::new(&[complex!(1.0)], &[complex!(2.0), complex!(3.0)]);
        assert!(matches!(lengths, Err(Error::InvalidModel(_))));
    }

    #[test]
    fn secular_polynomial() {
        // 1/(x-1) + 1/(x+1) - 1 = 0  <=>  x^2 - 2x - 1 = 0
        let s = SecularEquation::new(&[complex!(1.0), complex!(1.0)], &[complex!(1.0), complex!(-1.0)])
            .unwrap();
        let p = s.to_polynomial().unwrap();
        assert_eq!(p.coeffs(), &[complex!(-1.0), complex!(-2.0), complex!(1.0)]);
        let root = complex!(1.0 + 2f64.sqrt());
        assert!(s.value(root).unwrap().norm() < 1e-14);
        assert!(s.value(complex!(1.0)).is_none());
    }

    #[test]
    fn model_evaluation() {
        let s = SecularEquation::new(&[complex!(1.0), complex!(1.0)], &[complex!(1.0), complex!(-1.0)])
            .unwrap();
        let m = EquationModel::from(s);
        assert_eq!(m.degree(), 2);
        let x = Complex::new(3.0f64, 0.5);
        let expected = x * x - x * 2.0 - 1.0;
        let got = m.evaluate(&x, PrecisionLevel::STANDARD);
        assert!((got - expected).norm() < 1e-14);
        let got = m.derivative(&x, PrecisionLevel::STANDARD);
        assert!((got - (x * 2.0 - 2.0)).norm() < 1e-14);
    }
}
