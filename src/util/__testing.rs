//! Testing utilities, do not depend on any of these in production!

use fastrand::Rng;
use itertools::Itertools;
use num::{complex::Complex64, Complex};

use crate::{EquationModel, Polynomial, SecularEquation};

struct RandStreamF64 {
    state: Rng,
}

impl RandStreamF64 {
    fn new(seed: u64) -> Self {
        Self {
            state: Rng::with_seed(seed),
        }
    }
}

impl Iterator for RandStreamF64 {
    type Item = f64;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.state.f64())
    }
}

/// Real values, uniform in `[min, max)`.
pub struct RandStreamR64 {
    real_stream: RandStreamF64,
    min: f64,
    max: f64,
}

impl RandStreamR64 {
    #[must_use]
    pub fn new(seed: u64, min: f64, max: f64) -> Self {
        assert!(min <= max, "minimum should be smaller or equal to maximum");
        Self {
            real_stream: RandStreamF64::new(seed),
            min,
            max,
        }
    }
}

impl Iterator for RandStreamR64 {
    type Item = Complex64;

    fn next(&mut self) -> Option<Self::Item> {
        let re = (self.real_stream.next()?).mul_add(self.max - self.min, self.min);
        Some(Complex64 { re, im: 0.0 })
    }
}

pub struct RandStreamC64Polar {
    real_stream: RandStreamF64,
    min_radius: f64,
    max_radius: f64,
}

impl RandStreamC64Polar {
    #[must_use]
    pub fn new(seed: u64, min_radius: f64, max_radius: f64) -> Self {
        assert!(0.0 <= min_radius, "radius should be non-negative");
        assert!(
            min_radius <= max_radius,
            "min_radius should be smaller or equal to max_radius"
        );
        Self {
            real_stream: RandStreamF64::new(seed),
            min_radius,
            max_radius,
        }
    }
}

impl Iterator for RandStreamC64Polar {
    type Item = Complex64;

    fn next(&mut self) -> Option<Self::Item> {
        let r =
            (self.real_stream.next()?).mul_add(self.max_radius - self.min_radius, self.min_radius);
        let a = self.real_stream.next()? * std::f64::consts::TAU;
        Some(Complex::from_polar(r, a))
    }
}

/// Gaussian integers `a + bi` with `|a|, |b| <= bound`.
///
/// Polynomials with these roots expand exactly in `f64` at small degrees,
/// so the true roots are known exactly.
pub struct RandStreamGaussian {
    state: Rng,
    bound: i32,
}

impl RandStreamGaussian {
    #[must_use]
    pub fn new(seed: u64, bound: i32) -> Self {
        assert!(bound >= 0, "bound should be non-negative");
        Self {
            state: Rng::with_seed(seed),
            bound,
        }
    }
}

impl Iterator for RandStreamGaussian {
    type Item = Complex64;

    fn next(&mut self) -> Option<Self::Item> {
        let re = self.state.i32(-self.bound..=self.bound);
        let im = self.state.i32(-self.bound..=self.bound);
        Some(Complex::new(f64::from(re), f64::from(im)))
    }
}

/// Generate one test case where the roots are known and can be compared
///
/// # Panics
/// If the expansion of the roots overflows.
pub fn test_case_roots(
    roots_stream: impl Iterator<Item = Complex64>,
    degree: usize,
) -> (EquationModel, Vec<Complex64>) {
    let roots = roots_stream.take(degree).collect_vec();
    let poly = Polynomial::from_roots(&roots).expect("small roots should not overflow");
    (poly.into(), roots)
}

/// Like [`test_case_roots`], with the first root repeated `multiplicity`
/// times.
///
/// # Panics
/// If the expansion of the roots overflows, or `multiplicity` is not in
/// `1..=degree`.
pub fn test_case_multiple_roots(
    roots_stream: impl Iterator<Item = Complex64>,
    degree: usize,
    multiplicity: usize,
) -> (EquationModel, Vec<Complex64>) {
    assert!(
        (1..=degree).contains(&multiplicity),
        "multiplicity should be between 1 and the degree"
    );
    let mut roots = roots_stream.take(degree - multiplicity + 1).collect_vec();
    let first_root = roots[0];
    for _ in 1..multiplicity {
        roots.push(first_root);
    }
    let poly = Polynomial::from_roots(&roots).expect("small roots should not overflow");
    (poly.into(), roots)
}

/// A secular equation with random numerators and poles.
///
/// # Panics
/// If two poles coincide, which the streams make vanishingly unlikely.
pub fn test_case_secular(
    a_stream: impl Iterator<Item = Complex64>,
    b_stream: impl Iterator<Item = Complex64>,
    degree: usize,
) -> SecularEquation {
    let a = a_stream.take(degree).collect_vec();
    let b = b_stream.take(degree).collect_vec();
    SecularEquation::new(&a, &b).expect("random poles should be distinct")
}

/// Check that all roots have been found
#[must_use]
pub fn check_roots(roots1: Vec<Complex64>, mut roots2: Vec<Complex64>, tol: f64) -> bool {
    if roots1.len() != roots2.len() {
        return false;
    }

    for r1 in roots1 {
        let mut best_idx = 0;
        let mut best_d = f64::MAX;
        for (i, r2) in roots2.iter().enumerate() {
            let d = (r1 - r2).norm();
            if d < best_d {
                best_idx = i;
                best_d = d;
            }
        }
        if best_d > tol {
            return false;
        }
        roots2.remove(best_idx);
    }
    true
}
