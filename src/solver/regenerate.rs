use num::Complex;
use rayon::{prelude::*, ThreadPool};
use thiserror::Error;

use crate::{
    equation::TierModel,
    precision::RealScalar,
    util::{complex::c_neg, iterator::DisjointSets},
};

/// Some approximations cannot be told apart at the working precision, so
/// they cannot serve as poles.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("approximations {pairs:?} are indistinguishable at {bits} bits")]
pub(crate) struct ClusterAmbiguity {
    pub pairs: Vec<(usize, usize)>,
    pub bits: u32,
}

impl ClusterAmbiguity {
    /// The ambiguous approximations, grouped by transitive ambiguity.
    pub fn groups(&self, n: usize) -> Vec<Vec<usize>> {
        let mut sets = DisjointSets::new(n);
        for &(i, j) in &self.pairs {
            sets.union(i, j);
        }
        sets.groups().into_iter().filter(|g| g.len() > 1).collect()
    }

    pub fn members(&self) -> impl Iterator<Item = usize> + '_ {
        self.pairs.iter().flat_map(|&(i, j)| [i, j])
    }
}

/// The secular equation with poles `points` and the same roots as
/// `original`.
///
/// Its numerators are `a_i = -w_i`, the negated Weierstrass corrections,
/// and the error bound of each `w_i` is carried along as the error of
/// `a_i`. `original` is always the input equation at the current level, so
/// rounding does not pile up over successive regenerations.
pub(crate) fn regenerate<R: RealScalar>(
    original: &TierModel<R>,
    points: &[Complex<R>],
    pool: &ThreadPool,
) -> Result<TierModel<R>, ClusterAmbiguity> {
    let bits = original.bits();
    let n = points.len();

    let pairs = indistinguishable(points, bits);
    if !pairs.is_empty() {
        return Err(ClusterAmbiguity { pairs, bits });
    }

    let corrections: Vec<_> = pool.install(|| {
        (0..n)
            .into_par_iter()
            .map(|i| original.weierstrass(points, i))
            .collect()
    });

    let mut a = Vec::with_capacity(n);
    let mut a_err = Vec::with_capacity(n);
    let mut failed = vec![];
    for (i, corr) in corrections.into_iter().enumerate() {
        match corr {
            Some(corr) => {
                a.push(c_neg(&corr.w));
                a_err.push(corr.err);
            }
            None => failed.push((i, nearest(points, i))),
        }
    }
    if !failed.is_empty() {
        return Err(ClusterAmbiguity {
            pairs: failed,
            bits,
        });
    }

    log::debug!("regenerated secular equation of degree {n} at {bits} bits");
    Ok(TierModel::secular(a, points.to_vec(), a_err, bits))
}

/// Pairs with `|x_i - x_j| <= 4u max(|x_i|, |x_j|)`.
fn indistinguishable<R: RealScalar>(points: &[Complex<R>], bits: u32) -> Vec<(usize, usize)> {
    let four_u = R::unit_roundoff(bits).mul_pow2(2);
    let threshold = four_u.clone() * four_u;
    let norms: Vec<R> = points.iter().map(Complex::norm_sqr).collect();
    let mut pairs = vec![];
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            let d = (points[i].clone() - points[j].clone()).norm_sqr();
            let scale = if norms[i] > norms[j] {
                norms[i].clone()
            } else {
                norms[j].clone()
            };
            if d <= scale * threshold.clone() {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

fn nearest<R: RealScalar>(points: &[Complex<R>], i: usize) -> usize {
    let mut best: Option<(usize, R)> = None;
    for (j, y) in points.iter().enumerate() {
        if j == i {
            continue;
        }
        let d = (points[i].clone() - y.clone()).norm_sqr();
        if best.as_ref().map_or(true, |(_, b)| d < *b) {
            best = Some((j, d));
        }
    }
    best.map_or(i, |(j, _)| j)
}

#[cfg(test)]
mod test {
    use num::Complex;

    use super::{regenerate, ClusterAmbiguity};
    use crate::{
        complex,
        equation::{EquationModel, Polynomial},
        precision::{BigFloat, PrecisionLevel},
    };

    fn pool() -> rayon::ThreadPool {
        rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap()
    }

    #[test]
    fn preserves_the_polynomial() {
        // (x - 1)(x + 2)(x - 3i)
        let roots = [complex!(1.0), complex!(-2.0), complex!(0.0, 3.0)];
        let poly = Polynomial::from_roots(&roots).unwrap();
        let original = EquationModel::from(poly.clone()).instantiate::<f64>(PrecisionLevel::STANDARD);
        let points = [complex!(1.1, 0.1), complex!(-1.9), complex!(0.2, 2.8)];
        let secular = regenerate(&original, &points, &pool()).unwrap();
        assert_eq!(secular.poles().unwrap(), &points);
        for x in [complex!(0.5, 0.5), complex!(-3.0, 1.0), complex!(2.0, -1.0)] {
            let expected = poly.eval(x);
            let got = secular.evaluate(&x);
            assert!((got - expected).norm() < 1e-12 * expected.norm(), "{got} != {expected}");
        }
    }

    #[test]
    fn arbitrary_precision() {
        let level = PrecisionLevel::arbitrary(192);
        let poly = Polynomial::from_reals(&[-6.0, 11.0, -6.0, 1.0]).unwrap();
        let original = EquationModel::from(poly).instantiate::<BigFloat>(level);
        let points: Vec<Complex<BigFloat>> = [0.9, 2.2, 2.9]
            .iter()
            .map(|&x| Complex::new(BigFloat::from_f64(x).with_precision(192), BigFloat::from_f64(0.0)))
            .collect();
        let secular = regenerate(&original, &points, &pool()).unwrap();
        for r in [1.0, 2.0, 3.0] {
            let x = Complex::new(BigFloat::from_f64(r).with_precision(192), BigFloat::from_f64(0.0));
            let v = secular.evaluate(&x);
            assert!(v.re.abs().to_f64() < 1e-50, "p({r}) = {}", v.re);
        }
    }

    #[test]
    fn indistinguishable_points() {
        let original = EquationModel::from(Polynomial::from_reals(&[1.0, 0.0, 0.0, 1.0]).unwrap())
            .instantiate::<f64>(PrecisionLevel::STANDARD);
        let points = [complex!(1.0), complex!(1.0 + f64::EPSILON), complex!(-1.0)];
        let err = regenerate(&original, &points, &pool()).unwrap_err();
        assert_eq!(err, ClusterAmbiguity { pairs: vec![(0, 1)], bits: 53 });
        assert_eq!(err.groups(3), vec![vec![0, 1]]);
        assert_eq!(err.members().collect::<Vec<_>>(), vec![0, 1]);
    }
}
