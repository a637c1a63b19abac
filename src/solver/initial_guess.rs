use std::f64::consts::TAU;

use itertools::Itertools;
use num::{Complex, Zero};

use crate::precision::Dpe;

/// Angle offset of the first point on every circle.
const SIGMA: f64 = 0.7;

/// Extra rotation between consecutive circles, so their points do not align.
const SEGMENT_ROTATION: f64 = 0.925_024_5;

/// Amplitude of the seeded random angle perturbation.
const JITTER: f64 = 0.05;

/// Starting point in polar form; the radius may be outside the `f64` range.
#[derive(Clone, Copy, Debug)]
pub(crate) struct StartingPoint {
    pub radius: Dpe,
    pub angle: f64,
}

/// Starting points on circles given by the Newton polygon of the
/// coefficients.
///
/// Each edge of the upper convex hull of `(k, log |c_k|)` from `i` to `j`
/// contributes `j - i` points on a circle of radius
/// `(|c_i| / |c_j|)^(1 / (j - i))`, the typical size of that many roots.
/// Computed in the log domain, so extreme coefficients do not overflow.
pub(crate) fn newton_polygon(coeffs: &[Complex<f64>], seed: u64) -> Vec<StartingPoint> {
    debug_assert!(coeffs.len() >= 2);
    debug_assert!(!coeffs[0].is_zero() && !coeffs[coeffs.len() - 1].is_zero());

    let points = coeffs
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.is_zero())
        .map(|(k, c)| (k, log2_modulus(*c)))
        .collect_vec();
    let hull = upper_hull(&points);

    let mut rng = fastrand::Rng::with_seed(seed);
    let mut out = Vec::with_capacity(coeffs.len() - 1);
    for (s, (&(i, li), &(j, lj))) in hull.iter().tuple_windows().enumerate() {
        let m = j - i;
        #[allow(clippy::cast_precision_loss)]
        let radius = Dpe::from_log2((li - lj) / m as f64);
        #[allow(clippy::cast_precision_loss)]
        let offset = (s as f64).mul_add(SEGMENT_ROTATION, SIGMA);
        for t in 0..m {
            #[allow(clippy::cast_precision_loss)]
            let angle = TAU * t as f64 / m as f64 + offset + rng.f64() * JITTER;
            out.push(StartingPoint { radius, angle });
        }
    }
    log::trace!("{} starting circles from {} coefficients", hull.len() - 1, coeffs.len());
    out
}

fn log2_modulus(c: Complex<f64>) -> f64 {
    let re = Dpe::from_f64(c.re);
    let im = Dpe::from_f64(c.im);
    (re * re + im * im).log2_abs() / 2.0
}

#[allow(clippy::cast_precision_loss)]
fn upper_hull(points: &[(usize, f64)]) -> Vec<(usize, f64)> {
    let mut hull: Vec<(usize, f64)> = Vec::with_capacity(points.len());
    for &(k, l) in points {
        while hull.len() >= 2 {
            let (k1, l1) = hull[hull.len() - 2];
            let (k2, l2) = hull[hull.len() - 1];
            // drop the middle point unless it turns clockwise
            let cross = (k2 - k1) as f64 * (l - l1) - (l2 - l1) * (k - k1) as f64;
            if cross >= 0.0 {
                hull.pop();
            } else {
                break;
            }
        }
        hull.push((k, l));
    }
    hull
}

#[cfg(test)]
mod test {
    use super::{newton_polygon, upper_hull};
    use crate::complex;

    #[test]
    fn unit_circle() {
        let coeffs = [complex!(-1.0), complex!(0.0), complex!(0.0), complex!(0.0), complex!(1.0)];
        let points = newton_polygon(&coeffs, 1);
        assert_eq!(points.len(), 4);
        for p in &points {
            assert!((p.radius.to_f64() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn separated_scales() {
        // (x - 1e-3)(x - 1e3)
        let coeffs = [complex!(1.0), complex!(-1000.001), complex!(1.0)];
        let points = newton_polygon(&coeffs, 7);
        let mut radii = points.iter().map(|p| p.radius.to_f64()).collect::<Vec<_>>();
        radii.sort_by(f64::total_cmp);
        assert!((radii[0] / 1e-3 - 1.0).abs() < 1e-2);
        assert!((radii[1] / 1e3 - 1.0).abs() < 1e-2);
    }

    #[test]
    fn extreme_coefficients() {
        let coeffs = [complex!(1e-300), complex!(0.0), complex!(1e300)];
        let points = newton_polygon(&coeffs, 0);
        assert_eq!(points.len(), 2);
        assert!((points[0].radius.log2_abs() + 996.58).abs() < 0.1);
    }

    #[test]
    fn deterministic() {
        let coeffs = [complex!(3.0), complex!(-1.0, 2.0), complex!(0.5), complex!(1.0)];
        let a = newton_polygon(&coeffs, 42);
        let b = newton_polygon(&coeffs, 42);
        assert_eq!(a.len(), 3);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.angle, y.angle);
            assert_eq!(x.radius, y.radius);
        }
    }

    #[test]
    fn hull_drops_interior_points() {
        let hull = upper_hull(&[(0, 0.0), (1, -5.0), (2, 1.0), (3, 0.0)]);
        assert_eq!(hull.iter().map(|p| p.0).collect::<Vec<_>>(), vec![0, 2, 3]);
    }
}
