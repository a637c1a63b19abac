//! Inclusion disks, their connected components, and cluster restarts.
//!
//! With `w_i` the Weierstrass correction of `x_i`, the disks
//! `D(x_i, n |w_i|)` cover all roots, and every connected component of `m`
//! disks holds exactly `m` roots. A component of one disk isolates a root;
//! larger components are clusters, verified as a multiple root when tight
//! enough relative to their modulus.

use std::f64::consts::TAU;

use num::{Complex, Zero};
use rayon::{prelude::*, ThreadPool};

use crate::{
    equation::TierModel,
    precision::{bound_to_dpe, Dpe, RealScalar},
    roots::Inclusion,
    solver::context::SearchRegion,
    util::{
        complex::{c_abs, c_abs_bound, c_from_polar, c_mul_real, c_taxicab},
        iterator::DisjointSets,
    },
};

/// Angle of the first member of a restarted cluster.
const RESTART_ANGLE: f64 = 0.7;

/// Newton refinements of a restarted cluster's center.
const CENTER_REFINEMENTS: usize = 3;

/// Relative rounding margin of computations done in [`Dpe`].
fn slack() -> Dpe {
    Dpe::ONE.mul_pow2(-48)
}

pub(crate) struct AnalysisParams<'a> {
    pub multiplicity_tolerance: Dpe,
    pub region: SearchRegion,
    pub pool: &'a ThreadPool,
}

#[derive(Clone, Debug)]
pub(crate) struct Component {
    pub members: Vec<usize>,
    /// Tight enough to count as one multiple root. Always false for
    /// singletons.
    pub verified: bool,
    pub inclusion: Inclusion,
}

impl Component {
    pub fn is_cluster(&self) -> bool {
        self.members.len() > 1
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Analysis {
    /// Radius reported for each root, never larger than in the previous
    /// analysis plus the distance moved since.
    pub radii: Vec<Dpe>,
    pub moduli: Vec<Dpe>,
    pub components: Vec<Component>,
    pub component_of: Vec<usize>,
}

impl Analysis {
    /// Clusters that are not verified, to be restarted.
    pub fn suspected(&self) -> Vec<Vec<usize>> {
        self.components
            .iter()
            .filter(|c| c.is_cluster() && !c.verified)
            .map(|c| c.members.clone())
            .collect()
    }

    /// Whether the disk of root `i` may contain the origin.
    pub fn covers_origin(&self, i: usize) -> bool {
        self.moduli[i] <= self.radii[i] * (Dpe::ONE + slack())
    }
}

/// Inclusion radii and components of `points`, which approximate the roots
/// of `model`.
///
/// `previous[i]` is the radius from the last analysis and `moved[i]` how far
/// `points[i]` travelled since; the reported radius is the smaller of that
/// bound and the new one.
pub(crate) fn analyze<R: RealScalar>(
    model: &TierModel<R>,
    points: &[Complex<R>],
    previous: &[Dpe],
    moved: &[Dpe],
    params: &AnalysisParams<'_>,
) -> Analysis {
    let n = points.len();
    let slack = slack();
    let up = Dpe::ONE + slack;
    let down = Dpe::ONE - slack;

    let (g, distances): (Vec<Dpe>, Vec<Vec<Dpe>>) = params.pool.install(|| {
        let g = (0..n)
            .into_par_iter()
            .map(|i| weierstrass_radius(model, points, i))
            .collect();
        let distances = (0..n)
            .into_par_iter()
            .map(|i| {
                (0..n)
                    .map(|j| c_abs(&(points[i].clone() - points[j].clone())).to_dpe())
                    .collect()
            })
            .collect();
        (g, distances)
    });

    let mut sets = DisjointSets::new(n);
    for i in 0..n {
        for j in (i + 1)..n {
            if distances[i][j] * down <= g[i] + g[j] {
                sets.union(i, j);
            }
        }
    }
    let groups = sets.groups();

    let moduli: Vec<Dpe> = points.iter().map(|x| c_abs(x).to_dpe()).collect();
    let mut fresh = g.clone();
    let mut component_of = vec![0; n];
    for (c, members) in groups.iter().enumerate() {
        for &i in members {
            component_of[i] = c;
            if members.len() > 1 {
                // the disk around x_i that covers every member's disk
                fresh[i] = members
                    .iter()
                    .map(|&k| distances[i][k] * up + g[k])
                    .fold(Dpe::ZERO, Dpe::max)
                    * up;
            }
        }
    }

    let radii: Vec<Dpe> = (0..n)
        .map(|i| fresh[i].min(previous[i] + moved[i]))
        .collect();

    let components = groups
        .into_iter()
        .map(|members| {
            let verified = members.len() > 1
                && members
                    .iter()
                    .all(|&i| within_tolerance(radii[i], params.multiplicity_tolerance * down, moduli[i]));
            let inclusion = members
                .iter()
                .map(|&i| {
                    let center = Complex::new(points[i].re.to_dpe(), points[i].im.to_dpe());
                    region_inclusion(params.region, center, fresh[i])
                })
                .find(|inc| *inc != Inclusion::Uncertain)
                .unwrap_or(Inclusion::Uncertain);
            Component {
                members,
                verified,
                inclusion,
            }
        })
        .collect::<Vec<_>>();

    log::debug!(
        "{} components, {} clusters, {} verified",
        components.len(),
        components.iter().filter(|c| c.is_cluster()).count(),
        components.iter().filter(|c| c.verified).count()
    );

    Analysis {
        radii,
        moduli,
        components,
        component_of,
    }
}

/// `radius <= tolerance * modulus`. For an approximation at exactly zero the
/// tolerance bounds the radius itself.
pub(crate) fn within_tolerance(radius: Dpe, tolerance: Dpe, modulus: Dpe) -> bool {
    if modulus.is_zero() {
        radius <= tolerance
    } else {
        radius <= tolerance * modulus
    }
}

/// `n (|w_i| + err_i)(1 + 4nu)`, infinite when the correction is not
/// available.
fn weierstrass_radius<R: RealScalar>(model: &TierModel<R>, points: &[Complex<R>], i: usize) -> Dpe {
    let Some(corr) = model.weierstrass(points, i) else {
        return Dpe::INFINITY;
    };
    #[allow(clippy::cast_precision_loss)]
    let n = Dpe::from_f64(points.len() as f64);
    let u = Dpe::ONE.mul_pow2(-i64::from(model.bits()));
    let growth = Dpe::ONE + n * u.mul_pow2(2);
    let bound = (c_abs_bound(&corr.w) + bound_to_dpe(&corr.err)) * n * growth * (Dpe::ONE + slack());
    if bound.is_finite() {
        bound
    } else {
        Dpe::INFINITY
    }
}

/// Position of the closed disk `D(center, radius)` relative to `region`.
///
/// `center` is rounded, so the radius is padded by a few ulps of the
/// coordinate the decision depends on.
pub(crate) fn region_inclusion(region: SearchRegion, center: Complex<Dpe>, radius: Dpe) -> Inclusion {
    let decide = |inside: bool, outside: bool| {
        if inside {
            Inclusion::Inside
        } else if outside {
            Inclusion::Outside
        } else {
            Inclusion::Uncertain
        }
    };
    let padded = |x: Dpe| radius + x.abs() * slack();
    let modulus = (center.re * center.re + center.im * center.im).sqrt();
    let (zero, one) = (Dpe::ZERO, Dpe::ONE);
    match region {
        SearchRegion::Everywhere => Inclusion::Inside,
        SearchRegion::InsideUnitDisk => {
            let r = padded(modulus);
            decide(modulus + r < one, modulus - r >= one)
        }
        SearchRegion::OutsideUnitDisk => {
            let r = padded(modulus);
            decide(modulus - r > one, modulus + r <= one)
        }
        SearchRegion::UpperHalfPlane => {
            let r = padded(center.im);
            decide(center.im - r > zero, center.im + r <= zero)
        }
        SearchRegion::LowerHalfPlane => {
            let r = padded(center.im);
            decide(center.im + r < zero, center.im - r >= zero)
        }
        SearchRegion::LeftHalfPlane => {
            let r = padded(center.re);
            decide(center.re + r < zero, center.re - r >= zero)
        }
        SearchRegion::RightHalfPlane => {
            let r = padded(center.re);
            decide(center.re - r > zero, center.re + r <= zero)
        }
    }
}

/// Restarts each group of approximations as one node of multiplicity `m`.
///
/// The group's centroid is refined by `c <- c - m p(c)/p'(c)` while that
/// reduces the residual, then the members are spread evenly on a circle
/// around it, of radius at least `max(rel_floor |c|, abs_floor)`. The
/// distance each member moves is added to `moved`.
pub(crate) fn restart_groups<R: RealScalar>(
    model: &TierModel<R>,
    points: &mut [Complex<R>],
    moved: &mut [Dpe],
    groups: &[Vec<usize>],
    rel_floor: Dpe,
    abs_floor: Dpe,
) {
    let bits = model.bits();
    for members in groups.iter().filter(|g| g.len() > 1) {
        let m = members.len();
        let m_r = R::from_usize_at(m, bits);
        let mut center = members
            .iter()
            .fold(Complex::<R>::zero(), |acc, &k| acc + points[k].clone());
        center = Complex::new(center.re / m_r.clone(), center.im / m_r.clone());
        let spread = members
            .iter()
            .map(|&k| c_abs(&(points[k].clone() - center.clone())).to_dpe())
            .fold(Dpe::ZERO, Dpe::max);

        for _ in 0..CENTER_REFINEMENTS {
            let here = model.newton(&center);
            let Some(step) = here.correction() else {
                break;
            };
            let candidate = center.clone() - c_mul_real(&step, &m_r);
            let there = model.newton(&candidate);
            // keep a step only if it reduces the residual
            if !there.finite || c_taxicab(&there.num) >= c_taxicab(&here.num) {
                break;
            }
            center = candidate;
        }

        let radius = spread
            .max(rel_floor * c_abs(&center).to_dpe())
            .max(abs_floor);
        for (j, &k) in members.iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let angle = TAU * j as f64 / m as f64 + RESTART_ANGLE;
            let target = center.clone() + c_from_polar(radius, angle, bits);
            moved[k] += c_abs_bound(&(target.clone() - points[k].clone()));
            points[k] = target;
        }
        log::debug!("restarted cluster of {m} around radius {radius:.3}");
    }
}

#[cfg(test)]
mod test {
    use num::Complex;

    use super::{analyze, region_inclusion, restart_groups, AnalysisParams};
    use crate::{
        complex,
        equation::{EquationModel, Polynomial},
        precision::{BigFloat, Dpe, PrecisionLevel},
        roots::Inclusion,
        solver::context::SearchRegion,
    };

    fn pool() -> rayon::ThreadPool {
        rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap()
    }

    fn dpe(re: f64, im: f64) -> Complex<Dpe> {
        Complex::new(Dpe::from_f64(re), Dpe::from_f64(im))
    }

    #[test]
    fn separated_roots_are_isolated() {
        let model = EquationModel::from(Polynomial::from_reals(&[-1.0, 0.0, 1.0]).unwrap())
            .instantiate::<f64>(PrecisionLevel::STANDARD);
        let points = [complex!(1.0 + 1e-9), complex!(-1.0)];
        let pool = pool();
        let params = AnalysisParams {
            multiplicity_tolerance: Dpe::exp10(-10),
            region: SearchRegion::RightHalfPlane,
            pool: &pool,
        };
        let a = analyze(&model, &points, &[Dpe::INFINITY; 2], &[Dpe::ZERO; 2], &params);
        assert_eq!(a.components.len(), 2);
        assert!(a.radii[0] >= Dpe::from_f64(1e-9));
        assert!(a.radii[0] < Dpe::from_f64(1e-8));
        assert!(a.radii[1] < Dpe::from_f64(1e-14));
        assert_eq!(a.components[a.component_of[0]].inclusion, Inclusion::Inside);
        assert_eq!(a.components[a.component_of[1]].inclusion, Inclusion::Outside);
        assert!(a.suspected().is_empty());
    }

    #[test]
    fn radius_never_loosens() {
        let model = EquationModel::from(Polynomial::from_reals(&[-1.0, 0.0, 1.0]).unwrap())
            .instantiate::<f64>(PrecisionLevel::STANDARD);
        let points = [complex!(1.1), complex!(-1.0)];
        let pool = pool();
        let params = AnalysisParams {
            multiplicity_tolerance: Dpe::exp10(-10),
            region: SearchRegion::Everywhere,
            pool: &pool,
        };
        let previous = [Dpe::from_f64(1e-3), Dpe::from_f64(1e-3)];
        let moved = [Dpe::from_f64(1e-4), Dpe::ZERO];
        let a = analyze(&model, &points, &previous, &moved, &params);
        assert!(a.radii[0] <= previous[0] + moved[0]);
        assert!(a.radii[1] < Dpe::from_f64(1e-14));
    }

    #[test]
    fn triple_root_cluster() {
        // (x - 2)^3 at 128 bits, approximations a small symmetric triangle
        let level = PrecisionLevel::arbitrary(128);
        let model = EquationModel::from(Polynomial::from_reals(&[-8.0, 12.0, -6.0, 1.0]).unwrap())
            .instantiate::<BigFloat>(level);
        let delta = 1e-11;
        let points: Vec<Complex<BigFloat>> = (0..3)
            .map(|k| {
                let z = Complex::from_polar(delta, std::f64::consts::TAU * f64::from(k) / 3.0);
                Complex::new(
                    BigFloat::from_f64(2.0 + z.re).with_precision(128),
                    BigFloat::from_f64(z.im).with_precision(128),
                )
            })
            .collect();
        let pool = pool();
        let params = AnalysisParams {
            multiplicity_tolerance: Dpe::exp10(-10),
            region: SearchRegion::Everywhere,
            pool: &pool,
        };
        let a = analyze(&model, &points, &[Dpe::INFINITY; 3], &[Dpe::ZERO; 3], &params);
        assert_eq!(a.components.len(), 1);
        assert!(a.components[0].verified);
        assert!(a.radii.iter().all(|r| *r < Dpe::from_f64(1e-10)));
        for i in 0..3 {
            // every member's disk holds the root
            let d = Complex::new(points[i].re.to_f64() - 2.0, points[i].im.to_f64()).norm();
            assert!(Dpe::from_f64(d) <= a.radii[i]);
        }

        let loose = AnalysisParams {
            multiplicity_tolerance: Dpe::exp10(-20),
            ..params
        };
        let a = analyze(&model, &points, &[Dpe::INFINITY; 3], &[Dpe::ZERO; 3], &loose);
        assert_eq!(a.suspected(), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn coincident_points_have_no_radius() {
        let model = EquationModel::from(Polynomial::from_reals(&[-1.0, 0.0, 1.0]).unwrap())
            .instantiate::<f64>(PrecisionLevel::STANDARD);
        let points = [complex!(0.5), complex!(0.5)];
        let pool = pool();
        let params = AnalysisParams {
            multiplicity_tolerance: Dpe::exp10(-10),
            region: SearchRegion::Everywhere,
            pool: &pool,
        };
        let a = analyze(&model, &points, &[Dpe::INFINITY; 2], &[Dpe::ZERO; 2], &params);
        assert_eq!(a.components.len(), 1);
        assert!(!a.components[0].verified);
        assert!(!a.radii[0].is_finite());
    }

    #[test]
    fn regions() {
        let r = Dpe::from_f64(0.1);
        let inside = region_inclusion(SearchRegion::InsideUnitDisk, dpe(0.5, 0.0), r);
        assert_eq!(inside, Inclusion::Inside);
        let outside = region_inclusion(SearchRegion::InsideUnitDisk, dpe(0.0, 2.0), r);
        assert_eq!(outside, Inclusion::Outside);
        let unsure = region_inclusion(SearchRegion::InsideUnitDisk, dpe(0.95, 0.0), r);
        assert_eq!(unsure, Inclusion::Uncertain);
        assert_eq!(
            region_inclusion(SearchRegion::OutsideUnitDisk, dpe(0.0, 2.0), r),
            Inclusion::Inside
        );
        assert_eq!(
            region_inclusion(SearchRegion::UpperHalfPlane, dpe(3.0, -1.0), r),
            Inclusion::Outside
        );
        assert_eq!(
            region_inclusion(SearchRegion::LowerHalfPlane, dpe(3.0, -1.0), r),
            Inclusion::Inside
        );
        assert_eq!(
            region_inclusion(SearchRegion::LeftHalfPlane, dpe(0.05, 1.0), r),
            Inclusion::Uncertain
        );
        // a real root is on the boundary of a half plane, never inside it
        assert_eq!(
            region_inclusion(SearchRegion::UpperHalfPlane, dpe(1.0, 0.0), Dpe::ZERO),
            Inclusion::Outside
        );
        assert_eq!(
            region_inclusion(SearchRegion::RightHalfPlane, dpe(1.0, 0.0), Dpe::INFINITY),
            Inclusion::Uncertain
        );
        assert_eq!(
            region_inclusion(SearchRegion::Everywhere, dpe(1.0, 0.0), Dpe::INFINITY),
            Inclusion::Inside
        );
    }

    #[test]
    fn restart_spreads_around_refined_center() {
        let model = EquationModel::from(Polynomial::from_reals(&[4.0, -4.0, 1.0]).unwrap())
            .instantiate::<f64>(PrecisionLevel::STANDARD);
        // (x - 2)^2, both points off to one side
        let mut points = vec![complex!(2.01, 0.001), complex!(2.01, -0.001)];
        let mut moved = vec![Dpe::ZERO; 2];
        restart_groups(
            &model,
            &mut points,
            &mut moved,
            &[vec![0, 1]],
            Dpe::ONE.mul_pow2(-50),
            Dpe::ZERO,
        );
        let center = (points[0] + points[1]) / 2.0;
        // the double root Newton step lands on the root
        assert!((center - complex!(2.0)).norm() < 1e-12);
        assert!(((points[0] - center).norm() - 0.001).abs() < 1e-9);
        assert!(moved.iter().all(|m| *m > Dpe::from_f64(0.009)));
    }
}
