use std::ops::ControlFlow::{self, Break, Continue};

use num::{Complex, Zero};
use rayon::{prelude::*, ThreadPool};

use crate::{
    equation::TierModel,
    precision::{bound_to_dpe, Dpe, RealScalar},
    solver::context::CancelToken,
    util::{
        self,
        complex::{c_abs, c_from_polar, c_is_finite, c_recip, c_taxicab},
    },
};

/// Rotation of the perturbation applied at a near-singular correction.
const ROTATION_RADIANS: f64 = 0.925_024_5;

/// Fraction of the distance to the nearest approximation a perturbation
/// moves by.
const PERTURBATION_SCALE: f64 = 0.25;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ContinueReason {
    /// Every approximation froze.
    Converged,
    MaxIter,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BreakReason {
    /// A value left the range of the representation. Nothing was committed
    /// in the failing iteration.
    Overflow,
    Cancelled,
}

pub(crate) struct CycleParams<'a> {
    pub max_iterations: usize,
    /// `10^-digits`
    pub tolerance: Dpe,
    pub bits: u32,
    pub pool: &'a ThreadPool,
    pub cancel: &'a CancelToken,
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct CycleStats {
    pub iterations: usize,
    pub near_singular: usize,
}

enum Step<R> {
    Frozen,
    Move { delta: Complex<R>, converged: bool },
    Perturb(Complex<R>),
    Overflow,
}

/// Freezing thresholds, compared against squared moduli.
struct Criteria<R> {
    stagnation: R,
    goal: R,
}

/// One cycle of the Aberth iteration on `points`.
///
/// Every iteration computes the corrections of all active approximations
/// from the same snapshot on the worker pool, then commits them together, so
/// the result does not depend on the number of workers. An approximation
/// freezes once its correction is dominated by rounding errors, stagnates,
/// or is small enough for the requested digits; frozen approximations still
/// repel the others.
///
/// `moved[i]` accumulates an upper bound of how far approximation `i`
/// travelled.
pub(crate) fn run_cycle<R: RealScalar>(
    model: &TierModel<R>,
    points: &mut [Complex<R>],
    moved: &mut [Dpe],
    params: &CycleParams<'_>,
    stats: &mut CycleStats,
) -> ControlFlow<BreakReason, ContinueReason> {
    debug_assert_eq!(points.len(), model.degree());
    debug_assert_eq!(points.len(), moved.len());

    let n = points.len();
    let criteria = criteria::<R>(n, params);
    let mut frozen = vec![false; n];

    for i in util::iterator::saturating_counter() {
        if params.cancel.is_cancelled() {
            return Break(BreakReason::Cancelled);
        }
        if i >= params.max_iterations {
            return Continue(ContinueReason::MaxIter);
        }

        let snapshot: &[Complex<R>] = points;
        let steps: Vec<Step<R>> = params.pool.install(|| {
            (0..n)
                .into_par_iter()
                .map(|k| {
                    if frozen[k] {
                        Step::Frozen
                    } else {
                        correction(model, snapshot, k, &criteria, params.bits)
                    }
                })
                .collect()
        });
        stats.iterations += 1;

        if steps.iter().any(|s| matches!(s, Step::Overflow)) {
            log::debug!("overflow in iteration {i}");
            return Break(BreakReason::Overflow);
        }
        for (k, step) in steps.into_iter().enumerate() {
            let delta = match step {
                Step::Frozen | Step::Overflow => continue,
                Step::Move { delta, converged } => {
                    frozen[k] = converged;
                    delta
                }
                Step::Perturb(delta) => {
                    stats.near_singular += 1;
                    delta
                }
            };
            moved[k] += bound_to_dpe(&c_taxicab(&delta));
            points[k] = points[k].clone() - delta;
        }

        let active = frozen.iter().filter(|f| !**f).count();
        log::trace!("iteration {i}: {active} of {n} active");
        if active == 0 {
            return Continue(ContinueReason::Converged);
        }
    }
    Continue(ContinueReason::MaxIter)
}

fn criteria<R: RealScalar>(n: usize, params: &CycleParams<'_>) -> Criteria<R> {
    let four_u = R::unit_roundoff(params.bits).mul_pow2(2);
    // n |Δ| <= tol |x| / 4
    let scaled = R::from_dpe_at(params.tolerance, params.bits) / R::from_usize_at(4 * n, params.bits);
    Criteria {
        stagnation: four_u.clone() * four_u,
        goal: scaled.clone() * scaled,
    }
}

fn correction<R: RealScalar>(
    model: &TierModel<R>,
    points: &[Complex<R>],
    i: usize,
    criteria: &Criteria<R>,
    bits: u32,
) -> Step<R> {
    let x = &points[i];
    let q = model.newton(x);
    if !q.finite {
        return Step::Overflow;
    }
    if q.num.is_zero() {
        return Step::Move {
            delta: Complex::zero(),
            converged: true,
        };
    }

    let mut repulsion = Complex::<R>::zero();
    for (k, y) in points.iter().enumerate() {
        if k == i {
            continue;
        }
        match c_recip(&(x.clone() - y.clone())) {
            Some(inv) => repulsion = repulsion + inv,
            None => return Step::Perturb(perturbation(points, i, bits)),
        }
    }
    // Δ = N / (1 - N Σ) with N = num/den
    let den = q.den - q.num.clone() * repulsion.clone();
    if den.is_zero() || !c_is_finite(&repulsion) {
        return Step::Perturb(perturbation(points, i, bits));
    }
    let delta = q.num / den;
    if !c_is_finite(&delta) {
        return Step::Perturb(perturbation(points, i, bits));
    }

    let dn = delta.norm_sqr();
    let xn = x.norm_sqr();
    let converged = q.dominated
        || dn <= xn.clone() * criteria.stagnation.clone()
        || dn <= xn * criteria.goal.clone();
    Step::Move { delta, converged }
}

/// Bounded move for an approximation whose correction is singular: a
/// fraction of the distance to its nearest neighbour, at a fixed rotation.
fn perturbation<R: RealScalar>(points: &[Complex<R>], i: usize, bits: u32) -> Complex<R> {
    let x = &points[i];
    let nearest = points
        .iter()
        .enumerate()
        .filter(|(k, _)| *k != i)
        .map(|(_, y)| c_abs(&(x.clone() - y.clone())).to_dpe())
        .filter(|d| !d.is_zero())
        .reduce(Dpe::min);
    let scale = nearest.map_or_else(
        || {
            // coincident points: a relative step at half the precision
            (c_abs(x).to_dpe() + Dpe::ONE).mul_pow2(-i64::from(bits / 2))
        },
        |d| d * Dpe::from_f64(PERTURBATION_SCALE),
    );
    #[allow(clippy::cast_precision_loss)]
    let angle = ROTATION_RADIANS * (i + 1) as f64;
    c_from_polar(scale, angle, bits)
}
