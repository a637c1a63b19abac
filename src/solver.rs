//! The root-finding engine.

use std::fmt;

use num::{Complex, Zero};

use crate::{
    equation::EquationModel,
    error::{Error, Result},
    precision::{BigFloat, Dpe, PrecisionLevel},
    roots::{Root, RootSet},
    util::doc_macros::errors_solve,
};

mod aberth;
mod cluster;
mod context;
mod escalation;
mod goal;
mod initial_guess;
mod regenerate;

pub use context::{Algorithm, CancelToken, Goal, SearchRegion, SolveContext};
use goal::Origin;

/// Why a solve returned before meeting its goal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FailureReason {
    /// The maximum precision was reached.
    InsufficientPrecision,
    /// The caller cancelled the solve.
    CancelledByCaller,
    /// Some approximations stayed indistinguishable at the maximum
    /// precision, so the secular equation could not be rebuilt around them.
    ClusterAmbiguity,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientPrecision => write!(f, "maximum precision exhausted"),
            Self::CancelledByCaller => write!(f, "cancelled"),
            Self::ClusterAmbiguity => write!(f, "ambiguous clusters"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SolveStatus {
    /// Every root meets the goal.
    Success,
    /// The roots are the best available; those that do not meet the goal
    /// have [`Root::is_guaranteed`] false.
    PartialFailure(FailureReason),
}

impl SolveStatus {
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Counters of one solve.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SolveReport {
    /// Precision levels in the order they were used.
    pub levels: Vec<PrecisionLevel>,
    pub iterations: usize,
    pub regenerations: usize,
    /// Corrections replaced by a bounded perturbation because they were
    /// singular.
    pub near_singular_recoveries: usize,
}

#[derive(Clone, Debug)]
pub struct Solution {
    pub roots: RootSet,
    pub status: SolveStatus,
    pub report: SolveReport,
}

/// Finds all roots of `model`, each with a disk guaranteed to contain a
/// root.
///
/// Roots that cannot be brought to the requested goal are still returned,
/// with their best radius, and the status says why the solve stopped.
///
/// # Errors
#[doc = errors_solve!()]
///
/// # Examples
/// ```
/// use secsolve::{solve, EquationModel, Polynomial, SolveContext};
///
/// let p = Polynomial::from_reals(&[-1.0, 0.0, 1.0]).unwrap();
/// let solution = solve(&EquationModel::from(p), &SolveContext::default()).unwrap();
/// assert!(solution.status.is_success());
/// assert_eq!(solution.roots.len(), 2);
/// ```
pub fn solve(model: &EquationModel, ctx: &SolveContext) -> Result<Solution> {
    ctx.validate()?;
    let n = model.degree();
    if let Some(stated) = ctx.degree {
        if stated != n {
            return Err(Error::DegreeMismatch { stated, actual: n });
        }
    }
    if n == 0 {
        return Err(Error::DegenerateModel);
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(ctx.workers)
        .build()?;

    let (reduced, zeros) = model.deflate_zero_roots();
    log::debug!("solving degree {n}, {zeros} roots at the origin");
    let origin = Origin {
        multiplicity: zeros,
        inclusion: cluster::region_inclusion(ctx.search_region, Complex::new(Dpe::ZERO, Dpe::ZERO), Dpe::ZERO),
    };
    if reduced.degree() == 0 {
        return Ok(only_zero_roots(origin, ctx.goal));
    }
    Ok(escalation::run(&reduced, origin, ctx, &pool))
}

/// The solution of `c x^k`.
fn only_zero_roots(origin: Origin, goal: Goal) -> Solution {
    let (status, cluster) = origin.alone(0, 0);
    let guaranteed = origin.met(goal, true);
    let roots = (0..origin.multiplicity)
        .map(|_| {
            Root::new(
                Complex::new(BigFloat::zero(), BigFloat::zero()),
                Dpe::ZERO,
                status,
                origin.inclusion,
                guaranteed,
            )
        })
        .collect();
    Solution {
        roots: RootSet::new(roots, cluster.into_iter().collect()),
        status: SolveStatus::Success,
        report: SolveReport::default(),
    }
}
