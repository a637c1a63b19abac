//! Certified root finding for polynomials and secular equations.
//!
//! [`solve`] approximates all roots of an [`EquationModel`] with the
//! Aberth iteration, and encloses each approximation in a disk guaranteed to
//! contain a root. It starts in `f64` and moves to wider representations
//! only when the requested digits call for it.
//!
//! ```
//! use secsolve::{complex, solve, EquationModel, Goal, Polynomial, SolveContext};
//!
//! // (x - 2)^3
//! let p = Polynomial::from_reals(&[-8.0, 12.0, -6.0, 1.0]).unwrap();
//! let ctx = SolveContext::default().with_goal(Goal::Isolate);
//! let solution = solve(&EquationModel::from(p), &ctx).unwrap();
//! assert!(solution.status.is_success());
//! assert_eq!(solution.roots.clusters()[0].multiplicity(), 3);
//! for root in &solution.roots {
//!     assert!(root.contains(complex!(2.0)));
//! }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod equation;
mod error;
mod precision;
mod roots;
mod solver;
mod util;

pub use equation::{EquationModel, Polynomial, SecularEquation, TierModel};
pub use error::{Error, Result};
pub use num::Complex;
pub use precision::{
    BigFloat, Dpe, PrecisionLevel, RealScalar, Tier, Widen, EXACT_FALLBACK_BITS,
    FIRST_ARBITRARY_BITS, MIN_MAX_BITS,
};
pub use roots::{Cluster, Inclusion, Root, RootSet, RootStatus};
pub use solver::{
    solve, Algorithm, CancelToken, FailureReason, Goal, SearchRegion, Solution, SolveContext,
    SolveReport, SolveStatus,
};

// hidden, only for integration tests and benches
#[doc(hidden)]
pub use util::__testing;

/// Shorthand for a complex literal, a real one if the imaginary part is
/// omitted.
///
/// ```
/// use secsolve::{complex, Complex};
///
/// assert_eq!(complex!(1.0), Complex::new(1.0, 0.0));
/// assert_eq!(complex!(1.0, -2.0), Complex::new(1.0, -2.0));
/// ```
#[macro_export]
macro_rules! complex {
    ($re:expr) => {
        $crate::Complex::new($re, 0.0)
    };
    ($re:expr, $im:expr) => {
        $crate::Complex::new($re, $im)
    };
}
