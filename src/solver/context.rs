use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::{
    error::{Error, Result},
    precision::{Dpe, Tier, MIN_MAX_BITS},
};

/// How the equation is iterated on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Algorithm {
    /// Aberth iteration on the input equation.
    #[default]
    Direct,
    /// Aberth iteration on a secular equation whose poles are the current
    /// approximations, rebuilt between packets of iterations.
    Generalized,
}

/// What the solve has to establish before it stops.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Goal {
    /// Every relevant root to the requested relative accuracy.
    #[default]
    Approximate,
    /// Every relevant root isolated, or identified as a multiple root.
    Isolate,
    /// Every root known to be inside or outside the search region.
    Count,
}

/// Where the caller is interested in roots. Roots certainly outside are
/// exempt from the goal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum SearchRegion {
    #[default]
    Everywhere,
    /// `|z| < 1`
    InsideUnitDisk,
    /// `|z| > 1`
    OutsideUnitDisk,
    /// `Im z > 0`
    UpperHalfPlane,
    /// `Im z < 0`
    LowerHalfPlane,
    /// `Re z < 0`
    LeftHalfPlane,
    /// `Re z > 0`
    RightHalfPlane,
}

/// Shared flag to stop a running solve.
///
/// The engine checks it between iterations and returns what it has.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Options of one solve.
///
/// ```
/// use secsolve::{Algorithm, Goal, SolveContext};
///
/// let ctx = SolveContext::default()
///     .with_digits(30)
///     .with_goal(Goal::Isolate)
///     .with_algorithm(Algorithm::Generalized)
///     .with_workers(4);
/// assert!(ctx.validate().is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct SolveContext {
    pub algorithm: Algorithm,
    pub starting_tier: Tier,
    /// Requested correct digits, relative to each root's modulus.
    pub digits: u32,
    pub goal: Goal,
    pub search_region: SearchRegion,
    /// Worker threads used to compute corrections.
    pub workers: usize,
    /// If set, the equation must have this degree.
    pub degree: Option<usize>,
    /// Iteration budget of each precision level.
    pub max_iterations: usize,
    /// Iterations between regenerations of the generalized algorithm.
    pub packet_iterations: usize,
    /// Precision beyond which the solve gives up.
    pub max_precision_bits: u32,
    /// Relative tightness, in digits, a cluster needs to count as a multiple
    /// root. Defaults to `digits`.
    pub multiplicity_digits: Option<u32>,
    /// Seed of the starting point perturbation.
    pub seed: u64,
    pub cancel: CancelToken,
}

impl Default for SolveContext {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            starting_tier: Tier::Standard,
            digits: 10,
            goal: Goal::default(),
            search_region: SearchRegion::default(),
            workers: 1,
            degree: None,
            max_iterations: 200,
            packet_iterations: 20,
            max_precision_bits: 4096,
            multiplicity_digits: None,
            seed: 0x5ec5_01e,
            cancel: CancelToken::default(),
        }
    }
}

impl SolveContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    #[must_use]
    pub fn with_starting_tier(mut self, tier: Tier) -> Self {
        self.starting_tier = tier;
        self
    }

    #[must_use]
    pub fn with_digits(mut self, digits: u32) -> Self {
        self.digits = digits;
        self
    }

    #[must_use]
    pub fn with_goal(mut self, goal: Goal) -> Self {
        self.goal = goal;
        self
    }

    #[must_use]
    pub fn with_search_region(mut self, region: SearchRegion) -> Self {
        self.search_region = region;
        self
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub fn with_degree(mut self, degree: usize) -> Self {
        self.degree = Some(degree);
        self
    }

    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    #[must_use]
    pub fn with_packet_iterations(mut self, packet_iterations: usize) -> Self {
        self.packet_iterations = packet_iterations;
        self
    }

    #[must_use]
    pub fn with_max_precision_bits(mut self, bits: u32) -> Self {
        self.max_precision_bits = bits;
        self
    }

    #[must_use]
    pub fn with_multiplicity_digits(mut self, digits: u32) -> Self {
        self.multiplicity_digits = Some(digits);
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// # Errors
    /// - `InvalidContext` naming the first option out of range.
    pub fn validate(&self) -> Result<()> {
        if self.digits == 0 {
            return Err(Error::InvalidContext("digits must be at least 1"));
        }
        if self.multiplicity_digits == Some(0) {
            return Err(Error::InvalidContext(
                "multiplicity digits must be at least 1",
            ));
        }
        if self.workers == 0 {
            return Err(Error::InvalidContext("workers must be at least 1"));
        }
        if self.max_iterations == 0 {
            return Err(Error::InvalidContext("iteration budget must be positive"));
        }
        if self.packet_iterations == 0 {
            return Err(Error::InvalidContext("packet size must be positive"));
        }
        if self.max_precision_bits < MIN_MAX_BITS {
            return Err(Error::InvalidContext(
                "maximum precision must be at least 64 bits",
            ));
        }
        Ok(())
    }

    /// `10^-digits`, the relative radius the approximate goal asks for.
    pub(crate) fn tolerance(&self) -> Dpe {
        Dpe::exp10(-i32::try_from(self.digits).unwrap_or(i32::MAX))
    }

    /// Relative radius below which a cluster counts as a multiple root.
    pub(crate) fn multiplicity_tolerance(&self) -> Dpe {
        let digits = self.multiplicity_digits.unwrap_or(self.digits);
        Dpe::exp10(-i32::try_from(digits).unwrap_or(i32::MAX))
    }
}

#[cfg(test)]
mod test {
    use super::{CancelToken, SolveContext};
    use crate::error::Error;

    #[test]
    fn defaults_are_valid() {
        assert!(SolveContext::default().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range() {
        let bad = [
            SolveContext::new().with_digits(0),
            SolveContext::new().with_workers(0),
            SolveContext::new().with_max_precision_bits(32),
            SolveContext::new().with_max_iterations(0),
            SolveContext::new().with_packet_iterations(0),
            SolveContext::new().with_multiplicity_digits(0),
        ];
        for ctx in bad {
            assert!(matches!(ctx.validate(), Err(Error::InvalidContext(_))), "{ctx:?}");
        }
    }

    #[test]
    fn tolerances() {
        let ctx = SolveContext::new().with_digits(20);
        assert!((ctx.tolerance().to_f64() / 1e-20 - 1.0).abs() < 1e-12);
        let ctx = ctx.with_multiplicity_digits(5);
        assert!((ctx.multiplicity_tolerance().to_f64() / 1e-5 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn cancel_is_shared() {
        let token = CancelToken::new();
        let ctx = SolveContext::new().with_cancel_token(token.clone());
        assert!(!ctx.cancel.is_cancelled());
        token.cancel();
        assert!(ctx.cancel.is_cancelled());
    }
}
