//! The controller: runs cycles at increasing precision until the goal is met
//! or the maximum precision is exhausted.
//!
//! The working state lives in one of three tier-specific [`Stage`]s, so the
//! numeric representation is fixed by type within a level. What outlives a
//! level, the radii and the bookkeeping, is kept in the [`Ledger`].

use std::ops::ControlFlow::{self, Break, Continue};

use num::{Complex, Zero};
use rayon::ThreadPool;

use crate::{
    equation::{EquationModel, TierModel},
    precision::{widen_complex, BigFloat, Dpe, PrecisionLevel, RealScalar, Tier, Widen},
    roots::{Cluster, Inclusion, Root, RootSet, RootStatus},
    solver::{
        aberth::{run_cycle, BreakReason, ContinueReason, CycleParams, CycleStats},
        cluster::{analyze, restart_groups, Analysis, AnalysisParams},
        context::{Algorithm, SolveContext},
        goal::{assess, Assessment, Origin},
        initial_guess::{newton_polygon, StartingPoint},
        regenerate::regenerate,
        FailureReason, Solution, SolveReport, SolveStatus,
    },
    util::complex::{c_from_f64, c_from_polar},
};

type Flow = ControlFlow<BreakReason, ContinueReason>;

/// Working state at one precision level.
struct Stage<R> {
    level: PrecisionLevel,
    points: Vec<Complex<R>>,
    /// The input equation at this level.
    original: TierModel<R>,
    /// The regenerated secular equation, when the generalized algorithm has
    /// one.
    iteration: Option<TierModel<R>>,
}

impl<R: RealScalar> Stage<R> {
    fn new(model: &EquationModel, level: PrecisionLevel, points: Vec<Complex<R>>) -> Self {
        Self {
            level,
            points,
            original: model.instantiate(level),
            iteration: None,
        }
    }

    fn values(&self) -> Vec<Complex<BigFloat>> {
        self.points
            .iter()
            .map(|z| Complex::new(z.re.to_big(), z.im.to_big()))
            .collect()
    }
}

enum Working {
    Standard(Stage<f64>),
    Extended(Stage<Dpe>),
    Arbitrary(Stage<BigFloat>),
}

impl Working {
    const fn level(&self) -> PrecisionLevel {
        match self {
            Self::Standard(s) => s.level,
            Self::Extended(s) => s.level,
            Self::Arbitrary(s) => s.level,
        }
    }

    fn values(&self) -> Vec<Complex<BigFloat>> {
        match self {
            Self::Standard(s) => s.values(),
            Self::Extended(s) => s.values(),
            Self::Arbitrary(s) => s.values(),
        }
    }

    fn iterate(&mut self, controller: &Controller<'_>, ledger: &mut Ledger) -> Flow {
        match self {
            Self::Standard(s) => controller.iterate(s, ledger),
            Self::Extended(s) => controller.iterate(s, ledger),
            Self::Arbitrary(s) => controller.iterate(s, ledger),
        }
    }

    /// Moves the approximations to `level`, losslessly.
    fn widen(self, model: &EquationModel, level: PrecisionLevel) -> Self {
        let bits = level.bits();
        match (self, level.tier()) {
            (Self::Standard(s), Tier::Extended) => {
                Self::Extended(Stage::new(model, level, widen_all(&s.points, bits)))
            }
            (Self::Standard(s), Tier::Arbitrary) => {
                Self::Arbitrary(Stage::new(model, level, widen_all(&s.points, bits)))
            }
            (Self::Extended(s), Tier::Arbitrary) => {
                Self::Arbitrary(Stage::new(model, level, widen_all(&s.points, bits)))
            }
            (Self::Arbitrary(s), Tier::Arbitrary) => {
                Self::Arbitrary(Stage::new(model, level, widen_all(&s.points, bits)))
            }
            // levels never decrease
            (working, _) => working,
        }
    }
}

fn widen_all<A: Widen<B>, B>(points: &[Complex<A>], bits: u32) -> Vec<Complex<B>> {
    points.iter().map(|z| widen_complex(z, bits)).collect()
}

/// What survives from one level to the next.
struct Ledger {
    radii: Vec<Dpe>,
    /// Distance moved since the last analysis.
    moved: Vec<Dpe>,
    /// Roots that could not be told apart when regenerating.
    ambiguous: Vec<bool>,
    analysis: Option<Analysis>,
    report: SolveReport,
}

impl Ledger {
    fn new(n: usize) -> Self {
        Self {
            radii: vec![Dpe::INFINITY; n],
            moved: vec![Dpe::ZERO; n],
            ambiguous: vec![false; n],
            analysis: None,
            report: SolveReport::default(),
        }
    }
}

enum Start<'a> {
    Polar(Vec<StartingPoint>),
    Poles(&'a [Complex<f64>]),
}

impl Start<'_> {
    fn points<R: RealScalar>(&self, bits: u32) -> Vec<Complex<R>> {
        match self {
            Self::Polar(polar) => polar
                .iter()
                .map(|p| c_from_polar(p.radius, p.angle, bits))
                .collect(),
            Self::Poles(poles) => poles.iter().map(|&b| c_from_f64(b, bits)).collect(),
        }
    }

    /// Whether every point is a normal `f64`.
    fn fits_standard(&self) -> bool {
        match self {
            Self::Polar(polar) => polar.iter().all(|p| {
                let r = p.radius.to_f64();
                r.is_finite() && r >= f64::MIN_POSITIVE
            }),
            Self::Poles(_) => true,
        }
    }
}

struct Controller<'a> {
    model: &'a EquationModel,
    ctx: &'a SolveContext,
    pool: &'a ThreadPool,
}

impl Controller<'_> {
    fn start(&self) -> Working {
        let ctx = self.ctx;
        let start = match self.model {
            EquationModel::Polynomial(p) => Start::Polar(newton_polygon(p.coeffs(), ctx.seed)),
            EquationModel::Secular(s) => Start::Poles(s.poles()),
        };
        let mut level = PrecisionLevel::first(ctx.starting_tier, ctx.max_precision_bits);
        if level.tier() == Tier::Standard && !start.fits_standard() {
            log::debug!("starting points out of range, starting at {}", PrecisionLevel::EXTENDED);
            level = PrecisionLevel::EXTENDED;
        }
        let bits = level.bits();
        match level.tier() {
            Tier::Standard => Working::Standard(Stage::new(self.model, level, start.points(bits))),
            Tier::Extended => Working::Extended(Stage::new(self.model, level, start.points(bits))),
            Tier::Arbitrary => Working::Arbitrary(Stage::new(self.model, level, start.points(bits))),
        }
    }

    fn cycle_params(&self, bits: u32, max_iterations: usize) -> CycleParams<'_> {
        CycleParams {
            max_iterations,
            tolerance: self.ctx.tolerance(),
            bits,
            pool: self.pool,
            cancel: &self.ctx.cancel,
        }
    }

    /// One level: restart suspected clusters, iterate, analyze.
    fn iterate<R: RealScalar>(&self, stage: &mut Stage<R>, ledger: &mut Ledger) -> Flow {
        let ctx = self.ctx;
        let bits = stage.level.bits();
        if let Some(analysis) = &ledger.analysis {
            let suspected = analysis.suspected();
            restart_groups(
                &stage.original,
                &mut stage.points,
                &mut ledger.moved,
                &suspected,
                Dpe::ONE.mul_pow2(3 - i64::from(bits)),
                Dpe::ZERO,
            );
        }

        let mut stats = CycleStats::default();
        let flow = match ctx.algorithm {
            Algorithm::Direct => run_cycle(
                &stage.original,
                &mut stage.points,
                &mut ledger.moved,
                &self.cycle_params(bits, ctx.max_iterations),
                &mut stats,
            ),
            Algorithm::Generalized => self.packets(stage, ledger, &mut stats),
        };
        ledger.report.iterations += stats.iterations;
        ledger.report.near_singular_recoveries += stats.near_singular;
        log::debug!(
            "{}: {flow:?} after {} iterations, {} near-singular",
            stage.level,
            stats.iterations,
            stats.near_singular
        );

        let analysis = analyze(
            &stage.original,
            &stage.points,
            &ledger.radii,
            &ledger.moved,
            &AnalysisParams {
                multiplicity_tolerance: ctx.multiplicity_tolerance(),
                region: ctx.search_region,
                pool: self.pool,
            },
        );
        ledger.radii.clone_from(&analysis.radii);
        ledger.moved.fill(Dpe::ZERO);
        ledger.analysis = Some(analysis);
        flow
    }

    /// Packets of iterations on a regenerated secular equation, until the
    /// level budget is spent.
    fn packets<R: RealScalar>(
        &self,
        stage: &mut Stage<R>,
        ledger: &mut Ledger,
        stats: &mut CycleStats,
    ) -> Flow {
        let ctx = self.ctx;
        let bits = stage.level.bits();
        let mut remaining = ctx.max_iterations;
        let mut fallback = false;
        loop {
            if !fallback {
                fallback = !self.regenerate(stage, ledger);
            }
            let budget = if fallback {
                remaining
            } else {
                remaining.min(ctx.packet_iterations)
            };
            let model = match (&stage.iteration, fallback) {
                (Some(secular), false) => secular,
                _ => &stage.original,
            };
            let before = stats.iterations;
            let flow = run_cycle(
                model,
                &mut stage.points,
                &mut ledger.moved,
                &self.cycle_params(bits, budget),
                stats,
            );
            remaining = remaining.saturating_sub(stats.iterations - before);
            match flow {
                Continue(ContinueReason::MaxIter) if remaining > 0 => {}
                flow => return flow,
            }
        }
    }

    /// Rebuilds the secular equation from the current approximations,
    /// restarting ambiguous groups and retrying once. Returns false if the
    /// approximations stay ambiguous, after marking them.
    fn regenerate<R: RealScalar>(&self, stage: &mut Stage<R>, ledger: &mut Ledger) -> bool {
        let bits = stage.level.bits();
        let result = regenerate(&stage.original, &stage.points, self.pool).or_else(|ambiguity| {
            log::debug!("{ambiguity}, restarting them");
            let floor = Dpe::ONE.mul_pow2(6 - i64::from(bits));
            let groups = ambiguity.groups(stage.points.len());
            restart_groups(
                &stage.original,
                &mut stage.points,
                &mut ledger.moved,
                &groups,
                floor,
                floor,
            );
            regenerate(&stage.original, &stage.points, self.pool)
        });
        match result {
            Ok(secular) => {
                stage.iteration = Some(secular);
                ledger.report.regenerations += 1;
                ledger.ambiguous.fill(false);
                true
            }
            Err(ambiguity) => {
                log::debug!("{ambiguity}, iterating on the input equation at this level");
                for i in ambiguity.members() {
                    ledger.ambiguous[i] = true;
                }
                stage.iteration = None;
                false
            }
        }
    }
}

/// Why the goal was missed at the maximum precision.
fn exhausted(assessment: Option<&Assessment>, ambiguous: &[bool]) -> FailureReason {
    let unresolved = assessment.is_some_and(|a| {
        a.verdicts
            .iter()
            .zip(ambiguous)
            .any(|(v, amb)| *amb && !v.guaranteed)
    });
    if unresolved {
        FailureReason::ClusterAmbiguity
    } else {
        FailureReason::InsufficientPrecision
    }
}

/// Solves `model`, whose degree is at least 1 and has no roots at the
/// origin if it is a polynomial. The roots at `origin`, factored out by the
/// caller, follow the iterated ones in the result.
pub(crate) fn run(model: &EquationModel, origin: Origin, ctx: &SolveContext, pool: &ThreadPool) -> Solution {
    let n = model.degree();
    let controller = Controller { model, ctx, pool };
    let mut ledger = Ledger::new(n);
    let mut working = controller.start();
    let mut assessment: Option<Assessment>;

    let status = loop {
        let level = working.level();
        ledger.report.levels.push(level);
        let flow = working.iterate(&controller, &mut ledger);
        let current = ledger
            .analysis
            .as_ref()
            .map(|a| assess(a, ctx.goal, ctx.tolerance(), &ledger.ambiguous, origin));
        let satisfied = current.as_ref().is_some_and(Assessment::satisfied);
        assessment = current;

        if flow == Break(BreakReason::Cancelled) || ctx.cancel.is_cancelled() {
            break SolveStatus::PartialFailure(FailureReason::CancelledByCaller);
        }
        if satisfied {
            break SolveStatus::Success;
        }
        let overflow = flow == Break(BreakReason::Overflow);
        let Some(next) = level.next(overflow, ctx.max_precision_bits) else {
            break SolveStatus::PartialFailure(exhausted(assessment.as_ref(), &ledger.ambiguous));
        };
        log::debug!("escalating from {level} to {next}");
        working = working.widen(model, next);
    };

    let mut values = working.values();
    values.extend((0..origin.multiplicity).map(|_| Complex::new(BigFloat::zero(), BigFloat::zero())));
    let (roots, clusters): (Vec<Root>, Vec<Cluster>) = match assessment {
        Some(a) => {
            let radii = ledger
                .radii
                .iter()
                .copied()
                .chain(std::iter::repeat(Dpe::ZERO));
            let roots = values
                .into_iter()
                .zip(a.verdicts)
                .zip(radii)
                .map(|((value, v), radius)| Root::new(value, radius, v.status, v.inclusion, v.guaranteed))
                .collect();
            (roots, a.clusters)
        }
        None => {
            let (origin_status, cluster) = origin.alone(0, n);
            let origin_met = origin.met(ctx.goal, false);
            let roots = values
                .into_iter()
                .enumerate()
                .map(|(i, value)| {
                    if i < n {
                        Root::new(value, Dpe::INFINITY, RootStatus::Unrefined, Inclusion::Uncertain, false)
                    } else {
                        Root::new(value, Dpe::ZERO, origin_status, origin.inclusion, origin_met)
                    }
                })
                .collect();
            (roots, cluster.into_iter().collect())
        }
    };

    if let SolveStatus::PartialFailure(reason) = status {
        let failed = roots.iter().filter(|r| !r.is_guaranteed()).count();
        log::warn!("{reason}: {failed} of {} roots not guaranteed", roots.len());
    }

    Solution {
        roots: RootSet::new(roots, clusters),
        status,
        report: ledger.report,
    }
}
