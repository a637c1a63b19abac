//! Soundness and reproducibility over seeded random cases.
//!
//! The Gaussian integer cases expand exactly, so every returned disk can be
//! checked against the true roots.

use secsolve::{
    __testing::{
        check_roots, test_case_multiple_roots, test_case_roots, RandStreamC64Polar,
        RandStreamGaussian,
    },
    solve, Goal, Solution, SolveContext,
};

fn assert_sound(solution: &Solution, expected: &[num::complex::Complex64], i: usize) {
    assert_eq!(solution.roots.len(), expected.len(), "@ {i}");
    for root in &solution.roots {
        assert!(
            expected.iter().any(|z| root.contains(*z)),
            "@ {i}: {root} contains none of {expected:?}"
        );
    }
}

#[test]
fn gaussian_disks_contain_roots() {
    let _ = simple_logger::init_with_level(log::Level::Debug);
    let mut roots_stream = RandStreamGaussian::new(1, 3);
    let ctx = SolveContext::default().with_digits(12);
    for deg in 2..=6 {
        for i in 0..40 {
            let (model, expected_roots) = test_case_roots(&mut roots_stream, deg);
            let solution = solve(&model, &ctx).unwrap();
            assert_sound(&solution, &expected_roots, i);
        }
    }
}

#[test]
fn gaussian_multiple_roots_isolate() {
    let _ = simple_logger::init_with_level(log::Level::Debug);
    let mut roots_stream = RandStreamGaussian::new(2, 4);
    let ctx = SolveContext::default().with_goal(Goal::Isolate);
    for i in 0..40 {
        let (model, expected_roots) = test_case_multiple_roots(&mut roots_stream, 5, 3);
        let solution = solve(&model, &ctx).unwrap();
        assert_sound(&solution, &expected_roots, i);
        if solution.status.is_success() {
            let triple = expected_roots[0];
            let clustered = solution
                .roots
                .iter()
                .filter(|r| r.contains(triple))
                .count();
            assert!(clustered >= 3, "@ {i}: only {clustered} disks hold {triple}");
        }
    }
}

#[test]
fn worker_count_invariance() {
    let _ = simple_logger::init_with_level(log::Level::Debug);
    let mut roots_stream = RandStreamC64Polar::new(3, 0.5, 5.0);
    for i in 0..20 {
        let (model, expected_roots) = test_case_roots(&mut roots_stream, 7);
        let one = solve(&model, &SolveContext::default().with_workers(1)).unwrap();
        let three = solve(&model, &SolveContext::default().with_workers(3)).unwrap();
        assert_eq!(one.status, three.status, "@ {i}");
        assert_eq!(one.report, three.report, "@ {i}");
        for (a, b) in one.roots.iter().zip(&three.roots) {
            assert_eq!(a.value(), b.value(), "@ {i}");
            assert_eq!(a.radius(), b.radius(), "@ {i}");
        }
        assert!(
            check_roots(one.roots.values_f64(), expected_roots.clone(), 1E-6),
            "@ {i}: {:?} != {expected_roots:?}",
            one.roots.values_f64()
        );
    }
}
