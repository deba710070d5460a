//! Optimizer behavior against scripted solver backends.
//!
//! A scripted backend returns a fixed outcome, which lets these tests drive
//! every status and post-check path without depending on a real solver.

use std::cell::Cell;

use tailrisk::prelude::*;

/// Backend that replays one outcome and counts calls.
struct ScriptedSolver {
    outcome: fn(&LinearProgram) -> LpSolution,
    time_limit: Option<f64>,
    calls: Cell<usize>,
}

impl ScriptedSolver {
    fn new(outcome: fn(&LinearProgram) -> LpSolution) -> Self {
        ScriptedSolver {
            outcome,
            time_limit: None,
            calls: Cell::new(0),
        }
    }
}

impl LpSolver for ScriptedSolver {
    fn solve(&self, lp: &LinearProgram) -> Result<LpSolution> {
        self.calls.set(self.calls.get() + 1);
        Ok((self.outcome)(lp))
    }

    fn time_limit(&self) -> Option<f64> {
        self.time_limit
    }
}

fn returns() -> ReturnsMatrix {
    ReturnsMatrix::from_rows(
        &[
            vec![0.02, -0.01],
            vec![-0.03, 0.01],
            vec![0.01, 0.00],
            vec![-0.02, 0.02],
        ],
        ["A", "B"],
    )
    .unwrap()
}

/// An "optimal" solution with the given weights, `v = 0`, `z = 0`.
fn optimal_with_weights(lp: &LinearProgram, weights: &[f64], objective: f64) -> LpSolution {
    let mut x = weights.to_vec();
    x.resize(lp.n_vars(), 0.0);
    LpSolution {
        status: LpStatus::Optimal,
        x: Some(x),
        objective: Some(objective),
        solve_time: 0.0,
        iterations: 1,
    }
}

#[test]
fn test_non_optimal_statuses_are_surfaced() {
    let cases: [(LpStatus, fn(&LinearProgram) -> LpSolution); 3] = [
        (LpStatus::Infeasible, |_| LpSolution::failed(LpStatus::Infeasible, 0.0, 5)),
        (LpStatus::Unbounded, |_| LpSolution::failed(LpStatus::Unbounded, 0.0, 5)),
        (LpStatus::SolverError, |_| LpSolution::failed(LpStatus::SolverError, 0.0, 5)),
    ];

    for (expected, outcome) in cases {
        let solver = ScriptedSolver::new(outcome);
        let err = CvarOptimizer::new(&solver).optimize(&returns(), 0.9).unwrap_err();
        match err {
            TailRiskError::Optimization { status } => assert_eq!(status, expected),
            other => panic!("expected optimization error for {}, got {:?}", expected, other),
        }
        // No retry.
        assert_eq!(solver.calls.get(), 1);
    }
}

#[test]
fn test_time_limit_becomes_timeout() {
    let mut solver = ScriptedSolver::new(|_| LpSolution::failed(LpStatus::TimeLimit, 2.5, 40));
    solver.time_limit = Some(2.5);

    let err = CvarOptimizer::new(&solver).optimize(&returns(), 0.9).unwrap_err();
    match err {
        TailRiskError::Timeout { limit_secs } => assert_eq!(limit_secs, 2.5),
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[test]
fn test_weights_not_summing_to_one_are_rejected() {
    let solver = ScriptedSolver::new(|lp| optimal_with_weights(lp, &[0.7, 0.7], 0.01));
    let err = CvarOptimizer::new(&solver).optimize(&returns(), 0.9).unwrap_err();
    assert!(matches!(err, TailRiskError::NumericConsistency(_)), "got {:?}", err);
}

#[test]
fn test_short_weights_are_rejected() {
    let solver = ScriptedSolver::new(|lp| optimal_with_weights(lp, &[1.5, -0.5], 0.01));
    let err = CvarOptimizer::new(&solver).optimize(&returns(), 0.9).unwrap_err();
    assert!(matches!(err, TailRiskError::NumericConsistency(_)), "got {:?}", err);
}

#[test]
fn test_optimal_without_solution_is_rejected() {
    let solver = ScriptedSolver::new(|_| LpSolution {
        status: LpStatus::Optimal,
        x: None,
        objective: None,
        solve_time: 0.0,
        iterations: 3,
    });
    let err = CvarOptimizer::new(&solver).optimize(&returns(), 0.9).unwrap_err();
    assert!(matches!(err, TailRiskError::NumericConsistency(_)), "got {:?}", err);
}

#[test]
fn test_truncated_solution_is_rejected() {
    let solver = ScriptedSolver::new(|_| LpSolution {
        status: LpStatus::Optimal,
        x: Some(vec![0.5, 0.5]),
        objective: Some(0.0),
        solve_time: 0.0,
        iterations: 3,
    });
    let err = CvarOptimizer::new(&solver).optimize(&returns(), 0.9).unwrap_err();
    assert!(matches!(err, TailRiskError::NumericConsistency(_)), "got {:?}", err);
}

#[test]
fn test_weights_are_not_renormalized() {
    // Within tolerance: passed through untouched.
    let solver = ScriptedSolver::new(|lp| optimal_with_weights(lp, &[0.4 + 4e-7, 0.6], 0.01));
    let result = CvarOptimizer::new(&solver).optimize(&returns(), 0.9).unwrap();
    assert_eq!(result.weights, vec![0.4 + 4e-7, 0.6]);
    assert_eq!(result.var, 0.0);
    // Only observation 1 loses: 2.5 * 0.00600001
    assert!((result.cvar - 0.015).abs() < 1e-6, "CVaR {}", result.cvar);
    assert_eq!(result.alpha, 0.9);
}

#[test]
fn test_cvar_recomputed_from_weights_and_var() {
    // Tail shorter than one observation: slack noise is scaled by 2500 in c'x.
    let solver = ScriptedSolver::new(|lp| {
        let mut x = vec![0.5, 0.5, 0.01];
        x.resize(lp.n_vars(), -1e-3);
        LpSolution {
            status: LpStatus::Optimal,
            x: Some(x),
            objective: Some(-9.99),
            solve_time: 0.0,
            iterations: 12,
        }
    });
    let result = CvarOptimizer::new(&solver).optimize(&returns(), 0.9999).unwrap();

    // v sits at the worst loss (observation 1), so CVaR equals VaR.
    assert_eq!(result.var, 0.01);
    assert!((result.cvar - 0.01).abs() < 1e-12, "CVaR {}", result.cvar);
    assert!(result.cvar >= result.var);
}

#[test]
fn test_custom_tolerance() {
    let solver = ScriptedSolver::new(|lp| optimal_with_weights(lp, &[0.401, 0.6], 0.01));
    let optimizer = CvarOptimizer::new(&solver);
    assert!(optimizer.optimize(&returns(), 0.9).is_err());

    let relaxed = CvarOptimizer::new(&solver).with_tolerance(1e-2);
    assert!(relaxed.optimize(&returns(), 0.9).is_ok());
}

#[test]
fn test_invalid_alpha_never_reaches_solver() {
    let solver = ScriptedSolver::new(|lp| optimal_with_weights(lp, &[0.5, 0.5], 0.01));
    let err = CvarOptimizer::new(&solver).optimize(&returns(), 1.0).unwrap_err();
    assert!(matches!(err, TailRiskError::Configuration(_)));
    assert_eq!(solver.calls.get(), 0);
}

#[test]
fn test_nan_input_fails_before_solver() {
    let solver = ScriptedSolver::new(|lp| optimal_with_weights(lp, &[0.5, 0.5], 0.01));
    let optimizer = CvarOptimizer::new(&solver);

    let outcome = ReturnsMatrix::from_rows(
        &[vec![0.01, f64::NAN], vec![0.02, 0.01], vec![-0.01, 0.0]],
        ["A", "B"],
    )
    .and_then(|m| optimizer.optimize(&m, 0.95));

    assert!(matches!(outcome, Err(TailRiskError::Data(_))));
    assert_eq!(solver.calls.get(), 0);
}

#[test]
fn test_program_handed_to_solver() {
    let solver = ScriptedSolver::new(|lp| {
        // N + 1 + T variables and 2T + N + 1 rows for the 4 x 2 sample
        assert_eq!(lp.n_vars(), 7);
        assert_eq!(lp.n_constraints(), 11);
        optimal_with_weights(lp, &[0.5, 0.5], 0.01)
    });
    CvarOptimizer::new(&solver).optimize(&returns(), 0.9).unwrap();
    assert_eq!(solver.calls.get(), 1);
}
