//! Solver interface for tailrisk.
//!
//! This module provides:
//! - The [`LpSolver`] trait any linear-program backend implements
//! - Normalized solve status and solution types
//! - Clarabel solver integration

pub mod clarabel;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::program::LinearProgram;

pub use self::clarabel::ClarabelSolver;

/// Normalized solution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LpStatus {
    /// Optimal solution found.
    Optimal,
    /// Problem is infeasible.
    Infeasible,
    /// Problem is unbounded.
    Unbounded,
    /// The solve-time bound was reached first.
    TimeLimit,
    /// Iteration limit, numerical difficulties or any other solver failure.
    SolverError,
}

impl fmt::Display for LpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LpStatus::Optimal => "optimal",
            LpStatus::Infeasible => "infeasible",
            LpStatus::Unbounded => "unbounded",
            LpStatus::TimeLimit => "time_limit",
            LpStatus::SolverError => "solver_error",
        };
        f.write_str(s)
    }
}

/// Outcome of a single solve.
#[derive(Debug, Clone)]
pub struct LpSolution {
    /// Solution status.
    pub status: LpStatus,
    /// Primal values (when optimal).
    pub x: Option<Vec<f64>>,
    /// Objective value `c' x` (when optimal).
    pub objective: Option<f64>,
    /// Solve time in seconds.
    pub solve_time: f64,
    /// Number of iterations.
    pub iterations: u32,
}

impl LpSolution {
    /// A solution carrying only a non-optimal status.
    pub fn failed(status: LpStatus, solve_time: f64, iterations: u32) -> Self {
        LpSolution {
            status,
            x: None,
            objective: None,
            solve_time,
            iterations,
        }
    }

    /// Primal values and objective, if the status is optimal.
    pub fn optimum(&self) -> Option<(&[f64], f64)> {
        match (self.status, &self.x, self.objective) {
            (LpStatus::Optimal, Some(x), Some(obj)) => Some((x.as_slice(), obj)),
            _ => None,
        }
    }
}

/// Solver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Print solver output.
    pub verbose: bool,
    /// Maximum iterations.
    pub max_iter: u32,
    /// Optional bound on solve time in seconds.
    pub time_limit: Option<f64>,
    /// Absolute duality gap tolerance.
    pub tol_gap_abs: f64,
    /// Relative duality gap tolerance.
    pub tol_gap_rel: f64,
    /// Feasibility tolerance.
    pub tol_feas: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            verbose: false,
            max_iter: 200,
            time_limit: None,
            tol_gap_abs: 1e-8,
            tol_gap_rel: 1e-8,
            tol_feas: 1e-8,
        }
    }
}

/// A linear-program backend.
///
/// Implementations receive the program as built and report a normalized
/// status. They must not retry or post-process the solution.
pub trait LpSolver {
    /// Solve `lp`.
    ///
    /// `Err` is reserved for problems setting up the solver itself; solver
    /// outcomes, including failures, are reported through [`LpSolution::status`].
    fn solve(&self, lp: &LinearProgram) -> Result<LpSolution>;

    /// The configured solve-time bound in seconds, if any.
    fn time_limit(&self) -> Option<f64> {
        None
    }
}

impl<S: LpSolver + ?Sized> LpSolver for &S {
    fn solve(&self, lp: &LinearProgram) -> Result<LpSolution> {
        (**self).solve(lp)
    }

    fn time_limit(&self) -> Option<f64> {
        (**self).time_limit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(!settings.verbose);
        assert_eq!(settings.max_iter, 200);
        assert!(settings.time_limit.is_none());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(LpStatus::Optimal.to_string(), "optimal");
        assert_eq!(LpStatus::SolverError.to_string(), "solver_error");
    }

    #[test]
    fn test_failed_solution_has_no_optimum() {
        let sol = LpSolution::failed(LpStatus::Infeasible, 0.1, 3);
        assert!(sol.optimum().is_none());
    }
}
