//! Minimum-CVaR portfolio optimization.
//!
//! [`CvarOptimizer`] owns the build, solve and extract sequence:
//!
//! ```ignore
//! let optimizer = CvarOptimizer::default();
//! let result = optimizer.optimize(&returns, 0.95)?;
//! println!("VaR {:.4}, CVaR {:.4}", result.var, result.cvar);
//! ```
//!
//! A solver that reports success is not taken at its word: the weights are
//! re-checked against the simplex constraints before a result is returned.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, TailRiskError};
use crate::program::{CvarProgram, CvarProgramBuilder};
use crate::returns::ReturnsMatrix;
use crate::solver::{ClarabelSolver, LpSolution, LpSolver, LpStatus};

/// Default tolerance for the post-solve checks.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Solver statistics attached to a result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolveStats {
    /// Solver iterations.
    pub iterations: u32,
    /// Wall-clock solve time in seconds.
    pub solve_time: f64,
}

/// Optimal allocation with its tail-risk figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Asset identifiers, aligned with `weights`.
    pub asset_ids: Vec<String>,
    /// Optimal weights (long-only, summing to one).
    pub weights: Vec<f64>,
    /// Value at Risk of the optimal portfolio at `alpha`.
    pub var: f64,
    /// Conditional Value at Risk of the optimal portfolio at `alpha`.
    pub cvar: f64,
    /// Confidence level.
    pub alpha: f64,
    /// Solver statistics.
    pub stats: SolveStats,
}

impl OptimizationResult {
    /// Weights keyed by asset identifier, in column order.
    pub fn weights_by_asset(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.asset_ids
            .iter()
            .map(String::as_str)
            .zip(self.weights.iter().copied())
    }

    /// Weight of a single asset.
    pub fn weight(&self, asset_id: &str) -> Option<f64> {
        self.weights_by_asset()
            .find(|(id, _)| *id == asset_id)
            .map(|(_, w)| w)
    }
}

/// Minimum-CVaR optimizer over a pluggable LP backend.
#[derive(Debug, Clone)]
pub struct CvarOptimizer<S = ClarabelSolver> {
    solver: S,
    tolerance: f64,
}

impl Default for CvarOptimizer<ClarabelSolver> {
    fn default() -> Self {
        CvarOptimizer::new(ClarabelSolver::default())
    }
}

impl<S: LpSolver> CvarOptimizer<S> {
    /// Create an optimizer using `solver`.
    pub fn new(solver: S) -> Self {
        CvarOptimizer {
            solver,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    /// Set the tolerance used by the post-solve checks.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// The LP backend.
    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Find the long-only, fully invested weights minimizing CVaR at `alpha`.
    ///
    /// # Errors
    ///
    /// - [`TailRiskError::Configuration`] if `alpha` is outside `(0, 1)`.
    /// - [`TailRiskError::Optimization`] if the solver status is not optimal.
    /// - [`TailRiskError::Timeout`] if the solve-time bound was reached.
    /// - [`TailRiskError::NumericConsistency`] if an optimal solution fails the
    ///   simplex or `cvar >= var` checks.
    pub fn optimize(&self, returns: &ReturnsMatrix, alpha: f64) -> Result<OptimizationResult> {
        let program = CvarProgramBuilder::new(alpha)?.build(returns);

        info!(
            "Optimizing CVaR at alpha = {} over {} observations and {} assets",
            alpha,
            returns.n_obs(),
            returns.n_assets()
        );

        let solution = self.solver.solve(&program.lp)?;
        let result = self.extract(returns, &program, &solution)?;

        info!(
            "Optimal VaR = {:.6}, CVaR = {:.6} ({} iterations)",
            result.var, result.cvar, result.stats.iterations
        );
        Ok(result)
    }

    fn extract(
        &self,
        returns: &ReturnsMatrix,
        program: &CvarProgram,
        solution: &LpSolution,
    ) -> Result<OptimizationResult> {
        match solution.status {
            LpStatus::Optimal => {}
            LpStatus::TimeLimit => {
                return Err(TailRiskError::Timeout {
                    limit_secs: self.solver.time_limit().unwrap_or(solution.solve_time),
                });
            }
            status => {
                warn!("Solver returned non-optimal status: {}", status);
                return Err(TailRiskError::Optimization { status });
            }
        }

        let (x, objective) = solution.optimum().ok_or_else(|| {
            TailRiskError::NumericConsistency(
                "solver reported optimal status without a solution".into(),
            )
        })?;
        if x.len() != program.layout.total() {
            return Err(TailRiskError::NumericConsistency(format!(
                "solution has {} values, program has {} variables",
                x.len(),
                program.layout.total()
            )));
        }

        let weights = program.weights(x).to_vec();
        let var = program.var(x);
        let cvar = program.tail_objective(returns, x);
        debug!(
            "Solver objective {:.9}, recomputed CVaR {:.9}",
            objective, cvar
        );

        check_solution(&weights, var, cvar, self.tolerance)?;

        Ok(OptimizationResult {
            asset_ids: returns.asset_ids().to_vec(),
            weights,
            var,
            cvar,
            alpha: program.alpha,
            stats: SolveStats {
                iterations: solution.iterations,
                solve_time: solution.solve_time,
            },
        })
    }
}

/// Re-validate a solution: weights on the simplex and `cvar >= var`.
///
/// Weights are never clamped or renormalized; a violation is an error.
pub fn check_solution(weights: &[f64], var: f64, cvar: f64, tol: f64) -> Result<()> {
    if let Some(bad) = weights.iter().find(|w| !w.is_finite()) {
        return Err(TailRiskError::NumericConsistency(format!(
            "non-finite weight {}",
            bad
        )));
    }
    if !var.is_finite() || !cvar.is_finite() {
        return Err(TailRiskError::NumericConsistency(format!(
            "non-finite risk figures: VaR = {}, CVaR = {}",
            var, cvar
        )));
    }

    let total: f64 = weights.iter().sum();
    if (total - 1.0).abs() > tol {
        return Err(TailRiskError::NumericConsistency(format!(
            "weights sum to {}, expected 1 within {}",
            total, tol
        )));
    }

    if let Some((i, w)) = weights.iter().enumerate().find(|(_, w)| **w < -tol) {
        return Err(TailRiskError::NumericConsistency(format!(
            "weight {} is {}, below -{}",
            i, w, tol
        )));
    }

    if cvar < var - tol {
        return Err(TailRiskError::NumericConsistency(format!(
            "CVaR {} is below VaR {}",
            cvar, var
        )));
    }

    Ok(())
}

/// Optimize with the default Clarabel backend.
pub fn optimize_cvar(returns: &ReturnsMatrix, alpha: f64) -> Result<OptimizationResult> {
    CvarOptimizer::default().optimize(returns, alpha)
}
