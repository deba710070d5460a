//! Clarabel solver integration.
//!
//! An LP is a conic program with only zero and nonnegative cones and `P = 0`.
//! Equality rows go in the zero cone, inequality rows in the nonnegative cone
//! (Clarabel solves `A x + s = b`, `s` in `K`).

use std::time::Instant;

use clarabel::algebra::CscMatrix as ClarabelCsc;
use clarabel::solver::{
    DefaultSettings, DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus,
    SupportedConeT,
};
use tracing::{debug, info};

use super::{LpSolution, LpSolver, LpStatus, Settings};
use crate::error::{Result, TailRiskError};
use crate::program::LinearProgram;
use crate::sparse::csc_vstack;

impl From<SolverStatus> for LpStatus {
    fn from(status: SolverStatus) -> Self {
        match status {
            SolverStatus::Solved => LpStatus::Optimal,
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                LpStatus::Infeasible
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
                LpStatus::Unbounded
            }
            SolverStatus::MaxTime => LpStatus::TimeLimit,
            _ => LpStatus::SolverError,
        }
    }
}

/// Interior-point LP backend using Clarabel.
#[derive(Debug, Clone, Default)]
pub struct ClarabelSolver {
    settings: Settings,
}

impl ClarabelSolver {
    /// Create a solver with custom settings.
    pub fn new(settings: Settings) -> Self {
        ClarabelSolver { settings }
    }

    /// The solver settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn clarabel_settings(&self) -> Result<DefaultSettings<f64>> {
        let s = &self.settings;
        if let Some(limit) = s.time_limit {
            if limit.is_nan() || limit <= 0.0 {
                return Err(TailRiskError::Configuration(format!(
                    "solver time limit must be positive, got {}",
                    limit
                )));
            }
        }

        DefaultSettingsBuilder::default()
            .verbose(s.verbose)
            .max_iter(s.max_iter)
            .time_limit(s.time_limit.unwrap_or(f64::INFINITY))
            .tol_gap_abs(s.tol_gap_abs)
            .tol_gap_rel(s.tol_gap_rel)
            .tol_feas(s.tol_feas)
            .build()
            .map_err(|e| TailRiskError::Configuration(format!("invalid solver settings: {}", e)))
    }
}

impl LpSolver for ClarabelSolver {
    fn solve(&self, lp: &LinearProgram) -> Result<LpSolution> {
        let settings = self.clarabel_settings()?;

        let n = lp.n_vars();
        let p = to_clarabel_csc(&nalgebra_sparse::CscMatrix::zeros(n, n));
        let stacked = csc_vstack(&lp.a_eq, &lp.a_ub);
        let a = to_clarabel_csc(&stacked);
        let b: Vec<f64> = lp.b_eq.iter().chain(&lp.b_ub).copied().collect();
        let cones = lp_cones(lp.b_eq.len(), lp.b_ub.len());

        debug!(
            "Submitting LP to Clarabel: {} variables, {} rows, {} non-zeros",
            n,
            b.len(),
            stacked.nnz()
        );

        let started = Instant::now();
        let mut solver = DefaultSolver::new(&p, &lp.objective, &a, &b, &cones, settings);
        solver.solve();

        let status: LpStatus = solver.solution.status.into();
        let solve_time = started.elapsed().as_secs_f64();
        let iterations = solver.info.iterations;

        info!(
            "Clarabel finished: status {} ({:?}) after {} iterations in {:.4}s",
            status, solver.solution.status, iterations, solve_time
        );

        if status != LpStatus::Optimal {
            return Ok(LpSolution::failed(status, solve_time, iterations));
        }

        let x = solver.solution.x.clone();
        let objective = lp.objective_value(&x);
        Ok(LpSolution {
            status,
            x: Some(x),
            objective: Some(objective),
            solve_time,
            iterations,
        })
    }

    fn time_limit(&self) -> Option<f64> {
        self.settings.time_limit
    }
}

/// Convert nalgebra CSC to Clarabel CSC.
fn to_clarabel_csc(m: &nalgebra_sparse::CscMatrix<f64>) -> ClarabelCsc<f64> {
    ClarabelCsc::new(
        m.nrows(),
        m.ncols(),
        m.col_offsets().to_vec(),
        m.row_indices().to_vec(),
        m.values().to_vec(),
    )
}

/// Cones for `n_eq` equality rows followed by `n_ub` inequality rows.
fn lp_cones(n_eq: usize, n_ub: usize) -> Vec<SupportedConeT<f64>> {
    let mut cones = Vec::with_capacity(2);
    if n_eq > 0 {
        cones.push(SupportedConeT::ZeroConeT(n_eq));
    }
    if n_ub > 0 {
        cones.push(SupportedConeT::NonnegativeConeT(n_ub));
    }
    cones
}
