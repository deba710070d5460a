//! # tailrisk
//!
//! Minimum-CVaR portfolio allocation.
//!
//! Given a historical sample of asset returns, tailrisk finds the long-only,
//! fully invested weights that minimize Conditional Value at Risk at a chosen
//! confidence level, by solving the Rockafellar-Uryasev linear program with
//! the Clarabel solver.
//!
//! ## Quick Start
//!
//! ```ignore
//! use tailrisk::prelude::*;
//!
//! let returns = ReturnsMatrix::from_rows(&rows, ["SPY", "GLD", "IEF", "QQQ"])?;
//! let result = CvarOptimizer::default().optimize(&returns, 0.95)?;
//!
//! for (asset, w) in result.weights_by_asset() {
//!     println!("{}: {:.2}%", asset, w * 100.0);
//! }
//!
//! let series = BacktestEngine::run(&returns, &result.weights)?;
//! let growth: Vec<f64> = series.portfolio().collect();
//! ```
//!
//! ## Formulation
//!
//! With loss `L_t(w) = -r_t . w` over `T` observations:
//!
//! - minimize `v + 1 / ((1 - alpha) T) * sum_t z_t`
//! - subject to `sum_i w_i = 1`, `w >= 0`, `z >= 0`, `z_t >= L_t(w) - v`
//!
//! At the optimum `v` is the VaR and the objective value the CVaR.
//!
//! ## Architecture
//!
//! - **`ReturnsMatrix`** validates the sample once; it is immutable afterwards
//! - **`CvarProgramBuilder`** produces a solver-agnostic `LinearProgram`
//! - **`LpSolver`** is the backend seam; `ClarabelSolver` is the default
//! - **`CvarOptimizer`** solves, extracts and re-checks the simplex constraints
//! - **`BacktestEngine`** compounds the allocation and the `1/N` benchmark

pub mod backtest;
pub mod chart;
pub mod config;
pub mod error;
pub mod optimizer;
pub mod program;
pub mod provider;
pub mod report;
pub mod returns;
pub mod risk;
pub mod solver;
pub mod sparse;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use tailrisk::prelude::*;
/// ```
pub mod prelude {
    // Data
    pub use crate::returns::ReturnsMatrix;

    // Formulation
    pub use crate::program::{build_cvar_program, CvarProgram, CvarProgramBuilder, LinearProgram};

    // Solver
    pub use crate::solver::{ClarabelSolver, LpSolution, LpSolver, LpStatus, Settings};

    // Optimization
    pub use crate::optimizer::{optimize_cvar, CvarOptimizer, OptimizationResult};

    // Backtest and risk
    pub use crate::backtest::{equal_weights, BacktestEngine, BacktestSeries};
    pub use crate::risk::{empirical_var_cvar, portfolio_tail_risk, TailRisk};

    // Errors
    pub use crate::error::{Result, TailRiskError};
}

// Re-export main types at crate root
pub use error::{Result, TailRiskError};
pub use optimizer::{CvarOptimizer, OptimizationResult};
pub use returns::ReturnsMatrix;
