//! CVaR linear program construction.
//!
//! Translates a return sample and a confidence level into the
//! Rockafellar-Uryasev linear program:
//!
//! ```text
//! minimize    v + 1 / ((1 - alpha) T) * sum_t z_t
//! subject to  sum_i w_i = 1
//!             w_i >= 0
//!             z_t >= 0
//!             z_t >= -r_t . w - v
//! ```
//!
//! The decision vector is laid out as `x = [w (N), v (1), z (T)]`. Nothing is
//! solved here; the result is a solver-agnostic [`LinearProgram`].

use std::ops::Range;

use nalgebra_sparse::CscMatrix;
use tracing::debug;

use crate::error::{Result, TailRiskError};
use crate::returns::ReturnsMatrix;
use crate::sparse::TripletBuilder;

/// A linear program in inequality/equality form:
///
/// ```text
/// minimize    c' x
/// subject to  A_eq x == b_eq
///             A_ub x <= b_ub
/// ```
#[derive(Debug, Clone)]
pub struct LinearProgram {
    /// Objective coefficients `c`.
    pub objective: Vec<f64>,
    /// Equality constraint matrix.
    pub a_eq: CscMatrix<f64>,
    /// Equality right-hand side.
    pub b_eq: Vec<f64>,
    /// Inequality constraint matrix.
    pub a_ub: CscMatrix<f64>,
    /// Inequality right-hand side.
    pub b_ub: Vec<f64>,
}

impl LinearProgram {
    /// Number of decision variables.
    pub fn n_vars(&self) -> usize {
        self.objective.len()
    }

    /// Total number of constraint rows.
    pub fn n_constraints(&self) -> usize {
        self.b_eq.len() + self.b_ub.len()
    }

    /// Evaluate `c' x`.
    pub fn objective_value(&self, x: &[f64]) -> f64 {
        self.objective.iter().zip(x).map(|(c, xi)| c * xi).sum()
    }
}

/// Position of each variable block inside the decision vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableLayout {
    /// Number of assets `N`.
    pub n_assets: usize,
    /// Number of observations `T`.
    pub n_obs: usize,
}

impl VariableLayout {
    /// Columns of the weight block `w`.
    pub fn weights(&self) -> Range<usize> {
        0..self.n_assets
    }

    /// Column of the VaR variable `v`.
    pub fn var(&self) -> usize {
        self.n_assets
    }

    /// Columns of the slack block `z`.
    pub fn slacks(&self) -> Range<usize> {
        self.n_assets + 1..self.total()
    }

    /// Total number of variables `N + 1 + T`.
    pub fn total(&self) -> usize {
        self.n_assets + 1 + self.n_obs
    }
}

/// The CVaR program for one `(returns, alpha)` pair.
#[derive(Debug, Clone)]
pub struct CvarProgram {
    /// The linear program handed to the solver.
    pub lp: LinearProgram,
    /// Variable layout for recovering `w` and `v`.
    pub layout: VariableLayout,
    /// Confidence level the program was built for.
    pub alpha: f64,
}

impl CvarProgram {
    /// Weight block of a solution vector.
    pub fn weights<'a>(&self, x: &'a [f64]) -> &'a [f64] {
        &x[self.layout.weights()]
    }

    /// VaR component of a solution vector.
    pub fn var(&self, x: &[f64]) -> f64 {
        x[self.layout.var()]
    }

    /// Rockafellar-Uryasev objective `v + 1 / ((1 - alpha) T) * sum_t max(L_t(w) - v, 0)`
    /// evaluated at the `w` and `v` of a solution vector.
    ///
    /// Slack values in `x` are ignored and recomputed exactly from the losses,
    /// so the result never falls below `v`.
    pub fn tail_objective(&self, returns: &ReturnsMatrix, x: &[f64]) -> f64 {
        let v = self.var(x);
        let excess: f64 = returns
            .portfolio_losses(self.weights(x))
            .into_iter()
            .map(|loss| (loss - v).max(0.0))
            .sum();
        v + tail_scale(self.alpha, self.layout.n_obs) * excess
    }
}

/// Weight `1 / ((1 - alpha) T)` of each slack in the objective.
fn tail_scale(alpha: f64, n_obs: usize) -> f64 {
    1.0 / ((1.0 - alpha) * n_obs as f64)
}

/// Check that a confidence level lies strictly inside `(0, 1)`.
pub fn validate_alpha(alpha: f64) -> Result<()> {
    if alpha > 0.0 && alpha < 1.0 {
        Ok(())
    } else {
        Err(TailRiskError::Configuration(format!(
            "confidence level alpha must lie in (0, 1), got {}",
            alpha
        )))
    }
}

/// Builds [`CvarProgram`]s at a fixed confidence level.
#[derive(Debug, Clone, Copy)]
pub struct CvarProgramBuilder {
    alpha: f64,
}

impl CvarProgramBuilder {
    /// Create a builder for confidence level `alpha`.
    ///
    /// # Errors
    ///
    /// Returns [`TailRiskError::Configuration`] unless `0 < alpha < 1`.
    pub fn new(alpha: f64) -> Result<Self> {
        validate_alpha(alpha)?;
        Ok(CvarProgramBuilder { alpha })
    }

    /// The confidence level.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Formulate the program for `returns`.
    ///
    /// The matrix invariants (at least two observations, one asset, finite
    /// entries) are guaranteed by [`ReturnsMatrix`] construction.
    pub fn build(&self, returns: &ReturnsMatrix) -> CvarProgram {
        let layout = VariableLayout {
            n_assets: returns.n_assets(),
            n_obs: returns.n_obs(),
        };
        let n = layout.total();
        let data = returns.data();

        let mut objective = vec![0.0; n];
        objective[layout.var()] = 1.0;
        let tail_weight = tail_scale(self.alpha, layout.n_obs);
        for col in layout.slacks() {
            objective[col] = tail_weight;
        }

        // Fully invested: sum_i w_i == 1
        let mut eq = TripletBuilder::with_capacity(n, layout.n_assets);
        eq.push_row(layout.weights().map(|i| (i, 1.0)));
        let b_eq = vec![1.0];

        let nnz = layout.n_assets + layout.n_obs * (layout.n_assets + 3);
        let mut ub = TripletBuilder::with_capacity(n, nnz);

        // Long-only: -w_i <= 0
        for i in layout.weights() {
            ub.push_row([(i, -1.0)]);
        }

        // Non-negative slack: -z_t <= 0
        for col in layout.slacks() {
            ub.push_row([(col, -1.0)]);
        }

        // Tail excess: -r_t . w - v - z_t <= 0
        let var_col = layout.var();
        for (t, z_col) in layout.slacks().enumerate() {
            let weight_terms = layout.weights().map(|i| (i, -data[(t, i)]));
            ub.push_row(weight_terms.chain([(var_col, -1.0), (z_col, -1.0)]));
        }

        let b_ub = vec![0.0; ub.nrows()];
        let lp = LinearProgram {
            objective,
            a_eq: eq.build(),
            b_eq,
            a_ub: ub.build(),
            b_ub,
        };

        debug!(
            "Built CVaR program: {} variables, {} constraints (alpha = {})",
            lp.n_vars(),
            lp.n_constraints(),
            self.alpha
        );

        CvarProgram {
            lp,
            layout,
            alpha: self.alpha,
        }
    }
}

/// Formulate the CVaR program for `returns` at confidence level `alpha`.
pub fn build_cvar_program(returns: &ReturnsMatrix, alpha: f64) -> Result<CvarProgram> {
    Ok(CvarProgramBuilder::new(alpha)?.build(returns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::csc_to_dense;
    use approx::assert_relative_eq;

    fn sample() -> ReturnsMatrix {
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

    #[test]
    fn test_alpha_bounds() {
        for alpha in [0.0, 1.0, -0.5, 1.5, f64::NAN] {
            let err = CvarProgramBuilder::new(alpha).unwrap_err();
            assert!(matches!(err, TailRiskError::Configuration(_)), "alpha = {}", alpha);
        }
        assert!(CvarProgramBuilder::new(0.95).is_ok());
    }

    #[test]
    fn test_dimensions() {
        let program = build_cvar_program(&sample(), 0.5).unwrap();
        // N + 1 + T variables, 2T + N + 1 constraints
        assert_eq!(program.lp.n_vars(), 2 + 1 + 4);
        assert_eq!(program.lp.n_constraints(), 2 * 4 + 2 + 1);
        assert_eq!(program.lp.a_eq.nrows(), 1);
        assert_eq!(program.lp.a_ub.nrows(), 4 + 2 + 4);
        assert_eq!(program.lp.a_ub.ncols(), 7);
    }

    #[test]
    fn test_objective_coefficients() {
        let program = build_cvar_program(&sample(), 0.5).unwrap();
        let c = &program.lp.objective;
        assert_eq!(&c[0..2], &[0.0, 0.0]);
        assert_eq!(c[2], 1.0);
        // 1 / ((1 - 0.5) * 4) = 0.5
        for &coef in &c[3..] {
            assert_relative_eq!(coef, 0.5);
        }
    }

    #[test]
    fn test_tail_rows() {
        let program = build_cvar_program(&sample(), 0.9).unwrap();
        let a = csc_to_dense(&program.lp.a_ub);
        // First tail row sits after N weight rows and T slack rows.
        let row = 2 + 4;
        assert_relative_eq!(a[(row, 0)], -0.02);
        assert_relative_eq!(a[(row, 1)], 0.01);
        assert_eq!(a[(row, 2)], -1.0);
        assert_eq!(a[(row, 3)], -1.0);
        assert_eq!(a[(row, 4)], 0.0);
        assert!(program.lp.b_ub.iter().all(|&b| b == 0.0));
    }

    #[test]
    fn test_feasible_point_satisfies_constraints() {
        let returns = sample();
        let program = build_cvar_program(&returns, 0.5).unwrap();

        // w = (0.5, 0.5), v = 0, z_t = max(loss_t, 0)
        let w = [0.5, 0.5];
        let mut x = vec![0.5, 0.5, 0.0];
        x.extend(returns.portfolio_losses(&w).iter().map(|l| l.max(0.0)));

        let a_ub = csc_to_dense(&program.lp.a_ub);
        let a_eq = csc_to_dense(&program.lp.a_eq);
        let x = nalgebra::DVector::from_vec(x);
        assert_relative_eq!((a_eq * &x)[0], 1.0);
        assert!((a_ub * &x).iter().all(|&v| v <= 1e-12));
    }

    #[test]
    fn test_tail_objective_ignores_slack_noise() {
        let returns = sample();
        let program = build_cvar_program(&returns, 0.5).unwrap();

        // Optimum w = (0.2, 0.8), v = -0.002, with slacks pushed below zero.
        let mut x = vec![0.2, 0.8, -0.002];
        x.extend([-1e-3; 4]);

        assert!(program.lp.objective_value(&x) < program.var(&x));
        assert_relative_eq!(program.tail_objective(&returns, &x), 0.001, epsilon = 1e-12);
    }

    #[test]
    fn test_tail_objective_with_tail_below_one_observation() {
        let returns = sample();
        let program = build_cvar_program(&returns, 0.9999).unwrap();

        // v at the worst loss leaves no excess: CVaR equals VaR.
        let w = [0.5, 0.5];
        let worst = returns
            .portfolio_losses(&w)
            .into_iter()
            .fold(f64::NEG_INFINITY, f64::max);
        let mut x = vec![0.5, 0.5, worst];
        x.extend([0.0; 4]);

        assert_relative_eq!(program.tail_objective(&returns, &x), worst);
    }

    #[test]
    fn test_layout_ranges() {
        let layout = VariableLayout { n_assets: 3, n_obs: 5 };
        assert_eq!(layout.weights(), 0..3);
        assert_eq!(layout.var(), 3);
        assert_eq!(layout.slacks(), 4..9);
        assert_eq!(layout.total(), 9);
    }
}
