//! Empirical tail risk of a fixed allocation.
//!
//! Evaluates the Rockafellar-Uryasev function
//! `F(v) = v + sum_t (L_t - v)+ / ((1 - alpha) T)` directly on a loss sample.
//! `F` is convex and piecewise linear with breakpoints at the sample losses, so
//! its minimum over `v` is attained at one of them: the minimizer is the VaR and
//! the minimum the CVaR.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TailRiskError};
use crate::program::validate_alpha;
use crate::returns::ReturnsMatrix;

/// VaR and CVaR of a loss sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TailRisk {
    /// Value at Risk.
    pub var: f64,
    /// Conditional Value at Risk.
    pub cvar: f64,
}

/// VaR and CVaR at confidence `alpha` of an equally likely loss sample.
///
/// # Errors
///
/// - [`TailRiskError::Configuration`] unless `0 < alpha < 1`.
/// - [`TailRiskError::Data`] if `losses` is empty or contains non-finite values.
pub fn empirical_var_cvar(losses: &[f64], alpha: f64) -> Result<TailRisk> {
    validate_alpha(alpha)?;
    if losses.is_empty() {
        return Err(TailRiskError::Data("loss sample is empty".into()));
    }
    if losses.iter().any(|l| !l.is_finite()) {
        return Err(TailRiskError::Data("loss sample contains non-finite values".into()));
    }

    let mut sorted = losses.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));

    let scale = 1.0 / ((1.0 - alpha) * sorted.len() as f64);
    let mut best = TailRisk {
        var: sorted[0],
        cvar: sorted[0],
    };
    // Sum of the losses strictly ahead of position k.
    let mut ahead = 0.0;
    for (k, &v) in sorted.iter().enumerate() {
        let f = v + scale * (ahead - k as f64 * v);
        if f < best.cvar {
            best = TailRisk { var: v, cvar: f };
        }
        ahead += v;
    }

    Ok(best)
}

/// Tail risk of the portfolio `weights` over the sample `returns`.
pub fn portfolio_tail_risk(
    returns: &ReturnsMatrix,
    weights: &[f64],
    alpha: f64,
) -> Result<TailRisk> {
    if weights.len() != returns.n_assets() {
        return Err(TailRiskError::Configuration(format!(
            "{} weights given for {} assets",
            weights.len(),
            returns.n_assets()
        )));
    }
    empirical_var_cvar(&returns.portfolio_losses(weights), alpha)
}
