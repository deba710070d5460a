//! Historical backtest of a static allocation.
//!
//! Applies a fixed weight vector, and the equal-weight `1/N` benchmark, to every
//! observation of the sample and compounds the period returns into cumulative
//! growth factors `C_t = prod_{s <= t} (1 + r_s)`.
//!
//! The series are lazy: [`BacktestSeries::portfolio`] and
//! [`BacktestSeries::benchmark`] hand out a fresh iterator on every call, so
//! the same series can be walked any number of times.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TailRiskError};
use crate::returns::ReturnsMatrix;

/// The `1/N` allocation.
pub fn equal_weights(n_assets: usize) -> Vec<f64> {
    if n_assets == 0 {
        return Vec::new();
    }
    vec![1.0 / n_assets as f64; n_assets]
}

/// Iterator over cumulative growth factors of one allocation.
#[derive(Debug, Clone)]
pub struct CumulativeGrowth<'a> {
    returns: &'a ReturnsMatrix,
    weights: &'a [f64],
    t: usize,
    level: f64,
}

impl<'a> CumulativeGrowth<'a> {
    /// Start compounding `weights` over `returns` from a level of 1.0.
    ///
    /// `weights` must have one entry per asset.
    pub fn new(returns: &'a ReturnsMatrix, weights: &'a [f64]) -> Self {
        CumulativeGrowth {
            returns,
            weights,
            t: 0,
            level: 1.0,
        }
    }
}

impl Iterator for CumulativeGrowth<'_> {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.t >= self.returns.n_obs() {
            return None;
        }
        self.level *= 1.0 + self.returns.portfolio_return(self.t, self.weights);
        self.t += 1;
        Some(self.level)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.returns.n_obs() - self.t;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for CumulativeGrowth<'_> {}

/// Final figures of a backtest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    /// Number of periods compounded.
    pub periods: usize,
    /// Final cumulative growth of the allocation.
    pub portfolio_growth: f64,
    /// Final cumulative growth of the equal-weight benchmark.
    pub benchmark_growth: f64,
}

/// Cumulative growth of an allocation and of the equal-weight benchmark.
#[derive(Debug, Clone)]
pub struct BacktestSeries<'a> {
    returns: &'a ReturnsMatrix,
    weights: Vec<f64>,
    benchmark_weights: Vec<f64>,
}

impl<'a> BacktestSeries<'a> {
    /// Cumulative growth of the allocation, one value per observation.
    pub fn portfolio(&self) -> CumulativeGrowth<'_> {
        CumulativeGrowth::new(self.returns, &self.weights)
    }

    /// Cumulative growth of the equal-weight benchmark.
    pub fn benchmark(&self) -> CumulativeGrowth<'_> {
        CumulativeGrowth::new(self.returns, &self.benchmark_weights)
    }

    /// Period returns `r_t` of the allocation.
    pub fn portfolio_returns(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.len()).map(move |t| self.returns.portfolio_return(t, &self.weights))
    }

    /// Period returns `e_t` of the benchmark.
    pub fn benchmark_returns(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.len()).map(move |t| self.returns.portfolio_return(t, &self.benchmark_weights))
    }

    /// The allocation being backtested.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Number of observations in each series.
    pub fn len(&self) -> usize {
        self.returns.n_obs()
    }

    /// Always false: a [`ReturnsMatrix`] holds at least two observations.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Final growth of both series.
    pub fn summary(&self) -> BacktestSummary {
        BacktestSummary {
            periods: self.len(),
            portfolio_growth: self.portfolio().last().unwrap_or(1.0),
            benchmark_growth: self.benchmark().last().unwrap_or(1.0),
        }
    }
}

/// Runs static-allocation backtests.
#[derive(Debug, Clone, Copy, Default)]
pub struct BacktestEngine;

impl BacktestEngine {
    /// Backtest `weights` against the equal-weight benchmark over `returns`.
    ///
    /// # Errors
    ///
    /// Returns [`TailRiskError::Configuration`] if `weights` does not have one
    /// finite entry per asset.
    pub fn run<'a>(returns: &'a ReturnsMatrix, weights: &[f64]) -> Result<BacktestSeries<'a>> {
        if weights.len() != returns.n_assets() {
            return Err(TailRiskError::Configuration(format!(
                "{} weights given for {} assets",
                weights.len(),
                returns.n_assets()
            )));
        }
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(TailRiskError::Configuration(
                "backtest weights must be finite".into(),
            ));
        }

        Ok(BacktestSeries {
            returns,
            weights: weights.to_vec(),
            benchmark_weights: equal_weights(returns.n_assets()),
        })
    }
}
