//! Historical return samples.
//!
//! A [`ReturnsMatrix`] is the validated input of the optimizer: `T` observations
//! (rows) by `N` assets (columns), with one identifier per column. Once built it
//! is never mutated, so every pipeline stage can share it by reference.

use std::collections::HashSet;

use nalgebra::DMatrix;
use tracing::debug;

use crate::error::{Result, TailRiskError};

/// Minimum number of observations accepted.
pub const MIN_OBSERVATIONS: usize = 2;

/// Validated `T x N` matrix of period returns.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnsMatrix {
    data: DMatrix<f64>,
    asset_ids: Vec<String>,
}

impl ReturnsMatrix {
    /// Create a matrix from dense data whose columns are aligned to `asset_ids`.
    ///
    /// # Errors
    ///
    /// - [`TailRiskError::Data`] if there are fewer than two observations, no
    ///   assets, or any entry is NaN or infinite.
    /// - [`TailRiskError::Configuration`] if `asset_ids` does not have one unique
    ///   identifier per column.
    pub fn new(data: DMatrix<f64>, asset_ids: Vec<String>) -> Result<Self> {
        let (n_obs, n_assets) = data.shape();

        if n_assets == 0 {
            return Err(TailRiskError::Data("return matrix has no assets".into()));
        }
        if n_obs < MIN_OBSERVATIONS {
            return Err(TailRiskError::Data(format!(
                "return matrix needs at least {} observations, got {}",
                MIN_OBSERVATIONS, n_obs
            )));
        }
        if asset_ids.len() != n_assets {
            return Err(TailRiskError::Configuration(format!(
                "{} asset identifiers given for {} return columns",
                asset_ids.len(),
                n_assets
            )));
        }

        let mut seen = HashSet::with_capacity(asset_ids.len());
        for id in &asset_ids {
            if !seen.insert(id.as_str()) {
                return Err(TailRiskError::Configuration(format!(
                    "duplicate asset identifier '{}'",
                    id
                )));
            }
        }

        for j in 0..n_assets {
            for i in 0..n_obs {
                let v = data[(i, j)];
                if !v.is_finite() {
                    return Err(TailRiskError::Data(format!(
                        "non-finite return {} at observation {} for asset '{}'",
                        v, i, asset_ids[j]
                    )));
                }
            }
        }

        Ok(ReturnsMatrix { data, asset_ids })
    }

    /// Create a matrix from row-major observations.
    pub fn from_rows<S: Into<String>>(
        rows: &[Vec<f64>],
        asset_ids: impl IntoIterator<Item = S>,
    ) -> Result<Self> {
        let asset_ids: Vec<String> = asset_ids.into_iter().map(Into::into).collect();
        let n_assets = rows.first().map_or(asset_ids.len(), Vec::len);

        if let Some((t, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_assets) {
            return Err(TailRiskError::Data(format!(
                "observation {} has {} values, expected {}",
                t,
                row.len(),
                n_assets
            )));
        }

        let data = DMatrix::from_fn(rows.len(), n_assets, |i, j| rows[i][j]);
        Self::new(data, asset_ids)
    }

    /// Build simple period returns `p_t / p_{t-1} - 1` from consecutive price rows.
    ///
    /// Missing prices are encoded as NaN. A period is dropped when any of its
    /// prices, or the previous period's, is missing or not strictly positive.
    pub fn from_prices<S: Into<String>>(
        prices: &[Vec<f64>],
        asset_ids: impl IntoIterator<Item = S>,
    ) -> Result<Self> {
        let usable = |p: f64| p.is_finite() && p > 0.0;

        let mut rows = Vec::with_capacity(prices.len().saturating_sub(1));
        let mut dropped = 0usize;

        for pair in prices.windows(2) {
            let (prev, curr) = (&pair[0], &pair[1]);
            if prev.len() != curr.len() {
                return Err(TailRiskError::Data(format!(
                    "price rows have {} and {} columns",
                    prev.len(),
                    curr.len()
                )));
            }
            if prev.iter().chain(curr).all(|&p| usable(p)) {
                rows.push(prev.iter().zip(curr).map(|(p0, p1)| p1 / p0 - 1.0).collect());
            } else {
                dropped += 1;
            }
        }

        debug!(
            "Built {} return observations from {} price rows ({} dropped)",
            rows.len(),
            prices.len(),
            dropped
        );

        Self::from_rows(&rows, asset_ids)
    }

    /// Number of observations `T`.
    pub fn n_obs(&self) -> usize {
        self.data.nrows()
    }

    /// Number of assets `N`.
    pub fn n_assets(&self) -> usize {
        self.data.ncols()
    }

    /// Asset identifiers in column order.
    pub fn asset_ids(&self) -> &[String] {
        &self.asset_ids
    }

    /// The underlying `T x N` matrix.
    pub fn data(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Returns of every asset at observation `t`.
    pub fn observation(&self, t: usize) -> impl Iterator<Item = f64> + '_ {
        (0..self.n_assets()).map(move |j| self.data[(t, j)])
    }

    /// Portfolio return `returns_t . weights` at observation `t`.
    ///
    /// `weights` must have one entry per asset.
    pub fn portfolio_return(&self, t: usize, weights: &[f64]) -> f64 {
        self.data
            .row(t)
            .iter()
            .zip(weights)
            .map(|(r, w)| r * w)
            .sum()
    }

    /// Portfolio losses `-returns_t . weights` for every observation.
    pub fn portfolio_losses(&self, weights: &[f64]) -> Vec<f64> {
        (0..self.n_obs())
            .map(|t| -self.portfolio_return(t, weights))
            .collect()
    }
}
