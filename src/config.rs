//! Run configuration.
//!
//! Settings for one optimization run, loadable from a TOML file:
//!
//! ```toml
//! tickers = ["SPY", "GLD", "IEF", "QQQ"]
//! period = "5Y"
//! alpha = 0.95
//!
//! [solver]
//! max_iter = 200
//! time_limit = 30.0
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, TailRiskError};
use crate::program::validate_alpha;
use crate::provider::Period;
use crate::solver::Settings;

/// Weights at or below this are left out of reports and charts.
pub const DEFAULT_WEIGHT_THRESHOLD: f64 = 1e-4;

fn default_tickers() -> Vec<String> {
    ["SPY", "GLD", "IEF", "QQQ"].iter().map(|t| t.to_string()).collect()
}
fn default_period() -> Period { Period::Years(5) }
fn default_alpha() -> f64 { 0.95 }
fn default_weight_threshold() -> f64 { DEFAULT_WEIGHT_THRESHOLD }

/// Configuration of an optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Tickers to allocate across, in column order.
    #[serde(default = "default_tickers")]
    pub tickers: Vec<String>,
    /// Lookback window of the return sample.
    #[serde(default = "default_period")]
    pub period: Period,
    /// CVaR confidence level.
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// Display threshold for weights.
    #[serde(default = "default_weight_threshold")]
    pub weight_threshold: f64,
    /// LP solver settings.
    #[serde(default)]
    pub solver: Settings,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            tickers: default_tickers(),
            period: default_period(),
            alpha: default_alpha(),
            weight_threshold: default_weight_threshold(),
            solver: Settings::default(),
        }
    }
}

impl RunConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let content = fs::read_to_string(path)?;
        let config: RunConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TailRiskError::Configuration(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        validate_alpha(self.alpha)?;
        if self.tickers.is_empty() {
            return Err(TailRiskError::Configuration("no tickers given".into()));
        }
        if self.weight_threshold.is_nan() || self.weight_threshold < 0.0 {
            return Err(TailRiskError::Configuration(format!(
                "weight threshold must be non-negative, got {}",
                self.weight_threshold
            )));
        }
        Ok(())
    }
}
