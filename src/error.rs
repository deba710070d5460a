//! Error types for tailrisk.

use thiserror::Error;

use crate::solver::LpStatus;

/// Error type for tailrisk operations.
#[derive(Debug, Error)]
pub enum TailRiskError {
    /// The return sample is malformed.
    #[error("Data error: {0}")]
    Data(String),

    /// Invalid confidence level, asset list or solver settings.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The solver finished without an optimal solution.
    #[error("Optimization error: solver returned status {status}")]
    Optimization { status: LpStatus },

    /// The solver reported optimality but the solution fails the post-checks.
    #[error("Numeric consistency error: {0}")]
    NumericConsistency(String),

    /// The solve-time bound was exceeded.
    #[error("Solver exceeded time limit of {limit_secs}s")]
    Timeout { limit_secs: f64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type for tailrisk operations.
pub type Result<T> = std::result::Result<T, TailRiskError>;
