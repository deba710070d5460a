//! Chart data export.
//!
//! Drawing is left to external tools; a [`ChartRenderer`] receives the two
//! cumulative growth series and the allocation. [`CsvChartExport`] writes them
//! as `backtest.csv` (line chart) and `weights.csv` (pie chart).

use std::fs;
use std::path::{Path, PathBuf};

use csv::Writer;
use serde::Serialize;
use tracing::info;

use crate::backtest::BacktestSeries;
use crate::error::Result;
use crate::optimizer::OptimizationResult;

/// File name of the growth series export.
pub const BACKTEST_FILE: &str = "backtest.csv";
/// File name of the weights export.
pub const WEIGHTS_FILE: &str = "weights.csv";

/// Consumes chart data.
pub trait ChartRenderer {
    fn render(&self, series: &BacktestSeries<'_>, result: &OptimizationResult) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct GrowthRow {
    period: usize,
    min_cvar: f64,
    equal_weight: f64,
}

#[derive(Debug, Serialize)]
struct WeightRow<'a> {
    asset: &'a str,
    weight: f64,
}

/// Writes chart data as CSV files into a directory.
#[derive(Debug, Clone)]
pub struct CsvChartExport {
    dir: PathBuf,
    weight_threshold: f64,
}

impl CsvChartExport {
    /// Export into `dir`, listing only weights above `weight_threshold`.
    pub fn new(dir: impl AsRef<Path>, weight_threshold: f64) -> Self {
        CsvChartExport {
            dir: dir.as_ref().to_path_buf(),
            weight_threshold,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ChartRenderer for CsvChartExport {
    fn render(&self, series: &BacktestSeries<'_>, result: &OptimizationResult) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let backtest_path = self.dir.join(BACKTEST_FILE);
        let mut writer = Writer::from_path(&backtest_path)?;
        for (period, (min_cvar, equal_weight)) in
            series.portfolio().zip(series.benchmark()).enumerate()
        {
            writer.serialize(GrowthRow {
                period: period + 1,
                min_cvar,
                equal_weight,
            })?;
        }
        writer.flush()?;

        let weights_path = self.dir.join(WEIGHTS_FILE);
        let mut writer = Writer::from_path(&weights_path)?;
        for (asset, weight) in result.weights_by_asset() {
            if weight > self.weight_threshold {
                writer.serialize(WeightRow { asset, weight })?;
            }
        }
        writer.flush()?;

        info!(
            "Wrote chart data to {} and {}",
            backtest_path.display(),
            weights_path.display()
        );
        Ok(())
    }
}
