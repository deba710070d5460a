//! Result reporting.
//!
//! A [`RunReport`] gathers everything a reader wants after a run: the optimal
//! allocation with its VaR and CVaR, the tail risk of the equal-weight
//! benchmark over the same sample, and the final growth of both backtests.
//! [`ReportRenderer`]s decide how it is presented.

use std::io::Write;

use serde::Serialize;

use crate::backtest::{equal_weights, BacktestEngine, BacktestSummary};
use crate::error::Result;
use crate::optimizer::OptimizationResult;
use crate::provider::Period;
use crate::returns::ReturnsMatrix;
use crate::risk::{portfolio_tail_risk, TailRisk};

/// Read-only summary of one optimization run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport<'a> {
    /// The optimal allocation.
    pub result: &'a OptimizationResult,
    /// Lookback window of the sample.
    pub period: Period,
    /// Number of return observations used.
    pub observations: usize,
    /// Empirical tail risk of the equal-weight benchmark.
    pub benchmark_risk: TailRisk,
    /// Final growth of both backtests.
    pub backtest: BacktestSummary,
    /// Weights at or below this are not listed.
    #[serde(skip)]
    pub weight_threshold: f64,
}

impl<'a> RunReport<'a> {
    /// Assemble the report for `result` over `returns`.
    pub fn new(
        returns: &ReturnsMatrix,
        result: &'a OptimizationResult,
        period: Period,
        weight_threshold: f64,
    ) -> Result<Self> {
        let benchmark_risk =
            portfolio_tail_risk(returns, &equal_weights(returns.n_assets()), result.alpha)?;
        let backtest = BacktestEngine::run(returns, &result.weights)?.summary();

        Ok(RunReport {
            result,
            period,
            observations: returns.n_obs(),
            benchmark_risk,
            backtest,
            weight_threshold,
        })
    }

    /// Weights above the display threshold, in column order.
    pub fn visible_weights(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.result
            .weights_by_asset()
            .filter(move |(_, w)| *w > self.weight_threshold)
    }
}

/// Presents a [`RunReport`].
pub trait ReportRenderer {
    fn render(&self, report: &RunReport<'_>, out: &mut dyn Write) -> Result<()>;
}

/// Plain-text console report.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextReport;

impl ReportRenderer for TextReport {
    fn render(&self, report: &RunReport<'_>, out: &mut dyn Write) -> Result<()> {
        let r = report.result;
        let confidence = r.alpha * 100.0;

        writeln!(out, "--- TailRisk Optimizer ---")?;
        writeln!(out, "Assets: {}", r.asset_ids.join(", "))?;
        writeln!(
            out,
            "Period: {} ({} observations), Confidence: {}%",
            report.period, report.observations, confidence
        )?;
        writeln!(out)?;

        writeln!(out, "--- Optimization Results ---")?;
        writeln!(out, "Optimal VaR ({}%):  {:.4}%", confidence, r.var * 100.0)?;
        writeln!(out, "Optimal CVaR ({}%): {:.4}%", confidence, r.cvar * 100.0)?;
        writeln!(out)?;

        writeln!(out, "Optimal Portfolio Weights:")?;
        for (asset, w) in report.visible_weights() {
            writeln!(out, "  {}: {:.2}%", asset, w * 100.0)?;
        }
        writeln!(out)?;

        writeln!(out, "--- Equal-Weight Benchmark ---")?;
        writeln!(
            out,
            "VaR ({}%):  {:.4}%",
            confidence,
            report.benchmark_risk.var * 100.0
        )?;
        writeln!(
            out,
            "CVaR ({}%): {:.4}%",
            confidence,
            report.benchmark_risk.cvar * 100.0
        )?;
        writeln!(out)?;

        writeln!(out, "--- Backtest ({} periods) ---", report.backtest.periods)?;
        writeln!(
            out,
            "Min-CVaR portfolio growth:   {:.4}",
            report.backtest.portfolio_growth
        )?;
        writeln!(
            out,
            "Equal-weight (1/N) growth:   {:.4}",
            report.backtest.benchmark_growth
        )?;
        Ok(())
    }
}

/// Pretty-printed JSON report.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReport;

impl ReportRenderer for JsonReport {
    fn render(&self, report: &RunReport<'_>, out: &mut dyn Write) -> Result<()> {
        serde_json::to_writer_pretty(&mut *out, report)?;
        writeln!(out)?;
        Ok(())
    }
}
