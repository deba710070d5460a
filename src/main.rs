//! Command-line interface for the tail-risk optimizer.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use tailrisk::backtest::BacktestEngine;
use tailrisk::chart::{ChartRenderer, CsvChartExport};
use tailrisk::config::RunConfig;
use tailrisk::error::Result;
use tailrisk::optimizer::CvarOptimizer;
use tailrisk::provider::{CsvPriceProvider, Period, ReturnsProvider};
use tailrisk::report::{JsonReport, ReportRenderer, RunReport, TextReport};
use tailrisk::solver::ClarabelSolver;

/// Tail Risk Optimizer - minimum-CVaR portfolio weights from price history.
#[derive(Parser)]
#[command(name = "tailrisk")]
#[command(version)]
#[command(about = "Tail Risk Optimizer (CVaR)")]
#[command(long_about = None)]
struct Cli {
    /// Wide CSV of prices: a date column followed by one column per ticker
    #[arg(short, long)]
    prices: PathBuf,

    /// Asset tickers (e.g. AAPL MSFT); defaults to SPY GLD IEF QQQ
    #[arg(short, long, num_args = 1..)]
    tickers: Option<Vec<String>>,

    /// Historical period (e.g. 1Y, 6M, 5Y, max)
    #[arg(long)]
    period: Option<Period>,

    /// Confidence level for VaR/CVaR (e.g. 0.95)
    #[arg(short, long)]
    alpha: Option<f64>,

    /// TOML configuration file; command-line flags take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bound on solver time in seconds
    #[arg(long)]
    time_limit: Option<f64>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Directory for chart data (backtest.csv, weights.csv)
    #[arg(short, long)]
    export_dir: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

impl Cli {
    fn init_logging(&self) {
        let level = match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };

        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(false)
            .with_writer(io::stderr)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
    }

    fn run_config(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::load(path)?,
            None => RunConfig::default(),
        };

        if let Some(tickers) = &self.tickers {
            config.tickers = tickers.clone();
        }
        if let Some(period) = self.period {
            config.period = period;
        }
        if let Some(alpha) = self.alpha {
            config.alpha = alpha;
        }
        if self.time_limit.is_some() {
            config.solver.time_limit = self.time_limit;
        }

        config.validate()?;
        Ok(config)
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.run_config()?;
    info!(
        "Running for {} over {} at confidence {}",
        config.tickers.join(", "),
        config.period,
        config.alpha
    );

    let returns = CsvPriceProvider::new(&cli.prices).returns(&config.tickers, config.period)?;

    let optimizer = CvarOptimizer::new(ClarabelSolver::new(config.solver.clone()));
    let result = optimizer.optimize(&returns, config.alpha)?;

    let report = RunReport::new(&returns, &result, config.period, config.weight_threshold)?;
    let mut stdout = io::stdout().lock();
    match cli.output {
        OutputFormat::Text => TextReport.render(&report, &mut stdout)?,
        OutputFormat::Json => JsonReport.render(&report, &mut stdout)?,
    }

    if let Some(dir) = &cli.export_dir {
        let series = BacktestEngine::run(&returns, &result.weights)?;
        CsvChartExport::new(dir, config.weight_threshold).render(&series, &result)?;
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    cli.init_logging();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\nAn error occurred: {}", e);
            eprintln!("Please check your tickers or try a different period.");
            ExitCode::FAILURE
        }
    }
}
