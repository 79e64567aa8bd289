//! # Run a single backtest on synthetic data
//! cashput run
//!
//! # Run on a persisted series and export results
//! cashput run --config config/default.toml --data data/spy.csv --export-dir results
//!
//! # Sweep signal parameters
//! cashput sweep --windows 20,50,100 --percentiles 0.7,0.8,0.9 --tenors 10,20,30
//!
//! # Write a synthetic series to disk
//! cashput generate --seed 7 --output data/synthetic.csv

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;

use cashput_backtest::data::generate_series;
use cashput_backtest::report::{sparkline, write_chart_csv, write_result_json, write_series_csv};
use cashput_backtest::sweep::{ParameterGrid, RunOutcome, SweepRunner};
use cashput_backtest::{BacktestConfig, BacktestEngine, ChartSeries, DataSource, SyntheticConfig};

const SEPARATOR: &str = "============================================================";
const SPARKLINE_WIDTH: usize = 60;

#[derive(Parser)]
#[command(name = "cashput")]
#[command(about = "Volatility-triggered cash-secured put backtester")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single backtest
    Run {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// CSV or parquet file with date, close and iv columns
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Seed for the synthetic series
        #[arg(long)]
        seed: Option<u64>,

        /// Directory for result.json and chart.csv
        #[arg(long)]
        export_dir: Option<PathBuf>,
    },

    /// Run every parameter combination and rank by Sharpe ratio
    Sweep {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// CSV or parquet file with date, close and iv columns
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Seed for the synthetic series
        #[arg(long)]
        seed: Option<u64>,

        /// Comma-separated rolling window lengths
        #[arg(long, value_delimiter = ',', default_value = "20,50,100")]
        windows: Vec<usize>,

        /// Comma-separated threshold quantiles
        #[arg(long, value_delimiter = ',', default_value = "0.7,0.8,0.9")]
        percentiles: Vec<f64>,

        /// Comma-separated tenors in trading days
        #[arg(long, value_delimiter = ',', default_value = "10,20,30")]
        tenors: Vec<usize>,

        /// Rows to print
        #[arg(long, default_value_t = 10)]
        top: usize,
    },

    /// Write a synthetic series as CSV
    Generate {
        /// Random seed
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Calendar year to cover
        #[arg(long, default_value_t = 2023)]
        year: i32,

        /// Output CSV path
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Load the config file (or defaults) and apply command-line overrides.
fn load_config(
    path: Option<&Path>,
    data: Option<PathBuf>,
    seed: Option<u64>,
) -> Result<BacktestConfig> {
    let mut config = match path {
        Some(path) => BacktestConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => BacktestConfig::default(),
    };

    if let Some(data) = data {
        config.data = DataSource::file(data);
    }
    if let Some(seed) = seed {
        match &mut config.data {
            DataSource::Synthetic(synthetic) => synthetic.seed = seed,
            DataSource::File { path, .. } => {
                warn!(path = %path.display(), "--seed ignored for file data")
            }
        }
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn cmd_run(config: BacktestConfig, export_dir: Option<PathBuf>) -> Result<()> {
    let engine = BacktestEngine::new(config)?;
    let series = engine.load_series().context("Failed to load market data")?;
    let result = engine
        .run_with_data(&series)
        .context("Backtest failed")?;
    let chart = ChartSeries::build(&result.ledger, &series)?;

    println!("{}", SEPARATOR);
    println!("{}", result.summary());
    println!("{}", SEPARATOR);
    println!("Equity: {}", sparkline(&chart.equity_values(), SPARKLINE_WIDTH));
    println!("Price:  {}", sparkline(&chart.price_values(), SPARKLINE_WIDTH));

    if let Some(dir) = export_dir {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        write_result_json(&result, &dir.join("result.json"))?;
        write_chart_csv(&chart, &dir.join("chart.csv"))?;
        println!("\nResults written to {}", dir.display());
    }

    Ok(())
}

fn cmd_sweep(config: BacktestConfig, grid: ParameterGrid, top: usize) -> Result<()> {
    let engine = BacktestEngine::new(config.clone())?;
    let series = Arc::new(engine.load_series().context("Failed to load market data")?);

    let runner = SweepRunner::new(config).with_param_grid(grid);
    let outcomes = runner.run(series)?;

    println!("{}", SEPARATOR);
    println!("Parameter sweep: {} combinations", outcomes.len());
    println!("{}", SEPARATOR);
    println!(
        "{:<20} {:>7} {:>10} {:>10} {:>8}",
        "params", "trades", "return", "vol", "sharpe"
    );

    for outcome in outcomes.iter().take(top) {
        let key = outcome.params.key();
        match &outcome.outcome {
            RunOutcome::Completed {
                summary,
                total_trades,
                ..
            } => {
                let sharpe = summary
                    .sharpe_ratio
                    .map(|s| format!("{:.2}", s))
                    .unwrap_or_else(|| "n/a".to_string());
                println!(
                    "{:<20} {:>7} {:>9.2}% {:>9.2}% {:>8}",
                    key,
                    total_trades,
                    summary.total_return * 100.0,
                    summary.annualized_volatility * 100.0,
                    sharpe
                );
            }
            RunOutcome::NoTrades => println!("{:<20} {:>7}", key, "no trades"),
            RunOutcome::Failed(reason) => println!("{:<20} failed: {}", key, reason),
        }
    }

    Ok(())
}

fn cmd_generate(seed: u64, year: i32, output: &Path) -> Result<()> {
    let config = SyntheticConfig {
        year,
        ..SyntheticConfig::default()
    }
    .with_seed(seed);
    let series = generate_series(&config)?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    write_series_csv(&series, output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "Wrote {} observations ({} to {}) to {}",
        series.len(),
        series.first_date(),
        series.last_date(),
        output.display()
    );
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cashput_backtest=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            data,
            seed,
            export_dir,
        } => {
            let config = load_config(config.as_deref(), data, seed)?;
            cmd_run(config, export_dir)
        }
        Commands::Sweep {
            config,
            data,
            seed,
            windows,
            percentiles,
            tenors,
            top,
        } => {
            let config = load_config(config.as_deref(), data, seed)?;
            let grid = ParameterGrid {
                windows,
                percentiles,
                tenors,
            };
            cmd_sweep(config, grid, top)
        }
        Commands::Generate { seed, year, output } => cmd_generate(seed, year, &output),
    }
}
