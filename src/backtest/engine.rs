//! Core backtesting engine.
//!
//! Runs the pipeline over one market series:
//! 1. Load the series (file or synthetic)
//! 2. Compute the rolling IV signal
//! 3. Sell a put on every triggered day that has an expiry row
//! 4. Replay the trades into the daily ledger
//! 5. Summarize the equity curve and the buy-and-hold benchmark

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{BacktestConfig, DataSource};
use crate::data::{generate_series, DataLoader, MarketSeries};
use crate::error::Result;
use crate::metrics::{DrawdownAnalysis, MetricsCalculator, PerformanceSummary, TradeStatistics};
use crate::signal::SignalledSeries;

use super::ledger::{AccountLedger, LedgerEntry};
use super::trade::{Trade, TradeSimulator};

/// Result of a completed backtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Configuration used.
    pub config: BacktestConfig,

    /// First observation date.
    pub start_date: NaiveDate,

    /// Last observation date.
    pub end_date: NaiveDate,

    /// Number of observations in the input series.
    pub observations: usize,

    /// Number of days the signal fired.
    pub triggers: usize,

    /// All generated trades, in entry order.
    pub trades: Vec<Trade>,

    /// One entry per calendar day from first entry to last expiry.
    pub ledger: Vec<LedgerEntry>,

    /// Strategy performance.
    pub summary: PerformanceSummary,

    pub drawdown: DrawdownAnalysis,

    pub trade_stats: TradeStatistics,

    /// Buy-and-hold of the underlying over the ledger span, if at least two
    /// closes fall inside it.
    pub benchmark: Option<PerformanceSummary>,
}

impl BacktestResult {
    /// Generate summary string.
    pub fn summary(&self) -> String {
        let benchmark = match &self.benchmark {
            Some(b) => format!("{:.2}%", b.total_return * 100.0),
            None => "n/a".to_string(),
        };
        format!(
            "Backtest Results ({} to {})\n\
             ----------------------------------------\n\
             {}\n\
             \n\
             Signals: {} of {} days\n\
             Trades: {} (W: {}, L: {})\n\
             Win Rate: {:.1}%\n\
             Avg Return on Collateral: {:.2}%\n\
             Premium Collected: ${:.2}\n\
             Total P&L: ${:.2}\n\
             Max Concurrent Puts: {}\n\
             \n\
             Buy & Hold Return: {}",
            self.start_date,
            self.end_date,
            self.summary.summary(),
            self.triggers,
            self.observations,
            self.trade_stats.total_trades,
            self.trade_stats.winning_trades,
            self.trade_stats.total_trades - self.trade_stats.winning_trades,
            self.trade_stats.win_rate * 100.0,
            self.trade_stats.avg_return_on_collateral * 100.0,
            self.trade_stats.total_premium,
            self.trade_stats.total_pnl,
            self.trade_stats.max_concurrent_positions,
            benchmark,
        )
    }
}

/// The main backtesting engine.
#[derive(Debug, Clone)]
pub struct BacktestEngine {
    config: BacktestConfig,
    simulator: TradeSimulator,
    ledger: AccountLedger,
    metrics: MetricsCalculator,
}

impl BacktestEngine {
    /// Create a new backtest engine. Fails on an invalid configuration.
    pub fn new(config: BacktestConfig) -> Result<Self> {
        config.validate()?;
        let simulator = TradeSimulator::new(config.tenor_days, config.trading_days_per_year)?;
        let ledger = AccountLedger::new(config.starting_cash);
        let metrics = MetricsCalculator::new(config.trading_days_per_year);
        Ok(Self {
            config,
            simulator,
            ledger,
            metrics,
        })
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Load the configured market series.
    pub fn load_series(&self) -> Result<MarketSeries> {
        match &self.config.data {
            DataSource::File {
                path,
                date_column,
                close_column,
                iv_column,
            } => DataLoader::new(path)
                .with_columns(date_column, close_column, iv_column)
                .load_series(),
            DataSource::Synthetic(synthetic) => generate_series(synthetic),
        }
    }

    /// Load the configured series and run on it.
    pub fn run(&self) -> Result<BacktestResult> {
        let series = self.load_series()?;
        self.run_with_data(&series)
    }

    /// Run with pre-loaded data (for sweeps - avoids re-reading files).
    pub fn run_with_data(&self, series: &MarketSeries) -> Result<BacktestResult> {
        let signalled =
            SignalledSeries::compute(series, self.config.window, self.config.percentile)?;
        let trades = self.simulator.generate(&signalled)?;
        if trades.is_empty() {
            warn!(
                window = self.config.window,
                percentile = self.config.percentile,
                "No trades generated"
            );
        }

        let ledger = self.ledger.build(&trades)?;
        let summary = self.metrics.summarize(&ledger)?;
        let drawdown = MetricsCalculator::analyze_drawdown(&ledger)?;
        let trade_stats = MetricsCalculator::trade_statistics(&trades, &ledger)?;
        let benchmark = self.benchmark(series, &ledger)?;

        info!(
            trades = trades.len(),
            total_return = summary.total_return,
            sharpe = ?summary.sharpe_ratio,
            "Backtest complete"
        );

        Ok(BacktestResult {
            config: self.config.clone(),
            start_date: series.first_date(),
            end_date: series.last_date(),
            observations: series.len(),
            triggers: signalled.trigger_count(),
            trades,
            ledger,
            summary,
            drawdown,
            trade_stats,
            benchmark,
        })
    }

    /// Buy-and-hold of the underlying between the first and last ledger day.
    /// `None` when fewer than two closes fall inside that span.
    fn benchmark(
        &self,
        series: &MarketSeries,
        ledger: &[LedgerEntry],
    ) -> Result<Option<PerformanceSummary>> {
        let (Some(first), Some(last)) = (ledger.first(), ledger.last()) else {
            return Ok(None);
        };
        let closes: Vec<f64> = series
            .between(first.date, last.date)
            .iter()
            .map(|o| o.close)
            .collect();
        if closes.len() < 2 {
            debug!(closes = closes.len(), "Too few closes for a benchmark");
            return Ok(None);
        }
        self.metrics.summarize_equity(&closes).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{MarketObservation, SyntheticConfig};
    use crate::error::BacktestError;
    use chrono::Duration;
    use rust_decimal::Decimal;

    fn series(ivs: &[f64], closes: &[f64]) -> MarketSeries {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let obs = ivs
            .iter()
            .zip(closes)
            .enumerate()
            .map(|(i, (&iv, &close))| MarketObservation::new(start + Duration::days(i as i64), close, iv))
            .collect();
        MarketSeries::new(obs).unwrap()
    }

    fn config(window: usize, tenor: usize) -> BacktestConfig {
        BacktestConfig {
            window,
            percentile: 0.8,
            tenor_days: tenor,
            ..BacktestConfig::default()
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = BacktestEngine::new(config(0, 5)).unwrap_err();
        assert!(matches!(err, BacktestError::InvalidInput(_)));
    }

    #[test]
    fn test_single_trade_pipeline() {
        // One spike at index 3 (0.5 above the window's 80th pct), expiry 2 rows later.
        let data = series(
            &[0.2, 0.2, 0.2, 0.5, 0.2, 0.2],
            &[100.0, 100.0, 100.0, 100.0, 99.0, 95.0],
        );
        let engine = BacktestEngine::new(config(3, 2)).unwrap();
        let result = engine.run_with_data(&data).unwrap();

        assert_eq!(result.triggers, 1);
        assert_eq!(result.trades.len(), 1);

        let trade = &result.trades[0];
        assert_eq!(trade.exit_price(), Decimal::from(95));
        assert_eq!(result.ledger.len(), 3);

        let final_equity = result.ledger.last().unwrap().equity;
        assert_eq!(final_equity, result.config.starting_cash + trade.pnl());
        assert_eq!(result.trade_stats.total_trades, 1);

        let benchmark = result.benchmark.unwrap();
        assert!((benchmark.total_return - (-0.05)).abs() < 1e-12);
    }

    #[test]
    fn test_benchmark_needs_two_closes() {
        let engine = BacktestEngine::new(config(3, 2)).unwrap();
        let data = series(&[0.2; 4], &[100.0; 4]);
        let day = |i: i64| NaiveDate::from_ymd_opt(2023, 1, 2).unwrap() + Duration::days(i);
        let entry = |date| LedgerEntry {
            date,
            cash: Decimal::from(100),
            collateral: Decimal::ZERO,
            equity: Decimal::from(100),
            open_positions: 0,
            daily_pnl: Decimal::ZERO,
        };

        assert_eq!(engine.benchmark(&data, &[]).unwrap(), None);
        assert_eq!(engine.benchmark(&data, &[entry(day(10)), entry(day(12))]).unwrap(), None);
        assert!(engine.benchmark(&data, &[entry(day(0)), entry(day(3))]).unwrap().is_some());
    }

    #[test]
    fn test_no_trades_is_empty_input() {
        let data = series(&[0.2; 8], &[100.0; 8]);
        let engine = BacktestEngine::new(config(3, 2)).unwrap();
        let err = engine.run_with_data(&data).unwrap_err();
        assert!(matches!(err, BacktestError::EmptyInput(_)));
    }

    #[test]
    fn test_synthetic_run_deterministic() {
        let cfg = BacktestConfig {
            window: 20,
            data: DataSource::Synthetic(SyntheticConfig::default()),
            ..BacktestConfig::default()
        };
        let engine = BacktestEngine::new(cfg).unwrap();
        let a = engine.run().unwrap();
        let b = engine.run().unwrap();

        assert_eq!(a.trades, b.trades);
        assert_eq!(a.ledger, b.ledger);
        assert_eq!(a.summary, b.summary);
        assert!(a.summary().contains("Backtest Results"));
    }
}
