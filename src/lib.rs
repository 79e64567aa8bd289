//! Backtester for a volatility-triggered cash-secured put strategy.
//!
//! Pipeline: market series → rolling IV signal → put trades (Black-Scholes
//! premiums) → daily cash/collateral ledger → performance summary.

pub mod backtest;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod pricing;
pub mod report;
pub mod signal;
pub mod sweep;

// Re-export commonly used types
pub use backtest::{build_ledger, generate_trades, BacktestEngine, BacktestResult, LedgerEntry, Trade};
pub use config::{BacktestConfig, DataSource};
pub use data::{generate_series, DataLoader, MarketObservation, MarketSeries, SyntheticConfig};
pub use error::{BacktestError, Result};
pub use metrics::{summarize, summarize_equity, MetricsCalculator, PerformanceSummary};
pub use pricing::{put_price, BlackScholes};
pub use report::{ChartSeries, ChartPoint};
pub use signal::{compute_signal, SignalRecord, SignalledSeries};
pub use sweep::{ParameterGrid, SweepRunner};
