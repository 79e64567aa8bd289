//! Performance metrics module.
//!
//! Return statistics over an equity curve:
//! - Total return, annualized volatility, Sharpe ratio
//! - Maximum drawdown
//! - Trade win rate and premium totals

pub mod calculator;

pub use calculator::{
    daily_returns, summarize, summarize_equity, DrawdownAnalysis, MetricsCalculator,
    PerformanceSummary, TradeStatistics,
};
