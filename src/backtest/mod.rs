//! Backtesting engine for the cash-secured put strategy.
//!
//! This module provides the trade and account side of the pipeline:
//! - Trade generation from triggered signals (entry, strike, premium, expiry)
//! - Day-by-day cash / collateral ledger
//! - The engine tying signal, trades, ledger and metrics together

pub mod engine;
pub mod ledger;
pub mod trade;

pub use engine::{BacktestEngine, BacktestResult};
pub use ledger::{build_ledger, AccountLedger, LedgerEntry};
pub use trade::{generate_trades, ExitReason, Trade, TradeSimulator};
