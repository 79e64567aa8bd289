//! Option pricing module.
//!
//! Closed-form Black-Scholes valuation of European options. The backtest
//! prices at-the-money puts with zero rates and zero dividends.

pub mod black_scholes;

pub use black_scholes::{put_price, BlackScholes};
