//! Error types for the backtesting pipeline.
//!
//! Every stage validates its own inputs at the boundary and reports one of
//! the distinct conditions below. Nothing in the pipeline converts a failure
//! into a sentinel number.

use polars::prelude::PolarsError;
use thiserror::Error;

/// Main error type for the backtesting pipeline.
#[derive(Error, Debug)]
pub enum BacktestError {
    /// Non-positive or non-finite numeric input, or an invalid parameter.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A stage received nothing to work on (e.g. a ledger with zero trades).
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Not enough data points to compute a statistic.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Price and IV data do not line up by date, or dates are not increasing.
    #[error("Misaligned series: {0}")]
    MisalignedSeries(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("TOML parsing error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for backtest operations.
pub type Result<T> = std::result::Result<T, BacktestError>;
