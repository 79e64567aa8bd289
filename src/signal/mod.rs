//! Volatility signal module.
//!
//! Provides:
//! - Quantile estimation with linear interpolation between order statistics
//! - Rolling-window IV threshold and sell trigger
//! - Observation + signal composite series consumed by the trade simulator

pub mod generator;
pub mod percentile;

pub use generator::{compute_signal, SignalRecord, SignalledObservation, SignalledSeries};
pub use percentile::{quantile, quantile_sorted, RollingWindow};
