//! Deterministic synthetic market data.
//!
//! Produces one calendar year of weekday observations: the close follows a
//! drifted random walk and IV a driftless walk clamped to [0.05, 0.60].
//! The generator is a seeded ChaCha8 stream, so a given seed always yields
//! the same series on every platform.

use chrono::{Datelike, NaiveDate, Weekday};
use rand::distributions::Distribution;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;
use tracing::debug;

use super::types::{MarketObservation, MarketSeries};
use crate::error::{BacktestError, Result};

/// IV bounds for the synthetic walk.
pub const MIN_SYNTHETIC_IV: f64 = 0.05;
pub const MAX_SYNTHETIC_IV: f64 = 0.60;

/// Parameters of the synthetic generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    /// RNG seed.
    pub seed: u64,
    /// Calendar year to cover.
    pub year: i32,
    /// First close.
    pub start_price: f64,
    /// Mean daily price change.
    pub drift: f64,
    /// Standard deviation of the daily price change.
    pub price_step_std: f64,
    /// First IV.
    pub start_iv: f64,
    /// Standard deviation of the daily IV change.
    pub iv_step_std: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            year: 2023,
            start_price: 400.0,
            drift: 0.1,
            price_step_std: 2.0,
            start_iv: 0.20,
            iv_step_std: 0.01,
        }
    }
}

impl SyntheticConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// All Monday-Friday dates of a calendar year.
pub fn weekdays_of_year(year: i32) -> Result<Vec<NaiveDate>> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| BacktestError::InvalidInput(format!("invalid year {}", year)))?;

    Ok(start
        .iter_days()
        .take_while(|d| d.year() == year)
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .collect())
}

/// Generate a synthetic series.
pub fn generate_series(config: &SyntheticConfig) -> Result<MarketSeries> {
    if !(config.start_price.is_finite() && config.start_price > 0.0) {
        return Err(BacktestError::InvalidInput(format!(
            "start_price must be positive, got {}",
            config.start_price
        )));
    }

    let price_step = Normal::new(config.drift, config.price_step_std)
        .map_err(|e| BacktestError::InvalidInput(format!("price step distribution: {}", e)))?;
    let iv_step = Normal::new(0.0, config.iv_step_std)
        .map_err(|e| BacktestError::InvalidInput(format!("iv step distribution: {}", e)))?;

    let dates = weekdays_of_year(config.year)?;
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

    // Keeps the walk strictly positive.
    let price_floor = config.start_price * 0.01;

    let mut close = config.start_price;
    let mut iv = config.start_iv.clamp(MIN_SYNTHETIC_IV, MAX_SYNTHETIC_IV);
    let mut observations = Vec::with_capacity(dates.len());

    for (idx, date) in dates.into_iter().enumerate() {
        if idx > 0 {
            close = (close + price_step.sample(&mut rng)).max(price_floor);
            iv = (iv + iv_step.sample(&mut rng)).clamp(MIN_SYNTHETIC_IV, MAX_SYNTHETIC_IV);
        }
        observations.push(MarketObservation::new(date, close, iv));
    }

    debug!(
        seed = config.seed,
        year = config.year,
        days = observations.len(),
        "Generated synthetic series"
    );

    MarketSeries::new(observations)
}
