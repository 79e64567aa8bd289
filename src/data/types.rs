//! Core market data types.
//!
//! A backtest consumes one ordered series of daily observations for a single
//! underlying. The series is validated once at ingestion so that the rest of
//! the pipeline can rely on strictly increasing dates and sane values.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{BacktestError, Result};

/// One trading day of the underlying: closing price and implied volatility.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketObservation {
    /// Trading date.
    pub date: NaiveDate,

    /// Closing price of the underlying.
    pub close: f64,

    /// Implied volatility as a decimal (0.20 = 20%).
    pub iv: f64,
}

impl MarketObservation {
    pub fn new(date: NaiveDate, close: f64, iv: f64) -> Self {
        Self { date, close, iv }
    }

    fn check_values(&self) -> Result<()> {
        if !self.close.is_finite() || self.close <= 0.0 {
            return Err(BacktestError::InvalidInput(format!(
                "close on {} must be positive, got {}",
                self.date, self.close
            )));
        }
        if !self.iv.is_finite() || self.iv <= 0.0 || self.iv > 1.0 {
            return Err(BacktestError::InvalidInput(format!(
                "iv on {} must be within (0, 1], got {}",
                self.date, self.iv
            )));
        }
        Ok(())
    }
}

/// Validated, date-ordered series of observations.
///
/// Invariants: non-empty, strictly increasing dates, positive closes and
/// IV within (0, 1]. Gaps between dates (weekends, holidays) are allowed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSeries {
    observations: Vec<MarketObservation>,
}

impl MarketSeries {
    /// Validate and wrap a list of observations.
    pub fn new(observations: Vec<MarketObservation>) -> Result<Self> {
        if observations.is_empty() {
            return Err(BacktestError::EmptyInput(
                "market series has no observations".to_string(),
            ));
        }

        for obs in &observations {
            obs.check_values()?;
        }

        if let Some(pair) = observations.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(BacktestError::MisalignedSeries(format!(
                "dates must be strictly increasing: {} is followed by {}",
                pair[0].date, pair[1].date
            )));
        }

        Ok(Self { observations })
    }

    /// Build from three parallel columns, as read from a table.
    pub fn from_columns(dates: Vec<NaiveDate>, closes: Vec<f64>, ivs: Vec<f64>) -> Result<Self> {
        if dates.len() != closes.len() || dates.len() != ivs.len() {
            return Err(BacktestError::MisalignedSeries(format!(
                "column lengths differ: {} dates, {} closes, {} ivs",
                dates.len(),
                closes.len(),
                ivs.len()
            )));
        }

        let observations = dates
            .into_iter()
            .zip(closes)
            .zip(ivs)
            .map(|((date, close), iv)| MarketObservation::new(date, close, iv))
            .collect();

        Self::new(observations)
    }

    /// Join a price history and an IV history keyed by date.
    ///
    /// Both maps must cover exactly the same dates.
    pub fn from_keyed(
        closes: &BTreeMap<NaiveDate, f64>,
        ivs: &BTreeMap<NaiveDate, f64>,
    ) -> Result<Self> {
        if let Some(date) = closes.keys().find(|d| !ivs.contains_key(d)) {
            return Err(BacktestError::MisalignedSeries(format!(
                "price on {} has no matching iv",
                date
            )));
        }
        if let Some(date) = ivs.keys().find(|d| !closes.contains_key(d)) {
            return Err(BacktestError::MisalignedSeries(format!(
                "iv on {} has no matching price",
                date
            )));
        }

        let observations = closes
            .iter()
            .map(|(&date, &close)| MarketObservation::new(date, close, ivs[&date]))
            .collect();

        Self::new(observations)
    }

    pub fn observations(&self) -> &[MarketObservation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&MarketObservation> {
        self.observations.get(idx)
    }

    pub fn first_date(&self) -> NaiveDate {
        self.observations[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.observations[self.observations.len() - 1].date
    }

    /// Observations with `start <= date <= end`.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> &[MarketObservation] {
        let lo = self.observations.partition_point(|o| o.date < start);
        let hi = self.observations.partition_point(|o| o.date <= end);
        &self.observations[lo..hi.max(lo)]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MarketObservation> {
        self.observations.iter()
    }
}

impl<'a> IntoIterator for &'a MarketSeries {
    type Item = &'a MarketObservation;
    type IntoIter = std::slice::Iter<'a, MarketObservation>;

    fn into_iter(self) -> Self::IntoIter {
        self.observations.iter()
    }
}
