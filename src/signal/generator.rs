//! Rolling IV threshold and sell trigger.
//!
//! For each observation the threshold is the `percentile` quantile of the
//! last `window` IVs, the current one included. The trigger fires when the
//! current IV is strictly above that threshold. Until the window has filled
//! the threshold is undefined and the trigger is off.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::percentile::RollingWindow;
use crate::data::{MarketObservation, MarketSeries};
use crate::error::{BacktestError, Result};

/// Signal state for one observation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    /// Rolling IV quantile, `None` until the window is full.
    pub threshold: Option<f64>,
    /// Current IV is above the threshold.
    pub triggered: bool,
}

/// Compute one signal record per observation, in the same order.
///
/// A window longer than the series is not an error: every record is simply
/// undefined and untriggered.
pub fn compute_signal(
    observations: &[MarketObservation],
    window: usize,
    percentile: f64,
) -> Result<Vec<SignalRecord>> {
    if window == 0 {
        return Err(BacktestError::InvalidInput(
            "signal window must be at least 1".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&percentile) {
        return Err(BacktestError::InvalidInput(format!(
            "percentile must be within [0, 1], got {}",
            percentile
        )));
    }

    if observations.len() < window {
        warn!(
            window,
            observations = observations.len(),
            "Window longer than series, no signal can fire"
        );
        return Ok(vec![SignalRecord::default(); observations.len()]);
    }

    let mut rolling = RollingWindow::new(window);
    let records: Vec<SignalRecord> = observations
        .iter()
        .map(|obs| {
            rolling.push(obs.iv);
            if !rolling.is_full() {
                return SignalRecord::default();
            }
            let threshold = rolling.quantile(percentile);
            SignalRecord {
                threshold,
                triggered: threshold.is_some_and(|t| obs.iv > t),
            }
        })
        .collect();

    let triggered = records.iter().filter(|r| r.triggered).count();
    info!(window, percentile, triggered, "Computed IV signal");

    Ok(records)
}

/// An observation together with its signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalledObservation {
    pub observation: MarketObservation,
    pub signal: SignalRecord,
}

/// Observations with their signals attached, one composite per trading day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalledSeries {
    entries: Vec<SignalledObservation>,
}

impl SignalledSeries {
    /// Pair a series with precomputed signals. Lengths must match.
    pub fn new(series: &MarketSeries, signals: Vec<SignalRecord>) -> Result<Self> {
        if series.len() != signals.len() {
            return Err(BacktestError::MisalignedSeries(format!(
                "{} observations but {} signal records",
                series.len(),
                signals.len()
            )));
        }

        let entries = series
            .iter()
            .zip(signals)
            .map(|(&observation, signal)| SignalledObservation {
                observation,
                signal,
            })
            .collect();

        Ok(Self { entries })
    }

    /// Compute signals for a series and attach them.
    pub fn compute(series: &MarketSeries, window: usize, percentile: f64) -> Result<Self> {
        let signals = compute_signal(series.observations(), window, percentile)?;
        Self::new(series, signals)
    }

    pub fn entries(&self) -> &[SignalledObservation] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&SignalledObservation> {
        self.entries.get(idx)
    }

    /// Number of triggered days.
    pub fn trigger_count(&self) -> usize {
        self.entries.iter().filter(|e| e.signal.triggered).count()
    }

    pub fn signals(&self) -> impl Iterator<Item = &SignalRecord> + '_ {
        self.entries.iter().map(|e| &e.signal)
    }
}
