//! Parameter grid for sweeps.

use serde::{Deserialize, Serialize};

use crate::config::BacktestConfig;

/// Parameter values to sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterGrid {
    /// Rolling IV window lengths.
    pub windows: Vec<usize>,
    /// Threshold quantiles.
    pub percentiles: Vec<f64>,
    /// Option tenors in trading-day rows.
    pub tenors: Vec<usize>,
}

impl Default for ParameterGrid {
    fn default() -> Self {
        Self {
            windows: vec![20, 50, 100],
            percentiles: vec![0.70, 0.80, 0.90],
            tenors: vec![10, 20, 30],
        }
    }
}

impl ParameterGrid {
    /// Calculate total number of parameter combinations.
    pub fn total_combinations(&self) -> usize {
        self.windows.len() * self.percentiles.len() * self.tenors.len()
    }

    /// Generate all parameter combinations, window-major.
    pub fn combinations(&self) -> Vec<ParameterSet> {
        let mut combos = Vec::with_capacity(self.total_combinations());

        for &window in &self.windows {
            for &percentile in &self.percentiles {
                for &tenor_days in &self.tenors {
                    combos.push(ParameterSet {
                        window,
                        percentile,
                        tenor_days,
                    });
                }
            }
        }

        combos
    }
}

/// A single parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    pub window: usize,
    pub percentile: f64,
    pub tenor_days: usize,
}

impl ParameterSet {
    /// Apply this parameter set to a backtest config.
    pub fn apply_to_config(&self, config: &mut BacktestConfig) {
        config.window = self.window;
        config.percentile = self.percentile;
        config.tenor_days = self.tenor_days;
    }

    /// Create a unique key for this parameter set.
    pub fn key(&self) -> String {
        format!(
            "w{}_p{:.2}_t{}",
            self.window, self.percentile, self.tenor_days
        )
    }
}
