//! Parallel parameter sweep.
//!
//! Every parameter set runs the full pipeline on the same preloaded series.
//! Runs share nothing mutable, so they are spread across the rayon pool.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::backtest::BacktestEngine;
use crate::config::BacktestConfig;
use crate::data::MarketSeries;
use crate::error::{BacktestError, Result};
use crate::metrics::PerformanceSummary;

use super::grid::{ParameterGrid, ParameterSet};

/// What happened to one parameter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunOutcome {
    Completed {
        summary: PerformanceSummary,
        total_trades: usize,
        total_pnl: Decimal,
    },
    /// The signal never produced a trade with an expiry in range.
    NoTrades,
    /// Any other failure, e.g. an invalid parameter combination.
    Failed(String),
}

/// Result for a single parameter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepOutcome {
    pub params: ParameterSet,
    pub outcome: RunOutcome,
}

impl SweepOutcome {
    pub fn sharpe_ratio(&self) -> Option<f64> {
        match &self.outcome {
            RunOutcome::Completed { summary, .. } => summary.sharpe_ratio,
            _ => None,
        }
    }

    /// 0 = completed with a Sharpe, 1 = completed without, 2 = no trades, 3 = failed.
    fn rank_class(&self) -> u8 {
        match &self.outcome {
            RunOutcome::Completed { summary, .. } if summary.sharpe_ratio.is_some() => 0,
            RunOutcome::Completed { .. } => 1,
            RunOutcome::NoTrades => 2,
            RunOutcome::Failed(_) => 3,
        }
    }
}

/// Sharpe descending; undefined Sharpe, empty runs and failures after.
fn compare_outcomes(a: &SweepOutcome, b: &SweepOutcome) -> Ordering {
    a.rank_class().cmp(&b.rank_class()).then_with(|| {
        match (a.sharpe_ratio(), b.sharpe_ratio()) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            _ => Ordering::Equal,
        }
    })
}

/// Grid search over signal and tenor parameters.
pub struct SweepRunner {
    param_grid: ParameterGrid,
    base_config: BacktestConfig,
}

impl SweepRunner {
    /// Create a new runner with the default grid.
    pub fn new(base_config: BacktestConfig) -> Self {
        Self {
            param_grid: ParameterGrid::default(),
            base_config,
        }
    }

    /// Set parameter grid.
    pub fn with_param_grid(mut self, grid: ParameterGrid) -> Self {
        self.param_grid = grid;
        self
    }

    pub fn param_grid(&self) -> &ParameterGrid {
        &self.param_grid
    }

    /// Run one parameter set.
    fn run_one(&self, params: &ParameterSet, series: &MarketSeries) -> SweepOutcome {
        let mut config = self.base_config.clone();
        params.apply_to_config(&mut config);

        let outcome = match BacktestEngine::new(config).and_then(|e| e.run_with_data(series)) {
            Ok(result) => RunOutcome::Completed {
                summary: result.summary,
                total_trades: result.trade_stats.total_trades,
                total_pnl: result.trade_stats.total_pnl,
            },
            Err(BacktestError::EmptyInput(_)) => RunOutcome::NoTrades,
            Err(e) => RunOutcome::Failed(e.to_string()),
        };

        SweepOutcome {
            params: *params,
            outcome,
        }
    }

    /// Run every combination in parallel and return them ranked.
    pub fn run(&self, series: Arc<MarketSeries>) -> Result<Vec<SweepOutcome>> {
        let combinations = self.param_grid.combinations();
        if combinations.is_empty() {
            return Err(BacktestError::InvalidInput(
                "parameter grid has no combinations".to_string(),
            ));
        }

        info!(
            combinations = combinations.len(),
            observations = series.len(),
            "Starting parameter sweep"
        );

        let progress = AtomicUsize::new(0);
        let total = combinations.len();

        let mut outcomes: Vec<SweepOutcome> = combinations
            .par_iter()
            .map(|params| {
                let outcome = self.run_one(params, &series);

                let done = progress.fetch_add(1, AtomicOrdering::Relaxed) + 1;
                if done % (total / 10).max(1) == 0 || done == total {
                    info!(
                        "  {:.0}% ({}/{} combinations)",
                        done as f64 / total as f64 * 100.0,
                        done,
                        total
                    );
                }

                outcome
            })
            .collect();

        outcomes.sort_by(compare_outcomes);

        if let Some(best) = outcomes.first() {
            info!(
                best = %best.params.key(),
                sharpe = ?best.sharpe_ratio(),
                "Sweep complete"
            );
        }

        Ok(outcomes)
    }
}
