//! Performance metrics calculator.
//!
//! Return statistics over an equity curve, drawdown analysis, and per-trade
//! statistics.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backtest::{LedgerEntry, Trade};
use crate::error::{BacktestError, Result};

/// Return statistics for one equity curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// `equity[last] / equity[0] - 1`.
    pub total_return: f64,
    /// Population stdev of daily returns, annualized.
    pub annualized_volatility: f64,
    /// Annualized mean / stdev of daily returns. `None` when the stdev is zero.
    pub sharpe_ratio: Option<f64>,
    pub final_equity: f64,
    /// Largest peak-to-trough decline, in percent of the peak.
    pub max_drawdown_pct: f64,
    /// Number of points in the curve.
    pub trading_days: usize,
}

impl PerformanceSummary {
    /// Human-readable report.
    pub fn summary(&self) -> String {
        let sharpe = match self.sharpe_ratio {
            Some(s) => format!("{:.2}", s),
            None => "undefined".to_string(),
        };
        format!(
            "Total Return: {:.2}%\n\
             Annualized Volatility: {:.2}%\n\
             Sharpe Ratio: {}\n\
             Max Drawdown: {:.2}%\n\
             Final Equity: ${:.2}\n\
             Days: {}",
            self.total_return * 100.0,
            self.annualized_volatility * 100.0,
            sharpe,
            self.max_drawdown_pct,
            self.final_equity,
            self.trading_days,
        )
    }
}

/// Drawdown analysis details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawdownAnalysis {
    pub max_drawdown: Decimal,
    pub max_drawdown_pct: f64,
    pub peak_date: Option<NaiveDate>,
    pub trough_date: Option<NaiveDate>,
    /// Days from the peak to the deepest trough.
    pub duration_days: i64,
    pub drawdown_periods: usize,
}

/// Aggregate statistics over a trade list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeStatistics {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub win_rate: f64,
    pub total_premium: Decimal,
    pub total_pnl: Decimal,
    pub avg_days_held: f64,
    /// Mean of per-trade P&L over collateral.
    pub avg_return_on_collateral: f64,
    pub max_concurrent_positions: usize,
}

/// Metrics calculator.
#[derive(Debug, Clone, Copy)]
pub struct MetricsCalculator {
    periods_per_year: u32,
}

impl Default for MetricsCalculator {
    fn default() -> Self {
        Self {
            periods_per_year: 252,
        }
    }
}

impl MetricsCalculator {
    pub fn new(periods_per_year: u32) -> Self {
        Self { periods_per_year }
    }

    /// Summarize a ledger's equity curve.
    pub fn summarize(&self, ledger: &[LedgerEntry]) -> Result<PerformanceSummary> {
        let equity = ledger
            .iter()
            .map(|e| {
                e.equity.to_f64().ok_or_else(|| {
                    BacktestError::InvalidInput(format!(
                        "equity {} on {} is not representable",
                        e.equity, e.date
                    ))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        let mut summary = self.summarize_equity(&equity)?;
        summary.max_drawdown_pct = Self::analyze_drawdown(ledger)?.max_drawdown_pct;
        Ok(summary)
    }

    /// Summarize any equity curve sampled once per period.
    pub fn summarize_equity(&self, equity: &[f64]) -> Result<PerformanceSummary> {
        if equity.len() < 2 {
            return Err(BacktestError::InsufficientData(format!(
                "need at least 2 equity points, got {}",
                equity.len()
            )));
        }
        if let Some(bad) = equity.iter().find(|e| !e.is_finite() || **e <= 0.0) {
            return Err(BacktestError::InsufficientData(format!(
                "equity must stay positive, got {}",
                bad
            )));
        }

        let returns = daily_returns(equity);
        let mean = returns.iter().sum::<f64>() / returns.len() as f64;
        let variance =
            returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;
        let std_dev = variance.sqrt();
        let annualizer = (self.periods_per_year as f64).sqrt();

        let first = equity[0];
        let last = equity[equity.len() - 1];
        let sharpe_ratio = (std_dev > 0.0).then(|| mean / std_dev * annualizer);

        debug!(points = equity.len(), mean, std_dev, "Summarized equity curve");

        Ok(PerformanceSummary {
            total_return: last / first - 1.0,
            annualized_volatility: std_dev * annualizer,
            sharpe_ratio,
            final_equity: last,
            max_drawdown_pct: max_drawdown_pct(equity),
            trading_days: equity.len(),
        })
    }

    /// Analyze drawdown from a ledger.
    pub fn analyze_drawdown(ledger: &[LedgerEntry]) -> Result<DrawdownAnalysis> {
        let Some(first) = ledger.first() else {
            return Ok(DrawdownAnalysis::default());
        };

        let mut peak = first.equity;
        let mut peak_date = first.date;
        let mut in_drawdown = false;
        let mut analysis = DrawdownAnalysis::default();

        for entry in ledger {
            if entry.equity >= peak {
                if in_drawdown && entry.equity > peak {
                    analysis.drawdown_periods += 1;
                    in_drawdown = false;
                }
                peak = entry.equity;
                peak_date = entry.date;
                continue;
            }

            in_drawdown = true;
            let drawdown = peak - entry.equity;
            if drawdown > analysis.max_drawdown {
                analysis.max_drawdown = drawdown;
                analysis.max_drawdown_pct = drawdown_pct(drawdown, peak, entry.date)?;
                analysis.peak_date = Some(peak_date);
                analysis.trough_date = Some(entry.date);
                analysis.duration_days = (entry.date - peak_date).num_days();
            }
        }
        if in_drawdown {
            analysis.drawdown_periods += 1;
        }

        Ok(analysis)
    }

    /// Trade statistics. The concurrent-position count comes from the ledger.
    pub fn trade_statistics(trades: &[Trade], ledger: &[LedgerEntry]) -> Result<TradeStatistics> {
        let total_trades = trades.len();
        let winning_trades = trades.iter().filter(|t| t.is_winner()).count();
        let win_rate = if total_trades > 0 {
            winning_trades as f64 / total_trades as f64
        } else {
            0.0
        };
        let avg_days_held = if total_trades > 0 {
            trades.iter().map(|t| t.days_held() as f64).sum::<f64>() / total_trades as f64
        } else {
            0.0
        };
        let avg_return_on_collateral = if total_trades > 0 {
            let mut sum = 0.0;
            for trade in trades {
                sum += trade.return_on_collateral()?;
            }
            sum / total_trades as f64
        } else {
            0.0
        };

        Ok(TradeStatistics {
            total_trades,
            winning_trades,
            win_rate,
            total_premium: trades.iter().map(|t| t.premium()).sum(),
            total_pnl: trades.iter().map(|t| t.pnl()).sum(),
            avg_days_held,
            avg_return_on_collateral,
            max_concurrent_positions: ledger
                .iter()
                .map(|e| e.open_positions)
                .max()
                .unwrap_or(0),
        })
    }
}

/// Decline below the peak in percent. Zero when the peak itself is not positive.
fn drawdown_pct(drawdown: Decimal, peak: Decimal, date: NaiveDate) -> Result<f64> {
    if peak <= Decimal::ZERO {
        return Ok(0.0);
    }
    drawdown
        .checked_div(peak)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .and_then(|pct| pct.to_f64())
        .ok_or_else(|| {
            BacktestError::InvalidInput(format!(
                "drawdown {} from peak {} on {} is not representable",
                drawdown, peak, date
            ))
        })
}

/// Simple returns `x[k] / x[k-1] - 1`.
pub fn daily_returns(equity: &[f64]) -> Vec<f64> {
    equity.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

fn max_drawdown_pct(equity: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0_f64;
    for &value in equity {
        peak = peak.max(value);
        if peak > 0.0 {
            worst = worst.max((peak - value) / peak * 100.0);
        }
    }
    worst
}

/// Summarize a ledger with 252 periods per year.
pub fn summarize(ledger: &[LedgerEntry]) -> Result<PerformanceSummary> {
    MetricsCalculator::default().summarize(ledger)
}

/// Summarize an equity curve with 252 periods per year.
pub fn summarize_equity(equity: &[f64]) -> Result<PerformanceSummary> {
    MetricsCalculator::default().summarize_equity(equity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn ledger(equity: &[Decimal]) -> Vec<LedgerEntry> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        equity
            .iter()
            .enumerate()
            .map(|(i, &e)| LedgerEntry {
                date: start + Duration::days(i as i64),
                cash: e,
                collateral: Decimal::ZERO,
                equity: e,
                open_positions: i % 3,
                daily_pnl: Decimal::ZERO,
            })
            .collect()
    }

    #[test]
    fn test_known_returns() {
        // Returns: +10%, -10%
        let summary = summarize_equity(&[100.0, 110.0, 99.0]).unwrap();

        assert_relative_eq!(summary.total_return, -0.01, epsilon = 1e-12);
        assert_relative_eq!(summary.annualized_volatility, 0.1 * 252.0_f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(summary.sharpe_ratio.unwrap(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(summary.max_drawdown_pct, 10.0, epsilon = 1e-9);
        assert_eq!(summary.trading_days, 3);
        assert_eq!(summary.final_equity, 99.0);
    }

    #[test]
    fn test_constant_equity_sharpe_undefined() {
        let summary = summarize_equity(&[1000.0; 10]).unwrap();
        assert_eq!(summary.sharpe_ratio, None);
        assert_eq!(summary.annualized_volatility, 0.0);
        assert_eq!(summary.total_return, 0.0);
    }

    #[test]
    fn test_constant_positive_return_sharpe_undefined() {
        let equity: Vec<f64> = (0..6).map(|i| 100.0 * 2.0_f64.powi(i)).collect();
        let summary = summarize_equity(&equity).unwrap();
        assert!(summary.sharpe_ratio.is_none());
    }

    #[test]
    fn test_insufficient_data() {
        assert!(matches!(
            summarize_equity(&[100.0]),
            Err(BacktestError::InsufficientData(_))
        ));
        assert!(matches!(
            summarize(&[]),
            Err(BacktestError::InsufficientData(_))
        ));
        assert!(matches!(
            summarize_equity(&[0.0, 100.0]),
            Err(BacktestError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_periods_per_year_scaling() {
        let equity = [100.0, 101.0, 100.5, 102.0];
        let daily = MetricsCalculator::new(252).summarize_equity(&equity).unwrap();
        let weekly = MetricsCalculator::new(52).summarize_equity(&equity).unwrap();
        assert_relative_eq!(
            daily.annualized_volatility / weekly.annualized_volatility,
            (252.0_f64 / 52.0).sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_summarize_ledger() {
        let entries = ledger(&[dec!(100000), dec!(100500), dec!(99500), dec!(101000)]);
        let summary = summarize(&entries).unwrap();
        assert_relative_eq!(summary.total_return, 0.01, epsilon = 1e-12);
        assert_relative_eq!(summary.max_drawdown_pct, 1000.0 / 100500.0 * 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_drawdown_analysis() {
        let entries = ledger(&[dec!(100), dec!(120), dec!(90), dec!(100), dec!(130), dec!(125)]);
        let dd = MetricsCalculator::analyze_drawdown(&entries).unwrap();

        assert_eq!(dd.max_drawdown, dec!(30));
        assert_relative_eq!(dd.max_drawdown_pct, 25.0, epsilon = 1e-9);
        assert_eq!(dd.peak_date, Some(entries[1].date));
        assert_eq!(dd.trough_date, Some(entries[2].date));
        assert_eq!(dd.duration_days, 1);
        assert_eq!(dd.drawdown_periods, 2);
    }

    #[test]
    fn test_drawdown_analysis_empty() {
        let analysis = MetricsCalculator::analyze_drawdown(&[]).unwrap();
        assert_eq!(analysis.max_drawdown_pct, 0.0);
        assert_eq!(analysis.drawdown_periods, 0);
    }

    #[test]
    fn test_trade_statistics() {
        let d = |o: i64| NaiveDate::from_ymd_opt(2023, 3, 1).unwrap() + Duration::days(o);
        let trades = vec![
            Trade::new(0, d(0), d(30), dec!(100), dec!(2), dec!(105), 0.3, 0.25).unwrap(),
            Trade::new(1, d(1), d(31), dec!(100), dec!(2), dec!(95), 0.3, 0.25).unwrap(),
        ];
        let entries = ledger(&[dec!(100), dec!(100), dec!(100)]);
        let stats = MetricsCalculator::trade_statistics(&trades, &entries).unwrap();

        assert_eq!(stats.total_trades, 2);
        assert_eq!(stats.winning_trades, 1);
        assert_eq!(stats.win_rate, 0.5);
        assert_eq!(stats.total_premium, dec!(4));
        assert_eq!(stats.total_pnl, dec!(-1));
        assert_eq!(stats.avg_days_held, 30.0);
        // (2 / 100 + -3 / 100) / 2
        assert_relative_eq!(stats.avg_return_on_collateral, -0.005, epsilon = 1e-12);
        assert_eq!(stats.max_concurrent_positions, 2);
    }

    #[test]
    fn test_drawdown_pct_exact_in_decimal() {
        let entries = ledger(&[dec!(3), dec!(2)]);
        let dd = MetricsCalculator::analyze_drawdown(&entries).unwrap();
        assert_eq!(dd.max_drawdown, dec!(1));
        assert_relative_eq!(dd.max_drawdown_pct, 100.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_drawdown_from_non_positive_peak() {
        let entries = ledger(&[dec!(0), dec!(-5)]);
        let dd = MetricsCalculator::analyze_drawdown(&entries).unwrap();
        assert_eq!(dd.max_drawdown, dec!(5));
        assert_eq!(dd.max_drawdown_pct, 0.0);
    }

    #[test]
    fn test_summary_text() {
        let summary = summarize_equity(&[100.0, 100.0]).unwrap();
        assert!(summary.summary().contains("Sharpe Ratio: undefined"));
    }
}
