//! Chart-ready series and terminal sparklines.
//!
//! The strategy's equity and the underlying's closes are put on the same
//! scale: closes are rebased so the first close inside the ledger span equals
//! the first ledger equity. No rendering happens here beyond sparklines.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::backtest::LedgerEntry;
use crate::data::MarketSeries;
use crate::error::{BacktestError, Result};

/// Characters used for sparkline rendering, ordered from low to high.
const SPARKLINE_CHARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// One dated value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Strategy equity next to the rebased underlying.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    /// One point per ledger day.
    pub equity: Vec<ChartPoint>,
    /// One point per trading day inside the ledger span.
    pub price: Vec<ChartPoint>,
}

impl ChartSeries {
    /// Build from a ledger and the series it was run on.
    pub fn build(ledger: &[LedgerEntry], series: &MarketSeries) -> Result<Self> {
        let (Some(first), Some(last)) = (ledger.first(), ledger.last()) else {
            return Err(BacktestError::EmptyInput(
                "cannot chart an empty ledger".to_string(),
            ));
        };

        let equity = ledger
            .iter()
            .map(|e| {
                e.equity
                    .to_f64()
                    .map(|value| ChartPoint {
                        date: e.date,
                        value,
                    })
                    .ok_or_else(|| {
                        BacktestError::InvalidInput(format!("equity {} on {}", e.equity, e.date))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let span = series.between(first.date, last.date);
        let base = equity[0].value;
        let price = match span.first() {
            Some(anchor) => {
                let scale = base / anchor.close;
                span.iter()
                    .map(|o| ChartPoint {
                        date: o.date,
                        value: o.close * scale,
                    })
                    .collect()
            }
            None => Vec::new(),
        };

        Ok(Self { equity, price })
    }

    pub fn equity_values(&self) -> Vec<f64> {
        self.equity.iter().map(|p| p.value).collect()
    }

    pub fn price_values(&self) -> Vec<f64> {
        self.price.iter().map(|p| p.value).collect()
    }
}

/// Generate an ASCII sparkline from a slice of values.
pub fn sparkline(values: &[f64], width: usize) -> String {
    if values.is_empty() || width == 0 {
        return String::new();
    }

    let sampled = if values.len() > width {
        downsample(values, width)
    } else {
        values.to_vec()
    };

    let min_val = sampled.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_val = sampled.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let range = max_val - min_val;

    sampled
        .iter()
        .map(|&val| {
            let normalized = if range > 0.0 {
                ((val - min_val) / range).clamp(0.0, 1.0)
            } else {
                0.5
            };
            SPARKLINE_CHARS[((normalized * 7.0).round() as usize).min(7)]
        })
        .collect()
}

/// Average consecutive chunks down to `target_len` values.
fn downsample(values: &[f64], target_len: usize) -> Vec<f64> {
    let chunk_size = values.len() as f64 / target_len as f64;
    let mut result = Vec::with_capacity(target_len);

    for i in 0..target_len {
        let start = (i as f64 * chunk_size).floor() as usize;
        let end = (((i + 1) as f64 * chunk_size).ceil() as usize).min(values.len());

        if start < end {
            let sum: f64 = values[start..end].iter().sum();
            result.push(sum / (end - start) as f64);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MarketObservation;
    use approx::assert_relative_eq;
    use chrono::Duration;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, 2).unwrap() + Duration::days(offset)
    }

    fn entry(offset: i64, equity: Decimal) -> LedgerEntry {
        LedgerEntry {
            date: day(offset),
            cash: equity,
            collateral: Decimal::ZERO,
            equity,
            open_positions: 0,
            daily_pnl: Decimal::ZERO,
        }
    }

    #[test]
    fn test_price_rebased_to_first_equity() {
        let series = MarketSeries::new(vec![
            MarketObservation::new(day(0), 50.0, 0.2),
            MarketObservation::new(day(1), 200.0, 0.2),
            MarketObservation::new(day(2), 220.0, 0.2),
            MarketObservation::new(day(4), 180.0, 0.2),
            MarketObservation::new(day(9), 300.0, 0.2),
        ])
        .unwrap();
        let ledger: Vec<LedgerEntry> = (1..=4).map(|o| entry(o, dec!(100000))).collect();

        let chart = ChartSeries::build(&ledger, &series).unwrap();

        assert_eq!(chart.equity.len(), 4);
        assert_eq!(chart.price.len(), 3);
        assert_eq!(chart.price[0].date, day(1));
        assert_relative_eq!(chart.price[0].value, 100000.0);
        assert_relative_eq!(chart.price[1].value, 110000.0, epsilon = 1e-6);
        assert_relative_eq!(chart.price[2].value, 90000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_empty_ledger_rejected() {
        let series =
            MarketSeries::new(vec![MarketObservation::new(day(0), 50.0, 0.2)]).unwrap();
        assert!(matches!(
            ChartSeries::build(&[], &series),
            Err(BacktestError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_sparkline_shape() {
        let spark = sparkline(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0], 8);
        assert_eq!(spark, "▁▂▃▄▅▆▇█");

        let flat = sparkline(&[5.0; 4], 10);
        assert_eq!(flat.chars().count(), 4);
        assert!(flat.chars().all(|c| c == '▅'));

        assert!(sparkline(&[], 10).is_empty());
    }

    #[test]
    fn test_sparkline_downsamples() {
        let values: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let spark = sparkline(&values, 20);
        assert_eq!(spark.chars().count(), 20);
        assert!(spark.starts_with('▁'));
        assert!(spark.ends_with('█'));
    }
}
