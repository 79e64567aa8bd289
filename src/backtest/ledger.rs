//! Cash / collateral ledger.
//!
//! Replays a trade list one calendar day at a time, from the first entry to
//! the last expiry inclusive. Weekends and holidays get entries too; the
//! ledger is driven by dates, not by trading rows.
//!
//! Per day, entries are applied before expiries, and the snapshot is taken
//! after both:
//! - entry: post the strike as collateral, receive the premium
//! - expiry: release the collateral, credit the underlying's exit price
//!
//! Crediting the exit price instead of the strike books the settlement loss
//! `max(0, strike - exit_price)` against the collateral already debited.
//! When the put expires above the strike the credit is capped at the strike.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::trade::Trade;
use crate::error::{BacktestError, Result};

/// Account state at the end of one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub date: NaiveDate,
    pub cash: Decimal,
    /// Sum of strikes of open puts.
    pub collateral: Decimal,
    /// `cash + collateral`.
    pub equity: Decimal,
    pub open_positions: usize,
    /// Equity change since the previous entry (or since the starting cash).
    pub daily_pnl: Decimal,
}

/// Builds the daily ledger from a trade list.
#[derive(Debug, Clone)]
pub struct AccountLedger {
    starting_cash: Decimal,
}

impl Default for AccountLedger {
    fn default() -> Self {
        Self {
            starting_cash: Decimal::from(100_000),
        }
    }
}

impl AccountLedger {
    pub fn new(starting_cash: Decimal) -> Self {
        Self { starting_cash }
    }

    pub fn starting_cash(&self) -> Decimal {
        self.starting_cash
    }

    /// Replay `trades` into one entry per calendar day.
    pub fn build(&self, trades: &[Trade]) -> Result<Vec<LedgerEntry>> {
        let (Some(start), Some(end)) = (
            trades.iter().map(|t| t.entry_date()).min(),
            trades.iter().map(|t| t.expiry_date()).max(),
        ) else {
            return Err(BacktestError::EmptyInput(
                "cannot build a ledger from zero trades".to_string(),
            ));
        };

        let mut entering: BTreeMap<NaiveDate, Vec<&Trade>> = BTreeMap::new();
        let mut expiring: BTreeMap<NaiveDate, Vec<&Trade>> = BTreeMap::new();
        for trade in trades {
            entering.entry(trade.entry_date()).or_default().push(trade);
            expiring.entry(trade.expiry_date()).or_default().push(trade);
        }

        let mut cash = self.starting_cash;
        let mut collateral = Decimal::ZERO;
        let mut open_positions = 0usize;
        let mut prev_equity = self.starting_cash;
        let span = usize::try_from((end - start).num_days()).map_err(|_| {
            BacktestError::InvalidInput(format!("last expiry {} precedes first entry {}", end, start))
        })?;
        let mut ledger = Vec::with_capacity(span.saturating_add(1));

        for date in start.iter_days().take_while(|d| *d <= end) {
            for trade in entering.get(&date).into_iter().flatten() {
                cash -= trade.strike();
                cash += trade.premium();
                collateral += trade.strike();
                open_positions += 1;
                debug!(%date, id = trade.id(), strike = %trade.strike(), premium = %trade.premium(), "Opened put");
            }

            for trade in expiring.get(&date).into_iter().flatten() {
                collateral -= trade.strike();
                cash += trade.exit_price().min(trade.strike());
                open_positions -= 1;
                debug!(%date, id = trade.id(), exit = %trade.exit_price(), pnl = %trade.pnl(), "Settled put");
            }

            let equity = cash + collateral;
            ledger.push(LedgerEntry {
                date,
                cash,
                collateral,
                equity,
                open_positions,
                daily_pnl: equity - prev_equity,
            });
            prev_equity = equity;
        }

        info!(
            trades = trades.len(),
            days = ledger.len(),
            start = %start,
            end = %end,
            final_equity = %prev_equity,
            "Built ledger"
        );
        Ok(ledger)
    }
}

/// Build a ledger with the given starting cash.
pub fn build_ledger(trades: &[Trade], starting_cash: Decimal) -> Result<Vec<LedgerEntry>> {
    AccountLedger::new(starting_cash).build(trades)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn date(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, 2).unwrap() + Duration::days(offset)
    }

    fn trade(id: usize, entry: i64, expiry: i64, strike: Decimal, premium: Decimal, exit: Decimal) -> Trade {
        Trade::new(id, date(entry), date(expiry), strike, premium, exit, 0.3, 0.25).unwrap()
    }

    #[test]
    fn test_empty_trades_fail() {
        let err = build_ledger(&[], dec!(100000)).unwrap_err();
        assert!(matches!(err, BacktestError::EmptyInput(_)));
    }

    #[test]
    fn test_single_losing_cycle() {
        let trades = vec![trade(0, 0, 10, dec!(450), dec!(5.0), dec!(440))];
        let ledger = build_ledger(&trades, dec!(100000)).unwrap();

        assert_eq!(ledger.len(), 11);

        let first = &ledger[0];
        assert_eq!(first.cash, dec!(99555));
        assert_eq!(first.collateral, dec!(450));
        assert_eq!(first.equity, dec!(100005));
        assert_eq!(first.open_positions, 1);

        let last = ledger.last().unwrap();
        assert_eq!(last.date, date(10));
        assert_eq!(last.collateral, Decimal::ZERO);
        assert_eq!(last.equity, dec!(99995.0));
        assert_eq!(last.equity, dec!(100000) + trades[0].pnl());
        assert_eq!(last.daily_pnl, dec!(-10));
    }

    #[test]
    fn test_winning_cycle_books_premium_only() {
        let trades = vec![trade(0, 0, 3, dec!(450), dec!(5.0), dec!(470))];
        let ledger = build_ledger(&trades, dec!(100000)).unwrap();

        let last = ledger.last().unwrap();
        assert_eq!(last.equity, dec!(100005));
        assert_eq!(last.equity, dec!(100000) + trades[0].pnl());
    }

    #[test]
    fn test_every_calendar_day_present() {
        let trades = vec![
            trade(0, 0, 4, dec!(100), dec!(1), dec!(100)),
            trade(1, 2, 9, dec!(100), dec!(1), dec!(100)),
        ];
        let ledger = build_ledger(&trades, dec!(1000)).unwrap();

        assert_eq!(ledger.len(), 10);
        for (i, entry) in ledger.iter().enumerate() {
            assert_eq!(entry.date, date(i as i64));
            assert_eq!(entry.equity, entry.cash + entry.collateral);
        }
    }

    #[test]
    fn test_same_day_entry_and_expiry() {
        // Trade 1 opens on the day trade 0 expires.
        let trades = vec![
            trade(0, 0, 5, dec!(100), dec!(2), dec!(90)),
            trade(1, 5, 8, dec!(90), dec!(3), dec!(95)),
        ];
        let ledger = build_ledger(&trades, dec!(1000)).unwrap();

        let day5 = &ledger[5];
        assert_eq!(day5.collateral, dec!(90));
        assert_eq!(day5.open_positions, 1);
        // 1000 + 2 - 10 + 3
        assert_eq!(day5.equity, dec!(995));

        let last = ledger.last().unwrap();
        assert_eq!(last.equity, dec!(1000) + trades[0].pnl() + trades[1].pnl());
        assert_eq!(last.collateral, Decimal::ZERO);
    }

    #[test]
    fn test_concurrent_positions_stack_collateral() {
        let trades = vec![
            trade(0, 0, 6, dec!(100), dec!(1), dec!(100)),
            trade(1, 1, 7, dec!(101), dec!(1), dec!(100)),
            trade(2, 1, 8, dec!(102), dec!(1), dec!(100)),
        ];
        let ledger = build_ledger(&trades, dec!(1000)).unwrap();

        assert_eq!(ledger[1].collateral, dec!(303));
        assert_eq!(ledger[1].open_positions, 3);
        assert_eq!(ledger[1].cash, dec!(1000) - dec!(303) + dec!(3));

        let total_pnl: Decimal = trades.iter().map(|t| t.pnl()).sum();
        assert_eq!(ledger.last().unwrap().equity, dec!(1000) + total_pnl);
    }

    #[test]
    fn test_daily_pnl_sums_to_total() {
        let trades = vec![
            trade(0, 0, 4, dec!(100), dec!(1.5), dec!(97)),
            trade(1, 2, 6, dec!(98), dec!(1.25), dec!(99)),
        ];
        let ledger = build_ledger(&trades, dec!(500)).unwrap();

        let summed: Decimal = ledger.iter().map(|e| e.daily_pnl).sum();
        assert_eq!(summed, ledger.last().unwrap().equity - dec!(500));
    }
}
