//! Trade generation for the cash-secured put strategy.
//!
//! Every triggered day sells one at-the-money put that expires `tenor_days`
//! observation rows later. Positions are allowed to overlap: a trigger while
//! earlier puts are still open opens another one, so collateral grows with
//! the number of concurrent triggers. Triggers too close to the end of the
//! series to reach an expiry row are skipped.

use chrono::NaiveDate;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{BacktestError, Result};
use crate::pricing::BlackScholes;
use crate::signal::SignalledSeries;

/// Decimal places kept for premiums.
const PREMIUM_DP: u32 = 6;

/// How a put ended at expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    /// Underlying closed at or above the strike; full premium kept.
    ExpiredWorthless,
    /// Underlying closed below the strike; settlement loss taken.
    Assigned,
}

/// Convert a finite `f64` amount to `Decimal`.
pub(crate) fn to_money(value: f64, what: &str) -> Result<Decimal> {
    Decimal::from_f64(value)
        .ok_or_else(|| BacktestError::InvalidInput(format!("{} is not finite: {}", what, value)))
}

/// One short put from sale to expiry. Immutable once created.
///
/// Deserialization goes through [`Trade::new`], so a decoded trade satisfies
/// the same date, price and P&L rules as a generated one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TradeRecord")]
pub struct Trade {
    id: usize,
    entry_date: NaiveDate,
    expiry_date: NaiveDate,
    strike: Decimal,
    premium: Decimal,
    exit_price: Decimal,
    pnl: Decimal,
    entry_iv: f64,
    threshold: f64,
}

/// Wire form of a [`Trade`] before validation.
#[derive(Deserialize)]
struct TradeRecord {
    id: usize,
    entry_date: NaiveDate,
    expiry_date: NaiveDate,
    strike: Decimal,
    premium: Decimal,
    exit_price: Decimal,
    pnl: Decimal,
    entry_iv: f64,
    threshold: f64,
}

impl TryFrom<TradeRecord> for Trade {
    type Error = BacktestError;

    fn try_from(record: TradeRecord) -> Result<Self> {
        let trade = Trade::new(
            record.id,
            record.entry_date,
            record.expiry_date,
            record.strike,
            record.premium,
            record.exit_price,
            record.entry_iv,
            record.threshold,
        )?;
        if trade.pnl != record.pnl {
            return Err(BacktestError::InvalidInput(format!(
                "trade {} records pnl {} but its prices give {}",
                record.id, record.pnl, trade.pnl
            )));
        }
        Ok(trade)
    }
}

impl Trade {
    /// Create a trade, computing `pnl = premium - max(0, strike - exit_price)`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: usize,
        entry_date: NaiveDate,
        expiry_date: NaiveDate,
        strike: Decimal,
        premium: Decimal,
        exit_price: Decimal,
        entry_iv: f64,
        threshold: f64,
    ) -> Result<Self> {
        if expiry_date <= entry_date {
            return Err(BacktestError::InvalidInput(format!(
                "expiry {} must be after entry {}",
                expiry_date, entry_date
            )));
        }
        if strike <= Decimal::ZERO || exit_price <= Decimal::ZERO {
            return Err(BacktestError::InvalidInput(format!(
                "strike ({}) and exit price ({}) must be positive",
                strike, exit_price
            )));
        }
        if premium < Decimal::ZERO {
            return Err(BacktestError::InvalidInput(format!(
                "premium must be non-negative, got {}",
                premium
            )));
        }

        let settlement_loss = (strike - exit_price).max(Decimal::ZERO);

        Ok(Self {
            id,
            entry_date,
            expiry_date,
            strike,
            premium,
            exit_price,
            pnl: premium - settlement_loss,
            entry_iv,
            threshold,
        })
    }

    /// Position in the generated trade list.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn entry_date(&self) -> NaiveDate {
        self.entry_date
    }

    pub fn expiry_date(&self) -> NaiveDate {
        self.expiry_date
    }

    /// Strike, equal to the close on the entry date. Also the collateral posted.
    pub fn strike(&self) -> Decimal {
        self.strike
    }

    pub fn premium(&self) -> Decimal {
        self.premium
    }

    /// Underlying close on the expiry date.
    pub fn exit_price(&self) -> Decimal {
        self.exit_price
    }

    pub fn pnl(&self) -> Decimal {
        self.pnl
    }

    /// IV on the entry date.
    pub fn entry_iv(&self) -> f64 {
        self.entry_iv
    }

    /// Rolling IV threshold the entry IV exceeded.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn exit_reason(&self) -> ExitReason {
        if self.exit_price >= self.strike {
            ExitReason::ExpiredWorthless
        } else {
            ExitReason::Assigned
        }
    }

    /// Check if trade was profitable.
    pub fn is_winner(&self) -> bool {
        self.pnl > Decimal::ZERO
    }

    /// Calendar days from entry to expiry.
    pub fn days_held(&self) -> i64 {
        (self.expiry_date - self.entry_date).num_days()
    }

    /// P&L as a fraction of the collateral posted.
    pub fn return_on_collateral(&self) -> Result<f64> {
        self.pnl
            .checked_div(self.strike)
            .and_then(|ratio| ratio.to_f64())
            .ok_or_else(|| {
                BacktestError::InvalidInput(format!(
                    "return on collateral of trade {} is not representable",
                    self.id
                ))
            })
    }
}

/// Turns a signalled series into trades.
#[derive(Debug, Clone)]
pub struct TradeSimulator {
    tenor_days: usize,
    trading_days_per_year: u32,
    pricer: BlackScholes,
}

impl Default for TradeSimulator {
    fn default() -> Self {
        Self {
            tenor_days: 30,
            trading_days_per_year: 252,
            pricer: BlackScholes::default(),
        }
    }
}

impl TradeSimulator {
    pub fn new(tenor_days: usize, trading_days_per_year: u32) -> Result<Self> {
        if tenor_days == 0 {
            return Err(BacktestError::InvalidInput(
                "tenor_days must be at least 1".to_string(),
            ));
        }
        if trading_days_per_year == 0 {
            return Err(BacktestError::InvalidInput(
                "trading_days_per_year must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            tenor_days,
            trading_days_per_year,
            pricer: BlackScholes::default(),
        })
    }

    pub fn tenor_days(&self) -> usize {
        self.tenor_days
    }

    /// Option life in years.
    pub fn tenor_years(&self) -> f64 {
        self.tenor_days as f64 / self.trading_days_per_year as f64
    }

    /// Generate trades in ascending entry order.
    pub fn generate(&self, series: &SignalledSeries) -> Result<Vec<Trade>> {
        let entries = series.entries();
        let time = self.tenor_years();
        let mut trades = Vec::new();

        for (idx, entry) in entries.iter().enumerate() {
            if !entry.signal.triggered {
                continue;
            }
            let Some(expiry) = idx
                .checked_add(self.tenor_days)
                .and_then(|j| entries.get(j))
            else {
                continue;
            };
            let threshold = entry.signal.threshold.ok_or_else(|| {
                BacktestError::InvalidInput(format!(
                    "signal on {} triggered without a threshold",
                    entry.observation.date
                ))
            })?;

            let spot = entry.observation.close;
            let premium = self.pricer.put_price(spot, spot, entry.observation.iv, time)?;

            let trade = Trade::new(
                trades.len(),
                entry.observation.date,
                expiry.observation.date,
                to_money(spot, "strike")?,
                to_money(premium, "premium")?.round_dp(PREMIUM_DP),
                to_money(expiry.observation.close, "exit price")?,
                entry.observation.iv,
                threshold,
            )?;

            debug!(
                entry = %trade.entry_date(),
                expiry = %trade.expiry_date(),
                strike = %trade.strike(),
                premium = %trade.premium(),
                pnl = %trade.pnl(),
                "Generated trade"
            );
            trades.push(trade);
        }

        info!(
            triggers = series.trigger_count(),
            trades = trades.len(),
            tenor_days = self.tenor_days,
            "Generated trades"
        );
        Ok(trades)
    }
}

/// Generate trades with a 252-day year and the zero-rate pricer.
pub fn generate_trades(series: &SignalledSeries, tenor_days: usize) -> Result<Vec<Trade>> {
    TradeSimulator::new(tenor_days, 252)?.generate(series)
}
