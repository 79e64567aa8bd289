//! Black-Scholes pricing for European options.
//!
//! Supported input range: volatility in [0.01, 2] and time in [1/252, 2]
//! years. Outside it the formula is still evaluated, but as volatility goes
//! to zero `K·Φ(-d2) - S·Φ(-d1)` subtracts two nearly equal terms and the
//! result loses precision. Such results are clamped at zero, and anything
//! non-finite is reported as an error instead of being returned.

use std::f64::consts::{PI, SQRT_2};

use statrs::function::erf::erfc;

use crate::error::{BacktestError, Result};

/// Black-Scholes calculator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlackScholes {
    /// Risk-free interest rate (continuously compounded).
    pub rate: f64,
    /// Dividend yield.
    pub dividend: f64,
}

impl Default for BlackScholes {
    fn default() -> Self {
        Self {
            rate: 0.0,
            dividend: 0.0,
        }
    }
}

impl BlackScholes {
    pub fn new(rate: f64, dividend: f64) -> Self {
        Self { rate, dividend }
    }

    fn validate(spot: f64, strike: f64, vol: f64, time: f64) -> Result<()> {
        let inputs = [("spot", spot), ("strike", strike), ("volatility", vol), ("time", time)];
        for (name, value) in inputs {
            if !value.is_finite() || value <= 0.0 {
                return Err(BacktestError::InvalidInput(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    fn d1(&self, spot: f64, strike: f64, vol: f64, time: f64) -> f64 {
        let numerator =
            (spot / strike).ln() + (self.rate - self.dividend + 0.5 * vol * vol) * time;
        numerator / (vol * time.sqrt())
    }

    fn d2(&self, spot: f64, strike: f64, vol: f64, time: f64) -> f64 {
        self.d1(spot, strike, vol, time) - vol * time.sqrt()
    }

    /// Standard normal CDF.
    fn norm_cdf(x: f64) -> f64 {
        0.5 * erfc(-x / SQRT_2)
    }

    /// Standard normal PDF.
    fn norm_pdf(x: f64) -> f64 {
        (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
    }

    fn finite(price: f64) -> Result<f64> {
        if price.is_finite() {
            Ok(price.max(0.0))
        } else {
            Err(BacktestError::InvalidInput(format!(
                "price evaluated to {}",
                price
            )))
        }
    }

    /// European put value.
    pub fn put_price(&self, spot: f64, strike: f64, vol: f64, time: f64) -> Result<f64> {
        Self::validate(spot, strike, vol, time)?;

        let d1 = self.d1(spot, strike, vol, time);
        let d2 = self.d2(spot, strike, vol, time);

        Self::finite(
            strike * (-self.rate * time).exp() * Self::norm_cdf(-d2)
                - spot * (-self.dividend * time).exp() * Self::norm_cdf(-d1),
        )
    }

    /// European call value.
    pub fn call_price(&self, spot: f64, strike: f64, vol: f64, time: f64) -> Result<f64> {
        Self::validate(spot, strike, vol, time)?;

        let d1 = self.d1(spot, strike, vol, time);
        let d2 = self.d2(spot, strike, vol, time);

        Self::finite(
            spot * (-self.dividend * time).exp() * Self::norm_cdf(d1)
                - strike * (-self.rate * time).exp() * Self::norm_cdf(d2),
        )
    }

    /// Vega per unit of volatility (same for calls and puts).
    pub fn vega(&self, spot: f64, strike: f64, vol: f64, time: f64) -> Result<f64> {
        Self::validate(spot, strike, vol, time)?;

        let d1 = self.d1(spot, strike, vol, time);
        Ok(spot * (-self.dividend * time).exp() * Self::norm_pdf(d1) * time.sqrt())
    }
}

/// Put value with zero rate and zero dividend yield.
pub fn put_price(spot: f64, strike: f64, volatility: f64, time_to_expiry_years: f64) -> Result<f64> {
    BlackScholes::default().put_price(spot, strike, volatility, time_to_expiry_years)
}
