//! Backtest configuration.
//!
//! Loaded from TOML (see `config/default.toml`). Every field has a default,
//! so a file only needs to name what it overrides.

use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data::SyntheticConfig;
use crate::error::{BacktestError, Result};

/// Where the market observations come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DataSource {
    /// Persisted CSV or parquet file with date, close and IV columns.
    File {
        path: PathBuf,
        #[serde(default = "default_date_column")]
        date_column: String,
        #[serde(default = "default_close_column")]
        close_column: String,
        #[serde(default = "default_iv_column")]
        iv_column: String,
    },
    /// Seeded pseudo-random walk.
    Synthetic(SyntheticConfig),
}

fn default_date_column() -> String {
    "date".to_string()
}

fn default_close_column() -> String {
    "close".to_string()
}

fn default_iv_column() -> String {
    "iv".to_string()
}

impl DataSource {
    /// File source with the default column names.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File {
            path: path.into(),
            date_column: default_date_column(),
            close_column: default_close_column(),
            iv_column: default_iv_column(),
        }
    }
}

impl Default for DataSource {
    fn default() -> Self {
        Self::Synthetic(SyntheticConfig::default())
    }
}

/// Configuration for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Rolling IV window length, in observations.
    pub window: usize,

    /// Quantile of the window used as the sell threshold (0.80 = 80th percentile).
    pub percentile: f64,

    /// Option tenor in trading-day rows.
    pub tenor_days: usize,

    /// Trading days per year, for year fractions and annualisation.
    pub trading_days_per_year: u32,

    /// Starting cash for the account ledger.
    pub starting_cash: Decimal,

    /// Input data source.
    pub data: DataSource,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            window: 100,
            percentile: 0.80,
            tenor_days: 30,
            trading_days_per_year: 252,
            starting_cash: Decimal::from(100_000),
            data: DataSource::default(),
        }
    }
}

impl BacktestConfig {
    /// Parse a configuration from TOML text and validate it.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(BacktestError::InvalidInput(
                "window must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.percentile) {
            return Err(BacktestError::InvalidInput(format!(
                "percentile must be within [0, 1], got {}",
                self.percentile
            )));
        }
        if self.tenor_days == 0 {
            return Err(BacktestError::InvalidInput(
                "tenor_days must be at least 1".to_string(),
            ));
        }
        if self.trading_days_per_year == 0 {
            return Err(BacktestError::InvalidInput(
                "trading_days_per_year must be at least 1".to_string(),
            ));
        }
        if self.starting_cash <= Decimal::ZERO {
            return Err(BacktestError::InvalidInput(format!(
                "starting_cash must be positive, got {}",
                self.starting_cash
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config() {
        let config = BacktestConfig::default();
        assert_eq!(config.window, 100);
        assert_eq!(config.percentile, 0.80);
        assert_eq!(config.tenor_days, 30);
        assert_eq!(config.starting_cash, dec!(100000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_takes_defaults() {
        let config = BacktestConfig::from_toml_str("window = 20\npercentile = 0.9\n").unwrap();
        assert_eq!(config.window, 20);
        assert_eq!(config.percentile, 0.9);
        assert_eq!(config.tenor_days, 30);
        assert_eq!(config.data, DataSource::default());
    }

    #[test]
    fn test_file_source_from_toml() {
        let config = BacktestConfig::from_toml_str(
            "[data]\nkind = \"file\"\npath = \"data/spy.csv\"\niv_column = \"atm_iv\"\n",
        )
        .unwrap();

        match config.data {
            DataSource::File {
                path,
                date_column,
                iv_column,
                ..
            } => {
                assert_eq!(path, PathBuf::from("data/spy.csv"));
                assert_eq!(date_column, "date");
                assert_eq!(iv_column, "atm_iv");
            }
            other => panic!("expected file source, got {:?}", other),
        }
    }

    #[test]
    fn test_shipped_default_file_parses() {
        let content = include_str!("../config/default.toml");
        let config = BacktestConfig::from_toml_str(content).unwrap();
        assert_eq!(config, BacktestConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = BacktestConfig::from_toml_str("window = 0").unwrap_err();
        assert!(matches!(err, BacktestError::InvalidInput(_)));

        let err = BacktestConfig::from_toml_str("percentile = 1.5").unwrap_err();
        assert!(matches!(err, BacktestError::InvalidInput(_)));

        let err = BacktestConfig::from_toml_str("tenor_days = 0").unwrap_err();
        assert!(matches!(err, BacktestError::InvalidInput(_)));
    }
}
