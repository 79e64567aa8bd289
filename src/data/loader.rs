//! Loader for persisted price/IV history.
//!
//! Reads a CSV or parquet table keyed by date with two value columns
//! (closing price and implied volatility) and turns it into a validated
//! [`MarketSeries`]. Dates are expected as `%Y-%m-%d` strings or as a
//! native date column.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use polars::prelude::*;
use tracing::info;

use super::types::MarketSeries;
use crate::error::{BacktestError, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Table loader for a single underlying's history.
pub struct DataLoader {
    path: PathBuf,
    date_column: String,
    close_column: String,
    iv_column: String,
}

impl DataLoader {
    /// Loader with the default column names `date`, `close`, `iv`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            date_column: "date".to_string(),
            close_column: "close".to_string(),
            iv_column: "iv".to_string(),
        }
    }

    pub fn with_columns(mut self, date: &str, close: &str, iv: &str) -> Self {
        self.date_column = date.to_string();
        self.close_column = close.to_string();
        self.iv_column = iv.to_string();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Scan the file lazily, picking the reader from the extension.
    pub fn load_lazy(&self) -> Result<LazyFrame> {
        if !self.path.exists() {
            return Err(BacktestError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("file not found: {}", self.path.display()),
            )));
        }

        let extension = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let lf = match extension.as_deref() {
            Some("parquet") => LazyFrame::scan_parquet(&self.path, ScanArgsParquet::default())?,
            Some("csv") => LazyCsvReader::new(&self.path).with_has_header(true).finish()?,
            other => {
                return Err(BacktestError::InvalidInput(format!(
                    "unsupported file type {:?} for {}",
                    other,
                    self.path.display()
                )))
            }
        };
        Ok(lf)
    }

    /// Load the date, close and IV columns in file order.
    pub fn load_dataframe(&self) -> Result<DataFrame> {
        let df = self
            .load_lazy()?
            .select([
                col(self.date_column.as_str()),
                col(self.close_column.as_str()),
                col(self.iv_column.as_str()),
            ])
            .collect()?;
        Ok(df)
    }

    /// Load and validate the series.
    pub fn load_series(&self) -> Result<MarketSeries> {
        let df = self.load_dataframe()?;
        let series = dataframe_to_series(&df, &self.date_column, &self.close_column, &self.iv_column)?;

        info!(
            path = %self.path.display(),
            rows = series.len(),
            start = %series.first_date(),
            end = %series.last_date(),
            "Loaded market series"
        );
        Ok(series)
    }
}

/// Convert a date/close/iv frame to a validated series.
///
/// Rows are taken in file order; ordering and value checks are left to
/// [`MarketSeries::new`] so that an unsorted file is reported, not fixed.
pub fn dataframe_to_series(
    df: &DataFrame,
    date_column: &str,
    close_column: &str,
    iv_column: &str,
) -> Result<MarketSeries> {
    let dates = parse_dates(df, date_column)?;
    let closes = float_column(df, close_column)?;
    let ivs = float_column(df, iv_column)?;
    MarketSeries::from_columns(dates, closes, ivs)
}

fn parse_dates(df: &DataFrame, name: &str) -> Result<Vec<NaiveDate>> {
    // Native date columns cast to ISO strings, so one parse path covers both.
    let column = df.column(name)?.cast(&DataType::String)?;
    let values = column.str()?;

    values
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            let value = value.ok_or_else(|| {
                BacktestError::MisalignedSeries(format!("missing {} in row {}", name, row))
            })?;
            NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|e| {
                BacktestError::InvalidInput(format!(
                    "invalid date {:?} in row {}: {}",
                    value, row, e
                ))
            })
        })
        .collect()
}

fn float_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    let values = column.f64()?;

    values
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value.ok_or_else(|| {
                BacktestError::MisalignedSeries(format!("missing {} in row {}", name, row))
            })
        })
        .collect()
}
