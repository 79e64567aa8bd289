//! File exports: CSV tables via polars, full results as JSON.

use std::fs::File;
use std::path::Path;

use polars::prelude::*;
use tracing::info;

use super::chart::ChartSeries;
use crate::backtest::BacktestResult;
use crate::data::MarketSeries;
use crate::error::Result;

fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    info!(path = %path.display(), rows = df.height(), "Wrote CSV");
    Ok(())
}

/// Write a market series as `date,close,iv`, readable by the loader.
pub fn write_series_csv(series: &MarketSeries, path: &Path) -> Result<()> {
    let dates: Vec<String> = series.iter().map(|o| o.date.to_string()).collect();
    let closes: Vec<f64> = series.iter().map(|o| o.close).collect();
    let ivs: Vec<f64> = series.iter().map(|o| o.iv).collect();

    let mut df = df!(
        "date" => dates,
        "close" => closes,
        "iv" => ivs,
    )?;
    write_csv(&mut df, path)
}

/// Write a chart series in long form: `date,series,value`.
pub fn write_chart_csv(chart: &ChartSeries, path: &Path) -> Result<()> {
    let tagged = chart
        .equity
        .iter()
        .map(|p| (p, "equity"))
        .chain(chart.price.iter().map(|p| (p, "price")));

    let mut dates = Vec::new();
    let mut names = Vec::new();
    let mut values = Vec::new();
    for (point, name) in tagged {
        dates.push(point.date.to_string());
        names.push(name);
        values.push(point.value);
    }

    let mut df = df!(
        "date" => dates,
        "series" => names,
        "value" => values,
    )?;
    write_csv(&mut df, path)
}

/// Write the full result (config, trades, ledger, summaries) as pretty JSON.
pub fn write_result_json(result: &BacktestResult, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, result)?;
    info!(path = %path.display(), trades = result.trades.len(), "Wrote result JSON");
    Ok(())
}
