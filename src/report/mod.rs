//! Output side: chart series, sparklines and file exports.

pub mod chart;
pub mod export;

pub use chart::{sparkline, ChartPoint, ChartSeries};
pub use export::{write_chart_csv, write_result_json, write_series_csv};
