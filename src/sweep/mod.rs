//! Parameter sweep over window, percentile and tenor.

pub mod grid;
pub mod runner;

pub use grid::{ParameterGrid, ParameterSet};
pub use runner::{RunOutcome, SweepOutcome, SweepRunner};
