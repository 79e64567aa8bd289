pub mod loader;
pub mod synthetic;
pub mod types;

pub use loader::{dataframe_to_series, DataLoader};
pub use synthetic::{generate_series, weekdays_of_year, SyntheticConfig};
pub use types::{MarketObservation, MarketSeries};
