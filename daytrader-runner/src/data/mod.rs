//! Price data sources for backtests: CSV files on disk and seeded synthetic
//! series for development and benchmarks.

pub mod csv_store;
pub mod synthetic;

pub use csv_store::{parse_timestamp, CsvHistoricalStore};
pub use synthetic::{symbol_seed, synthetic_series};
