//! Daytrader Runner — everything around the trading core.
//!
//! This crate builds on `daytrader-core` to provide:
//! - Collaborator interfaces (market data, orders, persistence, history)
//! - Grid-search optimization over strategy parameters (rayon)
//! - CSV price store, synthetic series and JSON state persistence
//! - HTTP and paper brokers
//! - The live trading loop
//! - TOML configuration and report export

pub mod backtest;
pub mod broker;
pub mod collaborators;
pub mod config;
pub mod data;
pub mod export;
pub mod live;
pub mod optimizer;
pub mod persistence;

pub use backtest::{run_backtest, run_backtest_on_series, BacktestError, BacktestReport};
pub use broker::{HttpBroker, PaperBroker, PaperOrder, ReplayMarketData};
pub use collaborators::{
    CollaboratorError, HistoricalStore, HistoryRange, HistoryWindow, MarketData, OrderExecution,
    OrderSide, PeriodType, Persistence,
};
pub use config::{ConfigError, DaytraderConfig};
pub use data::{synthetic_series, CsvHistoricalStore};
pub use live::{
    Clock, FixedClock, LiveRunner, LiveSettings, LiveSummary, ReplayClock, SystemClock, TickOutcome,
};
pub use optimizer::{select_best, OptimizationReport, OptimizationResult, Optimizer, ParamGrid};
pub use persistence::{JsonStatePersistence, MemoryPersistence};
