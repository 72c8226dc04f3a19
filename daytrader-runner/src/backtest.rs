//! Backtest entry points.
//!
//! - `run_backtest()`: loads a ticker from a `HistoricalStore`, then replays it.
//! - `run_backtest_on_series()`: replays an already loaded series.

use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use daytrader_core::domain::{ParamError, Parameters, PriceSeries};
use daytrader_core::signal::SignalStrategy;
use daytrader_core::{SimulationResult, Simulator};

use crate::collaborators::{CollaboratorError, HistoricalStore, HistoryWindow};

/// Errors from a backtest run.
#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("data error: {0}")]
    Data(#[from] CollaboratorError),
    #[error("invalid parameters: {0}")]
    Params(#[from] ParamError),
}

/// A replay together with what it was run on.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    pub symbol: String,
    pub dataset_hash: String,
    pub strategy: SignalStrategy,
    pub params: Parameters,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub bar_count: usize,
    pub result: SimulationResult,
}

/// Load `ticker` from `store` and replay it.
///
/// Missing or unreadable history is an error; there is nothing to replay.
pub fn run_backtest(
    store: &dyn HistoricalStore,
    ticker: &str,
    window: HistoryWindow,
    simulator: &Simulator,
    params: &Parameters,
    initial_cash: f64,
) -> Result<BacktestReport, BacktestError> {
    params.validate()?;
    let series = store.load(ticker, window)?;
    run_backtest_on_series(&series, simulator, params, initial_cash)
}

/// Replay a loaded series.
pub fn run_backtest_on_series(
    series: &PriceSeries,
    simulator: &Simulator,
    params: &Parameters,
    initial_cash: f64,
) -> Result<BacktestReport, BacktestError> {
    params.validate()?;
    let result = simulator.run(series, params, initial_cash);
    info!(
        symbol = series.symbol(),
        strategy = %simulator.strategy(),
        bars = series.len(),
        trades = result.trade_count(),
        final_value = result.final_value,
        profit_loss = result.profit_loss,
        "backtest complete"
    );
    Ok(BacktestReport {
        symbol: series.symbol().to_string(),
        dataset_hash: series.fingerprint(),
        strategy: simulator.strategy(),
        params: *params,
        start: series.first().timestamp,
        end: series.last().timestamp,
        bar_count: series.len(),
        result,
    })
}
