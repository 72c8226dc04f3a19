//! Collaborator interfaces — the narrow seams between the trading core and
//! the outside world (quotes, orders, persisted state, recorded history).
//!
//! Every failure crossing these seams is a `CollaboratorError`. Callers
//! decide whether a failure is fatal (a backtest without data) or a
//! skip-and-log branch (one missed live quote).

use std::fmt;

use daytrader_core::domain::{LedgerSnapshot, PriceSeries, TradeSide};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures reported by collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    /// Transport or storage failure, timeout, server error, bad credentials.
    #[error("connectivity error: {0}")]
    Connectivity(String),

    /// The source answered but had nothing usable (empty or malformed).
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// The broker refused the order.
    #[error("order rejected: {0}")]
    OrderRejected(String),
}

impl CollaboratorError {
    /// Transient failures worth retrying on the next tick.
    pub fn is_transient(&self) -> bool {
        matches!(self, CollaboratorError::Connectivity(_))
    }
}

/// Order direction sent to the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl From<TradeSide> for OrderSide {
    fn from(side: TradeSide) -> Self {
        match side {
            TradeSide::Buy => OrderSide::Buy,
            TradeSide::Sell => OrderSide::Sell,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Span of history requested from a market-data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRange {
    /// Number of periods of `period_type` (e.g., 10 days).
    pub period: u32,
    pub period_type: PeriodType,
    /// Bar spacing in minutes.
    pub frequency_minutes: u32,
}

impl HistoryRange {
    pub fn days(period: u32, frequency_minutes: u32) -> Self {
        Self {
            period,
            period_type: PeriodType::Day,
            frequency_minutes,
        }
    }
}

impl Default for HistoryRange {
    fn default() -> Self {
        Self::days(10, 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Day,
    Month,
    Year,
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodType::Day => write!(f, "day"),
            PeriodType::Month => write!(f, "month"),
            PeriodType::Year => write!(f, "year"),
        }
    }
}

/// Slice of a recorded series to load for a backtest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryWindow {
    #[default]
    All,
    /// Trailing number of observations.
    LastBars(usize),
    /// Trailing calendar days, measured from the last timestamp.
    LastDays(i64),
}

impl HistoryWindow {
    pub fn apply(&self, series: PriceSeries) -> PriceSeries {
        match *self {
            HistoryWindow::All => series,
            HistoryWindow::LastBars(n) => series.tail(n),
            HistoryWindow::LastDays(days) => series.last_days(days),
        }
    }
}

/// Quotes and history for live trading.
pub trait MarketData: Send + Sync {
    /// Latest trade price for `symbol`.
    fn get_quote(&self, symbol: &str) -> Result<f64, CollaboratorError>;

    fn get_history(&self, symbol: &str, range: HistoryRange)
        -> Result<PriceSeries, CollaboratorError>;
}

/// Market order routing.
pub trait OrderExecution: Send + Sync {
    fn submit(&self, symbol: &str, side: OrderSide, quantity: u64)
        -> Result<(), CollaboratorError>;
}

/// Ledger state storage keyed by account.
pub trait Persistence: Send + Sync {
    /// `Ok(None)` when the account has no saved state yet.
    fn load_state(&self, account_id: &str) -> Result<Option<LedgerSnapshot>, CollaboratorError>;

    fn save_state(&self, account_id: &str, state: &LedgerSnapshot)
        -> Result<(), CollaboratorError>;
}

/// Recorded price history for backtests.
pub trait HistoricalStore: Send + Sync {
    fn load(&self, ticker: &str, window: HistoryWindow) -> Result<PriceSeries, CollaboratorError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series() -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        PriceSeries::from_closes("7203", start, &[1.0, 2.0, 3.0, 4.0]).unwrap()
    }

    #[test]
    fn window_all_keeps_everything() {
        assert_eq!(HistoryWindow::All.apply(series()).len(), 4);
    }

    #[test]
    fn window_last_bars_keeps_tail() {
        let tail = HistoryWindow::LastBars(2).apply(series());
        assert_eq!(tail.closes(), vec![3.0, 4.0]);
    }

    #[test]
    fn out_of_range_windows_keep_a_usable_series() {
        let negative = HistoryWindow::LastDays(-1).apply(series());
        assert_eq!(negative.closes(), vec![4.0]);
        assert_eq!(negative.last_price(), 4.0);
        assert_eq!(HistoryWindow::LastDays(i64::MAX).apply(series()).len(), 4);
        assert_eq!(HistoryWindow::LastBars(0).apply(series()).len(), 1);
    }

    #[test]
    fn only_connectivity_is_transient() {
        assert!(CollaboratorError::Connectivity("timeout".into()).is_transient());
        assert!(!CollaboratorError::OrderRejected("no".into()).is_transient());
    }

    #[test]
    fn order_side_from_trade_side() {
        assert_eq!(OrderSide::from(TradeSide::Sell), OrderSide::Sell);
        assert_eq!(OrderSide::Buy.to_string(), "BUY");
    }
}
