//! Backtest replay — one pass over a price series with a fresh ledger.
//!
//! The replay is strictly sequential: at index `i` the signal engine has seen
//! `closes[0..=i]` and nothing else. Signals are applied to the ledger at the
//! same price they were decided on; the executed quantity (possibly zero) is
//! what ends up in the trade log.

use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{Ledger, LotSize, Parameters, PriceSeries, TradeEvent, TradeSide};
use crate::signal::{HoldReason, Resample, Signal, SignalEngine, SignalStrategy};

/// Outcome of a single backtest run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationResult {
    pub ledger: Ledger,
    pub trades: Vec<TradeEvent>,
    /// One decision per price point.
    pub signals: Vec<Signal>,
    /// Mark-to-market value after each price point.
    pub equity_curve: Vec<f64>,
    pub initial_cash: f64,
    /// `cash + holding * last_price`.
    pub final_value: f64,
    pub profit_loss: f64,
    /// Ticks spent waiting for the strategy's warmup.
    pub insufficient_history_ticks: usize,
}

impl SimulationResult {
    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }

    /// Profit/loss relative to the starting cash; 0 when starting with nothing.
    pub fn return_pct(&self) -> f64 {
        if self.initial_cash > 0.0 {
            self.profit_loss / self.initial_cash * 100.0
        } else {
            0.0
        }
    }
}

/// Replays price series through a strategy.
///
/// Holds only configuration, so one simulator can be shared across threads
/// and reused for every grid point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Simulator {
    strategy: SignalStrategy,
    lot_size: LotSize,
    resample: Resample,
}

impl Simulator {
    pub fn new(strategy: SignalStrategy, lot_size: LotSize, resample: Resample) -> Self {
        Self {
            strategy,
            lot_size,
            resample,
        }
    }

    pub fn strategy(&self) -> SignalStrategy {
        self.strategy
    }

    pub fn lot_size(&self) -> LotSize {
        self.lot_size
    }

    pub fn resample(&self) -> Resample {
        self.resample
    }

    /// Run one backtest on a fresh ledger endowed with `initial_cash`.
    pub fn run(
        &self,
        series: &PriceSeries,
        params: &Parameters,
        initial_cash: f64,
    ) -> SimulationResult {
        let mut ledger = Ledger::with_lot_size(initial_cash, self.lot_size);
        let mut engine = SignalEngine::new(self.strategy, *params, self.resample);

        let n = series.len();
        let mut trades = Vec::new();
        let mut signals = Vec::with_capacity(n);
        let mut equity_curve = Vec::with_capacity(n);
        let mut insufficient_history_ticks = 0;

        for (index, point) in series.points().iter().enumerate() {
            let signal = engine.on_price(point.timestamp, point.close, &ledger);

            let executed = match signal {
                Signal::Buy { quantity } => ledger.buy(point.close, quantity),
                Signal::Sell { quantity } => ledger.sell(point.close, quantity),
                Signal::Hold(HoldReason::InsufficientHistory { .. }) => {
                    insufficient_history_ticks += 1;
                    0
                }
                Signal::Hold(_) => 0,
            };

            if let Some(side) = signal.side().filter(|_| executed > 0) {
                info!(
                    symbol = series.symbol(),
                    index,
                    %side,
                    quantity = executed,
                    price = point.close,
                    cash = ledger.cash(),
                    "trade"
                );
                trades.push(TradeEvent {
                    index,
                    timestamp: point.timestamp,
                    side,
                    quantity: executed,
                    price: point.close,
                });
            }

            signals.push(signal);
            equity_curve.push(ledger.market_value(point.close));
        }

        let final_value = ledger.market_value(series.last_price());
        let profit_loss = final_value - initial_cash;
        debug!(
            symbol = series.symbol(),
            strategy = %self.strategy,
            upper = params.upper_limit,
            lower = params.lower_limit,
            short = params.short_window,
            long = params.long_window,
            final_value,
            profit_loss,
            trades = trades.len(),
            "simulation finished"
        );

        SimulationResult {
            ledger,
            trades,
            signals,
            equity_curve,
            initial_cash,
            final_value,
            profit_loss,
            insufficient_history_ticks,
        }
    }
}

/// Count of buys and sells in a trade log.
pub fn side_counts(trades: &[TradeEvent]) -> (usize, usize) {
    trades.iter().fold((0, 0), |(buys, sells), t| match t.side {
        TradeSide::Buy => (buys + 1, sells),
        TradeSide::Sell => (buys, sells + 1),
    })
}
