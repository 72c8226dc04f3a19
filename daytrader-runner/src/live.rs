//! Live trading loop: one decision per polled quote.
//!
//! Each tick fetches a quote, feeds the signal engine (with the session
//! cutoff applied) and routes any order through `OrderExecution`. The ledger
//! changes only after the broker accepts the order. After every completed
//! decision cycle the ledger snapshot is saved; a skipped tick saves nothing.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use daytrader_core::domain::{Ledger, LotSize, PriceSeries, TradeEvent, TradeSide};
use daytrader_core::signal::{Signal, SignalEngine};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::collaborators::{
    CollaboratorError, HistoryRange, MarketData, OrderExecution, Persistence,
};
use crate::config::DaytraderConfig;

/// Source of "now" for the session cutoff.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that starts at a fixed instant and optionally advances by `step`
/// every time it is read.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
    step: chrono::Duration,
}

impl FixedClock {
    pub fn at(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
            step: chrono::Duration::zero(),
        }
    }

    pub fn stepping(mut self, step: chrono::Duration) -> Self {
        self.step = step;
        self
    }

    pub fn set(&self, now: NaiveDateTime) {
        if let Ok(mut current) = self.now.lock() {
            *current = now;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        match self.now.lock() {
            Ok(mut current) => {
                let now = *current;
                *current = now + self.step;
                now
            }
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// A clock that replays the timestamps of a recorded series, one per read.
///
/// Paired with `ReplayMarketData` over the same series, each tick sees the
/// time its quote was recorded at. Once exhausted it keeps returning the last
/// timestamp.
#[derive(Debug)]
pub struct ReplayClock {
    state: Mutex<ReplayClockState>,
}

#[derive(Debug)]
struct ReplayClockState {
    timestamps: std::vec::IntoIter<NaiveDateTime>,
    last: NaiveDateTime,
}

impl ReplayClock {
    pub fn from_series(series: &PriceSeries) -> Self {
        let timestamps: Vec<NaiveDateTime> =
            series.points().iter().map(|p| p.timestamp).collect();
        Self {
            state: Mutex::new(ReplayClockState {
                timestamps: timestamps.into_iter(),
                last: series.first().timestamp,
            }),
        }
    }
}

impl Clock for ReplayClock {
    fn now(&self) -> NaiveDateTime {
        match self.state.lock() {
            Ok(mut state) => {
                if let Some(next) = state.timestamps.next() {
                    state.last = next;
                }
                state.last
            }
            Err(poisoned) => poisoned.into_inner().last,
        }
    }
}

/// Account and instrument the runner trades.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveSettings {
    pub account_id: String,
    pub symbol: String,
    /// Endowment used when no state has been persisted yet.
    pub initial_cash: f64,
    pub lot_size: LotSize,
}

impl LiveSettings {
    pub fn from_config(config: &DaytraderConfig) -> Self {
        Self {
            account_id: config.account.account_id.clone(),
            symbol: config.live.symbol.clone(),
            initial_cash: config.account.initial_cash,
            lot_size: config.account.lot(),
        }
    }
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The quote could not be fetched; nothing changed.
    Skipped { error: CollaboratorError },
    /// A decision was made but no order was needed.
    Held { price: f64, signal: Signal },
    /// The broker accepted the order and the ledger was updated.
    Traded { price: f64, trade: TradeEvent },
    /// The broker refused or failed the order; the ledger is unchanged.
    OrderFailed {
        price: f64,
        signal: Signal,
        error: CollaboratorError,
    },
}

impl TickOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, TickOutcome::Skipped { .. })
    }

    pub fn trade(&self) -> Option<&TradeEvent> {
        match self {
            TickOutcome::Traded { trade, .. } => Some(trade),
            _ => None,
        }
    }
}

/// Counters for a finished `run`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LiveSummary {
    pub ticks: u64,
    pub trades: usize,
    pub skipped: usize,
    pub failed_orders: usize,
    pub final_cash: f64,
    pub final_holding: u64,
}

/// Drives the signal engine against live collaborators.
pub struct LiveRunner {
    settings: LiveSettings,
    engine: SignalEngine,
    ledger: Ledger,
    market: Arc<dyn MarketData>,
    orders: Arc<dyn OrderExecution>,
    persistence: Arc<dyn Persistence>,
    clock: Arc<dyn Clock>,
    tick_count: u64,
    trades: Vec<TradeEvent>,
    save_failures: usize,
}

impl LiveRunner {
    /// The engine should carry a session cutoff; without one the runner
    /// trades around the clock.
    pub fn new(
        settings: LiveSettings,
        engine: SignalEngine,
        market: Arc<dyn MarketData>,
        orders: Arc<dyn OrderExecution>,
        persistence: Arc<dyn Persistence>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let ledger = Ledger::with_lot_size(settings.initial_cash, settings.lot_size);
        Self {
            settings,
            engine,
            ledger,
            market,
            orders,
            persistence,
            clock,
            tick_count: 0,
            trades: Vec::new(),
            save_failures: 0,
        }
    }

    pub fn settings(&self) -> &LiveSettings {
        &self.settings
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn engine(&self) -> &SignalEngine {
        &self.engine
    }

    pub fn trades(&self) -> &[TradeEvent] {
        &self.trades
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn save_failures(&self) -> usize {
        self.save_failures
    }

    /// Load persisted ledger state, or start from the initial endowment.
    pub fn resume(&mut self) -> Result<&Ledger, CollaboratorError> {
        let account_id = self.settings.account_id.as_str();
        self.ledger = match self.persistence.load_state(account_id)? {
            Some(snapshot) => {
                info!(
                    account_id,
                    cash = snapshot.cash,
                    holding = snapshot.holding_quantity,
                    average_cost = snapshot.average_cost,
                    "resumed ledger state"
                );
                Ledger::from_snapshot(snapshot, self.settings.lot_size)
            }
            None => {
                info!(account_id, cash = self.settings.initial_cash, "no saved state, starting fresh");
                Ledger::with_lot_size(self.settings.initial_cash, self.settings.lot_size)
            }
        };
        Ok(&self.ledger)
    }

    /// Seed the trailing window from recent history. Returns the number of
    /// prices observed.
    pub fn warm_up(&mut self, range: HistoryRange) -> Result<usize, CollaboratorError> {
        let history = self.market.get_history(&self.settings.symbol, range)?;
        for point in history.points() {
            self.engine.observe(point.timestamp, point.close);
        }
        info!(
            symbol = %self.settings.symbol,
            observed = history.len(),
            warmup_remaining = self.engine.warmup_remaining(),
            "warmed up signal window"
        );
        Ok(history.len())
    }

    /// One poll-decide-execute-save cycle.
    pub fn tick(&mut self) -> TickOutcome {
        self.tick_count += 1;
        let now = self.clock.now();
        let symbol = self.settings.symbol.clone();

        let price = match self.market.get_quote(&symbol) {
            Ok(price) => price,
            Err(error) => {
                warn!(symbol = %symbol, tick = self.tick_count, %error, "quote failed, skipping tick");
                return TickOutcome::Skipped { error };
            }
        };

        let signal = self.engine.on_tick(now, price, &self.ledger);
        let outcome = match signal {
            Signal::Hold(_) => TickOutcome::Held { price, signal },
            Signal::Buy { quantity } => self.execute(now, price, signal, TradeSide::Buy, quantity),
            Signal::Sell { quantity } => self.execute(now, price, signal, TradeSide::Sell, quantity),
        };

        self.persist();
        outcome
    }

    fn execute(
        &mut self,
        now: NaiveDateTime,
        price: f64,
        signal: Signal,
        side: TradeSide,
        quantity: u64,
    ) -> TickOutcome {
        let symbol = self.settings.symbol.as_str();
        if let Err(error) = self.orders.submit(symbol, side.into(), quantity) {
            error!(symbol, %side, quantity, price, %error, "order failed");
            return TickOutcome::OrderFailed { price, signal, error };
        }

        let executed = match side {
            TradeSide::Buy => self.ledger.buy(price, quantity),
            TradeSide::Sell => self.ledger.sell(price, quantity),
        };
        if executed != quantity {
            warn!(symbol, %side, requested = quantity, executed, "ledger applied a partial quantity");
        }

        let trade = TradeEvent {
            index: self.tick_count as usize,
            timestamp: now,
            side,
            quantity: executed,
            price,
        };
        info!(
            symbol,
            %side,
            quantity = executed,
            price,
            cash = self.ledger.cash(),
            holding = self.ledger.holding_quantity(),
            "trade"
        );
        self.trades.push(trade.clone());
        TickOutcome::Traded { price, trade }
    }

    fn persist(&mut self) {
        let snapshot = self.ledger.snapshot();
        match self.persistence.save_state(&self.settings.account_id, &snapshot) {
            Ok(()) => debug!(account_id = %self.settings.account_id, "state saved"),
            Err(error) => {
                self.save_failures += 1;
                warn!(account_id = %self.settings.account_id, %error, "failed to save state");
            }
        }
    }

    /// Tick `max_ticks` times (forever when `None`), sleeping
    /// `poll_interval` between ticks.
    pub fn run(&mut self, max_ticks: Option<u64>, poll_interval: Duration) -> LiveSummary {
        let mut summary = LiveSummary::default();
        info!(
            symbol = %self.settings.symbol,
            strategy = %self.engine.strategy(),
            ?max_ticks,
            poll_secs = poll_interval.as_secs_f64(),
            "live trading started"
        );

        loop {
            match self.tick() {
                TickOutcome::Skipped { .. } => summary.skipped += 1,
                TickOutcome::Traded { .. } => summary.trades += 1,
                TickOutcome::OrderFailed { .. } => summary.failed_orders += 1,
                TickOutcome::Held { .. } => {}
            }
            summary.ticks += 1;
            if max_ticks.is_some_and(|max| summary.ticks >= max) {
                break;
            }
            if !poll_interval.is_zero() {
                std::thread::sleep(poll_interval);
            }
        }

        summary.final_cash = self.ledger.cash();
        summary.final_holding = self.ledger.holding_quantity();
        info!(
            ticks = summary.ticks,
            trades = summary.trades,
            skipped = summary.skipped,
            failed_orders = summary.failed_orders,
            cash = summary.final_cash,
            holding = summary.final_holding,
            "live trading stopped"
        );
        summary
    }
}

impl std::fmt::Debug for LiveRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveRunner")
            .field("settings", &self.settings)
            .field("ledger", &self.ledger)
            .field("tick_count", &self.tick_count)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn t(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn fixed_clock_steps() {
        let clock = FixedClock::at(t(9, 0)).stepping(chrono::Duration::minutes(1));
        assert_eq!(clock.now(), t(9, 0));
        assert_eq!(clock.now(), t(9, 1));
        clock.set(t(14, 45));
        assert_eq!(clock.now(), t(14, 45));
    }

    #[test]
    fn replay_clock_follows_recorded_timestamps() {
        let series = PriceSeries::new(
            "7203",
            vec![
                daytrader_core::domain::PricePoint::new(t(14, 45), 100.0),
                daytrader_core::domain::PricePoint::new(t(14, 45) + chrono::Duration::days(1), 101.0),
            ],
        )
        .unwrap();
        let clock = ReplayClock::from_series(&series);
        assert_eq!(clock.now(), t(14, 45));
        assert_eq!(clock.now(), t(14, 45) + chrono::Duration::days(1));
        // exhausted: stays on the last recorded time
        assert_eq!(clock.now(), t(14, 45) + chrono::Duration::days(1));
    }

    #[test]
    fn still_clock_does_not_move() {
        let clock = FixedClock::at(t(10, 0));
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn settings_from_config() {
        let mut config = DaytraderConfig::default();
        config.live.symbol = "7203".into();
        config.account.lot_size = 100;
        let settings = LiveSettings::from_config(&config);
        assert_eq!(settings.symbol, "7203");
        assert_eq!(settings.lot_size, LotSize::ROUND);
        assert_eq!(settings.account_id, "default");
    }
}
