//! Stateful signal engine: trailing window + strategy + optional cutoff.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{SessionCutoff, Signal, SignalStrategy};
use crate::domain::{Ledger, Parameters};
use crate::indicators::TrailingWindow;

/// How observed prices feed the trailing window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resample {
    /// Every tick is one observation.
    #[default]
    Tick,
    /// One observation per calendar day; later ticks replace that day's close.
    Daily,
}

impl std::str::FromStr for Resample {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tick" => Ok(Resample::Tick),
            "daily" => Ok(Resample::Daily),
            other => Err(format!("unknown resample mode '{other}' (expected 'tick' or 'daily')")),
        }
    }
}

/// Owns the trailing window and turns each new price into a `Signal`.
///
/// The window is fed before each decision, so a decision sees the current
/// price and everything before it, never anything later.
#[derive(Debug, Clone)]
pub struct SignalEngine {
    strategy: SignalStrategy,
    params: Parameters,
    resample: Resample,
    window: TrailingWindow,
    cutoff: Option<SessionCutoff>,
}

impl SignalEngine {
    pub fn new(strategy: SignalStrategy, params: Parameters, resample: Resample) -> Self {
        Self {
            strategy,
            params,
            resample,
            window: TrailingWindow::new(params.long_window),
            cutoff: None,
        }
    }

    /// Enable the end-of-session override (live trading).
    pub fn with_cutoff(mut self, cutoff: SessionCutoff) -> Self {
        self.cutoff = Some(cutoff);
        self
    }

    pub fn strategy(&self) -> SignalStrategy {
        self.strategy
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn resample(&self) -> Resample {
        self.resample
    }

    pub fn cutoff(&self) -> Option<SessionCutoff> {
        self.cutoff
    }

    pub fn window(&self) -> &TrailingWindow {
        &self.window
    }

    /// Observations still needed before the strategy can act.
    pub fn warmup_remaining(&self) -> usize {
        self.strategy
            .rule()
            .warmup(&self.params)
            .saturating_sub(self.window.len())
    }

    /// Record a price without deciding (history warm-up).
    pub fn observe(&mut self, timestamp: NaiveDateTime, price: f64) {
        match self.resample {
            Resample::Tick => self.window.push(price),
            Resample::Daily => self.window.push_daily(timestamp, price),
        }
    }

    /// Decide on the current window without recording anything.
    pub fn decide(&self, price: f64, ledger: &Ledger) -> Signal {
        self.strategy.decide(price, ledger, &self.window, &self.params)
    }

    /// Record `price`, then decide. Used by the backtest replay.
    pub fn on_price(&mut self, timestamp: NaiveDateTime, price: f64, ledger: &Ledger) -> Signal {
        self.observe(timestamp, price);
        let signal = self.decide(price, ledger);
        debug!(%timestamp, price, %signal, "decision");
        signal
    }

    /// Like `on_price`, but applies the session cutoff first.
    pub fn on_tick(&mut self, now: NaiveDateTime, price: f64, ledger: &Ledger) -> Signal {
        self.observe(now, price);
        if let Some(signal) = self
            .cutoff
            .and_then(|cutoff| cutoff.override_signal(now, ledger))
        {
            debug!(%now, price, %signal, "session closed");
            return signal;
        }
        let signal = self.decide(price, ledger);
        debug!(%now, price, %signal, "decision");
        signal
    }

    /// Forget all observed prices.
    pub fn reset(&mut self) {
        self.window.clear();
    }
}
