//! Signal generation — one buy/sell/hold decision per price tick.
//!
//! Strategies are pure: a decision depends only on the current price, the
//! ledger, the trailing window of prices seen so far and the run parameters.
//! The `SignalEngine` owns the window and feeds it before every decision.

pub mod engine;
pub mod session;
pub mod threshold;
pub mod trend_follow;

pub use engine::{Resample, SignalEngine};
pub use session::SessionCutoff;
pub use threshold::ThresholdRule;
pub use trend_follow::TrendFollowRule;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{Ledger, Parameters, TradeSide};
use crate::indicators::TrailingWindow;

/// Why a tick produced no trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum HoldReason {
    /// Fewer observations than the strategy's warmup requires.
    InsufficientHistory { observed: usize, required: usize },
    /// Enough data, but no rule fired.
    NoTrigger,
    /// Past the end-of-session cutoff with nothing left to liquidate.
    SessionClosed,
}

/// Outcome of one decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Signal {
    Hold(HoldReason),
    Buy { quantity: u64 },
    Sell { quantity: u64 },
}

impl Signal {
    pub fn is_hold(&self) -> bool {
        matches!(self, Signal::Hold(_))
    }

    pub fn side(&self) -> Option<TradeSide> {
        match self {
            Signal::Hold(_) => None,
            Signal::Buy { .. } => Some(TradeSide::Buy),
            Signal::Sell { .. } => Some(TradeSide::Sell),
        }
    }

    /// Requested quantity (zero for holds).
    pub fn quantity(&self) -> u64 {
        match self {
            Signal::Hold(_) => 0,
            Signal::Buy { quantity } | Signal::Sell { quantity } => *quantity,
        }
    }

    pub(crate) fn no_trigger() -> Self {
        Signal::Hold(HoldReason::NoTrigger)
    }

    /// Liquidate the sellable holding, or hold if nothing can be sold.
    pub(crate) fn sell_all(ledger: &Ledger) -> Self {
        match ledger.sellable_quantity() {
            0 => Signal::no_trigger(),
            quantity => Signal::Sell { quantity },
        }
    }

    /// Spend all available cash, or hold if not even one lot is affordable.
    pub(crate) fn buy_all_in(ledger: &Ledger, price: f64) -> Self {
        if ledger.cash() < price {
            return Signal::no_trigger();
        }
        match ledger.affordable_quantity(price) {
            0 => Signal::no_trigger(),
            quantity => Signal::Buy { quantity },
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Hold(HoldReason::InsufficientHistory { observed, required }) => {
                write!(f, "hold (insufficient history: {observed}/{required})")
            }
            Signal::Hold(HoldReason::NoTrigger) => write!(f, "hold"),
            Signal::Hold(HoldReason::SessionClosed) => write!(f, "hold (session closed)"),
            Signal::Buy { quantity } => write!(f, "buy {quantity}"),
            Signal::Sell { quantity } => write!(f, "sell {quantity}"),
        }
    }
}

/// Everything a strategy may look at when deciding.
#[derive(Debug, Clone, Copy)]
pub struct DecisionContext<'a> {
    pub price: f64,
    pub ledger: &'a Ledger,
    pub window: &'a TrailingWindow,
    pub params: &'a Parameters,
}

/// A pure decision rule.
pub trait SignalRule: Send + Sync {
    /// Human-readable name (e.g., "threshold").
    fn name(&self) -> &'static str;

    /// Observations needed before the rule can act.
    fn warmup(&self, params: &Parameters) -> usize;

    /// Decide one action. Must not depend on anything outside `ctx`.
    fn decide(&self, ctx: &DecisionContext<'_>) -> Signal;
}

/// Strategy selector, chosen by configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalStrategy {
    /// Take-profit / stop-loss around the average cost, all-in buys when flat.
    Threshold,
    /// Moving-average crossover gating the threshold rules.
    #[default]
    TrendFollow,
}

impl SignalStrategy {
    pub fn rule(&self) -> &'static dyn SignalRule {
        match self {
            SignalStrategy::Threshold => &ThresholdRule,
            SignalStrategy::TrendFollow => &TrendFollowRule,
        }
    }

    pub fn name(&self) -> &'static str {
        self.rule().name()
    }

    pub fn decide(
        &self,
        price: f64,
        ledger: &Ledger,
        window: &TrailingWindow,
        params: &Parameters,
    ) -> Signal {
        self.rule().decide(&DecisionContext {
            price,
            ledger,
            window,
            params,
        })
    }
}

impl fmt::Display for SignalStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for SignalStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "threshold" => Ok(SignalStrategy::Threshold),
            "trend_follow" | "trend-follow" => Ok(SignalStrategy::TrendFollow),
            other => Err(format!(
                "unknown strategy '{other}' (expected 'threshold' or 'trend_follow')"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_accessors() {
        assert_eq!(Signal::Buy { quantity: 5 }.side(), Some(TradeSide::Buy));
        assert_eq!(Signal::Sell { quantity: 3 }.quantity(), 3);
        assert!(Signal::no_trigger().is_hold());
        assert_eq!(Signal::no_trigger().quantity(), 0);
    }

    #[test]
    fn insufficient_history_is_distinct_from_no_trigger() {
        let short = Signal::Hold(HoldReason::InsufficientHistory {
            observed: 3,
            required: 10,
        });
        assert!(short.is_hold());
        assert_ne!(short, Signal::no_trigger());
        assert_eq!(short.to_string(), "hold (insufficient history: 3/10)");
    }

    #[test]
    fn sell_all_respects_lot_size() {
        let mut ledger = Ledger::with_lot_size(100_000.0, crate::domain::LotSize::ROUND);
        ledger.buy(100.0, 300);
        assert_eq!(Signal::sell_all(&ledger), Signal::Sell { quantity: 300 });
        assert_eq!(Signal::sell_all(&Ledger::new(10.0)), Signal::no_trigger());
    }

    #[test]
    fn buy_all_in_needs_cash_for_one_share() {
        assert_eq!(
            Signal::buy_all_in(&Ledger::new(50.0), 100.0),
            Signal::no_trigger()
        );
        assert_eq!(
            Signal::buy_all_in(&Ledger::new(250.0), 100.0),
            Signal::Buy { quantity: 2 }
        );
    }

    #[test]
    fn strategy_parses_from_config_names() {
        assert_eq!("threshold".parse::<SignalStrategy>(), Ok(SignalStrategy::Threshold));
        assert_eq!("trend_follow".parse::<SignalStrategy>(), Ok(SignalStrategy::TrendFollow));
        assert!("macd".parse::<SignalStrategy>().is_err());
        assert_eq!(SignalStrategy::default(), SignalStrategy::TrendFollow);
    }

    #[test]
    fn strategy_serializes_snake_case() {
        let json = serde_json::to_string(&SignalStrategy::TrendFollow).unwrap();
        assert_eq!(json, "\"trend_follow\"");
    }

    #[test]
    fn signal_serializes_tagged() {
        let json = serde_json::to_string(&Signal::Buy { quantity: 7 }).unwrap();
        assert_eq!(json, r#"{"action":"buy","quantity":7}"#);
    }
}
