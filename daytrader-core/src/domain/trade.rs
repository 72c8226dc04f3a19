//! TradeEvent — one executed fill in the append-only trade log.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "buy"),
            TradeSide::Sell => write!(f, "sell"),
        }
    }
}

/// An executed trade. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    /// Position of the triggering price in the replayed series (tick count in live mode).
    pub index: usize,
    pub timestamp: NaiveDateTime,
    pub side: TradeSide,
    pub quantity: u64,
    pub price: f64,
}

impl TradeEvent {
    /// Cash moved by this trade (always positive).
    pub fn notional(&self) -> f64 {
        self.quantity as f64 * self.price
    }
}
