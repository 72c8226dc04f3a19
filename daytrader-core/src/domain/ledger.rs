//! Ledger — cash, holding, and weighted-average cost basis for one account.
//!
//! The ledger is the only mutable state in a simulation run. It changes only
//! through `buy` and `sell`, both of which clamp the requested quantity to what
//! the account can actually execute and return the executed quantity.
//!
//! Invariant: `average_cost == 0.0` exactly whenever `holding_quantity == 0`.

use serde::{Deserialize, Serialize};

/// Minimum tradable share increment.
///
/// Some markets trade in single shares, others in 100-share lots. Every
/// executed quantity is floored to a multiple of the lot size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LotSize(u64);

impl LotSize {
    /// Single-share trading.
    pub const SINGLE: LotSize = LotSize(1);
    /// Round lots of 100 shares.
    pub const ROUND: LotSize = LotSize(100);

    /// Create a lot size. Zero is treated as single-share trading.
    pub fn new(shares: u64) -> Self {
        Self(shares.max(1))
    }

    pub fn shares(&self) -> u64 {
        self.0
    }

    /// Floor a quantity to the nearest lot multiple.
    pub fn round_down(&self, quantity: u64) -> u64 {
        quantity / self.0 * self.0
    }
}

impl Default for LotSize {
    fn default() -> Self {
        Self::SINGLE
    }
}

/// Persisted form of a ledger: `{cash, holding_quantity, average_cost}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub cash: f64,
    pub holding_quantity: u64,
    pub average_cost: f64,
}

/// Trading state of a single account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ledger {
    cash: f64,
    holding_quantity: u64,
    average_cost: f64,
    lot_size: LotSize,
}

impl Ledger {
    /// A flat ledger holding only its initial cash endowment.
    pub fn new(initial_cash: f64) -> Self {
        Self::with_lot_size(initial_cash, LotSize::SINGLE)
    }

    pub fn with_lot_size(initial_cash: f64, lot_size: LotSize) -> Self {
        Self {
            cash: initial_cash,
            holding_quantity: 0,
            average_cost: 0.0,
            lot_size,
        }
    }

    /// Restore a ledger from persisted state.
    ///
    /// A snapshot with no holding always restores with a zero average cost,
    /// whatever the stored value was.
    pub fn from_snapshot(snapshot: LedgerSnapshot, lot_size: LotSize) -> Self {
        let average_cost = if snapshot.holding_quantity == 0 {
            0.0
        } else {
            snapshot.average_cost
        };
        Self {
            cash: snapshot.cash,
            holding_quantity: snapshot.holding_quantity,
            average_cost,
            lot_size,
        }
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            cash: self.cash,
            holding_quantity: self.holding_quantity,
            average_cost: self.average_cost,
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn holding_quantity(&self) -> u64 {
        self.holding_quantity
    }

    /// Weighted average purchase price of the current holding.
    ///
    /// Only meaningful while `holding_quantity() > 0`; zero otherwise.
    pub fn average_cost(&self) -> f64 {
        self.average_cost
    }

    pub fn lot_size(&self) -> LotSize {
        self.lot_size
    }

    pub fn is_flat(&self) -> bool {
        self.holding_quantity == 0
    }

    /// Cash plus the holding valued at `price`.
    pub fn market_value(&self, price: f64) -> f64 {
        self.cash + self.holding_quantity as f64 * price
    }

    /// Largest lot-rounded quantity the available cash can pay for at `price`.
    pub fn affordable_quantity(&self, price: f64) -> u64 {
        if !is_tradable_price(price) || self.cash <= 0.0 {
            return 0;
        }
        let mut whole_shares = (self.cash / price).floor() as u64;
        // the quotient can round up across an integer boundary
        if whole_shares as f64 * price > self.cash {
            whole_shares = whole_shares.saturating_sub(1);
        }
        self.lot_size.round_down(whole_shares)
    }

    /// Largest lot-rounded quantity of the current holding that can be sold.
    pub fn sellable_quantity(&self) -> u64 {
        self.lot_size.round_down(self.holding_quantity)
    }

    /// Buy up to `desired` shares at `price`. Returns the executed quantity.
    ///
    /// Execution is clamped to what cash can pay for and floored to the lot
    /// size. A zero execution leaves the ledger untouched.
    pub fn buy(&mut self, price: f64, desired: u64) -> u64 {
        let executed = self
            .lot_size
            .round_down(desired.min(self.affordable_quantity(price)));
        if executed == 0 {
            return 0;
        }

        let old_holding = self.holding_quantity;
        let new_holding = old_holding + executed;
        self.cash -= executed as f64 * price;
        self.average_cost = (self.average_cost * old_holding as f64 + price * executed as f64)
            / new_holding as f64;
        self.holding_quantity = new_holding;
        executed
    }

    /// Sell up to `desired` shares at `price`. Returns the executed quantity.
    ///
    /// Execution is clamped to the holding and floored to the lot size. The
    /// average cost resets to exactly zero once the holding is fully closed.
    pub fn sell(&mut self, price: f64, desired: u64) -> u64 {
        if !is_tradable_price(price) {
            return 0;
        }
        let executed = self
            .lot_size
            .round_down(desired.min(self.holding_quantity));
        if executed == 0 {
            return 0;
        }

        self.cash += executed as f64 * price;
        self.holding_quantity -= executed;
        if self.holding_quantity == 0 {
            self.average_cost = 0.0;
        }
        executed
    }
}

fn is_tradable_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}
