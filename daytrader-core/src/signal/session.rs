//! End-of-session cutoff for live trading.

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::{HoldReason, Signal};
use crate::domain::Ledger;

/// Wall-clock time after which no new positions open and any holding is
/// liquidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCutoff(NaiveTime);

impl SessionCutoff {
    pub fn new(time: NaiveTime) -> Self {
        Self(time)
    }

    /// Cutoff from hour and minute; `None` when out of range.
    pub fn at(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }

    /// True at or after the cutoff on the current day.
    pub fn is_closed(&self, now: NaiveDateTime) -> bool {
        now.time() >= self.0
    }

    /// Overrides the strategy once the session is closed: sell everything
    /// sellable, otherwise hold. `None` while the session is open.
    pub fn override_signal(&self, now: NaiveDateTime, ledger: &Ledger) -> Option<Signal> {
        if !self.is_closed(now) {
            return None;
        }
        Some(match ledger.sellable_quantity() {
            0 => Signal::Hold(HoldReason::SessionClosed),
            quantity => Signal::Sell { quantity },
        })
    }
}

impl Default for SessionCutoff {
    fn default() -> Self {
        Self(NaiveTime::from_hms_opt(14, 45, 0).unwrap_or(NaiveTime::MIN))
    }
}

impl std::fmt::Display for SessionCutoff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}
