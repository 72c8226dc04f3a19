//! Trend classification from short/long moving averages.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::sma::sma;

/// Last close more than this multiple of the short MA counts as a surge.
pub const SURGE_RATIO: f64 = 1.2;

/// Market regime at the end of a price history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// Uptrend where the last close jumped well above the short MA.
    Surging,
    Uptrend,
    Downtrend,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Surging => write!(f, "uptrend (surging)"),
            Trend::Uptrend => write!(f, "uptrend"),
            Trend::Downtrend => write!(f, "downtrend"),
        }
    }
}

/// Classify the trend at the end of `closes`.
///
/// Returns `None` when fewer than `long_window` closes exist.
pub fn classify_trend(closes: &[f64], short_window: usize, long_window: usize) -> Option<Trend> {
    let short_ma = sma(closes, short_window)?;
    let long_ma = sma(closes, long_window)?;
    let last = *closes.last()?;

    Some(if last > short_ma * SURGE_RATIO {
        Trend::Surging
    } else if short_ma > long_ma {
        Trend::Uptrend
    } else {
        Trend::Downtrend
    })
}
