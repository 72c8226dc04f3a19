//! PriceSeries — an ordered, immutable sequence of closing prices.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One observed closing price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: NaiveDateTime,
    pub close: f64,
}

impl PricePoint {
    pub fn new(timestamp: NaiveDateTime, close: f64) -> Self {
        Self { timestamp, close }
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

/// Validation failures when building a price series.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PriceSeriesError {
    #[error("price series is empty")]
    Empty,

    #[error("invalid close {close} at index {index}: prices must be finite and positive")]
    InvalidPrice { index: usize, close: f64 },

    #[error("timestamp at index {index} ({timestamp}) precedes the previous observation")]
    OutOfOrder {
        index: usize,
        timestamp: NaiveDateTime,
    },
}

/// Non-empty, time-ordered sequence of closing prices.
///
/// Once built the series never changes; the simulator reads it front to back
/// and values the final holding at `last_price()`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    symbol: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, points: Vec<PricePoint>) -> Result<Self, PriceSeriesError> {
        if points.is_empty() {
            return Err(PriceSeriesError::Empty);
        }
        for (index, point) in points.iter().enumerate() {
            if !point.close.is_finite() || point.close <= 0.0 {
                return Err(PriceSeriesError::InvalidPrice {
                    index,
                    close: point.close,
                });
            }
            if index > 0 && point.timestamp < points[index - 1].timestamp {
                return Err(PriceSeriesError::OutOfOrder {
                    index,
                    timestamp: point.timestamp,
                });
            }
        }
        Ok(Self {
            symbol: symbol.into(),
            points,
        })
    }

    /// Build a series from bare closes, one bar per minute from `start`.
    ///
    /// Convenient for tests and for sources that carry no timestamps.
    pub fn from_closes(
        symbol: impl Into<String>,
        start: NaiveDateTime,
        closes: &[f64],
    ) -> Result<Self, PriceSeriesError> {
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint::new(start + chrono::Duration::minutes(i as i64), close))
            .collect();
        Self::new(symbol, points)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false: an empty series cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn first(&self) -> &PricePoint {
        &self.points[0]
    }

    pub fn last(&self) -> &PricePoint {
        &self.points[self.points.len() - 1]
    }

    pub fn last_price(&self) -> f64 {
        self.last().close
    }

    /// Last close of each calendar day, in date order.
    pub fn daily_closes(&self) -> Vec<f64> {
        let mut closes: Vec<f64> = Vec::new();
        let mut current: Option<NaiveDate> = None;
        for point in &self.points {
            if current == Some(point.date()) {
                if let Some(last) = closes.last_mut() {
                    *last = point.close;
                }
            } else {
                closes.push(point.close);
                current = Some(point.date());
            }
        }
        closes
    }

    /// Keep only the trailing `n` observations.
    pub fn tail(&self, n: usize) -> PriceSeries {
        let n = n.clamp(1, self.points.len());
        Self {
            symbol: self.symbol.clone(),
            points: self.points[self.points.len() - n..].to_vec(),
        }
    }

    /// Keep observations within `days` calendar days of the last timestamp.
    ///
    /// Negative spans count as zero and keep only the final timestamp. Spans
    /// too large to represent keep the whole series. The result is never empty.
    pub fn last_days(&self, days: i64) -> PriceSeries {
        let last = self.last().timestamp;
        let Some(cutoff) = chrono::Duration::try_days(days.max(0))
            .and_then(|span| last.checked_sub_signed(span))
        else {
            return self.clone();
        };
        let points: Vec<PricePoint> = self
            .points
            .iter()
            .filter(|p| p.timestamp >= cutoff)
            .copied()
            .collect();
        Self {
            symbol: self.symbol.clone(),
            points,
        }
    }

    /// BLAKE3 content hash over symbol, timestamps and closes.
    ///
    /// Two series with identical contents always hash identically, so reports
    /// can be tied to the exact data they were computed from.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.symbol.as_bytes());
        for point in &self.points {
            hasher.update(&point.timestamp.and_utc().timestamp().to_le_bytes());
            hasher.update(&point.close.to_bits().to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}
