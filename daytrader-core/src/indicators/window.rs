//! Trailing price window — a fixed-capacity FIFO of recent closes.
//!
//! The signal engine pushes every observed price here before deciding, so the
//! window only ever holds information up to and including the current tick.

use std::collections::VecDeque;

use chrono::{NaiveDate, NaiveDateTime};

use super::sma::trailing_mean;

/// Fixed-capacity buffer of the most recent prices.
///
/// When full, pushing a new price evicts the oldest one.
#[derive(Debug, Clone, PartialEq)]
pub struct TrailingWindow {
    prices: VecDeque<f64>,
    capacity: usize,
    last_date: Option<NaiveDate>,
}

impl TrailingWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            prices: VecDeque::with_capacity(capacity),
            capacity,
            last_date: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.prices.len() == self.capacity
    }

    /// Append a price, evicting the oldest when at capacity.
    pub fn push(&mut self, price: f64) {
        if self.prices.len() == self.capacity {
            self.prices.pop_front();
        }
        self.prices.push_back(price);
    }

    /// Keep one entry per calendar day: a price on the same day as the
    /// previous push replaces that day's entry instead of appending.
    pub fn push_daily(&mut self, timestamp: NaiveDateTime, price: f64) {
        let date = timestamp.date();
        if self.last_date == Some(date) {
            if let Some(last) = self.prices.back_mut() {
                *last = price;
                return;
            }
        }
        self.last_date = Some(date);
        self.push(price);
    }

    pub fn latest(&self) -> Option<f64> {
        self.prices.back().copied()
    }

    /// Arithmetic mean of the last `period` prices, `None` if fewer are held.
    pub fn mean(&self, period: usize) -> Option<f64> {
        trailing_mean(self.prices.iter().copied(), self.prices.len(), period)
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.prices.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.prices.clear();
        self.last_date = None;
    }
}
