//! Simple Moving Average (SMA).
//!
//! Arithmetic mean of the most recent `period` closes. No smoothing, no
//! exponential weighting.

/// Mean of the last `period` values of an iterator yielding `len` items.
///
/// Returns `None` when `period` is zero or exceeds `len`.
pub(crate) fn trailing_mean<I>(values: I, len: usize, period: usize) -> Option<f64>
where
    I: Iterator<Item = f64>,
{
    if period == 0 || period > len {
        return None;
    }
    let sum: f64 = values.skip(len - period).sum();
    Some(sum / period as f64)
}

/// Mean of the last `period` prices in `prices`.
pub fn sma(prices: &[f64], period: usize) -> Option<f64> {
    trailing_mean(prices.iter().copied(), prices.len(), period)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_helpers::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn sma_of_last_period() {
        let prices = [10.0, 11.0, 12.0, 13.0, 14.0];
        assert_approx(sma(&prices, 5).unwrap(), 12.0, DEFAULT_EPSILON);
        assert_approx(sma(&prices, 2).unwrap(), 13.5, DEFAULT_EPSILON);
        assert_approx(sma(&prices, 1).unwrap(), 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_too_few_prices() {
        assert_eq!(sma(&[10.0, 11.0], 5), None);
        assert_eq!(sma(&[], 1), None);
        assert_eq!(sma(&[10.0], 0), None);
    }
}
