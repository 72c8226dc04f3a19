//! Price-window indicators used by the signal strategies.
//!
//! Only arithmetic moving averages are needed: the trend-follow strategy
//! compares a short and a long SMA over a trailing window of closes.

pub mod sma;
pub mod trend;
pub mod window;

pub use sma::sma;
pub use trend::{classify_trend, Trend, SURGE_RATIO};
pub use window::TrailingWindow;

#[cfg(test)]
pub(crate) mod test_helpers {
    /// Default tolerance for floating-point comparisons.
    pub const DEFAULT_EPSILON: f64 = 1e-10;

    /// Assert two floats are within epsilon.
    pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
        assert!(
            (actual - expected).abs() < epsilon,
            "expected {expected}, got {actual} (diff={})",
            (actual - expected).abs()
        );
    }
}
