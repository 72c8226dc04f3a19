//! Strategy parameters shared by every signal strategy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid parameter combinations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    #[error("upper_limit must be a finite ratio above 1.0, got {0}")]
    UpperLimit(f64),

    #[error("lower_limit must be a finite ratio in (0.0, 1.0), got {0}")]
    LowerLimit(f64),

    #[error("short_window must be >= 1")]
    ShortWindow,

    #[error("long_window ({long}) must be greater than short_window ({short})")]
    LongWindow { short: usize, long: usize },
}

/// Take-profit / stop-loss ratios and moving-average windows for one run.
///
/// `upper_limit` and `lower_limit` are multiples of the average cost:
/// `1.10` sells once the price is 10% above cost, `0.95` once it is 5% below.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    pub upper_limit: f64,
    pub lower_limit: f64,
    pub short_window: usize,
    pub long_window: usize,
}

impl Parameters {
    pub fn new(upper_limit: f64, lower_limit: f64, short_window: usize, long_window: usize) -> Self {
        Self {
            upper_limit,
            lower_limit,
            short_window,
            long_window,
        }
    }

    pub fn validate(&self) -> Result<(), ParamError> {
        if !self.upper_limit.is_finite() || self.upper_limit <= 1.0 {
            return Err(ParamError::UpperLimit(self.upper_limit));
        }
        if !self.lower_limit.is_finite() || self.lower_limit <= 0.0 || self.lower_limit >= 1.0 {
            return Err(ParamError::LowerLimit(self.lower_limit));
        }
        if self.short_window == 0 {
            return Err(ParamError::ShortWindow);
        }
        if self.long_window <= self.short_window {
            return Err(ParamError::LongWindow {
                short: self.short_window,
                long: self.long_window,
            });
        }
        Ok(())
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self::new(1.10, 0.95, 5, 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Parameters::default().validate().is_ok());
    }

    #[test]
    fn upper_limit_must_exceed_one() {
        let p = Parameters::new(1.0, 0.95, 5, 10);
        assert_eq!(p.validate(), Err(ParamError::UpperLimit(1.0)));
    }

    #[test]
    fn lower_limit_must_be_below_one() {
        let p = Parameters::new(1.1, 1.0, 5, 10);
        assert_eq!(p.validate(), Err(ParamError::LowerLimit(1.0)));
        let p = Parameters::new(1.1, 0.0, 5, 10);
        assert_eq!(p.validate(), Err(ParamError::LowerLimit(0.0)));
    }

    #[test]
    fn windows_must_be_ordered() {
        assert_eq!(
            Parameters::new(1.1, 0.9, 0, 10).validate(),
            Err(ParamError::ShortWindow)
        );
        assert_eq!(
            Parameters::new(1.1, 0.9, 10, 10).validate(),
            Err(ParamError::LongWindow { short: 10, long: 10 })
        );
    }
}
