//! Synthetic intraday price series for development, demos and benches.
//!
//! A seeded random walk on one-minute ticks during a 09:00–15:00 session,
//! weekdays only. Clearly fake; never a substitute for recorded data.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use daytrader_core::domain::{PricePoint, PriceSeries, PriceSeriesError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Minutes per synthetic session (09:00 to 15:00).
pub const SESSION_MINUTES: u32 = 360;

const MAX_STEP: f64 = 0.004;
const PRICE_FLOOR: f64 = 1.0;

/// Deterministic seed derived from the symbol name.
pub fn symbol_seed(symbol: &str) -> u64 {
    let hash = blake3::hash(symbol.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

/// `n` one-minute ticks starting at 09:00 on `start`, random walk from
/// `start_price`. Same seed, same series.
pub fn synthetic_series(
    symbol: &str,
    seed: u64,
    n: usize,
    start: NaiveDate,
    start_price: f64,
) -> Result<PriceSeries, PriceSeriesError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let open = NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN);

    let mut day = next_weekday(start);
    let mut minute = 0u32;
    let mut price = start_price.max(PRICE_FLOOR);
    let mut points = Vec::with_capacity(n);

    for _ in 0..n {
        if minute == SESSION_MINUTES {
            day = next_weekday(day + Duration::days(1));
            minute = 0;
        }
        let timestamp = NaiveDateTime::new(day, open) + Duration::minutes(i64::from(minute));
        let step: f64 = rng.gen_range(-MAX_STEP..MAX_STEP);
        price = (price * (1.0 + step)).max(PRICE_FLOOR);
        points.push(PricePoint::new(timestamp, round_cents(price)));
        minute += 1;
    }

    PriceSeries::new(symbol, points)
}

fn next_weekday(mut date: NaiveDate) -> NaiveDate {
    while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        date += Duration::days(1);
    }
    date
}

fn round_cents(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    #[test]
    fn same_seed_same_series() {
        let a = synthetic_series("SYN", 7, 500, monday(), 100.0).unwrap();
        let b = synthetic_series("SYN", 7, 500, monday(), 100.0).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn different_seeds_differ() {
        let a = synthetic_series("SYN", 1, 100, monday(), 100.0).unwrap();
        let b = synthetic_series("SYN", 2, 100, monday(), 100.0).unwrap();
        assert_ne!(a.closes(), b.closes());
    }

    #[test]
    fn rolls_over_to_next_weekday() {
        let friday = NaiveDate::from_ymd_opt(2024, 6, 7).unwrap();
        let series = synthetic_series("SYN", 3, SESSION_MINUTES as usize + 1, friday, 50.0).unwrap();
        let last = series.last().timestamp;
        assert_eq!(last.date(), NaiveDate::from_ymd_opt(2024, 6, 10).unwrap());
        assert_eq!(last.time(), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(series.daily_closes().len(), 2);
    }

    #[test]
    fn prices_stay_positive() {
        let series = synthetic_series("SYN", 11, 5_000, monday(), 1.5).unwrap();
        assert!(series.closes().iter().all(|&c| c >= PRICE_FLOOR));
    }

    #[test]
    fn zero_ticks_is_an_empty_series_error() {
        assert_eq!(
            synthetic_series("SYN", 1, 0, monday(), 100.0),
            Err(PriceSeriesError::Empty)
        );
    }

    #[test]
    fn symbol_seed_is_stable() {
        assert_eq!(symbol_seed("7203"), symbol_seed("7203"));
        assert_ne!(symbol_seed("7203"), symbol_seed("6758"));
    }
}
