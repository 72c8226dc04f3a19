//! End-to-end replay scenarios with hand-checked ledger arithmetic.

use chrono::{NaiveDate, NaiveDateTime};
use daytrader_core::domain::{Ledger, LotSize, Parameters, PriceSeries, TradeSide};
use daytrader_core::indicators::TrailingWindow;
use daytrader_core::signal::{HoldReason, Resample, Signal, SignalStrategy};
use daytrader_core::Simulator;

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

fn series(closes: &[f64]) -> PriceSeries {
    PriceSeries::from_closes("7203", start(), closes).unwrap()
}

#[test]
fn threshold_buy_stop_out_rebuy() {
    let sim = Simulator::new(SignalStrategy::Threshold, LotSize::SINGLE, Resample::Tick);
    let params = Parameters::new(1.10, 0.95, 5, 10);
    let result = sim.run(&series(&[100.0, 95.0, 120.0]), &params, 50_000.0);

    let summary: Vec<_> = result
        .trades
        .iter()
        .map(|t| (t.side, t.quantity, t.price))
        .collect();
    assert_eq!(
        summary,
        vec![
            (TradeSide::Buy, 500, 100.0),
            (TradeSide::Sell, 500, 95.0),
            (TradeSide::Buy, 395, 120.0),
        ]
    );

    // 47,500 after the stop-out, 395 * 120 = 47,400 spent on the re-entry
    assert_eq!(result.ledger.cash(), 100.0);
    assert_eq!(result.ledger.holding_quantity(), 395);
    assert_eq!(result.ledger.average_cost(), 120.0);
    assert_eq!(result.final_value, 47_500.0);
    assert_eq!(result.profit_loss, -2_500.0);
}

#[test]
fn intermediate_ledger_after_stop_out_is_flat() {
    let sim = Simulator::new(SignalStrategy::Threshold, LotSize::SINGLE, Resample::Tick);
    let result = sim.run(&series(&[100.0, 95.0]), &Parameters::default(), 50_000.0);
    assert_eq!(result.ledger.cash(), 47_500.0);
    assert_eq!(result.ledger.holding_quantity(), 0);
    assert_eq!(result.ledger.average_cost(), 0.0);
}

#[test]
fn short_history_never_trades() {
    let sim = Simulator::new(SignalStrategy::TrendFollow, LotSize::SINGLE, Resample::Tick);
    let params = Parameters::new(1.10, 0.95, 5, 10);
    let closes: Vec<f64> = (0..9).map(|i| 100.0 + i as f64 * 3.0).collect();
    let result = sim.run(&series(&closes), &params, 100_000.0);

    assert!(result.trades.is_empty());
    assert_eq!(result.insufficient_history_ticks, 9);
    assert!(result
        .signals
        .iter()
        .all(|s| matches!(s, Signal::Hold(HoldReason::InsufficientHistory { .. }))));
    assert_eq!(result.final_value, 100_000.0);
    assert_eq!(result.profit_loss, 0.0);
}

#[test]
fn broke_and_flat_always_holds() {
    // whatever the moving averages say, no cash for one share means no trade
    let ledger = Ledger::new(50.0);
    let params = Parameters::new(1.10, 0.95, 2, 4);
    for closes in [
        [100.0, 101.0, 102.0, 103.0],
        [103.0, 102.0, 101.0, 100.0],
        [100.0, 100.0, 100.0, 100.0],
    ] {
        let mut window = TrailingWindow::new(4);
        for c in closes {
            window.push(c);
        }
        for strategy in [SignalStrategy::Threshold, SignalStrategy::TrendFollow] {
            let signal = strategy.decide(100.0, &ledger, &window, &params);
            assert!(signal.is_hold(), "{strategy} traded with {signal}");
        }
    }
}

#[test]
fn trend_follow_rides_uptrend_and_takes_profit() {
    let sim = Simulator::new(SignalStrategy::TrendFollow, LotSize::SINGLE, Resample::Tick);
    let params = Parameters::new(1.05, 0.95, 2, 4);
    let closes = [100.0, 100.0, 100.0, 102.0, 104.0, 106.0, 108.0];
    let result = sim.run(&series(&closes), &params, 10_200.0);

    assert_eq!(result.trades.len(), 2);
    assert_eq!(result.trades[0].side, TradeSide::Buy);
    assert_eq!(result.trades[0].price, 102.0);
    assert_eq!(result.trades[0].quantity, 100);
    // 107.1 is the take-profit level; 108 is the first close above it
    assert_eq!(result.trades[1].side, TradeSide::Sell);
    assert_eq!(result.trades[1].price, 108.0);
    assert!(result.ledger.is_flat());
    assert_eq!(result.final_value, 10_800.0);
}

#[test]
fn round_lot_replay() {
    let sim = Simulator::new(SignalStrategy::Threshold, LotSize::ROUND, Resample::Tick);
    let result = sim.run(&series(&[100.0, 95.0, 120.0]), &Parameters::default(), 50_000.0);
    let quantities: Vec<u64> = result.trades.iter().map(|t| t.quantity).collect();
    assert_eq!(quantities, vec![500, 500, 300]);
    assert_eq!(result.ledger.cash(), 11_500.0);
}
