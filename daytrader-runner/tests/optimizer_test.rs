//! Integration tests for the grid-search optimizer.
//!
//! Sweeps run on seeded synthetic series so results are reproducible, and
//! parallel sweeps are checked against sequential ones row by row.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::NaiveDate;
use daytrader_core::domain::{LotSize, Parameters, PriceSeries};
use daytrader_core::signal::{Resample, SignalStrategy};
use daytrader_core::Simulator;
use daytrader_runner::data::{symbol_seed, synthetic_series};
use daytrader_runner::{select_best, Optimizer, ParamGrid};

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
}

fn synthetic(symbol: &str, n: usize) -> PriceSeries {
    synthetic_series(symbol, symbol_seed(symbol), n, monday(), 2_500.0).unwrap()
}

fn wide_grid() -> ParamGrid {
    ParamGrid {
        upper_limits: vec![1.01, 1.05, 1.10],
        lower_limits: vec![0.95, 0.97, 0.99],
        short_windows: vec![3, 5],
        long_windows: vec![5, 10, 20],
    }
}

fn optimizer(strategy: SignalStrategy) -> Optimizer {
    Optimizer::new(
        Simulator::new(strategy, LotSize::default(), Resample::Tick),
        1_000_000.0,
    )
}

#[test]
fn parallel_and_sequential_sweeps_agree() {
    let series = synthetic("7203", 3_000);
    for strategy in [SignalStrategy::Threshold, SignalStrategy::TrendFollow] {
        let parallel = optimizer(strategy).optimize(&series, &wide_grid());
        let sequential = optimizer(strategy)
            .with_parallelism(false)
            .optimize(&series, &wide_grid());
        assert_eq!(parallel, sequential, "{strategy} sweep differs");
    }
}

#[test]
fn repeated_sweeps_are_identical() {
    let series = synthetic("6758", 2_000);
    let a = optimizer(SignalStrategy::TrendFollow).optimize(&series, &wide_grid());
    let b = optimizer(SignalStrategy::TrendFollow).optimize(&series, &wide_grid());
    assert_eq!(a, b);
    assert_eq!(a.dataset_hash, series.fingerprint());
}

#[test]
fn rows_follow_grid_order_and_skip_invalid_points() {
    let series = synthetic("9984", 500);
    let grid = wide_grid();
    let report = optimizer(SignalStrategy::TrendFollow).optimize(&series, &grid);

    // (short 5, long 5) is the only invalid window pair: 3 * 3 * 1 skipped
    assert_eq!(grid.cartesian_size(), 54);
    assert_eq!(report.len(), 45);
    let params: Vec<Parameters> = report.rows.iter().map(|r| r.params()).collect();
    assert_eq!(params, grid.combinations());
    assert!(report.rows.iter().all(|r| r.short_window < r.long_window));
}

#[test]
fn best_row_has_the_highest_profit() {
    let series = synthetic("8306", 2_000);
    let report = optimizer(SignalStrategy::Threshold).optimize(&series, &ParamGrid::default());
    let best = report.best().unwrap();
    assert!(report.rows.iter().all(|r| r.profit_loss <= best.profit_loss));
    assert_eq!(report.best_index, select_best(&report.rows));
    assert_eq!(report.sorted_by_profit()[0].profit_loss, best.profit_loss);
}

#[test]
fn ties_resolve_to_the_earliest_grid_point() {
    // Bought on the first tick, never reaches either take-profit or the stop.
    let start = monday().and_hms_opt(9, 0, 0).unwrap();
    let series = PriceSeries::from_closes("TIE", start, &[100.0, 101.0, 102.0]).unwrap();
    let grid = ParamGrid::limits_only(vec![1.5, 1.6], vec![0.5], 5, 10);

    let report = optimizer(SignalStrategy::Threshold).optimize(&series, &grid);
    assert_eq!(report.len(), 2);
    assert_eq!(report.rows[0].profit_loss, report.rows[1].profit_loss);
    assert_eq!(report.best_index, Some(0));
    assert_eq!(report.best().unwrap().upper_limit, 1.5);
}

#[test]
fn empty_grid_has_no_best() {
    let series = synthetic("7203", 100);
    let grid = ParamGrid::limits_only(vec![0.9], vec![0.95], 5, 10);
    let report = optimizer(SignalStrategy::Threshold).optimize(&series, &grid);
    assert!(report.is_empty());
    assert!(report.best().is_none());
}

#[test]
fn progress_reports_every_point() {
    let series = synthetic("7203", 300);
    let grid = ParamGrid::default();
    let calls = AtomicUsize::new(0);
    let report = optimizer(SignalStrategy::Threshold).optimize_with_progress(
        &series,
        &grid,
        |idx, total, _row| {
            assert!(idx < total);
            calls.fetch_add(1, Ordering::SeqCst);
        },
    );
    assert_eq!(calls.load(Ordering::SeqCst), report.len());
    assert_eq!(report.len(), 20);
}

#[test]
fn every_row_starts_from_the_same_cash() {
    let series = synthetic("7203", 1_000);
    let report = optimizer(SignalStrategy::Threshold).optimize(&series, &ParamGrid::default());
    for row in &report.rows {
        assert!((row.final_value - row.profit_loss - 1_000_000.0).abs() < 1e-6);
    }
}
