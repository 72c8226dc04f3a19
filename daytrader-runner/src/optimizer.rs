//! Grid-search optimizer over strategy parameters.
//!
//! Every grid point is replayed on a fresh ledger. Parallel sweeps use rayon
//! and collect in grid order, and the best row is picked by "higher
//! profit_loss, then lower grid index". The pick does not depend on the order
//! rows are compared in, so parallel and sequential sweeps agree exactly.

use std::cmp::Ordering;

use daytrader_core::domain::{Parameters, PriceSeries};
use daytrader_core::signal::SignalStrategy;
use daytrader_core::{SimulationResult, Simulator};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Axes of the parameter sweep.
///
/// Iteration order is upper (outer) → lower → short → long (inner).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamGrid {
    pub upper_limits: Vec<f64>,
    pub lower_limits: Vec<f64>,
    pub short_windows: Vec<usize>,
    pub long_windows: Vec<usize>,
}

impl ParamGrid {
    /// Sweep only the take-profit / stop-loss ratios with fixed windows.
    pub fn limits_only(upper_limits: Vec<f64>, lower_limits: Vec<f64>, short: usize, long: usize) -> Self {
        Self {
            upper_limits,
            lower_limits,
            short_windows: vec![short],
            long_windows: vec![long],
        }
    }

    /// Number of points in the full Cartesian product, invalid ones included.
    pub fn cartesian_size(&self) -> usize {
        self.upper_limits.len()
            * self.lower_limits.len()
            * self.short_windows.len()
            * self.long_windows.len()
    }

    /// Valid parameter sets in iteration order.
    ///
    /// Combinations with `short >= long` or out-of-range ratios are skipped.
    pub fn combinations(&self) -> Vec<Parameters> {
        let mut combos = Vec::with_capacity(self.cartesian_size());
        for &upper in &self.upper_limits {
            for &lower in &self.lower_limits {
                for &short in &self.short_windows {
                    for &long in &self.long_windows {
                        let params = Parameters::new(upper, lower, short, long);
                        match params.validate() {
                            Ok(()) => combos.push(params),
                            Err(e) => debug!(%e, "skipping grid point"),
                        }
                    }
                }
            }
        }
        combos
    }

    /// Number of valid grid points.
    pub fn size(&self) -> usize {
        self.combinations().len()
    }
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self::limits_only(
            vec![1.01, 1.05, 1.10, 1.15, 1.20],
            vec![0.90, 0.95, 0.97, 0.99],
            5,
            10,
        )
    }
}

/// Outcome of one grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub upper_limit: f64,
    pub lower_limit: f64,
    pub short_window: usize,
    pub long_window: usize,
    pub final_value: f64,
    pub profit_loss: f64,
    pub trade_count: usize,
}

impl OptimizationResult {
    fn from_run(params: &Parameters, run: &SimulationResult) -> Self {
        Self {
            upper_limit: params.upper_limit,
            lower_limit: params.lower_limit,
            short_window: params.short_window,
            long_window: params.long_window,
            final_value: run.final_value,
            profit_loss: run.profit_loss,
            trade_count: run.trade_count(),
        }
    }

    pub fn params(&self) -> Parameters {
        Parameters::new(
            self.upper_limit,
            self.lower_limit,
            self.short_window,
            self.long_window,
        )
    }
}

/// All grid rows for one symbol plus the winning row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub symbol: String,
    /// BLAKE3 fingerprint of the price series the sweep ran on.
    pub dataset_hash: String,
    pub strategy: SignalStrategy,
    pub initial_cash: f64,
    /// One row per valid grid point, in grid order.
    pub rows: Vec<OptimizationResult>,
    /// Index into `rows` of the best row; `None` for an empty grid.
    pub best_index: Option<usize>,
}

impl OptimizationReport {
    pub fn best(&self) -> Option<&OptimizationResult> {
        self.best_index.and_then(|i| self.rows.get(i))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows sorted by profit_loss (descending), grid order among ties.
    pub fn sorted_by_profit(&self) -> Vec<&OptimizationResult> {
        let mut indexed: Vec<(usize, &OptimizationResult)> = self.rows.iter().enumerate().collect();
        indexed.sort_by(|a, b| rank(*a, *b));
        indexed.into_iter().map(|(_, row)| row).collect()
    }

    pub fn top_n(&self, n: usize) -> Vec<&OptimizationResult> {
        self.sorted_by_profit().into_iter().take(n).collect()
    }
}

/// `Less` when `a` ranks ahead of `b`.
fn rank(a: (usize, &OptimizationResult), b: (usize, &OptimizationResult)) -> Ordering {
    b.1.profit_loss
        .total_cmp(&a.1.profit_loss)
        .then_with(|| a.0.cmp(&b.0))
}

/// The better of two indexed rows. Commutative and associative.
fn pick_better<'a>(
    a: (usize, &'a OptimizationResult),
    b: (usize, &'a OptimizationResult),
) -> (usize, &'a OptimizationResult) {
    match rank(a, b) {
        Ordering::Greater => b,
        _ => a,
    }
}

/// Index of the best row.
pub fn select_best(rows: &[OptimizationResult]) -> Option<usize> {
    rows.iter().enumerate().reduce(pick_better).map(|(i, _)| i)
}

/// Grid-search executor.
#[derive(Debug, Clone)]
pub struct Optimizer {
    simulator: Simulator,
    initial_cash: f64,
    parallel: bool,
}

impl Optimizer {
    pub fn new(simulator: Simulator, initial_cash: f64) -> Self {
        Self {
            simulator,
            initial_cash,
            parallel: true,
        }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn simulator(&self) -> &Simulator {
        &self.simulator
    }

    pub fn initial_cash(&self) -> f64 {
        self.initial_cash
    }

    /// Replay `series` once per valid grid point.
    pub fn optimize(&self, series: &PriceSeries, grid: &ParamGrid) -> OptimizationReport {
        self.optimize_with_progress(series, grid, |_, _, _| {})
    }

    /// Executes a sweep with progress reporting.
    ///
    /// The callback is invoked after each grid point completes with:
    /// - Grid index (0-based)
    /// - Total number of valid grid points
    /// - The completed row
    ///
    /// In parallel mode callbacks arrive in completion order.
    pub fn optimize_with_progress<F>(
        &self,
        series: &PriceSeries,
        grid: &ParamGrid,
        progress_callback: F,
    ) -> OptimizationReport
    where
        F: Fn(usize, usize, &OptimizationResult) + Send + Sync,
    {
        let combos = grid.combinations();
        let total = combos.len();
        info!(
            symbol = series.symbol(),
            points = total,
            skipped = grid.cartesian_size() - total,
            parallel = self.parallel,
            "starting grid search"
        );

        let evaluate = |(idx, params): (usize, &Parameters)| {
            let run = self.simulator.run(series, params, self.initial_cash);
            let row = OptimizationResult::from_run(params, &run);
            debug!(
                upper = row.upper_limit,
                lower = row.lower_limit,
                short = row.short_window,
                long = row.long_window,
                final_value = row.final_value,
                profit_loss = row.profit_loss,
                "grid point"
            );
            progress_callback(idx, total, &row);
            row
        };

        let rows: Vec<OptimizationResult> = if self.parallel {
            combos.par_iter().enumerate().map(evaluate).collect()
        } else {
            combos.iter().enumerate().map(evaluate).collect()
        };

        let best_index = select_best(&rows);
        if let Some(best) = best_index.and_then(|i| rows.get(i)) {
            info!(
                symbol = series.symbol(),
                upper = best.upper_limit,
                lower = best.lower_limit,
                profit_loss = best.profit_loss,
                "best parameters"
            );
        }

        OptimizationReport {
            symbol: series.symbol().to_string(),
            dataset_hash: series.fingerprint(),
            strategy: self.simulator.strategy(),
            initial_cash: self.initial_cash,
            rows,
            best_index,
        }
    }
}
