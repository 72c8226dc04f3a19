//! Reporting and export — JSON, CSV, and plain-text summaries.
//!
//! Provides export formats for optimization reports and backtest runs:
//! - **JSON**: full round-trip serialization of an `OptimizationReport`
//! - **CSV**: grid rows, trade tape and equity curve for external tools
//! - **Text**: the short summary printed by the CLI

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use daytrader_core::domain::TradeEvent;
use daytrader_core::indicators::Trend;
use daytrader_core::SimulationResult;

use crate::optimizer::{OptimizationReport, OptimizationResult};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize an `OptimizationReport` to pretty JSON.
pub fn export_json(report: &OptimizationReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize OptimizationReport to JSON")
}

/// Deserialize an `OptimizationReport` from JSON.
pub fn import_json(json: &str) -> Result<OptimizationReport> {
    serde_json::from_str(json).context("failed to deserialize OptimizationReport from JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export grid rows as CSV.
///
/// Columns: upper_limit, lower_limit, short_window, long_window, final_value,
/// profit_loss, trade_count
pub fn export_rows_csv(rows: &[OptimizationResult]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for row in rows {
        wtr.serialize(row)?;
    }
    if rows.is_empty() {
        wtr.write_record([
            "upper_limit",
            "lower_limit",
            "short_window",
            "long_window",
            "final_value",
            "profit_loss",
            "trade_count",
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export a trade log as CSV.
///
/// Columns: index, timestamp, side, quantity, price, notional
pub fn export_trades_csv(trades: &[TradeEvent]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["index", "timestamp", "side", "quantity", "price", "notional"])?;
    for t in trades {
        wtr.write_record([
            &t.index.to_string(),
            &t.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            &t.side.to_string(),
            &t.quantity.to_string(),
            &format!("{:.4}", t.price),
            &format!("{:.2}", t.notional()),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export an equity curve as CSV with tick_index and equity columns.
pub fn export_equity_csv(equity_curve: &[f64]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["tick_index", "equity"])?;
    for (i, eq) in equity_curve.iter().enumerate() {
        wtr.write_record([&i.to_string(), &format!("{:.2}", eq)])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Files ──────────────────────────────────────────────────────────

/// `{ticker}_optimal_parameters_{YYYYmmddHHMM}.csv`, dots in the ticker
/// replaced by underscores.
pub fn report_filename(ticker: &str, at: NaiveDateTime) -> String {
    format!(
        "{}_optimal_parameters_{}.csv",
        ticker.replace('.', "_"),
        at.format("%Y%m%d%H%M")
    )
}

/// Write the grid rows of `report` to `output_dir`. Returns the file path.
pub fn save_report_csv(
    report: &OptimizationReport,
    output_dir: &Path,
    at: NaiveDateTime,
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create report dir: {}", output_dir.display()))?;
    let path = output_dir.join(report_filename(&report.symbol, at));
    let csv = export_rows_csv(&report.rows)?;
    std::fs::write(&path, csv).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Write the full report as JSON next to the CSV. Returns the file path.
pub fn save_report_json(
    report: &OptimizationReport,
    output_dir: &Path,
    at: NaiveDateTime,
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create report dir: {}", output_dir.display()))?;
    let path = output_dir
        .join(report_filename(&report.symbol, at))
        .with_extension("json");
    std::fs::write(&path, export_json(report)?)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

// ─── Text summaries ─────────────────────────────────────────────────

/// Summary of an optimization run: the best row and the current trend.
pub fn optimization_summary(report: &OptimizationReport, trend: Option<Trend>) -> String {
    let mut out = String::with_capacity(256);
    out.push_str(&format!("Ticker: {}\n", report.symbol));
    out.push_str(&format!("Strategy: {}\n", report.strategy));
    out.push_str(&format!("Grid points: {}\n", report.len()));
    match report.best() {
        Some(best) => {
            out.push_str(&format!("Best upper limit: {}\n", best.upper_limit));
            out.push_str(&format!("Best lower limit: {}\n", best.lower_limit));
            out.push_str(&format!(
                "Best windows: {}/{}\n",
                best.short_window, best.long_window
            ));
            out.push_str(&format!("Best final value: {:.2}\n", best.final_value));
            out.push_str(&format!("Best profit/loss: {:.2}\n", best.profit_loss));
        }
        None => out.push_str("Best parameters: none (empty grid)\n"),
    }
    match trend {
        Some(trend) => out.push_str(&format!("Current trend: {trend}\n")),
        None => out.push_str("Current trend: insufficient history\n"),
    }
    out
}

/// Summary of a single backtest run.
pub fn backtest_summary(symbol: &str, result: &SimulationResult) -> String {
    let mut out = String::with_capacity(256);
    out.push_str(&format!("Ticker: {symbol}\n"));
    out.push_str(&format!("Initial capital: {:.2}\n", result.initial_cash));
    out.push_str(&format!("Final value: {:.2}\n", result.final_value));
    out.push_str(&format!(
        "Profit/loss: {:.2} ({:+.2}%)\n",
        result.profit_loss,
        result.return_pct()
    ));
    out.push_str(&format!("Trades: {}\n", result.trade_count()));
    out.push_str(&format!(
        "Holding: {} @ {:.4}\n",
        result.ledger.holding_quantity(),
        result.ledger.average_cost()
    ));
    out
}
