//! Daytrader CLI — backtest, optimize, live trading and data fetch commands.
//!
//! Commands:
//! - `backtest` — replay one ticker with one parameter set
//! - `optimize` — grid-search parameters for one or more tickers, write CSV reports
//! - `live` — poll quotes and trade through the broker (or a paper broker)
//! - `fetch` — download intraday history through the broker and cache it as CSV

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use daytrader_core::domain::PriceSeries;
use daytrader_core::indicators::classify_trend;
use daytrader_core::signal::{Resample, SignalEngine, SignalStrategy};
use daytrader_core::Simulator;
use daytrader_runner::data::{symbol_seed, synthetic_series};
use daytrader_runner::export::{
    backtest_summary, export_equity_csv, export_trades_csv, optimization_summary,
    save_report_csv, save_report_json,
};
use daytrader_runner::{
    run_backtest_on_series, Clock, CsvHistoricalStore, DaytraderConfig, HistoricalStore,
    HistoryRange, HttpBroker, JsonStatePersistence, LiveRunner, LiveSettings, MarketData,
    OrderExecution, Optimizer, PaperBroker, ReplayClock, ReplayMarketData, SystemClock,
};

#[derive(Parser)]
#[command(
    name = "daytrader",
    about = "Daytrader CLI — threshold and trend-following intraday trading"
)]
struct Cli {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level (RUST_LOG overrides).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Flags that override the `[strategy]` and `[account]` sections.
#[derive(Args, Debug, Default)]
struct StrategyArgs {
    /// Strategy: threshold or trend_follow.
    #[arg(long)]
    strategy: Option<SignalStrategy>,

    /// Trailing-window resampling: tick or daily.
    #[arg(long)]
    resample: Option<Resample>,

    #[arg(long)]
    upper_limit: Option<f64>,

    #[arg(long)]
    lower_limit: Option<f64>,

    #[arg(long)]
    short_window: Option<usize>,

    #[arg(long)]
    long_window: Option<usize>,

    /// Starting cash.
    #[arg(long)]
    cash: Option<f64>,

    /// Shares per lot (1, or 100 for round lots).
    #[arg(long)]
    lot_size: Option<u64>,
}

/// Where price history comes from.
#[derive(Args, Debug, Default)]
struct DataArgs {
    /// Directory holding `{ticker}.csv` files.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Use a seeded synthetic series with this many one-minute ticks instead of files.
    #[arg(long)]
    synthetic: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay one ticker with one parameter set.
    Backtest {
        ticker: String,

        #[command(flatten)]
        strategy: StrategyArgs,

        #[command(flatten)]
        data: DataArgs,

        /// Write the trade tape as CSV.
        #[arg(long)]
        trades_csv: Option<PathBuf>,

        /// Write the equity curve as CSV.
        #[arg(long)]
        equity_csv: Option<PathBuf>,
    },
    /// Grid-search upper/lower limits (and windows) for each ticker.
    Optimize {
        /// Tickers to optimize. Defaults to `[data] tickers` from the config.
        tickers: Vec<String>,

        #[command(flatten)]
        strategy: StrategyArgs,

        #[command(flatten)]
        data: DataArgs,

        /// Report directory. Defaults to `[optimizer] output_dir`.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Also write the full report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Evaluate grid points on one thread.
        #[arg(long, default_value_t = false)]
        sequential: bool,
    },
    /// Trade live: poll quotes, decide, submit orders, persist the ledger.
    Live {
        /// Symbol to trade. Defaults to `[live] symbol`.
        #[arg(long)]
        symbol: Option<String>,

        #[command(flatten)]
        strategy: StrategyArgs,

        /// Fill orders locally instead of sending them to the broker.
        #[arg(long, default_value_t = false)]
        paper: bool,

        /// Replay the symbol's stored CSV as the quote feed (implies --paper, offline).
        #[arg(long, default_value_t = false)]
        replay: bool,

        /// Stop after this many ticks.
        #[arg(long)]
        max_ticks: Option<u64>,

        /// Seconds between quotes. Defaults to `[live] poll_interval_secs`.
        #[arg(long)]
        poll_secs: Option<u64>,

        /// Session cutoff, HH:MM. Defaults to `[live] cutoff`.
        #[arg(long)]
        cutoff: Option<String>,

        /// Directory for ledger state. Defaults to `[live] state_dir`.
        #[arg(long)]
        state_dir: Option<PathBuf>,

        /// Directory holding `{ticker}.csv` files (for --replay).
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Download intraday history through the broker and cache it as CSV.
    Fetch {
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Days of history.
        #[arg(long, default_value_t = 10)]
        days: u32,

        /// Bar spacing in minutes.
        #[arg(long, default_value_t = 1)]
        interval: u32,

        /// Cache directory. Defaults to `[data] dir`.
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = DaytraderConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Backtest {
            ticker,
            strategy,
            data,
            trades_csv,
            equity_csv,
        } => run_backtest_cmd(config, ticker, strategy, data, trades_csv, equity_csv),
        Commands::Optimize {
            tickers,
            strategy,
            data,
            output_dir,
            json,
            sequential,
        } => run_optimize(config, tickers, strategy, data, output_dir, json, sequential),
        Commands::Live {
            symbol,
            strategy,
            paper,
            replay,
            max_ticks,
            poll_secs,
            cutoff,
            state_dir,
            data_dir,
        } => {
            let mut config = config;
            if let Some(symbol) = symbol {
                config.live.symbol = symbol;
            }
            if let Some(poll_secs) = poll_secs {
                config.live.poll_interval_secs = poll_secs;
            }
            if let Some(cutoff) = cutoff {
                config.live.cutoff = cutoff;
            }
            if let Some(state_dir) = state_dir {
                config.live.state_dir = state_dir;
            }
            if let Some(data_dir) = data_dir {
                config.data.dir = data_dir;
            }
            run_live(config, strategy, paper, replay, max_ticks)
        }
        Commands::Fetch {
            symbols,
            days,
            interval,
            data_dir,
        } => {
            let mut config = config;
            if let Some(data_dir) = data_dir {
                config.data.dir = data_dir;
            }
            run_fetch(&config, &symbols, HistoryRange::days(days, interval))
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn apply_strategy_args(config: &mut DaytraderConfig, args: &StrategyArgs) -> Result<()> {
    if let Some(kind) = args.strategy {
        config.strategy.kind = kind;
    }
    if let Some(resample) = args.resample {
        config.strategy.resample = resample;
    }
    let params = &mut config.strategy.params;
    if let Some(upper) = args.upper_limit {
        params.upper_limit = upper;
    }
    if let Some(lower) = args.lower_limit {
        params.lower_limit = lower;
    }
    if let Some(short) = args.short_window {
        params.short_window = short;
    }
    if let Some(long) = args.long_window {
        params.long_window = long;
    }
    if let Some(cash) = args.cash {
        config.account.initial_cash = cash;
    }
    if let Some(lot_size) = args.lot_size {
        config.account.lot_size = lot_size;
    }
    config.validate().context("invalid configuration")?;
    Ok(())
}

fn simulator(config: &DaytraderConfig) -> Simulator {
    Simulator::new(
        config.strategy.kind,
        config.account.lot(),
        config.strategy.resample,
    )
}

fn load_series(config: &DaytraderConfig, data: &DataArgs, ticker: &str) -> Result<PriceSeries> {
    if let Some(n) = data.synthetic {
        warn!(ticker, ticks = n, "using SYNTHETIC data");
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).context("invalid synthetic start date")?;
        return Ok(synthetic_series(ticker, symbol_seed(ticker), n, start, 2_500.0)?);
    }
    let dir = data.data_dir.clone().unwrap_or_else(|| config.data.dir.clone());
    let store = CsvHistoricalStore::new(dir);
    store
        .load(ticker, config.data.window)
        .with_context(|| format!("failed to load history for {ticker}"))
}

fn run_backtest_cmd(
    mut config: DaytraderConfig,
    ticker: String,
    strategy: StrategyArgs,
    data: DataArgs,
    trades_csv: Option<PathBuf>,
    equity_csv: Option<PathBuf>,
) -> Result<()> {
    apply_strategy_args(&mut config, &strategy)?;
    let series = load_series(&config, &data, &ticker)?;
    let report = run_backtest_on_series(
        &series,
        &simulator(&config),
        &config.strategy.params,
        config.account.initial_cash,
    )?;

    println!();
    println!("=== Backtest Result ===");
    println!("Strategy:       {}", report.strategy);
    println!("Period:         {} to {}", report.start, report.end);
    println!("Bars:           {}", report.bar_count);
    print!("{}", backtest_summary(&report.symbol, &report.result));
    if data.synthetic.is_some() {
        println!("WARNING: Results based on SYNTHETIC data");
    }
    println!();

    if let Some(path) = trades_csv {
        std::fs::write(&path, export_trades_csv(&report.result.trades)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Trades written to: {}", path.display());
    }
    if let Some(path) = equity_csv {
        std::fs::write(&path, export_equity_csv(&report.result.equity_curve)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Equity curve written to: {}", path.display());
    }
    Ok(())
}

fn run_optimize(
    mut config: DaytraderConfig,
    tickers: Vec<String>,
    strategy: StrategyArgs,
    data: DataArgs,
    output_dir: Option<PathBuf>,
    json: bool,
    sequential: bool,
) -> Result<()> {
    apply_strategy_args(&mut config, &strategy)?;
    let tickers = if tickers.is_empty() {
        config.data.tickers.clone()
    } else {
        tickers
    };
    if tickers.is_empty() {
        bail!("no tickers given and none configured under [data] tickers");
    }
    let output_dir = output_dir.unwrap_or_else(|| config.optimizer.output_dir.clone());
    let parallel = config.optimizer.parallel && !sequential;
    let optimizer = Optimizer::new(simulator(&config), config.account.initial_cash)
        .with_parallelism(parallel);

    let mut failures = Vec::new();
    for ticker in &tickers {
        let series = match load_series(&config, &data, ticker) {
            Ok(series) => series,
            Err(e) => {
                failures.push((ticker.clone(), e));
                continue;
            }
        };

        let report = optimizer.optimize(&series, &config.optimizer.grid);
        let now = chrono::Local::now().naive_local();
        let csv_path = save_report_csv(&report, &output_dir, now)?;
        if json {
            let json_path = save_report_json(&report, &output_dir, now)?;
            info!(path = %json_path.display(), "wrote JSON report");
        }

        let params = report
            .best()
            .map(|best| best.params())
            .unwrap_or(config.strategy.params);
        let trend = classify_trend(&series.daily_closes(), params.short_window, params.long_window)
            .or_else(|| classify_trend(&series.closes(), params.short_window, params.long_window));

        println!();
        print!("{}", optimization_summary(&report, trend));
        println!("Report: {}", csv_path.display());
        for (rank, row) in report.top_n(3).iter().enumerate() {
            println!(
                "  #{} upper {:.2} lower {:.2} windows {}/{} -> P/L {:.2} ({} trades)",
                rank + 1,
                row.upper_limit,
                row.lower_limit,
                row.short_window,
                row.long_window,
                row.profit_loss,
                row.trade_count
            );
        }
    }

    if !failures.is_empty() {
        for (ticker, err) in &failures {
            eprintln!("Error for {ticker}: {err:#}");
        }
        std::process::exit(1);
    }
    Ok(())
}

fn run_live(
    mut config: DaytraderConfig,
    strategy: StrategyArgs,
    paper: bool,
    replay: bool,
    max_ticks: Option<u64>,
) -> Result<()> {
    apply_strategy_args(&mut config, &strategy)?;
    if config.live.symbol.trim().is_empty() {
        bail!("no symbol: pass --symbol or set [live] symbol");
    }
    let cutoff = config.live.session_cutoff()?;
    let engine = SignalEngine::new(
        config.strategy.kind,
        config.strategy.params,
        config.strategy.resample,
    )
    .with_cutoff(cutoff);
    let persistence = Arc::new(JsonStatePersistence::new(&config.live.state_dir));
    let settings = LiveSettings::from_config(&config);

    let market: Arc<dyn MarketData>;
    let orders: Arc<dyn OrderExecution>;
    let clock: Arc<dyn Clock>;
    let mut max_ticks = max_ticks;
    let poll;
    if replay {
        let series = CsvHistoricalStore::new(&config.data.dir)
            .load(&config.live.symbol, config.data.window)
            .with_context(|| format!("failed to load {} for replay", config.live.symbol))?;
        market = Arc::new(ReplayMarketData::from_series(&series));
        orders = Arc::new(PaperBroker::new());
        clock = Arc::new(ReplayClock::from_series(&series));
        max_ticks = Some(max_ticks.unwrap_or(series.len() as u64));
        poll = Duration::ZERO;
    } else {
        let broker = Arc::new(HttpBroker::new(&config.broker)?);
        if paper {
            orders = Arc::new(PaperBroker::new());
        } else {
            orders = broker.clone();
        }
        market = broker;
        clock = Arc::new(SystemClock);
        poll = Duration::from_secs(config.live.poll_interval_secs);
    }

    let mut runner = LiveRunner::new(settings, engine, market, orders, persistence, clock);
    runner.resume().context("failed to load ledger state")?;
    if !replay {
        let range = HistoryRange::days(config.live.warmup_days, 1);
        if let Err(e) = runner.warm_up(range) {
            warn!(error = %e, "history warm-up failed, starting with an empty window");
        }
    }

    let summary = runner.run(max_ticks, poll);
    println!();
    println!("=== Live Session ===");
    println!("Symbol:         {}", runner.settings().symbol);
    println!("Ticks:          {}", summary.ticks);
    println!("Trades:         {}", summary.trades);
    println!("Skipped ticks:  {}", summary.skipped);
    println!("Failed orders:  {}", summary.failed_orders);
    println!("Cash:           {:.2}", summary.final_cash);
    println!("Holding:        {}", summary.final_holding);
    if runner.save_failures() > 0 {
        println!("WARNING: {} state saves failed", runner.save_failures());
    }
    if let Ok(json) = serde_json::to_string(&summary) {
        info!(summary = %json, "session summary");
    }
    Ok(())
}

fn run_fetch(config: &DaytraderConfig, symbols: &[String], range: HistoryRange) -> Result<()> {
    let broker = HttpBroker::new(&config.broker)?;
    let store = CsvHistoricalStore::new(&config.data.dir);

    let mut failed = 0usize;
    for symbol in symbols {
        match broker.get_history(symbol, range) {
            Ok(series) => {
                let path = store.write(symbol, &series)?;
                println!("{symbol}: {} bars -> {}", series.len(), path.display());
            }
            Err(e) => {
                failed += 1;
                eprintln!("Error for {symbol}: {e}");
            }
        }
    }
    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use daytrader_core::domain::Parameters;

    #[test]
    fn cli_parses_optimize() {
        let cli = Cli::try_parse_from([
            "daytrader",
            "optimize",
            "7203.T",
            "6758.T",
            "--strategy",
            "threshold",
            "--synthetic",
            "500",
        ])
        .unwrap();
        match cli.command {
            Commands::Optimize {
                tickers,
                strategy,
                data,
                ..
            } => {
                assert_eq!(tickers, vec!["7203.T", "6758.T"]);
                assert_eq!(strategy.strategy, Some(SignalStrategy::Threshold));
                assert_eq!(data.synthetic, Some(500));
            }
            _ => panic!("expected optimize"),
        }
    }

    #[test]
    fn strategy_args_override_config() {
        let mut config = DaytraderConfig::default();
        let args = StrategyArgs {
            upper_limit: Some(1.2),
            lot_size: Some(100),
            resample: Some(Resample::Daily),
            ..StrategyArgs::default()
        };
        apply_strategy_args(&mut config, &args).unwrap();
        assert_eq!(config.strategy.params, Parameters::new(1.2, 0.95, 5, 10));
        assert_eq!(config.account.lot_size, 100);
        assert_eq!(config.strategy.resample, Resample::Daily);
    }

    #[test]
    fn invalid_overrides_are_rejected() {
        let mut config = DaytraderConfig::default();
        let args = StrategyArgs {
            short_window: Some(20),
            ..StrategyArgs::default()
        };
        assert!(apply_strategy_args(&mut config, &args).is_err());
    }

    #[test]
    fn synthetic_backtest_runs_end_to_end() {
        let config = DaytraderConfig::default();
        let data = DataArgs {
            data_dir: None,
            synthetic: Some(1_000),
        };
        let series = load_series(&config, &data, "SYN").unwrap();
        assert_eq!(series.len(), 1_000);
        let report = run_backtest_on_series(
            &series,
            &simulator(&config),
            &config.strategy.params,
            config.account.initial_cash,
        )
        .unwrap();
        assert_eq!(report.bar_count, 1_000);
    }
}
