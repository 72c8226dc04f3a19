//! CSV historical store — one `{ticker}.csv` file per symbol.
//!
//! Accepts the column spellings produced by common download tools: a
//! timestamp column named `Datetime`, `Date`, `timestamp` (any case) and a
//! `Close`/`close` column. Timezone suffixes on timestamps are dropped, keeping
//! the exchange-local wall time. Rows are sorted ascending on load.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use daytrader_core::domain::{PricePoint, PriceSeries};
use tracing::{debug, warn};

use crate::collaborators::{CollaboratorError, HistoricalStore, HistoryWindow};

const TIMESTAMP_COLUMNS: &[&str] = &["datetime", "date", "timestamp", "time"];
const CLOSE_COLUMNS: &[&str] = &["close", "adj_close", "adj close"];

/// Reads and writes `{dir}/{ticker}.csv`.
#[derive(Debug, Clone)]
pub struct CsvHistoricalStore {
    dir: PathBuf,
}

impl CsvHistoricalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path for `ticker`; dots become underscores.
    pub fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", ticker.replace('.', "_")))
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.path_for(ticker).is_file()
    }

    /// Write a series as `Datetime,Close`, replacing any existing file.
    pub fn write(&self, ticker: &str, series: &PriceSeries) -> Result<PathBuf, CollaboratorError> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            CollaboratorError::Connectivity(format!("failed to create {}: {e}", self.dir.display()))
        })?;

        let path = self.path_for(ticker);
        let tmp_path = path.with_extension("csv.tmp");
        let io_err = |e: &dyn std::fmt::Display| {
            CollaboratorError::Connectivity(format!("failed to write {}: {e}", tmp_path.display()))
        };

        let mut wtr = csv::Writer::from_path(&tmp_path).map_err(|e| io_err(&e))?;
        wtr.write_record(["Datetime", "Close"]).map_err(|e| io_err(&e))?;
        for point in series.points() {
            wtr.write_record([
                point.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                point.close.to_string(),
            ])
            .map_err(|e| io_err(&e))?;
        }
        wtr.flush().map_err(|e| io_err(&e))?;
        drop(wtr);

        // Atomic rename
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            CollaboratorError::Connectivity(format!("atomic rename failed: {e}"))
        })?;
        debug!(ticker, path = %path.display(), points = series.len(), "cached price series");
        Ok(path)
    }

    fn read(&self, ticker: &str) -> Result<PriceSeries, CollaboratorError> {
        let path = self.path_for(ticker);
        if !path.is_file() {
            return Err(CollaboratorError::NotFound(format!(
                "no price file for '{ticker}' at {}",
                path.display()
            )));
        }

        let unavailable =
            |msg: String| CollaboratorError::DataUnavailable(format!("{}: {msg}", path.display()));

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(&path)
            .map_err(|e| unavailable(e.to_string()))?;
        let headers = rdr.headers().map_err(|e| unavailable(e.to_string()))?.clone();
        let ts_col = find_column(&headers, TIMESTAMP_COLUMNS)
            .ok_or_else(|| unavailable("no timestamp column".into()))?;
        let close_col = find_column(&headers, CLOSE_COLUMNS)
            .ok_or_else(|| unavailable("no close column".into()))?;

        let mut points = Vec::new();
        let mut skipped = 0usize;
        for (line, record) in rdr.records().enumerate() {
            let record = record.map_err(|e| unavailable(e.to_string()))?;
            let (Some(raw_ts), Some(raw_close)) = (record.get(ts_col), record.get(close_col)) else {
                skipped += 1;
                continue;
            };
            // Rows with a missing close are dropped, as a download gap.
            let close = match raw_close.parse::<f64>() {
                Ok(close) if close.is_finite() && close > 0.0 => close,
                _ => {
                    skipped += 1;
                    continue;
                }
            };
            let timestamp = parse_timestamp(raw_ts).ok_or_else(|| {
                unavailable(format!("row {}: unparseable timestamp '{raw_ts}'", line + 2))
            })?;
            points.push(PricePoint::new(timestamp, close));
        }
        if skipped > 0 {
            warn!(ticker, skipped, "dropped rows without a usable close");
        }

        points.sort_by_key(|p| p.timestamp);
        PriceSeries::new(ticker, points).map_err(|e| unavailable(e.to_string()))
    }
}

impl HistoricalStore for CsvHistoricalStore {
    fn load(&self, ticker: &str, window: HistoryWindow) -> Result<PriceSeries, CollaboratorError> {
        let series = self.read(ticker)?;
        let series = window.apply(series);
        debug!(ticker, points = series.len(), ?window, "loaded price series");
        Ok(series)
    }
}

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    names.iter().find_map(|name| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    })
}

/// Parse the timestamp spellings seen in price files.
///
/// Offsets are dropped, not converted: `2024-06-03 09:00:00+09:00` becomes
/// `2024-06-03 09:00:00`. Bare dates become midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%z"];
    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%Y/%m/%d %H:%M",
    ];

    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.naive_local());
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn parses_timezone_suffixed_timestamps() {
        assert_eq!(
            parse_timestamp("2024-06-03 09:00:00+09:00"),
            Some(dt(2024, 6, 3, 9, 0))
        );
        assert_eq!(
            parse_timestamp("2024-06-03T09:05:00-04:00"),
            Some(dt(2024, 6, 3, 9, 5))
        );
    }

    #[test]
    fn parses_naive_and_date_only() {
        assert_eq!(parse_timestamp("2024-06-03 09:01:00"), Some(dt(2024, 6, 3, 9, 1)));
        assert_eq!(parse_timestamp("2024-06-03"), Some(dt(2024, 6, 3, 0, 0)));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn path_replaces_dots() {
        let store = CsvHistoricalStore::new("/tmp/prices");
        assert_eq!(store.path_for("7203.T"), PathBuf::from("/tmp/prices/7203_T.csv"));
    }
}
