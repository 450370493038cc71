//! Bar loading for the runner.
//!
//! Bars arrive as per-symbol CSV exports with a
//! `time,open,high,low,close,volume` header. Timestamps are RFC 3339 or
//! epoch milliseconds; blank OHLC fields mark halted intervals, which load
//! as void (NaN) bars the engine skips. Files must be in strictly
//! increasing time order — the lifecycle fold assumes it, so the loader
//! enforces it.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use thiserror::Error;

use bracketlab_core::domain::PriceBar;

/// Errors from the bar loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("read bar data: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse bar file: {0}")]
    Csv(#[from] csv::Error),

    #[error("unrecognized timestamp {value:?} on line {line}")]
    BadTimestamp { value: String, line: usize },

    #[error("bars out of order on line {line}: {prev} then {next}")]
    OutOfOrder {
        line: usize,
        prev: DateTime<Utc>,
        next: DateTime<Utc>,
    },
}

#[derive(Debug, Deserialize)]
struct BarRow {
    time: String,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    #[serde(default)]
    volume: Option<f64>,
}

impl BarRow {
    fn into_bar(self, time: DateTime<Utc>) -> PriceBar {
        PriceBar {
            time,
            open: self.open.unwrap_or(f64::NAN),
            high: self.high.unwrap_or(f64::NAN),
            low: self.low.unwrap_or(f64::NAN),
            close: self.close.unwrap_or(f64::NAN),
            volume: self.volume.unwrap_or(0.0),
        }
    }
}

/// Load one symbol's bars from a CSV file.
pub fn load_bars_csv(path: &Path) -> Result<Vec<PriceBar>, LoadError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut bars: Vec<PriceBar> = Vec::new();

    for (i, row) in reader.deserialize::<BarRow>().enumerate() {
        let line = i + 2; // 1-based, after the header
        let row = row?;
        let time = parse_time(&row.time, line)?;
        if let Some(prev) = bars.last() {
            if time <= prev.time {
                return Err(LoadError::OutOfOrder {
                    line,
                    prev: prev.time,
                    next: time,
                });
            }
        }
        bars.push(row.into_bar(time));
    }

    Ok(bars)
}

/// Load bars for every symbol from `dir`, expecting one `<SYMBOL>.csv` each.
///
/// Symbols without a file load as an empty stream (the replay then closes
/// with no exit reason); a warning goes to stderr so silent gaps in a data
/// drop do not pass unnoticed.
pub fn load_bars_dir(
    dir: &Path,
    symbols: &[String],
) -> Result<HashMap<String, Vec<PriceBar>>, LoadError> {
    let mut by_symbol = HashMap::new();
    for symbol in symbols {
        if by_symbol.contains_key(symbol) {
            continue;
        }
        let path = dir.join(format!("{symbol}.csv"));
        let bars = if path.is_file() {
            load_bars_csv(&path)?
        } else {
            eprintln!(
                "WARNING: no bar file for {symbol} under {} — replaying an empty stream",
                dir.display()
            );
            Vec::new()
        };
        by_symbol.insert(symbol.clone(), bars);
    }
    Ok(by_symbol)
}

/// Epoch milliseconds or RFC 3339, the two spellings feed exports use.
fn parse_time(raw: &str, line: usize) -> Result<DateTime<Utc>, LoadError> {
    let bad = || LoadError::BadTimestamp {
        value: raw.to_string(),
        line,
    };
    if let Ok(millis) = raw.parse::<i64>() {
        return Utc.timestamp_millis_opt(millis).single().ok_or_else(bad);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| bad())
}
