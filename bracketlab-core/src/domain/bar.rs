//! PriceBar — the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV bar for a single instrument.
///
/// `time` is the bar's opening instant. Resolution (1/5/15 minutes, ...) is
/// chosen by the caller; the engine is resolution-agnostic but assumes all
/// bars in one stream share a resolution and arrive in strictly increasing
/// time order. A missing OHLC field is represented as NaN (void bar); the
/// engine skips void bars rather than treating them as errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBar {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// Returns true if any OHLC field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, both enclose open and close.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }
}
