//! Order construction — bracket prices and risk-based sizing.
//!
//! Everything strategy-specific about turning a scanner setup into a
//! [`ConditionalOrder`] lives here, outside the engine: the lifecycle
//! machine only ever sees finished orders.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ConditionalOrder, Direction};

/// The setup candle a bracket is built around (a scanner's signal bar).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SetupCandle {
    pub high: f64,
    pub low: f64,
}

impl SetupCandle {
    pub fn length(&self) -> f64 {
        self.high - self.low
    }
}

/// Target and stop distances as multiples of the setup candle length,
/// conventionally written `"target:stop"` (e.g. `"2:1"`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BracketRatio {
    pub target_multiple: f64,
    pub stop_multiple: f64,
}

impl BracketRatio {
    pub fn new(target_multiple: f64, stop_multiple: f64) -> Self {
        Self {
            target_multiple,
            stop_multiple,
        }
    }
}

impl Default for BracketRatio {
    fn default() -> Self {
        Self::new(2.0, 1.0)
    }
}

impl FromStr for BracketRatio {
    type Err = RatioParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (target, stop) = s
            .split_once(':')
            .ok_or_else(|| RatioParseError(s.to_string()))?;
        let target_multiple: f64 = target
            .trim()
            .parse()
            .map_err(|_| RatioParseError(s.to_string()))?;
        let stop_multiple: f64 = stop
            .trim()
            .parse()
            .map_err(|_| RatioParseError(s.to_string()))?;
        if target_multiple <= 0.0 || stop_multiple <= 0.0 {
            return Err(RatioParseError(s.to_string()));
        }
        Ok(Self::new(target_multiple, stop_multiple))
    }
}

/// Raised for ratios that are not two positive numbers around a colon.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("bracket ratio must look like \"2:1\", got {0:?}")]
pub struct RatioParseError(pub String);

/// Trigger, stop and target for one bracket, already tick-rounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BracketPrices {
    pub trigger: f64,
    pub stop_loss: f64,
    pub target: f64,
}

/// Price-tiered trigger padding: cheap symbols break levels by paise,
/// expensive ones by rupees, so the pad scales with price.
pub fn trigger_padding(price: f64) -> f64 {
    if price < 20.0 {
        0.1
    } else if price < 50.0 {
        0.2
    } else if price < 100.0 {
        0.3
    } else if price < 300.0 {
        0.5
    } else {
        1.0
    }
}

/// Build bracket levels from a setup candle.
///
/// The trigger sits one pad beyond the candle extreme in the trade
/// direction; the stop sits `stop_multiple − 1` candle lengths beyond the
/// opposite extreme; the target sits `target_multiple` candle lengths past
/// the trigger side. All three are rounded to the 0.1 tick.
pub fn bracket_prices(
    candle: SetupCandle,
    direction: Direction,
    ratio: BracketRatio,
) -> BracketPrices {
    let padding = trigger_padding(candle.high);
    let length = candle.length();
    let (trigger, stop_loss, target) = match direction {
        Direction::Long => (
            candle.high + padding,
            candle.low - length * (ratio.stop_multiple - 1.0) - padding,
            candle.high + length * ratio.target_multiple + padding,
        ),
        Direction::Short => (
            candle.low - padding,
            candle.high + length * (ratio.stop_multiple - 1.0) + padding,
            candle.low - length * ratio.target_multiple - padding,
        ),
    };
    BracketPrices {
        trigger: round_tick(trigger),
        stop_loss: round_tick(stop_loss),
        target: round_tick(target),
    }
}

/// Shares sized so a full stop-out loses about `risk_amount`.
///
/// Rounds up (a one-share position even when the stop distance exceeds the
/// risk budget); zero only for a degenerate zero-distance bracket or a
/// non-positive budget.
pub fn risk_quantity(risk_amount: f64, trigger: f64, stop_loss: f64) -> u32 {
    let per_share = (trigger - stop_loss).abs();
    if per_share == 0.0 || risk_amount <= 0.0 {
        return 0;
    }
    (risk_amount / per_share).ceil() as u32
}

/// Assemble a complete order from a setup candle.
///
/// Trailing, confirmation, cancellation and re-entry stay at their defaults;
/// callers flip those per strategy.
pub fn build_order(
    symbol: &str,
    direction: Direction,
    candle: SetupCandle,
    ratio: BracketRatio,
    risk_amount: f64,
    created_at: DateTime<Utc>,
) -> ConditionalOrder {
    let prices = bracket_prices(candle, direction, ratio);
    ConditionalOrder {
        symbol: symbol.to_string(),
        direction,
        trigger_price: prices.trigger,
        stop_loss_price: prices.stop_loss,
        target_price: Some(prices.target),
        quantity: risk_quantity(risk_amount, prices.trigger, prices.stop_loss),
        created_at,
        cancel_after_minutes: None,
        trailing: Default::default(),
        confirmation: Default::default(),
        re_enter: false,
    }
}

fn round_tick(price: f64) -> f64 {
    (price * 10.0).round() / 10.0
}
