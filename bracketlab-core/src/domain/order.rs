//! ConditionalOrder — the engine's primary entity, plus its validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Side of a conditional order.
///
/// Scanner exports spell these `BULLISH`/`BEARISH`; both spellings
/// deserialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    #[serde(alias = "BULLISH")]
    Long,
    #[serde(alias = "BEARISH")]
    Short,
}

impl Direction {
    /// Sign applied to `(exit − entry)` when realizing PnL.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

/// Trailing stop settings.
///
/// While a position is open, the stop is recomputed every
/// `recompute_every_minutes` (measured from run start) from the price
/// extremes of the previous `lookback_minutes`, and applied only if it
/// tightens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailingConfig {
    pub enabled: bool,
    pub recompute_every_minutes: i64,
    pub lookback_minutes: i64,
}

impl Default for TrailingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            recompute_every_minutes: 15,
            lookback_minutes: 30,
        }
    }
}

/// Multi-bar confirmation settings (anti-whipsaw filter).
///
/// When enabled, a trigger or stop crossing only counts once the same
/// condition has held on a second bar within `lookback_hours`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationConfig {
    pub enabled: bool,
    pub lookback_hours: i64,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            lookback_hours: 3,
        }
    }
}

/// A conditional bracket order: trigger in, stop out, optional target.
///
/// Immutable input to the engine; the lifecycle machine keeps its own
/// working copy of the stop while trailing. `created_at` is the placement
/// instant — bars before it are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalOrder {
    // ── Identity ──
    pub symbol: String,
    pub direction: Direction,

    // ── Price levels ──
    pub trigger_price: f64,
    pub stop_loss_price: f64,
    /// None means no fixed target: hold until stopped or squared off.
    #[serde(default)]
    pub target_price: Option<f64>,

    // ── Size ──
    pub quantity: u32,

    // ── Timing ──
    pub created_at: DateTime<Utc>,
    /// Cancel an un-activated order when the elapsed minutes since
    /// `created_at` reach a positive exact multiple of this (modular
    /// boundary, not "at least").
    #[serde(default)]
    pub cancel_after_minutes: Option<i64>,

    // ── Policies ──
    #[serde(default)]
    pub trailing: TrailingConfig,
    #[serde(default)]
    pub confirmation: ConfirmationConfig,
    /// Restart from pending after a stop/target close instead of ending
    /// the run. Off by default.
    #[serde(default)]
    pub re_enter: bool,
}

impl ConditionalOrder {
    /// Distance from trigger to target in the profitable direction.
    ///
    /// Negative means the target sits on the wrong side of the trigger —
    /// the configuration the engine rejects with `REJECTED_BELOW_TARGET`.
    pub fn target_gain(&self, target: f64) -> f64 {
        match self.direction {
            Direction::Long => target - self.trigger_price,
            Direction::Short => self.trigger_price - target,
        }
    }

    /// Validate parameters before a run.
    ///
    /// The engine tolerates a bad order (it closes the run as rejected so a
    /// batch can continue); callers that want to fail fast run this first.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.symbol.trim().is_empty() {
            return Err(OrderError::EmptySymbol);
        }
        if !(self.trigger_price > 0.0) {
            return Err(OrderError::NonPositiveTrigger(self.trigger_price));
        }
        if !(self.stop_loss_price > 0.0) {
            return Err(OrderError::NonPositiveStopLoss(self.stop_loss_price));
        }
        if self.quantity == 0 {
            return Err(OrderError::ZeroQuantity);
        }
        if let Some(target) = self.target_price {
            if !(target > 0.0) {
                return Err(OrderError::NonPositiveTarget(target));
            }
            if self.target_gain(target) < 0.0 {
                return Err(OrderError::TargetBehindTrigger {
                    direction: self.direction,
                    trigger: self.trigger_price,
                    target,
                });
            }
        }
        if let Some(minutes) = self.cancel_after_minutes {
            if minutes <= 0 {
                return Err(OrderError::NonPositiveCancelWindow(minutes));
            }
        }
        if self.trailing.enabled
            && (self.trailing.recompute_every_minutes <= 0 || self.trailing.lookback_minutes <= 0)
        {
            return Err(OrderError::BadTrailingIntervals);
        }
        if self.confirmation.enabled && self.confirmation.lookback_hours <= 0 {
            return Err(OrderError::BadConfirmationLookback);
        }
        Ok(())
    }
}

/// Errors from order validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrderError {
    #[error("symbol is empty")]
    EmptySymbol,

    #[error("trigger price must be positive, got {0}")]
    NonPositiveTrigger(f64),

    #[error("stop-loss price must be positive, got {0}")]
    NonPositiveStopLoss(f64),

    #[error("target price must be positive, got {0}")]
    NonPositiveTarget(f64),

    #[error("quantity must be positive")]
    ZeroQuantity,

    #[error("target {target} is on the wrong side of trigger {trigger} for {direction:?}")]
    TargetBehindTrigger {
        direction: Direction,
        trigger: f64,
        target: f64,
    },

    #[error("cancel_after_minutes must be positive, got {0}")]
    NonPositiveCancelWindow(i64),

    #[error("trailing intervals must be positive when trailing is enabled")]
    BadTrailingIntervals,

    #[error("confirmation lookback must be positive when confirmation is enabled")]
    BadConfirmationLookback,
}
