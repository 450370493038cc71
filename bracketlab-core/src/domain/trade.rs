//! TradeState — one order's lifecycle state and chronological action log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle phase of a conditional order.
///
/// Moves PENDING_TRIGGER → POSITION_OPEN → CLOSED, never backward (re-entry,
/// an explicit opt-in, restarts a run from PENDING_TRIGGER before it ends).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    PendingTrigger,
    PositionOpen,
    Closed,
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    /// The cancel-after window elapsed before the order activated.
    /// The *order* is cancelled here, not a position.
    TriggeredCancelled,
    /// Stop-loss crossed (and confirmed) while the position was open.
    StoppedOut,
    /// Target crossed while the position was open.
    TargetHit,
    /// The bar stream ran out before the order ever activated.
    TimedOut,
    /// Forced close of an open position at the last complete bar.
    SquaredOffEndOfData,
    /// Target on the wrong side of the trigger; the order never activates.
    RejectedBelowTarget,
}

/// One observable lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    OrderPlaced,
    OrderRejected,
    /// Trigger crossing observed; `hits` of `required` confirming bars seen.
    TriggerConfirmation { hits: u32, required: u32 },
    /// Position opened. The action price is the activation price.
    TriggerHit,
    TargetPlaced,
    StopLossPlaced,
    /// Trailing moved the stop. The action price is the new stop.
    StopLossUpdated,
    /// Stop crossing observed; `hits` of `required` confirming bars seen.
    StopLossConfirmation { hits: u32, required: u32 },
    StopLossHit,
    TargetHit,
    Cancelled,
    SquaredOff,
    /// Pending order ran out of data without activating.
    Expired,
}

/// Action-log entry: what happened, when, at which price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeAction {
    pub time: DateTime<Utc>,
    pub kind: ActionKind,
    pub price: f64,
}

/// Full lifecycle state of one conditional order.
///
/// Mutated only by the lifecycle machine. A completed run always yields a
/// fully-populated state: even an order that never activates closes with a
/// reason (a run that never processed a bar is the one case with
/// `exit_reason = None`).
/// With re-entry enabled, `closed_at`/`exit_reason` track the most recent
/// exit while the machine re-arms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeState {
    pub status: TradeStatus,

    // ── Activation ──
    pub activated_at: Option<DateTime<Utc>>,
    pub activation_price: Option<f64>,

    // ── Close ──
    pub closed_at: Option<DateTime<Utc>>,
    pub exit_reason: Option<ExitReason>,

    // ── Outcome ──
    /// 0 while pending; accumulates across re-entries.
    pub realized_pnl: f64,
    /// Append-only, time-ordered, one entry per observable event.
    pub actions: Vec<TradeAction>,
}

impl TradeState {
    pub fn new() -> Self {
        Self {
            status: TradeStatus::PendingTrigger,
            activated_at: None,
            activation_price: None,
            closed_at: None,
            exit_reason: None,
            realized_pnl: 0.0,
            actions: Vec::new(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.status == TradeStatus::Closed
    }

    /// True if the order opened a position at any point in the run
    /// (survives the re-entry reset of the activation fields).
    pub fn ever_activated(&self) -> bool {
        self.first_activated_at().is_some()
    }

    /// Time of the first activation, recovered from the action log so it
    /// survives the re-entry reset of the activation fields.
    pub fn first_activated_at(&self) -> Option<DateTime<Utc>> {
        self.actions
            .iter()
            .find(|a| matches!(a.kind, ActionKind::TriggerHit))
            .map(|a| a.time)
    }

    pub fn is_winner(&self) -> bool {
        self.realized_pnl > 0.0
    }
}

impl Default for TradeState {
    fn default() -> Self {
        Self::new()
    }
}
