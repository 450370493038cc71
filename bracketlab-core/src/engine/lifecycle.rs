//! Trade lifecycle state machine — one conditional order, bar by bar.
//!
//! The machine is a pure fold over a bar stream: PENDING_TRIGGER →
//! POSITION_OPEN → CLOSED, consulting the trailing and confirmation policies
//! along the way and appending every observable event to the action log.
//! Historical replay and a live driver share the same [`TradeLifecycle::advance`];
//! only the bar source and the gateway differ.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    ActionKind, ConditionalOrder, Direction, ExitReason, PriceBar, TradeAction, TradeState,
    TradeStatus,
};
use crate::engine::gateway::ExecutionGateway;
use crate::policy::{confirm, tightens, trail, ConditionType, Confirmation, REQUIRED_HITS};

/// Engine settings that are not per-order parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Trailing bars treated as incomplete when force-closing at end of
    /// data: 2 squares off at the third-from-last bar (intraday feeds often
    /// end with a partial candle), 0 uses the last bar.
    pub incomplete_tail_bars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            incomplete_tail_bars: 2,
        }
    }
}

/// State machine for one conditional order.
///
/// Drive it with [`advance`](Self::advance) once per bar in time order (bars
/// before `created_at` and void bars are skipped internally), then
/// [`finish`](Self::finish) when the stream ends. [`run`](crate::engine::run)
/// does both over a complete slice.
///
/// The order's stop is copied into the machine at construction; trailing
/// tightens the copy, never the caller's order.
#[derive(Debug, Clone)]
pub struct TradeLifecycle {
    order: ConditionalOrder,
    config: EngineConfig,
    state: TradeState,
    /// Working stop level; starts at the order's stop and only tightens.
    current_stop: f64,
    /// Time of the first processed bar; elapsed-time origin for trailing.
    run_started_at: Option<DateTime<Utc>>,
}

impl TradeLifecycle {
    pub fn new(order: ConditionalOrder, config: EngineConfig) -> Self {
        let current_stop = order.stop_loss_price;
        Self {
            order,
            config,
            state: TradeState::new(),
            current_stop,
            run_started_at: None,
        }
    }

    pub fn order(&self) -> &ConditionalOrder {
        &self.order
    }

    pub fn state(&self) -> &TradeState {
        &self.state
    }

    /// The stop currently in force (trailing may have tightened it).
    pub fn current_stop(&self) -> f64 {
        self.current_stop
    }

    pub fn into_state(self) -> TradeState {
        self.state
    }

    /// Process one bar.
    ///
    /// `prior` is the stream before `bar`, oldest first — the confirmation
    /// and trailing windows are cut from it. Bars before `created_at` only
    /// ever appear in `prior` (pre-order history widens the windows; it never
    /// drives a transition). No-op once closed.
    pub fn advance(
        &mut self,
        bar: &PriceBar,
        prior: &[PriceBar],
        gateway: &mut dyn ExecutionGateway,
    ) {
        if self.state.status == TradeStatus::Closed
            || bar.is_void()
            || bar.time < self.order.created_at
        {
            return;
        }

        let first_bar = self.run_started_at.is_none();
        if first_bar {
            self.run_started_at = Some(bar.time);
            if self.rejected_below_target(bar, gateway) {
                return;
            }
            self.log(
                self.order.created_at,
                ActionKind::OrderPlaced,
                self.order.trigger_price,
                gateway,
            );
        }

        match self.state.status {
            TradeStatus::PendingTrigger => self.advance_pending(bar, prior, first_bar, gateway),
            TradeStatus::PositionOpen => self.advance_open(bar, prior, gateway),
            TradeStatus::Closed => {}
        }
    }

    /// Apply the end-of-stream rule after the last bar.
    ///
    /// An open position is squared off at the close of the last complete bar
    /// (`incomplete_tail_bars` from the end). A pending order that saw data
    /// expires as `TIMED_OUT`. A run that never saw a processable bar closes
    /// silently with no exit reason.
    pub fn finish(&mut self, bars: &[PriceBar], gateway: &mut dyn ExecutionGateway) {
        match self.state.status {
            TradeStatus::Closed => {}
            TradeStatus::PositionOpen => self.square_off(bars, gateway),
            TradeStatus::PendingTrigger => {
                if self.state.exit_reason.is_some() {
                    // Re-entry run that exited and never re-armed: the last
                    // stop/target exit already describes the outcome.
                    self.state.status = TradeStatus::Closed;
                } else if self.run_started_at.is_some() {
                    if let Some(last) = bars.last() {
                        self.close(last.time, ExitReason::TimedOut);
                        self.log(
                            last.time,
                            ActionKind::Expired,
                            self.order.trigger_price,
                            gateway,
                        );
                    }
                } else {
                    // Never saw a bar at/after created_at: closed, no reason.
                    self.state.status = TradeStatus::Closed;
                }
            }
        }
    }

    // ── Pending phase ────────────────────────────────────────────────

    fn advance_pending(
        &mut self,
        bar: &PriceBar,
        prior: &[PriceBar],
        first_bar: bool,
        gateway: &mut dyn ExecutionGateway,
    ) {
        if let Some(window) = self.order.cancel_after_minutes {
            let elapsed = minutes_between(self.order.created_at, bar.time);
            if window > 0 && elapsed > 0 && elapsed % window == 0 {
                self.close(bar.time, ExitReason::TriggeredCancelled);
                self.log(
                    bar.time,
                    ActionKind::Cancelled,
                    self.order.trigger_price,
                    gateway,
                );
                return;
            }
        }

        let trigger = self.order.trigger_price;
        let crossed = match self.order.direction {
            Direction::Long => bar.high >= trigger,
            Direction::Short => bar.low <= trigger,
        };
        if !crossed {
            return;
        }

        let condition = match self.order.direction {
            Direction::Long => ConditionType::TriggerLong,
            Direction::Short => ConditionType::TriggerShort,
        };
        let (confirmation, required) =
            self.confirm_condition(condition, trigger, bar, prior, self.order.created_at);
        self.log(
            bar.time,
            ActionKind::TriggerConfirmation {
                hits: confirmation.hits,
                required,
            },
            trigger,
            gateway,
        );
        if !confirmation.confirmed {
            // Stays pending; re-evaluated on the next bar the condition holds.
            return;
        }

        // Activated at or before the first available bar: the configured
        // trigger price is not meaningful, use the bar close instead.
        let activation_price = if first_bar { bar.close } else { trigger };
        self.state.status = TradeStatus::PositionOpen;
        self.state.activated_at = Some(bar.time);
        self.state.activation_price = Some(activation_price);
        self.log(bar.time, ActionKind::TriggerHit, activation_price, gateway);
        if let Some(target) = self.order.target_price {
            self.log(bar.time, ActionKind::TargetPlaced, target, gateway);
        }
        self.log(
            bar.time,
            ActionKind::StopLossPlaced,
            self.current_stop,
            gateway,
        );
        // The activating bar is not also evaluated for stop/target.
    }

    fn rejected_below_target(
        &mut self,
        bar: &PriceBar,
        gateway: &mut dyn ExecutionGateway,
    ) -> bool {
        let Some(target) = self.order.target_price else {
            return false;
        };
        if self.order.target_gain(target) >= 0.0 {
            return false;
        }
        self.close(bar.time, ExitReason::RejectedBelowTarget);
        self.log(bar.time, ActionKind::OrderRejected, target, gateway);
        true
    }

    // ── Open phase ───────────────────────────────────────────────────

    fn advance_open(
        &mut self,
        bar: &PriceBar,
        prior: &[PriceBar],
        gateway: &mut dyn ExecutionGateway,
    ) {
        self.maybe_trail_stop(bar, prior, gateway);

        let activation = match self.state.activation_price {
            Some(price) => price,
            None => return, // never None while a position is open
        };
        let quantity = f64::from(self.order.quantity);

        // Stop-loss first: on a bar that crosses both levels the stop wins,
        // unless its confirmation fails — the target needs no confirmation
        // and may still close the trade below.
        let stop = self.current_stop;
        let stop_crossed = match self.order.direction {
            Direction::Long => bar.low <= stop,
            Direction::Short => bar.high >= stop,
        };
        if stop_crossed {
            let condition = match self.order.direction {
                Direction::Long => ConditionType::StopLossLong,
                Direction::Short => ConditionType::StopLossShort,
            };
            let earliest = self.state.activated_at.unwrap_or(self.order.created_at);
            let (confirmation, required) =
                self.confirm_condition(condition, stop, bar, prior, earliest);
            self.log(
                bar.time,
                ActionKind::StopLossConfirmation {
                    hits: confirmation.hits,
                    required,
                },
                stop,
                gateway,
            );
            if confirmation.confirmed {
                self.state.realized_pnl +=
                    (stop - activation) * quantity * self.order.direction.sign();
                self.exit_position(bar.time, ExitReason::StoppedOut);
                self.log(bar.time, ActionKind::StopLossHit, stop, gateway);
                return;
            }
        }

        if let Some(target) = self.order.target_price {
            let target_crossed = match self.order.direction {
                Direction::Long => bar.high >= target,
                Direction::Short => bar.low <= target,
            };
            if target_crossed {
                self.state.realized_pnl += (target - activation).abs() * quantity;
                self.exit_position(bar.time, ExitReason::TargetHit);
                self.log(bar.time, ActionKind::TargetHit, target, gateway);
            }
        }
    }

    fn maybe_trail_stop(
        &mut self,
        bar: &PriceBar,
        prior: &[PriceBar],
        gateway: &mut dyn ExecutionGateway,
    ) {
        if !self.order.trailing.enabled {
            return;
        }
        let every = self.order.trailing.recompute_every_minutes;
        if every <= 0 {
            return;
        }
        let run_start = self.run_started_at.unwrap_or(bar.time);
        if minutes_between(run_start, bar.time) % every != 0 {
            return;
        }

        let window_start = bar.time - Duration::minutes(self.order.trailing.lookback_minutes);
        let from = prior.partition_point(|b| b.time < window_start);
        if let Some(candidate) = trail(self.order.direction, &prior[from..]) {
            if tightens(self.order.direction, self.current_stop, candidate) {
                self.current_stop = candidate;
                self.log(bar.time, ActionKind::StopLossUpdated, candidate, gateway);
            }
        }
    }

    // ── Shared transitions ───────────────────────────────────────────

    fn confirm_condition(
        &self,
        condition: ConditionType,
        level: f64,
        bar: &PriceBar,
        prior: &[PriceBar],
        earliest: DateTime<Utc>,
    ) -> (Confirmation, u32) {
        if self.order.confirmation.enabled {
            let result = confirm(
                condition,
                level,
                bar,
                prior,
                earliest,
                self.order.confirmation.lookback_hours,
            );
            (result, REQUIRED_HITS)
        } else {
            // Disabled: the first hit is enough.
            (
                Confirmation {
                    confirmed: true,
                    hits: 1,
                },
                1,
            )
        }
    }

    /// Stop/target close, honoring the re-entry flag: with `re_enter` the
    /// machine re-arms from pending with the original stop instead of ending
    /// the run. PnL and the action log accumulate either way; `exit_reason`
    /// always records the most recent exit.
    fn exit_position(&mut self, time: DateTime<Utc>, reason: ExitReason) {
        if self.order.re_enter {
            self.state.status = TradeStatus::PendingTrigger;
            self.state.activated_at = None;
            self.state.activation_price = None;
            self.state.closed_at = Some(time);
            self.state.exit_reason = Some(reason);
            self.current_stop = self.order.stop_loss_price;
        } else {
            self.close(time, reason);
        }
    }

    fn square_off(&mut self, bars: &[PriceBar], gateway: &mut dyn ExecutionGateway) {
        let activation = self.state.activation_price.unwrap_or(self.current_stop);
        let quantity = f64::from(self.order.quantity);
        match self.square_off_bar(bars) {
            Some(bar) => {
                let (time, exit_price) = (bar.time, bar.close);
                self.state.realized_pnl +=
                    (exit_price - activation) * quantity * self.order.direction.sign();
                self.close(time, ExitReason::SquaredOffEndOfData);
                self.log(time, ActionKind::SquaredOff, exit_price, gateway);
            }
            None => {
                // No usable bar at/after activation; close flat.
                let time = self.state.activated_at.unwrap_or(self.order.created_at);
                self.close(time, ExitReason::SquaredOffEndOfData);
                self.log(time, ActionKind::SquaredOff, activation, gateway);
            }
        }
    }

    /// The bar an open position is squared off against: the last bar outside
    /// the incomplete tail, falling back into the tail when the position
    /// opened there. Must be non-void and not precede activation.
    fn square_off_bar<'a>(&self, bars: &'a [PriceBar]) -> Option<&'a PriceBar> {
        let activated_at = self.state.activated_at?;
        if bars.is_empty() {
            return None;
        }
        let cut = bars.len().saturating_sub(1 + self.config.incomplete_tail_bars);
        let usable = |b: &&PriceBar| !b.is_void() && b.time >= activated_at;
        bars[..=cut]
            .iter()
            .rev()
            .find(usable)
            .or_else(|| bars[cut + 1..].iter().find(usable))
    }

    fn close(&mut self, time: DateTime<Utc>, reason: ExitReason) {
        self.state.status = TradeStatus::Closed;
        self.state.closed_at = Some(time);
        self.state.exit_reason = Some(reason);
    }

    fn log(
        &mut self,
        time: DateTime<Utc>,
        kind: ActionKind,
        price: f64,
        gateway: &mut dyn ExecutionGateway,
    ) {
        let action = TradeAction { time, kind, price };
        self.state.actions.push(action);
        gateway.on_transition(&self.order, &self.state, &action);
    }
}

/// Whole elapsed minutes from `start` to `end`.
fn minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start).num_minutes()
}
