//! Property tests for lifecycle invariants.
//!
//! Uses proptest to verify:
//! 1. Determinism — the same order over the same bars yields the same state
//! 2. Terminal state — every run ends Closed with a time-ordered action log
//! 3. Exit reasons — any processable stream produces one, only the empty
//!    stream produces none
//! 4. Trailing monotonicity — logged stop updates only ever tighten
//! 5. Confirmation — a single isolated cross never opens a position

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use bracketlab_core::domain::{
    ActionKind, ConditionalOrder, ConfirmationConfig, Direction, ExitReason, PriceBar,
    TradeStatus, TrailingConfig,
};
use bracketlab_core::engine::{run, EngineConfig};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 7, 3, 50, 0).unwrap()
}

/// Helper: five-minute random-walk bars, one unit of intrabar range.
fn walk_bars(start: f64, deltas: &[f64]) -> Vec<PriceBar> {
    let mut close = start;
    deltas
        .iter()
        .enumerate()
        .map(|(i, delta)| {
            close += delta;
            PriceBar {
                time: t0() + Duration::minutes(i as i64 * 5),
                open: close - delta,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000.0,
            }
        })
        .collect()
}

fn order(direction: Direction, trigger: f64, stop: f64, target: Option<f64>) -> ConditionalOrder {
    ConditionalOrder {
        symbol: "SBIN".into(),
        direction,
        trigger_price: trigger,
        stop_loss_price: stop,
        target_price: target,
        quantity: 10,
        created_at: t0(),
        cancel_after_minutes: None,
        trailing: Default::default(),
        confirmation: Default::default(),
        re_enter: false,
    }
}

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_deltas() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec((-20i32..=20).prop_map(|d| f64::from(d) / 10.0), 4..40)
}

fn arb_direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Long), Just(Direction::Short)]
}

// ── 1. Determinism ───────────────────────────────────────────────────

proptest! {
    /// The fold has no hidden state: two runs over identical input agree
    /// field for field, action log included.
    #[test]
    fn same_input_same_state(
        deltas in arb_deltas(),
        direction in arb_direction(),
        trigger_offset in -3i32..=3,
    ) {
        let bars = walk_bars(100.0, &deltas);
        let trigger = 100.0 + f64::from(trigger_offset);
        let (stop, target) = match direction {
            Direction::Long => (trigger - 5.0, Some(trigger + 8.0)),
            Direction::Short => (trigger + 5.0, Some(trigger - 8.0)),
        };
        let order = order(direction, trigger, stop, target);
        let config = EngineConfig::default();

        let first = run(&order, &bars, &config);
        let second = run(&order, &bars, &config);
        prop_assert_eq!(first, second);
    }
}

// ── 2. Terminal state and log ordering ───────────────────────────────

proptest! {
    /// Every run ends Closed, and the action log never goes backwards in
    /// time (the placement entry is backdated to order creation, which is
    /// never after the first bar).
    #[test]
    fn run_always_terminates_closed(
        deltas in arb_deltas(),
        direction in arb_direction(),
    ) {
        let bars = walk_bars(100.0, &deltas);
        let (stop, target) = match direction {
            Direction::Long => (95.0, Some(108.0)),
            Direction::Short => (105.0, Some(92.0)),
        };
        let state = run(&order(direction, 100.0, stop, target), &bars, &EngineConfig::default());

        prop_assert_eq!(state.status, TradeStatus::Closed);
        for pair in state.actions.windows(2) {
            prop_assert!(
                pair[0].time <= pair[1].time,
                "action log went backwards: {:?} then {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    /// A target exit on a single-trade run never loses money; the realized
    /// figure is exactly the target distance times the share count.
    #[test]
    fn target_exits_are_never_losses(
        deltas in arb_deltas(),
        direction in arb_direction(),
    ) {
        let bars = walk_bars(100.0, &deltas);
        let (stop, target) = match direction {
            Direction::Long => (95.0, 108.0),
            Direction::Short => (105.0, 92.0),
        };
        let state = run(
            &order(direction, 100.0, stop, Some(target)),
            &bars,
            &EngineConfig::default(),
        );

        if state.exit_reason == Some(ExitReason::TargetHit) {
            // First-bar activations fill at the bar close, so measure from
            // the recorded activation price rather than the trigger.
            let activation = state.activation_price.unwrap();
            prop_assert!(state.realized_pnl >= 0.0);
            prop_assert_eq!(state.realized_pnl, (target - activation).abs() * 10.0);
        }
    }
}

// ── 3. Exit reason totality ──────────────────────────────────────────

proptest! {
    /// Any run that saw at least one processable bar reports how it ended;
    /// only the degenerate empty stream closes without a reason.
    #[test]
    fn nonempty_streams_always_explain_the_exit(
        deltas in arb_deltas(),
        direction in arb_direction(),
    ) {
        let bars = walk_bars(100.0, &deltas);
        let (stop, target) = match direction {
            Direction::Long => (90.0, Some(115.0)),
            Direction::Short => (110.0, Some(85.0)),
        };
        let state = run(&order(direction, 100.0, stop, target), &bars, &EngineConfig::default());
        prop_assert!(state.exit_reason.is_some());

        let empty = run(&order(direction, 100.0, stop, target), &[], &EngineConfig::default());
        prop_assert_eq!(empty.exit_reason, None);
    }
}

// ── 4. Trailing monotonicity ─────────────────────────────────────────

proptest! {
    /// Through the real engine path, logged stop updates form a strictly
    /// tightening sequence starting above the configured stop.
    #[test]
    fn trailed_stops_only_tighten(deltas in arb_deltas()) {
        let bars = walk_bars(100.0, &deltas);
        // Stop parked far below so the walk cannot cross it; every update in
        // the log then comes from the recompute alone.
        let mut order = order(Direction::Long, 100.0, 20.0, None);
        order.trailing = TrailingConfig {
            enabled: true,
            recompute_every_minutes: 15,
            lookback_minutes: 30,
        };
        let state = run(&order, &bars, &EngineConfig::default());

        let updates: Vec<f64> = state
            .actions
            .iter()
            .filter(|a| a.kind == ActionKind::StopLossUpdated)
            .map(|a| a.price)
            .collect();
        let mut last = 20.0;
        for level in updates {
            prop_assert!(
                level > last,
                "stop update to {level} does not tighten past {last}"
            );
            last = level;
        }
    }
}

// ── 5. Confirmation suppression ──────────────────────────────────────

proptest! {
    /// With confirmation on, one isolated cross is noise: the trade never
    /// opens and the run expires pending.
    #[test]
    fn single_cross_never_activates(
        quiet_before in 1usize..10,
        quiet_after in 1usize..10,
    ) {
        let mut deltas = vec![0.0; quiet_before];
        deltas.push(3.0); // the one bar that reaches the trigger
        deltas.push(-3.0);
        deltas.extend(std::iter::repeat(0.0).take(quiet_after));
        // Walk sits at 98: high 99 stays under the 100 trigger except for
        // the single +3 excursion.
        let bars = walk_bars(98.0, &deltas);

        let mut order = order(Direction::Long, 100.0, 90.0, Some(115.0));
        order.confirmation = ConfirmationConfig {
            enabled: true,
            lookback_hours: 3,
        };
        let state = run(&order, &bars, &EngineConfig::default());

        prop_assert!(!state.ever_activated());
        prop_assert_eq!(state.exit_reason, Some(ExitReason::TimedOut));
        let confirmations = state
            .actions
            .iter()
            .filter(|a| matches!(a.kind, ActionKind::TriggerConfirmation { .. }))
            .count();
        prop_assert_eq!(confirmations, 1);
    }
}
