//! Multi-bar confirmation filter — suppresses single-bar wick noise.
//!
//! A spike that touches a trigger or stop for one bar and retreats is often
//! not a real move. When confirmation is enabled on an order, the crossing
//! only counts once the same condition has held on at least two bars within
//! a bounded lookback window.

use chrono::{DateTime, Duration, Utc};

use crate::domain::PriceBar;

/// Bars on which a condition must hold before it is acted on.
pub const REQUIRED_HITS: u32 = 2;

/// Which price-crossing condition is being confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionType {
    /// Long entry: bar high reaches the level.
    TriggerLong,
    /// Short entry: bar low reaches the level.
    TriggerShort,
    /// Long stop: bar low reaches the level.
    StopLossLong,
    /// Short stop: bar high reaches the level.
    StopLossShort,
}

impl ConditionType {
    /// The crossing predicate — identical to the primary trigger/stop check.
    pub fn is_met(&self, bar: &PriceBar, level: f64) -> bool {
        match self {
            ConditionType::TriggerLong | ConditionType::StopLossShort => bar.high >= level,
            ConditionType::TriggerShort | ConditionType::StopLossLong => bar.low <= level,
        }
    }
}

/// Outcome of a confirmation scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    pub confirmed: bool,
    pub hits: u32,
}

/// Scan backward for repeated occurrences of `condition` at `level`.
///
/// `current` is the bar being evaluated; `prior` is the stream before it,
/// oldest first. The scan walks newest to oldest and stops at the first bar
/// older than `max(current.time − lookback_hours, earliest)`, so hits from a
/// previous session (or from before the order/position existed) never count.
/// Void bars are skipped. `confirmed` once the condition held on at least
/// [`REQUIRED_HITS`] bars in the window.
///
/// Pure: no state is kept between calls, so re-scanning on every crossing is
/// both correct and cheap (windows are minutes to hours of bars).
pub fn confirm(
    condition: ConditionType,
    level: f64,
    current: &PriceBar,
    prior: &[PriceBar],
    earliest: DateTime<Utc>,
    lookback_hours: i64,
) -> Confirmation {
    let cutoff = std::cmp::max(current.time - Duration::hours(lookback_hours), earliest);
    let mut hits = 0u32;
    for bar in std::iter::once(current).chain(prior.iter().rev()) {
        if bar.time < cutoff {
            break;
        }
        if !bar.is_void() && condition.is_met(bar, level) {
            hits += 1;
        }
    }
    Confirmation {
        confirmed: hits >= REQUIRED_HITS,
        hits,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar_at(minutes: i64, high: f64, low: f64) -> PriceBar {
        let start = Utc.with_ymd_and_hms(2025, 4, 7, 4, 0, 0).unwrap();
        PriceBar {
            time: start + Duration::minutes(minutes),
            open: (high + low) / 2.0,
            high,
            low,
            close: (high + low) / 2.0,
            volume: 1_000.0,
        }
    }

    fn earliest() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 7, 0, 0, 0).unwrap()
    }

    #[test]
    fn single_hit_is_not_confirmed() {
        let prior = vec![bar_at(0, 99.0, 98.0), bar_at(5, 99.5, 98.5)];
        let current = bar_at(10, 101.0, 99.0); // first touch of 100
        let result = confirm(
            ConditionType::TriggerLong,
            100.0,
            &current,
            &prior,
            earliest(),
            3,
        );
        assert_eq!(result, Confirmation { confirmed: false, hits: 1 });
    }

    #[test]
    fn second_hit_within_window_confirms() {
        let prior = vec![bar_at(0, 101.0, 99.0), bar_at(5, 99.5, 98.5)];
        let current = bar_at(10, 100.5, 99.0);
        let result = confirm(
            ConditionType::TriggerLong,
            100.0,
            &current,
            &prior,
            earliest(),
            3,
        );
        assert!(result.confirmed);
        assert_eq!(result.hits, 2);
    }

    #[test]
    fn hits_outside_lookback_hours_do_not_count() {
        // Earlier touch sits 4 hours back, outside a 3-hour window.
        let prior = vec![bar_at(-240, 101.0, 99.0), bar_at(5, 99.5, 98.5)];
        let current = bar_at(10, 101.0, 99.0);
        let result = confirm(
            ConditionType::TriggerLong,
            100.0,
            &current,
            &prior,
            earliest(),
            3,
        );
        assert_eq!(result, Confirmation { confirmed: false, hits: 1 });
    }

    #[test]
    fn hits_before_earliest_do_not_count() {
        // Both touches inside lookback hours, but the first predates the
        // earliest-allowed time (e.g. the order did not exist yet).
        let prior = vec![bar_at(0, 101.0, 99.0)];
        let current = bar_at(10, 101.0, 99.0);
        let result = confirm(
            ConditionType::TriggerLong,
            100.0,
            &current,
            &prior,
            bar_at(5, 0.0, 0.0).time,
            3,
        );
        assert_eq!(result, Confirmation { confirmed: false, hits: 1 });
    }

    #[test]
    fn short_trigger_uses_low() {
        let prior = vec![bar_at(0, 101.0, 99.5)];
        let current = bar_at(5, 101.0, 99.0);
        let result = confirm(
            ConditionType::TriggerShort,
            99.5,
            &current,
            &prior,
            earliest(),
            3,
        );
        assert!(result.confirmed);
        assert_eq!(result.hits, 2);
    }

    #[test]
    fn stop_conditions_mirror_trigger_predicates() {
        let bar = bar_at(0, 101.0, 99.0);
        // Long stop at 99.5: low 99 crossed it.
        assert!(ConditionType::StopLossLong.is_met(&bar, 99.5));
        // Short stop at 100.5: high 101 crossed it.
        assert!(ConditionType::StopLossShort.is_met(&bar, 100.5));
        assert!(!ConditionType::StopLossLong.is_met(&bar, 98.5));
        assert!(!ConditionType::StopLossShort.is_met(&bar, 101.5));
    }

    #[test]
    fn void_bars_do_not_count_as_hits() {
        let mut spike = bar_at(0, 101.0, 99.0);
        spike.open = f64::NAN;
        let prior = vec![spike];
        let current = bar_at(5, 101.0, 99.0);
        let result = confirm(
            ConditionType::TriggerLong,
            100.0,
            &current,
            &prior,
            earliest(),
            3,
        );
        assert_eq!(result, Confirmation { confirmed: false, hits: 1 });
    }

    #[test]
    fn empty_prior_counts_only_current() {
        let current = bar_at(0, 101.0, 99.0);
        let result = confirm(
            ConditionType::TriggerLong,
            100.0,
            &current,
            &[],
            earliest(),
            3,
        );
        assert_eq!(result, Confirmation { confirmed: false, hits: 1 });
    }
}
