//! Stop-loss trailing policy — candidate stop from recent price extremes.

use crate::domain::{Direction, PriceBar};

/// Propose a stop level from a lookback window of bars.
///
/// Long: the minimum low across the window. Short: the maximum high. Void
/// bars are ignored; an empty or all-void window yields `None`. This function
/// never looks at the current stop — the caller applies the candidate only if
/// it tightens (see [`tightens`]) — so it has no side effects and is safe to
/// call redundantly.
pub fn trail(direction: Direction, window: &[PriceBar]) -> Option<f64> {
    let mut candidate: Option<f64> = None;
    for bar in window.iter().filter(|b| !b.is_void()) {
        let extreme = match direction {
            Direction::Long => bar.low,
            Direction::Short => bar.high,
        };
        candidate = Some(match candidate {
            None => extreme,
            Some(current) => match direction {
                Direction::Long => current.min(extreme),
                Direction::Short => current.max(extreme),
            },
        });
    }
    candidate
}

/// Ratchet rule: does `candidate` tighten `current`?
///
/// Long stops only rise, short stops only fall. Equal levels do not count as
/// tightening, so a flat market never produces stop-update noise.
pub fn tightens(direction: Direction, current: f64, candidate: f64) -> bool {
    match direction {
        Direction::Long => candidate > current,
        Direction::Short => candidate < current,
    }
}
