//! Replay outcomes and session-level summaries.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bracketlab_core::domain::{ConditionalOrder, ExitReason, TradeState};

/// One order's complete replay: what went in and how it ended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplayOutcome {
    pub symbol: String,
    pub order: ConditionalOrder,
    pub state: TradeState,
}

impl ReplayOutcome {
    /// True if the replay ever held a position.
    pub fn executed(&self) -> bool {
        self.state.ever_activated()
    }
}

/// How the session's replays ended, one counter per exit reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitBreakdown {
    pub cancelled: usize,
    pub stopped_out: usize,
    pub target_hit: usize,
    pub timed_out: usize,
    pub squared_off: usize,
    pub rejected: usize,
    /// Replays that saw no usable bars at all.
    pub no_data: usize,
}

impl ExitBreakdown {
    fn record(&mut self, reason: Option<ExitReason>) {
        match reason {
            Some(ExitReason::TriggeredCancelled) => self.cancelled += 1,
            Some(ExitReason::StoppedOut) => self.stopped_out += 1,
            Some(ExitReason::TargetHit) => self.target_hit += 1,
            Some(ExitReason::TimedOut) => self.timed_out += 1,
            Some(ExitReason::SquaredOffEndOfData) => self.squared_off += 1,
            Some(ExitReason::RejectedBelowTarget) => self.rejected += 1,
            None => self.no_data += 1,
        }
    }
}

/// Aggregate figures over a set of replay outcomes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplaySummary {
    /// Total replays, executed or not.
    pub replays: usize,
    /// Replays that held a position at some point.
    pub executed: usize,
    pub winners: usize,
    pub losers: usize,
    pub total_pnl: f64,
    pub exits: ExitBreakdown,
}

impl ReplaySummary {
    pub fn from_outcomes<'a, I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = &'a ReplayOutcome>,
    {
        let mut summary = Self::default();
        for outcome in outcomes {
            summary.replays += 1;
            summary.exits.record(outcome.state.exit_reason);
            if outcome.executed() {
                summary.executed += 1;
                summary.total_pnl += outcome.state.realized_pnl;
                if outcome.state.realized_pnl > 0.0 {
                    summary.winners += 1;
                } else if outcome.state.realized_pnl < 0.0 {
                    summary.losers += 1;
                }
                // Break-even trades count as executed but neither side.
            }
        }
        summary
    }

    /// Winners over executed trades, 0 when nothing executed.
    pub fn win_rate(&self) -> f64 {
        if self.executed == 0 {
            return 0.0;
        }
        self.winners as f64 / self.executed as f64
    }
}

/// One live bracket per symbol: when several scans raise orders on the same
/// symbol, the earliest activation wins. What happens to later replays
/// depends on their order's re-entry flag, mirroring how a live book treats
/// a second signal: a one-shot bracket (`re_enter` off) is never placed
/// again that session, while a re-entering bracket may stack back to back
/// and is dropped only when its lifetime overlaps a kept one. Replays that
/// never executed pass through untouched, as does input order.
pub fn dedupe_overlapping(outcomes: &[ReplayOutcome]) -> Vec<ReplayOutcome> {
    let mut by_symbol: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, outcome) in outcomes.iter().enumerate() {
        if outcome.executed() {
            by_symbol.entry(outcome.symbol.as_str()).or_default().push(i);
        }
    }

    let mut dropped = vec![false; outcomes.len()];
    for indices in by_symbol.values() {
        let mut sorted = indices.clone();
        sorted.sort_by_key(|&i| outcomes[i].state.first_activated_at());

        let mut kept_any = false;
        let mut open_until: Option<DateTime<Utc>> = None;
        for &i in &sorted {
            let outcome = &outcomes[i];
            let (Some(start), Some(end)) =
                (outcome.state.first_activated_at(), outcome.state.closed_at)
            else {
                continue;
            };
            let keep = if !kept_any {
                true
            } else if outcome.order.re_enter {
                !open_until.is_some_and(|until| start < until)
            } else {
                false
            };
            if keep {
                kept_any = true;
                open_until = Some(end);
            } else {
                dropped[i] = true;
            }
        }
    }

    outcomes
        .iter()
        .enumerate()
        .filter(|(i, _)| !dropped[*i])
        .map(|(_, outcome)| outcome.clone())
        .collect()
}

/// Everything one session replay produced, as a single serializable artifact.
///
/// The `replay_id` ties the report back to the exact session config that
/// produced it, so downstream tooling can cache and compare by content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionReport {
    pub replay_id: String,
    pub summary: ReplaySummary,
    pub outcomes: Vec<ReplayOutcome>,
}

impl SessionReport {
    pub fn new(replay_id: String, outcomes: Vec<ReplayOutcome>) -> Self {
        let summary = ReplaySummary::from_outcomes(&outcomes);
        Self {
            replay_id,
            summary,
            outcomes,
        }
    }
}
