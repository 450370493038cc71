//! Parallel replay of an order batch.
//!
//! Each order replays independently against its symbol's bars, so the batch
//! is embarrassingly parallel: orders fan out over a rayon pool and come
//! back in input order. Parallelism is tunable per session — sequential for
//! debugging, a dedicated pool when the replay shares a box with other work.

use std::collections::HashMap;

use rayon::prelude::*;

use bracketlab_core::domain::{ConditionalOrder, PriceBar};
use bracketlab_core::engine::{run, EngineConfig};

use crate::report::ReplayOutcome;

/// Batch executor for a session's orders.
#[derive(Debug, Clone)]
pub struct ReplayBatch {
    engine: EngineConfig,
    jobs: Option<usize>,
}

impl ReplayBatch {
    pub fn new(engine: EngineConfig) -> Self {
        Self { engine, jobs: None }
    }

    /// Worker threads: `None` = the shared rayon pool, `Some(1)` =
    /// sequential, `Some(n)` = a dedicated n-thread pool.
    pub fn with_jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }

    /// Replay every order against its symbol's bars.
    ///
    /// Orders whose symbol has no entry in `bars` replay an empty stream
    /// and close with no exit reason. A malformed order replays like any
    /// other — a wrong-side target closes as rejected on its first bar —
    /// so one bad entry never stops the batch. Outcomes come back in
    /// order-list order regardless of parallelism.
    pub fn run(
        &self,
        orders: &[ConditionalOrder],
        bars: &HashMap<String, Vec<PriceBar>>,
    ) -> Vec<ReplayOutcome> {
        self.run_with_progress(orders, bars, |_, _, _| {})
    }

    /// [`run`](Self::run), invoking `progress` as each replay completes with
    /// (index, total, outcome). Under a pool the calls arrive out of order.
    pub fn run_with_progress<F>(
        &self,
        orders: &[ConditionalOrder],
        bars: &HashMap<String, Vec<PriceBar>>,
        progress: F,
    ) -> Vec<ReplayOutcome>
    where
        F: Fn(usize, usize, &ReplayOutcome) + Send + Sync,
    {
        let total = orders.len();
        let replay = |(idx, order): (usize, &ConditionalOrder)| -> ReplayOutcome {
            let symbol_bars = bars
                .get(&order.symbol)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let state = run(order, symbol_bars, &self.engine);
            let outcome = ReplayOutcome {
                symbol: order.symbol.clone(),
                order: order.clone(),
                state,
            };
            progress(idx, total, &outcome);
            outcome
        };

        match self.jobs {
            Some(1) => orders.iter().enumerate().map(replay).collect(),
            Some(n) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .expect("failed to build Rayon thread pool");
                pool.install(|| orders.par_iter().enumerate().map(replay).collect())
            }
            None => orders.par_iter().enumerate().map(replay).collect(),
        }
    }
}
