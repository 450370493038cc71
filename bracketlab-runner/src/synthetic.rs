//! Deterministic synthetic bars for demos and offline smoke runs.
//!
//! A simple random walk. The per-symbol RNG seed is derived from a master
//! seed plus the symbol name via BLAKE3, so the same (seed, symbol) pair
//! always walks the same path regardless of generation order, and different
//! symbols diverge immediately. Clearly fake data — callers are expected to
//! say so when they fall back to it.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use bracketlab_core::domain::PriceBar;

/// Hash-derived sub-seed for one symbol's walk.
fn sub_seed(seed: u64, symbol: &str) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&seed.to_le_bytes());
    hasher.update(symbol.as_bytes());
    let hash = hasher.finalize();
    u64::from_le_bytes(hash.as_bytes()[..8].try_into().expect("8-byte prefix"))
}

/// Generate `count` bars at `interval_minutes` spacing starting at `start`.
pub fn synthetic_bars(
    symbol: &str,
    start: DateTime<Utc>,
    count: usize,
    interval_minutes: i64,
    seed: u64,
) -> Vec<PriceBar> {
    let mut rng = StdRng::seed_from_u64(sub_seed(seed, symbol));

    let mut price = 100.0_f64;
    (0..count)
        .map(|i| {
            let bar_return: f64 = rng.gen_range(-0.01..0.01);
            let open = price;
            let close = price * (1.0 + bar_return);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.003));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.003));
            let volume = rng.gen_range(10_000.0..500_000.0);
            price = close;

            PriceBar {
                time: start + Duration::minutes(i as i64 * interval_minutes),
                open,
                high,
                low,
                close,
                volume,
            }
        })
        .collect()
}
