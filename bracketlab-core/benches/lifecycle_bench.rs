//! Criterion benchmarks for BracketLab hot paths.
//!
//! Benchmarks:
//! 1. Bare lifecycle fold (trigger → hold → square-off, no policies)
//! 2. Policy-heavy fold (trailing recompute + two-hit confirmation)
//! 3. Policy primitives in isolation (window extreme, confirmation scan)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use bracketlab_core::domain::{
    ConditionalOrder, ConfirmationConfig, Direction, PriceBar, TrailingConfig,
};
use bracketlab_core::engine::{run, EngineConfig};
use bracketlab_core::policy::{confirm, trail, ConditionType};
use chrono::{DateTime, Duration, TimeZone, Utc};

// ── Helpers ──────────────────────────────────────────────────────────

fn session_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 7, 3, 50, 0).unwrap()
}

fn make_bars(n: usize) -> Vec<PriceBar> {
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            PriceBar {
                time: session_start() + Duration::minutes(i as i64 * 5),
                open: close - 0.3,
                high: close + 1.5,
                low: close - 1.5,
                close,
                volume: 1_000_000.0 + (i % 500) as f64,
            }
        })
        .collect()
}

fn make_order() -> ConditionalOrder {
    ConditionalOrder {
        symbol: "BENCH".to_string(),
        direction: Direction::Long,
        trigger_price: 105.0,
        stop_loss_price: 85.0,
        target_price: Some(150.0), // out of the wave's reach, holds to the end
        quantity: 10,
        created_at: session_start(),
        cancel_after_minutes: None,
        trailing: Default::default(),
        confirmation: Default::default(),
        re_enter: false,
    }
}

// ── 1. Bare lifecycle fold ───────────────────────────────────────────

fn bench_lifecycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("lifecycle_fold");
    let config = EngineConfig::default();

    for &bar_count in &[75, 750, 7500] {
        let bars = make_bars(bar_count);
        let order = make_order();

        group.bench_with_input(BenchmarkId::new("plain", bar_count), &bar_count, |b, _| {
            b.iter(|| run(black_box(&order), black_box(&bars), black_box(&config)));
        });
    }

    group.finish();
}

// ── 2. Policy-heavy fold ─────────────────────────────────────────────

fn bench_lifecycle_with_policies(c: &mut Criterion) {
    let mut group = c.benchmark_group("lifecycle_policies");
    let config = EngineConfig::default();

    for &bar_count in &[750, 7500] {
        let bars = make_bars(bar_count);
        let mut order = make_order();
        order.trailing = TrailingConfig {
            enabled: true,
            recompute_every_minutes: 15,
            lookback_minutes: 60,
        };
        order.confirmation = ConfirmationConfig {
            enabled: true,
            lookback_hours: 3,
        };
        order.re_enter = true;

        group.bench_with_input(
            BenchmarkId::new("trail_confirm_reenter", bar_count),
            &bar_count,
            |b, _| {
                b.iter(|| run(black_box(&order), black_box(&bars), black_box(&config)));
            },
        );
    }

    group.finish();
}

// ── 3. Policy primitives ─────────────────────────────────────────────

fn bench_policies(c: &mut Criterion) {
    let mut group = c.benchmark_group("policy_primitives");
    let bars = make_bars(7500);

    group.bench_function("trail_window_720", |b| {
        let window = &bars[bars.len() - 720..];
        b.iter(|| trail(black_box(Direction::Long), black_box(window)));
    });

    group.bench_function("confirm_lookback_3h", |b| {
        let (prior, current) = bars.split_at(bars.len() - 1);
        b.iter(|| {
            confirm(
                black_box(ConditionType::TriggerLong),
                black_box(100.0),
                black_box(&current[0]),
                black_box(prior),
                black_box(session_start()),
                black_box(3),
            )
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_lifecycle,
    bench_lifecycle_with_policies,
    bench_policies,
);
criterion_main!(benches);
