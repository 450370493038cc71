//! Lifecycle engine — the state machine, its gateway, and the replay fold.
//!
//! One conditional order per run. The run is a pure fold over the bar
//! stream: identical inputs produce identical `TradeState` and action logs,
//! which is what makes backtests reproducible and lets a live driver reuse
//! the exact same transition logic.

pub mod gateway;
pub mod lifecycle;

pub use gateway::{ExecutionGateway, GatewayEvent, NoopGateway, RecordingGateway};
pub use lifecycle::{EngineConfig, TradeLifecycle};

use crate::domain::{ConditionalOrder, PriceBar, TradeState, TradeStatus};

/// Fold one order over a complete bar stream.
///
/// Bars must be in strictly increasing time order. Returns the terminal
/// `TradeState`; an empty stream yields an immediately closed state with no
/// exit reason rather than an error.
pub fn run(order: &ConditionalOrder, bars: &[PriceBar], config: &EngineConfig) -> TradeState {
    run_with_gateway(order, bars, config, &mut NoopGateway)
}

/// [`run`], reporting every transition to `gateway` as it happens.
pub fn run_with_gateway(
    order: &ConditionalOrder,
    bars: &[PriceBar],
    config: &EngineConfig,
    gateway: &mut dyn ExecutionGateway,
) -> TradeState {
    let mut machine = TradeLifecycle::new(order.clone(), *config);
    for (i, bar) in bars.iter().enumerate() {
        machine.advance(bar, &bars[..i], gateway);
        if machine.state().status == TradeStatus::Closed {
            break;
        }
    }
    machine.finish(bars, gateway);
    machine.into_state()
}
