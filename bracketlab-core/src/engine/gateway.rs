//! ExecutionGateway — side-channel sink for lifecycle events.

use crate::domain::{ConditionalOrder, TradeAction, TradeState, TradeStatus};

/// Sink the lifecycle machine reports to.
///
/// `on_transition` fires once per action-log entry, after the entry has been
/// appended, with the post-transition state. The engine never blocks on the
/// gateway and never uses anything it returns — state transitions are derived
/// purely from price data. A live driver places/cancels real broker orders
/// here; simulation uses [`NoopGateway`].
pub trait ExecutionGateway {
    fn on_transition(&mut self, order: &ConditionalOrder, state: &TradeState, action: &TradeAction);
}

/// Gateway that does nothing — the simulation default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopGateway;

impl ExecutionGateway for NoopGateway {
    fn on_transition(
        &mut self,
        _order: &ConditionalOrder,
        _state: &TradeState,
        _action: &TradeAction,
    ) {
    }
}

/// Gateway that records every event it sees, for assertions and dry runs.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    pub events: Vec<GatewayEvent>,
}

/// One recorded gateway notification.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayEvent {
    pub symbol: String,
    pub status: TradeStatus,
    pub action: TradeAction,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExecutionGateway for RecordingGateway {
    fn on_transition(&mut self, order: &ConditionalOrder, state: &TradeState, action: &TradeAction) {
        self.events.push(GatewayEvent {
            symbol: order.symbol.clone(),
            status: state.status,
            action: *action,
        });
    }
}
