//! BracketLab Core — lifecycle engine, domain types, policies, sizing.
//!
//! This crate contains the heart of the bracket-order replay engine:
//! - Domain types (bars, conditional orders, trade state, action log)
//! - Bar-by-bar trade lifecycle state machine (pending → open → closed)
//! - Decision policies (trailing stop recompute, two-hit confirmation)
//! - Execution gateway trait for mirroring transitions to a broker
//! - Bracket construction and risk-based sizing

pub mod domain;
pub mod engine;
pub mod policy;
pub mod sizing;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything a replay worker touches is Send + Sync.
    ///
    /// The runner fans lifecycles out across a rayon pool, so a non-Send
    /// field sneaking into these types breaks the build here instead of
    /// deep inside a par_iter call.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::PriceBar>();
        require_sync::<domain::PriceBar>();
        require_send::<domain::ConditionalOrder>();
        require_sync::<domain::ConditionalOrder>();
        require_send::<domain::Direction>();
        require_sync::<domain::Direction>();
        require_send::<domain::TradeState>();
        require_sync::<domain::TradeState>();
        require_send::<domain::TradeAction>();
        require_sync::<domain::TradeAction>();
        require_send::<domain::ExitReason>();
        require_sync::<domain::ExitReason>();

        // Engine types
        require_send::<engine::EngineConfig>();
        require_sync::<engine::EngineConfig>();
        require_send::<engine::TradeLifecycle>();
        require_sync::<engine::TradeLifecycle>();
        require_send::<engine::RecordingGateway>();
        require_sync::<engine::RecordingGateway>();

        // Policy types
        require_send::<policy::ConditionType>();
        require_sync::<policy::ConditionType>();
        require_send::<policy::Confirmation>();
        require_sync::<policy::Confirmation>();

        // Sizing types
        require_send::<sizing::SetupCandle>();
        require_sync::<sizing::SetupCandle>();
        require_send::<sizing::BracketRatio>();
        require_sync::<sizing::BracketRatio>();
    }

    /// Architecture contract: policies are pure functions over bar slices.
    ///
    /// `trail` and `confirm` take bars and parameters and return values —
    /// no lifecycle state, no interior mutation. If either grows a state
    /// parameter, this stops compiling and the caller in the engine has to
    /// be rethought, not patched.
    #[test]
    fn policies_take_no_lifecycle_state() {
        fn _trail_is_pure(
            direction: domain::Direction,
            window: &[domain::PriceBar],
        ) -> Option<f64> {
            policy::trail(direction, window)
        }

        fn _confirm_is_pure(
            current: &domain::PriceBar,
            prior: &[domain::PriceBar],
            earliest: chrono::DateTime<chrono::Utc>,
        ) -> policy::Confirmation {
            policy::confirm(
                policy::ConditionType::TriggerLong,
                100.0,
                current,
                prior,
                earliest,
                3,
            )
        }
    }
}
