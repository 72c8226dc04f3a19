//! Daytrader Core — ledger, price series, signal strategies, backtest replay.
//!
//! This crate contains the pure trading core:
//! - Domain types (ledger, price series, parameters, trade events)
//! - Trailing price window and moving averages
//! - Signal strategies (threshold, trend-follow) and the stateful signal engine
//! - The sequential backtest simulator
//!
//! Nothing here performs I/O. Market data, order routing and persistence live
//! in `daytrader-runner` behind collaborator traits.

pub mod domain;
pub mod indicators;
pub mod signal;
pub mod simulator;

pub use simulator::{SimulationResult, Simulator};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types shared with optimizer workers are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Ledger>();
        require_sync::<domain::Ledger>();
        require_send::<domain::LedgerSnapshot>();
        require_sync::<domain::LedgerSnapshot>();
        require_send::<domain::PriceSeries>();
        require_sync::<domain::PriceSeries>();
        require_send::<domain::Parameters>();
        require_sync::<domain::Parameters>();
        require_send::<domain::TradeEvent>();
        require_sync::<domain::TradeEvent>();

        // Signal types
        require_send::<signal::Signal>();
        require_sync::<signal::Signal>();
        require_send::<signal::SignalStrategy>();
        require_sync::<signal::SignalStrategy>();
        require_send::<signal::SignalEngine>();
        require_sync::<signal::SignalEngine>();

        // Simulator
        require_send::<Simulator>();
        require_sync::<Simulator>();
        require_send::<SimulationResult>();
        require_sync::<SimulationResult>();
    }

    /// Architecture contract: strategies see the ledger only by shared
    /// reference and cannot mutate it.
    #[test]
    fn signal_rule_cannot_mutate_ledger() {
        fn _check_trait_object_builds(
            rule: &dyn signal::SignalRule,
            ctx: &signal::DecisionContext<'_>,
        ) -> signal::Signal {
            rule.decide(ctx)
        }
    }
}
