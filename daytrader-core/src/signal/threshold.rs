//! Threshold rule — take profit / stop loss around the average cost.
//!
//! While holding: sell everything once the price reaches
//! `average_cost * upper_limit` or falls to `average_cost * lower_limit`.
//! While flat: buy as many shares as the cash allows.

use super::{DecisionContext, Signal, SignalRule};
use crate::domain::Parameters;

#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdRule;

impl SignalRule for ThresholdRule {
    fn name(&self) -> &'static str {
        "threshold"
    }

    fn warmup(&self, _params: &Parameters) -> usize {
        0
    }

    fn decide(&self, ctx: &DecisionContext<'_>) -> Signal {
        let ledger = ctx.ledger;
        if ledger.is_flat() {
            return Signal::buy_all_in(ledger, ctx.price);
        }

        let cost = ledger.average_cost();
        if ctx.price >= cost * ctx.params.upper_limit || ctx.price <= cost * ctx.params.lower_limit {
            return Signal::sell_all(ledger);
        }
        Signal::no_trigger()
    }
}
