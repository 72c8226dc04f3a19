//! Trend-follow rule — moving-average crossover gating the threshold exits.
//!
//! Uptrend (short MA above long MA): take profit at the upper limit, or buy
//! all-in when flat. Downtrend (short MA below long MA): stop out at the lower
//! limit, never buy. Equal averages do nothing.
//!
//! The rule needs `long_window` observations; before that it holds with
//! `HoldReason::InsufficientHistory`.

use std::cmp::Ordering;

use super::{DecisionContext, HoldReason, Signal, SignalRule};
use crate::domain::Parameters;

#[derive(Debug, Clone, Copy, Default)]
pub struct TrendFollowRule;

impl SignalRule for TrendFollowRule {
    fn name(&self) -> &'static str {
        "trend_follow"
    }

    fn warmup(&self, params: &Parameters) -> usize {
        params.long_window
    }

    fn decide(&self, ctx: &DecisionContext<'_>) -> Signal {
        let required = self.warmup(ctx.params);
        let observed = ctx.window.len();
        let (Some(short_ma), Some(long_ma)) = (
            ctx.window.mean(ctx.params.short_window),
            ctx.window.mean(ctx.params.long_window),
        ) else {
            return Signal::Hold(HoldReason::InsufficientHistory { observed, required });
        };
        if observed < required {
            return Signal::Hold(HoldReason::InsufficientHistory { observed, required });
        }

        let ledger = ctx.ledger;
        match short_ma.partial_cmp(&long_ma) {
            Some(Ordering::Greater) => {
                if ledger.is_flat() {
                    Signal::buy_all_in(ledger, ctx.price)
                } else if ctx.price >= ledger.average_cost() * ctx.params.upper_limit {
                    Signal::sell_all(ledger)
                } else {
                    Signal::no_trigger()
                }
            }
            Some(Ordering::Less) => {
                if !ledger.is_flat() && ctx.price <= ledger.average_cost() * ctx.params.lower_limit
                {
                    Signal::sell_all(ledger)
                } else {
                    Signal::no_trigger()
                }
            }
            _ => Signal::no_trigger(),
        }
    }
}
