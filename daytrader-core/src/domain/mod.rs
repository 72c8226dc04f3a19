//! Domain types for the trading core.

pub mod ledger;
pub mod params;
pub mod price;
pub mod trade;

pub use ledger::{Ledger, LedgerSnapshot, LotSize};
pub use params::{ParamError, Parameters};
pub use price::{PricePoint, PriceSeries, PriceSeriesError};
pub use trade::{TradeEvent, TradeSide};
