// 4.0.2: result types and errors for broker operations.

use crate::book::MatchSummary;
use crate::events::EventPayload;
use crate::ohlc::BarError;
use crate::types::{RequestId, Side, Volume};
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct OrderResult {
    pub request_id: RequestId,
    pub side: Side,
    pub filled_volume: Volume,
    pub remaining_volume: Volume,
    /// Still queued after the crossing pass.
    pub is_resting: bool,
    /// Every event the crossing pass emitted, including fills between other
    /// resting requests that traded ahead of this one.
    pub fills: Vec<EventPayload>,
}

#[derive(Debug, Clone)]
pub struct SettlementResult {
    pub symbol: String,
    pub summary: MatchSummary,
    pub fills: Vec<EventPayload>,
    /// The bar was ignored because the symbol has no resting requests.
    pub skipped: bool,
    /// Book emptied by this bar and dropped from monitoring.
    pub pruned: bool,
}

impl SettlementResult {
    pub(super) fn skipped(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            summary: MatchSummary::default(),
            fills: Vec::new(),
            skipped: true,
            pruned: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrokerError {
    #[error("Symbol {0} is not subscribed")]
    NotSubscribed(String),

    #[error("Symbol {0} is not in the reference data")]
    UnknownSymbol(String),

    #[error("Limit price must be positive, got {0}")]
    InvalidPrice(Decimal),

    #[error("Volume must be at least 1, got {0}")]
    InvalidVolume(Volume),

    #[error("Invalid bar: {0}")]
    InvalidBar(#[from] BarError),
}
