//! Limit requests and the settlement primitives that act on them.
//!
//! `deal` settles a buy against a sell, `deal_ohlc` settles one request against
//! the tradable range of a price bar. Both mutate the requests they are handed:
//! the remaining volume is decremented in place and the caller is responsible
//! for dropping requests that reach zero from their book.

use crate::types::{CorrelationId, Price, RequestId, Side, Timestamp, UserId, Volume};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A buy or sell limit request resting in a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub owner: UserId,
    pub correlation_id: CorrelationId,
    pub symbol: String,
    pub timestamp: Timestamp,
    pub limit_price: Price,
    pub remaining_volume: Volume,
    pub side: Side,
}

impl Request {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: RequestId,
        owner: UserId,
        correlation_id: CorrelationId,
        symbol: impl Into<String>,
        timestamp: Timestamp,
        limit_price: Price,
        volume: Volume,
        side: Side,
    ) -> Self {
        Self {
            id,
            owner,
            correlation_id,
            symbol: symbol.into(),
            timestamp,
            limit_price,
            remaining_volume: volume,
            side,
        }
    }

    pub fn is_filled(&self) -> bool {
        self.remaining_volume == 0
    }

    fn counterparty(&self) -> Counterparty {
        Counterparty {
            request_id: self.id,
            owner: self.owner,
            correlation_id: self.correlation_id.clone(),
        }
    }

    /// Signed distance from `reference` where smaller means more aggressive.
    /// A bid far above the reference or an ask far below it sorts first.
    pub fn distance_from(&self, reference: Decimal) -> Decimal {
        match self.side {
            Side::Buy => reference - self.limit_price.value(),
            Side::Sell => self.limit_price.value() - reference,
        }
    }

    /// Settle a buy request against a sell request.
    ///
    /// Mutates both requests: each loses the filled volume. Trades at the
    /// seller's limit price, stamped with the later of the two arrival times.
    /// Returns `None` without touching either request when the sides are wrong,
    /// the symbols differ, or the spread does not cross.
    pub fn deal(buy: &mut Request, sell: &mut Request) -> Option<Fill> {
        if buy.symbol != sell.symbol {
            tracing::error!(
                buy_symbol = %buy.symbol,
                sell_symbol = %sell.symbol,
                "deal called across symbols, dispatch is misrouted"
            );
            return None;
        }
        if buy.side != Side::Buy || sell.side != Side::Sell {
            return None;
        }
        if sell.limit_price > buy.limit_price {
            return None;
        }

        let volume = buy.remaining_volume.min(sell.remaining_volume);
        buy.remaining_volume -= volume;
        sell.remaining_volume -= volume;

        Some(Fill {
            symbol: buy.symbol.clone(),
            buyer: buy.counterparty(),
            seller: sell.counterparty(),
            timestamp: buy.timestamp.max(sell.timestamp),
            price: sell.limit_price,
            volume,
        })
    }

    /// Settle this request against a bar's trading range.
    ///
    /// `available` is the bar volume still tradable in the current pass. Returns
    /// the volume left for the next request together with the fill detail; the
    /// detail carries volume 0 when the request could not trade.
    pub fn deal_ohlc(&mut self, high: Price, low: Price, available: Volume) -> (Volume, OhlcFill) {
        let mut fill = OhlcFill {
            side: self.side,
            request_id: self.id,
            owner: self.owner,
            symbol: self.symbol.clone(),
            correlation_id: self.correlation_id.clone(),
            timestamp: self.timestamp,
            price: None,
            volume: 0,
        };

        if available == 0 {
            return (0, fill);
        }

        let price = match self.side {
            // buyer never pays above the bar high nor above their own limit
            Side::Buy if self.limit_price >= low => Some(self.limit_price.min(high)),
            // seller never receives below the bar low nor below their own limit
            Side::Sell if self.limit_price <= high => Some(self.limit_price.max(low)),
            _ => None,
        };

        let Some(price) = price else {
            return (available, fill);
        };

        let volume = self.remaining_volume.min(available);
        self.remaining_volume -= volume;
        fill.price = Some(price);
        fill.volume = volume;

        (available - volume, fill)
    }

    /// Combine both sides of a book into one sequence ordered by aggressiveness
    /// relative to `reference`.
    pub fn merge(reference: Decimal, buys: Vec<Request>, sells: Vec<Request>) -> Vec<Request> {
        let mut requests = buys;
        requests.extend(sells);
        MergeOrder::new(reference).sort(&mut requests);
        requests
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}Request(user: {}, symbol: {}, time: {}, price: {}, volume: {}, guid: {})",
            self.side,
            self.owner,
            self.symbol,
            self.timestamp,
            self.limit_price,
            self.remaining_volume,
            self.correlation_id
        )
    }
}

/// One party of an internal cross.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counterparty {
    pub request_id: RequestId,
    pub owner: UserId,
    pub correlation_id: CorrelationId,
}

/// Outcome of `Request::deal`. Both parties share price, time and volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    pub symbol: String,
    pub buyer: Counterparty,
    pub seller: Counterparty,
    pub timestamp: Timestamp,
    pub price: Price,
    pub volume: Volume,
}

/// Outcome of `Request::deal_ohlc`. The counterparty is the market outside the book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OhlcFill {
    pub side: Side,
    pub request_id: RequestId,
    pub owner: UserId,
    pub symbol: String,
    pub correlation_id: CorrelationId,
    pub timestamp: Timestamp,
    /// `None` when nothing traded.
    pub price: Option<Price>,
    pub volume: Volume,
}

impl OhlcFill {
    pub fn is_empty(&self) -> bool {
        self.volume == 0
    }
}

/// A named ordering over requests. Sorting with it is stable.
pub trait RequestOrdering {
    fn compare(&self, a: &Request, b: &Request) -> Ordering;

    fn sort(&self, requests: &mut [Request]) {
        requests.sort_by(|a, b| self.compare(a, b));
    }

    fn is_sorted(&self, requests: &[Request]) -> bool {
        requests
            .windows(2)
            .all(|pair| self.compare(&pair[0], &pair[1]) != Ordering::Greater)
    }
}

/// Highest bidder first, earliest request on ties.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuyBookOrder;

impl RequestOrdering for BuyBookOrder {
    fn compare(&self, a: &Request, b: &Request) -> Ordering {
        b.limit_price
            .cmp(&a.limit_price)
            .then(a.timestamp.cmp(&b.timestamp))
    }
}

/// Lowest asker first, earliest request on ties.
#[derive(Debug, Clone, Copy, Default)]
pub struct SellBookOrder;

impl RequestOrdering for SellBookOrder {
    fn compare(&self, a: &Request, b: &Request) -> Ordering {
        a.limit_price
            .cmp(&b.limit_price)
            .then(a.timestamp.cmp(&b.timestamp))
    }
}

/// Most aggressive first relative to a reference price, earliest on ties.
#[derive(Debug, Clone, Copy)]
pub struct MergeOrder {
    reference: Decimal,
}

impl MergeOrder {
    pub fn new(reference: Decimal) -> Self {
        Self { reference }
    }

    pub fn reference(&self) -> Decimal {
        self.reference
    }
}

impl RequestOrdering for MergeOrder {
    fn compare(&self, a: &Request, b: &Request) -> Ordering {
        a.distance_from(self.reference)
            .cmp(&b.distance_from(self.reference))
            .then(a.timestamp.cmp(&b.timestamp))
    }
}

/// Sort a queue with the book ordering for its side.
pub fn sort_book(side: Side, requests: &mut [Request]) {
    match side {
        Side::Buy => BuyBookOrder.sort(requests),
        Side::Sell => SellBookOrder.sort(requests),
    }
}
