//! Per-symbol order book.
//!
//! Holds the resting buy and sell requests of one security and runs the two
//! settlement passes over them: internal crossing between the queues, and
//! greedy settlement against an OHLC bar.

use crate::events::{EventPayload, FillEvent, FillSink, FillSource};
use crate::ohlc::OhlcBar;
use crate::request::{sort_book, Fill, OhlcFill, Request};
use crate::types::{Price, RequestId, Side, Volume};
use rust_decimal::Decimal;

/// Fills produced by one settlement pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchSummary {
    /// Number of fill events emitted.
    pub fills: usize,
    /// Units traded. A cross counts once even though it emits two events.
    pub volume: Volume,
}

#[derive(Debug, Clone)]
pub struct OrderBook {
    symbol: String,
    /// Highest price first, earliest on ties.
    buy_queue: Vec<Request>,
    /// Lowest price first, earliest on ties.
    sell_queue: Vec<Request>,
}

impl OrderBook {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            buy_queue: Vec::new(),
            sell_queue: Vec::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Queue a request on its side and restore that side's ordering.
    pub fn insert(&mut self, request: Request) {
        debug_assert_eq!(request.symbol, self.symbol);
        debug_assert!(request.remaining_volume > 0);

        let side = request.side;
        let queue = self.queue_mut(side);
        queue.push(request);
        sort_book(side, queue);
    }

    pub fn buy_requests(&self) -> &[Request] {
        &self.buy_queue
    }

    pub fn sell_requests(&self) -> &[Request] {
        &self.sell_queue
    }

    pub fn requests(&self, side: Side) -> &[Request] {
        match side {
            Side::Buy => &self.buy_queue,
            Side::Sell => &self.sell_queue,
        }
    }

    fn queue_mut(&mut self, side: Side) -> &mut Vec<Request> {
        match side {
            Side::Buy => &mut self.buy_queue,
            Side::Sell => &mut self.sell_queue,
        }
    }

    pub fn get(&self, id: RequestId) -> Option<&Request> {
        self.buy_queue
            .iter()
            .chain(self.sell_queue.iter())
            .find(|request| request.id == id)
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.buy_queue.first().map(|request| request.limit_price)
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.sell_queue.first().map(|request| request.limit_price)
    }

    /// Best ask minus best bid. Negative or zero means the book crosses.
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask.value() - bid.value()),
            _ => None,
        }
    }

    pub fn is_crossed(&self) -> bool {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => ask <= bid,
            _ => false,
        }
    }

    pub fn request_count(&self) -> usize {
        self.buy_queue.len() + self.sell_queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buy_queue.is_empty() && self.sell_queue.is_empty()
    }

    /// Cross the best bid against the best ask until the spread opens or a
    /// side runs dry. Emits Bought for the buyer then Sold for the seller per fill.
    pub fn check_request_deal<S: FillSink>(&mut self, sink: &mut S) -> MatchSummary {
        let mut summary = MatchSummary::default();

        while let (Some(buy), Some(sell)) = (self.buy_queue.first_mut(), self.sell_queue.first_mut()) {
            if sell.limit_price > buy.limit_price {
                break;
            }

            let Some(fill) = Request::deal(buy, sell) else {
                // heads crossed but would not settle: a request was queued in the wrong book
                break;
            };
            let buy_done = buy.is_filled();
            let sell_done = sell.is_filled();

            tracing::info!(
                symbol = %self.symbol,
                time = %fill.timestamp,
                price = %fill.price,
                volume = fill.volume,
                buyer = %fill.buyer.owner,
                seller = %fill.seller.owner,
                "requests crossed"
            );

            summary.fills += 2;
            summary.volume += fill.volume;
            publish_cross(sink, fill);

            // both heads can empty on the same fill
            if buy_done {
                self.buy_queue.remove(0);
            }
            if sell_done {
                self.sell_queue.remove(0);
            }
        }

        self.log_queues("after cross");
        summary
    }

    /// Settle resting requests against a bar, most aggressive first, until the
    /// bar volume is spent or both sides stop filling.
    ///
    /// A side is abandoned at its first request that cannot trade: every later
    /// request of that side is less aggressive and could not trade either.
    pub fn check_ohlc_deal<S: FillSink>(&mut self, bar: &OhlcBar, sink: &mut S) -> MatchSummary {
        let mut summary = MatchSummary::default();

        if self.is_empty() {
            tracing::debug!(symbol = %self.symbol, "no resting requests");
            return summary;
        }
        if bar.volume == 0 {
            tracing::debug!(symbol = %self.symbol, time = %bar.timestamp, "bar carries no volume");
            return summary;
        }

        let reference = bar.reference_price();
        tracing::debug!(
            symbol = %self.symbol,
            high = %bar.high,
            reference = %reference,
            low = %bar.low,
            volume = bar.volume,
            "settling against bar"
        );

        let buys = std::mem::take(&mut self.buy_queue);
        let sells = std::mem::take(&mut self.sell_queue);
        let mut merged = Request::merge(reference, buys, sells);

        let mut available = bar.volume;
        let mut keep_buy = true;
        let mut keep_sell = true;
        let mut cursor = 0;

        while keep_buy || keep_sell {
            while cursor < merged.len() && !side_enabled(merged[cursor].side, keep_buy, keep_sell) {
                cursor += 1;
            }
            if cursor >= merged.len() {
                break;
            }

            let request = &mut merged[cursor];
            let (left, fill) = request.deal_ohlc(bar.high, bar.low, available);
            available = left;

            if fill.is_empty() {
                match request.side {
                    Side::Buy => keep_buy = false,
                    Side::Sell => keep_sell = false,
                }
                tracing::debug!(
                    symbol = %self.symbol,
                    side = %request.side,
                    limit = %request.limit_price,
                    "side out of range for this bar"
                );
                cursor += 1;
                continue;
            }

            let filled = request.is_filled();
            summary.fills += 1;
            summary.volume += fill.volume;
            publish_bar_fill(sink, fill, bar);

            if filled {
                // cursor now points at the next request
                merged.remove(cursor);
            }
            if available == 0 {
                tracing::info!(symbol = %self.symbol, time = %bar.timestamp, "bar volume exhausted");
                break;
            }
        }

        let (mut buys, mut sells): (Vec<Request>, Vec<Request>) = merged
            .into_iter()
            .filter(|request| !request.is_filled())
            .partition(|request| request.side == Side::Buy);
        sort_book(Side::Buy, &mut buys);
        sort_book(Side::Sell, &mut sells);
        self.buy_queue = buys;
        self.sell_queue = sells;

        self.log_queues("after bar");
        summary
    }

    fn log_queues(&self, stage: &str) {
        if !tracing::enabled!(tracing::Level::DEBUG) {
            return;
        }
        for request in self.buy_queue.iter().chain(self.sell_queue.iter()) {
            tracing::debug!(stage, "{request}");
        }
    }
}

fn side_enabled(side: Side, keep_buy: bool, keep_sell: bool) -> bool {
    match side {
        Side::Buy => keep_buy,
        Side::Sell => keep_sell,
    }
}

fn publish_cross<S: FillSink>(sink: &mut S, fill: Fill) {
    let Fill {
        symbol,
        buyer,
        seller,
        timestamp,
        price,
        volume,
    } = fill;

    sink.publish(EventPayload::Bought(FillEvent {
        request_id: buyer.request_id,
        owner: buyer.owner,
        symbol: symbol.clone(),
        correlation_id: buyer.correlation_id,
        timestamp,
        price,
        volume,
        source: FillSource::Cross,
    }));
    sink.publish(EventPayload::Sold(FillEvent {
        request_id: seller.request_id,
        owner: seller.owner,
        symbol,
        correlation_id: seller.correlation_id,
        timestamp,
        price,
        volume,
        source: FillSource::Cross,
    }));
}

fn publish_bar_fill<S: FillSink>(sink: &mut S, fill: OhlcFill, bar: &OhlcBar) {
    // a non-empty fill always carries a price
    let Some(price) = fill.price else {
        return;
    };

    tracing::info!(
        symbol = %fill.symbol,
        side = %fill.side,
        user = %fill.owner,
        price = %price,
        volume = fill.volume,
        guid = %fill.correlation_id,
        time = %bar.timestamp,
        "request filled by bar"
    );

    let side = fill.side;
    sink.publish(EventPayload::for_side(
        side,
        FillEvent {
            request_id: fill.request_id,
            owner: fill.owner,
            symbol: fill.symbol,
            correlation_id: fill.correlation_id,
            timestamp: fill.timestamp,
            price,
            volume: fill.volume,
            source: FillSource::Bar,
        },
    ));
}
