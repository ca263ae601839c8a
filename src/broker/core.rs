// 4.0 broker/core.rs: the broker. owns one book per subscribed symbol and the event channel.

use super::config::BrokerConfig;
use super::results::BrokerError;
use crate::book::OrderBook;
use crate::events::{Event, EventChannel, EventPayload, FillCallback, FillSink, ListenerId};
use crate::reference::StockCategory;
use crate::types::RequestId;
use std::collections::{BTreeSet, HashMap};

/** 4.1: single-threaded matching front end. all state lives here */
#[derive(Debug)]
pub struct Broker {
    pub(super) config: BrokerConfig,
    pub(super) books: HashMap<String, OrderBook>,
    /// Symbols with resting requests. Bars for other symbols are ignored.
    pub(super) monitored: BTreeSet<String>,
    pub(super) channel: EventChannel,
    pub(super) reference: Option<StockCategory>,
    pub(super) next_request_id: u64,
}

impl Broker {
    pub fn new(config: BrokerConfig) -> Self {
        let channel = EventChannel::new(config.max_events);
        Self {
            config,
            books: HashMap::new(),
            monitored: BTreeSet::new(),
            channel,
            reference: None,
            next_request_id: 1,
        }
    }

    pub fn with_reference_data(config: BrokerConfig, reference: StockCategory) -> Self {
        let mut broker = Self::new(config);
        broker.reference = Some(reference);
        broker
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    pub fn reference_data(&self) -> Option<&StockCategory> {
        self.reference.as_ref()
    }

    /// Create an empty book for `symbol`. Subscribing twice is a no-op.
    pub fn subscribe(&mut self, symbol: &str) -> Result<(), BrokerError> {
        if self.books.contains_key(symbol) {
            return Ok(());
        }
        if let Some(reference) = &self.reference {
            if self.config.strict_reference_data && !reference.contains(symbol) {
                return Err(BrokerError::UnknownSymbol(symbol.to_string()));
            }
        }

        tracing::debug!(symbol, "subscribed");
        self.books.insert(symbol.to_string(), OrderBook::new(symbol));
        Ok(())
    }

    pub fn is_subscribed(&self, symbol: &str) -> bool {
        self.books.contains_key(symbol)
    }

    pub fn book(&self, symbol: &str) -> Option<&OrderBook> {
        self.books.get(symbol)
    }

    pub fn is_monitored(&self, symbol: &str) -> bool {
        self.monitored.contains(symbol)
    }

    pub fn monitored_symbols(&self) -> impl Iterator<Item = &str> {
        self.monitored.iter().map(String::as_str)
    }

    pub fn add_listener(&mut self, callback: FillCallback) -> ListenerId {
        self.channel.add_listener(callback)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.channel.remove_listener(id)
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.channel.events()
    }

    pub fn recent_events(&self, count: usize) -> Vec<&Event> {
        self.channel.recent_events(count)
    }

    pub(super) fn next_request_id(&mut self) -> RequestId {
        let id = RequestId(self.next_request_id);
        self.next_request_id += 1;
        id
    }

    /// Drop `symbol` from monitoring when its book ran empty. Returns whether it did.
    pub(super) fn prune_if_empty(&mut self, symbol: &str) -> bool {
        if !self.config.prune_empty_books {
            return false;
        }
        let empty = self.books.get(symbol).map_or(true, OrderBook::is_empty);
        if empty && self.monitored.remove(symbol) {
            tracing::debug!(symbol, "book empty, monitoring stopped");
            return true;
        }
        false
    }
}

/// Forwards fills to the channel as they happen and keeps a copy for the caller.
pub(super) struct Recording<'a> {
    channel: &'a mut EventChannel,
    fills: Vec<EventPayload>,
}

impl<'a> Recording<'a> {
    pub(super) fn new(channel: &'a mut EventChannel) -> Self {
        Self {
            channel,
            fills: Vec::new(),
        }
    }

    pub(super) fn into_fills(self) -> Vec<EventPayload> {
        self.fills
    }
}

impl FillSink for Recording<'_> {
    fn publish(&mut self, payload: EventPayload) {
        self.fills.push(payload.clone());
        self.channel.publish(payload);
    }
}
