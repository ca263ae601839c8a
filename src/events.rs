// 5.0: fill notifications. the matching core hands every fill to an EventChannel which
// keeps a bounded history and calls the registered listeners in registration order.
// a failing listener is logged and skipped, it never aborts a settlement pass.

use crate::types::{CorrelationId, Price, RequestId, Side, Timestamp, UserId, Volume};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, payload: EventPayload) -> Self {
        Self { id, payload }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    Bought(FillEvent),
    Sold(FillEvent),
}

impl EventPayload {
    pub fn for_side(side: Side, fill: FillEvent) -> Self {
        match side {
            Side::Buy => EventPayload::Bought(fill),
            Side::Sell => EventPayload::Sold(fill),
        }
    }

    pub fn side(&self) -> Side {
        match self {
            EventPayload::Bought(_) => Side::Buy,
            EventPayload::Sold(_) => Side::Sell,
        }
    }

    pub fn fill(&self) -> &FillEvent {
        match self {
            EventPayload::Bought(fill) | EventPayload::Sold(fill) => fill,
        }
    }
}

/// Where the counterparty volume came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillSource {
    /// Crossed against another request in the same book.
    Cross,
    /// Filled by the market, bounded by an OHLC bar.
    Bar,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillEvent {
    pub request_id: RequestId,
    pub owner: UserId,
    pub symbol: String,
    pub correlation_id: CorrelationId,
    pub timestamp: Timestamp,
    pub price: Price,
    pub volume: Volume,
    pub source: FillSource,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("listener failed: {0}")]
pub struct ListenerError(pub String);

impl ListenerError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Callback type for fill events.
pub type FillCallback = Box<dyn FnMut(&Event) -> Result<(), ListenerError>>;

/// Receives fills as the matching core produces them.
pub trait FillSink {
    fn publish(&mut self, payload: EventPayload);
}

impl FillSink for Vec<EventPayload> {
    fn publish(&mut self, payload: EventPayload) {
        self.push(payload);
    }
}

pub struct EventChannel {
    listeners: Vec<(ListenerId, FillCallback)>,
    history: VecDeque<Event>,
    max_events: usize,
    next_event_id: u64,
    next_listener_id: u64,
}

impl EventChannel {
    pub fn new(max_events: usize) -> Self {
        Self {
            listeners: Vec::new(),
            history: VecDeque::new(),
            max_events,
            next_event_id: 1,
            next_listener_id: 1,
        }
    }

    pub fn add_listener(&mut self, callback: FillCallback) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, callback));
        id
    }

    /// Returns false if the listener was never registered or already removed.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.history.iter()
    }

    pub fn recent_events(&self, count: usize) -> Vec<&Event> {
        let start = self.history.len().saturating_sub(count);
        self.history.iter().skip(start).collect()
    }

    pub fn event_count(&self) -> usize {
        self.history.len()
    }

    fn dispatch(&mut self, event: &Event) {
        for (id, listener) in self.listeners.iter_mut() {
            if let Err(err) = listener(event) {
                tracing::error!(
                    listener = id.0,
                    event = event.id.0,
                    error = %err,
                    "fill listener failed, continuing"
                );
            }
        }
    }
}

impl FillSink for EventChannel {
    fn publish(&mut self, payload: EventPayload) {
        let event = Event::new(EventId(self.next_event_id), payload);
        self.next_event_id += 1;

        self.dispatch(&event);

        self.history.push_back(event);
        while self.history.len() > self.max_events {
            self.history.pop_front();
        }
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new(100_000)
    }
}

impl fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChannel")
            .field("listeners", &self.listeners.len())
            .field("history", &self.history.len())
            .field("max_events", &self.max_events)
            .finish()
    }
}
