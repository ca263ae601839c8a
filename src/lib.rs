// ohlc-match-core: limit order matching against historical OHLC bars.
// resting requests cross each other on arrival and settle against each bar
// the quote feed delivers. all computation is deterministic with no I/O in the
// matching path.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: UserId, RequestId, Side, Price, Timestamp
//   2.x  request.rs: limit request, deal / deal_ohlc / merge, queue orderings
//   2.1x book.rs: per-symbol book, internal crossing, bar settlement
//   3.x  ohlc.rs: OHLC bar, bar kinds, stored line format
//   4.x  broker/: subscribe, buy/sell dispatch, bar dispatch
//   5.x  events.rs: Bought/Sold events, listener channel
//   6.x  logging.rs: tracing subscriber setup
//   7.x  quote_feed.rs: day-by-day bar replay
//   8.x  reference.rs: security categories (day trading, ETF)
//   9.x  config.rs: broker/logging/replay settings, env presets

// matching core
pub mod book;
pub mod broker;
pub mod events;
pub mod ohlc;
pub mod request;
pub mod types;

// integration modules
pub mod config;
pub mod logging;
pub mod quote_feed;
pub mod reference;

// re exports for convenience
pub use book::*;
pub use broker::*;
pub use events::*;
pub use ohlc::*;
pub use request::*;
pub use types::*;
pub use config::{ConfigError, Environment, SimulatorConfig};
pub use logging::{init_logging, LogConfig, LogFormat, LoggingError, TimestampFormat};
pub use quote_feed::{QuoteFeed, QuoteListener, ReplayConfig, ReplaySummary};
pub use reference::{CategoryFilter, CategoryLists, ReferenceError, StockCategory};
