// 4.0: the broker. routes requests to per-symbol books, crosses them on
// arrival and settles them against incoming bars.
// single threaded and deterministic; fills go out through the event channel.

mod config;
mod core;
mod orders;
mod quotes;
mod results;

pub use config::BrokerConfig;
pub use core::Broker;
pub use results::{BrokerError, OrderResult, SettlementResult};
