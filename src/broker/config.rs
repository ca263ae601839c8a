//! Broker configuration options.

use serde::{Deserialize, Serialize};

/// Broker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Maximum number of fill events to retain in memory.
    pub max_events: usize,
    /// Stop monitoring a symbol once its book has no resting requests.
    pub prune_empty_books: bool,
    /// With reference data injected, refuse to subscribe symbols it does not list.
    pub strict_reference_data: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            max_events: 100_000,
            prune_empty_books: true,
            strict_reference_data: true,
        }
    }
}
