//! Application State

use std::sync::Arc;

use coin_quote::QuoteAggregator;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Quote aggregator over the configured price source
    pub aggregator: Arc<QuoteAggregator>,
}
