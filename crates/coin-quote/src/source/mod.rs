//! Price Sources
//!
//! Abstraction over the upstream price API, plus the CoinGecko client and a
//! canned-response mock for tests and offline runs.

mod coingecko;
mod mock;

pub use coingecko::{COINGECKO_API_URL, CoinGeckoClient};
pub use mock::MockPriceSource;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::upstream::UpstreamRequest;

/// Price source trait (Strategy pattern)
///
/// Returns the raw JSON payload for a request. Upstream error bodies are
/// returned as payloads too; interpreting them is the caller's job.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Perform one upstream call
    async fn fetch(&self, request: &UpstreamRequest) -> Result<Value>;

    /// Source name
    fn name(&self) -> &str;
}
