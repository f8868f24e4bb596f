//! Mock Price Source
//!
//! Answers from a table of canned payloads and remembers every request it
//! was asked, in order. Unknown requests get a CoinGecko-style
//! `{"error": "coin not found"}` body.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{Value, json};
use tokio::sync::Mutex;

use super::PriceSource;
use crate::error::Result;
use crate::upstream::UpstreamRequest;

/// Mock price source with static payloads
#[derive(Default)]
pub struct MockPriceSource {
    responses: HashMap<UpstreamRequest, Value>,
    calls: Mutex<Vec<UpstreamRequest>>,
}

impl MockPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `request` with `payload`
    #[must_use]
    pub fn with_response(mut self, request: UpstreamRequest, payload: Value) -> Self {
        self.responses.insert(request, payload);
        self
    }

    /// Canned `/simple/price` answer
    #[must_use]
    pub fn with_spot_price(self, coin: &str, usd: f64, change_24h: f64) -> Self {
        let payload = json!({ coin: { "usd": usd, "usd_24h_change": change_24h } });
        self.with_response(UpstreamRequest::simple_price(coin), payload)
    }

    /// Canned `/coins/{id}/history` answer for one day
    #[must_use]
    pub fn with_history(
        self,
        coin: &str,
        date: NaiveDate,
        name: &str,
        symbol: &str,
        usd: f64,
    ) -> Self {
        let payload = json!({
            "id": coin,
            "symbol": symbol,
            "name": name,
            "market_data": { "current_price": { "usd": usd } }
        });
        self.with_response(UpstreamRequest::history(coin, date), payload)
    }

    /// Canned `/coins/{id}/market_chart` answer
    #[must_use]
    pub fn with_market_chart(self, coin: &str, payload: Value) -> Self {
        self.with_response(UpstreamRequest::market_chart(coin), payload)
    }

    /// Requests received so far, oldest first
    pub async fn calls(&self) -> Vec<UpstreamRequest> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl PriceSource for MockPriceSource {
    async fn fetch(&self, request: &UpstreamRequest) -> Result<Value> {
        self.calls.lock().await.push(request.clone());

        Ok(self
            .responses
            .get(request)
            .cloned()
            .unwrap_or_else(|| json!({ "error": "coin not found" })))
    }

    fn name(&self) -> &str {
        "MockPriceSource"
    }
}
