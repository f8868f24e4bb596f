//! CoinGecko Client
//!
//! `PriceSource` backed by the public CoinGecko v3 REST API.

use async_trait::async_trait;
use reqwest::{Client, Url, header::ACCEPT};
use serde_json::Value;

use super::PriceSource;
use crate::error::{QuoteError, Result};
use crate::upstream::UpstreamRequest;

/// Public CoinGecko v3 endpoint
pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3/";

/// CoinGecko price source
///
/// No timeout is configured: a hung upstream call holds the request open.
#[derive(Clone, Debug)]
pub struct CoinGeckoClient {
    client: Client,
    base_url: Url,
}

impl CoinGeckoClient {
    /// Create a client against `base_url` (e.g. [`COINGECKO_API_URL`])
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| QuoteError::Config(format!("invalid upstream URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(QuoteError::Config(format!(
                "upstream URL '{base_url}' cannot be used as a base"
            )));
        }

        let client = Client::builder()
            .user_agent(concat!("cryptograph/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Create a client against the public API
    pub fn public() -> Result<Self> {
        Self::new(COINGECKO_API_URL)
    }

    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for a request
    pub fn url_for(&self, request: &UpstreamRequest) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| QuoteError::Config(format!("upstream URL '{}' has no path", self.base_url)))?
            .pop_if_empty()
            .extend(request.path_segments());

        url.query_pairs_mut()
            .clear()
            .extend_pairs(request.query());

        Ok(url)
    }
}

#[async_trait]
impl PriceSource for CoinGeckoClient {
    async fn fetch(&self, request: &UpstreamRequest) -> Result<Value> {
        let url = self.url_for(request)?;
        tracing::debug!(%url, "upstream request");

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        match serde_json::from_slice::<Value>(&body) {
            Ok(payload) => {
                if !status.is_success() {
                    tracing::warn!(%status, %request, "upstream returned an error status");
                }
                Ok(payload)
            }
            Err(e) if status.is_success() => Err(e.into()),
            Err(_) => Err(QuoteError::Upstream(format!(
                "upstream returned HTTP {status} for {}",
                request.path_segments().join("/")
            ))),
        }
    }

    fn name(&self) -> &str {
        "CoinGecko"
    }
}
