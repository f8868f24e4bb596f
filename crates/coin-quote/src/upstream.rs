//! Upstream Requests & Payloads
//!
//! The three CoinGecko calls a quote needs, and decoding of their JSON
//! payloads into the pieces the aggregator combines.
//!
//! CoinGecko reports failures in-band. Depending on the endpoint and the
//! failure the body looks like one of:
//!
//! ```text
//! {"error": "coin not found"}
//! {"error": {"status": {"error_message": "..."}}}
//! {"status": {"error_code": 429, "error_message": "You've exceeded the Rate Limit"}}
//! ```
//!
//! so every decoder checks for its expected subtree first and, when it is
//! absent, surfaces whatever the upstream said instead.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::{Decimal, prelude::FromPrimitive};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{QuoteError, Result};

/// Date format CoinGecko expects for `/coins/{id}/history`
pub const HISTORY_DATE_FORMAT: &str = "%d-%m-%Y";

/// Quote currency for every call
pub const VS_CURRENCY: &str = "usd";

/// Lookback window of the market chart, in days
pub const MARKET_CHART_DAYS: u32 = 15;

/// One outbound call to the price API
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum UpstreamRequest {
    /// Current USD price with 24h change
    SimplePrice { coin: String },

    /// Snapshot of a coin on a given (UTC) day
    History { coin: String, date: NaiveDate },

    /// Daily price series over the last [`MARKET_CHART_DAYS`] days
    MarketChart { coin: String },
}

impl UpstreamRequest {
    pub fn simple_price(coin: impl Into<String>) -> Self {
        Self::SimplePrice { coin: coin.into() }
    }

    pub fn history(coin: impl Into<String>, date: NaiveDate) -> Self {
        Self::History { coin: coin.into(), date }
    }

    pub fn market_chart(coin: impl Into<String>) -> Self {
        Self::MarketChart { coin: coin.into() }
    }

    /// Coin this request is about
    pub fn coin(&self) -> &str {
        match self {
            Self::SimplePrice { coin } | Self::History { coin, .. } | Self::MarketChart { coin } => {
                coin
            }
        }
    }

    /// Path segments relative to the API base. The coin is a single
    /// segment and is percent-encoded by the URL builder.
    pub fn path_segments(&self) -> Vec<&str> {
        match self {
            Self::SimplePrice { .. } => vec!["simple", "price"],
            Self::History { coin, .. } => vec!["coins", coin.as_str(), "history"],
            Self::MarketChart { coin } => vec!["coins", coin.as_str(), "market_chart"],
        }
    }

    /// Query parameters, in the order they are sent
    pub fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::SimplePrice { coin } => vec![
                ("ids", coin.clone()),
                ("vs_currencies", VS_CURRENCY.into()),
                ("include_24hr_change", "true".into()),
            ],
            Self::History { date, .. } => vec![
                ("date", date.format(HISTORY_DATE_FORMAT).to_string()),
                ("localization", "false".into()),
            ],
            Self::MarketChart { .. } => vec![
                ("vs_currency", VS_CURRENCY.into()),
                ("days", MARKET_CHART_DAYS.to_string()),
                ("interval", "daily".into()),
            ],
        }
    }
}

impl std::fmt::Display for UpstreamRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path_segments().join("/"))?;
        let query: Vec<String> = self
            .query()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        write!(f, "?{}", query.join("&"))
    }
}

/// Spot price and 24h change from `/simple/price`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpotPrice {
    pub price: Decimal,
    pub change_24h: Decimal,
}

/// A coin's USD price on a past day, plus its display identity
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoricalPrice {
    pub name: String,
    pub symbol: String,
    pub price: Decimal,
}

/// Upstream market chart, passed through untouched
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketChart(pub Value);

#[derive(Deserialize)]
struct SimplePriceEntry {
    usd: Option<f64>,
    usd_24h_change: Option<f64>,
}

#[derive(Deserialize)]
struct HistoryPayload {
    #[serde(default)]
    name: String,
    #[serde(default)]
    symbol: String,
    market_data: Option<HistoryMarketData>,
}

#[derive(Deserialize)]
struct HistoryMarketData {
    #[serde(default)]
    current_price: HashMap<String, f64>,
}

/// Decode `{"<coin>": {"usd": .., "usd_24h_change": ..}}`
pub fn decode_spot_price(coin: &str, payload: &Value) -> Result<SpotPrice> {
    let entry = payload
        .get(coin)
        .ok_or_else(|| upstream_error(payload, || format!("no price data for '{coin}'")))?;
    let entry: SimplePriceEntry = serde_json::from_value(entry.clone())?;

    let price = entry
        .usd
        .ok_or_else(|| QuoteError::Upstream(format!("no USD price for '{coin}'")))?;
    let change_24h = entry
        .usd_24h_change
        .ok_or_else(|| QuoteError::Upstream(format!("no 24h change for '{coin}'")))?;

    Ok(SpotPrice {
        price: to_decimal(price)?,
        change_24h: to_decimal(change_24h)?,
    })
}

/// Decode a `/coins/{id}/history` snapshot. `market_data` is the subtree
/// that must be present; the upstream drops it on errors and for days
/// before the coin was listed.
pub fn decode_history(coin: &str, date: NaiveDate, payload: &Value) -> Result<HistoricalPrice> {
    if payload.get("market_data").is_none() {
        return Err(upstream_error(payload, || {
            format!(
                "no market data for '{coin}' on {}",
                date.format(HISTORY_DATE_FORMAT)
            )
        }));
    }
    let history: HistoryPayload = serde_json::from_value(payload.clone())?;

    let price = history
        .market_data
        .and_then(|data| data.current_price.get(VS_CURRENCY).copied())
        .ok_or_else(|| {
            QuoteError::Upstream(format!(
                "no USD price for '{coin}' on {}",
                date.format(HISTORY_DATE_FORMAT)
            ))
        })?;

    Ok(HistoricalPrice {
        name: history.name,
        symbol: history.symbol,
        price: to_decimal(price)?,
    })
}

/// Accept a market chart payload as long as it carries a `prices` series
pub fn decode_market_chart(coin: &str, payload: Value) -> Result<MarketChart> {
    if matches!(payload.get("prices"), Some(Value::Array(_))) {
        return Ok(MarketChart(payload));
    }
    Err(upstream_error(&payload, || {
        format!("no market chart for '{coin}'")
    }))
}

/// Build an upstream error from the payload's own error report, falling
/// back to `missing` when the payload gives no reason.
pub fn upstream_error(payload: &Value, missing: impl FnOnce() -> String) -> QuoteError {
    QuoteError::Upstream(upstream_message(payload).unwrap_or_else(missing))
}

fn upstream_message(payload: &Value) -> Option<String> {
    if let Some(error) = payload.get("error") {
        return Some(match error {
            Value::String(message) => message.clone(),
            other => status_message(other).unwrap_or_else(|| other.to_string()),
        });
    }
    status_message(payload)
}

fn status_message(value: &Value) -> Option<String> {
    value
        .get("status")
        .and_then(|status| status.get("error_message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// A non-zero upstream number must stay non-zero; values below `Decimal`'s
/// smallest step would otherwise read as a zero price.
fn to_decimal(value: f64) -> Result<Decimal> {
    Decimal::from_f64(value)
        .filter(|decimal| !decimal.is_zero() || value == 0.0)
        .ok_or_else(|| QuoteError::Upstream(format!("price out of range: {value}")))
}
