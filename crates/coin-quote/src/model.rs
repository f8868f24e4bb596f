//! Domain Models
//!
//! The aggregated quote handed back to callers. Prices and percentage
//! changes are `rust_decimal` internally and go out as plain JSON numbers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::upstream::MarketChart;

/// Current price of a coin and its change over three windows
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinQuote {
    /// Display name (e.g., "Bitcoin")
    pub name: String,

    /// Ticker symbol, always upper-case (e.g., "BTC")
    pub symbol: String,

    /// Current price in USD
    #[serde(with = "rust_decimal::serde::float")]
    pub current_price: Decimal,

    /// 24-hour change percentage, as reported upstream
    #[serde(rename = "change24H", with = "rust_decimal::serde::float")]
    pub change_24h: Decimal,

    /// 7-day change percentage
    #[serde(rename = "change7D", with = "rust_decimal::serde::float")]
    pub change_7d: Decimal,

    /// 1-month change percentage
    #[serde(rename = "change1M", with = "rust_decimal::serde::float")]
    pub change_1m: Decimal,
}

/// Everything returned for one coin lookup
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinReport {
    pub coin_price: CoinQuote,
    pub market_data: MarketChart,
}

/// Percentage change from `past` to `current`
///
/// Returns `None` when `past` is zero or the result does not fit a `Decimal`.
pub fn percent_change(current: Decimal, past: Decimal) -> Option<Decimal> {
    if past.is_zero() {
        return None;
    }
    current
        .checked_sub(past)?
        .checked_div(past)?
        .checked_mul(Decimal::ONE_HUNDRED)
}
