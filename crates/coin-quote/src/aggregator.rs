//! Quote Aggregator
//!
//! Combines four upstream calls into one [`CoinReport`]:
//!
//! ```text
//! simple/price ──────────────► current price, 24h change
//! coins/{id}/history (−7d) ──► 7d change, name, symbol
//! coins/{id}/history (−1m) ──► 1m change
//! coins/{id}/market_chart ───► 15 daily points, passed through
//! ```
//!
//! The calls run one after another; the first failure aborts the lookup.

use std::sync::Arc;

use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::error::{QuoteError, Result};
use crate::model::{CoinQuote, CoinReport, percent_change};
use crate::source::PriceSource;
use crate::upstream::{
    HistoricalPrice, MarketChart, SpotPrice, UpstreamRequest, decode_history,
    decode_market_chart, decode_spot_price,
};

/// How far back a historical snapshot is taken
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lookback {
    SevenDays,
    OneMonth,
}

impl Lookback {
    /// Calendar day of the snapshot, counted back from `now` in UTC.
    /// A month back from the 31st lands on the last day of the shorter month.
    pub fn date_before(self, now: DateTime<Utc>) -> Option<NaiveDate> {
        let today = now.date_naive();
        match self {
            Self::SevenDays => today.checked_sub_days(Days::new(7)),
            Self::OneMonth => today.checked_sub_months(Months::new(1)),
        }
    }
}

/// Builds coin reports from a [`PriceSource`]
#[derive(Clone)]
pub struct QuoteAggregator {
    source: Arc<dyn PriceSource>,
    clock: fn() -> DateTime<Utc>,
}

impl QuoteAggregator {
    pub fn new(source: Arc<dyn PriceSource>) -> Self {
        Self {
            source,
            clock: Utc::now,
        }
    }

    /// Use `clock` instead of the system time as the reference instant
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Name of the underlying price source
    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Look up `coin` as of the aggregator's clock
    pub async fn get_quote(&self, coin: &str) -> Result<CoinReport> {
        self.get_quote_at(coin, (self.clock)()).await
    }

    /// Look up `coin` with historical offsets counted from `now`
    pub async fn get_quote_at(&self, coin: &str, now: DateTime<Utc>) -> Result<CoinReport> {
        let coin = coin.trim();
        if coin.is_empty() {
            return Err(QuoteError::MissingCoin);
        }

        let spot = self.spot_price(coin).await?;
        let week = self.historical_price(coin, Lookback::SevenDays, now).await?;
        let month = self.historical_price(coin, Lookback::OneMonth, now).await?;
        let market_data = self.market_chart(coin).await?;

        let coin_price = CoinQuote {
            name: week.name,
            symbol: week.symbol.to_uppercase(),
            current_price: spot.price,
            change_24h: spot.change_24h,
            change_7d: change_since(spot.price, week.price)?,
            change_1m: change_since(spot.price, month.price)?,
        };

        tracing::info!(
            coin,
            price = %coin_price.current_price,
            change_7d = %coin_price.change_7d,
            "quote assembled"
        );

        Ok(CoinReport {
            coin_price,
            market_data,
        })
    }

    async fn spot_price(&self, coin: &str) -> Result<SpotPrice> {
        let payload = self.source.fetch(&UpstreamRequest::simple_price(coin)).await?;
        decode_spot_price(coin, &payload).inspect_err(|e| log_upstream_failure(coin, "price", e))
    }

    async fn historical_price(
        &self,
        coin: &str,
        lookback: Lookback,
        now: DateTime<Utc>,
    ) -> Result<HistoricalPrice> {
        let date = lookback
            .date_before(now)
            .ok_or_else(|| QuoteError::Upstream(format!("no date {lookback:?} before {now}")))?;

        let payload = self
            .source
            .fetch(&UpstreamRequest::history(coin, date))
            .await?;
        decode_history(coin, date, &payload)
            .inspect_err(|e| log_upstream_failure(coin, "history", e))
    }

    async fn market_chart(&self, coin: &str) -> Result<MarketChart> {
        let payload = self.source.fetch(&UpstreamRequest::market_chart(coin)).await?;
        decode_market_chart(coin, payload)
            .inspect_err(|e| log_upstream_failure(coin, "market_chart", e))
    }
}

fn change_since(current: Decimal, past: Decimal) -> Result<Decimal> {
    if past.is_zero() {
        return Err(QuoteError::Upstream("historical price is zero".into()));
    }
    percent_change(current, past)
        .ok_or_else(|| QuoteError::Upstream(format!("change out of range: {current} from {past}")))
}

fn log_upstream_failure(coin: &str, step: &str, error: &QuoteError) {
    tracing::warn!(coin, step, error = %error, "upstream lookup failed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockPriceSource;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use serde_json::{Value, json};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 31, 12, 0, 0).unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn chart() -> Value {
        json!({
            "prices": [[1_773_000_000_000_i64, 95.0], [1_773_086_400_000_i64, 100.0]],
            "market_caps": [],
            "total_volumes": []
        })
    }

    /// Bitcoin at 100 now, 80 a week ago, 125 a month ago
    fn bitcoin_source() -> MockPriceSource {
        MockPriceSource::new()
            .with_spot_price("bitcoin", 100.0, 3.5)
            .with_history("bitcoin", day(2026, 3, 24), "Bitcoin", "btc", 80.0)
            .with_history("bitcoin", day(2026, 2, 28), "Bitcoin", "btc", 125.0)
            .with_market_chart("bitcoin", chart())
    }

    #[test]
    fn test_lookback_dates() {
        assert_eq!(Lookback::SevenDays.date_before(now()), Some(day(2026, 3, 24)));
        assert_eq!(Lookback::OneMonth.date_before(now()), Some(day(2026, 2, 28)));

        let leap = Utc.with_ymd_and_hms(2028, 3, 30, 0, 0, 0).unwrap();
        assert_eq!(Lookback::OneMonth.date_before(leap), Some(day(2028, 2, 29)));

        let new_year = Utc.with_ymd_and_hms(2027, 1, 3, 23, 59, 59).unwrap();
        assert_eq!(Lookback::SevenDays.date_before(new_year), Some(day(2026, 12, 27)));
    }

    #[tokio::test]
    async fn test_full_quote() {
        let aggregator = QuoteAggregator::new(Arc::new(bitcoin_source()));
        let report = aggregator.get_quote_at("bitcoin", now()).await.unwrap();

        let quote = report.coin_price;
        assert_eq!(quote.name, "Bitcoin");
        assert_eq!(quote.symbol, "BTC");
        assert_eq!(quote.current_price, dec!(100));
        assert_eq!(quote.change_24h, dec!(3.5));
        assert_eq!(quote.change_7d, dec!(25));
        assert_eq!(quote.change_1m, dec!(-20));
        assert_eq!(report.market_data.0, chart());
    }

    #[tokio::test]
    async fn test_calls_are_sequential_in_order() {
        let source = Arc::new(bitcoin_source());
        let aggregator = QuoteAggregator::new(source.clone());
        aggregator.get_quote_at("bitcoin", now()).await.unwrap();

        assert_eq!(
            source.calls().await,
            vec![
                UpstreamRequest::simple_price("bitcoin"),
                UpstreamRequest::history("bitcoin", day(2026, 3, 24)),
                UpstreamRequest::history("bitcoin", day(2026, 2, 28)),
                UpstreamRequest::market_chart("bitcoin"),
            ]
        );
    }

    #[tokio::test]
    async fn test_repeated_lookups_agree() {
        let aggregator = QuoteAggregator::new(Arc::new(bitcoin_source()));
        let first = aggregator.get_quote_at("bitcoin", now()).await.unwrap();
        let second = aggregator.get_quote_at("bitcoin", now()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_fractional_change() {
        let source = MockPriceSource::new()
            .with_spot_price("ethereum", 3450.75, -1.2)
            .with_history("ethereum", day(2026, 3, 24), "Ethereum", "eth", 3300.5)
            .with_history("ethereum", day(2026, 2, 28), "Ethereum", "eth", 3600.0)
            .with_market_chart("ethereum", chart());
        let aggregator = QuoteAggregator::new(Arc::new(source));

        let quote = aggregator.get_quote_at("ethereum", now()).await.unwrap().coin_price;
        let expected = (dec!(3450.75) - dec!(3300.5)) / dec!(3300.5) * dec!(100);
        assert_eq!(quote.change_7d, expected);
        assert!((quote.change_7d - dec!(4.5523405544614452355703681261)).abs() < dec!(0.0000001));
    }

    #[tokio::test]
    async fn test_symbol_is_uppercased() {
        let source = MockPriceSource::new()
            .with_spot_price("shiba-inu", 0.00002, 1.0)
            .with_history("shiba-inu", day(2026, 3, 24), "Shiba Inu", "ShIb", 0.00001)
            .with_history("shiba-inu", day(2026, 2, 28), "Shiba Inu", "shib", 0.00004)
            .with_market_chart("shiba-inu", chart());
        let aggregator = QuoteAggregator::new(Arc::new(source));

        let quote = aggregator.get_quote_at("shiba-inu", now()).await.unwrap().coin_price;
        assert_eq!(quote.symbol, "SHIB");
        assert_eq!(quote.change_7d, dec!(100));
        assert_eq!(quote.change_1m, dec!(-50));
    }

    #[tokio::test]
    async fn test_blank_coin_makes_no_calls() {
        let source = Arc::new(bitcoin_source());
        let aggregator = QuoteAggregator::new(source.clone());

        let err = aggregator.get_quote_at("  ", now()).await.unwrap_err();
        assert!(matches!(err, QuoteError::MissingCoin));
        assert!(source.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_market_data_short_circuits() {
        let source = MockPriceSource::new()
            .with_spot_price("bitcoin", 100.0, 3.5)
            .with_response(
                UpstreamRequest::history("bitcoin", day(2026, 3, 24)),
                json!({"error": "invalid date"}),
            );
        let source = Arc::new(source);
        let aggregator = QuoteAggregator::new(source.clone());

        let err = aggregator.get_quote_at("bitcoin", now()).await.unwrap_err();
        assert!(matches!(err, QuoteError::Upstream(_)));
        assert!(err.to_string().contains("invalid date"));
        // month history and market chart never requested
        assert_eq!(source.calls().await.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_coin() {
        let aggregator = QuoteAggregator::new(Arc::new(MockPriceSource::new()));
        let err = aggregator.get_quote_at("nope", now()).await.unwrap_err();
        assert_eq!(err.to_string(), "coin not found");
    }

    #[tokio::test]
    async fn test_zero_historical_price() {
        let source = MockPriceSource::new()
            .with_spot_price("newcoin", 1.0, 0.0)
            .with_history("newcoin", day(2026, 3, 24), "New", "new", 0.0)
            .with_history("newcoin", day(2026, 2, 28), "New", "new", 1.0)
            .with_market_chart("newcoin", chart());
        let aggregator = QuoteAggregator::new(Arc::new(source));

        let err = aggregator.get_quote_at("newcoin", now()).await.unwrap_err();
        assert_eq!(err.to_string(), "historical price is zero");
    }

    #[tokio::test]
    async fn test_change_overflow_is_not_zero_price() {
        let source = MockPriceSource::new()
            .with_spot_price("bigcoin", 1e20, 0.0)
            .with_history("bigcoin", day(2026, 3, 24), "Big", "big", 1e-20)
            .with_history("bigcoin", day(2026, 2, 28), "Big", "big", 1.0)
            .with_market_chart("bigcoin", chart());
        let aggregator = QuoteAggregator::new(Arc::new(source));

        let err = aggregator.get_quote_at("bigcoin", now()).await.unwrap_err();
        assert!(err.to_string().starts_with("change out of range"), "{err}");
    }

    #[tokio::test]
    async fn test_get_quote_uses_clock() {
        let source = Arc::new(bitcoin_source());
        let aggregator = QuoteAggregator::new(source.clone()).with_clock(now);

        let report = aggregator.get_quote("bitcoin").await.unwrap();
        assert_eq!(report.coin_price.change_7d, dec!(25));
        assert_eq!(
            source.calls().await[1],
            UpstreamRequest::history("bitcoin", day(2026, 3, 24))
        );
    }
}
