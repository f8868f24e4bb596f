//! # coin-quote
//!
//! Aggregates CoinGecko price data into a compact per-coin report: current
//! USD price, 24h / 7d / 1m percentage change, and a 15-day daily chart.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                     QuoteAggregator                        │
//! │  ┌──────────────┐   ┌──────────────┐   ┌────────────────┐  │
//! │  │   upstream   │   │    model     │   │  PriceSource   │  │
//! │  │  (requests,  │───│ (CoinQuote,  │───│  (Strategy)    │  │
//! │  │   decoding)  │   │  CoinReport) │   │ CoinGecko/Mock │  │
//! │  └──────────────┘   └──────────────┘   └────────────────┘  │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing is cached and nothing is shared between lookups; each call to
//! [`QuoteAggregator::get_quote`] issues its own four upstream requests.

pub mod aggregator;
pub mod error;
pub mod model;
pub mod source;
pub mod upstream;

pub use aggregator::{Lookback, QuoteAggregator};
pub use error::{QuoteError, Result};
pub use model::{CoinQuote, CoinReport};
pub use source::{CoinGeckoClient, MockPriceSource, PriceSource};
pub use upstream::{MarketChart, UpstreamRequest};
