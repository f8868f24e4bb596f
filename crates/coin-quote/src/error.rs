//! Error Types for Coin Quotes

use thiserror::Error;

pub type Result<T> = std::result::Result<T, QuoteError>;

#[derive(Error, Debug)]
pub enum QuoteError {
    #[error("Invalid coin requested")]
    MissingCoin,

    /// Upstream answered, but without the data we asked for.
    /// Carries the upstream's own error text when it gave one.
    #[error("{0}")]
    Upstream(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl QuoteError {
    /// True when the caller supplied bad input, as opposed to an upstream failure
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::MissingCoin)
    }
}
