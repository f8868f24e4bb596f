//! Server Configuration

use coin_quote::source::COINGECKO_API_URL;

/// Default listen address
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to
    pub bind_addr: String,

    /// Base URL of the upstream price API
    pub upstream_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.into(),
            upstream_url: COINGECKO_API_URL.into(),
        }
    }
}

impl ServerConfig {
    /// Read `BIND_ADDR` and `COINGECKO_API_URL`, falling back to defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            bind_addr: non_empty("BIND_ADDR").unwrap_or(defaults.bind_addr),
            upstream_url: non_empty("COINGECKO_API_URL").unwrap_or(defaults.upstream_url),
        }
    }
}
