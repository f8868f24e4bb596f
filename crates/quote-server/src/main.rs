//! CryptoGraph HTTP Server
//!
//! Axum-based server exposing the coin quote endpoint:
//!
//! ```text
//! GET /v0/{coin}  → {"error": false, "data": {"coinPrice": {...}, "marketData": {...}}}
//! ```
//!
//! Quotes are assembled from CoinGecko on every request; nothing is cached.

mod config;
mod handlers;
mod state;

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coin_quote::{CoinGeckoClient, QuoteAggregator};

use crate::config::ServerConfig;
use crate::handlers::{coin_quote, health_check, missing_coin};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();

    let source = CoinGeckoClient::new(&config.upstream_url)?;
    tracing::info!("Upstream: {}", source.base_url());

    let state = AppState {
        aggregator: Arc::new(QuoteAggregator::new(Arc::new(source))),
    };

    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("CryptoGraph API listening on http://{}", config.bind_addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health     - Health check");
    tracing::info!("  GET  /v0/{{coin}}  - Coin price, changes and 15-day chart");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Routes, CORS and request tracing around `state`
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/v0", get(missing_coin))
        .route("/v0/", get(missing_coin))
        .route("/v0/{coin}", get(coin_quote))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
