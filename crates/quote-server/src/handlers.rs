//! HTTP Handlers

use axum::{
    Json,
    extract::{Path, State, rejection::PathRejection},
    http::StatusCode,
};
use serde::Serialize;
use tracing::Instrument;

use coin_quote::{CoinReport, QuoteError};

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub upstream: String,
}

/// Success envelope: `{"error": false, "data": {...}}`
#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub error: bool,
    pub data: CoinReport,
}

/// Failure envelope: `{"error": true, "message": "..."}`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: bool,
    pub message: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        upstream: state.aggregator.source_name().to_string(),
    })
}

/// Coin lookup: price, changes and 15-day chart
pub async fn coin_quote(
    State(state): State<AppState>,
    coin: Result<Path<String>, PathRejection>,
) -> Result<Json<QuoteResponse>, ApiError> {
    let coin = match coin {
        Ok(Path(coin)) => coin,
        Err(rejection) => {
            tracing::debug!("Unreadable coin in path: {}", rejection);
            return Err(missing_coin().await);
        }
    };

    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("coin_quote", %request_id, coin = %coin);

    let report = state
        .aggregator
        .get_quote(&coin)
        .instrument(span)
        .await
        .map_err(|e| error_response(&e))?;

    Ok(Json(QuoteResponse {
        error: false,
        data: report,
    }))
}

/// `/v0` without a coin
pub async fn missing_coin() -> ApiError {
    error_response(&QuoteError::MissingCoin)
}

/// Status code a lookup failure is reported with
pub const fn error_status(error: &QuoteError) -> StatusCode {
    if error.is_client_error() {
        StatusCode::FORBIDDEN
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn error_response(error: &QuoteError) -> ApiError {
    let status = error_status(error);
    if status.is_server_error() {
        tracing::error!("Quote error: {}", error);
    } else {
        tracing::debug!("Rejected quote request: {}", error);
    }

    (
        status,
        Json(ErrorResponse {
            error: true,
            message: error.to_string(),
        }),
    )
}
