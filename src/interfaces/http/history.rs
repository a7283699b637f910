//! Read-side history endpoints: persisted bars, signals, and performance.

use crate::interfaces::http::AppState;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/historical", get(historical))
        .route("/signals", get(signals))
        .route("/performance", get(performance))
}

#[derive(Debug, Deserialize)]
struct HistoricalQuery {
    symbol: Option<String>,
}

fn internal_error(context: &str, e: anyhow::Error) -> Response {
    error!("{context}: {e:#}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": context })),
    )
        .into_response()
}

/// Last N persisted bars for a symbol, newest last.
async fn historical(
    State(state): State<AppState>,
    Query(query): Query<HistoricalQuery>,
) -> Response {
    let symbol = query.symbol.unwrap_or_else(|| state.default_symbol.clone());
    match state.query.historical(&symbol, state.history_limit).await {
        Ok(bars) => Json(bars).into_response(),
        Err(e) => internal_error("failed to read historical bars", e),
    }
}

/// Every persisted signal, in timestamp order.
async fn signals(State(state): State<AppState>) -> Response {
    match state.query.signals().await {
        Ok(signals) => Json(signals).into_response(),
        Err(e) => internal_error("failed to read signals", e),
    }
}

/// Cumulative P&L and Sharpe ratio. An empty store is a documented empty
/// result, not a failure.
async fn performance(State(state): State<AppState>) -> Response {
    match state.query.performance().await {
        Ok(Some(report)) => Json(report).into_response(),
        Ok(None) => Json(json!({ "error": "No signals yet" })).into_response(),
        Err(e) => internal_error("failed to compute performance", e),
    }
}
