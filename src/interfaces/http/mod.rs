pub mod forecast;
pub mod health;
pub mod history;
pub mod ws;

use crate::application::pipeline::ForecastPipeline;
use crate::application::query::QueryService;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers. Handlers only read: the
/// pipeline owns the write path and the serving layer runs concurrently
/// with it without coordination.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ForecastPipeline>,
    pub query: Arc<QueryService>,
    pub default_symbol: String,
    pub history_limit: usize,
    pub heartbeat: Duration,
}

/// Create the API router with CORS and request tracing applied.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(forecast::router())
        .merge(history::router())
        .merge(ws::router())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
