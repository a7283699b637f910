//! On-demand forecast endpoint.

use crate::domain::errors::PipelineError;
use crate::interfaces::http::AppState;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, extract::State, routing::get};
use serde_json::json;
use tracing::error;

pub fn router() -> Router<AppState> {
    Router::new().route("/predict", get(predict))
}

/// Compute the current signal from the latest stored features. Reads only;
/// scheduled ticks are the sole writers.
async fn predict(State(state): State<AppState>) -> Response {
    match state.pipeline.predict_on_demand().await {
        Ok(signal) => Json(signal).into_response(),
        Err(e) => match e.downcast_ref::<PipelineError>() {
            // Not enough stored bars yet: a user-visible condition, not a
            // server fault.
            Some(PipelineError::InsufficientData { .. }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response(),
            _ => {
                error!("On-demand prediction failed: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "prediction unavailable" })),
                )
                    .into_response()
            }
        },
    }
}
