//! REST API for the windsock backend.

pub mod decisions;
pub mod launches;
pub mod measurements;
pub mod rules;
pub mod stations;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::json;

use crate::state::AppState;

pub(crate) type ApiError = (StatusCode, Json<serde_json::Value>);

pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

pub(crate) fn internal_error(err: anyhow::Error) -> ApiError {
    tracing::error!(%err, "request failed");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
}

/// Create the API router.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/stations", get(stations::list_stations))
        .route("/api/v1/stations", post(stations::create_station))
        .route("/api/v1/stations/:id", get(stations::get_station))
        .route("/api/v1/stations/:id", delete(stations::delete_station))
        .route("/api/v1/launches", get(launches::list_launches))
        .route("/api/v1/launches", post(launches::create_launch))
        .route("/api/v1/launches/:id", get(launches::get_launch))
        .route("/api/v1/launches/:id", delete(launches::delete_launch))
        .route("/api/v1/launches/:id/stations", put(launches::replace_stations))
        .route("/api/v1/launches/:id/rules", get(rules::list_launch_rules))
        .route("/api/v1/rules", post(rules::create_rule))
        .route("/api/v1/rules/:id", get(rules::get_rule))
        .route("/api/v1/rules/:id", put(rules::update_rule))
        .route("/api/v1/rules/:id", delete(rules::delete_rule))
        .route("/api/v1/measurements", post(measurements::ingest_measurement))
        .route("/api/v1/measurements/:station_id/latest", get(measurements::latest_measurement))
        .route("/api/v1/measurements/:station_id", get(measurements::measurement_history))
        .route("/api/v1/decisions/:launch_id", get(decisions::evaluate_launch))
        .route("/api/v1/decisions/:launch_id/history", get(decisions::decision_history))
}

async fn health() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
