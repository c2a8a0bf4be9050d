//! Measurement ingest and query endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;

use windsock_core::Measurement;

use crate::api::{api_error, internal_error, ApiError};
use crate::persistence::stations as stations_db;
use crate::state::AppState;

/// Manual measurement ingest, for tests and sites without a supported
/// provider.
#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub station_id: String,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default)]
    pub observed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub wind_speed: Option<f64>,
    #[serde(default)]
    pub wind_direction: Option<f64>,
    #[serde(default)]
    pub gust_speed: Option<f64>,
    #[serde(default)]
    pub gust_direction: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub pressure: Option<f64>,
    #[serde(default)]
    pub rain: Option<f64>,
}

fn default_source() -> String {
    "manual".to_string()
}

pub async fn ingest_measurement(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IngestRequest>,
) -> Result<(StatusCode, Json<Measurement>), ApiError> {
    if stations_db::get_station(state.pool(), &req.station_id)
        .await
        .map_err(internal_error)?
        .is_none()
    {
        return Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("unknown station {}", req.station_id),
        ));
    }

    let mut measurement = Measurement::new(
        req.station_id,
        req.source,
        req.observed_at.unwrap_or_else(Utc::now),
    );
    measurement.wind_speed = req.wind_speed;
    measurement.wind_direction = req.wind_direction;
    measurement.gust_speed = req.gust_speed;
    measurement.gust_direction = req.gust_direction;
    measurement.temperature = req.temperature;
    measurement.humidity = req.humidity;
    measurement.pressure = req.pressure;
    measurement.rain = req.rain;

    if measurement.is_empty() {
        return Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "measurement carries no values",
        ));
    }

    state
        .measurements()
        .insert(&measurement)
        .await
        .map_err(internal_error)?;
    state.record_latest(&measurement);
    tracing::debug!(station_id = %measurement.station_id, "ingested manual measurement");

    Ok((StatusCode::CREATED, Json(measurement)))
}

pub async fn latest_measurement(
    State(state): State<Arc<AppState>>,
    Path(station_id): Path<String>,
) -> Result<Json<Measurement>, ApiError> {
    if let Some(cached) = state.latest_cached(&station_id) {
        return Ok(Json(cached));
    }
    state
        .measurements()
        .latest(&station_id, Utc::now())
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| {
            api_error(
                StatusCode::NOT_FOUND,
                format!("no measurements for station {station_id}"),
            )
        })
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Lookback window in hours
    #[serde(default = "default_hours")]
    pub hours: i64,
}

fn default_hours() -> i64 {
    3
}

pub async fn measurement_history(
    State(state): State<Arc<AppState>>,
    Path(station_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<Measurement>>, ApiError> {
    if stations_db::get_station(state.pool(), &station_id)
        .await
        .map_err(internal_error)?
        .is_none()
    {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            format!("station {station_id} not found"),
        ));
    }
    let hours = query.hours.clamp(1, 24 * 14);
    let now = Utc::now();
    let rows = state
        .measurements()
        .between(&station_id, now - Duration::hours(hours), now)
        .await
        .map_err(internal_error)?;
    Ok(Json(rows))
}
