//! Station endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

use windsock_core::Station;

use crate::api::{api_error, internal_error, ApiError};
use crate::persistence::stations as stations_db;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateStationRequest {
    /// Provider station code, used as the natural key
    pub id: String,
    pub name: String,
    pub source: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub altitude_m: Option<f64>,
}

pub async fn create_station(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateStationRequest>,
) -> Result<(StatusCode, Json<Station>), ApiError> {
    if req.id.trim().is_empty() {
        return Err(api_error(StatusCode::UNPROCESSABLE_ENTITY, "station id must not be empty"));
    }

    let station = Station {
        id: req.id,
        name: req.name,
        source: req.source,
        latitude: req.latitude,
        longitude: req.longitude,
        altitude_m: req.altitude_m,
        active: true,
        created_at: Utc::now(),
    };

    stations_db::upsert_station(state.pool(), &station)
        .await
        .map_err(internal_error)?;
    tracing::info!(station_id = %station.id, source = %station.source, "registered station");

    Ok((StatusCode::CREATED, Json(station)))
}

pub async fn list_stations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Station>>, ApiError> {
    let stations = stations_db::list_stations(state.pool())
        .await
        .map_err(internal_error)?;
    Ok(Json(stations))
}

pub async fn get_station(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Station>, ApiError> {
    stations_db::get_station(state.pool(), &id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("station {id} not found")))
}

pub async fn delete_station(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let deleted = stations_db::delete_station(state.pool(), &id)
        .await
        .map_err(internal_error)?;
    if deleted {
        tracing::info!(station_id = %id, "deleted station");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(api_error(StatusCode::NOT_FOUND, format!("station {id} not found")))
    }
}
