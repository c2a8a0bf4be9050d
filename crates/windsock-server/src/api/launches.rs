//! Launch endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use windsock_core::{Launch, StationAssociation};

use crate::api::{api_error, internal_error, ApiError};
use crate::persistence::{launches as launches_db, stations as stations_db};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateLaunchRequest {
    pub name: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub altitude_m: Option<f64>,
    /// Associations may be empty at creation and added later, but the
    /// launch cannot be evaluated until it has at least one.
    #[serde(default)]
    pub stations: Vec<StationAssociation>,
}

pub async fn create_launch(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateLaunchRequest>,
) -> Result<(StatusCode, Json<Launch>), ApiError> {
    verify_stations_exist(&state, &req.stations).await?;

    let mut launch = Launch {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        latitude: req.latitude,
        longitude: req.longitude,
        altitude_m: req.altitude_m,
        active: true,
        stations: req.stations,
        created_at: Utc::now(),
    };
    sort_associations(&mut launch.stations);

    launches_db::insert_launch(state.pool(), &launch)
        .await
        .map_err(internal_error)?;
    tracing::info!(launch_id = %launch.id, name = %launch.name, "created launch");

    Ok((StatusCode::CREATED, Json(launch)))
}

pub async fn list_launches(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Launch>>, ApiError> {
    let launches = launches_db::list_launches(state.pool())
        .await
        .map_err(internal_error)?;
    Ok(Json(launches))
}

pub async fn get_launch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Launch>, ApiError> {
    launches_db::get_launch(state.pool(), &id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("launch {id} not found")))
}

pub async fn delete_launch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let deleted = launches_db::delete_launch(state.pool(), &id)
        .await
        .map_err(internal_error)?;
    if deleted {
        tracing::info!(launch_id = %id, "deleted launch");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(api_error(StatusCode::NOT_FOUND, format!("launch {id} not found")))
    }
}

/// Replace all station associations of a launch.
pub async fn replace_stations(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(mut associations): Json<Vec<StationAssociation>>,
) -> Result<Json<Launch>, ApiError> {
    if launches_db::get_launch(state.pool(), &id)
        .await
        .map_err(internal_error)?
        .is_none()
    {
        return Err(api_error(StatusCode::NOT_FOUND, format!("launch {id} not found")));
    }
    verify_stations_exist(&state, &associations).await?;
    sort_associations(&mut associations);

    launches_db::replace_associations(state.pool(), &id, &associations)
        .await
        .map_err(internal_error)?;
    tracing::info!(launch_id = %id, count = associations.len(), "replaced station associations");

    let launch = launches_db::get_launch(state.pool(), &id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("launch {id} not found")))?;
    Ok(Json(launch))
}

async fn verify_stations_exist(
    state: &Arc<AppState>,
    associations: &[StationAssociation],
) -> Result<(), ApiError> {
    for assoc in associations {
        if stations_db::get_station(state.pool(), &assoc.station_id)
            .await
            .map_err(internal_error)?
            .is_none()
        {
            return Err(api_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("unknown station {}", assoc.station_id),
            ));
        }
    }
    Ok(())
}

/// Stable (priority, given order) sort so fallback scanning is a plain
/// front-to-back walk.
fn sort_associations(associations: &mut [StationAssociation]) {
    associations.sort_by_key(|a| a.priority);
}
