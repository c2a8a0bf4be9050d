//! Decision endpoints: on-demand evaluation and history.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;

use windsock_core::{Decision, EngineError};

use crate::api::{api_error, internal_error, ApiError};
use crate::persistence::{launches as launches_db, rules as rules_db};
use crate::state::AppState;

/// Evaluate a launch right now. The decision is appended to history and
/// returned; a persistence failure inside the engine still returns the
/// computed decision.
pub async fn evaluate_launch(
    State(state): State<Arc<AppState>>,
    Path(launch_id): Path<String>,
) -> Result<Json<Decision>, ApiError> {
    let launch = launches_db::get_launch(state.pool(), &launch_id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("launch {launch_id} not found")))?;

    let rules = rules_db::active_rules_for_launch(state.pool(), &launch_id)
        .await
        .map_err(internal_error)?;

    match state.engine().evaluate(&launch, &rules).await {
        Ok(decision) => Ok(Json(decision)),
        Err(EngineError::NoStations(id)) => Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("launch {id} has no associated stations"),
        )),
        Err(EngineError::Store(err)) => Err(internal_error(err.into())),
    }
}

#[derive(Debug, Deserialize)]
pub struct DecisionHistoryQuery {
    #[serde(default = "default_hours")]
    pub hours: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_hours() -> i64 {
    24
}

fn default_limit() -> i64 {
    100
}

pub async fn decision_history(
    State(state): State<Arc<AppState>>,
    Path(launch_id): Path<String>,
    Query(query): Query<DecisionHistoryQuery>,
) -> Result<Json<Vec<Decision>>, ApiError> {
    if launches_db::get_launch(state.pool(), &launch_id)
        .await
        .map_err(internal_error)?
        .is_none()
    {
        return Err(api_error(StatusCode::NOT_FOUND, format!("launch {launch_id} not found")));
    }

    let hours = query.hours.clamp(1, 24 * 90);
    let limit = query.limit.clamp(1, 1000);
    let decisions = state
        .decisions()
        .history(&launch_id, Utc::now() - Duration::hours(hours), limit)
        .await
        .map_err(internal_error)?;
    Ok(Json(decisions))
}
