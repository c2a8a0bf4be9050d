//! Rule endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use windsock_core::{MeasurementKind, Operator, Rule, RuleKind, Severity};

use crate::api::{api_error, internal_error, ApiError};
use crate::persistence::{launches as launches_db, rules as rules_db, stations as stations_db};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RuleRequest {
    pub launch_id: String,
    pub kind: RuleKind,
    #[serde(default)]
    pub measurement: Option<MeasurementKind>,
    #[serde(default)]
    pub station_id: Option<String>,
    pub operator: Operator,
    pub threshold_value: f64,
    #[serde(default)]
    pub threshold_value_max: Option<f64>,
    pub severity: Severity,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_priority() -> i32 {
    1
}

fn default_active() -> bool {
    true
}

pub async fn create_rule(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RuleRequest>,
) -> Result<(StatusCode, Json<Rule>), ApiError> {
    validate_rule(&state, &req).await?;

    let rule = Rule {
        id: Uuid::new_v4().to_string(),
        launch_id: req.launch_id,
        kind: req.kind,
        measurement: req.measurement,
        station_id: req.station_id,
        operator: req.operator,
        threshold_value: req.threshold_value,
        threshold_value_max: req.threshold_value_max,
        severity: req.severity,
        priority: req.priority,
        active: req.active,
        description: req.description,
        created_at: Utc::now(),
    };

    rules_db::insert_rule(state.pool(), &rule)
        .await
        .map_err(internal_error)?;
    tracing::info!(rule_id = %rule.id, launch_id = %rule.launch_id, kind = %rule.kind, "created rule");

    Ok((StatusCode::CREATED, Json(rule)))
}

pub async fn get_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Rule>, ApiError> {
    rules_db::get_rule(state.pool(), &id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("rule {id} not found")))
}

pub async fn update_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RuleRequest>,
) -> Result<Json<Rule>, ApiError> {
    let existing = rules_db::get_rule(state.pool(), &id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("rule {id} not found")))?;
    if existing.launch_id != req.launch_id {
        return Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "a rule cannot move to another launch",
        ));
    }
    validate_rule(&state, &req).await?;

    let rule = Rule {
        id,
        launch_id: req.launch_id,
        kind: req.kind,
        measurement: req.measurement,
        station_id: req.station_id,
        operator: req.operator,
        threshold_value: req.threshold_value,
        threshold_value_max: req.threshold_value_max,
        severity: req.severity,
        priority: req.priority,
        active: req.active,
        description: req.description,
        created_at: existing.created_at,
    };

    rules_db::update_rule(state.pool(), &rule)
        .await
        .map_err(internal_error)?;
    Ok(Json(rule))
}

pub async fn delete_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let deleted = rules_db::delete_rule(state.pool(), &id)
        .await
        .map_err(internal_error)?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(api_error(StatusCode::NOT_FOUND, format!("rule {id} not found")))
    }
}

pub async fn list_launch_rules(
    State(state): State<Arc<AppState>>,
    Path(launch_id): Path<String>,
) -> Result<Json<Vec<Rule>>, ApiError> {
    if launches_db::get_launch(state.pool(), &launch_id)
        .await
        .map_err(internal_error)?
        .is_none()
    {
        return Err(api_error(StatusCode::NOT_FOUND, format!("launch {launch_id} not found")));
    }
    let rules = rules_db::rules_for_launch(state.pool(), &launch_id)
        .await
        .map_err(internal_error)?;
    Ok(Json(rules))
}

async fn validate_rule(state: &Arc<AppState>, req: &RuleRequest) -> Result<(), ApiError> {
    if launches_db::get_launch(state.pool(), &req.launch_id)
        .await
        .map_err(internal_error)?
        .is_none()
    {
        return Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("unknown launch {}", req.launch_id),
        ));
    }
    if !(1..=10).contains(&req.priority) {
        return Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "priority must be between 1 and 10",
        ));
    }
    if req.operator.needs_max() && req.threshold_value_max.is_none() {
        return Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("operator {} requires threshold_value_max", req.operator),
        ));
    }
    if req.kind == RuleKind::MultiStation && req.measurement.is_none() {
        return Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "multi_station rules require a measurement",
        ));
    }
    if let Some(station_id) = &req.station_id {
        if stations_db::get_station(state.pool(), station_id)
            .await
            .map_err(internal_error)?
            .is_none()
        {
            return Err(api_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("unknown station {station_id}"),
            ));
        }
    }
    Ok(())
}
