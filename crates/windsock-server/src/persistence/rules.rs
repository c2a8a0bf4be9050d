//! Rule persistence operations.

use anyhow::Result;
use sqlx::SqlitePool;

use windsock_core::Rule;

use super::{enum_from_str, enum_to_str, parse_timestamp};

pub async fn insert_rule(pool: &SqlitePool, rule: &Rule) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO rules (
            id, launch_id, kind, measurement, station_id,
            operator, threshold_value, threshold_value_max,
            severity, priority, active, description, created_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
    )
    .bind(&rule.id)
    .bind(&rule.launch_id)
    .bind(enum_to_str(&rule.kind)?)
    .bind(rule.measurement.map(|m| m.as_str()))
    .bind(&rule.station_id)
    .bind(enum_to_str(&rule.operator)?)
    .bind(rule.threshold_value)
    .bind(rule.threshold_value_max)
    .bind(enum_to_str(&rule.severity)?)
    .bind(rule.priority)
    .bind(rule.active)
    .bind(&rule.description)
    .bind(rule.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn update_rule(pool: &SqlitePool, rule: &Rule) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE rules SET
            kind = ?2, measurement = ?3, station_id = ?4,
            operator = ?5, threshold_value = ?6, threshold_value_max = ?7,
            severity = ?8, priority = ?9, active = ?10, description = ?11
        WHERE id = ?1
        "#,
    )
    .bind(&rule.id)
    .bind(enum_to_str(&rule.kind)?)
    .bind(rule.measurement.map(|m| m.as_str()))
    .bind(&rule.station_id)
    .bind(enum_to_str(&rule.operator)?)
    .bind(rule.threshold_value)
    .bind(rule.threshold_value_max)
    .bind(enum_to_str(&rule.severity)?)
    .bind(rule.priority)
    .bind(rule.active)
    .bind(&rule.description)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn get_rule(pool: &SqlitePool, id: &str) -> Result<Option<Rule>> {
    let row = sqlx::query_as::<_, RuleRow>(&select("WHERE id = ?1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(r) => Ok(Some(r.try_into()?)),
        None => Ok(None),
    }
}

pub async fn rules_for_launch(pool: &SqlitePool, launch_id: &str) -> Result<Vec<Rule>> {
    let rows = sqlx::query_as::<_, RuleRow>(&select(
        "WHERE launch_id = ?1 ORDER BY priority DESC, created_at",
    ))
    .bind(launch_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(|r| r.try_into()).collect()
}

pub async fn active_rules_for_launch(pool: &SqlitePool, launch_id: &str) -> Result<Vec<Rule>> {
    Ok(rules_for_launch(pool, launch_id)
        .await?
        .into_iter()
        .filter(|r| r.active)
        .collect())
}

pub async fn delete_rule(pool: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM rules WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

fn select(suffix: &str) -> String {
    format!(
        "SELECT id, launch_id, kind, measurement, station_id, operator, \
         threshold_value, threshold_value_max, severity, priority, active, \
         description, created_at FROM rules {suffix}"
    )
}

#[derive(sqlx::FromRow)]
struct RuleRow {
    id: String,
    launch_id: String,
    kind: String,
    measurement: Option<String>,
    station_id: Option<String>,
    operator: String,
    threshold_value: f64,
    threshold_value_max: Option<f64>,
    severity: String,
    priority: i32,
    active: bool,
    description: Option<String>,
    created_at: String,
}

impl TryFrom<RuleRow> for Rule {
    type Error = anyhow::Error;

    fn try_from(row: RuleRow) -> Result<Self> {
        Ok(Rule {
            id: row.id,
            launch_id: row.launch_id,
            kind: enum_from_str(&row.kind)?,
            measurement: row.measurement.as_deref().map(enum_from_str).transpose()?,
            station_id: row.station_id,
            operator: enum_from_str(&row.operator)?,
            threshold_value: row.threshold_value,
            threshold_value_max: row.threshold_value_max,
            severity: enum_from_str(&row.severity)?,
            priority: row.priority,
            active: row.active,
            description: row.description,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}
