//! Launch and station-association persistence.

use anyhow::Result;
use sqlx::SqlitePool;

use windsock_core::{Launch, StationAssociation};

use super::parse_timestamp;

pub async fn insert_launch(pool: &SqlitePool, launch: &Launch) -> Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query(
        r#"
        INSERT INTO launches (id, name, latitude, longitude, altitude_m, active, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&launch.id)
    .bind(&launch.name)
    .bind(launch.latitude)
    .bind(launch.longitude)
    .bind(launch.altitude_m)
    .bind(launch.active)
    .bind(launch.created_at.to_rfc3339())
    .execute(&mut *tx)
    .await?;

    for (position, assoc) in launch.stations.iter().enumerate() {
        sqlx::query(
            "INSERT INTO launch_stations (launch_id, station_id, priority, position) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&launch.id)
        .bind(&assoc.station_id)
        .bind(assoc.priority)
        .bind(position as i64)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Replace a launch's station associations, keeping the given order as the
/// new insertion order.
pub async fn replace_associations(
    pool: &SqlitePool,
    launch_id: &str,
    associations: &[StationAssociation],
) -> Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM launch_stations WHERE launch_id = ?1")
        .bind(launch_id)
        .execute(&mut *tx)
        .await?;

    for (position, assoc) in associations.iter().enumerate() {
        sqlx::query(
            "INSERT INTO launch_stations (launch_id, station_id, priority, position) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(launch_id)
        .bind(&assoc.station_id)
        .bind(assoc.priority)
        .bind(position as i64)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

pub async fn get_launch(pool: &SqlitePool, id: &str) -> Result<Option<Launch>> {
    let row = sqlx::query_as::<_, LaunchRow>(
        "SELECT id, name, latitude, longitude, altitude_m, active, created_at FROM launches WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else { return Ok(None) };
    let mut launch: Launch = row.try_into()?;
    launch.stations = load_associations(pool, &launch.id).await?;
    Ok(Some(launch))
}

pub async fn list_launches(pool: &SqlitePool) -> Result<Vec<Launch>> {
    let rows = sqlx::query_as::<_, LaunchRow>(
        "SELECT id, name, latitude, longitude, altitude_m, active, created_at FROM launches ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    let mut launches = Vec::with_capacity(rows.len());
    for row in rows {
        let mut launch: Launch = row.try_into()?;
        launch.stations = load_associations(pool, &launch.id).await?;
        launches.push(launch);
    }
    Ok(launches)
}

/// Active launches that can actually be evaluated (at least one station).
pub async fn list_evaluable_launches(pool: &SqlitePool) -> Result<Vec<Launch>> {
    Ok(list_launches(pool)
        .await?
        .into_iter()
        .filter(|l| l.active && !l.stations.is_empty())
        .collect())
}

pub async fn delete_launch(pool: &SqlitePool, id: &str) -> Result<bool> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM launch_stations WHERE launch_id = ?1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM rules WHERE launch_id = ?1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM launches WHERE id = ?1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(result.rows_affected() > 0)
}

async fn load_associations(pool: &SqlitePool, launch_id: &str) -> Result<Vec<StationAssociation>> {
    let rows: Vec<(String, i32)> = sqlx::query_as(
        "SELECT station_id, priority FROM launch_stations WHERE launch_id = ?1 ORDER BY priority, position",
    )
    .bind(launch_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(station_id, priority)| StationAssociation {
            station_id,
            priority,
        })
        .collect())
}

#[derive(sqlx::FromRow)]
struct LaunchRow {
    id: String,
    name: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    altitude_m: Option<f64>,
    active: bool,
    created_at: String,
}

impl TryFrom<LaunchRow> for Launch {
    type Error = anyhow::Error;

    fn try_from(row: LaunchRow) -> Result<Self> {
        Ok(Launch {
            id: row.id,
            name: row.name,
            latitude: row.latitude,
            longitude: row.longitude,
            altitude_m: row.altitude_m,
            active: row.active,
            stations: Vec::new(),
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}
