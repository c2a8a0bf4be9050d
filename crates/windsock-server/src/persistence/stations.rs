//! Station persistence operations.

use anyhow::Result;
use sqlx::SqlitePool;

use windsock_core::Station;

use super::parse_timestamp;

pub async fn upsert_station(pool: &SqlitePool, station: &Station) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO stations (id, name, source, latitude, longitude, altitude_m, active, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(id) DO UPDATE SET
            name = ?2, source = ?3, latitude = ?4, longitude = ?5,
            altitude_m = ?6, active = ?7
        "#,
    )
    .bind(&station.id)
    .bind(&station.name)
    .bind(&station.source)
    .bind(station.latitude)
    .bind(station.longitude)
    .bind(station.altitude_m)
    .bind(station.active)
    .bind(station.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn list_stations(pool: &SqlitePool) -> Result<Vec<Station>> {
    let rows = sqlx::query_as::<_, StationRow>(
        "SELECT id, name, source, latitude, longitude, altitude_m, active, created_at FROM stations ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(|r| r.try_into()).collect()
}

pub async fn get_station(pool: &SqlitePool, id: &str) -> Result<Option<Station>> {
    let row = sqlx::query_as::<_, StationRow>(
        "SELECT id, name, source, latitude, longitude, altitude_m, active, created_at FROM stations WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(r) => Ok(Some(r.try_into()?)),
        None => Ok(None),
    }
}

pub async fn delete_station(pool: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM stations WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Active station ids for one provider, used by the collect loop.
pub async fn station_ids_by_source(pool: &SqlitePool, source: &str) -> Result<Vec<String>> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT id FROM stations WHERE source = ?1 AND active = 1 ORDER BY id")
            .bind(source)
            .fetch_all(pool)
            .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

#[derive(sqlx::FromRow)]
struct StationRow {
    id: String,
    name: String,
    source: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    altitude_m: Option<f64>,
    active: bool,
    created_at: String,
}

impl TryFrom<StationRow> for Station {
    type Error = anyhow::Error;

    fn try_from(row: StationRow) -> Result<Self> {
        Ok(Station {
            id: row.id,
            name: row.name,
            source: row.source,
            latitude: row.latitude,
            longitude: row.longitude,
            altitude_m: row.altitude_m,
            active: row.active,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}
