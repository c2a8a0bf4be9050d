//! Measurement persistence; implements the engine's telemetry seam.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use windsock_core::{Measurement, StoreError, TelemetryStore};

use super::parse_timestamp;

/// Append-only measurement store backed by SQLite.
#[derive(Clone)]
pub struct MeasurementStore {
    pool: SqlitePool,
}

impl MeasurementStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, measurement: &Measurement) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO measurements (
                station_id, source, observed_at,
                wind_speed, wind_direction, gust_speed, gust_direction,
                temperature, humidity, pressure, rain
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&measurement.station_id)
        .bind(&measurement.source)
        .bind(measurement.observed_at.to_rfc3339())
        .bind(measurement.wind_speed)
        .bind(measurement.wind_direction)
        .bind(measurement.gust_speed)
        .bind(measurement.gust_direction)
        .bind(measurement.temperature)
        .bind(measurement.humidity)
        .bind(measurement.pressure)
        .bind(measurement.rain)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn insert_batch(&self, measurements: &[Measurement]) -> Result<usize> {
        let mut inserted = 0;
        for measurement in measurements {
            self.insert(measurement).await?;
            inserted += 1;
        }
        Ok(inserted)
    }

    pub async fn latest(&self, station_id: &str, at: DateTime<Utc>) -> Result<Option<Measurement>> {
        let row = sqlx::query_as::<_, MeasurementRow>(&select(
            "WHERE station_id = ?1 AND observed_at <= ?2 ORDER BY observed_at DESC LIMIT 1",
        ))
        .bind(station_id)
        .bind(at.to_rfc3339())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(r.try_into()?)),
            None => Ok(None),
        }
    }

    pub async fn between(
        &self,
        station_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Measurement>> {
        let rows = sqlx::query_as::<_, MeasurementRow>(&select(
            "WHERE station_id = ?1 AND observed_at >= ?2 AND observed_at <= ?3 ORDER BY observed_at",
        ))
        .bind(station_id)
        .bind(from.to_rfc3339())
        .bind(to.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }
}

#[async_trait]
impl TelemetryStore for MeasurementStore {
    async fn latest_measurement(
        &self,
        station_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Measurement>, StoreError> {
        self.latest(station_id, at)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    async fn measurements_between(
        &self,
        station_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Measurement>, StoreError> {
        self.between(station_id, from, to)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))
    }
}

fn select(suffix: &str) -> String {
    format!(
        "SELECT station_id, source, observed_at, wind_speed, wind_direction, \
         gust_speed, gust_direction, temperature, humidity, pressure, rain \
         FROM measurements {suffix}"
    )
}

#[derive(sqlx::FromRow)]
struct MeasurementRow {
    station_id: String,
    source: String,
    observed_at: String,
    wind_speed: Option<f64>,
    wind_direction: Option<f64>,
    gust_speed: Option<f64>,
    gust_direction: Option<f64>,
    temperature: Option<f64>,
    humidity: Option<f64>,
    pressure: Option<f64>,
    rain: Option<f64>,
}

impl TryFrom<MeasurementRow> for Measurement {
    type Error = anyhow::Error;

    fn try_from(row: MeasurementRow) -> Result<Self> {
        Ok(Measurement {
            station_id: row.station_id,
            source: row.source,
            observed_at: parse_timestamp(&row.observed_at)?,
            wind_speed: row.wind_speed,
            wind_direction: row.wind_direction,
            gust_speed: row.gust_speed,
            gust_direction: row.gust_direction,
            temperature: row.temperature,
            humidity: row.humidity,
            pressure: row.pressure,
            rain: row.rain,
        })
    }
}
