//! Shared application state.

use dashmap::DashMap;
use std::sync::Arc;

use windsock_core::{DecisionEngine, Measurement};

use crate::config::Config;
use crate::persistence::{Database, DecisionLog, MeasurementStore};

/// Thread-safe state shared by the API handlers and background loops.
pub struct AppState {
    db: Database,
    config: Config,
    engine: DecisionEngine,
    measurements: MeasurementStore,
    decisions: DecisionLog,
    /// Latest measurement per station, written through on ingest
    latest: DashMap<String, Measurement>,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        let measurements = MeasurementStore::new(db.pool().clone());
        let decisions = DecisionLog::new(db.pool().clone());
        let engine = DecisionEngine::new(
            Arc::new(measurements.clone()),
            Arc::new(decisions.clone()),
            config.engine_settings(),
        );
        Self {
            db,
            config,
            engine,
            measurements,
            decisions,
            latest: DashMap::new(),
        }
    }

    pub fn pool(&self) -> &sqlx::SqlitePool {
        self.db.pool()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    pub fn measurements(&self) -> &MeasurementStore {
        &self.measurements
    }

    pub fn decisions(&self) -> &DecisionLog {
        &self.decisions
    }

    /// Cache a measurement if it is newer than what we hold.
    pub fn record_latest(&self, measurement: &Measurement) {
        self.latest
            .entry(measurement.station_id.clone())
            .and_modify(|current| {
                if measurement.observed_at >= current.observed_at {
                    *current = measurement.clone();
                }
            })
            .or_insert_with(|| measurement.clone());
    }

    pub fn latest_cached(&self, station_id: &str) -> Option<Measurement> {
        self.latest.get(station_id).map(|r| r.value().clone())
    }
}
