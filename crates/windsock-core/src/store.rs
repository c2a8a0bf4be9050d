//! Store traits the engine depends on.
//!
//! The engine never talks to a database or an HTTP endpoint directly; it
//! reads measurements through [`TelemetryStore`] and appends decisions
//! through [`DecisionStore`]. Hosts inject concrete implementations at
//! construction time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{Decision, Measurement};

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing source could not be reached at all.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// The source answered but the query failed.
    #[error("query failed: {0}")]
    Query(String),
}

/// Read-only access to the normalized measurement stream.
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Most recent measurement for a station at or before `at`.
    async fn latest_measurement(
        &self,
        station_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Measurement>, StoreError>;

    /// All measurements for a station inside `[from, to]`, oldest first.
    async fn measurements_between(
        &self,
        station_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Measurement>, StoreError>;
}

/// Append-only sink for resolved decisions.
#[async_trait]
pub trait DecisionStore: Send + Sync {
    async fn append_decision(&self, decision: &Decision) -> Result<(), StoreError>;
}
