//! SQLite persistence for stations, launches, rules, measurements and
//! decisions.

pub mod db;
pub mod decisions;
pub mod launches;
pub mod measurements;
pub mod rules;
pub mod stations;

pub use db::{init_database, Database};
pub use decisions::DecisionLog;
pub use measurements::MeasurementStore;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Serde-string form of a unit enum (Severity, Operator, kinds) for TEXT
/// columns, so the wire and the database agree on spellings.
pub(crate) fn enum_to_str<T: Serialize>(value: &T) -> Result<String> {
    match serde_json::to_value(value)? {
        Value::String(s) => Ok(s),
        other => Err(anyhow!("expected string-serialized enum, got {other}")),
    }
}

pub(crate) fn enum_from_str<T: DeserializeOwned>(s: &str) -> Result<T> {
    Ok(serde_json::from_value(Value::String(s.to_string()))?)
}

pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .map_err(|e| anyhow!("bad timestamp {s:?}: {e}"))?
        .with_timezone(&Utc))
}
