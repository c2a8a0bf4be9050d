//! The collector capability seam.
//!
//! Every provider implements the same fetch -> normalize contract over a
//! raw JSON payload; the rest of the system only ever sees the trait and
//! the normalized [`Measurement`] shape.

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use windsock_core::Measurement;

use crate::error::CollectorError;

/// A weather data source that can be polled for normalized measurements.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Stable name recorded in `Measurement::source` (holfuy, meteoswiss).
    fn source_name(&self) -> &'static str;

    /// Fetch raw provider data.
    ///
    /// `station_ids` is advisory: per-station providers fetch exactly
    /// these, network-wide providers may ignore the list and return
    /// everything (the caller filters).
    async fn fetch(&self, station_ids: &[String]) -> Result<Value, CollectorError>;

    /// Convert a raw payload into normalized measurements.
    ///
    /// Records that cannot be normalized are logged and dropped, never
    /// propagated as errors.
    fn normalize(&self, raw: &Value) -> Vec<Measurement>;

    /// Fetch and normalize in one step.
    async fn collect(&self, station_ids: &[String]) -> Result<Vec<Measurement>, CollectorError> {
        info!(source = self.source_name(), "starting collection");
        let raw = self.fetch(station_ids).await?;
        let measurements = self.normalize(&raw);
        info!(
            source = self.source_name(),
            count = measurements.len(),
            "collection finished"
        );
        Ok(measurements)
    }
}

pub fn kmh_to_ms(kmh: f64) -> f64 {
    kmh / 3.6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kmh_to_ms() {
        assert!((kmh_to_ms(36.0) - 10.0).abs() < 1e-9);
        assert_eq!(kmh_to_ms(0.0), 0.0);
    }
}
