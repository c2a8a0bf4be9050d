//! Short-horizon trend computation.
//!
//! A trend is the plain endpoint difference of a windowed series scaled to
//! units per hour. No smoothing, no extrapolation: determinism and
//! explainability beat cleverness here.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::models::MeasurementKind;
use crate::snapshot::Snapshot;

/// Rate of change per hour, or `None` when the window holds fewer than two
/// samples or the first and last sample span less than `min_span`.
///
/// An undefined trend is not zero; rules depending on it are skipped.
pub fn trend_per_hour(samples: &[(DateTime<Utc>, f64)], min_span: Duration) -> Option<f64> {
    let (first_at, first) = samples.first()?;
    let (last_at, last) = samples.last()?;
    let span = *last_at - *first_at;
    if span < min_span || span <= Duration::zero() {
        return None;
    }
    let hours = span.num_milliseconds() as f64 / 3_600_000.0;
    Some((last - first) / hours)
}

/// Per-station pressure trends for one snapshot.
///
/// Computed once per evaluation cycle (the TREND stage) so every
/// pressure_trend rule reads the same figures.
#[derive(Debug, Clone, Default)]
pub struct TrendSet {
    pressure: BTreeMap<String, f64>,
}

impl TrendSet {
    /// Pressure trend in hPa per hour for one station lineage.
    pub fn pressure(&self, station_id: &str) -> Option<f64> {
        self.pressure.get(station_id).copied()
    }
}

/// Compute pressure trends for every station in the snapshot.
pub fn compute_trends(snapshot: &Snapshot, min_span: Duration) -> TrendSet {
    let mut pressure = BTreeMap::new();
    for station in &snapshot.stations {
        let series = snapshot.station_series(&station.station_id, MeasurementKind::Pressure);
        if let Some(rate) = trend_per_hour(&series, min_span) {
            pressure.insert(station.station_id.clone(), rate);
        }
    }
    TrendSet { pressure }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    #[test]
    fn test_trend_is_endpoint_difference_per_hour() {
        // 1020 -> 1014 over 3 hours = -2 hPa/h
        let samples = vec![(t(0), 1020.0), (t(90), 1018.5), (t(180), 1014.0)];
        let rate = trend_per_hour(&samples, Duration::minutes(30)).unwrap();
        assert!((rate - (-2.0)).abs() < 1e-9);
    }

    #[test]
    fn test_single_sample_is_undefined() {
        let samples = vec![(t(0), 1020.0)];
        assert_eq!(trend_per_hour(&samples, Duration::minutes(30)), None);
    }

    #[test]
    fn test_span_below_minimum_is_undefined() {
        let samples = vec![(t(0), 1020.0), (t(20), 1019.0)];
        assert_eq!(trend_per_hour(&samples, Duration::minutes(30)), None);
    }

    #[test]
    fn test_span_exactly_minimum_is_defined() {
        let samples = vec![(t(0), 1020.0), (t(30), 1019.0)];
        let rate = trend_per_hour(&samples, Duration::minutes(30)).unwrap();
        assert!((rate - (-2.0)).abs() < 1e-9);
    }

    #[test]
    fn test_empty_window_is_undefined() {
        assert_eq!(trend_per_hour(&[], Duration::minutes(30)), None);
    }
}
