//! Engine configuration.

use std::time::Duration;

/// Tunable parameters for the decision engine.
///
/// Built once by the host (server, tests) and passed in at engine
/// construction; the engine never reads the environment itself.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Cadence at which collectors write new measurements
    pub collection_interval: Duration,
    /// Staleness cut = collection_interval x staleness_multiplier
    pub staleness_multiplier: f64,
    /// How far back the trend calculator looks
    pub trend_window: Duration,
    /// Minimum span the first and last sample of a window must cover
    /// for the trend to be defined
    pub trend_min_span: Duration,
    /// Fraction of associated stations that must independently agree
    /// for a multi_station rule to trigger
    pub quorum: f64,
    /// Budget for a single station lookup during snapshot assembly
    pub station_timeout: Duration,
    /// Budget for assembling one whole snapshot
    pub snapshot_deadline: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            collection_interval: Duration::from_secs(600),
            staleness_multiplier: 2.0,
            trend_window: Duration::from_secs(3 * 3600),
            trend_min_span: Duration::from_secs(30 * 60),
            quorum: 0.5,
            station_timeout: Duration::from_millis(5000),
            snapshot_deadline: Duration::from_millis(10_000),
        }
    }
}

impl EngineSettings {
    /// Maximum age of a reading before it is considered stale.
    ///
    /// A reading exactly this old is still fresh; stale means strictly
    /// older.
    pub fn max_age(&self) -> chrono::Duration {
        to_chrono(self.collection_interval.mul_f64(self.staleness_multiplier.max(0.0)))
    }

    pub fn trend_window(&self) -> chrono::Duration {
        to_chrono(self.trend_window)
    }

    pub fn trend_min_span(&self) -> chrono::Duration {
        to_chrono(self.trend_min_span)
    }
}

fn to_chrono(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or_else(|_| chrono::Duration::seconds(i64::MAX / 2))
}
