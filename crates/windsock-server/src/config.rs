//! Server configuration from environment.

use std::env;
use std::time::Duration;

use windsock_core::EngineSettings;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_path: String,
    pub database_max_connections: u32,
    pub collect_interval_secs: u64,
    pub staleness_multiplier: f64,
    pub trend_window_secs: u64,
    pub trend_min_span_secs: u64,
    pub quorum: f64,
    pub station_timeout_ms: u64,
    pub snapshot_deadline_ms: u64,
    pub holfuy_api_key: Option<String>,
    pub disable_collectors: bool,
    pub disable_decision_loop: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env::var("WINDSOCK_BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            database_path: env::var("WINDSOCK_DB_PATH")
                .unwrap_or_else(|_| "data/windsock.db".to_string()),
            database_max_connections: env::var("WINDSOCK_DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            collect_interval_secs: env::var("WINDSOCK_COLLECT_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(600),
            staleness_multiplier: env::var("WINDSOCK_STALENESS_MULTIPLIER")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2.0),
            trend_window_secs: env::var("WINDSOCK_TREND_WINDOW_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10_800),
            trend_min_span_secs: env::var("WINDSOCK_TREND_MIN_SPAN_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1800),
            quorum: env::var("WINDSOCK_QUORUM")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.5),
            station_timeout_ms: env::var("WINDSOCK_STATION_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5000),
            snapshot_deadline_ms: env::var("WINDSOCK_SNAPSHOT_DEADLINE_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10_000),
            holfuy_api_key: env::var("WINDSOCK_HOLFUY_API_KEY").ok(),
            disable_collectors: env_flag("WINDSOCK_DISABLE_COLLECTORS"),
            disable_decision_loop: env_flag("WINDSOCK_DISABLE_DECISION_LOOP"),
        }
    }

    /// Engine settings derived from this configuration.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            collection_interval: Duration::from_secs(self.collect_interval_secs),
            staleness_multiplier: self.staleness_multiplier,
            trend_window: Duration::from_secs(self.trend_window_secs),
            trend_min_span: Duration::from_secs(self.trend_min_span_secs),
            quorum: self.quorum,
            station_timeout: Duration::from_millis(self.station_timeout_ms),
            snapshot_deadline: Duration::from_millis(self.snapshot_deadline_ms),
        }
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|s| matches!(s.as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
