//! Measurement snapshot assembly.
//!
//! Scans a launch's associated stations in priority order and resolves,
//! per measurement kind, the first non-stale reading. Station lookups run
//! concurrently, each bounded by a per-station timeout inside a global
//! snapshot deadline, so one slow or unreachable station never blocks the
//! rest.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, warn};

use crate::models::{Launch, Measurement, MeasurementKind};
use crate::settings::EngineSettings;
use crate::store::{StoreError, TelemetryStore};

/// Resolved value for one measurement kind.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEntry {
    pub value: f64,
    /// Station that supplied the reading
    pub station_id: String,
    /// Age of the reading relative to the snapshot reference time
    pub age: Duration,
}

/// Everything fetched for one station during assembly.
#[derive(Debug, Clone)]
pub struct StationData {
    pub station_id: String,
    /// Most recent measurement at or before the reference time
    pub latest: Option<Measurement>,
    /// Measurements inside the trend window, oldest first
    pub window: Vec<Measurement>,
}

impl StationData {
    fn empty(station_id: String) -> Self {
        Self {
            station_id,
            latest: None,
            window: Vec::new(),
        }
    }
}

/// Outcome of looking a station's reading up in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StationReading {
    Fresh(f64),
    /// The station reported the kind, but the reading is too old
    Stale,
    /// The station never reported the kind (or returned no data at all)
    Missing,
}

/// The resolved set of current values for a launch at one reference time.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub taken_at: DateTime<Utc>,
    /// Readings strictly older than this are stale
    pub max_age: Duration,
    /// Per-station data, in association priority order
    pub stations: Vec<StationData>,
    entries: BTreeMap<MeasurementKind, SnapshotEntry>,
}

impl Snapshot {
    /// The resolved entry for a kind, if any station supplied one.
    pub fn get(&self, kind: MeasurementKind) -> Option<&SnapshotEntry> {
        self.entries.get(&kind)
    }

    pub fn entries(&self) -> impl Iterator<Item = (MeasurementKind, &SnapshotEntry)> {
        self.entries.iter().map(|(k, e)| (*k, e))
    }

    /// True when no station returned any measurement at all.
    pub fn is_empty(&self) -> bool {
        self.stations.iter().all(|s| s.latest.is_none())
    }

    pub fn station(&self, station_id: &str) -> Option<&StationData> {
        self.stations.iter().find(|s| s.station_id == station_id)
    }

    /// One named station's own reading for a kind, with freshness applied.
    ///
    /// Used by rules that pin a station and therefore bypass fallback.
    pub fn station_reading(&self, station_id: &str, kind: MeasurementKind) -> StationReading {
        let Some(latest) = self.station(station_id).and_then(|s| s.latest.as_ref()) else {
            return StationReading::Missing;
        };
        let Some(value) = latest.value(kind) else {
            return StationReading::Missing;
        };
        if self.taken_at - latest.observed_at > self.max_age {
            StationReading::Stale
        } else {
            StationReading::Fresh(value)
        }
    }

    /// Time series of one kind from one station's window, oldest first.
    pub fn station_series(&self, station_id: &str, kind: MeasurementKind) -> Vec<(DateTime<Utc>, f64)> {
        self.station(station_id)
            .map(|s| {
                s.window
                    .iter()
                    .filter_map(|m| m.value(kind).map(|v| (m.observed_at, v)))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Assemble a snapshot for a launch at reference time `at`.
///
/// A failed or timed-out station is treated as having no data; its kinds
/// stay absent. Kinds no station provides are absent too, which is a valid
/// degraded snapshot rather than an error.
pub async fn build_snapshot(
    store: &Arc<dyn TelemetryStore>,
    launch: &Launch,
    at: DateTime<Utc>,
    settings: &EngineSettings,
) -> Snapshot {
    let window_start = at - settings.trend_window();
    let mut pending: FuturesUnordered<_> = launch
        .stations
        .iter()
        .map(|assoc| {
            let store = Arc::clone(store);
            let station_id = assoc.station_id.clone();
            let timeout = settings.station_timeout;
            async move {
                let result = tokio::time::timeout(
                    timeout,
                    fetch_station(store.as_ref(), &station_id, window_start, at),
                )
                .await;
                (station_id, result)
            }
        })
        .collect();

    let mut fetched: HashMap<String, StationData> = HashMap::new();
    let deadline = tokio::time::sleep(settings.snapshot_deadline);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => {
                warn!(
                    launch_id = %launch.id,
                    outstanding = pending.len(),
                    "snapshot deadline elapsed, abandoning remaining station lookups"
                );
                break;
            }
            next = pending.next() => match next {
                Some((station_id, Ok(Ok(data)))) => {
                    fetched.insert(station_id, data);
                }
                Some((station_id, Ok(Err(err)))) => {
                    warn!(%station_id, %err, "station unreachable, proceeding without it");
                }
                Some((station_id, Err(_))) => {
                    warn!(%station_id, "station lookup timed out, proceeding without it");
                }
                None => break,
            }
        }
    }

    // Association order is already (priority, insertion) sorted.
    let stations: Vec<StationData> = launch
        .stations
        .iter()
        .map(|assoc| {
            fetched
                .remove(&assoc.station_id)
                .unwrap_or_else(|| StationData::empty(assoc.station_id.clone()))
        })
        .collect();

    let max_age = settings.max_age();
    let mut entries = BTreeMap::new();
    for kind in MeasurementKind::ALL {
        for station in &stations {
            let Some(latest) = &station.latest else { continue };
            let Some(value) = latest.value(kind) else { continue };
            let age = at - latest.observed_at;
            if age > max_age {
                debug!(
                    station_id = %station.station_id,
                    %kind,
                    age_secs = age.num_seconds(),
                    "skipping stale reading during fallback"
                );
                continue;
            }
            entries.insert(
                kind,
                SnapshotEntry {
                    value,
                    station_id: station.station_id.clone(),
                    age,
                },
            );
            break;
        }
    }

    Snapshot {
        taken_at: at,
        max_age,
        stations,
        entries,
    }
}

async fn fetch_station(
    store: &dyn TelemetryStore,
    station_id: &str,
    window_start: DateTime<Utc>,
    at: DateTime<Utc>,
) -> Result<StationData, StoreError> {
    let latest = store.latest_measurement(station_id, at).await?;
    let window = store.measurements_between(station_id, window_start, at).await?;
    Ok(StationData {
        station_id: station_id.to_string(),
        latest,
        window,
    })
}
