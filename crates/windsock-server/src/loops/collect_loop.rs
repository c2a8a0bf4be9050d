//! Periodic weather collection loop.
//!
//! Every collection interval, polls all enabled sources for the stations
//! registered to them, inserts the normalized measurements and refreshes
//! the latest-measurement cache. Only measurements for registered
//! stations are stored; MeteoSwiss in particular returns the whole Swiss
//! network. Consecutive total failures back off exponentially.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{debug, info, warn};

use windsock_collectors::{HolfuyCollector, MeteoSwissCollector, WeatherSource};

use crate::backoff::Backoff;
use crate::persistence::stations as stations_db;
use crate::state::AppState;

const COLLECT_BACKOFF_MAX_SECS: u64 = 900;

pub async fn run_collect_loop(state: Arc<AppState>, mut shutdown: broadcast::Receiver<()>) {
    let interval_secs = state.config().collect_interval_secs;
    let mut ticker = interval(Duration::from_secs(interval_secs.max(1)));
    let mut backoff = Backoff::new(
        Duration::from_secs(interval_secs.max(1)),
        Duration::from_secs(COLLECT_BACKOFF_MAX_SECS),
    );

    let sources: Vec<Box<dyn WeatherSource>> = vec![
        Box::new(MeteoSwissCollector::new()),
        Box::new(HolfuyCollector::new(state.config().holfuy_api_key.clone())),
    ];

    info!(interval_secs, "collect loop started");
    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                info!("collect loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                if !backoff.ready() {
                    continue;
                }
                match collect_once(&state, &sources).await {
                    Ok(stored) => {
                        backoff.reset();
                        info!(stored, "collection cycle complete");
                    }
                    Err(err) => {
                        let delay = backoff.fail();
                        warn!(%err, delay_secs = delay.as_secs(), "collection cycle failed, backing off");
                    }
                }
            }
        }
    }
}

/// One collection pass over all sources. Fails only when every source
/// failed; a single failing provider is a degraded pass, not an error.
async fn collect_once(state: &Arc<AppState>, sources: &[Box<dyn WeatherSource>]) -> Result<usize> {
    let mut stored = 0usize;
    let mut any_success = false;

    for source in sources {
        let station_ids =
            stations_db::station_ids_by_source(state.pool(), source.source_name()).await?;
        if station_ids.is_empty() {
            debug!(source = source.source_name(), "no registered stations, skipping source");
            any_success = true;
            continue;
        }

        let measurements = match source.collect(&station_ids).await {
            Ok(measurements) => measurements,
            Err(err) => {
                warn!(source = source.source_name(), %err, "source failed this cycle");
                continue;
            }
        };
        any_success = true;

        let registered: HashSet<&str> = station_ids.iter().map(|s| s.as_str()).collect();
        for measurement in measurements
            .iter()
            .filter(|m| registered.contains(m.station_id.as_str()))
        {
            state.measurements().insert(measurement).await?;
            state.record_latest(measurement);
            stored += 1;
        }
    }

    if !any_success {
        bail!("all sources failed");
    }
    Ok(stored)
}
