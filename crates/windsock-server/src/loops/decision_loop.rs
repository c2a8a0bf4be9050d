//! Periodic decision loop.
//!
//! Re-evaluates every active launch that has at least one associated
//! station on the collection cadence, so history records a decision per
//! cycle even when nobody polls the API. Severity transitions are logged
//! at a higher level than steady states.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{debug, info, warn};

use windsock_core::Severity;

use crate::persistence::{launches as launches_db, rules as rules_db};
use crate::state::AppState;

pub async fn run_decision_loop(state: Arc<AppState>, mut shutdown: broadcast::Receiver<()>) {
    let interval_secs = state.config().collect_interval_secs;
    let mut ticker = interval(Duration::from_secs(interval_secs.max(1)));
    let mut last_severity: HashMap<String, Severity> = HashMap::new();

    info!(interval_secs, "decision loop started");
    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                info!("decision loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                evaluate_all(&state, &mut last_severity).await;
            }
        }
    }
}

async fn evaluate_all(state: &Arc<AppState>, last_severity: &mut HashMap<String, Severity>) {
    let launches = match launches_db::list_evaluable_launches(state.pool()).await {
        Ok(launches) => launches,
        Err(err) => {
            warn!(%err, "failed to list launches, skipping cycle");
            return;
        }
    };

    for launch in launches {
        let rules = match rules_db::active_rules_for_launch(state.pool(), &launch.id).await {
            Ok(rules) => rules,
            Err(err) => {
                warn!(launch_id = %launch.id, %err, "failed to load rules");
                continue;
            }
        };

        match state.engine().evaluate(&launch, &rules).await {
            Ok(decision) => {
                let previous = last_severity.insert(launch.id.clone(), decision.severity);
                if previous.is_some_and(|p| p != decision.severity) {
                    info!(
                        launch_id = %launch.id,
                        launch = %launch.name,
                        from = %previous.unwrap_or_default(),
                        to = %decision.severity,
                        "severity changed"
                    );
                } else {
                    debug!(launch_id = %launch.id, severity = %decision.severity, "decision recorded");
                }
            }
            Err(err) => {
                warn!(launch_id = %launch.id, %err, "evaluation failed");
            }
        }
    }
}
