//! Decision engine orchestration.
//!
//! One evaluation runs the stages COLLECT -> TREND -> EVALUATE -> RESOLVE
//! -> PERSIST in order. Concurrent launches are independent; rule and
//! station data are taken as read-only snapshots by the caller before the
//! cycle starts, so an edit mid-evaluation only affects the next cycle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::evaluate::evaluate_rule;
use crate::models::{Decision, Launch, Rule, RuleOutcome};
use crate::resolve::resolve_decision;
use crate::settings::EngineSettings;
use crate::snapshot::build_snapshot;
use crate::store::{DecisionStore, StoreError, TelemetryStore};
use crate::trend::compute_trends;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration fault, distinct from data absence: the launch cannot
    /// be evaluated at all and no decision record is written.
    #[error("launch {0} has no associated stations")]
    NoStations(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Runs evaluation cycles for launches.
///
/// Holds injected store collaborators and the settings; carries no
/// per-launch mutable state, so one engine instance serves all launches
/// and concurrent evaluations.
pub struct DecisionEngine {
    telemetry: Arc<dyn TelemetryStore>,
    decisions: Arc<dyn DecisionStore>,
    settings: EngineSettings,
}

impl DecisionEngine {
    pub fn new(
        telemetry: Arc<dyn TelemetryStore>,
        decisions: Arc<dyn DecisionStore>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            telemetry,
            decisions,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Evaluate a launch against its rules at the current time.
    pub async fn evaluate(&self, launch: &Launch, rules: &[Rule]) -> Result<Decision, EngineError> {
        self.evaluate_at(launch, rules, Utc::now()).await
    }

    /// Evaluate at an explicit reference time.
    ///
    /// The decision is appended to the decision store; a persistence
    /// failure is logged and the computed decision is still returned.
    pub async fn evaluate_at(
        &self,
        launch: &Launch,
        rules: &[Rule],
        at: DateTime<Utc>,
    ) -> Result<Decision, EngineError> {
        if launch.stations.is_empty() {
            error!(launch_id = %launch.id, "cannot evaluate launch without associated stations");
            return Err(EngineError::NoStations(launch.id.clone()));
        }

        // COLLECT
        let snapshot = build_snapshot(&self.telemetry, launch, at, &self.settings).await;
        debug!(
            launch_id = %launch.id,
            resolved_kinds = snapshot.entries().count(),
            "snapshot assembled"
        );

        // TREND
        let trends = compute_trends(&snapshot, self.settings.trend_min_span());

        // EVALUATE
        let active: Vec<&Rule> = rules
            .iter()
            .filter(|r| r.active && r.launch_id == launch.id)
            .collect();
        let outcomes: Vec<RuleOutcome> = active
            .iter()
            .map(|rule| evaluate_rule(rule, &snapshot, &trends, &self.settings))
            .collect();

        // RESOLVE
        let decision = resolve_decision(
            Uuid::new_v4().to_string(),
            &launch.id,
            &outcomes,
            !snapshot.is_empty(),
            at,
        );
        info!(
            launch_id = %launch.id,
            severity = %decision.severity,
            triggered = outcomes.iter().filter(|o| o.triggered).count(),
            skipped = outcomes.iter().filter(|o| o.skipped.is_some()).count(),
            "decision resolved"
        );

        // PERSIST
        if let Err(err) = self.decisions.append_decision(&decision).await {
            error!(
                launch_id = %launch.id,
                %err,
                "failed to persist decision, returning unpersisted result"
            );
        }

        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        FactorValue, Measurement, MeasurementKind, Operator, RuleKind, Severity,
        StationAssociation,
    };
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use std::sync::Mutex;

    struct FakeTelemetry(Vec<Measurement>);

    #[async_trait]
    impl TelemetryStore for FakeTelemetry {
        async fn latest_measurement(
            &self,
            station_id: &str,
            at: DateTime<Utc>,
        ) -> Result<Option<Measurement>, StoreError> {
            Ok(self
                .0
                .iter()
                .filter(|m| m.station_id == station_id && m.observed_at <= at)
                .max_by_key(|m| m.observed_at)
                .cloned())
        }

        async fn measurements_between(
            &self,
            station_id: &str,
            from: DateTime<Utc>,
            to: DateTime<Utc>,
        ) -> Result<Vec<Measurement>, StoreError> {
            let mut rows: Vec<Measurement> = self
                .0
                .iter()
                .filter(|m| {
                    m.station_id == station_id && m.observed_at >= from && m.observed_at <= to
                })
                .cloned()
                .collect();
            rows.sort_by_key(|m| m.observed_at);
            Ok(rows)
        }
    }

    #[derive(Default)]
    struct FakeDecisions {
        appended: Mutex<Vec<Decision>>,
        fail: bool,
    }

    #[async_trait]
    impl DecisionStore for FakeDecisions {
        async fn append_decision(&self, decision: &Decision) -> Result<(), StoreError> {
            if self.fail {
                return Err(StoreError::Unavailable("decision log down".into()));
            }
            self.appended.lock().unwrap().push(decision.clone());
            Ok(())
        }
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
    }

    fn launch(stations: &[&str]) -> Launch {
        Launch {
            id: "l1".into(),
            name: "Test Launch".into(),
            latitude: None,
            longitude: None,
            altitude_m: None,
            active: true,
            stations: stations
                .iter()
                .enumerate()
                .map(|(i, id)| StationAssociation {
                    station_id: (*id).to_string(),
                    priority: i as i32 + 1,
                })
                .collect(),
            created_at: at(),
        }
    }

    fn rule(id: &str, kind: RuleKind, op: Operator, threshold: f64, severity: Severity, priority: i32) -> Rule {
        Rule {
            id: id.into(),
            launch_id: "l1".into(),
            kind,
            measurement: None,
            station_id: None,
            operator: op,
            threshold_value: threshold,
            threshold_value_max: None,
            severity,
            priority,
            active: true,
            description: None,
            created_at: at(),
        }
    }

    fn engine(measurements: Vec<Measurement>, decisions: Arc<FakeDecisions>) -> DecisionEngine {
        DecisionEngine::new(
            Arc::new(FakeTelemetry(measurements)),
            decisions,
            EngineSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let mut m = Measurement::new("S1", "manual", at() - Duration::minutes(2));
        m.set(MeasurementKind::WindSpeed, 14.0);
        m.set(MeasurementKind::GustSpeed, 20.0);

        let decisions = Arc::new(FakeDecisions::default());
        let engine = engine(vec![m], decisions.clone());
        let rules = vec![
            rule("r1", RuleKind::WindSpeed, Operator::GreaterThan, 12.0, Severity::Red, 5),
            rule("r2", RuleKind::GustSpeed, Operator::GreaterThan, 18.0, Severity::Orange, 3),
        ];

        let decision = engine
            .evaluate_at(&launch(&["S1", "S2"]), &rules, at())
            .await
            .unwrap();

        assert_eq!(decision.severity, Severity::Red);
        assert_eq!(decision.factor("wind_speed"), Some(&FactorValue::Number(14.0)));
        assert_eq!(decision.factor("gust_speed"), Some(&FactorValue::Number(20.0)));
        assert_eq!(
            decision.factor("wind_speed_station"),
            Some(&FactorValue::Text("S1".into()))
        );
        assert_eq!(
            decision.factor("gust_speed_station"),
            Some(&FactorValue::Text("S1".into()))
        );

        // PERSIST stage ran.
        let appended = decisions.appended.lock().unwrap();
        assert_eq!(appended.len(), 1);
        assert_eq!(appended[0].severity, Severity::Red);
    }

    #[tokio::test]
    async fn test_no_stations_is_a_configuration_fault() {
        let decisions = Arc::new(FakeDecisions::default());
        let engine = engine(vec![], decisions.clone());

        let err = engine.evaluate_at(&launch(&[]), &[], at()).await.unwrap_err();
        assert!(matches!(err, EngineError::NoStations(_)));
        // No decision record written for configuration faults.
        assert!(decisions.appended.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_data_still_produces_green_decision() {
        let decisions = Arc::new(FakeDecisions::default());
        let engine = engine(vec![], decisions.clone());
        let rules = vec![rule(
            "r1",
            RuleKind::WindSpeed,
            Operator::GreaterThan,
            12.0,
            Severity::Red,
            5,
        )];

        let decision = engine.evaluate_at(&launch(&["S1"]), &rules, at()).await.unwrap();
        assert_eq!(decision.severity, Severity::Green);
        assert_eq!(decision.message, "No recent data from any associated station");
        assert_eq!(decisions.appended.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_persistence_failure_still_returns_decision() {
        let mut m = Measurement::new("S1", "manual", at() - Duration::minutes(2));
        m.set(MeasurementKind::WindSpeed, 14.0);

        let decisions = Arc::new(FakeDecisions {
            appended: Mutex::new(Vec::new()),
            fail: true,
        });
        let engine = engine(vec![m], decisions);
        let rules = vec![rule(
            "r1",
            RuleKind::WindSpeed,
            Operator::GreaterThan,
            12.0,
            Severity::Red,
            5,
        )];

        let decision = engine.evaluate_at(&launch(&["S1"]), &rules, at()).await.unwrap();
        assert_eq!(decision.severity, Severity::Red);
    }

    #[tokio::test]
    async fn test_inactive_and_foreign_rules_are_ignored() {
        let mut m = Measurement::new("S1", "manual", at() - Duration::minutes(2));
        m.set(MeasurementKind::WindSpeed, 14.0);

        let decisions = Arc::new(FakeDecisions::default());
        let engine = engine(vec![m], decisions);

        let mut inactive = rule("r1", RuleKind::WindSpeed, Operator::GreaterThan, 12.0, Severity::Red, 5);
        inactive.active = false;
        let mut foreign = rule("r2", RuleKind::WindSpeed, Operator::GreaterThan, 12.0, Severity::Red, 5);
        foreign.launch_id = "other".into();

        let decision = engine
            .evaluate_at(&launch(&["S1"]), &[inactive, foreign], at())
            .await
            .unwrap();
        assert_eq!(decision.severity, Severity::Green);
        assert_eq!(decision.message, "No rules configured for this launch");
    }
}
