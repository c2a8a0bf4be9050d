//! Decision resolution.
//!
//! Collapses a set of rule outcomes into one decision: the maximum
//! severity among triggered rules wins, and every triggered rule lands in
//! the contributing factors. Pure function of its inputs, so re-running it
//! on the same outcomes always yields the same decision.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::models::{Decision, Factor, RuleKind, RuleOutcome, Severity};

/// Resolve all outcomes of one evaluation cycle into a decision.
///
/// `has_data` is false when no associated station returned anything; the
/// decision is then green but carries a visible no-data message so absence
/// of data is never misread as flyable.
pub fn resolve_decision(
    id: String,
    launch_id: &str,
    outcomes: &[RuleOutcome],
    has_data: bool,
    decided_at: DateTime<Utc>,
) -> Decision {
    let mut triggered: Vec<&RuleOutcome> = outcomes.iter().filter(|o| o.triggered).collect();
    // Priority orders the factor listing only; it never changes severity.
    triggered.sort_by(|a, b| {
        b.rule
            .priority
            .cmp(&a.rule.priority)
            .then_with(|| a.rule.id.cmp(&b.rule.id))
    });

    let severity = triggered
        .iter()
        .map(|o| o.rule.severity)
        .max()
        .unwrap_or(Severity::Green);

    let mut factors = Vec::new();
    let mut used_keys: HashSet<String> = HashSet::new();
    for outcome in &triggered {
        let Some(value) = outcome.value_used else { continue };
        let key = unique_key(factor_key(&outcome.rule.kind, outcome), &mut used_keys);
        factors.push(Factor::number(key.clone(), value));
        factors.push(Factor::text(
            format!("{key}_threshold"),
            outcome.rule.threshold_label(),
        ));
        if let Some(station) = &outcome.station_id {
            factors.push(Factor::text(format!("{key}_station"), station.clone()));
        }
    }

    let message = synthesize_message(outcomes, &triggered, severity, has_data);

    Decision {
        id,
        launch_id: launch_id.to_string(),
        decided_at,
        severity,
        factors,
        message,
    }
}

fn factor_key(kind: &RuleKind, outcome: &RuleOutcome) -> String {
    match kind {
        RuleKind::MultiStation => {
            let measurement = outcome
                .rule
                .measurement
                .map(|m| m.as_str())
                .unwrap_or("multi_station");
            format!("{measurement}_quorum")
        }
        other => other.as_str().to_string(),
    }
}

/// Two rules on the same kind get `#2`, `#3`... suffixes instead of
/// silently overwriting each other.
fn unique_key(base: String, used: &mut HashSet<String>) -> String {
    if used.insert(base.clone()) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}#{n}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

fn synthesize_message(
    outcomes: &[RuleOutcome],
    triggered: &[&RuleOutcome],
    severity: Severity,
    has_data: bool,
) -> String {
    if outcomes.is_empty() {
        return "No rules configured for this launch".to_string();
    }
    if !has_data {
        return "No recent data from any associated station".to_string();
    }
    if triggered.is_empty() {
        return "All conditions within configured limits".to_string();
    }

    let mut kinds: Vec<&str> = Vec::new();
    for outcome in triggered {
        if outcome.rule.severity != severity {
            continue;
        }
        let kind = match outcome.rule.kind {
            RuleKind::MultiStation => outcome
                .rule
                .measurement
                .map(|m| m.as_str())
                .unwrap_or("multi_station"),
            other => other.as_str(),
        };
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    format!("{severity}: {} outside configured limits", kinds.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MeasurementKind, Operator, Rule, RuleOutcome};
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
    }

    fn rule(id: &str, kind: RuleKind, severity: Severity, priority: i32) -> Rule {
        Rule {
            id: id.into(),
            launch_id: "l1".into(),
            kind,
            measurement: None,
            station_id: None,
            operator: Operator::GreaterThan,
            threshold_value: 10.0,
            threshold_value_max: None,
            severity,
            priority,
            active: true,
            description: None,
            created_at: at(),
        }
    }

    fn triggered(rule: Rule, value: f64, station: &str) -> RuleOutcome {
        RuleOutcome {
            rule,
            triggered: true,
            value_used: Some(value),
            station_id: Some(station.into()),
            skipped: None,
        }
    }

    #[test]
    fn test_max_severity_wins_and_all_factors_recorded() {
        let outcomes = vec![
            triggered(rule("r1", RuleKind::WindSpeed, Severity::Orange, 3), 11.0, "S1"),
            triggered(rule("r2", RuleKind::GustSpeed, Severity::Red, 5), 17.0, "S1"),
        ];
        let decision = resolve_decision("d1".into(), "l1", &outcomes, true, at());

        assert_eq!(decision.severity, Severity::Red);
        assert_eq!(
            decision.factor("wind_speed"),
            Some(&crate::models::FactorValue::Number(11.0))
        );
        assert_eq!(
            decision.factor("gust_speed"),
            Some(&crate::models::FactorValue::Number(17.0))
        );
        assert_eq!(
            decision.factor("gust_speed_station"),
            Some(&crate::models::FactorValue::Text("S1".into()))
        );
        assert!(decision.message.starts_with("red: gust_speed"));
    }

    #[test]
    fn test_priority_orders_factors_not_severity() {
        let outcomes = vec![
            triggered(rule("r1", RuleKind::WindSpeed, Severity::Red, 2), 14.0, "S1"),
            triggered(rule("r2", RuleKind::Temperature, Severity::Orange, 9), 35.0, "S1"),
        ];
        let decision = resolve_decision("d1".into(), "l1", &outcomes, true, at());

        assert_eq!(decision.severity, Severity::Red);
        // Higher priority listed first even though its severity is lower.
        assert_eq!(decision.factors[0].name, "temperature");
    }

    #[test]
    fn test_no_rules_is_green_with_note() {
        let decision = resolve_decision("d1".into(), "l1", &[], true, at());
        assert_eq!(decision.severity, Severity::Green);
        assert!(decision.factors.is_empty());
        assert_eq!(decision.message, "No rules configured for this launch");
    }

    #[test]
    fn test_nothing_triggered_is_green_nominal() {
        let mut outcome = triggered(rule("r1", RuleKind::WindSpeed, Severity::Red, 5), 4.0, "S1");
        outcome.triggered = false;
        let decision = resolve_decision("d1".into(), "l1", &[outcome], true, at());
        assert_eq!(decision.severity, Severity::Green);
        assert!(decision.factors.is_empty());
        assert_eq!(decision.message, "All conditions within configured limits");
    }

    #[test]
    fn test_no_data_annotation() {
        let mut outcome = triggered(rule("r1", RuleKind::WindSpeed, Severity::Red, 5), 0.0, "S1");
        outcome.triggered = false;
        outcome.value_used = None;
        outcome.station_id = None;
        let decision = resolve_decision("d1".into(), "l1", &[outcome], false, at());
        assert_eq!(decision.severity, Severity::Green);
        assert_eq!(decision.message, "No recent data from any associated station");
    }

    #[test]
    fn test_duplicate_kinds_get_suffixed_keys() {
        let outcomes = vec![
            triggered(rule("r1", RuleKind::WindSpeed, Severity::Red, 5), 14.0, "S1"),
            triggered(rule("r2", RuleKind::WindSpeed, Severity::Orange, 5), 14.0, "S2"),
        ];
        let decision = resolve_decision("d1".into(), "l1", &outcomes, true, at());
        assert!(decision.factor("wind_speed").is_some());
        assert!(decision.factor("wind_speed#2").is_some());
        assert_eq!(
            decision.factor("wind_speed#2_station"),
            Some(&crate::models::FactorValue::Text("S2".into()))
        );
    }

    #[test]
    fn test_multi_station_factor_key_names_measurement() {
        let mut r = rule("r1", RuleKind::MultiStation, Severity::Orange, 5);
        r.measurement = Some(MeasurementKind::WindSpeed);
        let mut outcome = triggered(r, 3.0, "S1");
        outcome.station_id = None;
        let decision = resolve_decision("d1".into(), "l1", &[outcome], true, at());
        assert!(decision.factor("wind_speed_quorum").is_some());
        assert!(decision.factor("wind_speed_quorum_station").is_none());
    }

    #[test]
    fn test_resolver_is_idempotent() {
        let outcomes = vec![
            triggered(rule("r1", RuleKind::WindSpeed, Severity::Red, 5), 14.0, "S1"),
            triggered(rule("r2", RuleKind::GustSpeed, Severity::Orange, 3), 20.0, "S1"),
        ];
        let a = resolve_decision("d1".into(), "l1", &outcomes, true, at());
        let b = resolve_decision("d1".into(), "l1", &outcomes, true, at());
        assert_eq!(a.severity, b.severity);
        assert_eq!(a.factors, b.factors);
        assert_eq!(a.message, b.message);
    }
}
