//! Single-rule evaluation.
//!
//! Turns one active rule plus a snapshot and trend set into a
//! [`RuleOutcome`]. Pure apart from debug logging; missing data always
//! skips the rule, it never errors and never triggers.

use tracing::debug;

use crate::models::{MeasurementKind, Operator, Rule, RuleKind, RuleOutcome, SkipReason};
use crate::settings::EngineSettings;
use crate::snapshot::{Snapshot, StationReading};
use crate::trend::TrendSet;

/// Evaluate one rule against a snapshot and precomputed trends.
pub fn evaluate_rule(
    rule: &Rule,
    snapshot: &Snapshot,
    trends: &TrendSet,
    settings: &EngineSettings,
) -> RuleOutcome {
    let outcome = match rule.kind {
        RuleKind::MultiStation => evaluate_multi_station(rule, snapshot, settings),
        RuleKind::PressureTrend => evaluate_pressure_trend(rule, snapshot, trends),
        _ => evaluate_instantaneous(rule, snapshot),
    };
    if let Some(reason) = outcome.skipped {
        debug!(
            rule_id = %rule.id,
            kind = %rule.kind,
            reason = reason.as_str(),
            "rule skipped this cycle"
        );
    }
    outcome
}

fn evaluate_instantaneous(rule: &Rule, snapshot: &Snapshot) -> RuleOutcome {
    let Some(kind) = rule.kind.measurement() else {
        return RuleOutcome::skipped(rule.clone(), SkipReason::Misconfigured);
    };

    let (value, station_id) = if let Some(pin) = &rule.station_id {
        match snapshot.station_reading(pin, kind) {
            StationReading::Fresh(v) => (v, pin.clone()),
            StationReading::Stale => {
                return RuleOutcome::skipped(rule.clone(), SkipReason::StaleValue)
            }
            StationReading::Missing => {
                return RuleOutcome::skipped(rule.clone(), SkipReason::MissingValue)
            }
        }
    } else {
        match snapshot.get(kind) {
            Some(entry) => (entry.value, entry.station_id.clone()),
            None => return RuleOutcome::skipped(rule.clone(), SkipReason::MissingValue),
        }
    };

    let Some(triggered) = compare(
        rule.operator,
        value,
        rule.threshold_value,
        rule.threshold_value_max,
        kind.is_circular(),
    ) else {
        return RuleOutcome::skipped(rule.clone(), SkipReason::Misconfigured);
    };

    RuleOutcome {
        rule: rule.clone(),
        triggered,
        value_used: Some(value),
        station_id: Some(station_id),
        skipped: None,
    }
}

fn evaluate_pressure_trend(rule: &Rule, snapshot: &Snapshot, trends: &TrendSet) -> RuleOutcome {
    // Pinned rules follow the pinned station's lineage; unpinned ones
    // follow whichever station the snapshot resolved for pressure.
    let lineage = match &rule.station_id {
        Some(pin) => pin.clone(),
        None => match snapshot.get(MeasurementKind::Pressure) {
            Some(entry) => entry.station_id.clone(),
            None => return RuleOutcome::skipped(rule.clone(), SkipReason::MissingValue),
        },
    };

    let Some(rate) = trends.pressure(&lineage) else {
        return RuleOutcome::skipped(rule.clone(), SkipReason::UndefinedTrend);
    };

    let Some(triggered) = compare(
        rule.operator,
        rate,
        rule.threshold_value,
        rule.threshold_value_max,
        false,
    ) else {
        return RuleOutcome::skipped(rule.clone(), SkipReason::Misconfigured);
    };

    RuleOutcome {
        rule: rule.clone(),
        triggered,
        value_used: Some(rate),
        station_id: Some(lineage),
        skipped: None,
    }
}

fn evaluate_multi_station(rule: &Rule, snapshot: &Snapshot, settings: &EngineSettings) -> RuleOutcome {
    let Some(kind) = rule.measurement else {
        return RuleOutcome::skipped(rule.clone(), SkipReason::Misconfigured);
    };

    let total = snapshot.stations.len();
    let mut reporting = 0usize;
    let mut agreeing = 0usize;
    for station in &snapshot.stations {
        let StationReading::Fresh(value) = snapshot.station_reading(&station.station_id, kind)
        else {
            continue;
        };
        reporting += 1;
        match compare(
            rule.operator,
            value,
            rule.threshold_value,
            rule.threshold_value_max,
            kind.is_circular(),
        ) {
            Some(true) => agreeing += 1,
            Some(false) => {}
            None => return RuleOutcome::skipped(rule.clone(), SkipReason::Misconfigured),
        }
    }

    if reporting == 0 {
        return RuleOutcome::skipped(rule.clone(), SkipReason::MissingValue);
    }

    let triggered = agreeing >= quorum_size(total, settings.quorum);
    RuleOutcome {
        rule: rule.clone(),
        triggered,
        value_used: Some(agreeing as f64),
        station_id: None,
        skipped: None,
    }
}

/// Stations required for a quorum over `total` associated stations.
///
/// floor(total x fraction) + 1, capped at total: 0.5 means a strict
/// majority, 1.0 means every station.
pub fn quorum_size(total: usize, fraction: f64) -> usize {
    if total == 0 {
        return 0;
    }
    (((total as f64 * fraction.clamp(0.0, 1.0)).floor() as usize) + 1).min(total)
}

/// Apply one operator. `None` means the rule is misconfigured (a range
/// operator without a max).
fn compare(op: Operator, value: f64, min: f64, max: Option<f64>, circular: bool) -> Option<bool> {
    if circular {
        return compare_circular(op, value, min, max);
    }
    Some(match op {
        Operator::GreaterThan => value > min,
        Operator::LessThan => value < min,
        Operator::Equal => value == min,
        Operator::GreaterOrEqual => value >= min,
        Operator::LessOrEqual => value <= min,
        Operator::Between => {
            let max = max?;
            value >= min && value <= max
        }
        Operator::NotInRange => {
            let max = max?;
            value < min || value > max
        }
    })
}

/// Direction comparison on the 0-360 circle.
///
/// `between` with min > max wraps through north: 350-20 covers 355 and 10
/// but not 180. `not_in_range` is its exact complement.
fn compare_circular(op: Operator, value: f64, min: f64, max: Option<f64>) -> Option<bool> {
    let value = normalize_deg(value);
    let min = normalize_deg(min);
    match op {
        Operator::Between => {
            let max = normalize_deg(max?);
            Some(in_arc(value, min, max))
        }
        Operator::NotInRange => {
            let max = normalize_deg(max?);
            Some(!in_arc(value, min, max))
        }
        // Plain comparisons act on the normalized angle.
        _ => compare(op, value, min, None, false),
    }
}

fn in_arc(value: f64, from: f64, to: f64) -> bool {
    if from <= to {
        value >= from && value <= to
    } else {
        value >= from || value <= to
    }
}

fn normalize_deg(v: f64) -> f64 {
    let r = v % 360.0;
    if r < 0.0 {
        r + 360.0
    } else {
        r
    }
}
