//! Core data models for the launch decision system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Traffic-light severity of a rule or a resolved decision.
///
/// The ordering is total and meaningful: `Green < Orange < Red`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Conditions within configured limits
    #[default]
    Green,
    /// Marginal conditions, launch with caution
    Orange,
    /// Launch not advised
    Red,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Green => "green",
            Severity::Orange => "orange",
            Severity::Red => "red",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the instantaneous fields a station can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementKind {
    WindSpeed,
    WindDirection,
    GustSpeed,
    GustDirection,
    Temperature,
    Humidity,
    Pressure,
    Rain,
}

impl MeasurementKind {
    pub const ALL: [MeasurementKind; 8] = [
        MeasurementKind::WindSpeed,
        MeasurementKind::WindDirection,
        MeasurementKind::GustSpeed,
        MeasurementKind::GustDirection,
        MeasurementKind::Temperature,
        MeasurementKind::Humidity,
        MeasurementKind::Pressure,
        MeasurementKind::Rain,
    ];

    /// Directions compare on a circular 0-360 degree domain.
    pub fn is_circular(self) -> bool {
        matches!(
            self,
            MeasurementKind::WindDirection | MeasurementKind::GustDirection
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MeasurementKind::WindSpeed => "wind_speed",
            MeasurementKind::WindDirection => "wind_direction",
            MeasurementKind::GustSpeed => "gust_speed",
            MeasurementKind::GustDirection => "gust_direction",
            MeasurementKind::Temperature => "temperature",
            MeasurementKind::Humidity => "humidity",
            MeasurementKind::Pressure => "pressure",
            MeasurementKind::Rain => "rain",
        }
    }
}

impl fmt::Display for MeasurementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a rule tests: the instantaneous kinds plus two derived modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    WindSpeed,
    WindDirection,
    GustSpeed,
    GustDirection,
    Temperature,
    Humidity,
    Pressure,
    Rain,
    /// Pressure rate of change over the trend window, in hPa per hour
    PressureTrend,
    /// Quorum of stations independently agreeing on the rule's `measurement`
    MultiStation,
}

impl RuleKind {
    /// The instantaneous measurement this kind reads directly, if any.
    ///
    /// `PressureTrend` and `MultiStation` resolve their input elsewhere
    /// (trend output, per-station quorum scan) and return `None`.
    pub fn measurement(self) -> Option<MeasurementKind> {
        match self {
            RuleKind::WindSpeed => Some(MeasurementKind::WindSpeed),
            RuleKind::WindDirection => Some(MeasurementKind::WindDirection),
            RuleKind::GustSpeed => Some(MeasurementKind::GustSpeed),
            RuleKind::GustDirection => Some(MeasurementKind::GustDirection),
            RuleKind::Temperature => Some(MeasurementKind::Temperature),
            RuleKind::Humidity => Some(MeasurementKind::Humidity),
            RuleKind::Pressure => Some(MeasurementKind::Pressure),
            RuleKind::Rain => Some(MeasurementKind::Rain),
            RuleKind::PressureTrend | RuleKind::MultiStation => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RuleKind::WindSpeed => "wind_speed",
            RuleKind::WindDirection => "wind_direction",
            RuleKind::GustSpeed => "gust_speed",
            RuleKind::GustDirection => "gust_direction",
            RuleKind::Temperature => "temperature",
            RuleKind::Humidity => "humidity",
            RuleKind::Pressure => "pressure",
            RuleKind::Rain => "rain",
            RuleKind::PressureTrend => "pressure_trend",
            RuleKind::MultiStation => "multi_station",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison operator of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<=")]
    LessOrEqual,
    /// Inclusive on both ends
    #[serde(rename = "between")]
    Between,
    /// Outside [min, max]; the boundaries count as inside
    #[serde(rename = "not_in_range")]
    NotInRange,
}

impl Operator {
    /// Operators that require `threshold_value_max`.
    pub fn needs_max(self) -> bool {
        matches!(self, Operator::Between | Operator::NotInRange)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::GreaterThan => ">",
            Operator::LessThan => "<",
            Operator::Equal => "=",
            Operator::GreaterOrEqual => ">=",
            Operator::LessOrEqual => "<=",
            Operator::Between => "between",
            Operator::NotInRange => "not_in_range",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized reading from one station at one point in time.
///
/// Fields the provider did not report stay `None`. Measurements are
/// immutable once stored; the engine only ever reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurement {
    pub station_id: String,
    /// Provider that produced the reading (holfuy, meteoswiss, manual)
    pub source: String,
    pub observed_at: DateTime<Utc>,
    /// Wind speed in m/s
    #[serde(default)]
    pub wind_speed: Option<f64>,
    /// Wind direction in degrees, 0-360
    #[serde(default)]
    pub wind_direction: Option<f64>,
    /// Gust speed in m/s
    #[serde(default)]
    pub gust_speed: Option<f64>,
    /// Gust direction in degrees, 0-360
    #[serde(default)]
    pub gust_direction: Option<f64>,
    /// Air temperature in degrees Celsius
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Relative humidity in percent
    #[serde(default)]
    pub humidity: Option<f64>,
    /// Air pressure in hPa
    #[serde(default)]
    pub pressure: Option<f64>,
    /// Rainfall in mm
    #[serde(default)]
    pub rain: Option<f64>,
}

impl Measurement {
    /// Create an empty reading for a station.
    pub fn new(
        station_id: impl Into<String>,
        source: impl Into<String>,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            station_id: station_id.into(),
            source: source.into(),
            observed_at,
            wind_speed: None,
            wind_direction: None,
            gust_speed: None,
            gust_direction: None,
            temperature: None,
            humidity: None,
            pressure: None,
            rain: None,
        }
    }

    /// Read one field by kind.
    pub fn value(&self, kind: MeasurementKind) -> Option<f64> {
        match kind {
            MeasurementKind::WindSpeed => self.wind_speed,
            MeasurementKind::WindDirection => self.wind_direction,
            MeasurementKind::GustSpeed => self.gust_speed,
            MeasurementKind::GustDirection => self.gust_direction,
            MeasurementKind::Temperature => self.temperature,
            MeasurementKind::Humidity => self.humidity,
            MeasurementKind::Pressure => self.pressure,
            MeasurementKind::Rain => self.rain,
        }
    }

    /// Write one field by kind.
    pub fn set(&mut self, kind: MeasurementKind, value: f64) {
        match kind {
            MeasurementKind::WindSpeed => self.wind_speed = Some(value),
            MeasurementKind::WindDirection => self.wind_direction = Some(value),
            MeasurementKind::GustSpeed => self.gust_speed = Some(value),
            MeasurementKind::GustDirection => self.gust_direction = Some(value),
            MeasurementKind::Temperature => self.temperature = Some(value),
            MeasurementKind::Humidity => self.humidity = Some(value),
            MeasurementKind::Pressure => self.pressure = Some(value),
            MeasurementKind::Rain => self.rain = Some(value),
        }
    }

    /// True when no field carries a value.
    pub fn is_empty(&self) -> bool {
        MeasurementKind::ALL.iter().all(|k| self.value(*k).is_none())
    }
}

/// A weather observation source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    /// Provider station code, e.g. "101" (Holfuy) or "INT" (MeteoSwiss)
    pub id: String,
    pub name: String,
    pub source: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude_m: Option<f64>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Association of a station to a launch.
///
/// Lower priority number = consulted first during snapshot fallback.
/// Ties break by insertion order of the association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationAssociation {
    pub station_id: String,
    pub priority: i32,
}

/// A paragliding takeoff site being monitored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Launch {
    pub id: String,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude_m: Option<f64>,
    pub active: bool,
    /// Associated stations, already sorted by (priority, insertion order)
    #[serde(default)]
    pub stations: Vec<StationAssociation>,
    pub created_at: DateTime<Utc>,
}

/// A threshold condition tied to one launch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub launch_id: String,
    pub kind: RuleKind,
    /// Measurement a multi_station rule tests; ignored for other kinds
    #[serde(default)]
    pub measurement: Option<MeasurementKind>,
    /// Pin evaluation to one station, bypassing snapshot fallback
    #[serde(default)]
    pub station_id: Option<String>,
    pub operator: Operator,
    pub threshold_value: f64,
    #[serde(default)]
    pub threshold_value_max: Option<f64>,
    pub severity: Severity,
    /// 1-10; orders the contributing-factors listing, never the severity
    pub priority: i32,
    pub active: bool,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Rule {
    /// Human-readable threshold, e.g. `"> 12"` or `"between 350 and 20"`.
    pub fn threshold_label(&self) -> String {
        match (self.operator, self.threshold_value_max) {
            (Operator::Between, Some(max)) => {
                format!("between {} and {}", self.threshold_value, max)
            }
            (Operator::NotInRange, Some(max)) => {
                format!("outside {} to {}", self.threshold_value, max)
            }
            _ => format!("{} {}", self.operator, self.threshold_value),
        }
    }
}

/// Why a rule was skipped instead of evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No station supplied a value for the measurement
    MissingValue,
    /// The only candidate reading is older than the staleness cut
    StaleValue,
    /// Trend window held fewer than two samples or spanned too little time
    UndefinedTrend,
    /// Rule fields are inconsistent (e.g. between without a max)
    Misconfigured,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::MissingValue => "missing_value",
            SkipReason::StaleValue => "stale_value",
            SkipReason::UndefinedTrend => "undefined_trend",
            SkipReason::Misconfigured => "misconfigured",
        }
    }
}

/// Result of evaluating one rule. Transient, never persisted on its own.
#[derive(Debug, Clone)]
pub struct RuleOutcome {
    pub rule: Rule,
    pub triggered: bool,
    /// Value the comparison ran against; the count of agreeing stations
    /// for multi_station rules
    pub value_used: Option<f64>,
    /// Station that supplied the value, when a single station did
    pub station_id: Option<String>,
    /// Set when the rule could not be evaluated this cycle
    pub skipped: Option<SkipReason>,
}

impl RuleOutcome {
    /// A rule that could not be evaluated this cycle.
    pub fn skipped(rule: Rule, reason: SkipReason) -> Self {
        Self {
            rule,
            triggered: false,
            value_used: None,
            station_id: None,
            skipped: Some(reason),
        }
    }
}

/// Value of one contributing factor: a reading or a textual annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactorValue {
    Number(f64),
    Text(String),
}

/// One named entry in a decision's contributing factors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    pub name: String,
    pub value: FactorValue,
}

impl Factor {
    pub fn number(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value: FactorValue::Number(value),
        }
    }

    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FactorValue::Text(value.into()),
        }
    }
}

/// The resolved go/no-go outcome for a launch at a point in time.
///
/// Appended to history, never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub id: String,
    pub launch_id: String,
    pub decided_at: DateTime<Utc>,
    pub severity: Severity,
    /// One group of entries per triggered rule, ordered by rule priority
    /// (highest first)
    pub factors: Vec<Factor>,
    pub message: String,
}

impl Decision {
    /// Look up a factor by name.
    pub fn factor(&self, name: &str) -> Option<&FactorValue> {
        self.factors
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Green < Severity::Orange);
        assert!(Severity::Orange < Severity::Red);
        assert_eq!(
            [Severity::Orange, Severity::Red, Severity::Green]
                .into_iter()
                .max(),
            Some(Severity::Red)
        );
    }

    #[test]
    fn test_operator_serde_strings() {
        assert_eq!(
            serde_json::to_string(&Operator::GreaterOrEqual).unwrap(),
            "\">=\""
        );
        assert_eq!(
            serde_json::from_str::<Operator>("\"not_in_range\"").unwrap(),
            Operator::NotInRange
        );
    }

    #[test]
    fn test_measurement_value_by_kind() {
        let mut m = Measurement::new("S1", "manual", Utc::now());
        assert!(m.is_empty());
        m.set(MeasurementKind::WindSpeed, 7.5);
        assert_eq!(m.value(MeasurementKind::WindSpeed), Some(7.5));
        assert_eq!(m.value(MeasurementKind::GustSpeed), None);
        assert!(!m.is_empty());
    }

    #[test]
    fn test_factor_value_untagged_serde() {
        let f = Factor::number("wind_speed", 14.0);
        assert_eq!(
            serde_json::to_string(&f).unwrap(),
            "{\"name\":\"wind_speed\",\"value\":14.0}"
        );
        let f = Factor::text("wind_speed_threshold", "> 12");
        assert_eq!(
            serde_json::to_string(&f).unwrap(),
            "{\"name\":\"wind_speed_threshold\",\"value\":\"> 12\"}"
        );
    }

    #[test]
    fn test_threshold_label() {
        let mut rule = Rule {
            id: "r1".into(),
            launch_id: "l1".into(),
            kind: RuleKind::WindDirection,
            measurement: None,
            station_id: None,
            operator: Operator::Between,
            threshold_value: 350.0,
            threshold_value_max: Some(20.0),
            severity: Severity::Red,
            priority: 5,
            active: true,
            description: None,
            created_at: Utc::now(),
        };
        assert_eq!(rule.threshold_label(), "between 350 and 20");
        rule.operator = Operator::GreaterThan;
        rule.threshold_value = 12.0;
        rule.threshold_value_max = None;
        assert_eq!(rule.threshold_label(), "> 12");
    }
}
