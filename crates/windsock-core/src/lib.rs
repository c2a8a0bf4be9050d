pub mod engine;
pub mod evaluate;
pub mod models;
pub mod resolve;
pub mod settings;
pub mod snapshot;
pub mod store;
pub mod trend;

pub use engine::{DecisionEngine, EngineError};
pub use evaluate::evaluate_rule;
pub use models::{
    Decision, Factor, FactorValue, Launch, Measurement, MeasurementKind, Operator, Rule,
    RuleKind, RuleOutcome, Severity, SkipReason, Station, StationAssociation,
};
pub use resolve::resolve_decision;
pub use settings::EngineSettings;
pub use snapshot::{build_snapshot, Snapshot, SnapshotEntry, StationData, StationReading};
pub use store::{DecisionStore, StoreError, TelemetryStore};
pub use trend::{compute_trends, trend_per_hour, TrendSet};
