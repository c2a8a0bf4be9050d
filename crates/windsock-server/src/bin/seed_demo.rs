//! Seed a demo site into the database.
//!
//! Registers three Bernese Oberland stations, one launch with a
//! prioritized station chain, and a realistic rule set covering every
//! rule kind worth demonstrating. Safe to re-run: stations upsert and a
//! second run simply adds another launch.

use anyhow::Result;
use chrono::Utc;
use uuid::Uuid;

use windsock_core::{
    Launch, MeasurementKind, Operator, Rule, RuleKind, Severity, Station, StationAssociation,
};
use windsock_server::config::Config;
use windsock_server::persistence::{self, launches as launches_db, rules as rules_db, stations as stations_db};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    let db = persistence::init_database(&config.database_path, config.database_max_connections)
        .await?;
    let pool = db.pool();

    let stations = [
        station("INT", "Interlaken", "meteoswiss", 46.672, 7.870, 577.0),
        station("MER", "Meiringen", "meteoswiss", 46.732, 8.169, 589.0),
        station("101", "Amisbuel", "holfuy", 46.703, 7.775, 1115.0),
    ];
    for s in &stations {
        stations_db::upsert_station(pool, s).await?;
        println!("station {} ({})", s.id, s.name);
    }

    let launch = Launch {
        id: Uuid::new_v4().to_string(),
        name: "Beatenberg".to_string(),
        latitude: Some(46.695),
        longitude: Some(7.771),
        altitude_m: Some(1130.0),
        active: true,
        stations: vec![
            StationAssociation { station_id: "101".into(), priority: 1 },
            StationAssociation { station_id: "INT".into(), priority: 2 },
            StationAssociation { station_id: "MER".into(), priority: 3 },
        ],
        created_at: Utc::now(),
    };
    launches_db::insert_launch(pool, &launch).await?;
    println!("launch {} ({})", launch.id, launch.name);

    let rules = [
        rule(&launch.id, RuleKind::WindSpeed, Operator::GreaterThan, 8.0, None, Severity::Orange, 4),
        rule(&launch.id, RuleKind::WindSpeed, Operator::GreaterThan, 12.0, None, Severity::Red, 5),
        rule(&launch.id, RuleKind::GustSpeed, Operator::GreaterThan, 15.0, None, Severity::Red, 5),
        // launchable window faces north-west; anything outside it is a no-go
        rule(&launch.id, RuleKind::WindDirection, Operator::NotInRange, 270.0, Some(350.0), Severity::Red, 3),
        rule(&launch.id, RuleKind::Rain, Operator::GreaterThan, 0.0, None, Severity::Red, 2),
        // fast pressure drop signals an incoming front
        rule(&launch.id, RuleKind::PressureTrend, Operator::LessThan, -1.5, None, Severity::Orange, 2),
    ];
    for r in &rules {
        rules_db::insert_rule(pool, r).await?;
        println!("rule {} {} {}", r.kind, r.operator, r.threshold_value);
    }

    // strong wind confirmed by a majority of stations is worse than one
    // gusty sensor
    let mut quorum_rule = rule(&launch.id, RuleKind::MultiStation, Operator::GreaterThan, 10.0, None, Severity::Red, 6);
    quorum_rule.measurement = Some(MeasurementKind::WindSpeed);
    rules_db::insert_rule(pool, &quorum_rule).await?;
    println!("rule multi_station wind_speed > 10");

    println!("done; evaluate with GET /api/v1/decisions/{}", launch.id);
    Ok(())
}

fn station(id: &str, name: &str, source: &str, lat: f64, lon: f64, alt: f64) -> Station {
    Station {
        id: id.to_string(),
        name: name.to_string(),
        source: source.to_string(),
        latitude: Some(lat),
        longitude: Some(lon),
        altitude_m: Some(alt),
        active: true,
        created_at: Utc::now(),
    }
}

fn rule(
    launch_id: &str,
    kind: RuleKind,
    operator: Operator,
    threshold: f64,
    max: Option<f64>,
    severity: Severity,
    priority: i32,
) -> Rule {
    Rule {
        id: Uuid::new_v4().to_string(),
        launch_id: launch_id.to_string(),
        kind,
        measurement: None,
        station_id: None,
        operator,
        threshold_value: threshold,
        threshold_value_max: max,
        severity,
        priority,
        active: true,
        description: None,
        created_at: Utc::now(),
    }
}
