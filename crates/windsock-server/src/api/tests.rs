use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::{api, config::Config, persistence, state::AppState};

/// Removes the test database (and SQLite sidecar files) when dropped, so
/// runs do not accumulate files in the temp directory.
struct TempDb {
    path: std::path::PathBuf,
}

impl Drop for TempDb {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
        for suffix in ["-wal", "-shm"] {
            let mut sidecar = self.path.clone().into_os_string();
            sidecar.push(suffix);
            let _ = std::fs::remove_file(sidecar);
        }
    }
}

async fn setup_app() -> (axum::Router, TempDb) {
    let mut config = Config::from_env();
    let db_path =
        std::env::temp_dir().join(format!("windsock-test-{}.db", uuid::Uuid::new_v4()));
    config.database_path = db_path.to_string_lossy().to_string();
    config.disable_collectors = true;
    config.disable_decision_loop = true;

    let db = persistence::init_database(&config.database_path, config.database_max_connections)
        .await
        .expect("init db");
    let state = Arc::new(AppState::new(db, config));

    let app = api::routes().with_state(state);
    (app, TempDb { path: db_path })
}

async fn request(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.clone()
        .oneshot(builder.body(body).expect("build request"))
        .await
        .expect("send request")
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}

async fn create_station(app: &axum::Router, id: &str) {
    let res = request(
        app,
        "POST",
        "/api/v1/stations",
        Some(json!({ "id": id, "name": format!("Station {id}"), "source": "manual" })),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
}

async fn create_launch(app: &axum::Router, stations: Value) -> String {
    let res = request(
        app,
        "POST",
        "/api/v1/launches",
        Some(json!({ "name": "Test Launch", "stations": stations })),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = read_json(res).await;
    body["id"].as_str().expect("launch id").to_string()
}

#[tokio::test]
async fn register_station_and_fetch() {
    let (app, _db) = setup_app().await;

    let res = request(
        &app,
        "POST",
        "/api/v1/stations",
        Some(json!({
            "id": "INT",
            "name": "Interlaken",
            "source": "meteoswiss",
            "latitude": 46.67,
            "longitude": 7.87,
            "altitude_m": 577.0
        })),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = request(&app, "GET", "/api/v1/stations/INT", None).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["source"], "meteoswiss");
    assert_eq!(body["active"], true);

    let res = request(&app, "GET", "/api/v1/stations", None).await;
    let body = read_json(res).await;
    assert_eq!(body.as_array().map(|a| a.len()), Some(1));

    let res = request(&app, "GET", "/api/v1/stations/NOPE", None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn blank_station_id_rejected() {
    let (app, _db) = setup_app().await;
    let res = request(
        &app,
        "POST",
        "/api/v1/stations",
        Some(json!({ "id": "  ", "name": "Blank", "source": "manual" })),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn launch_requires_known_stations() {
    let (app, _db) = setup_app().await;

    let res = request(
        &app,
        "POST",
        "/api/v1/launches",
        Some(json!({
            "name": "Niederbauen",
            "stations": [{ "station_id": "GHOST", "priority": 1 }]
        })),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json(res).await;
    assert!(body["error"].as_str().unwrap().contains("GHOST"));
}

#[tokio::test]
async fn replace_stations_sorts_by_priority() {
    let (app, _db) = setup_app().await;
    create_station(&app, "S1").await;
    create_station(&app, "S2").await;
    let launch_id = create_launch(&app, json!([])).await;

    let res = request(
        &app,
        "PUT",
        &format!("/api/v1/launches/{launch_id}/stations"),
        Some(json!([
            { "station_id": "S2", "priority": 2 },
            { "station_id": "S1", "priority": 1 }
        ])),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["stations"][0]["station_id"], "S1");
    assert_eq!(body["stations"][1]["station_id"], "S2");
}

#[tokio::test]
async fn rule_validation_rejects_inconsistent_payloads() {
    let (app, _db) = setup_app().await;
    create_station(&app, "S1").await;
    let launch_id = create_launch(&app, json!([{ "station_id": "S1", "priority": 1 }])).await;

    let base = json!({
        "launch_id": launch_id,
        "kind": "wind_speed",
        "operator": ">",
        "threshold_value": 12.0,
        "severity": "red"
    });

    // priority out of range
    let mut bad = base.clone();
    bad["priority"] = json!(11);
    let res = request(&app, "POST", "/api/v1/rules", Some(bad)).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // between without a max
    let mut bad = base.clone();
    bad["operator"] = json!("between");
    let res = request(&app, "POST", "/api/v1/rules", Some(bad)).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // multi_station without a measurement
    let mut bad = base.clone();
    bad["kind"] = json!("multi_station");
    let res = request(&app, "POST", "/api/v1/rules", Some(bad)).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // pinned to a station nobody registered
    let mut bad = base.clone();
    bad["station_id"] = json!("GHOST");
    let res = request(&app, "POST", "/api/v1/rules", Some(bad)).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // unknown launch
    let mut bad = base.clone();
    bad["launch_id"] = json!("not-a-launch");
    let res = request(&app, "POST", "/api/v1/rules", Some(bad)).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // the base payload itself is fine
    let res = request(&app, "POST", "/api/v1/rules", Some(base)).await;
    assert_eq!(res.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn rule_cannot_move_between_launches() {
    let (app, _db) = setup_app().await;
    create_station(&app, "S1").await;
    let launch_a = create_launch(&app, json!([{ "station_id": "S1", "priority": 1 }])).await;
    let launch_b = create_launch(&app, json!([{ "station_id": "S1", "priority": 1 }])).await;

    let res = request(
        &app,
        "POST",
        "/api/v1/rules",
        Some(json!({
            "launch_id": launch_a,
            "kind": "wind_speed",
            "operator": ">",
            "threshold_value": 12.0,
            "severity": "red"
        })),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let rule = read_json(res).await;
    let rule_id = rule["id"].as_str().unwrap();

    let res = request(
        &app,
        "PUT",
        &format!("/api/v1/rules/{rule_id}"),
        Some(json!({
            "launch_id": launch_b,
            "kind": "wind_speed",
            "operator": ">",
            "threshold_value": 14.0,
            "severity": "red"
        })),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // same launch, new threshold is fine
    let res = request(
        &app,
        "PUT",
        &format!("/api/v1/rules/{rule_id}"),
        Some(json!({
            "launch_id": launch_a,
            "kind": "wind_speed",
            "operator": ">",
            "threshold_value": 14.0,
            "severity": "orange"
        })),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let updated = read_json(res).await;
    assert_eq!(updated["threshold_value"], 14.0);
    assert_eq!(updated["severity"], "orange");
}

#[tokio::test]
async fn ingest_and_read_latest() {
    let (app, _db) = setup_app().await;
    create_station(&app, "S1").await;

    let res = request(
        &app,
        "POST",
        "/api/v1/measurements",
        Some(json!({ "station_id": "GHOST", "wind_speed": 5.0 })),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = request(
        &app,
        "POST",
        "/api/v1/measurements",
        Some(json!({ "station_id": "S1" })),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = request(
        &app,
        "POST",
        "/api/v1/measurements",
        Some(json!({ "station_id": "S1", "wind_speed": 6.5, "wind_direction": 270.0 })),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = request(&app, "GET", "/api/v1/measurements/S1/latest", None).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["wind_speed"], 6.5);
    assert_eq!(body["source"], "manual");

    let res = request(&app, "GET", "/api/v1/measurements/S1?hours=1", None).await;
    let body = read_json(res).await;
    assert_eq!(body.as_array().map(|a| a.len()), Some(1));

    let res = request(&app, "GET", "/api/v1/measurements/QUIET/latest", None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // history agrees with latest: unregistered stations are 404, not an
    // empty list
    let res = request(&app, "GET", "/api/v1/measurements/QUIET?hours=1", None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn evaluate_launch_end_to_end() {
    let (app, _db) = setup_app().await;
    create_station(&app, "S1").await;
    let launch_id = create_launch(&app, json!([{ "station_id": "S1", "priority": 1 }])).await;

    for rule in [
        json!({
            "launch_id": launch_id,
            "kind": "wind_speed",
            "operator": ">",
            "threshold_value": 12.0,
            "severity": "red",
            "priority": 5
        }),
        json!({
            "launch_id": launch_id,
            "kind": "gust_speed",
            "operator": ">",
            "threshold_value": 18.0,
            "severity": "orange",
            "priority": 3
        }),
    ] {
        let res = request(&app, "POST", "/api/v1/rules", Some(rule)).await;
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let res = request(
        &app,
        "POST",
        "/api/v1/measurements",
        Some(json!({ "station_id": "S1", "wind_speed": 14.0, "gust_speed": 20.0 })),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = request(&app, "GET", &format!("/api/v1/decisions/{launch_id}"), None).await;
    assert_eq!(res.status(), StatusCode::OK);
    let decision = read_json(res).await;
    assert_eq!(decision["severity"], "red");

    let names: Vec<&str> = decision["factors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    // higher-priority rule lists first
    assert!(names.contains(&"wind_speed"));
    assert!(names.contains(&"gust_speed"));
    assert!(
        names.iter().position(|n| *n == "wind_speed")
            < names.iter().position(|n| *n == "gust_speed")
    );

    let res = request(
        &app,
        "GET",
        &format!("/api/v1/decisions/{launch_id}/history?hours=1"),
        None,
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let history = read_json(res).await;
    assert_eq!(history.as_array().map(|a| a.len()), Some(1));
    assert_eq!(history[0]["severity"], "red");
}

#[tokio::test]
async fn launch_without_stations_cannot_be_evaluated() {
    let (app, _db) = setup_app().await;
    let launch_id = create_launch(&app, json!([])).await;

    let res = request(&app, "GET", &format!("/api/v1/decisions/{launch_id}"), None).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // nothing was appended to history
    let res = request(
        &app,
        "GET",
        &format!("/api/v1/decisions/{launch_id}/history"),
        None,
    )
    .await;
    let history = read_json(res).await;
    assert_eq!(history.as_array().map(|a| a.len()), Some(0));
}

#[tokio::test]
async fn launch_with_silent_station_decides_green() {
    let (app, _db) = setup_app().await;
    create_station(&app, "S1").await;
    let launch_id = create_launch(&app, json!([{ "station_id": "S1", "priority": 1 }])).await;

    let res = request(
        &app,
        "POST",
        "/api/v1/rules",
        Some(json!({
            "launch_id": launch_id,
            "kind": "wind_speed",
            "operator": ">",
            "threshold_value": 12.0,
            "severity": "red"
        })),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = request(&app, "GET", &format!("/api/v1/decisions/{launch_id}"), None).await;
    assert_eq!(res.status(), StatusCode::OK);
    let decision = read_json(res).await;
    assert_eq!(decision["severity"], "green");
    assert!(decision["message"]
        .as_str()
        .unwrap()
        .contains("No recent data"));
}

#[tokio::test]
async fn deleting_a_launch_removes_its_rules() {
    let (app, _db) = setup_app().await;
    create_station(&app, "S1").await;
    let launch_id = create_launch(&app, json!([{ "station_id": "S1", "priority": 1 }])).await;

    let res = request(
        &app,
        "POST",
        "/api/v1/rules",
        Some(json!({
            "launch_id": launch_id,
            "kind": "rain",
            "operator": ">",
            "threshold_value": 0.0,
            "severity": "red"
        })),
    )
    .await;
    let rule = read_json(res).await;
    let rule_id = rule["id"].as_str().unwrap().to_string();

    let res = request(&app, "DELETE", &format!("/api/v1/launches/{launch_id}"), None).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = request(&app, "GET", &format!("/api/v1/rules/{rule_id}"), None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
