//! Holfuy live API collector.
//!
//! Holfuy stations are fetched one by one (`?s=<id>&pw=<key>`); the API
//! reports wind already in m/s. A failing station is logged and skipped;
//! only all stations failing is a collector error.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use windsock_core::{Measurement, MeasurementKind};

use crate::error::CollectorError;
use crate::source::WeatherSource;

const BASE_URL: &str = "https://api.holfuy.com/live/";
const HOLFUY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct HolfuyCollector {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HolfuyReading {
    #[serde(rename = "stationId", default)]
    station_id: Option<Value>,
    #[serde(rename = "dateTime", default)]
    date_time: Option<String>,
    #[serde(default)]
    wind: Option<HolfuyWind>,
    #[serde(default)]
    temperature: Option<f64>,
    #[serde(default)]
    humidity: Option<f64>,
    #[serde(default)]
    pressure: Option<f64>,
    #[serde(default)]
    rain: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct HolfuyWind {
    #[serde(default)]
    speed: Option<f64>,
    #[serde(default)]
    gust: Option<f64>,
    #[serde(default)]
    direction: Option<f64>,
}

impl HolfuyCollector {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(BASE_URL, api_key)
    }

    pub fn with_base_url(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        if api_key.is_none() {
            warn!("no Holfuy API key configured, data access may be limited");
        }
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
            api_key,
        }
    }

    fn normalize_one(&self, requested_id: &str, data: &Value) -> Option<Measurement> {
        let reading: HolfuyReading = match serde_json::from_value(data.clone()) {
            Ok(reading) => reading,
            Err(err) => {
                warn!(station_id = requested_id, %err, "unusable Holfuy record, skipping");
                return None;
            }
        };

        let station_id = match &reading.station_id {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => requested_id.to_string(),
        };

        let observed_at = reading
            .date_time
            .as_deref()
            .and_then(|s| NaiveDateTime::parse_from_str(s, HOLFUY_TIME_FORMAT).ok())
            .map(|naive| Utc.from_utc_datetime(&naive))
            .unwrap_or_else(Utc::now);

        let mut measurement = Measurement::new(station_id, self.source_name(), observed_at);
        if let Some(wind) = &reading.wind {
            if let Some(speed) = wind.speed {
                measurement.set(MeasurementKind::WindSpeed, speed);
            }
            if let Some(gust) = wind.gust {
                measurement.set(MeasurementKind::GustSpeed, gust);
            }
            if let Some(direction) = wind.direction {
                measurement.set(MeasurementKind::WindDirection, direction);
            }
        }
        if let Some(v) = reading.temperature {
            measurement.set(MeasurementKind::Temperature, v);
        }
        if let Some(v) = reading.humidity {
            measurement.set(MeasurementKind::Humidity, v);
        }
        if let Some(v) = reading.pressure {
            measurement.set(MeasurementKind::Pressure, v);
        }
        if let Some(v) = reading.rain {
            measurement.set(MeasurementKind::Rain, v);
        }

        if measurement.is_empty() {
            debug!(station_id = requested_id, "Holfuy record carried no values, skipping");
            return None;
        }
        Some(measurement)
    }
}

#[async_trait]
impl WeatherSource for HolfuyCollector {
    fn source_name(&self) -> &'static str {
        "holfuy"
    }

    async fn fetch(&self, station_ids: &[String]) -> Result<Value, CollectorError> {
        if station_ids.is_empty() {
            return Err(CollectorError::NoData(
                "holfuy requires explicit station ids".into(),
            ));
        }

        let mut all = Map::new();
        let mut last_error: Option<CollectorError> = None;
        for station_id in station_ids {
            let mut query: Vec<(&str, &str)> = vec![("s", station_id.as_str())];
            if let Some(key) = &self.api_key {
                query.push(("pw", key.as_str()));
            }

            debug!(%station_id, "fetching Holfuy station");
            let response = match self.client.get(&self.base_url).query(&query).send().await {
                Ok(response) => response,
                Err(err) => {
                    warn!(%station_id, %err, "Holfuy request failed, skipping station");
                    last_error = Some(err.into());
                    continue;
                }
            };
            if !response.status().is_success() {
                let err = CollectorError::Status {
                    endpoint: self.base_url.clone(),
                    status: response.status().as_u16(),
                };
                warn!(%station_id, %err, "skipping station");
                last_error = Some(err);
                continue;
            }
            match response.json::<Value>().await {
                Ok(body) => {
                    all.insert(station_id.clone(), body);
                }
                Err(err) => {
                    warn!(%station_id, %err, "invalid JSON from Holfuy, skipping station");
                    last_error = Some(err.into());
                }
            }
        }

        if all.is_empty() {
            return Err(last_error.unwrap_or_else(|| CollectorError::NoData("holfuy".into())));
        }
        Ok(Value::Object(all))
    }

    fn normalize(&self, raw: &Value) -> Vec<Measurement> {
        let Some(stations) = raw.as_object() else {
            return Vec::new();
        };
        stations
            .iter()
            .filter_map(|(station_id, data)| self.normalize_one(station_id, data))
            .collect()
    }
}
