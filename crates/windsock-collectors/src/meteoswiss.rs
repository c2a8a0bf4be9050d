//! MeteoSwiss open-data collector.
//!
//! MeteoSwiss publishes one GeoJSON endpoint per measurement; readings are
//! merged per station feature id. Wind figures arrive in km/h and are
//! converted to m/s. The feed covers the whole Swiss network, so callers
//! filter the result down to registered stations.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use windsock_core::{Measurement, MeasurementKind};

use crate::error::CollectorError;
use crate::source::{kmh_to_ms, WeatherSource};

const USER_AGENT: &str = "Windsock/0.1 (paragliding launch advisor)";

/// One endpoint per measurement; the first tuple element keys the raw
/// payload and selects the unit conversion during normalization.
const ENDPOINTS: [(&str, &str); 6] = [
    ("speed", "https://data.geo.admin.ch/ch.meteoschweiz.messwerte-windgeschwindigkeit-kmh-10min/ch.meteoschweiz.messwerte-windgeschwindigkeit-kmh-10min_en.json"),
    ("gusts", "https://data.geo.admin.ch/ch.meteoschweiz.messwerte-wind-boeenspitze-kmh-10min/ch.meteoschweiz.messwerte-wind-boeenspitze-kmh-10min_en.json"),
    ("wind_direction", "https://data.geo.admin.ch/ch.meteoschweiz.messwerte-windrichtung-10min/ch.meteoschweiz.messwerte-windrichtung-10min_en.json"),
    ("temperature", "https://data.geo.admin.ch/ch.meteoschweiz.messwerte-lufttemperatur-10min/ch.meteoschweiz.messwerte-lufttemperatur-10min_en.json"),
    ("humidity", "https://data.geo.admin.ch/ch.meteoschweiz.messwerte-luftfeuchtigkeit-10min/ch.meteoschweiz.messwerte-luftfeuchtigkeit-10min_en.json"),
    ("pressure", "https://data.geo.admin.ch/ch.meteoschweiz.messwerte-luftdruck-qff-10min/ch.meteoschweiz.messwerte-luftdruck-qff-10min_en.json"),
];

pub struct MeteoSwissCollector {
    client: Client,
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    properties: FeatureProperties,
}

#[derive(Debug, Default, Deserialize)]
struct FeatureProperties {
    #[serde(default)]
    value: Option<f64>,
    #[serde(default)]
    reference_ts: Option<String>,
}

impl Default for MeteoSwissCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MeteoSwissCollector {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_default(),
        }
    }

    fn apply(kind_tag: &str, value: f64, measurement: &mut Measurement) {
        match kind_tag {
            "speed" => measurement.set(MeasurementKind::WindSpeed, kmh_to_ms(value)),
            "gusts" => measurement.set(MeasurementKind::GustSpeed, kmh_to_ms(value)),
            "wind_direction" => measurement.set(MeasurementKind::WindDirection, value),
            "temperature" => measurement.set(MeasurementKind::Temperature, value),
            "humidity" => measurement.set(MeasurementKind::Humidity, value),
            "pressure" => measurement.set(MeasurementKind::Pressure, value),
            other => debug!(kind = other, "unknown MeteoSwiss endpoint tag"),
        }
    }
}

#[async_trait]
impl WeatherSource for MeteoSwissCollector {
    fn source_name(&self) -> &'static str {
        "meteoswiss"
    }

    /// Fetches the whole network; `station_ids` is ignored here and the
    /// caller filters after normalization.
    async fn fetch(&self, _station_ids: &[String]) -> Result<Value, CollectorError> {
        let mut raw = Map::new();
        let mut last_error: Option<CollectorError> = None;
        for (kind_tag, url) in ENDPOINTS {
            debug!(kind = kind_tag, "fetching MeteoSwiss endpoint");
            let response = match self.client.get(url).send().await {
                Ok(response) => response,
                Err(err) => {
                    warn!(kind = kind_tag, %err, "MeteoSwiss request failed, skipping endpoint");
                    last_error = Some(err.into());
                    continue;
                }
            };
            if !response.status().is_success() {
                let err = CollectorError::Status {
                    endpoint: url.to_string(),
                    status: response.status().as_u16(),
                };
                warn!(kind = kind_tag, %err, "skipping endpoint");
                last_error = Some(err);
                continue;
            }
            match response.json::<Value>().await {
                Ok(body) => {
                    raw.insert(kind_tag.to_string(), body);
                }
                Err(err) => {
                    warn!(kind = kind_tag, %err, "invalid JSON from MeteoSwiss, skipping endpoint");
                    last_error = Some(err.into());
                }
            }
        }

        if raw.is_empty() {
            return Err(last_error.unwrap_or_else(|| CollectorError::NoData("meteoswiss".into())));
        }
        Ok(Value::Object(raw))
    }

    fn normalize(&self, raw: &Value) -> Vec<Measurement> {
        let Some(endpoints) = raw.as_object() else {
            return Vec::new();
        };

        let mut merged: BTreeMap<String, Measurement> = BTreeMap::new();
        let mut timestamps: BTreeMap<String, DateTime<Utc>> = BTreeMap::new();

        for (kind_tag, body) in endpoints {
            let collection: FeatureCollection = match serde_json::from_value(body.clone()) {
                Ok(collection) => collection,
                Err(err) => {
                    warn!(kind = %kind_tag, %err, "unusable MeteoSwiss payload, skipping endpoint");
                    continue;
                }
            };

            for feature in collection.features {
                let Some(station_id) = feature.id else { continue };
                let Some(value) = feature.properties.value else { continue };

                let measurement = merged
                    .entry(station_id.clone())
                    .or_insert_with(|| Measurement::new(station_id.clone(), "meteoswiss", Utc::now()));
                Self::apply(kind_tag, value, measurement);

                if let Some(ts) = feature
                    .properties
                    .reference_ts
                    .as_deref()
                    .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                {
                    timestamps.entry(station_id).or_insert_with(|| ts.with_timezone(&Utc));
                }
            }
        }

        merged
            .into_iter()
            .map(|(station_id, mut m)| {
                if let Some(ts) = timestamps.get(&station_id) {
                    m.observed_at = *ts;
                }
                m
            })
            .filter(|m| !m.is_empty())
            .collect()
    }
}
