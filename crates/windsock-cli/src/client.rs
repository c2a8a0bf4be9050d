//! Thin HTTP client for the windsock REST API.

use anyhow::{anyhow, bail, Result};
use serde::de::DeserializeOwned;

use windsock_core::{Decision, Launch, Measurement};

/// Client for talking to a running windsock server.
pub struct WindsockClient {
    base_url: String,
    client: reqwest::Client,
}

impl WindsockClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    pub async fn launches(&self) -> Result<Vec<Launch>> {
        self.get("/api/v1/launches".to_string()).await
    }

    /// Find a launch by id, falling back to a case-insensitive name match.
    pub async fn resolve_launch(&self, selector: &str) -> Result<Launch> {
        let launches = self.launches().await?;
        launches
            .iter()
            .find(|l| l.id == selector)
            .or_else(|| {
                launches
                    .iter()
                    .find(|l| l.name.eq_ignore_ascii_case(selector))
            })
            .cloned()
            .ok_or_else(|| anyhow!("no launch matches '{}'", selector))
    }

    /// Evaluate a launch right now.
    pub async fn decide(&self, launch_id: &str) -> Result<Decision> {
        self.get(format!("/api/v1/decisions/{}", launch_id)).await
    }

    /// Push a manual measurement for a station.
    pub async fn report_measurement(&self, body: &serde_json::Value) -> Result<Measurement> {
        let response = self
            .client
            .post(format!("{}/api/v1/measurements", self.base_url))
            .json(body)
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: String) -> Result<T> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            let message = body["error"].as_str().unwrap_or("unknown error");
            bail!("server returned {}: {}", status, message);
        }
        Ok(response.json().await?)
    }
}
