//! Client for the QuickChart rendering service: posts a chart document,
//! receives a short-lived image URL.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::services::chart_api::ChartApi;

const DEFAULT_BASE_URL: &str = "https://quickchart.io";
const WIDTH: u32 = 1000;
const HEIGHT: u32 = 500;

pub struct QuickChartClient {
    base_url: String,
    http: reqwest::Client,
}

impl QuickChartClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }
}

impl Default for QuickChartClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct CreateResponse {
    url: String,
}

#[async_trait::async_trait]
impl ChartApi for QuickChartClient {
    async fn render(&self, chart: &Value) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/chart/create", self.base_url))
            .json(&json!({
                "chart": chart,
                "width": WIDTH,
                "height": HEIGHT,
            }))
            .send()
            .await
            .context("chart render request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("chart service returned {status}: {body}");
        }

        let created: CreateResponse = response
            .json()
            .await
            .context("failed to parse chart service response")?;
        debug!(url = %created.url, "Chart rendered");
        Ok(created.url)
    }
}
