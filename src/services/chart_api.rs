//! Trait for the chart rendering service.

use anyhow::Result;
use serde_json::Value;

/// Turns a chart.js-shaped document into a hosted image URL.
#[async_trait::async_trait]
pub trait ChartApi: Send + Sync {
    async fn render(&self, chart: &Value) -> Result<String>;
}
