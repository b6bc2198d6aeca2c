//! Discord webhook delivery for finished reports.

use anyhow::{Context, Result};
use tracing::debug;

use crate::services::messaging::{MessagingSink, WebhookMessage};

pub struct DiscordWebhook {
    http: reqwest::Client,
}

impl DiscordWebhook {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl Default for DiscordWebhook {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MessagingSink for DiscordWebhook {
    async fn post(&self, webhook_url: &str, message: &WebhookMessage) -> Result<()> {
        let response = self
            .http
            .post(webhook_url)
            .json(message)
            .send()
            .await
            .context("webhook request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("webhook returned {status}: {body}");
        }

        debug!(embeds = message.embeds.len(), "Webhook delivered");
        Ok(())
    }
}
