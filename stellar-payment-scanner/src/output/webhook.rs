//! Webhook sink.
//!
//! Posts observations to a configured webhook URL.

use super::ObservationSink;
use crate::observation::Observation;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Sink that POSTs observations to a webhook URL.
pub struct WebhookSink {
    /// HTTP client
    client: Client,
    /// Webhook URL
    url: String,
    /// Number of retries on failure
    max_retries: u32,
    /// Retry delay
    retry_delay: Duration,
}

impl WebhookSink {
    /// Create a new webhook sink.
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            url: url.to_string(),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Create a webhook sink with custom retry settings.
    pub fn with_retries(url: &str, max_retries: u32, retry_delay: Duration) -> anyhow::Result<Self> {
        let mut sink = Self::new(url)?;
        sink.max_retries = max_retries;
        sink.retry_delay = retry_delay;
        Ok(sink)
    }

    async fn post_once(&self, observation: &Observation) -> anyhow::Result<()> {
        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(observation)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Webhook returned status {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            );
        }

        tracing::debug!("Posted payment {} to webhook", observation.observation_id());

        Ok(())
    }
}

#[async_trait]
impl ObservationSink for WebhookSink {
    async fn emit(&self, observation: &Observation) -> anyhow::Result<()> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tracing::warn!(
                    "Webhook retry {} for payment {}",
                    attempt,
                    observation.observation_id()
                );
                tokio::time::sleep(self.retry_delay * attempt).await;
            }

            match self.post_once(observation).await {
                Ok(()) => return Ok(()),
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Unknown webhook error")))
    }
}
