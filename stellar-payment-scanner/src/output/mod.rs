//! Sinks for observed payments.
//!
//! This module provides different ways to report observations:
//! - Log (a tracing `info` line per payment)
//! - Stdout (JSON lines)
//! - Webhook (HTTP POST)
//! - Memory (collects observations, for replays and tests)

mod log;
mod memory;
mod stdout;
mod webhook;

pub use self::log::LogSink;
pub use memory::MemorySink;
pub use stdout::StdoutSink;
pub use webhook::WebhookSink;

use crate::{
    config::{OutputMode, ScannerConfig},
    observation::Observation,
};
use async_trait::async_trait;

/// Receiver of observed payments.
#[async_trait]
pub trait ObservationSink: Send + Sync {
    /// Emit one observation.
    async fn emit(&self, observation: &Observation) -> anyhow::Result<()>;

    /// Flush any buffered output.
    async fn flush(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Create a sink based on configuration.
pub fn create_sink(config: &ScannerConfig) -> anyhow::Result<Box<dyn ObservationSink>> {
    match config.output_mode {
        OutputMode::Log => Ok(Box::new(LogSink)),
        OutputMode::Stdout if config.pretty_json => Ok(Box::new(StdoutSink::pretty())),
        OutputMode::Stdout => Ok(Box::new(StdoutSink::new())),
        OutputMode::Webhook => {
            let url = config
                .webhook_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("webhook_url required for webhook output mode"))?;
            Ok(Box::new(WebhookSink::with_retries(
                url,
                config.webhook_max_retries,
                config.webhook_retry_delay(),
            )?))
        }
    }
}
