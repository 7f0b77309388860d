//! Log sink.

use super::ObservationSink;
use crate::observation::Observation;
use async_trait::async_trait;

/// Sink that reports each payment as an `info` log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl ObservationSink for LogSink {
    async fn emit(&self, observation: &Observation) -> anyhow::Result<()> {
        tracing::info!(
            ledger = observation.ledger_sequence,
            tx = %observation.tx_hash,
            "{}",
            observation.describe()
        );
        Ok(())
    }
}
