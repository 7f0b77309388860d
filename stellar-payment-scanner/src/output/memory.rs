//! In-memory sink.

use std::sync::{Arc, Mutex};

use super::ObservationSink;
use crate::observation::Observation;
use async_trait::async_trait;

/// Sink that keeps every observation in memory.
///
/// Clones share the same buffer, so a clone can be handed to the scanner and
/// inspected afterwards.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    observations: Arc<Mutex<Vec<Observation>>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Observations emitted so far, in order.
    pub fn observations(&self) -> Vec<Observation> {
        self.observations
            .lock()
            .map(|o| o.clone())
            .unwrap_or_default()
    }

    /// Number of observations emitted so far.
    pub fn len(&self) -> usize {
        self.observations.lock().map(|o| o.len()).unwrap_or(0)
    }

    /// Whether nothing has been emitted.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObservationSink for MemorySink {
    async fn emit(&self, observation: &Observation) -> anyhow::Result<()> {
        self.observations
            .lock()
            .map_err(|_| anyhow::anyhow!("memory sink poisoned"))?
            .push(observation.clone());
        Ok(())
    }
}
