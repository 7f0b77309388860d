//! Replay backend.
//!
//! Serves a recorded, ordered set of ledgers from memory. Useful for
//! reproducing a scan offline and for exercising the pipeline in tests.

use std::{collections::VecDeque, path::Path};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{LedgerBackend, TransactionReader};
use crate::{
    error::BackendError,
    ledger::{LedgerSequence, TransactionOutcome},
};

/// One recorded ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayLedger {
    /// Ledger sequence
    pub sequence: LedgerSequence,

    /// Transactions in ledger order
    #[serde(default)]
    pub transactions: Vec<TransactionOutcome>,
}

/// On-disk replay fixture.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayFixture {
    /// Network the ledgers were recorded from
    #[serde(default)]
    pub network_passphrase: Option<String>,

    /// Recorded ledgers, ascending
    pub ledgers: Vec<ReplayLedger>,
}

impl ReplayFixture {
    /// Load a fixture from a JSON file.
    pub fn load(path: &Path) -> Result<Self, BackendError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| BackendError::Malformed(format!("replay fixture {:?}: {}", path, e)))
    }
}

/// Backend serving ledgers from a [`ReplayFixture`].
#[derive(Debug)]
pub struct ReplayBackend {
    ledgers: Vec<ReplayLedger>,
    recorded_network: Option<String>,
    expected_network: String,
    prepared_from: Option<LedgerSequence>,
}

impl ReplayBackend {
    /// Create a backend over `ledgers` for the given network.
    ///
    /// Ledgers are sorted, and each transaction's ledger sequence and index
    /// are taken from its position in the recording.
    pub fn new(network_passphrase: &str, mut ledgers: Vec<ReplayLedger>) -> Self {
        ledgers.sort_by_key(|l| l.sequence);
        for ledger in &mut ledgers {
            for (index, tx) in ledger.transactions.iter_mut().enumerate() {
                tx.ledger_sequence = ledger.sequence;
                tx.index = index as u32;
            }
        }

        Self {
            ledgers,
            recorded_network: None,
            expected_network: network_passphrase.to_string(),
            prepared_from: None,
        }
    }

    /// Create a backend from a loaded fixture.
    pub fn from_fixture(network_passphrase: &str, fixture: ReplayFixture) -> Self {
        let mut backend = Self::new(network_passphrase, fixture.ledgers);
        backend.recorded_network = fixture.network_passphrase;
        backend
    }

    /// First recorded ledger.
    pub fn first_sequence(&self) -> Option<LedgerSequence> {
        self.ledgers.first().map(|l| l.sequence)
    }

    /// Last recorded ledger.
    pub fn last_sequence(&self) -> Option<LedgerSequence> {
        self.ledgers.last().map(|l| l.sequence)
    }
}

#[async_trait]
impl LedgerBackend for ReplayBackend {
    type Reader = ReplayReader;

    async fn prepare_range(&mut self, start: LedgerSequence) -> Result<(), BackendError> {
        if let Some(recorded) = &self.recorded_network {
            if *recorded != self.expected_network {
                return Err(BackendError::NetworkMismatch {
                    expected: self.expected_network.clone(),
                    actual: recorded.clone(),
                });
            }
        }

        let (first, last) = match (self.first_sequence(), self.last_sequence()) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return Err(BackendError::RangeRejected {
                    start,
                    reason: "replay contains no ledgers".to_string(),
                })
            }
        };
        if start < first || start > last {
            return Err(BackendError::RangeRejected {
                start,
                reason: format!("replay covers ledgers {} to {}", first, last),
            });
        }

        tracing::debug!("Replay range prepared from ledger {} (last {})", start, last);
        self.prepared_from = Some(start);
        Ok(())
    }

    async fn open_transaction_reader(
        &mut self,
        sequence: LedgerSequence,
    ) -> Result<ReplayReader, BackendError> {
        let start = self.prepared_from.ok_or(BackendError::RangeNotPrepared)?;
        if sequence < start {
            return Err(BackendError::OutsideRange(sequence));
        }

        let ledger = self
            .ledgers
            .binary_search_by_key(&sequence, |l| l.sequence)
            .map(|i| &self.ledgers[i])
            .map_err(|_| BackendError::LedgerUnavailable(sequence))?;

        Ok(ReplayReader {
            sequence,
            pending: ledger.transactions.iter().cloned().collect(),
        })
    }
}

/// Reader over one recorded ledger.
#[derive(Debug)]
pub struct ReplayReader {
    sequence: LedgerSequence,
    pending: VecDeque<TransactionOutcome>,
}

#[async_trait]
impl TransactionReader for ReplayReader {
    fn sequence(&self) -> LedgerSequence {
        self.sequence
    }

    async fn read(&mut self) -> Result<Option<TransactionOutcome>, BackendError> {
        Ok(self.pending.pop_front())
    }

    fn close(&mut self) {
        self.pending.clear();
    }
}
