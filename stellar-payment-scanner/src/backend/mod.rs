//! Ledger data sources.
//!
//! A backend streams ledgers forward from a prepared starting point:
//! - Horizon (HTTP/JSON)
//! - Replay (in-memory ledgers, loadable from a JSON fixture)

mod horizon;
mod replay;

pub use horizon::{HorizonBackend, HorizonTransactionReader, MAX_PAGE_LIMIT};
pub use replay::{ReplayBackend, ReplayFixture, ReplayLedger, ReplayReader};

use crate::{
    error::BackendError,
    ledger::{LedgerSequence, TransactionOutcome},
};
use async_trait::async_trait;

/// Source of ledger transactions.
///
/// The scanner owns its backend exclusively and drives it strictly in order:
/// one `prepare_range`, then one reader per ledger.
#[async_trait]
pub trait LedgerBackend: Send {
    /// Reader for a single ledger.
    type Reader: TransactionReader;

    /// Prepare an open-ended range starting at `start`.
    async fn prepare_range(&mut self, start: LedgerSequence) -> Result<(), BackendError>;

    /// Open a reader over the transactions of ledger `sequence`.
    ///
    /// Returns [`BackendError::NotYetAvailable`] if the ledger has not closed.
    async fn open_transaction_reader(
        &mut self,
        sequence: LedgerSequence,
    ) -> Result<Self::Reader, BackendError>;
}

/// Lazy, finite sequence of transactions for one ledger.
#[async_trait]
pub trait TransactionReader: Send {
    /// Ledger this reader covers.
    fn sequence(&self) -> LedgerSequence;

    /// Next transaction in ledger order, or `None` at end of ledger.
    async fn read(&mut self) -> Result<Option<TransactionOutcome>, BackendError>;

    /// Release any resources held by the reader.
    fn close(&mut self) {}
}
