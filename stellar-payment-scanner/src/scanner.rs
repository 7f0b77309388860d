//! Ledger cursor.
//!
//! [`PaymentScanner`] owns the current ledger sequence and walks the ledger
//! forward one sequence at a time: open a reader, drain it through the
//! [`PaymentMatcher`], close it, advance. Ledgers are never skipped; any
//! backend failure other than "not closed yet" stops the scan.

use std::{convert::Infallible, path::PathBuf, time::Duration};

use crate::{
    backend::{LedgerBackend, TransactionReader},
    backoff::{BackoffStrategy, LinearBackoff},
    error::ScanError,
    ledger::{AccountId, LedgerSequence},
    matcher::PaymentMatcher,
    observation::LedgerStats,
    output::ObservationSink,
    sync::SyncState,
};

/// Where the cursor is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Range not yet prepared
    Preparing,
    /// Next ledger to process
    StreamingLedger(LedgerSequence),
    /// Stopped after a fatal error
    Fatal,
}

/// Checkpoint file plus the progress written to it.
struct Checkpoint {
    path: PathBuf,
    state: SyncState,
}

/// Streams payments touching one account, ledger by ledger.
pub struct PaymentScanner<B: LedgerBackend> {
    /// Ledger data source, driven exclusively by this scanner
    backend: B,

    /// Payment matching rules
    matcher: PaymentMatcher,

    /// Where observations go
    sink: Box<dyn ObservationSink>,

    /// Wait strategy while a ledger has not closed
    backoff: Box<dyn BackoffStrategy>,

    /// First ledger of the scan
    start: LedgerSequence,

    /// Cursor state
    state: ScanState,

    /// Optional on-disk progress
    checkpoint: Option<Checkpoint>,
}

impl<B: LedgerBackend> PaymentScanner<B> {
    /// Create a scanner that starts at `start`.
    pub fn new(
        backend: B,
        account: AccountId,
        start: LedgerSequence,
        sink: Box<dyn ObservationSink>,
    ) -> Self {
        Self {
            backend,
            matcher: PaymentMatcher::new(account),
            sink,
            backoff: Box::new(LinearBackoff::new(
                Duration::from_secs(1),
                Duration::from_secs(5),
            )),
            start,
            state: ScanState::Preparing,
            checkpoint: None,
        }
    }

    /// Use a different wait strategy.
    pub fn with_backoff(mut self, backoff: Box<dyn BackoffStrategy>) -> Self {
        self.backoff = backoff;
        self
    }

    /// Save progress to `path` after every ledger.
    pub fn with_checkpoint(mut self, path: PathBuf, state: SyncState) -> Self {
        self.checkpoint = Some(Checkpoint { path, state });
        self
    }

    /// Current cursor state.
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Account being matched.
    pub fn account(&self) -> &AccountId {
        self.matcher.account()
    }

    /// Progress recorded so far, if checkpointing.
    pub fn sync_state(&self) -> Option<&SyncState> {
        self.checkpoint.as_ref().map(|c| &c.state)
    }

    /// Scan forever. Only returns on a fatal error.
    pub async fn run(&mut self) -> Result<Infallible, ScanError> {
        tracing::info!(
            "Streaming payments for {} from ledger {}",
            self.matcher.account(),
            self.start
        );
        loop {
            self.step().await?;
        }
    }

    /// Scan until ledger `last` has been fully processed.
    pub async fn run_until(&mut self, last: LedgerSequence) -> Result<(), ScanError> {
        tracing::info!(
            "Streaming payments for {} from ledger {} to {}",
            self.matcher.account(),
            self.start,
            last
        );
        loop {
            let next = match self.state() {
                ScanState::Preparing => self.start,
                ScanState::StreamingLedger(next) => next,
                ScanState::Fatal => return Err(ScanError::Halted),
            };
            if next > last {
                tracing::info!("Ledger {} is past {}, nothing to scan", next, last);
                return Ok(());
            }

            let stats = self.step().await?;
            if stats.sequence >= last {
                return Ok(());
            }
        }
    }

    /// Prepare the backend range, if not done yet.
    pub async fn prepare(&mut self) -> Result<(), ScanError> {
        match self.state {
            ScanState::Preparing => {}
            ScanState::StreamingLedger(_) => return Ok(()),
            ScanState::Fatal => return Err(ScanError::Halted),
        }

        match self.backend.prepare_range(self.start).await {
            Ok(()) => {
                self.state = ScanState::StreamingLedger(self.start);
                Ok(())
            }
            Err(source) => {
                self.state = ScanState::Fatal;
                Err(ScanError::Prepare {
                    start: self.start,
                    source,
                })
            }
        }
    }

    /// Process the next ledger and advance the cursor past it.
    pub async fn step(&mut self) -> Result<LedgerStats, ScanError> {
        self.prepare().await?;
        let sequence = match self.state {
            ScanState::StreamingLedger(sequence) => sequence,
            ScanState::Preparing | ScanState::Fatal => return Err(ScanError::Halted),
        };

        let result = self.complete_ledger(sequence).await;
        if result.is_err() {
            self.state = ScanState::Fatal;
        }
        result
    }

    async fn complete_ledger(&mut self, sequence: LedgerSequence) -> Result<LedgerStats, ScanError> {
        let stats = self.process_ledger(sequence).await?;

        if let Some(checkpoint) = &mut self.checkpoint {
            checkpoint.state.record_ledger(&stats);
            checkpoint
                .state
                .save(&checkpoint.path)
                .map_err(|e| ScanError::Checkpoint {
                    sequence,
                    message: e.to_string(),
                })?;
        }

        let next = sequence
            .checked_add(1)
            .ok_or(ScanError::SequenceOverflow(sequence))?;
        self.state = ScanState::StreamingLedger(next);
        Ok(stats)
    }

    /// Open, drain and close one ledger.
    ///
    /// The reader is closed whether draining succeeds or fails. The cursor
    /// is not moved; use [`step`](Self::step) to advance.
    pub async fn process_ledger(&mut self, sequence: LedgerSequence) -> Result<LedgerStats, ScanError> {
        let mut reader = self.open_reader(sequence).await?;
        let result = self.drain(&mut reader).await;
        reader.close();
        let stats = result?;

        self.sink.flush().await.map_err(|e| ScanError::Sink {
            sequence,
            message: e.to_string(),
        })?;

        tracing::debug!(
            "Ledger {}: {} transactions ({} failed), {} payments, {} matched",
            stats.sequence,
            stats.transactions,
            stats.failed_transactions,
            stats.payments,
            stats.observations
        );
        Ok(stats)
    }

    async fn open_reader(&mut self, sequence: LedgerSequence) -> Result<B::Reader, ScanError> {
        let mut attempt: u32 = 0;
        loop {
            match self.backend.open_transaction_reader(sequence).await {
                Ok(reader) => return Ok(reader),
                Err(e) if e.is_not_yet_available() => {
                    attempt = attempt.saturating_add(1);
                    let delay = self.backoff.delay(attempt);
                    if attempt == 1 {
                        tracing::debug!("Waiting for ledger {} to close", sequence);
                    } else {
                        tracing::trace!(
                            "Ledger {} still not closed (attempt {}), retrying in {:?}",
                            sequence,
                            attempt,
                            delay
                        );
                    }
                    tokio::time::sleep(delay).await;
                }
                Err(source) => return Err(ScanError::OpenLedger { sequence, source }),
            }
        }
    }

    async fn drain(&self, reader: &mut B::Reader) -> Result<LedgerStats, ScanError> {
        let sequence = reader.sequence();
        let mut stats = LedgerStats::new(sequence);

        while let Some(outcome) = reader
            .read()
            .await
            .map_err(|source| ScanError::ReadLedger { sequence, source })?
        {
            stats.transactions += 1;

            let matched = self.matcher.process(&outcome);
            if matched.skipped_failed {
                stats.failed_transactions += 1;
            }
            stats.payments += matched.payments;

            for observation in &matched.observations {
                self.sink
                    .emit(observation)
                    .await
                    .map_err(|e| ScanError::Sink {
                        sequence,
                        message: e.to_string(),
                    })?;
                stats.observations += 1;
            }
        }

        Ok(stats)
    }
}
