//! Error types for the payment scanner.

use crate::ledger::LedgerSequence;
use displaydoc::Display;
use thiserror::Error;

/// Errors reported by a ledger backend.
#[derive(Debug, Display, Error)]
pub enum BackendError {
    /// Ledger {0} has not closed yet
    NotYetAvailable(LedgerSequence),

    /// Range starting at {start} rejected: {reason}
    RangeRejected {
        /// First ledger of the requested range
        start: LedgerSequence,
        /// Why the backend refused it
        reason: String,
    },

    /// Backend serves network "{actual}", expected "{expected}"
    NetworkMismatch {
        /// Configured network passphrase
        expected: String,
        /// Passphrase reported by the backend
        actual: String,
    },

    /// Ledger {0} is not available from this backend
    LedgerUnavailable(LedgerSequence),

    /// No range has been prepared
    RangeNotPrepared,

    /// Ledger {0} is outside the prepared range
    OutsideRange(LedgerSequence),

    /// Malformed ledger data: {0}
    Malformed(String),

    /// Transport error: {0}
    Transport(#[from] reqwest::Error),

    /// Backend returned status {status} for {url}
    Status {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// I/O error: {0}
    Io(#[from] std::io::Error),
}

impl BackendError {
    /// Whether the cursor should wait and retry the same ledger rather than
    /// stop.
    pub fn is_not_yet_available(&self) -> bool {
        matches!(self, BackendError::NotYetAvailable(_))
    }
}

/// Fatal errors that stop the scan.
#[derive(Debug, Display, Error)]
pub enum ScanError {
    /// Failed to prepare range from ledger {start}: {source}
    Prepare {
        /// First ledger of the requested range
        start: LedgerSequence,
        /// Underlying backend failure
        source: BackendError,
    },

    /// Failed to open ledger {sequence}: {source}
    OpenLedger {
        /// Ledger being opened
        sequence: LedgerSequence,
        /// Underlying backend failure
        source: BackendError,
    },

    /// Failed to read ledger {sequence}: {source}
    ReadLedger {
        /// Ledger being read
        sequence: LedgerSequence,
        /// Underlying backend failure
        source: BackendError,
    },

    /// Sink rejected observation in ledger {sequence}: {message}
    Sink {
        /// Ledger the observation came from
        sequence: LedgerSequence,
        /// Sink error text
        message: String,
    },

    /// Failed to save checkpoint after ledger {sequence}: {message}
    Checkpoint {
        /// Last fully processed ledger
        sequence: LedgerSequence,
        /// Checkpoint error text
        message: String,
    },

    /// Ledger sequence overflowed after {0}
    SequenceOverflow(LedgerSequence),

    /// Scanner already stopped after a fatal error
    Halted,
}
