//! Stellar Payment Scanner
//!
//! Streams the payments touching a single account out of the Stellar ledger,
//! in ledger order, starting from a configured ledger sequence. This library
//! provides:
//!
//! - A ledger cursor that walks forward one ledger at a time and never skips
//! - Backends reading ledgers from Horizon or from a recorded replay
//! - Payment matching with operation-level source overrides
//! - Multiple output sinks (log, stdout, webhook)
//! - An optional checkpoint for resuming after restarts
//!
//! # Architecture
//!
//! [`PaymentScanner`] owns the current ledger sequence and the backend. For
//! each ledger it opens a [`TransactionReader`](backend::TransactionReader),
//! hands every transaction to the [`PaymentMatcher`], sends matches to an
//! [`ObservationSink`](output::ObservationSink), closes the reader and moves
//! to the next ledger. A ledger that has not closed yet is waited for; any
//! other backend failure stops the scan, since skipping a ledger would leave
//! a silent gap in the payment history.

pub mod backend;
pub mod backoff;
pub mod config;
pub mod error;
pub mod ledger;
pub mod matcher;
pub mod observation;
pub mod output;
pub mod scanner;
pub mod sync;

pub use config::{OutputMode, ScannerConfig};
pub use error::{BackendError, ScanError};
pub use ledger::{AccountId, Asset, LedgerSequence, Operation, TransactionOutcome};
pub use matcher::PaymentMatcher;
pub use observation::Observation;
pub use scanner::{PaymentScanner, ScanState};
pub use sync::SyncState;
