//! Observed payment types.

use serde::{Deserialize, Serialize};

use crate::ledger::{format_amount, AccountId, LedgerSequence};

/// A payment touching the account of interest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// Effective source of the payment
    pub source: AccountId,

    /// Amount in stroops
    pub amount: i64,

    /// Normalized asset code
    pub asset_code: String,

    /// Receiving account
    pub destination: AccountId,

    /// Ledger containing the payment
    pub ledger_sequence: LedgerSequence,

    /// Hash of the enclosing transaction (hex)
    pub tx_hash: String,

    /// Transaction position within the ledger
    pub tx_index: u32,

    /// Operation position within the transaction
    pub op_index: u32,
}

impl Observation {
    /// Unique identifier for this payment (tx_hash:op_index).
    pub fn observation_id(&self) -> String {
        format!("{}:{}", self.tx_hash, self.op_index)
    }

    /// Position in ledger order, used to check ordering.
    pub fn position(&self) -> (LedgerSequence, u32, u32) {
        (self.ledger_sequence, self.tx_index, self.op_index)
    }

    /// One-line description in the scanner's log format.
    pub fn describe(&self) -> String {
        format!(
            "Account {} sent {} {} to {}",
            self.source, self.amount, self.asset_code, self.destination
        )
    }

    /// Amount formatted in whole units.
    pub fn display_amount(&self) -> String {
        format_amount(self.amount)
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Convert to pretty-printed JSON string.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Summary of one fully processed ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    /// Ledger sequence
    pub sequence: LedgerSequence,

    /// Transactions read from the ledger
    pub transactions: u64,

    /// Transactions skipped because they failed
    pub failed_transactions: u64,

    /// Payment operations inspected
    pub payments: u64,

    /// Observations emitted
    pub observations: u64,
}

impl LedgerStats {
    /// Empty stats for a ledger.
    pub fn new(sequence: LedgerSequence) -> Self {
        Self {
            sequence,
            ..Default::default()
        }
    }
}
