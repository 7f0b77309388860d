//! Ledger data model.
//!
//! These are the shapes a [`LedgerBackend`](crate::backend::LedgerBackend)
//! hands to the scanner: one [`TransactionOutcome`] per transaction, each
//! carrying its operations in submission order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ledger sequence number (a.k.a. ledger height).
pub type LedgerSequence = u32;

/// Symbol reported for the network's native asset.
pub const NATIVE_ASSET_CODE: &str = "XLM";

/// Placeholder reported for assets with no displayable code.
pub const POOL_SHARES_CODE: &str = "liquidity pool shares";

/// Stroops per whole unit of any asset.
pub const STROOPS_PER_UNIT: i64 = 10_000_000;

/// Account address in its canonical strkey form.
///
/// Comparison is exact; no case folding or muxed-account unwrapping is done.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Wrap an address string.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// The address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

impl From<String> for AccountId {
    fn from(address: String) -> Self {
        Self(address)
    }
}

/// Asset moved by a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Asset {
    /// The ledger's base currency
    Native,
    /// Issuer-defined token
    Issued {
        /// Asset code (1-12 characters)
        code: String,
        /// Issuing account
        issuer: AccountId,
    },
    /// Liquidity pool shares
    PoolShares,
}

impl Asset {
    /// Human-readable asset code.
    pub fn code(&self) -> &str {
        match self {
            Asset::Native => NATIVE_ASSET_CODE,
            Asset::Issued { code, .. } => code,
            Asset::PoolShares => POOL_SHARES_CODE,
        }
    }
}

/// Payment operation body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Receiving account
    pub destination: AccountId,
    /// Asset being sent
    pub asset: Asset,
    /// Amount in stroops
    pub amount: i64,
}

/// Operation kinds.
///
/// Only payments are inspected; everything else is carried by name so that
/// adding a kind forces every match site to be revisited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationBody {
    /// Direct payment
    Payment(Payment),
    /// Any other operation type, by its ledger name
    Other {
        /// Operation type name, e.g. `create_account`
        name: String,
    },
}

/// A single operation inside a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Operation-level source account, overriding the transaction's
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_account: Option<AccountId>,
    /// What the operation does
    #[serde(flatten)]
    pub body: OperationBody,
}

impl Operation {
    /// A payment with no source override.
    pub fn payment(destination: impl Into<AccountId>, asset: Asset, amount: i64) -> Self {
        Self {
            source_account: None,
            body: OperationBody::Payment(Payment {
                destination: destination.into(),
                asset,
                amount,
            }),
        }
    }

    /// A non-payment operation.
    pub fn other(name: impl Into<String>) -> Self {
        Self {
            source_account: None,
            body: OperationBody::Other { name: name.into() },
        }
    }

    /// Set an operation-level source account.
    pub fn with_source(mut self, source: impl Into<AccountId>) -> Self {
        self.source_account = Some(source.into());
        self
    }

    /// Source account that actually applies to this operation.
    pub fn effective_source<'a>(&'a self, tx_source: &'a AccountId) -> &'a AccountId {
        self.source_account.as_ref().unwrap_or(tx_source)
    }
}

/// A transaction as applied in a ledger, with its execution result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutcome {
    /// Ledger containing the transaction
    #[serde(default)]
    pub ledger_sequence: LedgerSequence,
    /// Position within the ledger, starting at 0
    #[serde(default)]
    pub index: u32,
    /// Transaction hash (hex)
    #[serde(default)]
    pub hash: String,
    /// Envelope source account
    pub source_account: AccountId,
    /// Whether the transaction applied successfully
    pub successful: bool,
    /// Operations in submission order
    pub operations: Vec<Operation>,
}

/// Format a stroop amount as a 7-decimal unit string.
pub fn format_amount(stroops: i64) -> String {
    let sign = if stroops < 0 { "-" } else { "" };
    let abs = stroops.unsigned_abs();
    let per_unit = STROOPS_PER_UNIT as u64;
    format!("{}{}.{:07}", sign, abs / per_unit, abs % per_unit)
}

/// Parse a 7-decimal unit string (as served by Horizon) into stroops.
pub fn parse_amount(amount: &str) -> Option<i64> {
    let (negative, digits) = match amount.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, amount),
    };
    let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() || frac.len() > 7 {
        return None;
    }
    if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let whole: i64 = whole.parse().ok()?;
    let frac: i64 = if frac.is_empty() {
        0
    } else {
        format!("{:0<7}", frac).parse().ok()?
    };
    let stroops = whole.checked_mul(STROOPS_PER_UNIT)?.checked_add(frac)?;
    Some(if negative { -stroops } else { stroops })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_codes() {
        assert_eq!(Asset::Native.code(), "XLM");
        assert_eq!(
            Asset::Issued {
                code: "USDC".to_string(),
                issuer: AccountId::from("GISSUER"),
            }
            .code(),
            "USDC"
        );
        assert_eq!(Asset::PoolShares.code(), "liquidity pool shares");
    }

    #[test]
    fn test_effective_source() {
        let tx_source = AccountId::from("GTX");

        let op = Operation::payment("GDEST", Asset::Native, 1);
        assert_eq!(op.effective_source(&tx_source).as_str(), "GTX");

        let op = op.with_source("GOP");
        assert_eq!(op.effective_source(&tx_source).as_str(), "GOP");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("50.0000000"), Some(500_000_000));
        assert_eq!(parse_amount("0.0000001"), Some(1));
        assert_eq!(parse_amount("12.5"), Some(125_000_000));
        assert_eq!(parse_amount("7"), Some(70_000_000));
        assert_eq!(parse_amount("1.00000001"), None);
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount(".5"), None);
        assert_eq!(parse_amount(""), None);
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(500_000_000), "50.0000000");
        assert_eq!(format_amount(1), "0.0000001");
        assert_eq!(format_amount(-15_000_000), "-1.5000000");
    }

    #[test]
    fn test_operation_json_shape() {
        let op: Operation = serde_json::from_str(
            r#"{"kind":"payment","destination":"GB","asset":{"type":"native"},"amount":50}"#,
        )
        .unwrap();
        assert_eq!(op, Operation::payment("GB", Asset::Native, 50));

        let op: Operation =
            serde_json::from_str(r#"{"kind":"other","name":"create_account","source_account":"GX"}"#)
                .unwrap();
        assert_eq!(op, Operation::other("create_account").with_source("GX"));
    }
}
