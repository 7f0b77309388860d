//! Payment matching.
//!
//! Decides which payments in a transaction touch the account of interest and
//! turns them into [`Observation`]s.

use crate::{
    ledger::{AccountId, OperationBody, TransactionOutcome},
    observation::Observation,
};

/// Matches payments against a single account.
#[derive(Debug, Clone)]
pub struct PaymentMatcher {
    account: AccountId,
}

/// What the matcher saw in one transaction.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MatchResult {
    /// Observations in operation order
    pub observations: Vec<Observation>,

    /// Payment operations inspected
    pub payments: u64,

    /// Whether the transaction was skipped as failed
    pub skipped_failed: bool,
}

impl PaymentMatcher {
    /// Create a matcher for `account`.
    pub fn new(account: AccountId) -> Self {
        Self { account }
    }

    /// The account of interest.
    pub fn account(&self) -> &AccountId {
        &self.account
    }

    /// Extract observations from one transaction.
    ///
    /// Failed transactions contribute nothing. A payment matches when either
    /// its destination or its effective source is the account of interest; a
    /// self-payment yields one observation.
    pub fn process(&self, outcome: &TransactionOutcome) -> MatchResult {
        let mut result = MatchResult::default();

        if !outcome.successful {
            result.skipped_failed = true;
            return result;
        }

        for (op_index, op) in outcome.operations.iter().enumerate() {
            let payment = match &op.body {
                OperationBody::Payment(payment) => payment,
                OperationBody::Other { .. } => continue,
            };
            result.payments += 1;

            let source = op.effective_source(&outcome.source_account);
            if payment.destination != self.account && *source != self.account {
                continue;
            }

            result.observations.push(Observation {
                source: source.clone(),
                amount: payment.amount,
                asset_code: payment.asset.code().to_string(),
                destination: payment.destination.clone(),
                ledger_sequence: outcome.ledger_sequence,
                tx_hash: outcome.hash.clone(),
                tx_index: outcome.index,
                op_index: op_index as u32,
            });
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Asset, Operation};

    fn transaction(source: &str, successful: bool, operations: Vec<Operation>) -> TransactionOutcome {
        TransactionOutcome {
            ledger_sequence: 100,
            index: 0,
            hash: "00".repeat(32),
            source_account: AccountId::from(source),
            successful,
            operations,
        }
    }

    fn matcher(account: &str) -> PaymentMatcher {
        PaymentMatcher::new(AccountId::from(account))
    }

    #[test]
    fn test_native_payment_from_account() {
        let tx = transaction("A", true, vec![Operation::payment("B", Asset::Native, 50)]);

        let result = matcher("A").process(&tx);
        assert_eq!(result.observations.len(), 1);
        let obs = &result.observations[0];
        assert_eq!(obs.source.as_str(), "A");
        assert_eq!(obs.amount, 50);
        assert_eq!(obs.asset_code, "XLM");
        assert_eq!(obs.destination.as_str(), "B");

        assert!(matcher("C").process(&tx).observations.is_empty());
    }

    #[test]
    fn test_failed_transaction_skipped() {
        let tx = transaction("A", false, vec![Operation::payment("B", Asset::Native, 50)]);

        for account in ["A", "B", "C"] {
            let result = matcher(account).process(&tx);
            assert!(result.observations.is_empty());
            assert!(result.skipped_failed);
            assert_eq!(result.payments, 0);
        }
    }

    #[test]
    fn test_source_override_precedence() {
        let tx = transaction(
            "Y",
            true,
            vec![Operation::payment("Z", Asset::Native, 10).with_source("X")],
        );

        // Effective source is X, not the transaction's Y
        assert!(matcher("Y").process(&tx).observations.is_empty());

        let result = matcher("X").process(&tx);
        assert_eq!(result.observations.len(), 1);
        assert_eq!(result.observations[0].source.as_str(), "X");
    }

    #[test]
    fn test_source_override_with_destination_match() {
        let tx = transaction(
            "Y",
            true,
            vec![Operation::payment("Y", Asset::Native, 10).with_source("X")],
        );

        let result = matcher("Y").process(&tx);
        assert_eq!(result.observations.len(), 1);
        assert_eq!(result.observations[0].source.as_str(), "X");
        assert_eq!(result.observations[0].destination.as_str(), "Y");
    }

    #[test]
    fn test_self_payment_single_observation() {
        let tx = transaction("A", true, vec![Operation::payment("A", Asset::Native, 1)]);
        assert_eq!(matcher("A").process(&tx).observations.len(), 1);
    }

    #[test]
    fn test_asset_normalization() {
        let tx = transaction(
            "A",
            true,
            vec![
                Operation::payment("B", Asset::Native, 1),
                Operation::payment(
                    "B",
                    Asset::Issued {
                        code: "USDC".to_string(),
                        issuer: AccountId::from("I"),
                    },
                    2,
                ),
                Operation::payment("B", Asset::PoolShares, 3),
            ],
        );

        let codes: Vec<_> = matcher("A")
            .process(&tx)
            .observations
            .into_iter()
            .map(|o| o.asset_code)
            .collect();
        assert_eq!(codes, vec!["XLM", "USDC", "liquidity pool shares"]);
    }

    #[test]
    fn test_non_payment_operations_ignored() {
        let tx = transaction(
            "A",
            true,
            vec![
                Operation::other("create_account"),
                Operation::payment("B", Asset::Native, 7),
                Operation::other("path_payment_strict_send"),
            ],
        );

        let result = matcher("A").process(&tx);
        assert_eq!(result.payments, 1);
        assert_eq!(result.observations.len(), 1);
        assert_eq!(result.observations[0].op_index, 1);
    }

    #[test]
    fn test_unrelated_payment_excluded() {
        let tx = transaction("D", true, vec![Operation::payment("E", Asset::Native, 5)]);
        let result = matcher("A").process(&tx);
        assert!(result.observations.is_empty());
        assert_eq!(result.payments, 1);
    }

    #[test]
    fn test_account_match_is_case_sensitive() {
        let tx = transaction("GABC", true, vec![Operation::payment("GDEF", Asset::Native, 5)]);
        assert!(matcher("gabc").process(&tx).observations.is_empty());
    }
}
