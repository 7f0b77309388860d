//! Horizon backend.
//!
//! Streams ledgers from a Horizon server. Transactions and operations are
//! paged lazily per ledger (ascending, `include_failed=true`) and operations
//! are grouped back under their transaction by hash.

use std::{collections::VecDeque, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};

use super::{LedgerBackend, TransactionReader};
use crate::{
    error::BackendError,
    ledger::{parse_amount, AccountId, Asset, LedgerSequence, Operation, TransactionOutcome},
};

/// Largest page Horizon will serve.
pub const MAX_PAGE_LIMIT: u32 = 200;

/// Backend reading ledgers from a Horizon server.
pub struct HorizonBackend {
    /// HTTP client
    client: Client,
    /// Horizon base URL, without trailing slash
    base_url: String,
    /// Network passphrase the server must report
    network_passphrase: String,
    /// Records requested per page
    page_limit: u32,
    /// First ledger of the prepared range
    prepared_from: Option<LedgerSequence>,
    /// Latest ledger Horizon has ingested, as last observed
    latest_ledger: LedgerSequence,
}

impl HorizonBackend {
    /// Create a backend for `base_url` serving `network_passphrase`.
    pub fn new(
        base_url: &str,
        network_passphrase: &str,
        request_timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self::with_client(client, base_url, network_passphrase))
    }

    /// Create a backend that sends requests through `client`.
    pub fn with_client(client: Client, base_url: &str, network_passphrase: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            network_passphrase: network_passphrase.to_string(),
            page_limit: MAX_PAGE_LIMIT,
            prepared_from: None,
            latest_ledger: 0,
        }
    }

    /// Use a smaller page size.
    pub fn with_page_limit(mut self, page_limit: u32) -> Self {
        self.page_limit = page_limit.clamp(1, MAX_PAGE_LIMIT);
        self
    }

    async fn fetch_root(&self) -> Result<RootInfo, BackendError> {
        get_json(&self.client, &format!("{}/", self.base_url)).await
    }
}

#[async_trait]
impl LedgerBackend for HorizonBackend {
    type Reader = HorizonTransactionReader;

    async fn prepare_range(&mut self, start: LedgerSequence) -> Result<(), BackendError> {
        let root = self.fetch_root().await?;

        if root.network_passphrase != self.network_passphrase {
            return Err(BackendError::NetworkMismatch {
                expected: self.network_passphrase.clone(),
                actual: root.network_passphrase,
            });
        }
        if start < root.history_elder_ledger {
            return Err(BackendError::RangeRejected {
                start,
                reason: format!(
                    "history on {} starts at ledger {}",
                    self.base_url, root.history_elder_ledger
                ),
            });
        }

        tracing::info!(
            "Horizon range prepared from ledger {} (history {} to {})",
            start,
            root.history_elder_ledger,
            root.history_latest_ledger
        );

        self.latest_ledger = root.history_latest_ledger;
        self.prepared_from = Some(start);
        Ok(())
    }

    async fn open_transaction_reader(
        &mut self,
        sequence: LedgerSequence,
    ) -> Result<HorizonTransactionReader, BackendError> {
        let start = self.prepared_from.ok_or(BackendError::RangeNotPrepared)?;
        if sequence < start {
            return Err(BackendError::OutsideRange(sequence));
        }

        if sequence > self.latest_ledger {
            self.latest_ledger = self.fetch_root().await?.history_latest_ledger;
            if sequence > self.latest_ledger {
                return Err(BackendError::NotYetAvailable(sequence));
            }
        }

        Ok(HorizonTransactionReader::new(
            self.client.clone(),
            &self.base_url,
            sequence,
            self.page_limit,
        ))
    }
}

/// One record stream (transactions or operations) for a ledger.
struct PagedStream<T> {
    url: String,
    cursor: Option<String>,
    buffer: VecDeque<T>,
    exhausted: bool,
}

impl<T: DeserializeOwned + Paged> PagedStream<T> {
    fn new(url: String) -> Self {
        Self {
            url,
            cursor: None,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    async fn next(&mut self, client: &Client, limit: u32) -> Result<Option<T>, BackendError> {
        if self.buffer.is_empty() && !self.exhausted {
            let mut url = format!("{}&limit={}", self.url, limit);
            if let Some(cursor) = &self.cursor {
                url.push_str("&cursor=");
                url.push_str(cursor);
            }

            let page: Page<T> = get_json(client, &url).await?;
            let records = page.embedded.records;
            if (records.len() as u32) < limit {
                self.exhausted = true;
            }
            if let Some(last) = records.last() {
                self.cursor = Some(last.paging_token().to_string());
            }
            self.buffer.extend(records);
        }
        Ok(self.buffer.pop_front())
    }

    fn clear(&mut self) {
        self.buffer.clear();
        self.exhausted = true;
    }
}

/// Reader over the transactions of one ledger served by Horizon.
pub struct HorizonTransactionReader {
    client: Client,
    sequence: LedgerSequence,
    page_limit: u32,
    transactions: PagedStream<TransactionRecord>,
    operations: PagedStream<OperationRecord>,
    next_index: u32,
}

impl HorizonTransactionReader {
    fn new(client: Client, base_url: &str, sequence: LedgerSequence, page_limit: u32) -> Self {
        let query = "include_failed=true&order=asc";
        Self {
            client,
            sequence,
            page_limit,
            transactions: PagedStream::new(format!(
                "{}/ledgers/{}/transactions?{}",
                base_url, sequence, query
            )),
            operations: PagedStream::new(format!(
                "{}/ledgers/{}/operations?{}",
                base_url, sequence, query
            )),
            next_index: 0,
        }
    }
}

#[async_trait]
impl TransactionReader for HorizonTransactionReader {
    fn sequence(&self) -> LedgerSequence {
        self.sequence
    }

    async fn read(&mut self) -> Result<Option<TransactionOutcome>, BackendError> {
        let record = match self.transactions.next(&self.client, self.page_limit).await? {
            Some(record) => record,
            None => return Ok(None),
        };
        if record.ledger != self.sequence {
            return Err(BackendError::Malformed(format!(
                "transaction {} reported in ledger {}, expected {}",
                record.hash, record.ledger, self.sequence
            )));
        }

        let tx_source = AccountId::new(record.source_account.as_str());
        let tx_source_muxed = record.account_muxed.as_deref();
        let mut operations = Vec::with_capacity(record.operation_count as usize);
        while operations.len() < record.operation_count as usize {
            let op = self
                .operations
                .next(&self.client, self.page_limit)
                .await?
                .ok_or_else(|| {
                    BackendError::Malformed(format!(
                        "transaction {} is missing operations ({} of {})",
                        record.hash,
                        operations.len(),
                        record.operation_count
                    ))
                })?;
            if op.transaction_hash != record.hash {
                return Err(BackendError::Malformed(format!(
                    "operation {} belongs to {}, expected {}",
                    op.paging_token, op.transaction_hash, record.hash
                )));
            }
            operations.push(op.into_operation(&tx_source, tx_source_muxed)?);
        }

        let index = self.next_index;
        self.next_index += 1;

        Ok(Some(TransactionOutcome {
            ledger_sequence: self.sequence,
            index,
            hash: record.hash,
            source_account: tx_source,
            successful: record.successful,
            operations,
        }))
    }

    fn close(&mut self) {
        tracing::trace!("Closing Horizon reader for ledger {}", self.sequence);
        self.transactions.clear();
        self.operations.clear();
    }
}

async fn get_json<T: DeserializeOwned>(client: &Client, url: &str) -> Result<T, BackendError> {
    let response = client
        .get(url)
        .header("Accept", "application/hal+json")
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(BackendError::Status {
            status: response.status().as_u16(),
            url: url.to_string(),
        });
    }

    let body = response.text().await?;
    serde_json::from_str(&body)
        .map_err(|e| BackendError::Malformed(format!("unexpected response from {}: {}", url, e)))
}

trait Paged {
    fn paging_token(&self) -> &str;
}

#[derive(Deserialize)]
struct Page<T> {
    #[serde(rename = "_embedded")]
    embedded: Embedded<T>,
}

#[derive(Deserialize)]
struct Embedded<T> {
    records: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct RootInfo {
    history_latest_ledger: LedgerSequence,
    history_elder_ledger: LedgerSequence,
    network_passphrase: String,
}

#[derive(Debug, Deserialize)]
struct TransactionRecord {
    paging_token: String,
    hash: String,
    ledger: LedgerSequence,
    successful: bool,
    source_account: String,
    /// Muxed form of the source, if it was muxed
    account_muxed: Option<String>,
    operation_count: u32,
}

impl Paged for TransactionRecord {
    fn paging_token(&self) -> &str {
        &self.paging_token
    }
}

#[derive(Debug, Deserialize)]
struct OperationRecord {
    paging_token: String,
    transaction_hash: String,
    source_account: String,
    source_account_muxed: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    to: Option<String>,
    to_muxed: Option<String>,
    amount: Option<String>,
    asset_type: Option<String>,
    asset_code: Option<String>,
    asset_issuer: Option<String>,
}

impl Paged for OperationRecord {
    fn paging_token(&self) -> &str {
        &self.paging_token
    }
}

impl OperationRecord {
    /// Convert into an [`Operation`]. Horizon always reports the effective
    /// source, so it is an override only when it differs from the
    /// transaction's. Muxed addresses are preferred wherever Horizon gives
    /// them, except for the transaction-level source.
    fn into_operation(
        self,
        tx_source: &AccountId,
        tx_source_muxed: Option<&str>,
    ) -> Result<Operation, BackendError> {
        let inherited = self.source_account == tx_source.as_str()
            && self.source_account_muxed.as_deref() == tx_source_muxed;
        let override_source = (!inherited).then(|| {
            AccountId::new(self.source_account_muxed.as_deref().unwrap_or(&self.source_account))
        });

        let op = if self.kind == "payment" {
            let malformed = |field: &str| {
                BackendError::Malformed(format!(
                    "payment {} has no valid {}",
                    self.paging_token, field
                ))
            };
            let destination = self
                .to_muxed
                .as_deref()
                .or(self.to.as_deref())
                .ok_or_else(|| malformed("to"))?;
            let amount = self
                .amount
                .as_deref()
                .and_then(parse_amount)
                .ok_or_else(|| malformed("amount"))?;
            let asset = parse_asset(
                self.asset_type.as_deref(),
                self.asset_code.as_deref(),
                self.asset_issuer.as_deref(),
            )
            .ok_or_else(|| malformed("asset"))?;

            Operation::payment(destination, asset, amount)
        } else {
            Operation::other(self.kind)
        };

        Ok(match override_source {
            Some(source) => op.with_source(source),
            None => op,
        })
    }
}

fn parse_asset(
    asset_type: Option<&str>,
    code: Option<&str>,
    issuer: Option<&str>,
) -> Option<Asset> {
    match asset_type? {
        "native" => Some(Asset::Native),
        "credit_alphanum4" | "credit_alphanum12" => Some(Asset::Issued {
            code: code?.to_string(),
            issuer: AccountId::new(issuer?),
        }),
        "liquidity_pool_shares" => Some(Asset::PoolShares),
        _ => None,
    }
}
