//! Checkpoint persistence.
//!
//! This module handles persisting the scanner's progress to disk, so a
//! restarted scanner can pick up after the last fully processed ledger.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{ledger::LedgerSequence, observation::LedgerStats};

/// Persistent scan progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    /// Account the progress belongs to
    pub account: String,

    /// Last fully processed ledger (0 if none)
    pub last_scanned_ledger: LedgerSequence,

    /// Timestamp of last successful ledger (Unix timestamp)
    pub last_sync_timestamp: u64,

    /// Total payments observed so far
    pub total_observations: u64,

    /// Total transactions read
    pub total_transactions: u64,

    /// Total failed transactions skipped
    pub total_failed_transactions: u64,
}

impl SyncState {
    /// Create a new empty state for `account`.
    pub fn new(account: &str) -> Self {
        Self {
            account: account.to_string(),
            ..Default::default()
        }
    }

    /// Load state from a file.
    ///
    /// Returns `None` if the file doesn't exist.
    pub fn load(path: &Path) -> anyhow::Result<Option<Self>> {
        if !path.exists() {
            tracing::info!("No checkpoint found at {:?}", path);
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)?;
        let state: SyncState = serde_json::from_str(&content)?;

        tracing::info!(
            "Loaded checkpoint: ledger={}, observations={}",
            state.last_scanned_ledger,
            state.total_observations
        );

        Ok(Some(state))
    }

    /// Save state to a file.
    ///
    /// Writes to a temp file and renames it into place.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;

        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, &content)?;
        std::fs::rename(&temp_path, path)?;

        tracing::debug!("Saved checkpoint: ledger={}", self.last_scanned_ledger);

        Ok(())
    }

    /// Record a fully processed ledger.
    pub fn record_ledger(&mut self, stats: &LedgerStats) {
        self.last_scanned_ledger = stats.sequence;
        self.last_sync_timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.total_observations += stats.observations;
        self.total_transactions += stats.transactions;
        self.total_failed_transactions += stats.failed_transactions;
    }

    /// Ledger to resume from, given the configured starting ledger.
    ///
    /// Resumes after the checkpoint unless it predates `configured_start` or
    /// belongs to a different account.
    pub fn resume_ledger(&self, account: &str, configured_start: LedgerSequence) -> LedgerSequence {
        if self.account != account || self.last_scanned_ledger == 0 {
            return configured_start;
        }
        match self.last_scanned_ledger.checked_add(1) {
            Some(next) if next > configured_start => next,
            _ => configured_start,
        }
    }

    /// Format a human-readable summary.
    pub fn summary(&self) -> String {
        let last_sync = if self.last_sync_timestamp > 0 {
            chrono::DateTime::from_timestamp(self.last_sync_timestamp as i64, 0)
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "unknown".to_string())
        } else {
            "never".to_string()
        };

        format!(
            "Checkpoint:\n  Account: {}\n  Last ledger: {}\n  Last sync: {}\n  Payments observed: {}\n  Transactions read: {} ({} failed)",
            self.account,
            self.last_scanned_ledger,
            last_sync,
            self.total_observations,
            self.total_transactions,
            self.total_failed_transactions
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn stats(sequence: LedgerSequence, observations: u64) -> LedgerStats {
        LedgerStats {
            sequence,
            transactions: 4,
            failed_transactions: 1,
            payments: 2,
            observations,
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");

        let mut state = SyncState::new("GA");
        state.record_ledger(&stats(12345, 2));
        state.save(&path).unwrap();

        let loaded = SyncState::load(&path).unwrap().unwrap();
        assert_eq!(loaded, state);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nonexistent.json");

        assert!(SyncState::load(&path).unwrap().is_none());
    }

    #[test]
    fn test_record_ledger_accumulates() {
        let mut state = SyncState::new("GA");

        state.record_ledger(&stats(100, 3));
        state.record_ledger(&stats(101, 0));

        assert_eq!(state.last_scanned_ledger, 101);
        assert_eq!(state.total_observations, 3);
        assert_eq!(state.total_transactions, 8);
        assert_eq!(state.total_failed_transactions, 2);
        assert!(state.last_sync_timestamp > 0);
    }

    #[test]
    fn test_resume_ledger() {
        let mut state = SyncState::new("GA");
        assert_eq!(state.resume_ledger("GA", 50), 50);

        state.last_scanned_ledger = 100;
        assert_eq!(state.resume_ledger("GA", 50), 101);

        // Configured start is ahead of the checkpoint
        assert_eq!(state.resume_ledger("GA", 500), 500);

        // Checkpoint for another account is ignored
        assert_eq!(state.resume_ledger("GB", 50), 50);

        state.last_scanned_ledger = LedgerSequence::MAX;
        assert_eq!(state.resume_ledger("GA", 50), 50);
    }

    #[test]
    fn test_summary() {
        let state = SyncState::new("GA");
        let summary = state.summary();
        assert!(summary.contains("Last sync: never"));
        assert!(summary.contains("Account: GA"));
    }
}
