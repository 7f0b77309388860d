//! Configuration for the payment scanner.

use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

use crate::{backend::MAX_PAGE_LIMIT, ledger::LedgerSequence};

/// Passphrase of the Stellar test network.
pub const TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";

/// Output mode for observed payments.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Log one line per payment
    #[default]
    Log,
    /// Print payments to stdout as JSON lines
    Stdout,
    /// POST payments to a webhook URL
    Webhook,
}

/// Scanner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Account whose payments are reported (strkey)
    #[serde(default)]
    pub account: String,

    /// First ledger to scan
    #[serde(default)]
    pub starting_ledger: LedgerSequence,

    /// Network passphrase the backend must serve
    #[serde(default = "default_network_passphrase")]
    pub network_passphrase: String,

    /// Horizon server to read ledgers from
    #[serde(default = "default_horizon_url")]
    pub horizon_url: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Initial wait while the next ledger has not closed, in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Longest wait while the next ledger has not closed, in milliseconds
    #[serde(default = "default_max_poll_interval")]
    pub max_poll_interval_ms: u64,

    /// Horizon records requested per page
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,

    /// Checkpoint file for resuming after restarts
    pub state_file: Option<PathBuf>,

    /// Output mode for observed payments
    #[serde(default)]
    pub output_mode: OutputMode,

    /// Pretty-print JSON in stdout mode
    #[serde(default)]
    pub pretty_json: bool,

    /// Webhook URL (required if output_mode = webhook)
    pub webhook_url: Option<String>,

    /// Webhook retries after a failed POST
    #[serde(default = "default_webhook_max_retries")]
    pub webhook_max_retries: u32,

    /// Base delay between webhook retries, in milliseconds
    #[serde(default = "default_webhook_retry_delay")]
    pub webhook_retry_delay_ms: u64,
}

fn default_network_passphrase() -> String {
    TESTNET_PASSPHRASE.to_string()
}

fn default_horizon_url() -> String {
    "https://horizon-testnet.stellar.org".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_poll_interval() -> u64 {
    1_000
}

fn default_max_poll_interval() -> u64 {
    5_000
}

fn default_page_limit() -> u32 {
    MAX_PAGE_LIMIT
}

fn default_webhook_max_retries() -> u32 {
    3
}

fn default_webhook_retry_delay() -> u64 {
    1_000
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            account: String::new(),
            starting_ledger: 0,
            network_passphrase: default_network_passphrase(),
            horizon_url: default_horizon_url(),
            request_timeout_secs: default_request_timeout(),
            poll_interval_ms: default_poll_interval(),
            max_poll_interval_ms: default_max_poll_interval(),
            page_limit: default_page_limit(),
            state_file: None,
            output_mode: OutputMode::default(),
            pretty_json: false,
            webhook_url: None,
            webhook_max_retries: default_webhook_max_retries(),
            webhook_retry_delay_ms: default_webhook_retry_delay(),
        }
    }
}

impl ScannerConfig {
    /// Load configuration from a TOML file.
    ///
    /// The result is not validated, so command line overrides can still be
    /// applied.
    pub fn from_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ScannerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.account.is_empty() {
            anyhow::bail!("account must be specified (config file, --account or ACCOUNT)");
        }
        validate_account(&self.account)?;

        if self.starting_ledger == 0 {
            anyhow::bail!(
                "starting_ledger must be a positive ledger sequence (config file, --starting-ledger or STARTING_AT_LEDGER)"
            );
        }

        if self.network_passphrase.trim().is_empty() {
            anyhow::bail!("network_passphrase must not be empty");
        }

        if !self.horizon_url.starts_with("http://") && !self.horizon_url.starts_with("https://") {
            anyhow::bail!("horizon_url must be an http(s) URL, got {}", self.horizon_url);
        }

        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be positive");
        }

        if self.max_poll_interval_ms < self.poll_interval_ms {
            anyhow::bail!("max_poll_interval_ms must be >= poll_interval_ms");
        }

        if self.page_limit == 0 || self.page_limit > MAX_PAGE_LIMIT {
            anyhow::bail!("page_limit must be between 1 and {}", MAX_PAGE_LIMIT);
        }

        if self.output_mode == OutputMode::Webhook && self.webhook_url.is_none() {
            anyhow::bail!("webhook_url is required when output_mode = webhook");
        }

        Ok(())
    }

    /// HTTP request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Initial wait while a ledger has not closed.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Longest wait while a ledger has not closed.
    pub fn max_poll_interval(&self) -> Duration {
        Duration::from_millis(self.max_poll_interval_ms)
    }

    /// Base delay between webhook retries.
    pub fn webhook_retry_delay(&self) -> Duration {
        Duration::from_millis(self.webhook_retry_delay_ms)
    }
}

const STRKEY_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Check that `account` looks like an account strkey: `G...` (56 characters)
/// or muxed `M...` (69 characters), base32 alphabet. The checksum is not
/// verified.
pub fn validate_account(account: &str) -> anyhow::Result<()> {
    let expected_len = match account.chars().next() {
        Some('G') => 56,
        Some('M') => 69,
        _ => anyhow::bail!("account must start with G or M, got {:?}", account),
    };
    if account.len() != expected_len {
        anyhow::bail!(
            "account must be {} characters, got {}",
            expected_len,
            account.len()
        );
    }
    if let Some(c) = account.chars().find(|c| !STRKEY_ALPHABET.contains(*c)) {
        anyhow::bail!("account contains invalid character {:?}", c);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCOUNT: &str = "GAHK7EEG2WWHVKDNT4CEQFZGKF2LGDSW2IVM4S5DP42RBW3K6BTODB4A";

    fn valid_config() -> ScannerConfig {
        ScannerConfig {
            account: ACCOUNT.to_string(),
            starting_ledger: 100,
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = ScannerConfig::default();
        assert_eq!(config.network_passphrase, TESTNET_PASSPHRASE);
        assert_eq!(config.output_mode, OutputMode::Log);
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert!(config.state_file.is_none());
    }

    #[test]
    fn test_validate_ok() {
        valid_config().validate().unwrap();
    }

    #[test]
    fn test_validate_missing_account() {
        let config = ScannerConfig {
            account: String::new(),
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_starting_ledger() {
        let config = ScannerConfig {
            starting_ledger: 0,
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_page_limit() {
        for page_limit in [0, MAX_PAGE_LIMIT + 1] {
            let config = ScannerConfig {
                page_limit,
                ..valid_config()
            };
            assert!(config.validate().is_err());
        }
    }

    #[test]
    fn test_validate_webhook_needs_url() {
        let config = ScannerConfig {
            output_mode: OutputMode::Webhook,
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_account_shapes() {
        assert!(validate_account(ACCOUNT).is_ok());
        assert!(validate_account(&ACCOUNT.to_lowercase()).is_err());
        assert!(validate_account(&ACCOUNT[..55]).is_err());
        assert!(validate_account(&format!("S{}", &ACCOUNT[1..])).is_err());
        assert!(validate_account(&format!("{}1", &ACCOUNT[..55])).is_err());
    }

    #[test]
    fn test_parse_toml() {
        let config: ScannerConfig = toml::from_str(
            r#"
            account = "GAHK7EEG2WWHVKDNT4CEQFZGKF2LGDSW2IVM4S5DP42RBW3K6BTODB4A"
            starting_ledger = 4000
            output_mode = "stdout"
            state_file = "checkpoint.json"
            "#,
        )
        .unwrap();
        assert_eq!(config.starting_ledger, 4000);
        assert_eq!(config.output_mode, OutputMode::Stdout);
        assert_eq!(config.state_file, Some(PathBuf::from("checkpoint.json")));
        assert_eq!(config.horizon_url, "https://horizon-testnet.stellar.org");
        assert_eq!(config.page_limit, MAX_PAGE_LIMIT);
        assert!(!config.pretty_json);
        assert_eq!(config.webhook_max_retries, 3);
        config.validate().unwrap();
    }
}
