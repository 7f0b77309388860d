//! Stellar Payment Scanner CLI
//!
//! Streams payments to or from one account, ledger by ledger.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stellar_payment_scanner::{
    backend::{HorizonBackend, LedgerBackend, ReplayBackend, ReplayFixture},
    backoff::LinearBackoff,
    config::ScannerConfig,
    ledger::{AccountId, LedgerSequence},
    output::create_sink,
    scanner::PaymentScanner,
    sync::SyncState,
};

#[derive(Parser)]
#[command(name = "stellar-payment-scanner")]
#[command(about = "Streams payments touching a Stellar account")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Account to report payments for
    #[arg(long, env = "ACCOUNT", global = true)]
    account: Option<String>,

    /// First ledger to scan
    #[arg(long, env = "STARTING_AT_LEDGER", global = true)]
    starting_ledger: Option<LedgerSequence>,

    /// Network passphrase
    #[arg(long, env = "NETWORK_PASSPHRASE", global = true)]
    network_passphrase: Option<String>,

    /// Horizon server URL
    #[arg(long, env = "HORIZON_URL", global = true)]
    horizon_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the live ledger (default)
    Scan {
        /// Start from a specific ledger (overrides the checkpoint)
        #[arg(long)]
        from_ledger: Option<LedgerSequence>,

        /// Stop after this ledger instead of streaming forever
        #[arg(long)]
        until_ledger: Option<LedgerSequence>,
    },

    /// Scan a recorded JSON fixture instead of Horizon
    Replay {
        /// Fixture file
        fixture: PathBuf,

        /// Stop after this ledger (defaults to the last recorded ledger)
        #[arg(long)]
        until_ledger: Option<LedgerSequence>,
    },

    /// Show checkpoint status
    Status,

    /// Validate configuration
    ValidateConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    let config = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            if matches!(cli.command, Some(Commands::ValidateConfig)) {
                eprintln!("Configuration validation failed: {}", e);
                std::process::exit(1);
            }
            return Err(e);
        }
    };

    match cli.command.unwrap_or(Commands::Scan {
        from_ledger: None,
        until_ledger: None,
    }) {
        Commands::Scan {
            from_ledger,
            until_ledger,
        } => {
            config.validate()?;
            run_scan(&config, from_ledger, until_ledger).await
        }
        Commands::Replay {
            fixture,
            until_ledger,
        } => run_replay(config, &fixture, until_ledger).await,
        Commands::Status => show_status(&config),
        Commands::ValidateConfig => {
            if let Err(e) = config.validate() {
                eprintln!("Configuration validation failed: {}", e);
                std::process::exit(1);
            }
            println!("Configuration is valid.");
            println!("  Account: {}", config.account);
            println!("  Starting ledger: {}", config.starting_ledger);
            println!("  Network: {}", config.network_passphrase);
            println!("  Horizon: {}", config.horizon_url);
            println!("  Output mode: {:?}", config.output_mode);
            println!("  Checkpoint: {:?}", config.state_file);
            Ok(())
        }
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

/// Config file (if any) with command line and environment overrides applied.
fn load_config(cli: &Cli) -> Result<ScannerConfig> {
    let mut config = match &cli.config {
        Some(path) => ScannerConfig::from_file(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config from {:?}: {}", path, e))?,
        None => ScannerConfig::default(),
    };

    if let Some(account) = &cli.account {
        config.account = account.clone();
    }
    if let Some(ledger) = cli.starting_ledger {
        config.starting_ledger = ledger;
    }
    if let Some(passphrase) = &cli.network_passphrase {
        config.network_passphrase = passphrase.clone();
    }
    if let Some(url) = &cli.horizon_url {
        config.horizon_url = url.clone();
    }

    Ok(config)
}

async fn run_scan(
    config: &ScannerConfig,
    from_ledger: Option<LedgerSequence>,
    until_ledger: Option<LedgerSequence>,
) -> Result<()> {
    let backend = HorizonBackend::new(
        &config.horizon_url,
        &config.network_passphrase,
        config.request_timeout(),
    )?
    .with_page_limit(config.page_limit);
    run_pipeline(config, backend, from_ledger, until_ledger).await
}

async fn run_replay(
    mut config: ScannerConfig,
    fixture_path: &std::path::Path,
    until_ledger: Option<LedgerSequence>,
) -> Result<()> {
    let fixture = ReplayFixture::load(fixture_path)?;
    let backend = ReplayBackend::from_fixture(&config.network_passphrase, fixture);

    let (first, last) = match (backend.first_sequence(), backend.last_sequence()) {
        (Some(first), Some(last)) => (first, last),
        _ => anyhow::bail!("Replay fixture {:?} contains no ledgers", fixture_path),
    };
    if config.starting_ledger == 0 {
        config.starting_ledger = first;
    }
    config.validate()?;

    tracing::info!("Replaying ledgers {} to {} from {:?}", first, last, fixture_path);
    run_pipeline(&config, backend, None, Some(until_ledger.unwrap_or(last))).await
}

async fn run_pipeline<B: LedgerBackend>(
    config: &ScannerConfig,
    backend: B,
    from_ledger: Option<LedgerSequence>,
    until_ledger: Option<LedgerSequence>,
) -> Result<()> {
    let checkpoint = match &config.state_file {
        Some(path) => {
            let state = SyncState::load(path)?
                .filter(|s| s.account == config.account)
                .unwrap_or_else(|| SyncState::new(&config.account));
            Some((path.clone(), state))
        }
        None => None,
    };

    let start = resolve_start(config, from_ledger, checkpoint.as_ref().map(|(_, s)| s))?;
    if let Some(last) = until_ledger {
        if start > last {
            tracing::info!("Ledger {} is past {}, nothing to scan", start, last);
            return Ok(());
        }
    }

    let sink = create_sink(config)?;

    let mut scanner = PaymentScanner::new(
        backend,
        AccountId::new(config.account.as_str()),
        start,
        sink,
    )
    .with_backoff(Box::new(LinearBackoff::new(
        config.poll_interval(),
        config.max_poll_interval(),
    )));
    if let Some((path, state)) = checkpoint {
        scanner = scanner.with_checkpoint(path, state);
    }

    let result = match until_ledger {
        Some(last) => scanner.run_until(last).await,
        None => match scanner.run().await {
            Ok(never) => match never {},
            Err(e) => Err(e),
        },
    };

    if let Err(e) = &result {
        tracing::error!("Scan stopped: {}", e);
    }
    result?;

    tracing::info!("Scan complete");
    Ok(())
}

/// First ledger to scan: an explicit `--from-ledger`, else the checkpoint's
/// resume point, else the configured starting ledger.
fn resolve_start(
    config: &ScannerConfig,
    from_ledger: Option<LedgerSequence>,
    checkpoint: Option<&SyncState>,
) -> Result<LedgerSequence> {
    match from_ledger {
        Some(0) => anyhow::bail!("--from-ledger must be a positive ledger sequence"),
        Some(ledger) => {
            tracing::info!("Starting from specified ledger: {}", ledger);
            Ok(ledger)
        }
        None => {
            let start = checkpoint.map_or(config.starting_ledger, |state| {
                state.resume_ledger(&config.account, config.starting_ledger)
            });
            if start != config.starting_ledger {
                tracing::info!("Resuming from checkpoint at ledger {}", start);
            }
            Ok(start)
        }
    }
}

fn show_status(config: &ScannerConfig) -> Result<()> {
    let path = config
        .state_file
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("No state_file configured"))?;

    match SyncState::load(path)? {
        Some(state) => println!("{}", state.summary()),
        None => println!("No checkpoint at {:?}", path),
    }
    Ok(())
}
