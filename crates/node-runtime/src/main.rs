//! # Private-Relay Node Runtime
//!
//! Command-line entry point for the relay's maintenance operations.
//!
//! ## Commands
//!
//! - `recover` - rebuild the local store from peers (request, stage, sync)
//! - `resend` - push stored transactions to the owner of a key
//! - `migrate` - fold another node's snapshot into this one
//! - `sample-config` - print the default configuration as TOML
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (file, then `RELAY_*` environment overrides)
//! 2. Initialize telemetry
//! 3. Validate configuration
//! 4. Build the container (stores, discovery, transports, subsystems)
//! 5. Run the command and persist the stores when they changed
//! 6. Write the metrics file, when one is configured
//!
//! `recover` exits with `0` on success, `1` on partial success and `2` on
//! failure.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use node_runtime::{
    run_migration, run_recovery, run_resend, RelayConfig, RelayContainer, ResendCommand,
    ResendOutcome,
};
use relay_telemetry::init_telemetry;
use shared_types::{MessageHash, PublicKey};
use tracing::info;

/// Private-Relay: payload recovery and resend for a private transaction manager
#[derive(Parser, Debug)]
#[command(name = "private-relay")]
#[command(version, about = "Payload recovery and resend for a private transaction relay")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON logs
    #[arg(long, global = true)]
    json: bool,

    /// Write Prometheus metrics to this file when the command finishes
    #[arg(long, global = true)]
    metrics_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rebuild the local store from every known peer
    Recover,

    /// Push stored transactions to the owner of a key
    Resend {
        /// Hex encoded public key of the recipient
        key: String,

        /// Push batch size (batch resend only)
        #[arg(long)]
        batch_size: Option<usize>,

        /// Use the legacy one-by-one resend
        #[arg(long)]
        legacy: bool,

        /// Return a single transaction, by hex encoded hash
        #[arg(long)]
        hash: Option<String>,
    },

    /// Merge another node's snapshot into this node's stores
    Migrate {
        /// Snapshot file of the node being folded in
        #[arg(long)]
        secondary: PathBuf,
    },

    /// Print the default configuration
    SampleConfig,
}

fn resend_command(
    key: &str,
    batch_size: Option<usize>,
    legacy: bool,
    hash: Option<&str>,
) -> Result<ResendCommand> {
    let key = PublicKey::from_hex(key).context("invalid recipient key")?;
    let command = match hash {
        Some(hash) => ResendCommand::Individual {
            key,
            hash: MessageHash(hex::decode(hash.trim()).context("invalid transaction hash")?),
        },
        None if legacy => ResendCommand::LegacyAll { key },
        None => ResendCommand::Batch { key, batch_size },
    };
    Ok(command)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Command::SampleConfig = cli.command {
        let text = toml::to_string_pretty(&RelayConfig::default())
            .context("cannot render default configuration")?;
        println!("{text}");
        return Ok(());
    }

    // Load configuration
    let mut config =
        RelayConfig::load(cli.config.as_deref()).context("cannot load configuration")?;
    if cli.verbose {
        config.telemetry.log_level = "debug".to_string();
    }
    if cli.json {
        config.telemetry.json_logs = true;
    }
    if let Some(path) = cli.metrics_file {
        config.telemetry.metrics_file = Some(path);
    }

    let telemetry =
        init_telemetry(config.telemetry.clone()).context("cannot initialize telemetry")?;
    config.validate().context("invalid configuration")?;

    info!("===========================================");
    info!("  Private-Relay v{}", node_runtime::VERSION);
    info!("===========================================");

    let container = RelayContainer::new(config).context("cannot build relay container")?;

    let mut exit_code = 0;
    match cli.command {
        Command::Recover => {
            exit_code = run_recovery(&container).await;
            container.persist().context("cannot persist stores")?;
        }
        Command::Resend {
            key,
            batch_size,
            legacy,
            hash,
        } => {
            let command = resend_command(&key, batch_size, legacy, hash.as_deref())?;
            match run_resend(&container, command).await? {
                ResendOutcome::Published(total) => println!("{total} transactions published"),
                ResendOutcome::Dispatched => println!("legacy resend dispatched"),
                ResendOutcome::Payload(payload) => println!(
                    "{}",
                    serde_json::to_string_pretty(&payload).context("cannot render payload")?
                ),
            }
        }
        Command::Migrate { secondary } => {
            let summary = run_migration(&container, &secondary)?;
            container.persist().context("cannot persist stores")?;
            println!("{summary}");
        }
        Command::SampleConfig => {}
    }

    telemetry.export_metrics().context("cannot export metrics")?;

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}
